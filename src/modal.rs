//! Create/edit form lifecycle and the delete confirmation gate.
//!
//! The form opens only once every prerequisite fetch has resolved, and each
//! successful mutation is followed by a full list refresh rather than a local
//! patch of the cached page.
//!
use std::collections::BTreeSet;
use std::sync::{Arc, Mutex, MutexGuard};

use tokio::sync::watch;
use tracing::{debug, info, warn};

use crate::directory::{DirectoryService, RoleName, UserId, UserRecord};
use crate::error::{ConsoleError, FieldError, FormField};
use crate::list::UserList;

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum ModalMode {
    Create,
    Edit(UserId),
}

impl ModalMode {
    pub fn for_id(id: UserId) -> Self {
        if id == 0 {
            ModalMode::Create
        } else {
            ModalMode::Edit(id)
        }
    }

    /// Id sent with the submitted record.
    pub fn target_id(self) -> UserId {
        match self {
            ModalMode::Create => 0,
            ModalMode::Edit(id) => id,
        }
    }

    pub fn title(self) -> &'static str {
        match self {
            ModalMode::Create => "Create user",
            ModalMode::Edit(_) => "Edit user",
        }
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum ModalState {
    Closed,
    Open(ModalMode),
}

/// Editable values of the user form.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct UserForm {
    pub first_name: String,
    pub last_name: String,
    pub user_type: String,
    pub department: String,
    pub email_address: String,
    pub is_active: bool,
    pub role_names: BTreeSet<RoleName>,
    pub group_path: Option<String>,
}

impl UserForm {
    pub fn from_record(record: &UserRecord) -> Self {
        Self {
            first_name: record.first_name.clone(),
            last_name: record.last_name.clone(),
            user_type: record.user_type.clone(),
            department: record.department.clone(),
            email_address: record.email_address.clone(),
            is_active: record.is_active,
            role_names: record.role_names.clone(),
            group_path: record.group_path.clone(),
        }
    }

    pub fn into_record(self, id: UserId) -> UserRecord {
        UserRecord {
            id,
            first_name: self.first_name.trim().to_string(),
            last_name: self.last_name.trim().to_string(),
            user_type: self.user_type.trim().to_string(),
            department: self.department.trim().to_string(),
            email_address: self.email_address.trim().to_string(),
            is_active: self.is_active,
            role_names: self.role_names,
            group_path: self.group_path,
        }
    }

    pub fn text(&self, field: FormField) -> &str {
        match field {
            FormField::FirstName => &self.first_name,
            FormField::LastName => &self.last_name,
            FormField::UserType => &self.user_type,
            FormField::Department => &self.department,
            FormField::EmailAddress => &self.email_address,
            FormField::Roles => "",
        }
    }

    /// Mutable access to a text field; `None` for non-text fields.
    pub fn text_mut(&mut self, field: FormField) -> Option<&mut String> {
        match field {
            FormField::FirstName => Some(&mut self.first_name),
            FormField::LastName => Some(&mut self.last_name),
            FormField::UserType => Some(&mut self.user_type),
            FormField::Department => Some(&mut self.department),
            FormField::EmailAddress => Some(&mut self.email_address),
            FormField::Roles => None,
        }
    }

    pub fn toggle_role(&mut self, role: &str) {
        if !self.role_names.remove(role) {
            self.role_names.insert(role.to_string());
        }
    }

    /// Local checks run before anything is sent to the directory.
    pub fn validate(&self, available_roles: &[RoleName]) -> Result<(), Vec<FieldError>> {
        let mut errors = Vec::new();
        for field in [FormField::FirstName, FormField::LastName, FormField::EmailAddress] {
            if self.text(field).trim().is_empty() {
                errors.push(FieldError::new(field, "is required"));
            }
        }
        let email = self.email_address.trim();
        if !email.is_empty() && !is_plausible_email(email) {
            errors.push(FieldError::new(FormField::EmailAddress, "must look like name@domain"));
        }
        let unknown: Vec<&str> = self
            .role_names
            .iter()
            .filter(|r| !available_roles.contains(r))
            .map(String::as_str)
            .collect();
        if !unknown.is_empty() {
            errors.push(FieldError::new(
                FormField::Roles,
                format!("unknown role(s): {}", unknown.join(", ")),
            ));
        }
        if errors.is_empty() { Ok(()) } else { Err(errors) }
    }
}

fn is_plausible_email(email: &str) -> bool {
    let mut parts = email.split('@');
    matches!(
        (parts.next(), parts.next(), parts.next()),
        (Some(local), Some(domain), None) if !local.is_empty() && !domain.is_empty()
    )
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ModalSnapshot {
    pub state: ModalState,
    /// Present while open; holds the last values the user entered.
    pub form: Option<UserForm>,
    pub roles: Vec<RoleName>,
    /// An open or submit request is in flight.
    pub busy: bool,
    pub error: Option<String>,
    pub field_errors: Vec<FieldError>,
    /// User awaiting a yes/no decision before deletion.
    pub pending_delete: Option<UserId>,
}

impl ModalSnapshot {
    pub fn is_open(&self) -> bool {
        matches!(self.state, ModalState::Open(_))
    }

    pub fn mode(&self) -> Option<ModalMode> {
        match self.state {
            ModalState::Open(mode) => Some(mode),
            ModalState::Closed => None,
        }
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum OpenOutcome {
    Opened(ModalMode),
    /// The form was cancelled or reopened before the fetches resolved.
    Discarded,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum DeleteOutcome {
    Deleted(UserId),
    Cancelled,
    NothingPending,
}

struct ModalInner {
    snapshot: ModalSnapshot,
    generation: u64,
}

pub struct UserModal<S: ?Sized> {
    service: Arc<S>,
    list: Arc<UserList<S>>,
    inner: Mutex<ModalInner>,
    updates: watch::Sender<ModalSnapshot>,
}

impl<S: DirectoryService + ?Sized> UserModal<S> {
    pub fn new(service: Arc<S>, list: Arc<UserList<S>>) -> Self {
        let snapshot = ModalSnapshot {
            state: ModalState::Closed,
            form: None,
            roles: Vec::new(),
            busy: false,
            error: None,
            field_errors: Vec::new(),
            pending_delete: None,
        };
        let (updates, _) = watch::channel(snapshot.clone());
        Self {
            service,
            list,
            inner: Mutex::new(ModalInner { snapshot, generation: 0 }),
            updates,
        }
    }

    pub fn snapshot(&self) -> ModalSnapshot {
        self.lock().snapshot.clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<ModalSnapshot> {
        self.updates.subscribe()
    }

    pub fn list(&self) -> &Arc<UserList<S>> {
        &self.list
    }

    /// Open the form for `id`.
    ///
    /// Role set and record are fetched together; the form becomes visible
    /// only when both succeeded. On failure the state is left untouched and
    /// the error is recorded.
    ///
    /// # Arguments
    ///
    /// * `id` - User to edit, or `0` for a blank create form
    ///
    /// # Returns
    ///
    /// * `OpenOutcome::Opened` with the mode once the form is shown
    /// * `OpenOutcome::Discarded` if a cancel or newer open overtook this one
    /// * `Err(ConsoleError)` if either fetch failed
    pub async fn open(&self, id: UserId) -> Result<OpenOutcome, ConsoleError> {
        let mode = ModalMode::for_id(id);
        let generation = self.mutate(|inner| {
            inner.generation += 1;
            inner.snapshot.busy = true;
            inner.snapshot.error = None;
            inner.generation
        });
        debug!(?mode, generation, "opening user form");

        let fetched = match mode {
            ModalMode::Create => self
                .service
                .get_roles()
                .await
                .map(|roles| (UserRecord::blank(), roles)),
            ModalMode::Edit(id) => tokio::try_join!(self.service.get(id), self.service.get_roles()),
        };

        self.mutate(|inner| {
            if inner.generation != generation {
                debug!(generation, latest = inner.generation, "dropping stale form fetch");
                return Ok(OpenOutcome::Discarded);
            }
            inner.snapshot.busy = false;
            match fetched {
                Ok((record, roles)) => {
                    inner.snapshot.state = ModalState::Open(mode);
                    inner.snapshot.form = Some(UserForm::from_record(&record));
                    inner.snapshot.roles = roles;
                    inner.snapshot.field_errors.clear();
                    Ok(OpenOutcome::Opened(mode))
                }
                Err(err) => {
                    warn!(?mode, error = %err, "could not open user form");
                    inner.snapshot.error = Some(err.to_string());
                    Err(err.into())
                }
            }
        })
    }

    /// Close without side effects. An in-flight open is discarded when it lands.
    pub fn cancel(&self) {
        self.mutate(|inner| {
            inner.generation += 1;
            inner.snapshot.state = ModalState::Closed;
            inner.snapshot.form = None;
            inner.snapshot.busy = false;
            inner.snapshot.error = None;
            inner.snapshot.field_errors.clear();
        });
    }

    /// Edit the open form in place. Returns `false` when no form is open.
    pub fn update_form(&self, f: impl FnOnce(&mut UserForm)) -> bool {
        self.mutate(|inner| match inner.snapshot.form.as_mut() {
            Some(form) if matches!(inner.snapshot.state, ModalState::Open(_)) => {
                f(form);
                true
            }
            _ => false,
        })
    }

    /// Attach the user being edited to a group path.
    pub fn assign_group(&self, path: impl Into<String>) -> bool {
        let path = path.into();
        self.update_form(|form| form.group_path = Some(path))
    }

    /// Validate and save `form`; on success refresh the list, then close.
    ///
    /// # Arguments
    ///
    /// * `form` - Values to save; kept on the snapshot even when rejected
    ///
    /// # Returns
    ///
    /// * `Ok(record)` as stored by the directory
    /// * `Err(ConsoleError::Validation)` with per-field errors; nothing is sent
    /// * `Err(ConsoleError::Busy)` while an earlier request is still in flight
    pub async fn submit(&self, form: UserForm) -> Result<UserRecord, ConsoleError> {
        let (mode, generation) = self.mutate(|inner| {
            let mode = match inner.snapshot.state {
                ModalState::Open(mode) => mode,
                ModalState::Closed => return Err(ConsoleError::ModalClosed),
            };
            if inner.snapshot.busy {
                return Err(ConsoleError::Busy);
            }
            inner.snapshot.form = Some(form.clone());
            if let Err(errors) = form.validate(&inner.snapshot.roles) {
                inner.snapshot.field_errors = errors.clone();
                return Err(ConsoleError::Validation(errors));
            }
            inner.snapshot.field_errors.clear();
            inner.snapshot.error = None;
            inner.snapshot.busy = true;
            Ok((mode, inner.generation))
        })?;

        let record = form.into_record(mode.target_id());
        let saved = match mode {
            ModalMode::Create => self.service.create(record).await,
            ModalMode::Edit(_) => self.service.update(record).await,
        };

        let saved = match saved {
            Ok(saved) => saved,
            Err(err) => {
                warn!(?mode, error = %err, "saving user failed");
                self.mutate(|inner| {
                    inner.snapshot.busy = false;
                    inner.snapshot.error = Some(err.to_string());
                });
                return Err(err.into());
            }
        };
        info!(id = saved.id, ?mode, "saved user");

        // The list keeps its own error flag if this fails; the save itself stands.
        if let Err(err) = self.list.refresh().await {
            warn!(error = %err, "list refresh after save failed");
        }

        self.mutate(|inner| {
            if inner.generation == generation {
                inner.generation += 1;
                inner.snapshot.state = ModalState::Closed;
                inner.snapshot.form = None;
                inner.snapshot.busy = false;
            }
        });
        Ok(saved)
    }

    /// Ask for confirmation before deleting `id`. Nothing is sent yet.
    pub fn request_delete(&self, id: UserId) {
        self.mutate(|inner| {
            inner.snapshot.pending_delete = Some(id);
            inner.snapshot.error = None;
        });
    }

    /// Decline the pending deletion.
    pub fn dismiss_delete(&self) -> DeleteOutcome {
        let pending = self.mutate(|inner| inner.snapshot.pending_delete.take());
        match pending {
            Some(id) => {
                info!(id, "delete cancelled");
                DeleteOutcome::Cancelled
            }
            None => DeleteOutcome::NothingPending,
        }
    }

    /// Delete the pending user, then refresh the list.
    ///
    /// # Returns
    ///
    /// * `DeleteOutcome::Deleted(id)` once the directory removed the user
    /// * `DeleteOutcome::NothingPending` when no deletion was requested
    /// * `Err(ConsoleError)` if the directory refused; the request is dropped
    pub async fn confirm_delete(&self) -> Result<DeleteOutcome, ConsoleError> {
        let Some(id) = self.mutate(|inner| inner.snapshot.pending_delete.take()) else {
            return Ok(DeleteOutcome::NothingPending);
        };
        if let Err(err) = self.service.delete(id).await {
            warn!(id, error = %err, "delete failed");
            self.mutate(|inner| inner.snapshot.error = Some(err.to_string()));
            return Err(err.into());
        }
        info!(id, "deleted user");
        if let Err(err) = self.list.refresh().await {
            warn!(error = %err, "list refresh after delete failed");
        }
        Ok(DeleteOutcome::Deleted(id))
    }

    fn mutate<T>(&self, f: impl FnOnce(&mut ModalInner) -> T) -> T {
        let mut inner = self.lock();
        let out = f(&mut inner);
        self.updates.send_replace(inner.snapshot.clone());
        out
    }

    fn lock(&self) -> MutexGuard<'_, ModalInner> {
        self.inner.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}
