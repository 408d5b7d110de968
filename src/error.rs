use std::fmt::{Display, Formatter};

use thiserror::Error;

use crate::directory::UserId;

pub type DynError = Box<dyn std::error::Error + Send + Sync + 'static>;
pub type Result<T> = std::result::Result<T, DynError>;

/// Failures reported by a [`DirectoryService`](crate::directory::DirectoryService).
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DirectoryError {
    #[error("user {0} not found")]
    NotFound(UserId),

    #[error("directory transport failed: {0}")]
    Transport(String),

    #[error("directory rejected the request: {0}")]
    Rejected(String),
}

/// Outcome errors of the list and modal controllers.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConsoleError {
    #[error("form has {} invalid field(s)", .0.len())]
    Validation(Vec<FieldError>),

    #[error("user {0} not found")]
    NotFound(UserId),

    #[error("directory transport failed: {0}")]
    Transport(String),

    #[error("directory rejected the request: {0}")]
    Rejected(String),

    #[error("no user form is open")]
    ModalClosed,

    /// A save for the open form has not finished yet.
    #[error("the form is busy with another request")]
    Busy,
}

impl From<DirectoryError> for ConsoleError {
    fn from(err: DirectoryError) -> Self {
        match err {
            DirectoryError::NotFound(id) => ConsoleError::NotFound(id),
            DirectoryError::Transport(msg) => ConsoleError::Transport(msg),
            DirectoryError::Rejected(msg) => ConsoleError::Rejected(msg),
        }
    }
}

/// Misuse of the group tree index.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TreeError {
    #[error("unknown group node {0}")]
    UnknownNode(usize),

    #[error("group '{0}' has children; its count is derived")]
    NotALeaf(String),
}

/// Form fields checked by local validation.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum FormField {
    FirstName,
    LastName,
    UserType,
    Department,
    EmailAddress,
    Roles,
}

impl FormField {
    pub fn label(self) -> &'static str {
        match self {
            FormField::FirstName => "First name",
            FormField::LastName => "Last name",
            FormField::UserType => "User type",
            FormField::Department => "Department",
            FormField::EmailAddress => "Email address",
            FormField::Roles => "Roles",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldError {
    pub field: FormField,
    pub message: String,
}

impl FieldError {
    pub fn new(field: FormField, message: impl Into<String>) -> Self {
        Self {
            field,
            message: message.into(),
        }
    }
}

impl Display for FieldError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.field.label(), self.message)
    }
}

pub trait Context<T> {
    fn with_ctx<F: FnOnce() -> String>(self, f: F) -> Result<T>;
}

#[derive(Debug)]
pub struct WithContextError {
    pub context: String,
    pub source: DynError,
}

impl Display for WithContextError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.context, self.source)
    }
}

impl std::error::Error for WithContextError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        Some(&*self.source)
    }
}

impl<T, E> Context<T> for std::result::Result<T, E>
where
    E: std::error::Error + Send + Sync + 'static,
{
    fn with_ctx<F: FnOnce() -> String>(self, f: F) -> Result<T> {
        self.map_err(|e| {
            Box::new(WithContextError {
                context: f(),
                source: e.into(),
            }) as DynError
        })
    }
}

#[derive(Debug)]
pub struct SimpleError(pub String);

impl SimpleError {
    pub fn new(msg: impl Into<String>) -> Self {
        Self(msg.into())
    }
}

impl Display for SimpleError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::error::Error for SimpleError {}

pub fn simple_error(msg: impl Into<String>) -> DynError {
    Box::new(SimpleError::new(msg))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn directory_errors_map_onto_console_taxonomy() {
        assert_eq!(
            ConsoleError::from(DirectoryError::NotFound(7)),
            ConsoleError::NotFound(7)
        );
        assert_eq!(
            ConsoleError::from(DirectoryError::Transport("reset".into())),
            ConsoleError::Transport("reset".into())
        );
    }

    #[test]
    fn context_wraps_source_error() {
        let res: std::result::Result<(), std::io::Error> =
            Err(std::io::Error::new(std::io::ErrorKind::NotFound, "gone"));
        let err = res.with_ctx(|| "read users.json".to_string()).unwrap_err();
        assert_eq!(err.to_string(), "read users.json: gone");
    }
}
