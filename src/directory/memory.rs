//! In-process [`DirectoryService`] backed by a seed file.
//!
//! Used by the console binary when no remote directory is configured, and by tests.
//!
use std::collections::{BTreeMap, BTreeSet};
use std::path::Path;
use std::sync::{Mutex, MutexGuard};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::{DirectoryService, ListQuery, PagedResult, RoleName, UserId, UserRecord};
use crate::error::{Context, DirectoryError, Result, simple_error};
use crate::search::user_matches;

const SAMPLE_SEED: &str = include_str!("../../data/users.json");

/// On-disk shape of a directory seed.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct DirectorySeed {
    #[serde(default)]
    pub roles: Vec<RoleName>,
    #[serde(default)]
    pub users: Vec<UserRecord>,
}

impl DirectorySeed {
    /// Parse a seed; explicit ids must be unique.
    pub fn from_json(text: &str) -> Result<Self> {
        let seed: Self = serde_json::from_str(text).with_ctx(|| "parse directory seed".to_string())?;
        let mut seen = BTreeSet::new();
        for user in seed.users.iter().filter(|u| u.is_persisted()) {
            if !seen.insert(user.id) {
                return Err(simple_error(format!("duplicate user id {} in directory seed", user.id)));
            }
        }
        Ok(seed)
    }

    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)
            .with_ctx(|| format!("read directory seed {}", path.display()))?;
        Self::from_json(&text)
    }

    /// Sample data shipped with the binary.
    pub fn sample() -> Result<Self> {
        Self::from_json(SAMPLE_SEED)
    }
}

struct Store {
    users: BTreeMap<UserId, UserRecord>,
    next_id: UserId,
}

pub struct InMemoryDirectory {
    roles: Vec<RoleName>,
    store: Mutex<Store>,
}

impl InMemoryDirectory {
    pub fn new(seed: DirectorySeed) -> Self {
        let mut users = BTreeMap::new();
        let mut next_id = 1;
        for mut user in seed.users {
            if user.id <= 0 {
                user.id = next_id;
            }
            next_id = next_id.max(user.id + 1);
            users.insert(user.id, user);
        }
        Self {
            roles: seed.roles,
            store: Mutex::new(Store { users, next_id }),
        }
    }

    pub fn empty() -> Self {
        Self::new(DirectorySeed::default())
    }

    pub fn len(&self) -> usize {
        self.lock().users.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn lock(&self) -> MutexGuard<'_, Store> {
        self.store.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

#[async_trait]
impl DirectoryService for InMemoryDirectory {
    async fn get_all(&self, query: &ListQuery) -> std::result::Result<PagedResult<UserRecord>, DirectoryError> {
        let store = self.lock();
        let matching: Vec<&UserRecord> = store
            .users
            .values()
            .filter(|u| user_matches(u, &query.keyword))
            .collect();
        let total_count = matching.len() as u64;
        let items = matching
            .into_iter()
            .skip(query.skip_count)
            .take(query.page_size)
            .cloned()
            .collect::<Vec<_>>();
        debug!(
            keyword = %query.keyword,
            skip = query.skip_count,
            returned = items.len(),
            total = total_count,
            "listed users"
        );
        Ok(PagedResult { items, total_count })
    }

    async fn get(&self, id: UserId) -> std::result::Result<UserRecord, DirectoryError> {
        self.lock()
            .users
            .get(&id)
            .cloned()
            .ok_or(DirectoryError::NotFound(id))
    }

    async fn create(&self, mut record: UserRecord) -> std::result::Result<UserRecord, DirectoryError> {
        if record.is_persisted() {
            return Err(DirectoryError::Rejected(format!(
                "create expects an unsaved record, got id {}",
                record.id
            )));
        }
        let mut store = self.lock();
        record.id = store.next_id;
        store.next_id += 1;
        store.users.insert(record.id, record.clone());
        debug!(id = record.id, "created user");
        Ok(record)
    }

    async fn update(&self, record: UserRecord) -> std::result::Result<UserRecord, DirectoryError> {
        if !record.is_persisted() {
            return Err(DirectoryError::Rejected("update requires a saved record".to_string()));
        }
        let mut store = self.lock();
        match store.users.get_mut(&record.id) {
            Some(slot) => {
                *slot = record.clone();
                debug!(id = record.id, "updated user");
                Ok(record)
            }
            None => Err(DirectoryError::NotFound(record.id)),
        }
    }

    async fn delete(&self, id: UserId) -> std::result::Result<(), DirectoryError> {
        match self.lock().users.remove(&id) {
            Some(_) => {
                debug!(id, "deleted user");
                Ok(())
            }
            None => Err(DirectoryError::NotFound(id)),
        }
    }

    async fn get_roles(&self) -> std::result::Result<Vec<RoleName>, DirectoryError> {
        Ok(self.roles.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn seed() -> DirectorySeed {
        DirectorySeed::sample().unwrap()
    }

    #[tokio::test]
    async fn pages_are_sliced_after_filtering() {
        let dir = InMemoryDirectory::new(seed());
        let total = dir.len() as u64;

        let first = dir.get_all(&ListQuery::first_page(10)).await.unwrap();
        assert_eq!(first.items.len(), 10);
        assert_eq!(first.total_count, total);

        let second = dir.get_all(&ListQuery::first_page(10).for_page(2)).await.unwrap();
        assert_eq!(second.items.len() as u64, total - 10);
        assert!(second.items.iter().all(|u| u.id > first.items[9].id));

        let mut q = ListQuery::first_page(10);
        q.keyword = "finance".into();
        let filtered = dir.get_all(&q).await.unwrap();
        assert_eq!(filtered.total_count, 2);
        assert!(filtered.items.iter().all(|u| u.department == "Finance"));
    }

    #[tokio::test]
    async fn create_assigns_next_id_and_rejects_saved_records() {
        let dir = InMemoryDirectory::new(seed());
        let before = dir.len();
        let created = dir
            .create(UserRecord {
                first_name: "Zed".into(),
                last_name: "Zero".into(),
                email_address: "zed@example.com".into(),
                ..UserRecord::blank()
            })
            .await
            .unwrap();
        assert_eq!(created.id, before as i64 + 1);
        assert_eq!(dir.get(created.id).await.unwrap().first_name, "Zed");

        let err = dir.create(created).await.unwrap_err();
        assert!(matches!(err, DirectoryError::Rejected(_)));
    }

    #[tokio::test]
    async fn update_and_delete_report_unknown_ids() {
        let dir = InMemoryDirectory::empty();
        let ghost = UserRecord {
            id: 42,
            ..UserRecord::blank()
        };
        assert_eq!(dir.update(ghost).await.unwrap_err(), DirectoryError::NotFound(42));
        assert_eq!(dir.delete(42).await.unwrap_err(), DirectoryError::NotFound(42));
        assert_eq!(dir.get(42).await.unwrap_err(), DirectoryError::NotFound(42));
        assert!(matches!(
            dir.update(UserRecord::blank()).await.unwrap_err(),
            DirectoryError::Rejected(_)
        ));
    }

    #[test]
    fn seed_with_duplicate_ids_is_rejected() {
        let err = DirectorySeed::from_json(
            r#"{"users":[
                {"id":4,"firstName":"A","lastName":"One","emailAddress":"a@x.io"},
                {"id":4,"firstName":"B","lastName":"Two","emailAddress":"b@x.io"}]}"#,
        )
        .unwrap_err();
        assert_eq!(err.to_string(), "duplicate user id 4 in directory seed");
    }

    #[test]
    fn seed_without_ids_gets_sequential_ids() {
        let seed = DirectorySeed::from_json(
            r#"{"roles":["User"],"users":[
                {"firstName":"A","lastName":"One","emailAddress":"a@x.io"},
                {"firstName":"B","lastName":"Two","emailAddress":"b@x.io"}]}"#,
        )
        .unwrap();
        let dir = InMemoryDirectory::new(seed);
        let ids: Vec<_> = dir.lock().users.keys().copied().collect();
        assert_eq!(ids, vec![1, 2]);
    }
}
