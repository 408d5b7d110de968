//! Directory-service contract consumed by the console.
//!
//! The console never talks to storage directly; it drives a [`DirectoryService`]
//! and keeps transient copies of what it returns.
//!
pub mod memory;

use std::collections::BTreeSet;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::DirectoryError;

pub use memory::{DirectorySeed, InMemoryDirectory};

/// Record identity. `0` marks a record that has not been persisted yet.
pub type UserId = i64;

/// Identifier of a role that can be granted to a user.
pub type RoleName = String;

/// A user as stored by the directory.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserRecord {
    #[serde(default)]
    pub id: UserId,
    pub first_name: String,
    pub last_name: String,
    #[serde(default)]
    pub user_type: String,
    #[serde(default)]
    pub department: String,
    pub email_address: String,
    #[serde(default)]
    pub is_active: bool,
    #[serde(default)]
    pub role_names: BTreeSet<RoleName>,
    /// Organization group the user is attached to, as a `/`-joined path.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub group_path: Option<String>,
}

impl UserRecord {
    /// Blank record used when creating a user.
    pub fn blank() -> Self {
        Self::default()
    }

    pub fn is_persisted(&self) -> bool {
        self.id != 0
    }

    pub fn full_name(&self) -> String {
        match (self.first_name.is_empty(), self.last_name.is_empty()) {
            (false, false) => format!("{} {}", self.first_name, self.last_name),
            (false, true) => self.first_name.clone(),
            (true, false) => self.last_name.clone(),
            (true, true) => String::new(),
        }
    }
}

/// One page of a server-ordered listing plus the total across all pages.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PagedResult<T> {
    pub items: Vec<T>,
    pub total_count: u64,
}

impl<T> PagedResult<T> {
    pub fn empty() -> Self {
        Self {
            items: Vec::new(),
            total_count: 0,
        }
    }

    /// Number of pages needed to show `total_count` items; at least one.
    pub fn page_count(&self, page_size: usize) -> usize {
        let size = page_size.max(1) as u64;
        let pages = self.total_count.div_ceil(size);
        usize::try_from(pages).unwrap_or(usize::MAX).max(1)
    }
}

impl<T> Default for PagedResult<T> {
    fn default() -> Self {
        Self::empty()
    }
}

/// Window and filter of a listing request.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListQuery {
    #[serde(rename = "maxResultCount")]
    pub page_size: usize,
    pub skip_count: usize,
    #[serde(default)]
    pub keyword: String,
}

impl ListQuery {
    pub fn first_page(page_size: usize) -> Self {
        Self {
            page_size: page_size.max(1),
            skip_count: 0,
            keyword: String::new(),
        }
    }

    /// 1-based page number derived from the skip window.
    pub fn page_number(&self) -> usize {
        self.skip_count / self.page_size.max(1) + 1
    }

    pub fn for_page(&self, page_number: usize) -> Self {
        Self {
            skip_count: (page_number.max(1) - 1) * self.page_size,
            ..self.clone()
        }
    }
}

/// CRUD and role listing for user records.
#[async_trait]
pub trait DirectoryService: Send + Sync {
    async fn get_all(&self, query: &ListQuery) -> Result<PagedResult<UserRecord>, DirectoryError>;

    /// Fails with [`DirectoryError::NotFound`] for an unknown id.
    async fn get(&self, id: UserId) -> Result<UserRecord, DirectoryError>;

    async fn create(&self, record: UserRecord) -> Result<UserRecord, DirectoryError>;

    /// `record.id` must be non-zero.
    async fn update(&self, record: UserRecord) -> Result<UserRecord, DirectoryError>;

    async fn delete(&self, id: UserId) -> Result<(), DirectoryError>;

    async fn get_roles(&self) -> Result<Vec<RoleName>, DirectoryError>;
}
