//! Library crate for usrdir-console.
//!
//! This crate exposes the building blocks of the console:
//! - Directory collaborator contract and an in-memory implementation (`directory`)
//! - Paged user list controller (`list`)
//! - Create/edit/delete modal controller (`modal`)
//! - Group hierarchy index with aggregate counts and search (`tree`)
//! - Configuration files (`config`)
//! - Application state, key handling and UI rendering (`app`, `ui`)
//!
//! It is used by the `usrdir-console` binary and by tests.
#![doc = include_str!("../README.md")]
#![deny(rustdoc::broken_intra_doc_links)]
#![cfg_attr(docsrs, feature(doc_cfg))]

pub mod app;
pub mod config;
pub mod directory;
pub mod error;
pub mod list;
pub mod modal;
pub mod search;
pub mod tree;
pub mod ui;

// Re-export commonly used items at the crate root for convenience
pub use directory::{DirectoryService, InMemoryDirectory, ListQuery, PagedResult, UserRecord};
/// Convenient error and result types shared across the crate.
pub use error::{ConsoleError, DirectoryError, DynError, Result};
pub use list::{ListSnapshot, ListStatus, UserList};
pub use modal::{ModalMode, ModalSnapshot, UserForm, UserModal};
pub use tree::{EntityTreeIndex, GroupSource, SearchView};
