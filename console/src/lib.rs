//! # Practice Console
//!
//! The IO edge of the practice administration console: an HTTP client for
//! the REST backend, file-backed local storage, and the per-entity
//! reconciler that keeps records usable while the backend is unreachable.
//!
//! Everything that does not touch the network or the filesystem lives in
//! [`practice_engine`].

pub mod config;
pub mod error;
pub mod reconciler;
pub mod remote;
pub mod screen;
pub mod storage;

pub use config::{Config, ConfigError};
pub use error::{ConsoleError, Result, CONNECTIVITY_MESSAGE};
pub use reconciler::{EntityReconciler, MigrationReport, WriteOutcome};
pub use remote::{HttpRemoteStore, RemoteError, RemoteStore};
pub use screen::{FormMode, FormModal, ListScreen, OFFLINE_BANNER, SAVED_LOCALLY_NOTICE};
pub use storage::FileStorage;
