//! # Practice Engine
//!
//! Offline-first record handling for the practice administration console.
//!
//! The console manages organizations, businesses, locations, providers,
//! insurances and users through a REST backend. When the backend cannot be
//! reached, newly created records are kept in local persistent storage and
//! shown alongside the server's records until they can be re-submitted.
//! This crate holds every piece of that logic that does not touch the
//! network.
//!
//! ## Design Principles
//!
//! - **No network**: HTTP lives in the console crate; storage is injected
//!   through [`KeyValueStorage`]
//! - **Deterministic**: the same remote and local lists always reconcile to
//!   the same view
//! - **Typed at the boundary**: every entity has an [`EntitySchema`] that
//!   validates form input and normalizes wire records
//!
//! ## Core Concepts
//!
//! ### Records
//!
//! A [`Record`] is an integer id plus a map of named fields. Its [`Origin`]
//! says whether the authoritative copy lives on the server or only in local
//! storage.
//!
//! ### Identifiers
//!
//! Local ids are allocated sequentially with [`next_local_id`]: one past the
//! highest id known from either source. They never collide with server ids
//! that were known at allocation time, and [`reconcile`] renumbers any local
//! record that later turns out to collide.
//!
//! ### Fallback
//!
//! [`RetryPolicy`] decides, from an [`ErrorClass`] alone, whether a failed
//! write should be kept locally. [`plan_update`] and [`plan_delete`] decide
//! whether an edit targets the server or the local store.
//!
//! ## Quick Start
//!
//! ```rust
//! use practice_engine::{
//!     practice_schema, reconcile, LocalFallbackStore, MemoryStorage, Record,
//! };
//! use serde_json::json;
//! use std::collections::BTreeSet;
//!
//! let schema = practice_schema();
//! let locations = schema.get_entity("locations").unwrap();
//!
//! // A record as the server sends it
//! let remote = locations
//!     .record_from_wire(&json!({"LOCATION_ID": 1, "LOCATION_NAME": "Main", "IS_ACTIVE": 1}))
//!     .unwrap();
//! assert_eq!(remote.fields["active"], json!(true));
//!
//! // A record kept offline
//! let mut store = LocalFallbackStore::new(MemoryStorage::new());
//! let fields = locations.with_defaults(json!({"name": "Annex"}).as_object().unwrap());
//! store.save_all("locations", &[Record::new_local(2, fields)]).unwrap();
//! store.save_local_ids("locations", &BTreeSet::from([2])).unwrap();
//!
//! let result = reconcile(
//!     vec![remote],
//!     store.load_all("locations").unwrap(),
//!     &BTreeSet::new(),
//! );
//! let ids: Vec<_> = result.view.iter().map(|r| r.id).collect();
//! assert_eq!(ids, vec![1, 2]);
//! ```

pub mod catalog;
pub mod error;
pub mod filter;
pub mod ids;
pub mod local_store;
pub mod plan;
pub mod policy;
pub mod reconcile;
pub mod record;
pub mod schema;

// Re-export main types at crate root
pub use catalog::practice_schema;
pub use error::Error;
pub use filter::{filter_records, matches_filter};
pub use ids::{is_legacy_id, is_legacy_local_id, next_local_id, IdAllocator, LEGACY_ID_THRESHOLD};
pub use local_store::{KeyValueStorage, LocalFallbackStore, MemoryStorage};
pub use plan::{plan_delete, plan_update, WritePlan};
pub use policy::{ErrorClass, FallbackDecision, RetryPolicy};
pub use reconcile::{reconcile, ReconcileResult, Renumbered};
pub use record::{Origin, Record};
pub use schema::{EntitySchema, FieldDef, FieldType, Schema};

/// Type aliases for clarity
pub type RecordId = i64;
pub type EntityName = String;
pub type FieldName = String;
pub type Fields = serde_json::Map<String, serde_json::Value>;
