//! A normalized in-memory result cache for GraphQL responses.
//!
//! A GraphQL response is a tree keyed by the shape of the query, so two
//! queries over the same entity duplicate data. This crate normalizes
//! responses into a flat entity map keyed by identity, so an update to one
//! entity is visible to every query that touches it. Field arguments,
//! aliases and directives are encoded into the storage keys, so re-reading
//! an operation reconstructs exactly the tree the server returned.
//!
//! The cache is snapshot based: [`Store::write`] never mutates the snapshot
//! it runs against, it returns a new one. Holding the current snapshot in a
//! single swappable cell is the caller's job (the `selene` client does
//! exactly that).
//!
//! # Quick Start
//!
//! ```
//! use selene_normalized_cache::{Store, StoreConfig, Variables};
//! use serde_json::json;
//!
//! let document = graphql_parser::parse_query::<String>("{ viewer { __typename id name } }")
//!     .unwrap()
//!     .into_static();
//! let store = Store::new(StoreConfig::with_id_attrs(["Person/id"]));
//!
//! let response = json!({ "viewer": { "__typename": "Person", "id": "p1", "name": "Ada" } });
//! let (store, _) = store.write(&response, &document, &Variables::new()).unwrap();
//!
//! let data = store.read(&document, &Variables::new(), false).unwrap();
//! assert_eq!(data, Some(response));
//! ```
//!
//! Entities are recognized by the identifying fields configured through
//! [`StoreConfig::id_attrs`], given in stored (typename-namespaced) form
//! such as `"Person/id"`. Sub-maps without an identifying field still
//! normalize: they get a synthetic cache marker derived from their path,
//! like `root.viewer.profile`.

mod error;
mod keys;
mod read;
mod walk;
mod write;

pub mod store;

pub use error::StoreError;
pub use store::{EntityRecord, EntityRef, FieldValue, Store, StoreConfig, DEFAULT_CACHE_KEY};
pub use walk::{operation_meta, FieldSelection, OperationKind, OperationMeta};

/// A parsed GraphQL document, as produced by [`graphql_parser::parse_query`]
/// plus `into_static`.
pub type Document = graphql_parser::query::Document<'static, String>;

/// Caller-supplied variable bindings for one operation.
pub type Variables = serde_json::Map<String, serde_json::Value>;
