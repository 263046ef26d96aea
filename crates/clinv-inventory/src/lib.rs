//! clinv-inventory: cloud asset inventory core
//!
//! Reconciles provider-fetched resource data with user-curated risk
//! management annotations into a single object graph, and answers searches
//! and derived-set queries over it.

pub mod error;
pub mod inventory;
pub mod kind;
pub mod merge;
pub mod model;
pub mod registry;
pub mod scoring;
pub mod search;
pub mod source;
pub mod store;

pub use error::{InventoryError, ReferenceWarning};
pub use inventory::{Inventory, RegenerateSummary};
pub use kind::Kind;
pub use merge::{DataSet, KindData};
pub use model::{Details, Entity, MonitorStatus, Record, State};
pub use scoring::{ScoringWeights, ServiceScore};
pub use search::{SearchQuery, SearchResults};
pub use source::{FetchScope, SourceAdapter, SourceError, SourceRegistry};
pub use store::Store;
