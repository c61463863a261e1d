//! Vector storage for ingested interviews
//!
//! - `VectorIndex`: flat L2 index, one vector per interview
//! - `MetadataStore`: position ↔ id list plus per-interview metadata
//! - `PersistenceManager`: binary index image and JSON sidecar
//!
//! The index and the metadata store are always mutated together; position `i`
//! in one names the interview at `ids()[i]` in the other.
mod metadata;
mod persistence;
mod vector_index;

pub use metadata::{MetadataError, MetadataImage, MetadataStore};
pub use persistence::{
    LoadOutcome, PersistenceError, PersistenceManager, INDEX_FILE, METADATA_FILE,
};
pub use vector_index::{l2_distance, Neighbor, VectorIndex, VectorIndexError};
