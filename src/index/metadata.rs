//! Position ↔ interview id correspondence and per-interview metadata

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use thiserror::Error;

use crate::transcript::InterviewMetadata;

#[derive(Error, Debug)]
pub enum MetadataError {
    #[error("Duplicate interview id in id list: {0}")]
    DuplicateId(String),

    #[error("Interview id cannot be empty")]
    EmptyId,
}

/// Serialized form of the store (the JSON sidecar minus its timestamp)
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MetadataImage {
    pub interview_ids: Vec<String>,
    pub interview_metadata: BTreeMap<String, InterviewMetadata>,
}

/// Ordered id list mirroring `VectorIndex` positions, plus metadata keyed by id
///
/// `ids[i]` names the interview whose vector sits at position `i`. Removal uses
/// the same shift semantics as `VectorIndex::remove`.
#[derive(Debug, Clone, Default)]
pub struct MetadataStore {
    ids: Vec<String>,
    positions: HashMap<String, usize>,
    metadata: BTreeMap<String, InterviewMetadata>,
}

impl MetadataStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Rebuild from a persisted image, rejecting duplicate or empty ids
    pub fn from_image(image: MetadataImage) -> Result<Self, MetadataError> {
        let mut positions = HashMap::with_capacity(image.interview_ids.len());
        for (position, id) in image.interview_ids.iter().enumerate() {
            if id.is_empty() {
                return Err(MetadataError::EmptyId);
            }
            if positions.insert(id.clone(), position).is_some() {
                return Err(MetadataError::DuplicateId(id.clone()));
            }
        }

        let mut metadata = image.interview_metadata;
        metadata.retain(|id, _| positions.contains_key(id));

        Ok(Self {
            ids: image.interview_ids,
            positions,
            metadata,
        })
    }

    pub fn to_image(&self) -> MetadataImage {
        MetadataImage {
            interview_ids: self.ids.clone(),
            interview_metadata: self.metadata.clone(),
        }
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    pub fn contains(&self, id: &str) -> bool {
        self.positions.contains_key(id)
    }

    /// Append `id` at the next position
    pub fn record(&mut self, id: &str, metadata: InterviewMetadata) -> Result<usize, MetadataError> {
        if id.is_empty() {
            return Err(MetadataError::EmptyId);
        }
        if self.contains(id) {
            return Err(MetadataError::DuplicateId(id.to_string()));
        }

        let position = self.ids.len();
        self.ids.push(id.to_string());
        self.positions.insert(id.to_string(), position);
        self.metadata.insert(id.to_string(), metadata);
        Ok(position)
    }

    pub fn position_of(&self, id: &str) -> Option<usize> {
        self.positions.get(id).copied()
    }

    pub fn id_at(&self, position: usize) -> Option<&str> {
        self.ids.get(position).map(String::as_str)
    }

    pub fn metadata(&self, id: &str) -> Option<&InterviewMetadata> {
        self.metadata.get(id)
    }

    /// Remove `id`, returning its former position; later ids shift down by one
    pub fn remove(&mut self, id: &str) -> Option<usize> {
        let position = self.positions.remove(id)?;

        self.ids.remove(position);
        self.metadata.remove(id);
        for later in &self.ids[position..] {
            if let Some(p) = self.positions.get_mut(later) {
                *p -= 1;
            }
        }

        Some(position)
    }

    /// Interview ids in position order
    pub fn ids(&self) -> &[String] {
        &self.ids
    }

    pub fn clear(&mut self) {
        self.ids.clear();
        self.positions.clear();
        self.metadata.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn meta(project: &str) -> InterviewMetadata {
        InterviewMetadata {
            project_name: project.to_string(),
            interview_type: "discovery".to_string(),
            date: "2024-03-01".to_string(),
        }
    }

    fn store_with(ids: &[&str]) -> MetadataStore {
        let mut store = MetadataStore::new();
        for id in ids {
            store.record(id, meta("travel")).unwrap();
        }
        store
    }

    #[test]
    fn test_record_assigns_sequential_positions() {
        let store = store_with(&["a", "b", "c"]);
        assert_eq!(store.position_of("a"), Some(0));
        assert_eq!(store.position_of("c"), Some(2));
        assert_eq!(store.id_at(1), Some("b"));
        assert_eq!(store.id_at(3), None);
    }

    #[test]
    fn test_record_rejects_duplicates_and_empty() {
        let mut store = store_with(&["a"]);
        assert!(matches!(
            store.record("a", meta("x")),
            Err(MetadataError::DuplicateId(_))
        ));
        assert!(matches!(
            store.record("", meta("x")),
            Err(MetadataError::EmptyId)
        ));
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn test_remove_shifts_positions() {
        let mut store = store_with(&["a", "b", "c", "d"]);

        assert_eq!(store.remove("b"), Some(1));
        assert_eq!(store.ids(), &["a", "c", "d"]);
        assert_eq!(store.position_of("c"), Some(1));
        assert_eq!(store.position_of("d"), Some(2));
        assert!(store.metadata("b").is_none());
        assert_eq!(store.remove("b"), None);
    }

    #[test]
    fn test_metadata_survives_position_shift() {
        let mut store = MetadataStore::new();
        store.record("a", meta("alpha")).unwrap();
        store.record("b", meta("beta")).unwrap();

        store.remove("a");
        assert_eq!(store.metadata("b").unwrap().project_name, "beta");
    }

    #[test]
    fn test_image_roundtrip() {
        let store = store_with(&["x", "y"]);
        let restored = MetadataStore::from_image(store.to_image()).unwrap();
        assert_eq!(restored.ids(), store.ids());
        assert_eq!(restored.position_of("y"), Some(1));
        assert_eq!(restored.metadata("x"), store.metadata("x"));
    }

    #[test]
    fn test_image_with_duplicate_ids_rejected() {
        let image = MetadataImage {
            interview_ids: vec!["a".to_string(), "a".to_string()],
            interview_metadata: BTreeMap::new(),
        };
        assert!(matches!(
            MetadataStore::from_image(image),
            Err(MetadataError::DuplicateId(_))
        ));
    }

    #[test]
    fn test_image_drops_orphan_metadata() {
        let mut interview_metadata = BTreeMap::new();
        interview_metadata.insert("ghost".to_string(), meta("gone"));
        let image = MetadataImage {
            interview_ids: vec!["a".to_string()],
            interview_metadata,
        };

        let store = MetadataStore::from_image(image).unwrap();
        assert!(store.metadata("ghost").is_none());
    }
}
