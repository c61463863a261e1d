/// Flat L2 vector index
use std::cmp::Ordering;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum VectorIndexError {
    #[error("Vector dimension must be greater than 0")]
    ZeroDimension,

    #[error("Invalid dimension: expected {expected}, got {actual}")]
    InvalidDimension { expected: usize, actual: usize },

    #[error("Position {position} out of bounds for index of {len} vectors")]
    OutOfBounds { position: usize, len: usize },

    #[error("Raw buffer of {len} floats is not a multiple of dimension {dimension}")]
    RaggedBuffer { len: usize, dimension: usize },
}

/// A search hit: stored position and its Euclidean distance to the query
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Neighbor {
    pub position: usize,
    pub distance: f32,
}

/// Exhaustive nearest-neighbour index over fixed-dimension vectors
///
/// Vectors live back to back in one buffer; position `i` occupies
/// `data[i * dimension..(i + 1) * dimension]`. Removing a position shifts every
/// later vector down by one, exactly like `Vec::remove`.
#[derive(Debug, Clone)]
pub struct VectorIndex {
    dimension: usize,
    data: Vec<f32>,
}

impl VectorIndex {
    /// Create a new empty index
    pub fn new(dimension: usize) -> Result<Self, VectorIndexError> {
        if dimension == 0 {
            return Err(VectorIndexError::ZeroDimension);
        }

        Ok(Self {
            dimension,
            data: Vec::new(),
        })
    }

    /// Rebuild an index from a contiguous buffer of `len * dimension` floats
    pub fn from_raw(dimension: usize, data: Vec<f32>) -> Result<Self, VectorIndexError> {
        if dimension == 0 {
            return Err(VectorIndexError::ZeroDimension);
        }
        if data.len() % dimension != 0 {
            return Err(VectorIndexError::RaggedBuffer {
                len: data.len(),
                dimension,
            });
        }

        Ok(Self { dimension, data })
    }

    /// The contiguous vector buffer, in position order
    pub fn as_raw(&self) -> &[f32] {
        &self.data
    }

    /// Get vector dimension
    pub fn dimension(&self) -> usize {
        self.dimension
    }

    /// Get the number of vectors in the index
    pub fn len(&self) -> usize {
        self.data.len() / self.dimension
    }

    /// Check if index is empty
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Append a vector, returning the position it was stored at
    pub fn append(&mut self, vector: &[f32]) -> Result<usize, VectorIndexError> {
        self.check_dimension(vector)?;

        let position = self.len();
        self.data.extend_from_slice(vector);
        Ok(position)
    }

    /// Append several vectors; either all are stored or none are
    pub fn append_batch(&mut self, vectors: &[Vec<f32>]) -> Result<(), VectorIndexError> {
        for vector in vectors {
            self.check_dimension(vector)?;
        }

        self.data.reserve(vectors.len() * self.dimension);
        for vector in vectors {
            self.data.extend_from_slice(vector);
        }
        Ok(())
    }

    /// Copy out the vector stored at `position`
    pub fn reconstruct(&self, position: usize) -> Result<Vec<f32>, VectorIndexError> {
        Ok(self.slot(position)?.to_vec())
    }

    /// Remove the vector at `position`; later positions shift down by one
    pub fn remove(&mut self, position: usize) -> Result<Vec<f32>, VectorIndexError> {
        self.slot(position)?;

        let start = position * self.dimension;
        Ok(self
            .data
            .drain(start..start + self.dimension)
            .collect())
    }

    /// Search for the `k` nearest neighbours by L2 distance
    ///
    /// Results are ascending by distance; equal distances keep position order.
    pub fn search(&self, query: &[f32], k: usize) -> Result<Vec<Neighbor>, VectorIndexError> {
        self.check_dimension(query)?;

        let k = k.min(self.len());
        if k == 0 {
            return Ok(Vec::new());
        }

        let mut neighbors: Vec<Neighbor> = self
            .data
            .chunks_exact(self.dimension)
            .enumerate()
            .map(|(position, stored)| Neighbor {
                position,
                distance: l2_distance(query, stored),
            })
            .collect();

        neighbors.sort_by(|a, b| {
            a.distance
                .partial_cmp(&b.distance)
                .unwrap_or(Ordering::Equal)
                .then(a.position.cmp(&b.position))
        });
        neighbors.truncate(k);

        Ok(neighbors)
    }

    /// Remove all vectors
    pub fn clear(&mut self) {
        self.data.clear();
    }

    fn slot(&self, position: usize) -> Result<&[f32], VectorIndexError> {
        let len = self.len();
        if position >= len {
            return Err(VectorIndexError::OutOfBounds { position, len });
        }

        let start = position * self.dimension;
        Ok(&self.data[start..start + self.dimension])
    }

    fn check_dimension(&self, vector: &[f32]) -> Result<(), VectorIndexError> {
        if vector.len() != self.dimension {
            return Err(VectorIndexError::InvalidDimension {
                expected: self.dimension,
                actual: vector.len(),
            });
        }
        Ok(())
    }
}

/// Euclidean distance between two equal-length vectors
pub fn l2_distance(a: &[f32], b: &[f32]) -> f32 {
    a.iter()
        .zip(b.iter())
        .map(|(x, y)| {
            let d = x - y;
            d * d
        })
        .sum::<f32>()
        .sqrt()
}
