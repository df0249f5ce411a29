//! Fragments and the collections that hold them.

use serde::{Deserialize, Serialize};

use whisperer_embeddings::Embedding;

use crate::error::{ContextError, Result};

/// A unit of retrievable text: a slice of a source file plus its embedding.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Fragment {
    /// Path of the originating file.
    pub source: String,

    /// The literal substring of the source file.
    pub text: String,

    /// Embedding of `text`.
    pub embedding: Embedding,
}

impl Fragment {
    /// Create a new fragment.
    pub fn new(source: impl Into<String>, text: impl Into<String>, embedding: Embedding) -> Self {
        Self {
            source: source.into(),
            text: text.into(),
            embedding,
        }
    }

    /// Length of this fragment's embedding.
    pub fn dimension(&self) -> usize {
        self.embedding.len()
    }
}

/// A fragment scored against a query. Produced per query, never persisted.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScoredFragment {
    /// The matched fragment.
    #[serde(flatten)]
    pub fragment: Fragment,

    /// Cosine similarity to the query, in [-1, 1].
    pub score: f32,
}

/// A named, ordered set of fragments sharing one embedding space.
///
/// Construction checks that every embedding has the same length, so a
/// `Collection` value is never corrupt.
#[derive(Debug, Clone)]
pub struct Collection {
    name: String,
    fragments: Vec<Fragment>,
    dimension: Option<usize>,
}

impl Collection {
    /// Build a collection, rejecting mixed dimensionality.
    pub fn new(name: impl Into<String>, fragments: Vec<Fragment>) -> Result<Self> {
        let name = name.into();
        let dimension = validate_dimensions(&fragments).map_err(|reason| {
            ContextError::CorruptCollection {
                name: name.clone(),
                reason,
            }
        })?;

        Ok(Self {
            name,
            fragments,
            dimension,
        })
    }

    /// Collection name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Fragments in stored order.
    pub fn fragments(&self) -> &[Fragment] {
        &self.fragments
    }

    /// Shared embedding length, or `None` for an empty collection.
    pub fn dimension(&self) -> Option<usize> {
        self.dimension
    }

    /// Number of fragments.
    pub fn len(&self) -> usize {
        self.fragments.len()
    }

    /// Whether the collection holds no fragments.
    pub fn is_empty(&self) -> bool {
        self.fragments.is_empty()
    }
}

/// Check that all fragments share one non-zero embedding length.
///
/// Returns that length, or `None` when there are no fragments.
pub(crate) fn validate_dimensions(fragments: &[Fragment]) -> std::result::Result<Option<usize>, String> {
    let Some(first) = fragments.first() else {
        return Ok(None);
    };

    let expected = first.dimension();
    if expected == 0 {
        return Err(format!("fragment 0 ({}) has an empty embedding", first.source));
    }

    for (i, fragment) in fragments.iter().enumerate().skip(1) {
        if fragment.dimension() != expected {
            return Err(format!(
                "fragment {i} ({}) has {} dimensions, expected {expected}",
                fragment.source,
                fragment.dimension()
            ));
        }
    }

    Ok(Some(expected))
}
