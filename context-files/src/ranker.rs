//! Top-k similarity ranking over a fragment collection.
//!
//! Every fragment is scored against the query with cosine similarity and the
//! full list is sorted, which is exact and cheap at single-repository scale.
//! Ties keep their original input order, so identical inputs always produce
//! identical output.

use std::cmp::Reverse;

use ordered_float::OrderedFloat;
use tracing::debug;

use whisperer_embeddings::cosine_similarity;

use crate::error::{ContextError, Result};
use crate::fragment::{Collection, Fragment, ScoredFragment, validate_dimensions};

/// Default number of fragments returned per query.
pub const DEFAULT_TOP_K: usize = 5;

/// Rank a loose slice of fragments against `query`.
///
/// Mixed fragment dimensionality is rejected as a corrupt collection before
/// any scoring happens.
pub fn rank(query: &[f32], fragments: &[Fragment], k: usize) -> Result<Vec<ScoredFragment>> {
    let dimension = validate_dimensions(fragments).map_err(|reason| {
        ContextError::CorruptCollection {
            name: "<unnamed>".to_string(),
            reason,
        }
    })?;
    score_and_select(query, fragments, dimension, k)
}

/// Rank a validated collection against `query`.
pub fn rank_collection(query: &[f32], collection: &Collection, k: usize) -> Result<Vec<ScoredFragment>> {
    score_and_select(query, collection.fragments(), collection.dimension(), k)
}

fn score_and_select(
    query: &[f32],
    fragments: &[Fragment],
    dimension: Option<usize>,
    k: usize,
) -> Result<Vec<ScoredFragment>> {
    match dimension {
        Some(expected) if expected != query.len() => {
            return Err(ContextError::DimensionMismatch {
                expected,
                actual: query.len(),
            });
        }
        _ => {}
    }

    let mut scores: Vec<(usize, f32)> = Vec::with_capacity(fragments.len());
    for (i, fragment) in fragments.iter().enumerate() {
        scores.push((i, cosine_similarity(query, &fragment.embedding)?));
    }

    // Stable sort: equal scores stay in input order.
    scores.sort_by_key(|&(_, score)| Reverse(OrderedFloat(score)));
    scores.truncate(k);

    debug!(
        "Ranked {} fragments, returning {}",
        fragments.len(),
        scores.len()
    );

    Ok(scores
        .into_iter()
        .map(|(i, score)| ScoredFragment {
            fragment: fragments[i].clone(),
            score,
        })
        .collect())
}
