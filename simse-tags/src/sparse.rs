// ---------------------------------------------------------------------------
// SparseVector + tag encoder
// ---------------------------------------------------------------------------
//
// A sparse vector stores only the non-zero coordinates of an item or query
// over the category index's dimensions. Entries are kept sorted by
// dimension so export output is deterministic.
// ---------------------------------------------------------------------------

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::category_index::CategoryIndex;
use crate::types::Tag;
use crate::weights::CategoryWeights;

/// Weighted values at or below this magnitude are treated as zero.
pub const ZERO_EPSILON: f64 = 1e-12;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SparseVector {
	entries: BTreeMap<u32, f64>,
}

impl SparseVector {
	pub fn new() -> Self {
		Self::default()
	}

	/// Build from `(dimension, value)` pairs. Effectively-zero and non-finite
	/// values are dropped; a repeated dimension keeps the last value.
	pub fn from_pairs<I>(pairs: I) -> Self
	where
		I: IntoIterator<Item = (u32, f64)>,
	{
		let mut vector = Self::new();
		for (dimension, value) in pairs {
			vector.set(dimension, value);
		}
		vector
	}

	/// Set a coordinate. Returns false if the value was dropped as zero.
	pub fn set(&mut self, dimension: u32, value: f64) -> bool {
		if !value.is_finite() || value.abs() <= ZERO_EPSILON {
			return false;
		}
		self.entries.insert(dimension, value);
		true
	}

	pub fn get(&self, dimension: u32) -> f64 {
		self.entries.get(&dimension).copied().unwrap_or(0.0)
	}

	/// Number of stored (non-zero) entries.
	pub fn nnz(&self) -> usize {
		self.entries.len()
	}

	pub fn is_empty(&self) -> bool {
		self.entries.is_empty()
	}

	/// Iterate `(dimension, value)` in ascending dimension order.
	pub fn iter(&self) -> impl Iterator<Item = (u32, f64)> + '_ {
		self.entries.iter().map(|(d, v)| (*d, *v))
	}

	/// Highest stored dimension, if any.
	pub fn max_dimension(&self) -> Option<u32> {
		self.entries.keys().next_back().copied()
	}

	pub fn to_pairs(&self) -> Vec<(u32, f64)> {
		self.iter().collect()
	}
}

/// Encode tags into a sparse vector over `index`, scaling each confidence by
/// its category weight.
///
/// Tags with an unknown category/value or a confidence `<= 0` are skipped
/// silently. A later tag for the same dimension overwrites an earlier one.
pub fn encode(tags: &[Tag], index: &CategoryIndex, weights: &CategoryWeights) -> SparseVector {
	let mut vector = SparseVector::new();
	for tag in tags {
		if tag.confidence.is_nan() || tag.confidence <= 0.0 {
			continue;
		}
		let Some(dimension) = index.dimension(&tag.category, &tag.value) else {
			continue;
		};
		vector.set(dimension, tag.confidence * weights.get(&tag.category));
	}
	vector
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::types::IndexTag;

	fn color_size_index() -> CategoryIndex {
		let mut index = CategoryIndex::new();
		index.build(&[
			IndexTag::new("color", "red"),
			IndexTag::new("color", "blue"),
			IndexTag::new("size", "large"),
		]);
		index
	}

	#[test]
	fn encodes_known_tags() {
		let index = color_size_index();
		let weights = CategoryWeights::new();
		let v = encode(
			&[Tag::new("color", "red", 1.0), Tag::new("size", "large", 0.8)],
			&index,
			&weights,
		);

		assert_eq!(v.nnz(), 2);
		assert_eq!(v.get(0), 1.0);
		assert_eq!(v.get(2), 0.8);
		assert_eq!(v.get(1), 0.0);
	}

	#[test]
	fn skips_unknown_tags() {
		let index = color_size_index();
		let weights = CategoryWeights::new();
		let v = encode(
			&[
				Tag::new("color", "green", 1.0),
				Tag::new("shape", "round", 1.0),
				Tag::new("color", "blue", 0.5),
			],
			&index,
			&weights,
		);

		assert_eq!(v.to_pairs(), vec![(1, 0.5)]);
	}

	#[test]
	fn skips_non_positive_confidence() {
		let index = color_size_index();
		let weights = CategoryWeights::new();
		let v = encode(
			&[
				Tag::new("color", "red", 0.0),
				Tag::new("color", "blue", -0.4),
				Tag::new("size", "large", f64::NAN),
			],
			&index,
			&weights,
		);
		assert!(v.is_empty());
	}

	#[test]
	fn applies_category_weight() {
		let index = color_size_index();
		let mut weights = CategoryWeights::new();
		weights.set("color", 2.0);
		let v = encode(
			&[Tag::new("color", "red", 0.5), Tag::new("size", "large", 0.5)],
			&index,
			&weights,
		);

		assert_eq!(v.get(0), 1.0);
		assert_eq!(v.get(2), 0.5);
	}

	#[test]
	fn zero_weight_leaves_no_slot() {
		let index = color_size_index();
		let mut weights = CategoryWeights::new();
		weights.set("color", 0.0);
		let v = encode(&[Tag::new("color", "red", 1.0)], &index, &weights);
		assert!(v.is_empty());
	}

	#[test]
	fn empty_tags_encode_empty() {
		let index = color_size_index();
		let v = encode(&[], &index, &CategoryWeights::new());
		assert!(v.is_empty());
	}

	#[test]
	fn from_pairs_drops_zeros() {
		let v = SparseVector::from_pairs(vec![(3, 0.0), (1, 0.25), (7, 1e-15)]);
		assert_eq!(v.to_pairs(), vec![(1, 0.25)]);
		assert_eq!(v.max_dimension(), Some(1));
	}
}
