// ---------------------------------------------------------------------------
// CategoryIndex: (category, value) -> dimension mapping
// ---------------------------------------------------------------------------
//
// Defines the vector space. Dimensions are assigned densely from 0 in
// first-seen order and stay stable until the next full rebuild.
// ---------------------------------------------------------------------------

use std::collections::{BTreeMap, HashMap};

use crate::types::IndexTag;

#[derive(Debug, Clone, Default)]
pub struct CategoryIndex {
	/// category -> (value -> dimension)
	categories: HashMap<String, HashMap<String, u32>>,
	vector_size: usize,
}

impl CategoryIndex {
	pub fn new() -> Self {
		Self::default()
	}

	/// Reset the index and assign a dimension to every distinct
	/// `(category, value)` pair in input order. Duplicates keep the dimension
	/// of their first occurrence.
	pub fn build<'a, I>(&mut self, tags: I)
	where
		I: IntoIterator<Item = &'a IndexTag>,
	{
		self.categories.clear();
		self.vector_size = 0;

		for tag in tags {
			if self.dimension(&tag.category, &tag.value).is_some() {
				continue;
			}
			let Some(dimension) = dimension_at(self.vector_size) else {
				tracing::warn!(
					vector_size = self.vector_size,
					"dimension space exhausted, remaining tags ignored"
				);
				break;
			};
			self.categories
				.entry(tag.category.clone())
				.or_default()
				.insert(tag.value.clone(), dimension);
			self.vector_size += 1;
		}
	}

	/// Replace the index with an already-assigned mapping. The caller is
	/// responsible for validating that dimensions are unique and in range.
	pub(crate) fn restore(
		&mut self,
		categories: HashMap<String, HashMap<String, u32>>,
		vector_size: usize,
	) {
		self.categories = categories;
		self.vector_size = vector_size;
	}

	/// Look up the dimension of a `(category, value)` pair.
	pub fn dimension(&self, category: &str, value: &str) -> Option<u32> {
		self.categories.get(category)?.get(value).copied()
	}

	/// Number of assigned dimensions.
	pub fn vector_size(&self) -> usize {
		self.vector_size
	}

	/// Number of distinct categories.
	pub fn category_count(&self) -> usize {
		self.categories.len()
	}

	pub fn is_empty(&self) -> bool {
		self.vector_size == 0
	}

	/// Snapshot with deterministic key order, for export.
	pub fn to_map(&self) -> BTreeMap<String, BTreeMap<String, u32>> {
		self.categories
			.iter()
			.map(|(category, values)| {
				let values = values.iter().map(|(v, d)| (v.clone(), *d)).collect();
				(category.clone(), values)
			})
			.collect()
	}
}

/// Dimension for the pair at `position`, or `None` once the u32 space is used up.
fn dimension_at(position: usize) -> Option<u32> {
	u32::try_from(position).ok()
}
