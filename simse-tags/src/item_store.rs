// ---------------------------------------------------------------------------
// ItemStore: id -> encoded vector (+ optional metadata)
// ---------------------------------------------------------------------------
//
// Items are kept in insertion order so ranking ties resolve the same way on
// every run. Re-adding an id overwrites it in place and keeps its position.
// ---------------------------------------------------------------------------

use std::collections::{HashMap, HashSet};

use crate::cosine::compute_magnitude;
use crate::sparse::SparseVector;

#[derive(Debug, Clone)]
pub struct StoredItem<M> {
	pub id: String,
	pub vector: SparseVector,
	/// L2 norm of `vector`, computed once at insert.
	pub magnitude: f64,
	pub meta: Option<M>,
}

#[derive(Debug, Clone)]
pub struct ItemStore<M> {
	/// Insertion-ordered entries.
	items: Vec<StoredItem<M>>,
	/// Maps id -> index in `items`.
	index: HashMap<String, usize>,
}

impl<M> Default for ItemStore<M> {
	fn default() -> Self {
		Self {
			items: Vec::new(),
			index: HashMap::new(),
		}
	}
}

impl<M> ItemStore<M> {
	pub fn new() -> Self {
		Self::default()
	}

	/// Insert or overwrite an item's vector and metadata.
	pub fn upsert(&mut self, id: &str, vector: SparseVector, meta: Option<M>) {
		let magnitude = compute_magnitude(&vector);
		if let Some(&idx) = self.index.get(id) {
			let item = &mut self.items[idx];
			item.vector = vector;
			item.magnitude = magnitude;
			item.meta = meta;
			return;
		}

		self.index.insert(id.to_string(), self.items.len());
		self.items.push(StoredItem {
			id: id.to_string(),
			vector,
			magnitude,
			meta,
		});
	}

	/// Remove every listed id. Missing ids are ignored. Returns the number of
	/// items actually removed.
	pub fn remove_many(&mut self, ids: &[String]) -> usize {
		let doomed: HashSet<&str> = ids
			.iter()
			.map(String::as_str)
			.filter(|id| self.index.contains_key(*id))
			.collect();
		if doomed.is_empty() {
			return 0;
		}

		let before = self.items.len();
		self.items.retain(|item| !doomed.contains(item.id.as_str()));
		self.rebuild_index();
		before - self.items.len()
	}

	/// Rebuild the `index` map from `items`. Called after removals that shift
	/// positions.
	fn rebuild_index(&mut self) {
		self.index.clear();
		for (i, item) in self.items.iter().enumerate() {
			self.index.insert(item.id.clone(), i);
		}
	}

	pub fn get(&self, id: &str) -> Option<&StoredItem<M>> {
		self.index.get(id).map(|&idx| &self.items[idx])
	}

	pub fn contains(&self, id: &str) -> bool {
		self.index.contains_key(id)
	}

	pub fn iter(&self) -> impl Iterator<Item = &StoredItem<M>> {
		self.items.iter()
	}

	pub fn len(&self) -> usize {
		self.items.len()
	}

	pub fn is_empty(&self) -> bool {
		self.items.is_empty()
	}

	pub fn clear(&mut self) {
		self.items.clear();
		self.index.clear();
	}
}
