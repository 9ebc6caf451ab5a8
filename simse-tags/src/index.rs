// ---------------------------------------------------------------------------
// TagIndex: core state manager
// ---------------------------------------------------------------------------
//
// Owns the category index, weight table, item store and query cache and
// keeps them coherent: every mutation empties the query cache before it
// returns.
//
// Engine operations are permissive. Unknown tags, empty queries and
// out-of-range pages produce empty results rather than errors; only
// `import_index` can fail, and it leaves the current state untouched when it
// does.
//
// Category weights are baked into vectors at encode time. Changing a weight
// invalidates cached rankings but does not rescale vectors that are already
// stored; only items added (and queries run) afterwards see the new weight.
// ---------------------------------------------------------------------------

use crate::category_index::CategoryIndex;
use crate::codec::{ExportedData, ItemVectors};
use crate::config::IndexConfig;
use crate::cosine::{compute_magnitude, cosine_similarity_with_magnitude};
use crate::error::TagIndexError;
use crate::item_store::{ItemStore, StoredItem};
use crate::query_cache::{paginate, query_hash, Filter, QueryCache, QueryOptions};
use crate::sparse::{self, SparseVector};
use crate::types::{CategoryWeight, IndexStats, IndexTag, Item, MemoryUsage, QueryResult, Tag};
use crate::weights::CategoryWeights;

/// Weighted tag index answering cosine-similarity queries.
///
/// `M` is the per-item metadata type seen by query filters.
pub struct TagIndex<M> {
	categories: CategoryIndex,
	weights: CategoryWeights,
	items: ItemStore<M>,
	cache: QueryCache,
	config: IndexConfig,
}

impl<M> Default for TagIndex<M> {
	fn default() -> Self {
		Self::new()
	}
}

impl<M> TagIndex<M> {
	// -- Lifecycle -----------------------------------------------------------

	pub fn new() -> Self {
		Self::with_config(IndexConfig::default())
	}

	pub fn with_config(config: IndexConfig) -> Self {
		Self {
			categories: CategoryIndex::new(),
			weights: CategoryWeights::new(),
			items: ItemStore::new(),
			cache: QueryCache::new(),
			config: config.normalized(),
		}
	}

	pub fn config(&self) -> &IndexConfig {
		&self.config
	}

	// -- Category index ------------------------------------------------------

	/// Rebuild the vector space from scratch. Stored item vectors refer to the
	/// old dimensions afterwards, so callers should re-add their items.
	pub fn build_index(&mut self, tags: &[IndexTag]) {
		self.categories.build(tags);
		self.cache.invalidate();
		tracing::debug!(
			vector_size = self.categories.vector_size(),
			categories = self.categories.category_count(),
			stale_items = self.items.len(),
			"rebuilt category index"
		);
	}

	pub fn vector_size(&self) -> usize {
		self.categories.vector_size()
	}

	// -- Category weights ----------------------------------------------------

	pub fn set_category_weight(&mut self, category: &str, weight: f64) {
		self.weights.set(category, weight);
		self.cache.invalidate();
	}

	/// Set several weights at once; entries without a weight are skipped.
	pub fn set_category_weights(&mut self, weights: &[CategoryWeight]) {
		self.weights.set_many(weights);
		self.cache.invalidate();
	}

	pub fn get_category_weight(&self, category: &str) -> f64 {
		self.weights.get(category)
	}

	/// Explicitly set weights only; categories left at the default are omitted.
	pub fn get_all_category_weights(&self) -> Vec<CategoryWeight> {
		self.weights.all()
	}

	// -- Encoding ------------------------------------------------------------

	/// Encode tags against the current index and weights.
	pub fn encode(&self, tags: &[Tag]) -> SparseVector {
		sparse::encode(tags, &self.categories, &self.weights)
	}

	/// Cache key for a tag list; independent of tag order.
	pub fn query_hash(&self, tags: &[Tag]) -> String {
		query_hash(tags)
	}

	// -- Items ---------------------------------------------------------------

	/// Encode and store an item, replacing any item with the same id.
	pub fn add_item(&mut self, item: Item<M>) {
		self.insert_item(item);
		self.cache.invalidate();
	}

	/// Add many items. Equivalent to repeated [`Self::add_item`] calls;
	/// work is done in chunks of `batch_size` (or the configured default)
	/// and the cache is invalidated once.
	pub fn add_item_batch<I>(&mut self, items: I, batch_size: Option<usize>) -> usize
	where
		I: IntoIterator<Item = Item<M>>,
	{
		let batch_size = batch_size
			.filter(|&n| n > 0)
			.unwrap_or(self.config.batch_size);

		let mut count = 0;
		let mut chunk = 0;
		let mut iter = items.into_iter().peekable();
		while iter.peek().is_some() {
			let mut in_chunk = 0;
			for item in iter.by_ref().take(batch_size) {
				self.insert_item(item);
				in_chunk += 1;
			}
			count += in_chunk;
			chunk += 1;
			tracing::debug!(chunk, items = in_chunk, "encoded item batch chunk");
		}

		self.cache.invalidate();
		count
	}

	fn insert_item(&mut self, item: Item<M>) {
		let vector = self.encode(&item.tags);
		self.items.upsert(&item.id, vector, item.meta);
	}

	/// Remove items by id; unknown ids are ignored. Returns how many were
	/// actually removed.
	pub fn remove_items(&mut self, ids: &[String]) -> usize {
		let removed = self.items.remove_many(ids);
		self.cache.invalidate();
		removed
	}

	pub fn item_count(&self) -> usize {
		self.items.len()
	}

	pub fn contains_item(&self, id: &str) -> bool {
		self.items.contains(id)
	}

	/// Stored vector for an item, as encoded when it was added.
	pub fn item_vector(&self, id: &str) -> Option<&SparseVector> {
		self.items.get(id).map(|item| &item.vector)
	}

	// -- Query ---------------------------------------------------------------

	/// Rank every (filtered) item by cosine similarity to `tags` and return the
	/// requested page. Items scoring `<= 0` are dropped; ties keep insertion
	/// order. The full ranking is cached until the next mutation, and repeated
	/// queries with the same tags and filter identity are served from it.
	pub fn query(&mut self, tags: &[Tag], options: QueryOptions<'_, M>) -> Vec<QueryResult> {
		let hash = query_hash(tags);
		let token = options.filter.map(Filter::token);
		let size = options.size.unwrap_or(self.config.default_page_size);

		if let Some(cached) = self.cache.lookup(&hash, token) {
			tracing::debug!(query_hash = %hash, "query cache hit");
			return paginate(cached, options.page, size).to_vec();
		}

		let ranked = self.rank(tags, options.filter);
		tracing::debug!(query_hash = %hash, matches = ranked.len(), "query cache miss");

		let ranked = self.cache.store(hash, token.map(str::to_string), ranked);
		paginate(ranked, options.page, size).to_vec()
	}

	/// Best match for `tags`, or `None` when nothing scores above zero.
	pub fn query_first(&mut self, tags: &[Tag], filter: Option<&Filter<M>>) -> Option<QueryResult> {
		let options = QueryOptions {
			page: 1,
			size: Some(1),
			filter,
		};
		self.query(tags, options).into_iter().next()
	}

	fn rank(&self, tags: &[Tag], filter: Option<&Filter<M>>) -> Vec<QueryResult> {
		let query = self.encode(tags);
		if query.is_empty() {
			return Vec::new();
		}
		let query_mag = compute_magnitude(&query);

		let mut results: Vec<QueryResult> = self
			.items
			.iter()
			.filter(|item| passes(filter, item))
			.filter_map(|item| {
				let similarity =
					cosine_similarity_with_magnitude(&query, &item.vector, query_mag, item.magnitude);
				(similarity > 0.0).then(|| QueryResult {
					id: item.id.clone(),
					similarity,
				})
			})
			.collect();

		// Stable: equal scores keep insertion order.
		results.sort_by(|a, b| b.similarity.total_cmp(&a.similarity));
		results
	}

	pub fn clear_query_cache(&mut self) {
		self.cache.invalidate();
	}

	pub fn has_cached_query(&self) -> bool {
		self.cache.is_valid()
	}

	// -- Stats ---------------------------------------------------------------

	pub fn get_stats(&self, filter: Option<&Filter<M>>) -> IndexStats {
		let total_items = match filter {
			Some(_) => self.items.iter().filter(|item| passes(filter, item)).count(),
			None => self.items.len(),
		};

		IndexStats {
			total_items,
			total_tags: self.categories.vector_size(),
			memory_usage: MemoryUsage {
				category_map_size: self.categories.category_count(),
				has_cached_query: self.cache.is_valid(),
			},
		}
	}

	// -- Import / export -----------------------------------------------------

	/// Snapshot the index. `itemVectors` is present only when `include_items`
	/// is set.
	pub fn export_index(&self, include_items: bool) -> ExportedData {
		let item_vectors = include_items.then(|| {
			self.items
				.iter()
				.map(|item| (item.id.clone(), item.vector.to_pairs()))
				.collect::<ItemVectors>()
		});

		ExportedData {
			category_map: self.categories.to_map(),
			vector_size: self.categories.vector_size(),
			category_weights: self.weights.all(),
			item_vectors,
		}
	}

	/// Replace all state with a snapshot. Items come back without metadata.
	/// An inconsistent snapshot is rejected and the current state is kept.
	pub fn import_index(&mut self, data: ExportedData) -> Result<(), TagIndexError> {
		let categories = data.validate().inspect_err(|e| {
			tracing::warn!(error = %e, "rejected index import");
		})?;

		self.categories.restore(categories, data.vector_size);

		self.weights.clear();
		self.weights.set_many(&data.category_weights);

		self.items.clear();
		if let Some(item_vectors) = data.item_vectors {
			for (id, pairs) in item_vectors.iter() {
				self.items
					.upsert(id, SparseVector::from_pairs(pairs.iter().copied()), None);
			}
		}

		self.cache.invalidate();
		tracing::info!(
			vector_size = self.categories.vector_size(),
			items = self.items.len(),
			weights = self.weights.len(),
			"imported index"
		);
		Ok(())
	}
}

fn passes<M>(filter: Option<&Filter<M>>, item: &StoredItem<M>) -> bool {
	filter.map_or(true, |f| f.matches(item.meta.as_ref()))
}

#[cfg(test)]
mod tests {
	use super::*;

	fn index_tags() -> Vec<IndexTag> {
		vec![
			IndexTag::new("color", "red"),
			IndexTag::new("color", "blue"),
			IndexTag::new("size", "large"),
		]
	}

	fn built() -> TagIndex<u32> {
		let mut index = TagIndex::new();
		index.build_index(&index_tags());
		index
	}

	fn red() -> Vec<Tag> {
		vec![Tag::new("color", "red", 1.0)]
	}

	#[test]
	fn worked_example() {
		let mut index = built();
		index.add_item(Item::new(
			"item1",
			vec![Tag::new("color", "red", 1.0), Tag::new("size", "large", 0.8)],
		));
		index.add_item(Item::new(
			"item2",
			vec![Tag::new("color", "blue", 1.0), Tag::new("size", "large", 0.9)],
		));

		let results = index.query(&red(), QueryOptions::new());
		assert_eq!(results.len(), 1);
		assert_eq!(results[0].id, "item1");
		assert!(results[0].similarity > 0.0);
	}

	#[test]
	fn cache_is_filled_by_query_and_cleared_by_mutation() {
		let mut index = built();
		index.add_item(Item::new("a", red()));
		assert!(!index.has_cached_query());

		index.query(&red(), QueryOptions::new());
		assert!(index.has_cached_query());

		index.set_category_weight("size", 2.0);
		assert!(!index.has_cached_query());

		index.query(&red(), QueryOptions::new());
		index.remove_items(&["missing".to_string()]);
		assert!(!index.has_cached_query());

		index.query(&red(), QueryOptions::new());
		index.clear_query_cache();
		assert!(!index.has_cached_query());
	}

	#[test]
	fn filter_identity_decides_cache_hits() {
		let mut index = built();
		index.add_item(Item::new("a", red()).with_meta(1));
		index.add_item(Item::new("b", red()).with_meta(2));
		let hash = query_hash(&red());

		let odd = Filter::new(|m: Option<&u32>| m.is_some_and(|v| v % 2 == 1));
		let clone = odd.clone();
		let lookalike = Filter::new(|m: Option<&u32>| m.is_some_and(|v| v % 2 == 1));

		index.query(&red(), QueryOptions::new().filter(&odd));
		assert!(index.cache.lookup(&hash, Some(odd.token())).is_some());
		assert!(index.cache.lookup(&hash, Some(clone.token())).is_some());
		assert!(index.cache.lookup(&hash, Some(lookalike.token())).is_none());
		assert!(index.cache.lookup(&hash, None).is_none());

		index.query(&red(), QueryOptions::new());
		assert!(index.cache.lookup(&hash, None).is_some());
		assert!(index.cache.lookup(&hash, Some(odd.token())).is_none());

		let first = Filter::keyed("odd", |m: Option<&u32>| m.is_some_and(|v| v % 2 == 1));
		let second = Filter::keyed("odd", |m: Option<&u32>| m.is_some_and(|v| v % 2 == 1));
		index.query(&red(), QueryOptions::new().filter(&first));
		let cached = index.cache.lookup(&hash, Some(second.token())).unwrap();
		assert_eq!(cached.len(), 1);
		assert_eq!(cached[0].id, "a");
	}

	#[test]
	fn batch_matches_single_adds() {
		let items = || {
			(0..7u32).map(|i| {
				let value = if i % 2 == 0 { "red" } else { "blue" };
				Item::new(format!("i{}", i), vec![Tag::new("color", value, 0.1 * (i + 1) as f64)])
					.with_meta(i)
			})
		};

		let mut single = built();
		for item in items() {
			single.add_item(item);
		}
		let mut batched = built();
		assert_eq!(batched.add_item_batch(items(), Some(3)), 7);

		assert_eq!(single.export_index(true), batched.export_index(true));
		assert_eq!(single.get_stats(None), batched.get_stats(None));
	}

	#[test]
	fn zero_batch_size_uses_default() {
		let mut index = built();
		let n = index.add_item_batch(vec![Item::new("a", red()), Item::new("b", red())], Some(0));
		assert_eq!(n, 2);
		assert_eq!(index.item_count(), 2);
	}

	#[test]
	fn stats_respect_filter() {
		let mut index = built();
		index.add_item(Item::new("a", red()).with_meta(1));
		index.add_item(Item::new("b", red()).with_meta(2));
		index.add_item(Item::new("c", red()));

		let odd = Filter::new(|m: Option<&u32>| m.is_some_and(|v| v % 2 == 1));
		let stats = index.get_stats(Some(&odd));
		assert_eq!(stats.total_items, 1);
		assert_eq!(stats.total_tags, 3);
		assert_eq!(stats.memory_usage.category_map_size, 2);

		assert_eq!(index.get_stats(None).total_items, 3);
	}

	#[test]
	fn rejected_import_keeps_state() {
		let mut index = built();
		index.add_item(Item::new("a", red()));
		let mut bad = index.export_index(true);
		bad.vector_size = 1;

		assert!(index.import_index(bad).is_err());
		assert_eq!(index.vector_size(), 3);
		assert!(index.contains_item("a"));
	}

	#[test]
	fn query_page_size_defaults_to_config() {
		let mut index: TagIndex<()> = TagIndex::with_config(IndexConfig {
			default_page_size: 2,
			batch_size: 10,
		});
		index.build_index(&index_tags());
		for i in 0..5 {
			index.add_item(Item::new(format!("i{}", i), red()));
		}

		assert_eq!(index.query(&red(), QueryOptions::new()).len(), 2);
		assert_eq!(index.query(&red(), QueryOptions::new().page(3)).len(), 1);
		assert_eq!(index.query(&red(), QueryOptions::new().size(10)).len(), 5);
	}
}
