// ---------------------------------------------------------------------------
// Query cache: single-slot memo of the last ranked query
// ---------------------------------------------------------------------------
//
// Holds the full ranked result list for the most recent (query hash, filter
// token) pair and serves pages out of it. Any mutation of the index empties
// the slot.
//
// Filters carry an identity token instead of being compared structurally.
// `Filter::new` mints a fresh token every call, so two separately built
// filters never share a cache entry even if their logic is identical; clones
// share the token. `Filter::keyed` lets callers pin a token explicitly.
// ---------------------------------------------------------------------------

use std::fmt;
use std::sync::Arc;

use sha2::{Digest, Sha256};
use uuid::Uuid;

use crate::types::{QueryResult, Tag};

// ---------------------------------------------------------------------------
// Filter
// ---------------------------------------------------------------------------

type Predicate<M> = dyn Fn(Option<&M>) -> bool + Send + Sync;

/// Metadata predicate with a cache identity.
pub struct Filter<M> {
	token: String,
	predicate: Arc<Predicate<M>>,
}

impl<M> Filter<M> {
	/// Wrap a predicate under a freshly minted identity.
	pub fn new<F>(predicate: F) -> Self
	where
		F: Fn(Option<&M>) -> bool + Send + Sync + 'static,
	{
		Self::keyed(Uuid::new_v4().to_string(), predicate)
	}

	/// Wrap a predicate under a caller-chosen identity. Equal tokens must mean
	/// equal predicates, or cached rankings will be served for the wrong filter.
	pub fn keyed<F>(token: impl Into<String>, predicate: F) -> Self
	where
		F: Fn(Option<&M>) -> bool + Send + Sync + 'static,
	{
		Self {
			token: token.into(),
			predicate: Arc::new(predicate),
		}
	}

	pub fn token(&self) -> &str {
		&self.token
	}

	pub fn matches(&self, meta: Option<&M>) -> bool {
		(self.predicate)(meta)
	}
}

impl<M> Clone for Filter<M> {
	fn clone(&self) -> Self {
		Self {
			token: self.token.clone(),
			predicate: Arc::clone(&self.predicate),
		}
	}
}

impl<M> fmt::Debug for Filter<M> {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("Filter").field("token", &self.token).finish()
	}
}

// ---------------------------------------------------------------------------
// Query options
// ---------------------------------------------------------------------------

/// Paging and filtering for a query. `page` is 1-based; `size` falls back to
/// the index's configured page size.
pub struct QueryOptions<'a, M> {
	pub page: usize,
	pub size: Option<usize>,
	pub filter: Option<&'a Filter<M>>,
}

impl<M> Default for QueryOptions<'_, M> {
	fn default() -> Self {
		Self {
			page: 1,
			size: None,
			filter: None,
		}
	}
}

impl<'a, M> QueryOptions<'a, M> {
	pub fn new() -> Self {
		Self::default()
	}

	pub fn page(mut self, page: usize) -> Self {
		self.page = page;
		self
	}

	pub fn size(mut self, size: usize) -> Self {
		self.size = Some(size);
		self
	}

	pub fn filter(mut self, filter: &'a Filter<M>) -> Self {
		self.filter = Some(filter);
		self
	}
}

// ---------------------------------------------------------------------------
// Query hash
// ---------------------------------------------------------------------------

/// Order-independent cache key for a tag list.
///
/// Tags are sorted by (category, value, confidence) and fed into SHA-256 with
/// length prefixes, so permutations hash equal and any confidence change
/// hashes differently.
pub fn query_hash(tags: &[Tag]) -> String {
	let mut sorted: Vec<&Tag> = tags.iter().collect();
	sorted.sort_by(|a, b| {
		a.category
			.cmp(&b.category)
			.then_with(|| a.value.cmp(&b.value))
			.then_with(|| a.confidence.total_cmp(&b.confidence))
	});

	let mut hasher = Sha256::new();
	hasher.update((sorted.len() as u64).to_be_bytes());
	for tag in sorted {
		hasher.update((tag.category.len() as u64).to_be_bytes());
		hasher.update(tag.category.as_bytes());
		hasher.update((tag.value.len() as u64).to_be_bytes());
		hasher.update(tag.value.as_bytes());
		hasher.update(tag.confidence.to_bits().to_be_bytes());
	}
	format!("{:x}", hasher.finalize())
}

// ---------------------------------------------------------------------------
// Pagination
// ---------------------------------------------------------------------------

/// Slice `results[(page-1)*size .. (page-1)*size + size]`, clamped to the
/// available length. Page 0, size 0 and pages past the end yield nothing.
pub fn paginate(results: &[QueryResult], page: usize, size: usize) -> &[QueryResult] {
	if page == 0 || size == 0 {
		return &[];
	}
	let start = (page - 1).saturating_mul(size);
	if start >= results.len() {
		return &[];
	}
	let end = start.saturating_add(size).min(results.len());
	&results[start..end]
}

// ---------------------------------------------------------------------------
// QueryCache
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
struct CachedQuery {
	query_hash: String,
	filter_token: Option<String>,
	results: Vec<QueryResult>,
}

#[derive(Debug, Clone, Default)]
pub struct QueryCache {
	slot: Option<CachedQuery>,
}

impl QueryCache {
	pub fn new() -> Self {
		Self::default()
	}

	/// Cached ranking for exactly this (hash, filter token) pair.
	pub fn lookup(&self, query_hash: &str, filter_token: Option<&str>) -> Option<&[QueryResult]> {
		let cached = self.slot.as_ref()?;
		if cached.query_hash == query_hash && cached.filter_token.as_deref() == filter_token {
			Some(&cached.results)
		} else {
			None
		}
	}

	/// Replace the slot with a new ranking and return it.
	pub fn store(
		&mut self,
		query_hash: String,
		filter_token: Option<String>,
		results: Vec<QueryResult>,
	) -> &[QueryResult] {
		let cached = self.slot.insert(CachedQuery {
			query_hash,
			filter_token,
			results,
		});
		&cached.results
	}

	pub fn invalidate(&mut self) {
		self.slot = None;
	}

	pub fn is_valid(&self) -> bool {
		self.slot.is_some()
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	fn results(n: usize) -> Vec<QueryResult> {
		(0..n)
			.map(|i| QueryResult {
				id: format!("item{}", i),
				similarity: 1.0 - i as f64 * 0.01,
			})
			.collect()
	}

	fn page_ids(slice: &[QueryResult]) -> Vec<&str> {
		slice.iter().map(|r| r.id.as_str()).collect()
	}

	// -- hashing -------------------------------------------------------------

	#[test]
	fn hash_is_order_independent() {
		let a = vec![
			Tag::new("color", "red", 0.9),
			Tag::new("size", "large", 0.5),
			Tag::new("color", "blue", 0.1),
		];
		let mut b = a.clone();
		b.reverse();
		let mut c = a.clone();
		c.rotate_left(1);

		assert_eq!(query_hash(&a), query_hash(&b));
		assert_eq!(query_hash(&a), query_hash(&c));
	}

	#[test]
	fn hash_is_confidence_sensitive() {
		let a = vec![Tag::new("color", "red", 0.9)];
		let b = vec![Tag::new("color", "red", 0.8)];
		assert_ne!(query_hash(&a), query_hash(&b));
	}

	#[test]
	fn hash_separates_field_boundaries() {
		let a = vec![Tag::new("ab", "c", 1.0)];
		let b = vec![Tag::new("a", "bc", 1.0)];
		assert_ne!(query_hash(&a), query_hash(&b));
	}

	#[test]
	fn hash_is_hex_sha256() {
		let h = query_hash(&[]);
		assert_eq!(h.len(), 64);
		assert!(h.chars().all(|c| c.is_ascii_hexdigit()));
	}

	// -- filters -------------------------------------------------------------

	#[test]
	fn separately_built_filters_differ() {
		let a: Filter<u32> = Filter::new(|m| m.is_some());
		let b: Filter<u32> = Filter::new(|m| m.is_some());
		assert_ne!(a.token(), b.token());
	}

	#[test]
	fn cloned_filter_shares_token() {
		let a: Filter<u32> = Filter::new(|m| m.copied() == Some(3));
		let b = a.clone();
		assert_eq!(a.token(), b.token());
		assert!(b.matches(Some(&3)));
		assert!(!b.matches(None));
	}

	#[test]
	fn keyed_filter_uses_given_token() {
		let f: Filter<u32> = Filter::keyed("even", |m| m.is_some_and(|v| v % 2 == 0));
		assert_eq!(f.token(), "even");
		assert!(f.matches(Some(&4)));
		assert!(!f.matches(Some(&5)));
	}

	// -- pagination ----------------------------------------------------------

	#[test]
	fn paginate_pages() {
		let r = results(5);
		assert_eq!(page_ids(paginate(&r, 1, 2)), vec!["item0", "item1"]);
		assert_eq!(page_ids(paginate(&r, 2, 2)), vec!["item2", "item3"]);
		assert_eq!(page_ids(paginate(&r, 3, 2)), vec!["item4"]);
	}

	#[test]
	fn paginate_out_of_range_is_empty() {
		let r = results(3);
		assert!(paginate(&r, 4, 1).is_empty());
		assert!(paginate(&r, 0, 10).is_empty());
		assert!(paginate(&r, 1, 0).is_empty());
		assert!(paginate(&r, usize::MAX, usize::MAX).is_empty());
		assert!(paginate(&[], 1, 10).is_empty());
	}

	// -- cache slot ----------------------------------------------------------

	#[test]
	fn lookup_requires_hash_and_token_match() {
		let mut cache = QueryCache::new();
		cache.store("h1".into(), Some("f1".into()), results(2));

		assert!(cache.lookup("h1", Some("f1")).is_some());
		assert!(cache.lookup("h1", Some("f2")).is_none());
		assert!(cache.lookup("h1", None).is_none());
		assert!(cache.lookup("h2", Some("f1")).is_none());
	}

	#[test]
	fn no_filter_matches_no_filter() {
		let mut cache = QueryCache::new();
		cache.store("h".into(), None, results(1));
		assert_eq!(cache.lookup("h", None).map(|r| r.len()), Some(1));
	}

	#[test]
	fn store_replaces_slot() {
		let mut cache = QueryCache::new();
		cache.store("h1".into(), None, results(1));
		cache.store("h2".into(), None, results(3));
		assert!(cache.lookup("h1", None).is_none());
		assert_eq!(cache.lookup("h2", None).map(|r| r.len()), Some(3));
	}

	#[test]
	fn invalidate_empties() {
		let mut cache = QueryCache::new();
		cache.store("h".into(), None, results(1));
		assert!(cache.is_valid());
		cache.invalidate();
		assert!(!cache.is_valid());
		assert!(cache.lookup("h", None).is_none());
	}
}
