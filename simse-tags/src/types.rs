use serde::{Deserialize, Serialize};

/// A label without confidence. Used to populate the category index.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct IndexTag {
	pub category: String,
	pub value: String,
}

impl IndexTag {
	pub fn new(category: impl Into<String>, value: impl Into<String>) -> Self {
		Self {
			category: category.into(),
			value: value.into(),
		}
	}
}

/// A label with a confidence, nominally in `[0, 1]`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Tag {
	pub category: String,
	pub value: String,
	pub confidence: f64,
}

impl Tag {
	pub fn new(category: impl Into<String>, value: impl Into<String>, confidence: f64) -> Self {
		Self {
			category: category.into(),
			value: value.into(),
			confidence,
		}
	}
}

/// An item to be encoded and stored.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Item<M> {
	pub id: String,
	pub tags: Vec<Tag>,
	#[serde(default)]
	pub meta: Option<M>,
}

impl<M> Item<M> {
	pub fn new(id: impl Into<String>, tags: Vec<Tag>) -> Self {
		Self {
			id: id.into(),
			tags,
			meta: None,
		}
	}

	pub fn with_meta(mut self, meta: M) -> Self {
		self.meta = Some(meta);
		self
	}
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QueryResult {
	pub id: String,
	pub similarity: f64,
}

/// Entry of the exported weight list. `weight` may be absent, in which case
/// the entry is skipped on import.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CategoryWeight {
	pub category: String,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub weight: Option<f64>,
}

impl CategoryWeight {
	pub fn new(category: impl Into<String>, weight: f64) -> Self {
		Self {
			category: category.into(),
			weight: Some(weight),
		}
	}
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MemoryUsage {
	pub category_map_size: usize,
	pub has_cached_query: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IndexStats {
	pub total_items: usize,
	pub total_tags: usize,
	pub memory_usage: MemoryUsage,
}
