// ---------------------------------------------------------------------------
// Import / export snapshot format
// ---------------------------------------------------------------------------
//
// Transport-neutral snapshot of the category index, weight table and
// (optionally) item vectors:
//
//   {
//     "categoryMap": { "<category>": { "<value>": <dimension> } },
//     "vectorSize": <int>,
//     "categoryWeights": [ { "category": "...", "weight": <num>? } ],
//     "itemVectors": { "<id>": [ [<dimension>, <value>], ... ] }   // optional
//   }
//
// `itemVectors` is written in item insertion order and read back in document
// order so ranking ties survive a round trip. Only the shape lives here;
// moving the bytes around is the caller's business.
// ---------------------------------------------------------------------------

use std::collections::{BTreeMap, HashMap, HashSet};
use std::fmt;

use serde::de::{MapAccess, Visitor};
use serde::ser::SerializeMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::error::TagIndexError;
use crate::types::CategoryWeight;

// ---------------------------------------------------------------------------
// ExportedData
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExportedData {
	pub category_map: BTreeMap<String, BTreeMap<String, u32>>,
	pub vector_size: usize,
	#[serde(default)]
	pub category_weights: Vec<CategoryWeight>,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub item_vectors: Option<ItemVectors>,
}

impl ExportedData {
	pub fn to_json(&self) -> Result<String, TagIndexError> {
		Ok(serde_json::to_string(self)?)
	}

	pub fn from_json(json: &str) -> Result<Self, TagIndexError> {
		Ok(serde_json::from_str(json)?)
	}

	/// Check the snapshot is internally consistent before it replaces any
	/// live state. Returns the category map in lookup form.
	pub(crate) fn validate(&self) -> Result<HashMap<String, HashMap<String, u32>>, TagIndexError> {
		let mut seen: HashSet<u32> = HashSet::new();
		let mut categories: HashMap<String, HashMap<String, u32>> = HashMap::new();

		for (category, values) in &self.category_map {
			let mut lookup = HashMap::with_capacity(values.len());
			for (value, &dimension) in values {
				if dimension as usize >= self.vector_size {
					return Err(TagIndexError::InvalidImport(format!(
						"dimension {} of {}={} is outside vectorSize {}",
						dimension, category, value, self.vector_size
					)));
				}
				if !seen.insert(dimension) {
					return Err(TagIndexError::InvalidImport(format!(
						"dimension {} is assigned more than once",
						dimension
					)));
				}
				lookup.insert(value.clone(), dimension);
			}
			categories.insert(category.clone(), lookup);
		}

		for entry in &self.category_weights {
			if let Some(weight) = entry.weight {
				if !weight.is_finite() {
					return Err(TagIndexError::InvalidImport(format!(
						"weight for category {} is not finite",
						entry.category
					)));
				}
			}
		}

		if let Some(items) = &self.item_vectors {
			for (id, pairs) in items.iter() {
				for &(dimension, value) in pairs {
					if dimension as usize >= self.vector_size {
						return Err(TagIndexError::InvalidImport(format!(
							"item {} references dimension {} outside vectorSize {}",
							id, dimension, self.vector_size
						)));
					}
					if !value.is_finite() {
						return Err(TagIndexError::InvalidImport(format!(
							"item {} has a non-finite value at dimension {}",
							id, dimension
						)));
					}
				}
			}
		}

		Ok(categories)
	}
}

// ---------------------------------------------------------------------------
// ItemVectors: insertion-ordered id -> [[dimension, value], ...]
// ---------------------------------------------------------------------------

pub type VectorPairs = Vec<(u32, f64)>;

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ItemVectors {
	entries: Vec<(String, VectorPairs)>,
	/// Maps id -> index in `entries`.
	index: HashMap<String, usize>,
}

impl ItemVectors {
	pub fn new() -> Self {
		Self::default()
	}

	/// Append an item. A later push for the same id replaces the earlier one
	/// in place.
	pub fn push(&mut self, id: String, pairs: VectorPairs) {
		if let Some(&idx) = self.index.get(&id) {
			self.entries[idx].1 = pairs;
			return;
		}
		self.index.insert(id.clone(), self.entries.len());
		self.entries.push((id, pairs));
	}

	pub fn get(&self, id: &str) -> Option<&VectorPairs> {
		self.index.get(id).map(|&idx| &self.entries[idx].1)
	}

	pub fn iter(&self) -> impl Iterator<Item = (&str, &VectorPairs)> {
		self.entries.iter().map(|(id, pairs)| (id.as_str(), pairs))
	}

	pub fn len(&self) -> usize {
		self.entries.len()
	}

	pub fn is_empty(&self) -> bool {
		self.entries.is_empty()
	}
}

impl FromIterator<(String, VectorPairs)> for ItemVectors {
	fn from_iter<I: IntoIterator<Item = (String, VectorPairs)>>(iter: I) -> Self {
		let mut items = Self::new();
		for (id, pairs) in iter {
			items.push(id, pairs);
		}
		items
	}
}

impl Serialize for ItemVectors {
	fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
		let mut map = serializer.serialize_map(Some(self.entries.len()))?;
		for (id, pairs) in &self.entries {
			map.serialize_entry(id, pairs)?;
		}
		map.end()
	}
}

struct ItemVectorsVisitor;

impl<'de> Visitor<'de> for ItemVectorsVisitor {
	type Value = ItemVectors;

	fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str("a map of item id to [dimension, value] pairs")
	}

	fn visit_map<A: MapAccess<'de>>(self, mut access: A) -> Result<Self::Value, A::Error> {
		let mut items = ItemVectors::new();
		while let Some((id, pairs)) = access.next_entry::<String, VectorPairs>()? {
			items.push(id, pairs);
		}
		Ok(items)
	}
}

impl<'de> Deserialize<'de> for ItemVectors {
	fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
		deserializer.deserialize_map(ItemVectorsVisitor)
	}
}
