// ---------------------------------------------------------------------------
// CategoryWeights: per-category multiplier applied at encode time
// ---------------------------------------------------------------------------

use std::collections::HashMap;

use crate::types::CategoryWeight;

pub const DEFAULT_CATEGORY_WEIGHT: f64 = 1.0;

#[derive(Debug, Clone, Default)]
pub struct CategoryWeights {
	weights: HashMap<String, f64>,
}

impl CategoryWeights {
	pub fn new() -> Self {
		Self::default()
	}

	pub fn set(&mut self, category: &str, weight: f64) {
		self.weights.insert(category.to_string(), weight);
	}

	/// Apply a batch of weights. Entries without a weight are skipped rather
	/// than defaulted.
	pub fn set_many(&mut self, weights: &[CategoryWeight]) {
		for entry in weights {
			if let Some(weight) = entry.weight {
				self.set(&entry.category, weight);
			}
		}
	}

	/// Stored weight, or [`DEFAULT_CATEGORY_WEIGHT`] when never set.
	pub fn get(&self, category: &str) -> f64 {
		self.weights
			.get(category)
			.copied()
			.unwrap_or(DEFAULT_CATEGORY_WEIGHT)
	}

	/// Explicitly set weights only, sorted by category.
	pub fn all(&self) -> Vec<CategoryWeight> {
		let mut all: Vec<CategoryWeight> = self
			.weights
			.iter()
			.map(|(category, weight)| CategoryWeight::new(category.clone(), *weight))
			.collect();
		all.sort_by(|a, b| a.category.cmp(&b.category));
		all
	}

	pub fn clear(&mut self) {
		self.weights.clear();
	}

	pub fn len(&self) -> usize {
		self.weights.len()
	}

	pub fn is_empty(&self) -> bool {
		self.weights.is_empty()
	}
}
