use crate::sparse::SparseVector;

/// Compute cosine similarity between two sparse vectors.
///
/// The dot product and the norm of `a` come from one pass over `a`'s
/// entries; the norm of `b` from one pass over `b`'s. Returns 0.0 when either
/// vector has zero magnitude. Result clamped to [-1.0, 1.0].
pub fn cosine_similarity(a: &SparseVector, b: &SparseVector) -> f64 {
	if a.is_empty() || b.is_empty() {
		return 0.0;
	}

	let mut dot: f64 = 0.0;
	let mut norm_a: f64 = 0.0;
	for (dimension, ai) in a.iter() {
		dot += ai * b.get(dimension);
		norm_a += ai * ai;
	}

	cosine_from_parts(dot, norm_a.sqrt(), compute_magnitude(b))
}

/// Compute the magnitude (L2 norm) of a sparse vector.
pub fn compute_magnitude(vector: &SparseVector) -> f64 {
	let mut sum: f64 = 0.0;
	for (_, v) in vector.iter() {
		sum += v * v;
	}
	sum.sqrt()
}

/// Cosine similarity using a pre-computed magnitude for `b`. Used by the
/// query loop, where the query vector is scored against every item.
pub fn cosine_similarity_with_magnitude(
	a: &SparseVector,
	b: &SparseVector,
	mag_a: f64,
	mag_b: f64,
) -> f64 {
	if a.is_empty() || b.is_empty() {
		return 0.0;
	}

	// Iterate the shorter vector; the dot product is symmetric.
	let (short, long) = if a.nnz() <= b.nnz() { (a, b) } else { (b, a) };
	let mut dot: f64 = 0.0;
	for (dimension, v) in short.iter() {
		dot += v * long.get(dimension);
	}

	cosine_from_parts(dot, mag_a, mag_b)
}

fn cosine_from_parts(dot: f64, mag_a: f64, mag_b: f64) -> f64 {
	let denom = mag_a * mag_b;
	if denom == 0.0 {
		return 0.0;
	}

	let result = dot / denom;
	if !result.is_finite() {
		return 0.0;
	}
	result.clamp(-1.0, 1.0)
}

#[cfg(test)]
mod tests {
	use super::*;

	fn sv(pairs: &[(u32, f64)]) -> SparseVector {
		SparseVector::from_pairs(pairs.iter().copied())
	}

	#[test]
	fn identical_vectors() {
		let v = sv(&[(0, 1.0), (3, 2.0), (9, 3.0)]);
		let sim = cosine_similarity(&v, &v);
		assert!((sim - 1.0).abs() < 1e-10);
	}

	#[test]
	fn disjoint_vectors() {
		let a = sv(&[(0, 1.0)]);
		let b = sv(&[(1, 1.0)]);
		assert_eq!(cosine_similarity(&a, &b), 0.0);
	}

	#[test]
	fn partial_overlap() {
		let a = sv(&[(0, 1.0), (2, 0.8)]);
		let b = sv(&[(0, 1.0)]);
		let expected = 1.0 / (1.0f64 + 0.64).sqrt();
		assert!((cosine_similarity(&a, &b) - expected).abs() < 1e-12);
	}

	#[test]
	fn symmetric() {
		let a = sv(&[(0, 0.3), (1, 0.9), (4, 0.2)]);
		let b = sv(&[(1, 0.5), (4, 0.7), (5, 0.1)]);
		assert_eq!(cosine_similarity(&a, &b), cosine_similarity(&b, &a));
	}

	#[test]
	fn empty_vectors() {
		let empty = SparseVector::new();
		let v = sv(&[(0, 1.0)]);
		assert_eq!(cosine_similarity(&empty, &empty), 0.0);
		assert_eq!(cosine_similarity(&empty, &v), 0.0);
		assert_eq!(cosine_similarity(&v, &empty), 0.0);
	}

	#[test]
	fn scale_invariant() {
		let a = sv(&[(0, 1.0), (1, 2.0)]);
		let b = sv(&[(0, 10.0), (1, 20.0)]);
		assert!((cosine_similarity(&a, &b) - 1.0).abs() < 1e-10);
	}

	#[test]
	fn magnitude_basic() {
		let v = sv(&[(2, 3.0), (5, 4.0)]);
		assert!((compute_magnitude(&v) - 5.0).abs() < 1e-10);
	}

	#[test]
	fn magnitude_empty() {
		assert_eq!(compute_magnitude(&SparseVector::new()), 0.0);
	}

	#[test]
	fn cosine_with_precomputed_magnitude() {
		let a = sv(&[(0, 1.0), (1, 0.5)]);
		let b = sv(&[(1, 2.0), (2, 1.0), (3, 1.0)]);
		let with_mag =
			cosine_similarity_with_magnitude(&a, &b, compute_magnitude(&a), compute_magnitude(&b));
		assert!((with_mag - cosine_similarity(&a, &b)).abs() < 1e-12);
	}
}
