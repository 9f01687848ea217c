use crate::error::{Result, VectorStoreError};

/// Sum of element-wise products. Vectors of different lengths score 0.
pub fn dot_product(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() {
        return 0.0;
    }
    a.iter().zip(b.iter()).map(|(x, y)| x * y).sum()
}

/// Cosine distance between two unit vectors: `1 - dot`.
pub fn cosine_distance(a: &[f32], b: &[f32]) -> f32 {
    1.0 - dot_product(a, b)
}

/// Divide every element by the L2 magnitude and return the magnitude.
///
/// A zero vector is left untouched and reports magnitude 0.
pub fn normalize_in_place(vec: &mut [f32]) -> f32 {
    let norm = vec.iter().map(|v| v * v).sum::<f32>().sqrt();
    if norm == 0.0 {
        return 0.0;
    }
    for value in vec.iter_mut() {
        *value /= norm;
    }
    norm
}

/// Normalize a whole collection once, returning how many vectors were degenerate.
pub fn normalize_all<I, V>(vectors: I) -> usize
where
    I: IntoIterator<Item = V>,
    V: AsMut<[f32]>,
{
    let mut degenerate = 0;
    for mut vector in vectors {
        if normalize_in_place(vector.as_mut()) == 0.0 {
            degenerate += 1;
        }
    }
    degenerate
}

/// Parse a raw JSON embedding payload (`[0.1, -0.2, ...]`).
///
/// When `expected_dimension` is given the payload must match it exactly.
pub fn parse_embedding(raw: &str, expected_dimension: Option<usize>) -> Result<Vec<f32>> {
    let values: Vec<f64> = serde_json::from_str(raw.trim())?;
    if values.is_empty() {
        return Err(VectorStoreError::InvalidEmbedding(
            "embedding is empty".to_string(),
        ));
    }
    if let Some(expected) = expected_dimension {
        if values.len() != expected {
            return Err(VectorStoreError::InvalidDimension {
                expected,
                actual: values.len(),
            });
        }
    }

    let mut vector = Vec::with_capacity(values.len());
    for (i, value) in values.into_iter().enumerate() {
        let value = value as f32;
        if !value.is_finite() {
            return Err(VectorStoreError::InvalidEmbedding(format!(
                "non-finite value at position {i}"
            )));
        }
        vector.push(value);
    }
    Ok(vector)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::collections::HashMap;

    #[test]
    fn test_dot_product() {
        assert_eq!(dot_product(&[1.0, 2.0, 3.0], &[4.0, 5.0, 6.0]), 32.0);
        assert_eq!(dot_product(&[], &[]), 0.0);
        assert_eq!(dot_product(&[1.0], &[1.0, 2.0]), 0.0);
    }

    #[test]
    fn test_normalize_three_four() {
        let mut v = vec![3.0, 4.0];
        let magnitude = normalize_in_place(&mut v);
        assert!((magnitude - 5.0).abs() < 1e-6);
        assert!((v[0] - 0.6).abs() < 1e-6);
        assert!((v[1] - 0.8).abs() < 1e-6);
    }

    #[test]
    fn test_normalize_zero_vector_is_untouched() {
        let mut v = vec![0.0, 0.0, 0.0];
        assert_eq!(normalize_in_place(&mut v), 0.0);
        assert_eq!(v, vec![0.0, 0.0, 0.0]);
    }

    #[test]
    fn test_normalize_all_counts_degenerate() {
        let mut vectors: HashMap<String, Vec<f32>> = HashMap::new();
        vectors.insert("a".into(), vec![2.0, 0.0]);
        vectors.insert("b".into(), vec![0.0, 0.0]);

        assert_eq!(normalize_all(vectors.values_mut()), 1);
        assert_eq!(vectors["a"], vec![1.0, 0.0]);
        assert_eq!(vectors["b"], vec![0.0, 0.0]);
    }

    #[test]
    fn test_parse_embedding() {
        assert_eq!(parse_embedding("[1, 0.5, -2]", None).unwrap(), vec![1.0, 0.5, -2.0]);
        assert!(parse_embedding("not json", None).is_err());
        assert!(parse_embedding("[]", None).is_err());
        assert!(parse_embedding("{\"a\":1}", None).is_err());
        assert!(parse_embedding("[1e300]", None).is_err());
        assert!(matches!(
            parse_embedding("[1, 2]", Some(3)),
            Err(VectorStoreError::InvalidDimension { expected: 3, actual: 2 })
        ));
    }
}
