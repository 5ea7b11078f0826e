//! Min-max score normalization

use webrank_common::errors::{AppError, Result};

/// Lowest normalized value
pub const NORMALIZED_FLOOR: f64 = 0.1;

/// Map scores onto `[0.1, 1.0]`, preserving order
///
/// A set with no spread maps to all 1.0. An empty set is an error.
pub fn normalize(values: &[f64]) -> Result<Vec<f64>> {
    if values.is_empty() {
        return Err(AppError::InvalidInput {
            message: "cannot normalize an empty score list".to_string(),
        });
    }

    let min = values.iter().copied().fold(f64::INFINITY, f64::min);
    let max = values.iter().copied().fold(f64::NEG_INFINITY, f64::max);

    if max == min {
        return Ok(vec![1.0; values.len()]);
    }

    let span = max - min;
    Ok(values
        .iter()
        .map(|v| NORMALIZED_FLOOR + (1.0 - NORMALIZED_FLOOR) * (v - min) / span)
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_flat_scores_map_to_one() {
        assert_eq!(normalize(&[5.0, 5.0, 5.0]).unwrap(), vec![1.0, 1.0, 1.0]);
    }

    #[test]
    fn test_extremes() {
        assert_eq!(normalize(&[0.0, 10.0]).unwrap(), vec![0.1, 1.0]);
    }

    #[test]
    fn test_midpoint() {
        let normalized = normalize(&[0.0, 5.0, 10.0]).unwrap();
        assert!((normalized[1] - 0.55).abs() < 1e-12);
        assert_eq!(normalized[0], 0.1);
        assert_eq!(normalized[2], 1.0);
    }

    #[test]
    fn test_single_value() {
        assert_eq!(normalize(&[0.42]).unwrap(), vec![1.0]);
    }

    #[test]
    fn test_empty_is_invalid() {
        assert!(matches!(normalize(&[]), Err(AppError::InvalidInput { .. })));
    }
}
