//! Probability distributions over the class set.

use serde::{Deserialize, Serialize};

use crate::error::{CoreError, Result};

/// Tolerance used when checking that probabilities sum to one.
const SUM_TOLERANCE: f64 = 1e-5;

/// A probability distribution over mutually exclusive classes.
///
/// Invariants: every probability lies in `[0, 1]`, the probabilities sum to
/// one within `1e-5`, and [`argmax`](Self::argmax) breaks ties towards the
/// lowest index.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClassDistribution {
    probabilities: Vec<f64>,
}

impl ClassDistribution {
    /// Build a distribution from raw network scores with a numerically stable
    /// softmax.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::InvalidDistribution`] for an empty slice or
    /// non-finite scores.
    pub fn from_logits(logits: &[f32]) -> Result<Self> {
        if logits.is_empty() {
            return Err(CoreError::InvalidDistribution("no logits".to_string()));
        }
        if let Some(bad) = logits.iter().find(|v| !v.is_finite()) {
            return Err(CoreError::InvalidDistribution(format!(
                "non-finite logit {bad}"
            )));
        }

        let max = logits
            .iter()
            .map(|&v| f64::from(v))
            .fold(f64::NEG_INFINITY, f64::max);
        let exps: Vec<f64> = logits.iter().map(|&v| (f64::from(v) - max).exp()).collect();
        let total: f64 = exps.iter().sum();

        Self::from_probabilities(exps.into_iter().map(|e| e / total).collect())
    }

    /// Wrap already-normalised probabilities.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::InvalidDistribution`] if a value is outside
    /// `[0, 1]` or the values do not sum to one.
    pub fn from_probabilities(probabilities: Vec<f64>) -> Result<Self> {
        if probabilities.is_empty() {
            return Err(CoreError::InvalidDistribution(
                "no probabilities".to_string(),
            ));
        }
        if let Some(bad) = probabilities
            .iter()
            .find(|p| !p.is_finite() || **p < 0.0 || **p > 1.0)
        {
            return Err(CoreError::InvalidDistribution(format!(
                "probability {bad} outside [0, 1]"
            )));
        }
        let sum: f64 = probabilities.iter().sum();
        if (sum - 1.0).abs() > SUM_TOLERANCE {
            return Err(CoreError::InvalidDistribution(format!(
                "probabilities sum to {sum}"
            )));
        }
        Ok(Self { probabilities })
    }

    /// Index of the most probable class; the lowest index wins exact ties.
    #[must_use]
    pub fn argmax(&self) -> usize {
        let mut best = 0;
        for (i, &p) in self.probabilities.iter().enumerate().skip(1) {
            if p > self.probabilities[best] {
                best = i;
            }
        }
        best
    }

    /// Probability of the argmax class.
    #[must_use]
    pub fn confidence(&self) -> f64 {
        self.probabilities[self.argmax()]
    }

    /// Probability of class `index`, if it exists.
    #[must_use]
    pub fn get(&self, index: usize) -> Option<f64> {
        self.probabilities.get(index).copied()
    }

    /// All probabilities in class order.
    #[must_use]
    pub fn probabilities(&self) -> &[f64] {
        &self.probabilities
    }

    /// Number of classes.
    #[must_use]
    pub fn len(&self) -> usize {
        self.probabilities.len()
    }

    /// Always false: construction rejects empty distributions.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.probabilities.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_softmax_sums_to_one() {
        let dist = ClassDistribution::from_logits(&[1.5, -0.3]).unwrap();
        let sum: f64 = dist.probabilities().iter().sum();
        assert!((sum - 1.0).abs() < 1e-12);
        assert_eq!(dist.argmax(), 0);
        assert!(dist.confidence() > 0.5 && dist.confidence() <= 1.0);
    }

    #[test]
    fn test_softmax_is_stable_for_large_logits() {
        let dist = ClassDistribution::from_logits(&[1000.0, 999.0]).unwrap();
        let expected = 1.0 / (1.0 + (-1.0f64).exp());
        assert!((dist.probabilities()[0] - expected).abs() < 1e-9);
    }

    #[test]
    fn test_tie_prefers_lowest_index() {
        let dist = ClassDistribution::from_logits(&[0.0, 0.0]).unwrap();
        assert_eq!(dist.argmax(), 0);
        assert!((dist.confidence() - 0.5).abs() < 1e-12);

        let dist = ClassDistribution::from_logits(&[-1.0, 3.0, 3.0]).unwrap();
        assert_eq!(dist.argmax(), 1);
    }

    #[test]
    fn test_rejects_non_finite_logits() {
        assert!(ClassDistribution::from_logits(&[f32::NAN, 0.0]).is_err());
        assert!(ClassDistribution::from_logits(&[]).is_err());
    }

    #[test]
    fn test_rejects_unnormalised_probabilities() {
        assert!(ClassDistribution::from_probabilities(vec![0.6, 0.6]).is_err());
        assert!(ClassDistribution::from_probabilities(vec![1.2, -0.2]).is_err());
        assert!(ClassDistribution::from_probabilities(vec![0.25, 0.75]).is_ok());
    }
}
