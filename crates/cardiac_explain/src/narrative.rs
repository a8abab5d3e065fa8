//! Explanation text for predictions.
//!
//! The policy is a fixed table keyed on the predicted class and confidence.
//! For confident abnormal predictions a [`Finding`] is drawn uniformly at
//! random: it is a presentation heuristic chosen without looking at the image
//! or the saliency map, and must not be read as a diagnosis of which
//! abnormality is present.

use cardiac_core::CardiacClass;
use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::error::{ExplainError, Result};

const HEALTHY_TEXT: &str =
    "The cardiac scan appears normal with no significant abnormalities detected.";
const GENERIC_ABNORMAL_TEXT: &str =
    "The scan shows cardiac abnormalities that may indicate cardiovascular disease.";

/// Wording variant used for confident abnormal predictions.
///
/// Non-diagnostic: the variant is sampled at random, not inferred.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Finding {
    /// Wording about enlarged heart chambers.
    EnlargedChambers,
    /// Wording about reduced blood flow.
    ReducedFlow,
    /// Wording about structural abnormalities.
    StructuralAbnormality,
}

impl Finding {
    /// All variants, in selection order.
    pub const ALL: [Finding; 3] = [
        Finding::EnlargedChambers,
        Finding::ReducedFlow,
        Finding::StructuralAbnormality,
    ];

    /// Explanation sentence for this variant.
    pub const fn text(self) -> &'static str {
        match self {
            Finding::EnlargedChambers => {
                "Enlarged heart chambers detected, suggesting possible cardiomyopathy."
            }
            Finding::ReducedFlow => {
                "Reduced blood flow observed, potentially indicating coronary artery disease."
            }
            Finding::StructuralAbnormality => {
                "Structural abnormalities visible, which may require further evaluation."
            }
        }
    }
}

/// Explanation policy options.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExplanationConfig {
    /// Abnormal predictions with confidence strictly above this value get a
    /// specific wording; the rest get the generic one.
    pub specific_threshold: f64,
}

impl Default for ExplanationConfig {
    fn default() -> Self {
        Self {
            specific_threshold: 0.75,
        }
    }
}

/// Generated explanation text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Explanation {
    text: &'static str,
    finding: Option<Finding>,
}

impl Explanation {
    /// The sentence shown to the user.
    pub fn text(&self) -> &'static str {
        self.text
    }

    /// Sampled wording variant, if one was used. Non-diagnostic.
    pub fn finding(&self) -> Option<Finding> {
        self.finding
    }
}

/// Maps `(class, confidence)` to explanation text.
#[derive(Debug, Clone, Default)]
pub struct ExplanationPolicy {
    config: ExplanationConfig,
}

impl ExplanationPolicy {
    /// Create a policy.
    ///
    /// # Errors
    ///
    /// Returns [`ExplainError::InvalidConfig`] if the threshold is outside
    /// `[0, 1]`.
    pub fn new(config: ExplanationConfig) -> Result<Self> {
        if !(0.0..=1.0).contains(&config.specific_threshold) {
            return Err(ExplainError::InvalidConfig(format!(
                "specific_threshold must be in [0, 1], got {}",
                config.specific_threshold
            )));
        }
        Ok(Self { config })
    }

    /// Policy options.
    pub fn config(&self) -> &ExplanationConfig {
        &self.config
    }

    /// Pick the explanation for a prediction. Only confident abnormal
    /// predictions consume randomness.
    pub fn explain<R: Rng + ?Sized>(
        &self,
        class: CardiacClass,
        confidence: f64,
        rng: &mut R,
    ) -> Explanation {
        match class {
            CardiacClass::Healthy => Explanation {
                text: HEALTHY_TEXT,
                finding: None,
            },
            CardiacClass::Abnormal if confidence > self.config.specific_threshold => {
                let finding = Finding::ALL[rng.gen_range(0..Finding::ALL.len())];
                Explanation {
                    text: finding.text(),
                    finding: Some(finding),
                }
            }
            CardiacClass::Abnormal => Explanation {
                text: GENERIC_ABNORMAL_TEXT,
                finding: None,
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;
    use std::collections::HashMap;

    #[test]
    fn test_healthy_is_fixed() {
        let policy = ExplanationPolicy::default();
        let mut rng = ChaCha8Rng::seed_from_u64(0);
        for confidence in [0.5, 0.9, 1.0] {
            let explanation = policy.explain(CardiacClass::Healthy, confidence, &mut rng);
            assert_eq!(explanation.text(), HEALTHY_TEXT);
            assert_eq!(explanation.finding(), None);
        }
    }

    #[test]
    fn test_threshold_is_exclusive() {
        let policy = ExplanationPolicy::default();
        let mut rng = ChaCha8Rng::seed_from_u64(0);

        let at = policy.explain(CardiacClass::Abnormal, 0.75, &mut rng);
        assert_eq!(at.text(), GENERIC_ABNORMAL_TEXT);

        let above = policy.explain(CardiacClass::Abnormal, 0.7501, &mut rng);
        assert!(above.finding().is_some());
        assert_eq!(above.text(), above.finding().unwrap().text());
    }

    #[test]
    fn test_seeded_selection_is_reproducible() {
        let policy = ExplanationPolicy::default();
        let draw = |seed| {
            let mut rng = ChaCha8Rng::seed_from_u64(seed);
            (0..20)
                .map(|_| policy.explain(CardiacClass::Abnormal, 0.9, &mut rng).finding())
                .collect::<Vec<_>>()
        };
        assert_eq!(draw(42), draw(42));
    }

    #[test]
    fn test_specific_variants_roughly_uniform() {
        let policy = ExplanationPolicy::default();
        let mut rng = ChaCha8Rng::seed_from_u64(7);
        let mut counts: HashMap<Finding, usize> = HashMap::new();
        for _ in 0..3000 {
            let finding = policy
                .explain(CardiacClass::Abnormal, 0.9, &mut rng)
                .finding()
                .unwrap();
            *counts.entry(finding).or_default() += 1;
        }
        for finding in Finding::ALL {
            let n = counts.get(&finding).copied().unwrap_or(0);
            assert!((850..1150).contains(&n), "{finding:?} drawn {n} times");
        }
    }

    #[test]
    fn test_invalid_threshold() {
        let config = ExplanationConfig {
            specific_threshold: 1.5,
        };
        assert!(ExplanationPolicy::new(config).is_err());
    }
}
