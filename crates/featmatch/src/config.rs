use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::descriptor::NormType;
use crate::error::MatcherError;
use crate::geometry::{FundamentalMethod, RobustParams};

/// Raw matcher parameters, as written in a configuration file.
///
/// Norms and fundamental matrix methods are stored as integer codes. They are
/// only interpreted once the parameters are validated into a [`MatcherConfig`].
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct MatcherParams {
    /// Norm code: 1 (Inf), 2 (L1), 4 (L2), 5 (L2Sqr), 6 (Hamming), 7 (Hamming2).
    pub norm_type: i32,
    /// Use two-nearest-neighbor search with the ratio test instead of cross-checked matching.
    pub use_knn: bool,
    /// Maximum best/second-best distance ratio accepted in k-NN mode, in `[0, 1]`.
    pub ratio_threshold: f64,
    /// Multiple of the minimum match distance accepted in cross-check mode.
    pub distance_threshold: i32,
    /// Reject matches inconsistent with a fitted fundamental matrix.
    pub auto_remove_outliers: bool,
    /// Fundamental matrix method code: 1 (7-point), 2 (8-point), 4 (LMedS), 8 (RANSAC).
    pub fm_method: i32,
    /// Parameters of the robust estimators.
    #[serde(default)]
    pub robust: RobustParams,
}

impl Default for MatcherParams {
    fn default() -> Self {
        Self {
            norm_type: NormType::Hamming.code(),
            use_knn: true,
            ratio_threshold: 0.8,
            distance_threshold: 5,
            auto_remove_outliers: true,
            fm_method: FundamentalMethod::Ransac.code(),
            robust: RobustParams::default(),
        }
    }
}

impl MatcherParams {
    /// Parse parameters from a JSON string.
    pub fn from_json_str(json: &str) -> Result<Self, MatcherError> {
        serde_json::from_str(json).map_err(|e| MatcherError::ConfigLoad(e.to_string()))
    }

    /// Read parameters from a JSON file.
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self, MatcherError> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path)
            .map_err(|e| MatcherError::ConfigLoad(format!("{}: {e}", path.display())))?;
        Self::from_json_str(&contents)
    }
}

/// How raw matches are produced and filtered.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum MatchingStrategy {
    /// Mutually-nearest single matches, filtered by a multiple of the minimum distance.
    CrossCheck {
        /// Matches farther than `distance_threshold * min_distance` are dropped.
        distance_threshold: u32,
    },
    /// Two nearest neighbors per query, filtered by the ratio test.
    Knn {
        /// Maximum accepted best/second-best distance ratio.
        ratio_threshold: f64,
    },
}

/// Validated, immutable matcher configuration.
#[derive(Clone, Debug, PartialEq)]
pub struct MatcherConfig {
    norm: NormType,
    strategy: MatchingStrategy,
    auto_remove_outliers: bool,
    method: FundamentalMethod,
    robust: RobustParams,
}

impl MatcherConfig {
    /// Validate raw parameters.
    ///
    /// Fails with [`MatcherError::InvalidConfiguration`] on an unknown norm or
    /// method code, a ratio outside `[0, 1]`, a negative distance threshold or
    /// out-of-range robust estimator parameters.
    pub fn new(params: &MatcherParams) -> Result<Self, MatcherError> {
        let norm = NormType::from_code(params.norm_type).ok_or_else(|| invalid(format!(
            "norm_type {} is not one of the acceptable values",
            params.norm_type
        )))?;

        if !(0.0..=1.0).contains(&params.ratio_threshold) {
            return Err(invalid(format!(
                "ratio_threshold {} is outside [0, 1]",
                params.ratio_threshold
            )));
        }

        let distance_threshold = u32::try_from(params.distance_threshold).map_err(|_| {
            invalid(format!(
                "distance_threshold {} is negative",
                params.distance_threshold
            ))
        })?;

        let method = FundamentalMethod::from_code(params.fm_method).ok_or_else(|| {
            invalid(format!(
                "fm_method {} is not one of the acceptable values",
                params.fm_method
            ))
        })?;

        let robust = params.robust;
        if robust.confidence.is_nan() || robust.confidence <= 0.0 || robust.confidence >= 1.0 {
            return Err(invalid(format!(
                "robust.confidence {} is outside (0, 1)",
                robust.confidence
            )));
        }
        if robust.threshold.is_nan() || robust.threshold <= 0.0 {
            return Err(invalid(format!(
                "robust.threshold {} must be positive",
                robust.threshold
            )));
        }
        if robust.max_iterations == 0 {
            return Err(invalid("robust.max_iterations must be non-zero".to_string()));
        }

        // cross-checking only makes sense for single matches
        let strategy = if params.use_knn {
            MatchingStrategy::Knn {
                ratio_threshold: params.ratio_threshold,
            }
        } else {
            MatchingStrategy::CrossCheck { distance_threshold }
        };

        Ok(Self {
            norm,
            strategy,
            auto_remove_outliers: params.auto_remove_outliers,
            method,
            robust,
        })
    }

    /// Descriptor distance metric.
    pub fn norm(&self) -> NormType {
        self.norm
    }

    /// Matching and filtering strategy.
    pub fn strategy(&self) -> MatchingStrategy {
        self.strategy
    }

    /// Whether geometric outlier rejection runs after filtering.
    pub fn auto_remove_outliers(&self) -> bool {
        self.auto_remove_outliers
    }

    /// Fundamental matrix method used for outlier rejection.
    pub fn method(&self) -> FundamentalMethod {
        self.method
    }

    /// Robust estimator parameters.
    pub fn robust(&self) -> &RobustParams {
        &self.robust
    }
}

impl TryFrom<MatcherParams> for MatcherConfig {
    type Error = MatcherError;

    fn try_from(params: MatcherParams) -> Result<Self, Self::Error> {
        Self::new(&params)
    }
}

impl TryFrom<&MatcherParams> for MatcherConfig {
    type Error = MatcherError;

    fn try_from(params: &MatcherParams) -> Result<Self, Self::Error> {
        Self::new(params)
    }
}

fn invalid(reason: String) -> MatcherError {
    MatcherError::InvalidConfiguration { reason }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_params_are_valid() -> Result<(), MatcherError> {
        let config = MatcherConfig::new(&MatcherParams::default())?;
        assert_eq!(config.norm(), NormType::Hamming);
        assert_eq!(config.method(), FundamentalMethod::Ransac);
        assert!(config.auto_remove_outliers());
        assert_eq!(
            config.strategy(),
            MatchingStrategy::Knn {
                ratio_threshold: 0.8
            }
        );
        Ok(())
    }

    #[test]
    fn test_cross_check_follows_use_knn() -> Result<(), MatcherError> {
        let params = MatcherParams {
            use_knn: false,
            distance_threshold: 3,
            ..Default::default()
        };
        let config = MatcherConfig::try_from(params)?;
        assert_eq!(
            config.strategy(),
            MatchingStrategy::CrossCheck {
                distance_threshold: 3
            }
        );
        Ok(())
    }

    #[test]
    fn test_rejects_hybrid_norm_code() {
        let params = MatcherParams {
            norm_type: 3,
            ..Default::default()
        };
        assert!(matches!(
            MatcherConfig::new(&params),
            Err(MatcherError::InvalidConfiguration { .. })
        ));
    }

    #[test]
    fn test_rejects_out_of_range_values() {
        let cases = [
            MatcherParams {
                norm_type: 0,
                ..Default::default()
            },
            MatcherParams {
                norm_type: 8,
                ..Default::default()
            },
            MatcherParams {
                ratio_threshold: 1.5,
                ..Default::default()
            },
            MatcherParams {
                ratio_threshold: -0.1,
                ..Default::default()
            },
            MatcherParams {
                ratio_threshold: f64::NAN,
                ..Default::default()
            },
            MatcherParams {
                distance_threshold: -1,
                ..Default::default()
            },
            MatcherParams {
                fm_method: 3,
                ..Default::default()
            },
            MatcherParams {
                robust: RobustParams {
                    confidence: 1.0,
                    ..Default::default()
                },
                ..Default::default()
            },
            MatcherParams {
                robust: RobustParams {
                    threshold: 0.0,
                    ..Default::default()
                },
                ..Default::default()
            },
            MatcherParams {
                robust: RobustParams {
                    max_iterations: 0,
                    ..Default::default()
                },
                ..Default::default()
            },
        ];
        for params in cases {
            assert!(
                matches!(
                    MatcherConfig::new(&params),
                    Err(MatcherError::InvalidConfiguration { .. })
                ),
                "{params:?} should be rejected"
            );
        }
    }

    #[test]
    fn test_boundary_values_are_valid() {
        for ratio_threshold in [0.0, 1.0] {
            let params = MatcherParams {
                ratio_threshold,
                distance_threshold: 0,
                ..Default::default()
            };
            assert!(MatcherConfig::new(&params).is_ok());
        }
    }

    #[test]
    fn test_params_from_json() -> Result<(), MatcherError> {
        let json = r#"{
            "norm_type": 4,
            "use_knn": false,
            "ratio_threshold": 0.7,
            "distance_threshold": 4,
            "auto_remove_outliers": false,
            "fm_method": 2
        }"#;
        let params = MatcherParams::from_json_str(json)?;
        assert_eq!(params.norm_type, 4);
        assert!(!params.use_knn);
        assert_eq!(params.robust, RobustParams::default());

        let config = MatcherConfig::new(&params)?;
        assert_eq!(config.norm(), NormType::L2);
        assert_eq!(config.method(), FundamentalMethod::EightPoint);
        Ok(())
    }

    #[test]
    fn test_params_from_json_missing_field() {
        let json = r#"{ "norm_type": 4, "use_knn": true }"#;
        assert!(matches!(
            MatcherParams::from_json_str(json),
            Err(MatcherError::ConfigLoad(_))
        ));
    }

    #[test]
    fn test_params_from_json_file() -> Result<(), Box<dyn std::error::Error>> {
        let dir = tempfile::tempdir()?;
        let path = dir.path().join("matcher.json");
        let params = MatcherParams {
            use_knn: false,
            fm_method: FundamentalMethod::LMedS.code(),
            ..Default::default()
        };
        std::fs::write(&path, serde_json::to_string_pretty(&params)?)?;

        let loaded = MatcherParams::from_json_file(&path)?;
        assert_eq!(loaded, params);

        let missing = MatcherParams::from_json_file(dir.path().join("missing.json"));
        assert!(matches!(missing, Err(MatcherError::ConfigLoad(_))));
        Ok(())
    }
}
