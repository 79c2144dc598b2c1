//! Runtime configuration for element contexts, the intensive-quantity cache
//! and the local linearizer.
//!
//! All structs deserialize with `#[serde(default)]`, so a partial document
//! only overrides the keys it names.

use crate::fv_error::FvError;
use serde::{Deserialize, Serialize};

/// Element context behaviour.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ContextConfig {
    /// Recompute sub-control-volume center gradients on every stencil update.
    pub require_center_gradients: bool,
}

/// Model-wide intensive-quantity cache behaviour.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    /// Serve and store intensive quantities keyed by (global dof, level).
    pub enable_intensive_quantity_cache: bool,
    /// Hand out previously computed bundles as starting guesses.
    pub enable_thermodynamic_hints: bool,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            enable_intensive_quantity_cache: true,
            enable_thermodynamic_hints: false,
        }
    }
}

/// Finite-difference scheme of the local linearizer.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DifferenceMethod {
    Forward,
    Backward,
    #[default]
    Central,
}

/// Numerical differentiation parameters.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LinearizerConfig {
    /// Perturbation is `base_epsilon * (1 + |pv|)`.
    pub base_epsilon: f64,
    pub difference: DifferenceMethod,
}

impl Default for LinearizerConfig {
    fn default() -> Self {
        Self {
            base_epsilon: 1e-8,
            difference: DifferenceMethod::Central,
        }
    }
}

/// Aggregate configuration.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FvConfig {
    pub context: ContextConfig,
    pub cache: CacheConfig,
    pub linearizer: LinearizerConfig,
}

impl FvConfig {
    /// Reject values no run can use; warn about combinations that do nothing.
    pub fn validate(&self) -> Result<(), FvError> {
        let eps = self.linearizer.base_epsilon;
        if !eps.is_finite() || eps <= 0.0 {
            return Err(FvError::InvalidConfig(format!(
                "linearizer.base_epsilon must be positive and finite, got {eps}"
            )));
        }
        if self.cache.enable_thermodynamic_hints && !self.cache.enable_intensive_quantity_cache {
            log::warn!("thermodynamic hints are enabled but the intensive quantity cache is off; no hints will be available");
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        let cfg = FvConfig::default();
        assert!(cfg.validate().is_ok());
        assert!(cfg.cache.enable_intensive_quantity_cache);
        assert_eq!(cfg.linearizer.difference, DifferenceMethod::Central);
    }

    #[test]
    fn non_positive_epsilon_is_rejected() {
        let mut cfg = FvConfig::default();
        cfg.linearizer.base_epsilon = 0.0;
        assert!(matches!(cfg.validate(), Err(FvError::InvalidConfig(_))));
        cfg.linearizer.base_epsilon = f64::NAN;
        assert!(cfg.validate().is_err());
    }
}
