use serde::{Deserialize, Serialize};

/// Tunable parameters shared by every solver strategy.
///
/// Fixed-step methods use `step_size` directly; adaptive methods treat it
/// as the initial step and control subsequent steps with the error
/// tolerances. `max_steps` bounds the number of accepted steps in a single
/// integration — exceeding it is a failure, never a truncated result.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SolverConfig {
    pub step_size: f64,
    pub rel_error_tolerance: f64,
    pub abs_error_tolerance: f64,
    pub max_steps: usize,
}

impl Default for SolverConfig {
    fn default() -> Self {
        Self {
            step_size: 1.0,
            rel_error_tolerance: 1e-4,
            abs_error_tolerance: 1e-4,
            max_steps: 10_000,
        }
    }
}

impl SolverConfig {
    /// Validates that the step size and tolerances are finite and positive
    /// and that at least one step is allowed.
    ///
    /// # Errors
    ///
    /// Returns a description of the first invalid field.
    pub fn validate(&self) -> Result<(), &'static str> {
        if !self.step_size.is_finite() || self.step_size <= 0.0 {
            return Err("step_size must be finite and positive");
        }
        if !self.rel_error_tolerance.is_finite() || self.rel_error_tolerance <= 0.0 {
            return Err("rel_error_tolerance must be finite and positive");
        }
        if !self.abs_error_tolerance.is_finite() || self.abs_error_tolerance <= 0.0 {
            return Err("abs_error_tolerance must be finite and positive");
        }
        if self.max_steps == 0 {
            return Err("max_steps must be at least 1");
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_is_valid() {
        assert_eq!(SolverConfig::default().validate(), Ok(()));
    }

    #[test]
    fn rejects_bad_fields() {
        let bad_step = SolverConfig {
            step_size: 0.0,
            ..SolverConfig::default()
        };
        assert!(bad_step.validate().is_err());

        let bad_tol = SolverConfig {
            rel_error_tolerance: f64::NAN,
            ..SolverConfig::default()
        };
        assert!(bad_tol.validate().is_err());

        let bad_abs = SolverConfig {
            abs_error_tolerance: -1e-6,
            ..SolverConfig::default()
        };
        assert!(bad_abs.validate().is_err());

        let no_steps = SolverConfig {
            max_steps: 0,
            ..SolverConfig::default()
        };
        assert!(no_steps.validate().is_err());
    }
}
