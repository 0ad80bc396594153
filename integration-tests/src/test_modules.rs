use phloem_core::{DynamicalSystem, ModuleDefinition, SystemError, TimeSpan};

/// A derivative module for `dy/dt = -decay_rate * y`, used to compare
/// integrators against the closed-form exponential solution.
#[must_use]
pub fn exponential_decay() -> ModuleDefinition {
    ModuleDefinition::derivative(
        "exponential_decay",
        vec!["decay_rate".to_string(), "y".to_string()],
        vec!["y".to_string()],
        Box::new(|inputs: &[f64], outputs: &mut [f64]| {
            outputs[0] = -inputs[0] * inputs[1];
        }),
    )
}

/// A single-state decay system with `y(0) = 1` and the given decay rate.
///
/// # Errors
///
/// Returns an error if the span is invalid.
pub fn decay_system(decay_rate: f64, end: f64) -> Result<DynamicalSystem, SystemError> {
    DynamicalSystem::new(
        TimeSpan::new(0.0, end)?,
        vec![("y".to_string(), 1.0)],
        vec![("decay_rate".to_string(), decay_rate)],
        vec![exponential_decay()],
    )
}
