use phloem_core::{ModuleDefinition, Operation};

/// Accumulates thermal time using the basic linear model.
///
/// Development proceeds once the air temperature exceeds a base
/// temperature, at a rate proportional to the excess:
///
/// ```text
///   rate = 0                     when temp <= tbase
///   rate = (temp - tbase) / 24   otherwise
/// ```
///
/// The accumulated thermal time `TTc` has units of °C·day, so the daily
/// rate is divided by 24 to give the per-hour derivative used by the
/// integrator. The linear model is known to overestimate development at
/// high temperatures; it is the simplest member of the piecewise-linear
/// family (one cardinal temperature).
///
/// The rate is clamped at zero below the base temperature, which makes the
/// response non-smooth there, so the module is flagged incompatible with
/// adaptive step-size control.
pub struct ThermalTimeLinear;

impl ThermalTimeLinear {
    pub fn input_names() -> Vec<String> {
        vec![
            "temp".to_string(),  // deg. C
            "tbase".to_string(), // deg. C
        ]
    }

    pub fn output_names() -> Vec<String> {
        vec![
            "TTc".to_string(), // deg. C * day / hr
        ]
    }

    #[must_use]
    pub fn definition() -> ModuleDefinition {
        ModuleDefinition::derivative(
            "thermal_time_linear",
            Self::input_names(),
            Self::output_names(),
            Box::new(Self),
        )
        .adaptive_incompatible()
    }
}

impl Operation for ThermalTimeLinear {
    fn run(&self, inputs: &[f64], outputs: &mut [f64]) {
        let &[temp, tbase] = inputs else {
            unreachable!("inputs follow the declared list");
        };

        let rate_per_day = if temp <= tbase { 0.0 } else { temp - tbase };

        outputs[0] = rate_per_day / 24.0;
    }
}
