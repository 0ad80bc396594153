use phloem_core::{ModuleDefinition, Operation};

/// Stomatal conductance to water vapor via the Ball–Berry relation,
/// `gsw = b0 + b1 * A * hs / Cs`, coupled to the leaf boundary layer.
///
/// The CO2 mole fraction at the leaf surface is the ambient value drawn
/// down by assimilation across the boundary layer, and the surface
/// relative humidity `hs` is found from water vapor continuity: the flux
/// through the stomata, `gsw * (1 - hs)`, equals the flux through the
/// boundary layer, `gbw * (hs - rh)`. Substituting the Ball–Berry
/// expression for `gsw` gives a quadratic in `hs`, of which the positive
/// root is physical.
///
/// When assimilation is zero or negative the stomata close down to the
/// residual conductance `b0`.
///
/// All conductances and the assimilation rate are in mol / m^2 / s; the
/// output conductance is reported in mmol / m^2 / s.
pub fn ball_berry_gs(
    net_assimilation_rate: f64, // mol / m^2 / s
    atmospheric_c: f64,         // mol / mol
    ambient_rh: f64,            // dimensionless
    b0: f64,                    // mol / m^2 / s
    b1: f64,                    // dimensionless
    gbw: f64,                   // mol / m^2 / s
) -> f64 {
    // CO2 at the leaf surface, drawn down across the boundary layer. The
    // factor 1.37 is the ratio of CO2 to water vapor diffusivity in the
    // boundary layer.
    let cs = atmospheric_c - 1.37 * net_assimilation_rate / gbw;

    if net_assimilation_rate <= 0.0 || cs <= 0.0 {
        return b0 * 1e3;
    }

    let k = b1 * net_assimilation_rate / cs;

    // k * hs^2 + (b0 + gbw - k) * hs - (b0 + gbw * rh) = 0
    let b = b0 + gbw - k;
    let c = -(b0 + gbw * ambient_rh);
    let hs = (-b + (b * b - 4.0 * k * c).sqrt()) / (2.0 * k);

    (b0 + k * hs) * 1e3
}

/// The Ball–Berry stomatal conductance module.
pub struct BallBerry;

impl BallBerry {
    pub fn input_names() -> Vec<String> {
        vec![
            "net_assimilation_rate".to_string(), // mol / m^2 / s
            "Catm".to_string(),                  // mol / mol
            "rh".to_string(),                    // dimensionless
            "b0".to_string(),                    // mol / m^2 / s
            "b1".to_string(),                    // dimensionless
            "gbw".to_string(),                   // mol / m^2 / s
        ]
    }

    pub fn output_names() -> Vec<String> {
        vec![
            "leaf_stomatal_conductance".to_string(), // mmol / m^2 / s
        ]
    }

    #[must_use]
    pub fn definition() -> ModuleDefinition {
        ModuleDefinition::steady(
            "ball_berry",
            Self::input_names(),
            Self::output_names(),
            Box::new(Self),
        )
    }
}

impl Operation for BallBerry {
    fn run(&self, inputs: &[f64], outputs: &mut [f64]) {
        let &[net_assimilation_rate, atmospheric_c, rh, b0, b1, gbw] = inputs else {
            unreachable!("inputs follow the declared list");
        };

        outputs[0] = ball_berry_gs(net_assimilation_rate, atmospheric_c, rh, b0, b1, gbw);
    }
}
