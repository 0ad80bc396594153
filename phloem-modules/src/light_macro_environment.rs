use phloem_core::{ModuleDefinition, Operation};

const ATMOSPHERIC_PRESSURE_AT_SEA_LEVEL: f64 = 101_325.0; // Pa

/// Direct and diffuse light just above the canopy.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LightModel {
    pub direct_transmittance: f64,
    pub diffuse_transmittance: f64,
    pub direct_fraction: f64,
    pub diffuse_fraction: f64,
}

/// Partitions sunlight into its direct and diffuse components at the
/// Earth's surface: the "light macro environment".
///
/// The transmittances relate surface light to the light incident on the
/// upper atmosphere (appropriate when starting from the solar constant);
/// the fractions describe how a measured surface intensity splits between
/// direct beam and diffuse sky light. Both follow chapter 11 of Campbell &
/// Norman, *An Introduction to Environmental Biophysics*, 2nd edition.
///
/// `cosine_zenith_angle` is 1 with the Sun directly overhead and 0 at the
/// horizon; at or below the horizon there is no direct beam and all
/// transmitted light is diffuse.
pub fn light_macro_environment(
    cosine_zenith_angle: f64,        // dimensionless
    atmospheric_pressure: f64,       // Pa
    atmospheric_transmittance: f64,  // dimensionless
    atmospheric_scattering: f64,     // dimensionless
) -> LightModel {
    let pressure_ratio = atmospheric_pressure / ATMOSPHERIC_PRESSURE_AT_SEA_LEVEL;

    // Campbell & Norman eq. 11.1, solved for S_p / S_p0.
    let direct_transmittance = if cosine_zenith_angle <= 0.0 {
        0.0
    } else {
        atmospheric_transmittance.powf(pressure_ratio / cosine_zenith_angle)
    };

    // Campbell & Norman eq. 11.13, solved for S_d / S_p0.
    let diffuse_transmittance = if cosine_zenith_angle <= 0.0 {
        1.0
    } else {
        atmospheric_scattering * (1.0 - direct_transmittance) * cosine_zenith_angle
    };

    let direct_fraction =
        direct_transmittance / (direct_transmittance + diffuse_transmittance);

    LightModel {
        direct_transmittance,
        diffuse_transmittance,
        direct_fraction,
        diffuse_fraction: 1.0 - direct_fraction,
    }
}

/// The light macro environment module.
pub struct LightMacroEnvironment;

impl LightMacroEnvironment {
    pub fn input_names() -> Vec<String> {
        vec![
            "cosine_zenith_angle".to_string(),       // dimensionless
            "atmospheric_pressure".to_string(),      // Pa
            "atmospheric_transmittance".to_string(), // dimensionless
            "atmospheric_scattering".to_string(),    // dimensionless
        ]
    }

    pub fn output_names() -> Vec<String> {
        vec![
            "direct_transmittance".to_string(),
            "diffuse_transmittance".to_string(),
            "direct_fraction".to_string(),
            "diffuse_fraction".to_string(),
        ]
    }

    #[must_use]
    pub fn definition() -> ModuleDefinition {
        ModuleDefinition::steady(
            "light_macro_environment",
            Self::input_names(),
            Self::output_names(),
            Box::new(Self),
        )
    }
}

impl Operation for LightMacroEnvironment {
    fn run(&self, inputs: &[f64], outputs: &mut [f64]) {
        let &[cosine_zenith_angle, pressure, transmittance, scattering] = inputs else {
            unreachable!("inputs follow the declared list");
        };

        let light =
            light_macro_environment(cosine_zenith_angle, pressure, transmittance, scattering);

        outputs[0] = light.direct_transmittance;
        outputs[1] = light.diffuse_transmittance;
        outputs[2] = light.direct_fraction;
        outputs[3] = light.diffuse_fraction;
    }
}
