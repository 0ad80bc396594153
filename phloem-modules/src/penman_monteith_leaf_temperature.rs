use phloem_core::{ModuleDefinition, Operation};

// From Thornley and Johnson (1990), p. 418, eq. 14.11e. Valid near 20 deg. C
// at 100 kPa.
// TODO: derive this from the air temperature and pressure quantities
// instead of assuming standard conditions.
const VOLUME_OF_ONE_MOLE_OF_AIR: f64 = 24.39e-3; // m^3 / mol

/// Leaf temperature from the Penman–Monteith energy balance.
///
/// Computes the temperature offset between a leaf and the surrounding air
/// from the balance of net irradiance against latent and sensible heat
/// exchange through the boundary layer and stomata, then reports
/// `leaf_temperature = temp + delta_t`.
pub struct PenmanMonteithLeafTemperature;

impl PenmanMonteithLeafTemperature {
    pub fn input_names() -> Vec<String> {
        vec![
            "slope_water_vapor".to_string(),                 // kg / m^3 / K
            "psychrometric_parameter".to_string(),           // kg / m^3 / K
            "latent_heat_vaporization_of_water".to_string(), // J / kg
            "leaf_boundary_layer_conductance".to_string(),   // m / s
            "leaf_stomatal_conductance".to_string(),         // mmol / m^2 / s
            "leaf_net_irradiance".to_string(),               // W / m^2, leaf area basis
            "vapor_density_deficit".to_string(),             // kg / m^3
            "temp".to_string(),                              // deg. C
        ]
    }

    pub fn output_names() -> Vec<String> {
        vec![
            "leaf_temperature".to_string(), // deg. C
        ]
    }

    #[must_use]
    pub fn definition() -> ModuleDefinition {
        ModuleDefinition::steady(
            "penman_monteith_leaf_temperature",
            Self::input_names(),
            Self::output_names(),
            Box::new(Self),
        )
    }
}

impl Operation for PenmanMonteithLeafTemperature {
    fn run(&self, inputs: &[f64], outputs: &mut [f64]) {
        let &[
            slope_water_vapor,
            psychrometric_parameter,
            latent_heat_vaporization,
            ga,
            leaf_stomatal_conductance,
            leaf_net_irradiance,
            vapor_density_deficit,
            air_temperature,
        ] = inputs
        else {
            unreachable!("inputs follow the declared list");
        };

        // Stomatal conductance converted from mmol / m^2 / s to m / s.
        let gc = leaf_stomatal_conductance * 1e-3 * VOLUME_OF_ONE_MOLE_OF_AIR;

        let delta_t = (leaf_net_irradiance * (1.0 / ga + 1.0 / gc)
            - latent_heat_vaporization * vapor_density_deficit)
            / (latent_heat_vaporization
                * (slope_water_vapor + psychrometric_parameter * (1.0 + ga / gc)));

        outputs[0] = air_temperature + delta_t;
    }
}
