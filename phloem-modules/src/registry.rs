use std::collections::BTreeMap;

use thiserror::Error;

use phloem_core::ModuleDefinition;

use crate::{
    ball_berry::BallBerry, canopy_properties::ten_layer_canopy_properties,
    light_macro_environment::LightMacroEnvironment,
    penman_monteith_leaf_temperature::PenmanMonteithLeafTemperature,
    senescence_coefficient_logistic::SenescenceCoefficientLogistic,
    thermal_time_linear::ThermalTimeLinear,
};

/// The error returned when a module name is not registered.
#[derive(Debug, Error, PartialEq, Eq)]
#[error("\"{name}\" was given as a module name, but no module with that name is registered")]
pub struct UnknownModule {
    pub name: String,
}

type ModuleCreator = fn() -> ModuleDefinition;

/// A name-keyed registry of module constructors.
///
/// Like the solver registry, this is an explicit value with no global
/// state: construct it once and pass it to whatever assembles systems from
/// quantity-name-keyed configuration.
#[derive(Debug, Clone)]
pub struct ModuleRegistry {
    creators: BTreeMap<&'static str, ModuleCreator>,
}

impl ModuleRegistry {
    /// Creates a registry with the library modules registered.
    #[must_use]
    pub fn new() -> Self {
        let mut creators: BTreeMap<&'static str, ModuleCreator> = BTreeMap::new();
        creators.insert("ball_berry", BallBerry::definition);
        creators.insert("light_macro_environment", LightMacroEnvironment::definition);
        creators.insert(
            "penman_monteith_leaf_temperature",
            PenmanMonteithLeafTemperature::definition,
        );
        creators.insert(
            "senescence_coefficient_logistic",
            SenescenceCoefficientLogistic::definition,
        );
        creators.insert("ten_layer_canopy_properties", ten_layer_canopy_properties);
        creators.insert("thermal_time_linear", ThermalTimeLinear::definition);
        Self { creators }
    }

    /// Builds the named module's definition.
    ///
    /// # Errors
    ///
    /// Returns [`UnknownModule`] naming the identifier if no module is
    /// registered under it.
    pub fn create(&self, name: &str) -> Result<ModuleDefinition, UnknownModule> {
        let creator = self.creators.get(name).ok_or_else(|| UnknownModule {
            name: name.to_string(),
        })?;
        Ok(creator())
    }

    /// The registered module names, in sorted order.
    #[must_use]
    pub fn module_names(&self) -> Vec<&'static str> {
        self.creators.keys().copied().collect()
    }
}

impl Default for ModuleRegistry {
    fn default() -> Self {
        Self::new()
    }
}
