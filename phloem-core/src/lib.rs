//! The simulation engine for Phloem.
//!
//! A simulation is a set of named scalar quantities evolved through time by
//! interchangeable computational modules:
//!
//! - A [`QuantityStore`] maps quantity names to values, with bind-time slot
//!   resolution so evaluation loops never look names up.
//! - A [`ModuleDefinition`] declares a module's input and output quantity
//!   names and carries its [`Operation`]. Steady modules compute derived
//!   values as pure functions of the current state; derivative modules
//!   produce the time derivatives of state variables.
//! - [`multilayer_module`] replicates a single-layer canopy computation
//!   across layers and leaf classes, generating indexed quantity names
//!   such as `sunlit_incident_par_layer_3`.
//! - A [`DynamicalSystem`] owns the bound module graph, runs steady modules
//!   in topological dependency order followed by the derivative modules,
//!   and exposes the result as a derivative function of state and time for
//!   the integrators in `phloem-solve`.

mod module;
mod multilayer;
mod store;
mod system;
mod timeseries;

pub use module::{BindError, BoundModule, ModuleDefinition, ModuleKind, Operation};
pub use multilayer::{
    LayerContext, LayerModel, MultilayerError, MultilayerExpansion, layer_quantity,
    multilayer_module, multilayer_module_with_outputs,
};
pub use store::{QuantityStore, Slot, StoreError};
pub use system::{DynamicalSystem, QuantityRole, SystemError, TIME_QUANTITY, TimeSpan};
pub use timeseries::{Snapshot, TimeSeries};
