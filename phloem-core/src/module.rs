use thiserror::Error;

use crate::store::{QuantityStore, Slot};

/// Errors raised while binding a module to quantity stores.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum BindError {
    #[error("module \"{module}\" declares input \"{quantity}\", which is absent from the input store")]
    MissingInput { module: String, quantity: String },

    #[error("module \"{module}\" declares output \"{quantity}\", which is absent from the output store")]
    MissingOutput { module: String, quantity: String },
}

/// Whether a module's outputs are derived values or time derivatives.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModuleKind {
    /// Outputs are pure functions of the current quantities, recomputed on
    /// every evaluation pass and usable as inputs by later steady modules.
    Steady,
    /// Outputs are the time derivatives of state variables, consumed only
    /// by the integrator.
    Derivative,
}

/// The computation performed by a module.
///
/// `inputs` and `outputs` are positional: they follow the module's declared
/// input and output name lists. An operation must be pure — repeated calls
/// with identical inputs produce bit-identical outputs — which is what makes
/// topological reordering of steady modules safe.
pub trait Operation {
    fn run(&self, inputs: &[f64], outputs: &mut [f64]);
}

impl<F> Operation for F
where
    F: Fn(&[f64], &mut [f64]),
{
    fn run(&self, inputs: &[f64], outputs: &mut [f64]) {
        self(inputs, outputs);
    }
}

/// An unbound module: declared quantity names plus the operation that maps
/// input values to output values.
///
/// The declared names are the module's full contract; a module reads exactly
/// its declared inputs and writes exactly its declared outputs. Definitions
/// are produced by module constructors (or the multilayer generator) and
/// consumed by [`DynamicalSystem`](crate::DynamicalSystem), which binds each
/// name to a store slot.
pub struct ModuleDefinition {
    name: String,
    kind: ModuleKind,
    inputs: Vec<String>,
    outputs: Vec<String>,
    adaptive_compatible: bool,
    operation: Box<dyn Operation>,
}

impl std::fmt::Debug for ModuleDefinition {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ModuleDefinition")
            .field("name", &self.name)
            .field("kind", &self.kind)
            .field("inputs", &self.inputs)
            .field("outputs", &self.outputs)
            .field("adaptive_compatible", &self.adaptive_compatible)
            .finish_non_exhaustive()
    }
}

impl ModuleDefinition {
    /// Creates a steady module definition.
    #[must_use]
    pub fn steady(
        name: impl Into<String>,
        inputs: Vec<String>,
        outputs: Vec<String>,
        operation: Box<dyn Operation>,
    ) -> Self {
        Self {
            name: name.into(),
            kind: ModuleKind::Steady,
            inputs,
            outputs,
            adaptive_compatible: true,
            operation,
        }
    }

    /// Creates a derivative module definition.
    ///
    /// Each output name must match a state variable; the produced values are
    /// interpreted as `d(state)/dt`.
    #[must_use]
    pub fn derivative(
        name: impl Into<String>,
        inputs: Vec<String>,
        outputs: Vec<String>,
        operation: Box<dyn Operation>,
    ) -> Self {
        Self {
            name: name.into(),
            kind: ModuleKind::Derivative,
            inputs,
            outputs,
            adaptive_compatible: true,
            operation,
        }
    }

    /// Flags this module as incompatible with adaptive step-size control.
    ///
    /// Modules with thresholds or clamped responses break the smooth local
    /// error estimates that adaptive steppers rely on; a system containing
    /// such a module reports itself adaptive-incompatible.
    #[must_use]
    pub fn adaptive_incompatible(mut self) -> Self {
        self.adaptive_compatible = false;
        self
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[must_use]
    pub fn kind(&self) -> ModuleKind {
        self.kind
    }

    /// The declared input quantity names.
    #[must_use]
    pub fn input_names(&self) -> &[String] {
        &self.inputs
    }

    /// The declared output quantity names.
    #[must_use]
    pub fn output_names(&self) -> &[String] {
        &self.outputs
    }

    #[must_use]
    pub fn is_adaptive_compatible(&self) -> bool {
        self.adaptive_compatible
    }
}

/// A module whose declared names have been resolved to store slots.
///
/// Binding happens once, at system construction; evaluation reads and writes
/// through the resolved slots only. Because values are gathered from the
/// bound input slots and scattered to the bound output slots, a module
/// cannot touch any quantity outside its declaration.
pub struct BoundModule {
    definition: ModuleDefinition,
    input_slots: Vec<Slot>,
    output_slots: Vec<Slot>,
    input_values: Vec<f64>,
    output_values: Vec<f64>,
}

impl BoundModule {
    /// Resolves a definition's declared names against the given stores.
    ///
    /// Inputs are resolved in `input_store` and outputs in `output_store`.
    /// For steady modules both are the central quantity store; for
    /// derivative modules the outputs resolve in the separate derivative
    /// store.
    ///
    /// # Errors
    ///
    /// Returns [`BindError::MissingInput`] or [`BindError::MissingOutput`]
    /// naming the module and the offending quantity.
    pub fn bind(
        definition: ModuleDefinition,
        input_store: &QuantityStore,
        output_store: &QuantityStore,
    ) -> Result<Self, BindError> {
        let input_slots = definition
            .inputs
            .iter()
            .map(|name| {
                input_store
                    .resolve(name)
                    .map_err(|_| BindError::MissingInput {
                        module: definition.name.clone(),
                        quantity: name.clone(),
                    })
            })
            .collect::<Result<Vec<_>, _>>()?;

        let output_slots = definition
            .outputs
            .iter()
            .map(|name| {
                output_store
                    .resolve(name)
                    .map_err(|_| BindError::MissingOutput {
                        module: definition.name.clone(),
                        quantity: name.clone(),
                    })
            })
            .collect::<Result<Vec<_>, _>>()?;

        let input_values = vec![0.0; input_slots.len()];
        let output_values = vec![0.0; output_slots.len()];

        Ok(Self {
            definition,
            input_slots,
            output_slots,
            input_values,
            output_values,
        })
    }

    /// Evaluates the module in place: inputs and outputs resolve against the
    /// same store. This is the steady-phase mode, where a module's outputs
    /// may feed later modules' inputs within the same store.
    pub fn evaluate(&mut self, store: &mut QuantityStore) {
        for (value, slot) in self.input_values.iter_mut().zip(&self.input_slots) {
            *value = store.read(*slot);
        }
        self.definition
            .operation
            .run(&self.input_values, &mut self.output_values);
        for (slot, value) in self.output_slots.iter().zip(&self.output_values) {
            store.write(*slot, *value);
        }
    }

    /// Evaluates the module across stores: inputs from `input`, outputs into
    /// `output`. This is the derivative-phase mode.
    pub fn evaluate_into(&mut self, input: &QuantityStore, output: &mut QuantityStore) {
        for (value, slot) in self.input_values.iter_mut().zip(&self.input_slots) {
            *value = input.read(*slot);
        }
        self.definition
            .operation
            .run(&self.input_values, &mut self.output_values);
        for (slot, value) in self.output_slots.iter().zip(&self.output_values) {
            output.write(*slot, *value);
        }
    }

    #[must_use]
    pub fn definition(&self) -> &ModuleDefinition {
        &self.definition
    }

    #[must_use]
    pub fn name(&self) -> &str {
        self.definition.name()
    }

    #[must_use]
    pub fn kind(&self) -> ModuleKind {
        self.definition.kind()
    }
}
