use std::collections::HashMap;

use petgraph::{
    algo::{tarjan_scc, toposort},
    graph::DiGraph,
};
use thiserror::Error;

use crate::module::{BindError, BoundModule, ModuleDefinition, ModuleKind};
use crate::store::{QuantityStore, Slot, StoreError};
use crate::timeseries::Snapshot;

/// The reserved quantity name holding the current simulation time.
pub const TIME_QUANTITY: &str = "time";

/// Errors raised while assembling a [`DynamicalSystem`].
///
/// All of these are construction-time failures: a system that constructs
/// successfully has a complete, acyclic, fully-bound module graph.
#[derive(Debug, Error, PartialEq)]
pub enum SystemError {
    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    Bind(#[from] BindError),

    #[error("invalid time span: start {start} and end {end} must be finite with start <= end")]
    InvalidTimeSpan { start: f64, end: f64 },

    #[error("cyclic dependency among steady modules: {}", modules.join(", "))]
    CyclicDependency { modules: Vec<String> },

    #[error("state variable \"{quantity}\" has no derivative module producing it")]
    MissingDerivative { quantity: String },

    #[error("state variable \"{quantity}\" is produced by more than one derivative module")]
    DuplicateDerivative { quantity: String },

    #[error("derivative module \"{module}\" writes \"{quantity}\", which is not a state variable")]
    DerivativeWithoutState { module: String, quantity: String },
}

/// The closed simulation time interval a system is integrated over.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TimeSpan {
    start: f64,
    end: f64,
}

impl TimeSpan {
    /// Creates a time span from `start` to `end`.
    ///
    /// # Errors
    ///
    /// Returns [`SystemError::InvalidTimeSpan`] unless both endpoints are
    /// finite and `start <= end`.
    pub fn new(start: f64, end: f64) -> Result<Self, SystemError> {
        if start.is_finite() && end.is_finite() && start <= end {
            Ok(Self { start, end })
        } else {
            Err(SystemError::InvalidTimeSpan { start, end })
        }
    }

    #[must_use]
    pub fn start(&self) -> f64 {
        self.start
    }

    #[must_use]
    pub fn end(&self) -> f64 {
        self.end
    }

    #[must_use]
    pub fn duration(&self) -> f64 {
        self.end - self.start
    }
}

/// How a quantity participates in the simulation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QuantityRole {
    /// The reserved simulation-time quantity.
    Time,
    /// A constant supplied at construction.
    Parameter,
    /// An integrated state variable.
    State,
    /// An output of a steady module, recomputed every evaluation pass.
    Derived,
}

/// A fully-assembled simulation: the bound module graph plus the
/// classification of every quantity, evaluable as a derivative function of
/// state and time.
///
/// Construction resolves every declared quantity name to a store slot,
/// orders the steady modules topologically, and verifies that each state
/// variable has exactly one derivative producer. One evaluation pass writes
/// the state vector and time into the store, runs the steady modules in
/// dependency order, runs the derivative modules, and collects the
/// per-state derivatives — see [`derivatives`](DynamicalSystem::derivatives).
pub struct DynamicalSystem {
    span: TimeSpan,
    quantities: QuantityStore,
    derivatives: QuantityStore,
    steady: Vec<BoundModule>,
    derivative_modules: Vec<BoundModule>,
    state_names: Vec<String>,
    state_slots: Vec<Slot>,
    deriv_slots: Vec<Slot>,
    time_slot: Slot,
    initial_state: Vec<f64>,
    roles: HashMap<String, QuantityRole>,
    adaptive_compatible: bool,
    ncalls: u64,
}

impl DynamicalSystem {
    /// Assembles a system from initial state variables, parameters, and a
    /// set of module definitions (steady and derivative, in any order).
    ///
    /// # Errors
    ///
    /// Returns a [`SystemError`] if any quantity name is defined twice, a
    /// module input cannot be satisfied, the steady modules form a cycle,
    /// or the state variables and derivative outputs do not match one to
    /// one.
    pub fn new(
        span: TimeSpan,
        initial_state: Vec<(String, f64)>,
        parameters: Vec<(String, f64)>,
        modules: Vec<ModuleDefinition>,
    ) -> Result<Self, SystemError> {
        let adaptive_compatible = modules.iter().all(ModuleDefinition::is_adaptive_compatible);

        let mut quantities = QuantityStore::new();
        let mut roles = HashMap::new();

        let time_slot = quantities.insert(TIME_QUANTITY, span.start())?;
        roles.insert(TIME_QUANTITY.to_string(), QuantityRole::Time);

        for (name, value) in &parameters {
            quantities.insert(name.clone(), *value)?;
            roles.insert(name.clone(), QuantityRole::Parameter);
        }

        let mut state_names = Vec::with_capacity(initial_state.len());
        let mut state_slots = Vec::with_capacity(initial_state.len());
        let mut state_values = Vec::with_capacity(initial_state.len());
        for (name, value) in initial_state {
            state_slots.push(quantities.insert(name.clone(), value)?);
            roles.insert(name.clone(), QuantityRole::State);
            state_names.push(name);
            state_values.push(value);
        }

        let (steady_defs, derivative_defs): (Vec<_>, Vec<_>) = modules
            .into_iter()
            .partition(|def| def.kind() == ModuleKind::Steady);

        for def in &steady_defs {
            for output in def.output_names() {
                quantities.insert(output.clone(), 0.0)?;
                roles.insert(output.clone(), QuantityRole::Derived);
            }
        }

        // Derivative outputs live in a separate store with one slot per
        // state variable, so they can never be read back as inputs.
        let mut derivatives = QuantityStore::new();
        let mut deriv_slots = Vec::with_capacity(state_names.len());
        for name in &state_names {
            deriv_slots.push(derivatives.insert(name.clone(), 0.0)?);
        }

        let mut producers: HashMap<&str, &str> = HashMap::new();
        for def in &derivative_defs {
            for output in def.output_names() {
                if !state_names.iter().any(|state| state == output) {
                    return Err(SystemError::DerivativeWithoutState {
                        module: def.name().to_string(),
                        quantity: output.clone(),
                    });
                }
                if producers.insert(output.as_str(), def.name()).is_some() {
                    return Err(SystemError::DuplicateDerivative {
                        quantity: output.clone(),
                    });
                }
            }
        }
        for name in &state_names {
            if !producers.contains_key(name.as_str()) {
                return Err(SystemError::MissingDerivative {
                    quantity: name.clone(),
                });
            }
        }
        drop(producers);

        let order = steady_evaluation_order(&steady_defs)?;
        let mut rank = vec![0; order.len()];
        for (position, &index) in order.iter().enumerate() {
            rank[index] = position;
        }
        let mut indexed: Vec<(usize, ModuleDefinition)> =
            steady_defs.into_iter().enumerate().collect();
        indexed.sort_by_key(|(index, _)| rank[*index]);

        let steady = indexed
            .into_iter()
            .map(|(_, def)| BoundModule::bind(def, &quantities, &quantities))
            .collect::<Result<Vec<_>, _>>()?;

        let derivative_modules = derivative_defs
            .into_iter()
            .map(|def| BoundModule::bind(def, &quantities, &derivatives))
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self {
            span,
            quantities,
            derivatives,
            steady,
            derivative_modules,
            state_names,
            state_slots,
            deriv_slots,
            time_slot,
            initial_state: state_values,
            roles,
            adaptive_compatible,
            ncalls: 0,
        })
    }

    /// The time interval this system is defined over.
    #[must_use]
    pub fn span(&self) -> TimeSpan {
        self.span
    }

    /// State variable names, in state-vector order.
    #[must_use]
    pub fn state_names(&self) -> &[String] {
        &self.state_names
    }

    /// The initial state vector, in [`state_names`](Self::state_names) order.
    #[must_use]
    pub fn initial_state(&self) -> Vec<f64> {
        self.initial_state.clone()
    }

    /// How the named quantity participates in the simulation, if defined.
    #[must_use]
    pub fn role(&self, name: &str) -> Option<QuantityRole> {
        self.roles.get(name).copied()
    }

    /// Read access to the central quantity store.
    #[must_use]
    pub fn quantities(&self) -> &QuantityStore {
        &self.quantities
    }

    /// Whether every module in the system is compatible with adaptive
    /// step-size control. Fixed at construction.
    #[must_use]
    pub fn is_adaptive_compatible(&self) -> bool {
        self.adaptive_compatible
    }

    /// The number of derivative evaluations since the last reset.
    #[must_use]
    pub fn ncalls(&self) -> u64 {
        self.ncalls
    }

    /// Zeroes the derivative evaluation counter.
    pub fn reset_ncalls(&mut self) {
        self.ncalls = 0;
    }

    /// Computes the full derivative vector for the given state and time.
    ///
    /// Runs one evaluation pass: bind state and time, run steady modules in
    /// dependency order, run derivative modules, collect `d(state)/dt` into
    /// `dstate` in state-vector order. Counts as one call.
    ///
    /// # Panics
    ///
    /// Panics if `state` or `dstate` does not match the number of state
    /// variables; callers control both vectors, so a mismatch is a bug.
    pub fn derivatives(&mut self, time: f64, state: &[f64], dstate: &mut [f64]) {
        assert_eq!(state.len(), self.state_slots.len());
        assert_eq!(dstate.len(), self.deriv_slots.len());

        self.bind_state(time, state);
        for module in &mut self.steady {
            module.evaluate(&mut self.quantities);
        }
        for module in &mut self.derivative_modules {
            module.evaluate_into(&self.quantities, &mut self.derivatives);
        }
        for (value, slot) in dstate.iter_mut().zip(&self.deriv_slots) {
            *value = self.derivatives.read(*slot);
        }

        self.ncalls += 1;
    }

    /// Produces the full quantity map at the given state and time.
    ///
    /// Runs the steady phase only; does not count as a derivative call.
    ///
    /// # Panics
    ///
    /// Panics if `state` does not match the number of state variables.
    pub fn snapshot(&mut self, time: f64, state: &[f64]) -> Snapshot {
        assert_eq!(state.len(), self.state_slots.len());

        self.bind_state(time, state);
        for module in &mut self.steady {
            module.evaluate(&mut self.quantities);
        }

        Snapshot {
            time,
            quantities: self.quantities.to_map(),
        }
    }

    fn bind_state(&mut self, time: f64, state: &[f64]) {
        self.quantities.write(self.time_slot, time);
        for (slot, value) in self.state_slots.iter().zip(state) {
            self.quantities.write(*slot, *value);
        }
    }
}

/// Computes a dependency-correct evaluation order over the steady modules.
///
/// Builds a directed graph with an edge from each producer to every
/// consumer of one of its outputs, then sorts topologically. Node order
/// follows the order modules were supplied in, so ties break
/// deterministically and the result is reproducible.
fn steady_evaluation_order(defs: &[ModuleDefinition]) -> Result<Vec<usize>, SystemError> {
    let mut graph = DiGraph::<usize, ()>::new();
    let nodes: Vec<_> = (0..defs.len()).map(|index| graph.add_node(index)).collect();

    let mut producer_of: HashMap<&str, usize> = HashMap::new();
    for (index, def) in defs.iter().enumerate() {
        for output in def.output_names() {
            producer_of.insert(output.as_str(), index);
        }
    }

    for (index, def) in defs.iter().enumerate() {
        for input in def.input_names() {
            if let Some(&producer) = producer_of.get(input.as_str()) {
                graph.add_edge(nodes[producer], nodes[index], ());
            }
        }
    }

    match toposort(&graph, None) {
        Ok(sorted) => Ok(sorted.into_iter().map(|node| graph[node]).collect()),
        Err(_) => {
            let mut modules = Vec::new();
            for scc in tarjan_scc(&graph) {
                let cyclic = scc.len() > 1
                    || scc
                        .first()
                        .is_some_and(|&node| graph.find_edge(node, node).is_some());
                if cyclic {
                    modules.extend(scc.iter().map(|&node| defs[graph[node]].name().to_string()));
                }
            }
            modules.sort();
            Err(SystemError::CyclicDependency { modules })
        }
    }
}
