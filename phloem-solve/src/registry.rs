use std::collections::BTreeMap;

use crate::{AdaptiveFallback, Method, SolveError, Solver, SolverConfig};

type SolverCreator = fn(SolverConfig) -> Result<Solver, SolveError>;

fn euler(config: SolverConfig) -> Result<Solver, SolveError> {
    Solver::new(Method::Euler, config)
}

fn rk4(config: SolverConfig) -> Result<Solver, SolveError> {
    Solver::new(Method::Rk4, config)
}

fn dopri5(config: SolverConfig) -> Result<Solver, SolveError> {
    Solver::new(Method::Dopri5, config)
}

fn dop853(config: SolverConfig) -> Result<Solver, SolveError> {
    Solver::new(Method::Dop853, config)
}

/// Adaptive Dormand–Prince stepping when the system allows it, falling back
/// to the fixed-step Euler loop when it does not.
fn auto(config: SolverConfig) -> Result<Solver, SolveError> {
    Solver::new(Method::Dopri5, config)
        .map(|solver| solver.with_fallback(AdaptiveFallback::FixedStepEuler))
}

/// A name-keyed registry of solver constructors.
///
/// The registry is an explicit value — construct it once and pass it to
/// whatever resolves solver names; there is no global registry state.
#[derive(Debug, Clone)]
pub struct SolverRegistry {
    creators: BTreeMap<&'static str, SolverCreator>,
}

impl SolverRegistry {
    /// Creates a registry with the built-in strategies registered.
    #[must_use]
    pub fn new() -> Self {
        let mut creators: BTreeMap<&'static str, SolverCreator> = BTreeMap::new();
        creators.insert("auto", auto);
        creators.insert("dop853", dop853);
        creators.insert("dopri5", dopri5);
        creators.insert("euler", euler);
        creators.insert("rk4", rk4);
        Self { creators }
    }

    /// Builds the named solver with the given config.
    ///
    /// # Errors
    ///
    /// Returns [`SolveError::UnknownSolver`] naming the identifier if no
    /// solver is registered under it, or [`SolveError::InvalidConfig`] if
    /// the config does not validate.
    pub fn create(&self, name: &str, config: SolverConfig) -> Result<Solver, SolveError> {
        let creator = self
            .creators
            .get(name)
            .ok_or_else(|| SolveError::UnknownSolver {
                name: name.to_string(),
            })?;
        creator(config)
    }

    /// The registered solver names, in sorted order.
    #[must_use]
    pub fn solver_names(&self) -> Vec<&'static str> {
        self.creators.keys().copied().collect()
    }
}

impl Default for SolverRegistry {
    fn default() -> Self {
        Self::new()
    }
}
