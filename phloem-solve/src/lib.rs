//! Numerical integrators for the Phloem framework.
//!
//! A [`Solver`] advances a
//! [`DynamicalSystem`](phloem_core::DynamicalSystem) over its time span and
//! accumulates a [`TimeSeries`](phloem_core::TimeSeries) of state
//! snapshots, one per accepted step. Strategies are a closed set of
//! [`Method`]s: a hand-rolled fixed-step Euler loop plus the Runge–Kutta
//! steppers of the `ode_solvers` crate, with adaptive step-size control
//! against the configured error tolerances.
//!
//! Solvers are resolved by name through the [`SolverRegistry`]; the `auto`
//! entry pairs adaptive stepping with a fixed-step Euler fallback for
//! systems that declare themselves incompatible with adaptive integration.

mod config;
mod error;
mod registry;
mod solver;

pub use config::SolverConfig;
pub use error::SolveError;
pub use registry::SolverRegistry;
pub use solver::{AdaptiveFallback, Method, Solver};
