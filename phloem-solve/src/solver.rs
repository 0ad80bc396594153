use std::cell::RefCell;

use ode_solvers::{DVector, System};

use phloem_core::{DynamicalSystem, TimeSeries};

use crate::{SolveError, SolverConfig};

/// The stepping strategies available to a [`Solver`].
///
/// The strategy set is closed: every solver is one of these methods, with
/// behavior differing in step-size policy (fixed versus adaptive via local
/// error estimates) and order of accuracy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Method {
    /// First-order explicit Euler with a fixed step size.
    ///
    /// The only method with no smoothness requirements on the system, and
    /// therefore the substitute strategy when an adaptive method meets an
    /// adaptive-incompatible system.
    Euler,

    /// Classic fourth-order Runge–Kutta with a fixed step size.
    ///
    /// Higher accuracy per step than Euler without error control; step
    /// size is chosen by the caller, not adapted.
    Rk4,

    /// Adaptive Dormand–Prince 5(4) Runge–Kutta.
    ///
    /// An embedded pair whose local error estimate drives the step size to
    /// stay within the configured relative and absolute tolerances.
    Dopri5,

    /// Adaptive Dormand–Prince 8(5,3) Runge–Kutta.
    ///
    /// Higher order than `Dopri5`; more work per step, usually fewer steps
    /// for tight tolerances over long intervals.
    Dop853,
}

impl Method {
    /// Whether this method controls its step size with local error
    /// estimates, and so requires an adaptive-compatible system.
    #[must_use]
    pub fn is_adaptive(self) -> bool {
        matches!(self, Self::Dopri5 | Self::Dop853)
    }
}

/// What an adaptive solver does when the system reports itself incompatible
/// with adaptive stepping.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AdaptiveFallback {
    /// Substitute the fixed-step Euler loop at the configured step size.
    FixedStepEuler,
    /// Fail with [`SolveError::AdaptiveIncompatible`].
    Fail,
}

/// A configured integration strategy.
///
/// A solver owns the system for the duration of one
/// [`integrate`](Solver::integrate) call and produces one snapshot per
/// accepted step over the system's time span.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Solver {
    method: Method,
    config: SolverConfig,
    fallback: AdaptiveFallback,
}

impl Solver {
    /// Creates a solver for the given method.
    ///
    /// Adaptive methods fail on adaptive-incompatible systems unless a
    /// fallback is configured with [`with_fallback`](Solver::with_fallback).
    ///
    /// # Errors
    ///
    /// Returns [`SolveError::InvalidConfig`] if the config does not
    /// validate.
    pub fn new(method: Method, config: SolverConfig) -> Result<Self, SolveError> {
        config
            .validate()
            .map_err(|reason| SolveError::InvalidConfig { reason })?;
        Ok(Self {
            method,
            config,
            fallback: AdaptiveFallback::Fail,
        })
    }

    /// Sets the behavior on adaptive-incompatible systems.
    #[must_use]
    pub fn with_fallback(mut self, fallback: AdaptiveFallback) -> Self {
        self.fallback = fallback;
        self
    }

    #[must_use]
    pub fn method(&self) -> Method {
        self.method
    }

    #[must_use]
    pub fn config(&self) -> SolverConfig {
        self.config
    }

    #[must_use]
    pub fn fallback(&self) -> AdaptiveFallback {
        self.fallback
    }

    /// Integrates the system over its time span.
    ///
    /// Resets the system's call counter, then advances from the initial
    /// state at the span start to the span end, recording a snapshot per
    /// accepted step (the closed interval includes both endpoints). If the
    /// method is adaptive and the system is not adaptive-compatible, the
    /// configured [`AdaptiveFallback`] applies instead of the requested
    /// algorithm.
    ///
    /// # Errors
    ///
    /// Returns [`SolveError::StepLimitExceeded`] if reaching the span end
    /// would take more than `max_steps` accepted steps,
    /// [`SolveError::AdaptiveIncompatible`] per the fallback configuration,
    /// or [`SolveError::Numerical`] if the underlying stepper fails.
    pub fn integrate(&self, system: &mut DynamicalSystem) -> Result<TimeSeries, SolveError> {
        system.reset_ncalls();

        if self.method.is_adaptive() && !system.is_adaptive_compatible() {
            return match self.fallback {
                AdaptiveFallback::FixedStepEuler => self.integrate_euler(system),
                AdaptiveFallback::Fail => Err(SolveError::AdaptiveIncompatible),
            };
        }

        match self.method {
            Method::Euler => self.integrate_euler(system),
            Method::Rk4 | Method::Dopri5 | Method::Dop853 => self.integrate_ode(system),
        }
    }

    /// The hand-rolled fixed-step Euler loop:
    /// `state_{n+1} = state_n + derivative_n * dt`, with the final step
    /// shortened to land exactly on the span end.
    fn integrate_euler(&self, system: &mut DynamicalSystem) -> Result<TimeSeries, SolveError> {
        let span = system.span();
        let max_steps = self.config.max_steps;

        let mut state = system.initial_state();
        let mut dstate = vec![0.0; state.len()];
        let mut time = span.start();
        let mut steps = 0usize;

        let mut series = TimeSeries::new();
        series.push(system.snapshot(time, &state));

        while time < span.end() {
            if steps == max_steps {
                return Err(SolveError::StepLimitExceeded { max_steps });
            }

            let dt = self.config.step_size.min(span.end() - time);
            system.derivatives(time, &state, &mut dstate);
            for (value, derivative) in state.iter_mut().zip(&dstate) {
                *value += derivative * dt;
            }
            time += dt;
            steps += 1;

            series.push(system.snapshot(time, &state));
        }

        Ok(series)
    }

    /// Runs one of the `ode_solvers` steppers, then rebuilds full quantity
    /// snapshots by re-running the steady phase at each accepted step.
    fn integrate_ode(&self, system: &mut DynamicalSystem) -> Result<TimeSeries, SolveError> {
        let span = system.span();
        let max_steps = self.config.max_steps;

        if !self.method.is_adaptive() {
            let planned = (span.duration() / self.config.step_size).ceil() as usize;
            if planned > max_steps {
                return Err(SolveError::StepLimitExceeded { max_steps });
            }
        }

        let (x_out, y_out) = self.run_stepper(system)?;

        // The stepper records the initial point plus one entry per
        // accepted step.
        if x_out.len() > max_steps + 1 {
            return Err(SolveError::StepLimitExceeded { max_steps });
        }

        let mut series = TimeSeries::new();
        for (time, state) in x_out.iter().zip(&y_out) {
            series.push(system.snapshot(*time, state.as_slice()));
        }
        Ok(series)
    }

    /// Drives the selected `ode_solvers` stepper and returns its accepted
    /// `(time, state)` sequence.
    fn run_stepper(
        &self,
        system: &mut DynamicalSystem,
    ) -> Result<(Vec<f64>, Vec<DVector<f64>>), SolveError> {
        let span = system.span();
        let y_start = DVector::from_vec(system.initial_state());
        let stepped = OdeSystem {
            system: RefCell::new(system),
        };

        let numerical = |err: ode_solvers::dop_shared::IntegrationError| SolveError::Numerical {
            reason: format!("{err:?}"),
        };

        match self.method {
            Method::Rk4 => {
                let mut stepper = ode_solvers::Rk4::new(
                    stepped,
                    span.start(),
                    y_start,
                    span.end(),
                    self.config.step_size,
                );
                stepper.integrate().map_err(numerical)?;
                Ok((stepper.x_out().clone(), stepper.y_out().clone()))
            }
            Method::Dopri5 => {
                let mut stepper = ode_solvers::Dopri5::new(
                    stepped,
                    span.start(),
                    span.end(),
                    self.config.step_size,
                    y_start,
                    self.config.rel_error_tolerance,
                    self.config.abs_error_tolerance,
                );
                stepper.integrate().map_err(numerical)?;
                Ok((stepper.x_out().clone(), stepper.y_out().clone()))
            }
            Method::Dop853 => {
                let mut stepper = ode_solvers::Dop853::new(
                    stepped,
                    span.start(),
                    span.end(),
                    self.config.step_size,
                    y_start,
                    self.config.rel_error_tolerance,
                    self.config.abs_error_tolerance,
                );
                stepper.integrate().map_err(numerical)?;
                Ok((stepper.x_out().clone(), stepper.y_out().clone()))
            }
            Method::Euler => unreachable!("the Euler loop does not use an external stepper"),
        }
    }
}

/// Adapts a [`DynamicalSystem`] to the `ode_solvers` system interface.
struct OdeSystem<'a> {
    system: RefCell<&'a mut DynamicalSystem>,
}

impl System<f64, DVector<f64>> for OdeSystem<'_> {
    fn system(&self, x: f64, y: &DVector<f64>, dy: &mut DVector<f64>) {
        self.system
            .borrow_mut()
            .derivatives(x, y.as_slice(), dy.as_mut_slice());
    }
}
