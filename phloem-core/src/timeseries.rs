use std::collections::HashMap;

use serde::{Deserialize, Serialize};

/// The full set of quantity values at a single point in simulation time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Snapshot {
    pub time: f64,
    pub quantities: HashMap<String, f64>,
}

impl Snapshot {
    /// Returns the value of a named quantity, if present.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<f64> {
        self.quantities.get(name).copied()
    }
}

/// An ordered sequence of timestamped state snapshots, one per accepted
/// integration step.
///
/// The series is append-only while an integration runs and covers the
/// closed interval from the system's initial to its final time.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TimeSeries {
    steps: Vec<Snapshot>,
}

impl TimeSeries {
    /// Creates an empty series.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a snapshot for the next accepted step.
    pub fn push(&mut self, snapshot: Snapshot) {
        self.steps.push(snapshot);
    }

    /// The recorded snapshots, in time order.
    #[must_use]
    pub fn steps(&self) -> &[Snapshot] {
        &self.steps
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.steps.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    #[must_use]
    pub fn first(&self) -> Option<&Snapshot> {
        self.steps.first()
    }

    #[must_use]
    pub fn last(&self) -> Option<&Snapshot> {
        self.steps.last()
    }

    /// Extracts one quantity's trajectory as `(time, value)` pairs.
    ///
    /// Snapshots that do not contain the quantity are skipped.
    pub fn quantity<'a>(&'a self, name: &'a str) -> impl Iterator<Item = (f64, f64)> + 'a {
        self.steps
            .iter()
            .filter_map(move |step| step.get(name).map(|value| (step.time, value)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn snapshot(time: f64, value: f64) -> Snapshot {
        Snapshot {
            time,
            quantities: HashMap::from([("biomass".to_string(), value)]),
        }
    }

    #[test]
    fn records_steps_in_order() {
        let mut series = TimeSeries::new();
        series.push(snapshot(0.0, 1.0));
        series.push(snapshot(1.0, 1.5));
        series.push(snapshot(2.0, 2.25));

        assert_eq!(series.len(), 3);
        assert_eq!(series.first().unwrap().time, 0.0);
        assert_eq!(series.last().unwrap().time, 2.0);

        let trajectory: Vec<_> = series.quantity("biomass").collect();
        assert_eq!(trajectory, vec![(0.0, 1.0), (1.0, 1.5), (2.0, 2.25)]);
    }

    #[test]
    fn missing_quantities_are_skipped() {
        let mut series = TimeSeries::new();
        series.push(snapshot(0.0, 1.0));

        assert_eq!(series.quantity("unknown").count(), 0);
    }
}
