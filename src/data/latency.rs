//! Per-interval latency from cumulative counters.
//!
//! The store only reports totals since startup. The latency for the last
//! interval is the growth in total time divided by the growth in calls
//! between two consecutive snapshots.

use std::collections::HashMap;

use crate::source::{CommandRow, Snapshot};

/// The two counters needed to difference one command across polls.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CounterSample {
    pub calls: u64,
    pub duration: u64,
}

impl From<&CommandRow> for CounterSample {
    fn from(row: &CommandRow) -> Self {
        Self {
            calls: row.calls,
            duration: row.duration,
        }
    }
}

/// Average time per call over the interval between `previous` and `current`.
///
/// - No previous sample: lifetime average `duration / calls`, or `None`
///   when `calls` is zero.
/// - Counters that did not advance or went backwards (stats reset, no new
///   calls) give `0.0`.
///
/// ```
/// use cmdstat_watch::data::{compute_latency, CounterSample};
///
/// let first = CounterSample { calls: 10, duration: 2000 };
/// let second = CounterSample { calls: 20, duration: 3000 };
/// assert_eq!(compute_latency(first, None), Some(200.0));
/// assert_eq!(compute_latency(second, Some(first)), Some(100.0));
/// ```
pub fn compute_latency(current: CounterSample, previous: Option<CounterSample>) -> Option<f64> {
    let Some(previous) = previous else {
        return (current.calls > 0).then(|| current.duration as f64 / current.calls as f64);
    };

    if current.calls <= previous.calls || current.duration < previous.duration {
        return Some(0.0);
    }

    let diff_calls = current.calls - previous.calls;
    let diff_duration = current.duration - previous.duration;
    Some(diff_duration as f64 / diff_calls as f64)
}

/// Counters from the last snapshot, keyed by command name.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PreviousCounters {
    samples: HashMap<String, CounterSample>,
}

impl PreviousCounters {
    pub fn from_snapshot(snapshot: &Snapshot) -> Self {
        Self {
            samples: snapshot
                .iter()
                .map(|row| (row.command.clone(), CounterSample::from(row)))
                .collect(),
        }
    }

    pub fn get(&self, command: &str) -> Option<CounterSample> {
        self.samples.get(command).copied()
    }
}

/// Latency for every row of `current`, in row order.
///
/// Rows are matched to the previous snapshot by command name, so reordered
/// or newly appearing commands never borrow another command's counters.
/// A command absent from `previous` is treated as a first observation.
pub fn compute_latencies(previous: &PreviousCounters, current: &Snapshot) -> Vec<Option<f64>> {
    current
        .iter()
        .map(|row| compute_latency(CounterSample::from(row), previous.get(&row.command)))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample(calls: u64, duration: u64) -> CounterSample {
        CounterSample { calls, duration }
    }

    #[test]
    fn first_observation_is_lifetime_average() {
        assert_eq!(compute_latency(sample(10, 2000), None), Some(200.0));
        assert_eq!(compute_latency(sample(3, 10), None), Some(10.0 / 3.0));
    }

    #[test]
    fn first_observation_without_calls_is_undefined() {
        assert_eq!(compute_latency(sample(0, 0), None), None);
        assert_eq!(compute_latency(sample(0, 50), None), None);
    }

    #[test]
    fn delta_between_samples() {
        let latency = compute_latency(sample(20, 3000), Some(sample(10, 2000)));
        assert_eq!(latency, Some(100.0));
    }

    #[test]
    fn zero_duration_growth_is_zero_latency() {
        let latency = compute_latency(sample(20, 2000), Some(sample(10, 2000)));
        assert_eq!(latency, Some(0.0));
    }

    #[test]
    fn no_new_calls_clamps_to_zero() {
        let latency = compute_latency(sample(20, 3500), Some(sample(20, 3000)));
        assert_eq!(latency, Some(0.0));
    }

    #[test]
    fn counter_reset_clamps_to_zero() {
        assert_eq!(
            compute_latency(sample(5, 100), Some(sample(20, 3000))),
            Some(0.0)
        );
        // More calls but less total time
        assert_eq!(
            compute_latency(sample(30, 100), Some(sample(20, 3000))),
            Some(0.0)
        );
    }

    #[test]
    fn clamping_holds_across_a_grid() {
        for prev_calls in 0..6u64 {
            for prev_duration in (0..60u64).step_by(15) {
                for calls in 0..6u64 {
                    for duration in (0..60u64).step_by(15) {
                        let latency = compute_latency(
                            sample(calls, duration),
                            Some(sample(prev_calls, prev_duration)),
                        )
                        .unwrap();
                        if calls <= prev_calls || duration < prev_duration {
                            assert_eq!(latency, 0.0);
                        } else {
                            let expected = (duration - prev_duration) as f64
                                / (calls - prev_calls) as f64;
                            assert_eq!(latency, expected);
                        }
                        assert!(latency >= 0.0);
                    }
                }
            }
        }
    }

    #[test]
    fn batch_matches_by_command_name() {
        let previous = PreviousCounters::from_snapshot(&Snapshot::new(vec![
            CommandRow::new("get", 10, 2000),
            CommandRow::new("set", 4, 100),
        ]));

        // Reordered, with a new command appearing in between
        let current = Snapshot::new(vec![
            CommandRow::new("set", 6, 300),
            CommandRow::new("del", 2, 50),
            CommandRow::new("get", 20, 3000),
        ]);

        let latencies = compute_latencies(&previous, &current);
        assert_eq!(latencies, vec![Some(100.0), Some(25.0), Some(100.0)]);
    }

    #[test]
    fn batch_on_empty_previous_uses_lifetime_average() {
        let current = Snapshot::new(vec![
            CommandRow::new("get", 10, 2000),
            CommandRow::new("noop", 0, 0),
        ]);
        let latencies = compute_latencies(&PreviousCounters::default(), &current);
        assert_eq!(latencies, vec![Some(200.0), None]);
    }
}
