use std::sync::Mutex;

use serde::Serialize;

/// The three independent progress channels reported by the driver.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ProgressChannel {
    /// Tables and statements completed.
    Overall,
    /// Rows masked in the current table.
    Masking,
    /// Rows written (or batched, in dry-run mode) in the current table.
    Updating,
}

impl ProgressChannel {
    pub const ALL: [ProgressChannel; 3] = [Self::Overall, Self::Masking, Self::Updating];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Overall => "overall",
            Self::Masking => "masking",
            Self::Updating => "updating",
        }
    }

    fn index(self) -> usize {
        match self {
            Self::Overall => 0,
            Self::Masking => 1,
            Self::Updating => 2,
        }
    }
}

/// Receives progress updates. `max` and `label` are `None` when unchanged.
pub trait ProgressSink: Send + Sync {
    fn update(&self, channel: ProgressChannel, current: u64, max: Option<u64>, label: Option<&str>);
}

/// Silent mode.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopProgress;

impl ProgressSink for NoopProgress {
    fn update(&self, _: ProgressChannel, _: u64, _: Option<u64>, _: Option<&str>) {}
}

/// Current value, maximum and label of one channel.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ProgressState {
    pub current: u64,
    pub max: Option<u64>,
    pub label: Option<String>,
}

/// Progress counters owned by one pipeline run.
///
/// Counters only move forward until the channel is reset.
pub struct ProgressTracker<'a> {
    sink: &'a dyn ProgressSink,
    states: Mutex<[ProgressState; 3]>,
}

impl<'a> ProgressTracker<'a> {
    pub fn new(sink: &'a dyn ProgressSink) -> Self {
        Self {
            sink,
            states: Mutex::new(Default::default()),
        }
    }

    /// Restart a channel at zero with a new maximum and label.
    pub fn reset(&self, channel: ProgressChannel, max: Option<u64>, label: &str) {
        if let Ok(mut states) = self.states.lock() {
            states[channel.index()] = ProgressState {
                current: 0,
                max,
                label: Some(label.to_string()),
            };
        }
        self.sink.update(channel, 0, max, Some(label));
    }

    /// Change the label without moving the counter.
    pub fn relabel(&self, channel: ProgressChannel, label: &str) {
        let current = match self.states.lock() {
            Ok(mut states) => {
                let state = &mut states[channel.index()];
                state.label = Some(label.to_string());
                state.current
            }
            Err(_) => return,
        };
        self.sink.update(channel, current, None, Some(label));
    }

    /// Move a channel to `current`; lower values are ignored.
    pub fn advance_to(&self, channel: ProgressChannel, current: u64) {
        let moved = match self.states.lock() {
            Ok(mut states) => {
                let state = &mut states[channel.index()];
                if current > state.current {
                    state.current = current;
                    true
                } else {
                    false
                }
            }
            Err(_) => false,
        };
        if moved {
            self.sink.update(channel, current, None, None);
        }
    }

    pub fn snapshot(&self, channel: ProgressChannel) -> ProgressState {
        self.states
            .lock()
            .map(|states| states[channel.index()].clone())
            .unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Default)]
    struct Recorder(Mutex<Vec<(ProgressChannel, u64)>>);

    impl ProgressSink for Recorder {
        fn update(&self, channel: ProgressChannel, current: u64, _: Option<u64>, _: Option<&str>) {
            self.0.lock().expect("recorder lock").push((channel, current));
        }
    }

    #[test]
    fn counters_never_move_backwards() {
        let recorder = Recorder::default();
        let tracker = ProgressTracker::new(&recorder);
        tracker.reset(ProgressChannel::Updating, Some(10), "customers");
        tracker.advance_to(ProgressChannel::Updating, 4);
        tracker.advance_to(ProgressChannel::Updating, 2);
        tracker.advance_to(ProgressChannel::Updating, 4);
        tracker.advance_to(ProgressChannel::Updating, 10);

        let seen = recorder.0.lock().expect("recorder lock").clone();
        assert_eq!(
            seen,
            vec![
                (ProgressChannel::Updating, 0),
                (ProgressChannel::Updating, 4),
                (ProgressChannel::Updating, 10),
            ]
        );
        assert_eq!(tracker.snapshot(ProgressChannel::Updating).current, 10);
    }

    #[test]
    fn reset_starts_the_channel_over() {
        let tracker = ProgressTracker::new(&NoopProgress);
        tracker.reset(ProgressChannel::Masking, Some(3), "a");
        tracker.advance_to(ProgressChannel::Masking, 3);
        tracker.reset(ProgressChannel::Masking, Some(8), "b");

        let state = tracker.snapshot(ProgressChannel::Masking);
        assert_eq!(state.current, 0);
        assert_eq!(state.max, Some(8));
        assert_eq!(state.label.as_deref(), Some("b"));
        assert_eq!(tracker.snapshot(ProgressChannel::Overall), ProgressState::default());
    }
}
