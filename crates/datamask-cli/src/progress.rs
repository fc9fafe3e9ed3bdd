use std::io::{self, Write};
use std::sync::Mutex;
use std::time::{Duration, Instant};

use crossterm::cursor::MoveToColumn;
use crossterm::queue;
use crossterm::style::Print;
use crossterm::terminal::{Clear, ClearType};

use datamask_pipeline::{ProgressChannel, ProgressSink, ProgressState};

const REDRAW_INTERVAL: Duration = Duration::from_millis(100);

/// Renders the three progress channels on one redrawn terminal line.
pub struct ConsoleProgress {
    state: Mutex<ConsoleState>,
}

#[derive(Default)]
struct ConsoleState {
    channels: [ProgressState; 3],
    last_draw: Option<Instant>,
}

impl ConsoleProgress {
    pub fn new() -> Self {
        Self {
            state: Mutex::new(ConsoleState::default()),
        }
    }

    /// Draw the final state and move to a fresh line.
    pub fn finish(&self) {
        if let Ok(state) = self.state.lock() {
            let mut stdout = io::stdout();
            let _ = draw(&mut stdout, &render(&state.channels));
            let _ = writeln!(stdout);
        }
    }
}

impl Default for ConsoleProgress {
    fn default() -> Self {
        Self::new()
    }
}

impl ProgressSink for ConsoleProgress {
    fn update(&self, channel: ProgressChannel, current: u64, max: Option<u64>, label: Option<&str>) {
        let Ok(mut state) = self.state.lock() else {
            return;
        };

        let idx = ProgressChannel::ALL
            .iter()
            .position(|candidate| *candidate == channel)
            .unwrap_or_default();
        let entry = &mut state.channels[idx];
        entry.current = current;
        if max.is_some() {
            entry.max = max;
        }
        if let Some(label) = label {
            entry.label = Some(label.to_string());
        }
        let complete = entry.max.is_some_and(|max| current >= max);

        let due = state
            .last_draw
            .is_none_or(|last| last.elapsed() >= REDRAW_INTERVAL);
        if due || complete {
            state.last_draw = Some(Instant::now());
            let _ = draw(&mut io::stdout(), &render(&state.channels));
        }
    }
}

fn render(channels: &[ProgressState; 3]) -> String {
    ProgressChannel::ALL
        .iter()
        .zip(channels)
        .map(|(channel, state)| {
            let counter = match state.max {
                Some(max) => format!("{}/{}", state.current, max),
                None => state.current.to_string(),
            };
            match (channel, state.label.as_deref()) {
                (ProgressChannel::Overall, Some(label)) => {
                    format!("{} {counter} [{label}]", channel.as_str())
                }
                _ => format!("{} {counter}", channel.as_str()),
            }
        })
        .collect::<Vec<_>>()
        .join(" | ")
}

fn draw(out: &mut impl Write, line: &str) -> io::Result<()> {
    queue!(
        out,
        MoveToColumn(0),
        Clear(ClearType::CurrentLine),
        Print(line)
    )?;
    out.flush()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn renders_all_channels() {
        let channels = [
            ProgressState {
                current: 1,
                max: Some(3),
                label: Some("customers".to_string()),
            },
            ProgressState {
                current: 40,
                max: Some(100),
                label: Some("Masking Progress".to_string()),
            },
            ProgressState::default(),
        ];
        assert_eq!(
            render(&channels),
            "overall 1/3 [customers] | masking 40/100 | updating 0"
        );
    }
}
