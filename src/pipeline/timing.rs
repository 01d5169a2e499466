use std::time::{Duration, Instant};

#[derive(Debug, Clone)]
pub struct TimingEntry {
    pub key: String,
    pub duration: Duration,
}

/// Per-file stopwatch keyed by pass id, plus `parse` and `print`.
#[derive(Debug, Clone, Default)]
pub struct Timing {
    entries: Vec<TimingEntry>,
}

impl Timing {
    pub fn measure<T>(&mut self, key: &str, f: impl FnOnce() -> T) -> T {
        let start = Instant::now();
        let value = f();
        self.entries.push(TimingEntry {
            key: key.to_string(),
            duration: start.elapsed(),
        });
        value
    }

    pub fn entries(&self) -> &[TimingEntry] {
        &self.entries
    }

    pub fn total(&self) -> Duration {
        self.entries.iter().map(|entry| entry.duration).sum()
    }

    /// Sums durations per key, keeping first-seen order.
    pub fn merge(&mut self, other: &Timing) {
        for entry in &other.entries {
            match self.entries.iter_mut().find(|own| own.key == entry.key) {
                Some(own) => own.duration += entry.duration,
                None => self.entries.push(entry.clone()),
            }
        }
    }
}
