use std::time::{Duration, Instant};

const BAR_LENGTH: usize = 50;

/// Share of the working set that has gone through a batch.
#[derive(Debug, Clone)]
pub struct Progress {
    total: usize,
    consumed: usize,
    started: Instant,
}

impl Progress {
    pub fn new(total: usize) -> Self {
        Self {
            total,
            consumed: 0,
            started: Instant::now(),
        }
    }

    pub fn advance(&mut self, records: usize) {
        self.consumed = (self.consumed + records).min(self.total);
    }

    pub fn fraction(&self) -> f64 {
        if self.total == 0 {
            return 1.0;
        }
        self.consumed as f64 / self.total as f64
    }

    /// Renders e.g. `[=====-----] 50.0% ... running: 0.40 min ... interval: 2.4s`.
    pub fn render(&self, interval: Duration) -> String {
        let filled = ((BAR_LENGTH as f64) * self.fraction()) as usize;
        format!(
            "[{}{}] {:.1}% ... running: {:.2} min ... interval: {:.1}s",
            "=".repeat(filled),
            "-".repeat(BAR_LENGTH - filled),
            self.fraction() * 100.0,
            self.started.elapsed().as_secs_f64() / 60.0,
            interval.as_secs_f64()
        )
    }
}
