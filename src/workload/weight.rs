use crate::config::WeightConfig;
use crate::runner::WeightFn;

/// Weight that oscillates along a cosine wave over wall-clock seconds:
/// `max(0, trunc(cos(t * 2π / frequency + phase) * magnitude) + constant)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WaveWeight {
    magnitude: i64,
    frequency: i64,
    constant: i64,
    phase: i64,
}

impl From<WeightConfig> for WaveWeight {
    fn from(config: WeightConfig) -> Self {
        Self {
            magnitude: config.magnitude,
            frequency: config.frequency,
            constant: config.constant,
            phase: config.phase,
        }
    }
}

impl WaveWeight {
    /// Weight at `unix_secs`.
    #[must_use]
    pub fn at(&self, unix_secs: i64) -> u64 {
        let swing = if self.frequency == 0 {
            0
        } else {
            self.swing(unix_secs)
        };
        u64::try_from(swing.saturating_add(self.constant)).unwrap_or(0)
    }

    #[expect(
        clippy::float_arithmetic,
        reason = "the weight follows a cosine of wall-clock time"
    )]
    fn swing(&self, unix_secs: i64) -> i64 {
        let angular = std::f64::consts::TAU / self.frequency as f64;
        let wave = (unix_secs as f64 * angular + self.phase as f64).cos();
        (wave * self.magnitude as f64) as i64
    }
}

impl WeightFn for WaveWeight {
    fn weight(&self) -> u64 {
        self.at(chrono::Utc::now().timestamp())
    }
}
