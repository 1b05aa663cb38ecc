//! Construction progress tracking.

/// Remaining time below which construction counts as finished.
const FINISH_EPSILON: f32 = 1e-4;

/// Total and remaining construction seconds of an object.
#[derive(Clone, Copy, Debug, PartialEq)]
pub(crate) struct ConstructionTimer {
    total: f32,
    remaining: f32,
}

impl ConstructionTimer {
    /// Timer of an object that is not under construction.
    pub(crate) const fn idle() -> Self {
        Self {
            total: 0.0,
            remaining: 0.0,
        }
    }

    pub(crate) fn new(total: f32) -> Self {
        let total = total.max(0.0);
        Self {
            total,
            remaining: total,
        }
    }

    pub(crate) fn total(&self) -> f32 {
        self.total
    }

    /// Fraction of construction completed, clamped to `0.0..=1.0`.
    pub(crate) fn percent(&self) -> f32 {
        if self.total <= 0.0 {
            return 1.0;
        }
        (1.0 - self.remaining / self.total).clamp(0.0, 1.0)
    }

    pub(crate) fn is_finished(&self) -> bool {
        self.remaining <= FINISH_EPSILON
    }

    /// Removes `seconds` from the remaining time and reports whether construction finished.
    pub(crate) fn advance(&mut self, seconds: f32) -> bool {
        self.remaining = (self.remaining - seconds.max(0.0)).clamp(0.0, self.total);
        if self.is_finished() {
            self.remaining = 0.0;
        }
        self.is_finished()
    }

    pub(crate) fn complete(&mut self) {
        self.remaining = 0.0;
    }
}
