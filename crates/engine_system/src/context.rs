//! Per-tick execution context provided to systems.

/// Context provided to [`System::update`](crate::System::update) on each
/// tick.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SystemContext {
    /// The current tick ID.
    pub tick_id: u64,
    /// Delta time since the last tick, in seconds.
    pub dt: f64,
    /// Simulated time elapsed before this tick, in seconds.
    pub elapsed: f64,
}

impl SystemContext {
    /// Create a new context for a tick.
    #[must_use]
    pub fn new(tick_id: u64, dt: f64) -> Self {
        Self {
            tick_id,
            dt,
            elapsed: tick_id as f64 * dt,
        }
    }

    /// Delta time as `f32`, for component math.
    #[must_use]
    pub fn dt_f32(&self) -> f32 {
        self.dt as f32
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_context_creation() {
        let ctx = SystemContext::new(3, 0.5);
        assert_eq!(ctx.tick_id, 3);
        assert!((ctx.dt - 0.5).abs() < f64::EPSILON);
        assert!((ctx.elapsed - 1.5).abs() < f64::EPSILON);
        assert!((ctx.dt_f32() - 0.5).abs() < f32::EPSILON);
    }
}
