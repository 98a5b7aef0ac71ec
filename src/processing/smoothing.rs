//! Critically damped angular smoothing for compass headings

use crate::algorithms::angles::delta_angle;

/// Spring-damper filter that follows a target angle without overshoot.
///
/// The target is unwrapped onto the shortest path from the current value, so
/// a jump from 359° to 1° moves the output by +2° and not -358°.
#[derive(Debug, Clone)]
pub struct AngleSmoother {
    /// Approximate time to reach the target (seconds)
    pub smoothing_time: f32,
    value: Option<f32>,
    velocity: f32,
}

impl AngleSmoother {
    pub fn new(smoothing_time: f32) -> Self {
        Self {
            smoothing_time,
            value: None,
            velocity: 0.0,
        }
    }

    /// Advance the filter by `dt` seconds towards `target` and return the new angle.
    ///
    /// The first call after construction or [`reset`](Self::reset) adopts the
    /// target directly.
    pub fn update(&mut self, target: f32, dt: f32) -> f32 {
        let current = match self.value {
            Some(current) => current,
            None => {
                self.value = Some(target);
                self.velocity = 0.0;
                return target;
            }
        };

        if dt <= 0.0 {
            return current;
        }

        let unwrapped_target = current + delta_angle(current, target);
        let smoothing_time = self.smoothing_time.max(0.0001);
        let omega = 2.0 / smoothing_time;
        let x = omega * dt;
        let decay = 1.0 / (1.0 + x + 0.48 * x * x + 0.235 * x * x * x);

        let change = current - unwrapped_target;
        let temp = (self.velocity + omega * change) * dt;
        self.velocity = (self.velocity - omega * temp) * decay;
        let mut output = unwrapped_target + (change + temp) * decay;

        // Clamp overshoot past the target
        if (unwrapped_target - current > 0.0) == (output > unwrapped_target) {
            output = unwrapped_target;
            self.velocity = (output - unwrapped_target) / dt;
        }

        self.value = Some(output);
        output
    }

    /// Current smoothed angle, unnormalized
    pub fn value(&self) -> Option<f32> {
        self.value
    }

    /// Angular velocity in degrees per second
    pub fn velocity(&self) -> f32 {
        self.velocity
    }

    pub fn reset(&mut self) {
        self.value = None;
        self.velocity = 0.0;
    }
}
