//! Explicit interpolation state sampled by the render loop.

use std::f32::consts::TAU;

use topograph_layout::Vec3;

/// Easing curves.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Easing {
    #[default]
    Linear,
    QuadraticIn,
    QuadraticOut,
    QuadraticInOut,
}

impl Easing {
    /// Map linear progress `t` in `[0, 1]` onto the curve.
    pub fn apply(self, t: f32) -> f32 {
        let t = t.clamp(0.0, 1.0);
        match self {
            Easing::Linear => t,
            Easing::QuadraticIn => t * t,
            Easing::QuadraticOut => t * (2.0 - t),
            Easing::QuadraticInOut => {
                if t < 0.5 {
                    2.0 * t * t
                } else {
                    -1.0 + (4.0 - 2.0 * t) * t
                }
            }
        }
    }
}

/// Values a [`Tween`] can interpolate.
pub trait Lerp: Copy {
    fn lerp(self, other: Self, t: f32) -> Self;
}

impl Lerp for f32 {
    fn lerp(self, other: f32, t: f32) -> f32 {
        self + (other - self) * t
    }
}

impl Lerp for Vec3 {
    fn lerp(self, other: Vec3, t: f32) -> Vec3 {
        Vec3::lerp(self, other, t)
    }
}

/// `{start, end, start_time, duration, easing}` sampled at wall-clock times
/// in milliseconds.
#[derive(Debug, Clone, PartialEq)]
pub struct Tween<T> {
    pub start: T,
    pub end: T,
    pub start_ms: f64,
    pub duration_ms: f64,
    pub easing: Easing,
    /// Restart from `start` after each period instead of holding `end`.
    pub repeat: bool,
}

impl<T: Lerp> Tween<T> {
    pub fn new(start: T, end: T, start_ms: f64, duration_ms: f64, easing: Easing) -> Self {
        Self {
            start,
            end,
            start_ms,
            duration_ms,
            easing,
            repeat: false,
        }
    }

    pub fn repeating(mut self) -> Self {
        self.repeat = true;
        self
    }

    /// Linear progress in `[0, 1]`.
    pub fn progress(&self, now_ms: f64) -> f32 {
        if self.duration_ms <= 0.0 {
            return 1.0;
        }
        let elapsed = (now_ms - self.start_ms).max(0.0);
        let t = if self.repeat {
            (elapsed % self.duration_ms) / self.duration_ms
        } else {
            (elapsed / self.duration_ms).min(1.0)
        };
        t as f32
    }

    pub fn sample(&self, now_ms: f64) -> T {
        let t = self.easing.apply(self.progress(now_ms));
        self.start.lerp(self.end, t)
    }

    /// A repeating tween never finishes.
    pub fn is_finished(&self, now_ms: f64) -> bool {
        !self.repeat && now_ms - self.start_ms >= self.duration_ms
    }
}

/// Full turn about the vertical axis over `period_ms`, repeating.
pub fn spin_tween(start_ms: f64, period_ms: f64) -> Tween<f32> {
    Tween::new(0.0, TAU, start_ms, period_ms, Easing::Linear).repeating()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_quadratic_in_samples() {
        let tween = Tween::new(0.0_f32, 100.0, 1000.0, 1000.0, Easing::QuadraticIn);
        assert_eq!(tween.sample(500.0), 0.0);
        assert_eq!(tween.sample(1500.0), 25.0);
        assert_eq!(tween.sample(2000.0), 100.0);
        assert_eq!(tween.sample(9000.0), 100.0);
        assert!(!tween.is_finished(1999.0));
        assert!(tween.is_finished(2000.0));
    }

    #[test]
    fn test_vec3_tween() {
        let tween = Tween::new(Vec3::ZERO, Vec3::new(10.0, 20.0, 30.0), 0.0, 100.0, Easing::Linear);
        assert_eq!(tween.sample(50.0), Vec3::new(5.0, 10.0, 15.0));
    }

    #[test]
    fn test_repeating_wraps() {
        let tween = spin_tween(0.0, 5000.0);
        assert!((tween.sample(1250.0) - TAU / 4.0).abs() < 1e-5);
        assert!((tween.sample(6250.0) - TAU / 4.0).abs() < 1e-5);
        assert!(!tween.is_finished(1e9));
    }

    #[test]
    fn test_zero_duration_jumps_to_end() {
        let tween = Tween::new(1.0_f32, 2.0, 0.0, 0.0, Easing::QuadraticOut);
        assert_eq!(tween.sample(0.0), 2.0);
    }
}
