//! Per-context animation configuration.
//!
//! The core never interprets these values; they travel opaquely from the
//! context registration to the playback collaborator, which owns the actual
//! interpolation.

/// Easing curves understood by the playback layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Easing {
    /// Linear interpolation (no easing).
    Linear,
    /// Ease in using a cubic curve.
    EaseIn,
    /// Ease out using a cubic curve.
    EaseOut,
    /// Ease in and out using a cubic curve.
    EaseInOut,
    /// Fast out, slow in (material design standard).
    FastOutSlowIn,
}

/// Animation configuration combining duration and easing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TransitionConfig {
    /// Duration in milliseconds.
    pub duration_millis: u64,
    /// Easing curve to apply.
    pub easing: Easing,
    /// Delay before starting playback in milliseconds.
    pub delay_millis: u64,
}

impl TransitionConfig {
    /// Create a tween configuration with duration and easing.
    pub fn tween(duration_millis: u64, easing: Easing) -> Self {
        Self {
            duration_millis,
            easing,
            delay_millis: 0,
        }
    }

    /// Create a linear tween configuration.
    pub fn linear(duration_millis: u64) -> Self {
        Self::tween(duration_millis, Easing::Linear)
    }

    /// Add a delay before playback starts.
    pub fn with_delay(mut self, delay_millis: u64) -> Self {
        self.delay_millis = delay_millis;
        self
    }
}

impl Default for TransitionConfig {
    fn default() -> Self {
        Self::tween(300, Easing::FastOutSlowIn)
    }
}
