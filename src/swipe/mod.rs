//! Swipe-to-decide cards.
//!
//! A [`SwipeCard`] turns a continuous drag into an accept/reject decision
//! with settle and exit animations. A [`CardDeck`] queues cards and routes
//! input to the head only. Both are driven by an explicit clock so hosts and
//! tests control timing.

pub mod card;
pub mod deck;

pub use card::{BadgeVisuals, CardVisuals, Phase, SwipeCard};
pub use deck::{CardDeck, DeckEvent, StackSlot};

use std::time::Duration;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Decision {
    Accept,
    Reject,
}

/// 2D offset in screen points.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Offset {
    pub x: f32,
    pub y: f32,
}

impl Offset {
    pub const ZERO: Offset = Offset { x: 0.0, y: 0.0 };

    pub const fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }

    fn lerp(self, to: Offset, t: f32) -> Offset {
        Offset::new(self.x + (to.x - self.x) * t, self.y + (to.y - self.y) * t)
    }
}

/// One reading from the platform gesture recognizer.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct DragSample {
    pub translation: Offset,
    /// Where the drag would come to rest given its current velocity.
    pub predicted_end: Offset,
}

impl DragSample {
    pub fn new(translation: Offset, predicted_end: Offset) -> Self {
        Self {
            translation,
            predicted_end,
        }
    }

    /// A sample with no momentum.
    pub fn at(x: f32, y: f32) -> Self {
        let translation = Offset::new(x, y);
        Self::new(translation, translation)
    }
}

/// Thresholds and animation constants.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SwipeConfig {
    /// Horizontal release distance that commits a decision.
    pub distance_threshold: f32,
    /// Horizontal predicted end distance that commits a decision.
    pub predicted_threshold: f32,
    pub exit_distance: f32,
    pub exit_lift: f32,
    pub exit_duration_ms: u64,
    pub spring_stiffness: f32,
    pub spring_damping: f32,
}

impl Default for SwipeConfig {
    fn default() -> Self {
        Self {
            distance_threshold: 100.0,
            predicted_threshold: 150.0,
            exit_distance: 500.0,
            exit_lift: 100.0,
            exit_duration_ms: 300,
            spring_stiffness: 200.0,
            spring_damping: 25.0,
        }
    }
}

impl SwipeConfig {
    pub fn exit_duration(&self) -> Duration {
        Duration::from_millis(self.exit_duration_ms)
    }
}

/// Decision implied by releasing with `sample`, if any. The direction
/// follows the drag offset, or the predicted end when the offset is zero.
pub fn decide(sample: &DragSample, config: &SwipeConfig) -> Option<Decision> {
    let x = sample.translation.x;
    let predicted = sample.predicted_end.x;
    if x.abs() <= config.distance_threshold && predicted.abs() <= config.predicted_threshold {
        return None;
    }
    let direction = if x != 0.0 { x } else { predicted };
    Some(if direction > 0.0 {
        Decision::Accept
    } else {
        Decision::Reject
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn below_both_thresholds_is_undecided() {
        let config = SwipeConfig::default();
        for x in [-100.0, -40.0, 0.0, 60.0, 100.0] {
            for predicted in [-150.0, 0.0, 150.0] {
                let sample = DragSample::new(Offset::new(x, 0.0), Offset::new(predicted, 0.0));
                assert_eq!(decide(&sample, &config), None, "x={x} predicted={predicted}");
            }
        }
    }

    #[test]
    fn distance_or_flick_commits_by_offset_sign() {
        let config = SwipeConfig::default();
        assert_eq!(decide(&DragSample::at(101.0, 0.0), &config), Some(Decision::Accept));
        assert_eq!(decide(&DragSample::at(-101.0, 30.0), &config), Some(Decision::Reject));

        let flick = DragSample::new(Offset::new(20.0, 0.0), Offset::new(151.0, 0.0));
        assert_eq!(decide(&flick, &config), Some(Decision::Accept));
        let back_flick = DragSample::new(Offset::new(-5.0, 0.0), Offset::new(-400.0, 0.0));
        assert_eq!(decide(&back_flick, &config), Some(Decision::Reject));
    }
}
