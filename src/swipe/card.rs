use std::time::Instant;

use super::{Decision, DragSample, Offset, SwipeConfig, decide};

/// Longest integration step for the return spring, in seconds.
const SPRING_STEP: f32 = 1.0 / 240.0;
const REST_DISTANCE: f32 = 0.5;
const REST_SPEED: f32 = 1.0;

/// Externally visible state of a card.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Idle,
    Dragging,
    SettlingReturn,
    SettlingExit(Decision),
    Removed,
}

#[derive(Debug, Clone, Copy)]
enum State {
    Idle,
    Dragging,
    Returning {
        velocity: Offset,
        last_tick: Instant,
    },
    Exiting {
        decision: Decision,
        from: Offset,
        started: Instant,
    },
    Removed,
}

/// Derived rendering parameters for a card at its current offset.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CardVisuals {
    /// Offset to draw at; vertical travel is damped to 40 %.
    pub offset: Offset,
    /// Degrees, pivoting on the bottom edge.
    pub rotation_degrees: f32,
    pub opacity: f32,
    pub accept_badge: BadgeVisuals,
    pub reject_badge: BadgeVisuals,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BadgeVisuals {
    pub opacity: f32,
    pub scale: f32,
}

/// Gesture state machine for a single card.
///
/// `Idle -> Dragging` on touch, then on release either a spring back to the
/// origin or a timed exit that ends in `Removed`. The decision is reported
/// by [`SwipeCard::advance`] exactly once, when the exit finishes, unless
/// the card was disposed first.
#[derive(Debug, Clone)]
pub struct SwipeCard {
    config: SwipeConfig,
    offset: Offset,
    state: State,
    disposed: bool,
}

impl SwipeCard {
    pub fn new(config: SwipeConfig) -> Self {
        Self {
            config,
            offset: Offset::ZERO,
            state: State::Idle,
            disposed: false,
        }
    }

    pub fn phase(&self) -> Phase {
        match self.state {
            State::Idle => Phase::Idle,
            State::Dragging => Phase::Dragging,
            State::Returning { .. } => Phase::SettlingReturn,
            State::Exiting { decision, .. } => Phase::SettlingExit(decision),
            State::Removed => Phase::Removed,
        }
    }

    pub fn offset(&self) -> Offset {
        self.offset
    }

    /// Whether touch input can currently grab the card.
    pub fn accepts_input(&self) -> bool {
        matches!(
            self.state,
            State::Idle | State::Dragging | State::Returning { .. }
        )
    }

    /// Starts tracking the finger. A returning card can be caught mid-spring.
    pub fn begin_drag(&mut self) -> bool {
        match self.state {
            State::Idle | State::Returning { .. } => {
                self.state = State::Dragging;
                true
            }
            State::Dragging => true,
            State::Exiting { .. } | State::Removed => false,
        }
    }

    /// Follows the finger exactly; no animation while dragging.
    pub fn update_drag(&mut self, sample: DragSample) {
        if !self.begin_drag() {
            return;
        }
        self.offset = sample.translation;
    }

    /// Releases the card at `now` and returns the resulting phase.
    pub fn end_drag(&mut self, sample: DragSample, now: Instant) -> Phase {
        if !matches!(self.state, State::Dragging) {
            return self.phase();
        }
        self.offset = sample.translation;
        self.state = match decide(&sample, &self.config) {
            Some(decision) => {
                log::debug!("Card released at {:?}: {decision:?}", self.offset);
                State::Exiting {
                    decision,
                    from: self.offset,
                    started: now,
                }
            }
            None => State::Returning {
                velocity: Offset::ZERO,
                last_tick: now,
            },
        };
        self.phase()
    }

    /// Steps animations to `now`. Returns the decision on the tick the exit
    /// animation completes, and never again.
    pub fn advance(&mut self, now: Instant) -> Option<Decision> {
        match self.state {
            State::Returning {
                velocity,
                last_tick,
            } => {
                let elapsed = now.saturating_duration_since(last_tick).as_secs_f32();
                let velocity = self.step_spring(velocity, elapsed);
                self.state = if is_at_rest(self.offset, velocity) {
                    self.offset = Offset::ZERO;
                    State::Idle
                } else {
                    State::Returning {
                        velocity,
                        last_tick: now,
                    }
                };
                None
            }
            State::Exiting {
                decision,
                from,
                started,
            } => {
                let duration = self.config.exit_duration();
                let elapsed = now.saturating_duration_since(started);
                let target = self.exit_target(decision);
                if elapsed < duration {
                    let t = elapsed.as_secs_f32() / duration.as_secs_f32();
                    self.offset = from.lerp(target, ease_in_out(t));
                    return None;
                }
                self.offset = target;
                self.state = State::Removed;
                (!self.disposed).then_some(decision)
            }
            State::Idle | State::Dragging | State::Removed => None,
        }
    }

    /// Detaches the card. Any pending exit completes silently.
    pub fn dispose(&mut self) {
        self.disposed = true;
        self.state = State::Removed;
    }

    pub fn is_disposed(&self) -> bool {
        self.disposed
    }

    pub fn visuals(&self) -> CardVisuals {
        let x = self.offset.x;
        CardVisuals {
            offset: Offset::new(x, self.offset.y * 0.4),
            rotation_degrees: x / 30.0,
            opacity: (2.0 - (x / 200.0).abs()).clamp(0.0, 1.0),
            accept_badge: badge(x),
            reject_badge: badge(-x),
        }
    }

    fn exit_target(&self, decision: Decision) -> Offset {
        let x = match decision {
            Decision::Accept => self.config.exit_distance,
            Decision::Reject => -self.config.exit_distance,
        };
        Offset::new(x, self.config.exit_lift)
    }

    /// Semi-implicit Euler on a unit-mass damped spring toward the origin.
    fn step_spring(&mut self, mut velocity: Offset, elapsed: f32) -> Offset {
        let k = self.config.spring_stiffness;
        let c = self.config.spring_damping;
        let mut remaining = elapsed;
        while remaining > 0.0 {
            let dt = remaining.min(SPRING_STEP);
            velocity.x += (-k * self.offset.x - c * velocity.x) * dt;
            velocity.y += (-k * self.offset.y - c * velocity.y) * dt;
            self.offset.x += velocity.x * dt;
            self.offset.y += velocity.y * dt;
            remaining -= dt;
        }
        velocity
    }
}

fn badge(directed_x: f32) -> BadgeVisuals {
    BadgeVisuals {
        opacity: (directed_x - 50.0).max(0.0) / 100.0,
        scale: if directed_x > 100.0 { 1.1 } else { 0.8 },
    }
}

fn is_at_rest(offset: Offset, velocity: Offset) -> bool {
    offset.x.abs() < REST_DISTANCE
        && offset.y.abs() < REST_DISTANCE
        && velocity.x.abs() < REST_SPEED
        && velocity.y.abs() < REST_SPEED
}

fn ease_in_out(t: f32) -> f32 {
    let t = t.clamp(0.0, 1.0);
    if t < 0.5 {
        4.0 * t * t * t
    } else {
        1.0 - (-2.0 * t + 2.0).powi(3) / 2.0
    }
}
