//! Bubble Quest - a physics-driven skill bubble game
//!
//! Core modules:
//! - `sim`: Force simulation, bubble lifecycle, transient effects, timers
//! - `game`: Progression rules, achievements, modal scheduling, pointer interaction
//! - `render`: 2D drawing surface abstraction (browser canvas on wasm)
//! - `platform`: Browser/native platform abstraction
//! - `tuning`: Data-driven game balance
//! - `content`: Bubble records and philosophy questions (read-only input)

pub mod content;
pub mod error;
pub mod game;
pub mod platform;
pub mod render;
pub mod settings;
pub mod sim;
pub mod tuning;

pub use error::GameError;
pub use game::{Game, GameEvent};
pub use settings::{QualityPreset, Settings};
pub use tuning::Tuning;

use glam::Vec2;

/// Simulation and feel constants
pub mod consts {
    /// Nominal frame duration in milliseconds (60 Hz)
    pub const FRAME_MS: f64 = 1000.0 / 60.0;

    /// Force simulation energy
    pub const ALPHA_START: f32 = 0.3;
    pub const ALPHA_DECAY: f32 = 0.002;
    /// Watchdog restarts the simulation when alpha drops below this
    pub const ALPHA_FLOOR: f32 = 0.05;
    pub const WATCHDOG_INTERVAL_MS: f64 = 2000.0;

    /// Forces - center/radial deliberately weak, collision strong
    pub const CENTER_STRENGTH: f32 = 0.01;
    pub const RADIAL_STRENGTH: f32 = 0.02;
    /// Radial target ring as a fraction of the smaller canvas dimension
    pub const RADIAL_RADIUS_FACTOR: f32 = 0.2;
    pub const CHARGE_STRENGTH: f32 = -8.0;
    pub const CHARGE_MAX_DISTANCE: f32 = 300.0;
    pub const COLLISION_STRENGTH: f32 = 0.7;
    pub const COLLISION_MARGIN: f32 = 4.0;

    /// Velocity clamps: hover push stays gentle, pops are dramatic
    pub const PUSH_MAX_SPEED: f32 = 15.0;
    pub const EXPLOSION_MAX_SPEED: f32 = 20.0;

    /// Per-frame velocity damping and rest threshold
    pub const VELOCITY_DAMPING: f32 = 0.92;
    pub const VELOCITY_EPSILON: f32 = 0.01;

    /// Idle breathing (fraction of radius, radians per ms)
    pub const BREATHING_AMPLITUDE: f32 = 0.05;
    pub const BREATHING_SPEED: f32 = 0.002;
    /// Slow positional drift
    pub const DRIFT_AMPLITUDE: f32 = 0.15;
    pub const DRIFT_SPEED: f32 = 0.0005;
    pub const DRIFT_JITTER: f32 = 0.02;
    /// Structural radius easing toward target per frame
    pub const RADIUS_EASE: f32 = 0.15;

    /// Hover
    pub const HOVER_SCALE: f32 = 1.2;
    pub const HOVER_PUSH_RADIUS_FACTOR: f32 = 3.0;
    pub const HOVER_PUSH_STRENGTH: f32 = 3.0;

    /// Explosions (radius px, strength)
    pub const EMPTY_CLICK_RADIUS: f32 = 220.0;
    pub const EMPTY_CLICK_STRENGTH: f32 = 10.0;
    pub const POP_RADIUS: f32 = 180.0;
    pub const POP_STRENGTH: f32 = 14.0;
    pub const HIDDEN_POP_RADIUS: f32 = 300.0;
    pub const HIDDEN_POP_STRENGTH: f32 = 20.0;
    /// Tough bubble bounce per unit of normalized click offset
    pub const TOUGH_BOUNCE_STRENGTH: f32 = 6.0;

    /// Pointer parallax
    pub const PARALLAX_MAX: f32 = 20.0;
    pub const PARALLAX_DAMPING: f32 = 0.5;
    pub const PARALLAX_EASE_MS: f64 = 1200.0;

    /// Deferred actions
    pub const BUBBLE_REMOVAL_DELAY_MS: f64 = 50.0;
    pub const YEAR_ADVANCE_DELAY_MS: f64 = 300.0;
    pub const QUEUE_PROCESS_DELAY_MS: f64 = 0.0;

    /// Effects
    pub const EXPLOSION_DURATION_MS: f64 = 600.0;
    pub const FLOATING_TEXT_DURATION_MS: f64 = 1200.0;
    pub const FLOATING_TEXT_RISE: f32 = 40.0;
    pub const DEBRIS_DURATION_MS: f64 = 1000.0;
    pub const DEBRIS_RESTITUTION: f32 = 0.7;
    pub const DEBRIS_SHRINK: f32 = 0.95;
    pub const DEBRIS_GRAVITY: f32 = 0.05;
    pub const SHAKE_DURATION_MS: f64 = 400.0;
    pub const SHAKE_INTENSITY: f32 = 8.0;

    /// Reserved negative id ranges for synthetic bubbles
    pub const PHILOSOPHY_ID_BASE: i32 = -1000;
    pub const HIDDEN_ID_BASE: i32 = -2000;
}

/// Cubic ease-out on t in [0, 1]
#[inline]
pub fn ease_out_cubic(t: f32) -> f32 {
    let t = t.clamp(0.0, 1.0);
    1.0 - (1.0 - t).powi(3)
}

/// Clamp a point so a circle of `radius` stays inside a `width` x `height` canvas
#[inline]
pub fn clamp_to_bounds(pos: Vec2, radius: f32, width: f32, height: f32) -> Vec2 {
    Vec2::new(
        clamp_axis(pos.x, radius, width),
        clamp_axis(pos.y, radius, height),
    )
}

/// Axis too short for the circle: pin to its middle
#[inline]
fn clamp_axis(v: f32, radius: f32, extent: f32) -> f32 {
    if extent >= radius * 2.0 {
        v.clamp(radius, extent - radius)
    } else {
        extent * 0.5
    }
}
