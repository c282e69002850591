//! Bubble simulation module
//!
//! Physics, idle animation and transient effects. This module must stay free
//! of game rules and platform dependencies:
//! - Time comes in as a millisecond timestamp
//! - Seeded RNG only
//! - Drawing goes through the `render::Surface` trait

pub mod effects;
pub mod force;
pub mod lifecycle;
pub mod node;
pub mod scene;
pub mod timers;

pub use effects::{EffectsLayer, TextKind};
pub use force::ForceSimulation;
pub use lifecycle::{BubbleLifecycle, find_bubble_under_cursor, remove_bubble};
pub use node::{BubbleId, BubbleKind, BubbleNode, PulseKind, RadiusPulse, SkillLevel};
pub use scene::Scene;
pub use timers::{TimerAction, TimerQueue};
