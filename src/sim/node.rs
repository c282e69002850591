//! Bubble nodes - the participants of the force simulation

use glam::Vec2;
use serde::{Deserialize, Serialize};

/// Stable bubble identifier. Content ids are non-negative; synthetic
/// philosophy and hidden bubbles live in reserved negative ranges.
pub type BubbleId = i32;

/// Skill level of a bubble (drives size, color and XP reward)
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum SkillLevel {
    #[default]
    Novice,
    Intermediate,
    Confident,
    Expert,
    Master,
}

impl SkillLevel {
    pub const ALL: [SkillLevel; 5] = [
        SkillLevel::Novice,
        SkillLevel::Intermediate,
        SkillLevel::Confident,
        SkillLevel::Expert,
        SkillLevel::Master,
    ];

    /// Ordinal position (0 = novice)
    pub fn index(self) -> usize {
        self as usize
    }

    /// Configured base radius in pixels at the reference canvas size
    pub fn base_radius(self) -> f32 {
        match self {
            SkillLevel::Novice => 28.0,
            SkillLevel::Intermediate => 34.0,
            SkillLevel::Confident => 40.0,
            SkillLevel::Expert => 46.0,
            SkillLevel::Master => 52.0,
        }
    }
}

/// Which click branch a bubble takes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BubbleKind {
    Regular,
    Tough,
    Hidden,
    Philosophy,
}

/// Short radius animations layered on top of breathing
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PulseKind {
    /// Squash, grow past full size, settle (bubble opened)
    Squash,
    /// Quick swell and return (tough bubble hit)
    Swell,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RadiusPulse {
    pub kind: PulseKind,
    pub start_ms: f64,
    pub duration_ms: f64,
}

impl RadiusPulse {
    pub fn squash(now_ms: f64) -> Self {
        Self {
            kind: PulseKind::Squash,
            start_ms: now_ms,
            duration_ms: 450.0,
        }
    }

    pub fn swell(now_ms: f64) -> Self {
        Self {
            kind: PulseKind::Swell,
            start_ms: now_ms,
            duration_ms: 250.0,
        }
    }

    /// Radius multiplier at `now_ms`, or None once the pulse has finished
    pub fn scale_at(&self, now_ms: f64) -> Option<f32> {
        let t = ((now_ms - self.start_ms) / self.duration_ms) as f32;
        if !(0.0..1.0).contains(&t) {
            return if t < 0.0 { Some(1.0) } else { None };
        }
        let scale = match self.kind {
            PulseKind::Squash => {
                // 1.0 -> 0.85 -> 1.15 -> 1.0
                if t < 0.3 {
                    1.0 - 0.15 * (t / 0.3)
                } else if t < 0.65 {
                    0.85 + 0.30 * ((t - 0.3) / 0.35)
                } else {
                    1.15 - 0.15 * ((t - 0.65) / 0.35)
                }
            }
            PulseKind::Swell => 1.0 + 0.15 * (t * std::f32::consts::PI).sin(),
        };
        Some(scale)
    }
}

/// A bubble in the simulation
///
/// Four radii are tracked: `radius` is the structural size (eased toward
/// `target_radius` each frame), `base_radius` is the configured size for the
/// skill level, and `current_radius` is what gets drawn and hit-tested
/// (structural size with breathing and pulses applied).
#[derive(Debug, Clone)]
pub struct BubbleNode {
    pub id: BubbleId,
    pub name: String,
    pub year: Option<u32>,
    pub pos: Vec2,
    pub vel: Vec2,
    pub radius: f32,
    pub base_radius: f32,
    pub target_radius: f32,
    pub current_radius: f32,
    /// Random per-node phase for breathing and drift
    pub oscillation_phase: f32,
    pub is_popped: bool,
    pub is_visited: bool,
    pub is_hovered: bool,
    pub is_tough: bool,
    pub is_hidden: bool,
    pub is_question: bool,
    pub skill_level: SkillLevel,
    pub question_id: Option<u32>,
    pub pulse: Option<RadiusPulse>,
}

impl BubbleNode {
    pub fn new(id: BubbleId, skill_level: SkillLevel, base_radius: f32) -> Self {
        Self {
            id,
            name: String::new(),
            year: None,
            pos: Vec2::ZERO,
            vel: Vec2::ZERO,
            radius: base_radius,
            base_radius,
            target_radius: base_radius,
            current_radius: base_radius,
            oscillation_phase: 0.0,
            is_popped: false,
            is_visited: false,
            is_hovered: false,
            is_tough: false,
            is_hidden: false,
            is_question: false,
            skill_level,
            question_id: None,
            pulse: None,
        }
    }

    pub fn kind(&self) -> BubbleKind {
        if self.is_tough {
            BubbleKind::Tough
        } else if self.is_hidden {
            BubbleKind::Hidden
        } else if self.is_question {
            BubbleKind::Philosophy
        } else {
            BubbleKind::Regular
        }
    }

    /// Point-in-circle against the rendered radius
    #[inline]
    pub fn contains(&self, point: Vec2) -> bool {
        self.pos.distance(point) <= self.current_radius
    }

    /// All geometry is finite (drawable)
    pub fn has_finite_geometry(&self) -> bool {
        self.pos.is_finite() && self.current_radius.is_finite()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_precedence() {
        let mut node = BubbleNode::new(1, SkillLevel::Novice, 30.0);
        assert_eq!(node.kind(), BubbleKind::Regular);
        node.is_question = true;
        assert_eq!(node.kind(), BubbleKind::Philosophy);
        node.is_hidden = true;
        assert_eq!(node.kind(), BubbleKind::Hidden);
        node.is_tough = true;
        assert_eq!(node.kind(), BubbleKind::Tough);
    }

    #[test]
    fn test_squash_pulse_shape() {
        let pulse = RadiusPulse::squash(1000.0);
        assert_eq!(pulse.scale_at(1000.0), Some(1.0));
        let squashed = pulse.scale_at(1000.0 + 450.0 * 0.3).unwrap();
        assert!((squashed - 0.85).abs() < 0.01);
        let grown = pulse.scale_at(1000.0 + 450.0 * 0.65).unwrap();
        assert!((grown - 1.15).abs() < 0.01);
        assert_eq!(pulse.scale_at(1000.0 + 450.0), None);
    }

    #[test]
    fn test_swell_returns_to_rest() {
        let pulse = RadiusPulse::swell(0.0);
        let mid = pulse.scale_at(125.0).unwrap();
        assert!(mid > 1.1);
        assert!(pulse.scale_at(260.0).is_none());
    }

    #[test]
    fn test_skill_radius_monotonic() {
        for pair in SkillLevel::ALL.windows(2) {
            assert!(pair[0].base_radius() < pair[1].base_radius());
        }
    }
}
