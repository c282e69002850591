//! Data-driven game balance
//!
//! One canonical reward table. Every field has a default so a partial JSON
//! override only needs the values it changes.

use serde::{Deserialize, Serialize};

use crate::error::GameError;
use crate::sim::SkillLevel;

/// XP granted per achievement tier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AchievementXp {
    pub basic: u32,
    pub intermediate: u32,
    pub advanced: u32,
    pub master: u32,
}

impl Default for AchievementXp {
    fn default() -> Self {
        Self {
            basic: 5,
            intermediate: 10,
            advanced: 20,
            master: 50,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Tuning {
    /// Bubble XP by skill level, novice first
    pub bubble_xp: [u32; 5],
    /// Philosophy reward is `base + base * agreement_level`
    pub philosophy_base_xp: u32,
    /// Flat reward for a free-text answer
    pub custom_answer_xp: u32,
    pub achievement_xp: AchievementXp,
    /// Paid on every non-final click of a tough bubble
    pub tough_click_xp: u32,
    pub secret_bubble_xp: u32,
    /// Required clicks for tough bubbles, drawn once per bubble
    pub tough_clicks_min: u32,
    pub tough_clicks_max: u32,
    /// Chance a regular content bubble rolls tough
    pub tough_chance: f32,
    /// Chance a year gets one hidden bubble
    pub hidden_bubble_chance: f32,
    pub philosophy_bubbles_per_year: u32,
    pub initial_lives: u32,
    pub lives_per_negative_answer: u32,
    /// Visited-count milestones for the explorer achievements
    pub milestones: [u32; 3],
    /// Total XP needed to reach level `i + 1`; first entry must be 0
    pub level_thresholds: Vec<u32>,
}

impl Default for Tuning {
    fn default() -> Self {
        Self {
            bubble_xp: [3, 5, 8, 12, 15],
            philosophy_base_xp: 5,
            custom_answer_xp: 10,
            achievement_xp: AchievementXp::default(),
            tough_click_xp: 2,
            secret_bubble_xp: 10,
            tough_clicks_min: 5,
            tough_clicks_max: 12,
            tough_chance: 0.15,
            hidden_bubble_chance: 0.5,
            philosophy_bubbles_per_year: 1,
            initial_lives: 3,
            lives_per_negative_answer: 1,
            milestones: [10, 30, 50],
            level_thresholds: vec![0, 30, 75, 140, 220, 320, 440, 580, 740, 920],
        }
    }
}

impl Tuning {
    pub fn from_json(json: &str) -> Result<Self, GameError> {
        let tuning: Tuning =
            serde_json::from_str(json).map_err(|e| GameError::InvalidTuning(e.to_string()))?;
        tuning.validate()?;
        Ok(tuning)
    }

    pub fn validate(&self) -> Result<(), GameError> {
        if self.tough_clicks_min == 0 || self.tough_clicks_min > self.tough_clicks_max {
            return Err(GameError::InvalidTuning(format!(
                "tough click range {}..={} is empty",
                self.tough_clicks_min, self.tough_clicks_max
            )));
        }
        if self.level_thresholds.first() != Some(&0) {
            return Err(GameError::InvalidTuning(
                "level thresholds must start at 0".into(),
            ));
        }
        if self.level_thresholds.windows(2).any(|w| w[0] >= w[1]) {
            return Err(GameError::InvalidTuning(
                "level thresholds must be strictly ascending".into(),
            ));
        }
        if self.milestones.windows(2).any(|w| w[0] >= w[1]) {
            return Err(GameError::InvalidTuning(
                "milestones must be strictly ascending".into(),
            ));
        }
        if self.initial_lives == 0 {
            return Err(GameError::InvalidTuning("initial lives must be positive".into()));
        }
        Ok(())
    }

    pub fn bubble_xp(&self, level: SkillLevel) -> u32 {
        self.bubble_xp[level.index()]
    }

    pub fn max_level(&self) -> u32 {
        self.level_thresholds.len() as u32
    }

    /// XP needed to reach `level` (1-based), None past the cap
    pub fn threshold_for(&self, level: u32) -> Option<u32> {
        let idx = level.checked_sub(1)? as usize;
        self.level_thresholds.get(idx).copied()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_valid_and_monotonic() {
        let tuning = Tuning::default();
        assert!(tuning.validate().is_ok());
        for pair in SkillLevel::ALL.windows(2) {
            assert!(tuning.bubble_xp(pair[0]) < tuning.bubble_xp(pair[1]));
        }
        assert_eq!(tuning.bubble_xp(SkillLevel::Novice), 3);
        assert_eq!(tuning.threshold_for(1), Some(0));
        assert_eq!(tuning.threshold_for(0), None);
        assert_eq!(tuning.threshold_for(tuning.max_level() + 1), None);
    }

    #[test]
    fn test_partial_override() {
        let tuning = Tuning::from_json(r#"{"initial_lives": 5, "tough_clicks_max": 6}"#).unwrap();
        assert_eq!(tuning.initial_lives, 5);
        assert_eq!(tuning.tough_clicks_max, 6);
        assert_eq!(tuning.bubble_xp, Tuning::default().bubble_xp);
    }

    #[test]
    fn test_rejects_bad_tables() {
        assert!(Tuning::from_json(r#"{"tough_clicks_min": 9, "tough_clicks_max": 3}"#).is_err());
        assert!(Tuning::from_json(r#"{"level_thresholds": [0, 50, 50]}"#).is_err());
        assert!(Tuning::from_json(r#"{"level_thresholds": [10, 50]}"#).is_err());
        assert!(matches!(
            Tuning::from_json("not json"),
            Err(GameError::InvalidTuning(_))
        ));
    }
}
