//! Progression rules: XP rewards, level thresholds, lives
//!
//! Reward calculations are pure functions of the tuning table. The session
//! ledger is the only mutable state and only changes through `add_xp`,
//! `lose_life` and the visited-bubble bookkeeping.

use serde::{Deserialize, Serialize};

use crate::content::PhilosophyQuestion;
use crate::error::GameError;
use crate::sim::BubbleId;
use crate::tuning::Tuning;

const LEVEL_TITLES: [&str; 10] = [
    "Curious Visitor",
    "Bubble Poker",
    "Skill Scout",
    "Pattern Spotter",
    "Code Wanderer",
    "Stack Diver",
    "System Thinker",
    "Craft Keeper",
    "Architect",
    "Bubble Sage",
];

/// Extra content unlocked by reaching a level
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BonusContent {
    pub level: u32,
    pub title: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LevelData {
    pub level: u32,
    pub title: String,
    pub xp_required: u32,
    pub bonus: Option<BonusContent>,
}

/// Describe a level from the tuning table
pub fn level_data(level: u32, tuning: &Tuning) -> LevelData {
    let idx = (level.max(1) - 1) as usize;
    let title = LEVEL_TITLES
        .get(idx)
        .map(|t| t.to_string())
        .unwrap_or_else(|| format!("Level {}", level));
    let bonus = ((level >= 3 && level % 2 == 1) || level == tuning.max_level()).then(|| BonusContent {
        level,
        title: format!("{} bonus", title),
    });
    LevelData {
        level,
        title,
        xp_required: tuning.threshold_for(level).unwrap_or(0),
        bonus,
    }
}

/// Outcome of one XP grant. Crossing several thresholds at once is still a
/// single result carrying the final level.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LevelUpResult {
    pub leveled_up: bool,
    pub new_level: u32,
    pub level_data: Option<LevelData>,
    /// Every level reached by this grant, ascending
    pub levels_crossed: Vec<u32>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LifeLoss {
    pub remaining: u32,
    pub game_over: bool,
}

/// The player's answer to a philosophy question
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum PhilosophyAnswer {
    /// Index into the question's options
    Option(usize),
    /// Free text instead of an option
    Custom(String),
}

/// XP and lives lost for an answer
pub fn philosophy_outcome(
    answer: &PhilosophyAnswer,
    question: &PhilosophyQuestion,
    tuning: &Tuning,
) -> Result<(u32, u32), GameError> {
    match answer {
        PhilosophyAnswer::Custom(_) => Ok((tuning.custom_answer_xp, 0)),
        PhilosophyAnswer::Option(index) => {
            let option = question.options.get(*index).ok_or(GameError::UnknownOption {
                question_id: question.id,
                index: *index,
            })?;
            let base = tuning.philosophy_base_xp as f32;
            let xp = (base + base * option.agreement_level).round().max(0.0) as u32;
            let lives = if option.lives_lost > 0 {
                option.lives_lost.max(tuning.lives_per_negative_answer)
            } else {
                0
            };
            Ok((xp, lives))
        }
    }
}

/// XP, level, lives and visited-bubble ledger for one session
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserSession {
    pub xp: u32,
    pub level: u32,
    pub lives: u32,
    pub max_lives: u32,
    pub visited_bubbles: Vec<BubbleId>,
    pub current_year: Option<u32>,
    /// Terminal: no XP or level changes after this
    pub game_completed: bool,
    pub unlocked_bonuses: Vec<BonusContent>,
}

impl UserSession {
    pub fn new(tuning: &Tuning, start_year: Option<u32>) -> Self {
        Self {
            xp: 0,
            level: 1,
            lives: tuning.initial_lives,
            max_lives: tuning.initial_lives,
            visited_bubbles: Vec::new(),
            current_year: start_year,
            game_completed: false,
            unlocked_bonuses: Vec::new(),
        }
    }

    /// Grant XP, crossing as many level thresholds as it covers
    pub fn add_xp(&mut self, amount: u32, tuning: &Tuning) -> Result<LevelUpResult, GameError> {
        if self.game_completed {
            return Err(GameError::SessionCompleted);
        }
        self.xp = self.xp.saturating_add(amount);

        let mut crossed = Vec::new();
        while let Some(next) = tuning.threshold_for(self.level + 1) {
            if self.xp < next {
                break;
            }
            self.level += 1;
            crossed.push(self.level);
            let data = level_data(self.level, tuning);
            if let Some(bonus) = data.bonus {
                self.unlocked_bonuses.push(bonus);
            }
        }

        if crossed.is_empty() {
            return Ok(LevelUpResult {
                leveled_up: false,
                new_level: self.level,
                level_data: None,
                levels_crossed: crossed,
            });
        }
        log::info!("Level up: {} (crossed {:?})", self.level, crossed);
        Ok(LevelUpResult {
            leveled_up: true,
            new_level: self.level,
            level_data: Some(level_data(self.level, tuning)),
            levels_crossed: crossed,
        })
    }

    /// Take lives; reaching zero ends the session
    pub fn lose_life(&mut self, amount: u32) -> Result<LifeLoss, GameError> {
        if self.game_completed {
            return Err(GameError::SessionCompleted);
        }
        self.lives = self.lives.saturating_sub(amount);
        if self.lives == 0 {
            self.game_completed = true;
            log::info!("Out of lives - game over at level {} with {} XP", self.level, self.xp);
        }
        Ok(LifeLoss {
            remaining: self.lives,
            game_over: self.game_completed,
        })
    }

    pub fn set_level(&mut self, level: u32) {
        self.level = level.max(1);
    }

    pub fn set_lives(&mut self, lives: u32) {
        self.lives = lives;
    }

    /// Record a visit; false if it was already recorded
    pub fn add_visited_bubble(&mut self, id: BubbleId) -> bool {
        if self.visited_bubbles.contains(&id) {
            return false;
        }
        self.visited_bubbles.push(id);
        true
    }

    pub fn has_visited(&self, id: BubbleId) -> bool {
        self.visited_bubbles.contains(&id)
    }

    /// Visits to real content bubbles (synthetic ids excluded)
    pub fn visited_count(&self) -> usize {
        self.visited_bubbles.iter().filter(|&&id| id >= 0).count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::content::QuestionOption;
    use proptest::prelude::*;

    fn question() -> PhilosophyQuestion {
        PhilosophyQuestion {
            id: 1,
            question: "Ship it?".into(),
            options: vec![
                QuestionOption {
                    text: "Always".into(),
                    agreement_level: 1.0,
                    lives_lost: 0,
                },
                QuestionOption {
                    text: "Never".into(),
                    agreement_level: -0.5,
                    lives_lost: 1,
                },
            ],
        }
    }

    #[test]
    fn test_multi_level_single_result() {
        let tuning = Tuning::default();
        let mut session = UserSession::new(&tuning, None);
        // Exactly enough for level 3
        let result = session.add_xp(tuning.level_thresholds[2], &tuning).unwrap();
        assert!(result.leveled_up);
        assert_eq!(result.new_level, 3);
        assert_eq!(result.levels_crossed, vec![2, 3]);
        assert_eq!(result.level_data.unwrap().level, 3);
        assert_eq!(session.unlocked_bonuses.len(), 1);
    }

    #[test]
    fn test_no_level_up() {
        let tuning = Tuning::default();
        let mut session = UserSession::new(&tuning, None);
        let result = session.add_xp(1, &tuning).unwrap();
        assert!(!result.leveled_up);
        assert_eq!(result.new_level, 1);
        assert!(result.level_data.is_none());
    }

    #[test]
    fn test_level_capped() {
        let tuning = Tuning::default();
        let mut session = UserSession::new(&tuning, None);
        let result = session.add_xp(1_000_000, &tuning).unwrap();
        assert_eq!(result.new_level, tuning.max_level());
        assert!(!session.add_xp(10, &tuning).unwrap().leveled_up);
    }

    #[test]
    fn test_philosophy_rewards() {
        let tuning = Tuning::default();
        let q = question();
        assert_eq!(
            philosophy_outcome(&PhilosophyAnswer::Option(0), &q, &tuning).unwrap(),
            (10, 0)
        );
        let (xp, lives) = philosophy_outcome(&PhilosophyAnswer::Option(1), &q, &tuning).unwrap();
        assert_eq!(xp, 3);
        assert_eq!(lives, 1);
        assert_eq!(
            philosophy_outcome(&PhilosophyAnswer::Custom("hmm".into()), &q, &tuning).unwrap(),
            (tuning.custom_answer_xp, 0)
        );
        assert!(philosophy_outcome(&PhilosophyAnswer::Option(7), &q, &tuning).is_err());
    }

    #[test]
    fn test_three_strikes_ends_session() {
        let tuning = Tuning::default();
        let mut session = UserSession::new(&tuning, None);
        assert!(!session.lose_life(1).unwrap().game_over);
        assert!(!session.lose_life(1).unwrap().game_over);
        let last = session.lose_life(1).unwrap();
        assert!(last.game_over);
        assert_eq!(last.remaining, 0);
        assert!(session.game_completed);
        assert_eq!(session.add_xp(50, &tuning), Err(GameError::SessionCompleted));
        assert_eq!(session.xp, 0);
    }

    #[test]
    fn test_visited_ledger() {
        let tuning = Tuning::default();
        let mut session = UserSession::new(&tuning, Some(2020));
        assert!(session.add_visited_bubble(4));
        assert!(!session.add_visited_bubble(4));
        assert!(session.add_visited_bubble(-1001));
        assert_eq!(session.visited_count(), 1);
        assert!(session.has_visited(-1001));
    }

    proptest! {
        #[test]
        fn prop_level_matches_thresholds(grants in prop::collection::vec(0u32..200, 1..30)) {
            let tuning = Tuning::default();
            let mut session = UserSession::new(&tuning, None);
            for amount in grants {
                session.add_xp(amount, &tuning).unwrap();
            }
            let expected = tuning
                .level_thresholds
                .iter()
                .filter(|&&t| session.xp >= t)
                .count() as u32;
            prop_assert_eq!(session.level, expected);
        }
    }
}
