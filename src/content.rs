//! Bubble content and philosophy questions
//!
//! Content arrives already normalized (one locale, one mode) and is treated
//! as read-only for the whole session.

use std::collections::HashSet;

use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::error::GameError;
use crate::sim::{BubbleId, SkillLevel};

/// A normalized bubble record
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct BubbleRecord {
    pub id: BubbleId,
    pub name: String,
    pub year: Option<u32>,
    pub skill_level: SkillLevel,
    pub description: String,
    pub is_hidden: bool,
    pub is_question: bool,
    /// Forces the tough variant regardless of the random roll
    pub is_tough: bool,
    pub question_id: Option<u32>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuestionOption {
    pub text: String,
    /// Agreement score; scales the philosophy XP reward
    #[serde(default)]
    pub agreement_level: f32,
    /// Lives lost when this option is picked (negative answer)
    #[serde(default)]
    pub lives_lost: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PhilosophyQuestion {
    pub id: u32,
    pub question: String,
    pub options: Vec<QuestionOption>,
}

/// Which bubbles are visible
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ContentMode {
    /// One year at a time, advancing when a year is cleared
    #[default]
    Career,
    /// Everything at once
    Project,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ContentLibrary {
    #[serde(default)]
    pub bubbles: Vec<BubbleRecord>,
    #[serde(default)]
    pub questions: Vec<PhilosophyQuestion>,
}

impl ContentLibrary {
    pub fn new(bubbles: Vec<BubbleRecord>, questions: Vec<PhilosophyQuestion>) -> Result<Self, GameError> {
        let library = Self { bubbles, questions };
        library.validate()?;
        Ok(library)
    }

    pub fn from_json(json: &str) -> Result<Self, GameError> {
        let library: ContentLibrary = serde_json::from_str(json)?;
        library.validate()?;
        log::info!(
            "Loaded {} bubbles and {} questions",
            library.bubbles.len(),
            library.questions.len()
        );
        Ok(library)
    }

    fn validate(&self) -> Result<(), GameError> {
        let mut seen = HashSet::new();
        for bubble in &self.bubbles {
            if bubble.id < 0 {
                return Err(GameError::InvalidContent(format!(
                    "bubble id {} is in the reserved negative range",
                    bubble.id
                )));
            }
            if !seen.insert(bubble.id) {
                return Err(GameError::InvalidContent(format!(
                    "duplicate bubble id {}",
                    bubble.id
                )));
            }
        }
        if let Some(q) = self.questions.iter().find(|q| q.options.is_empty()) {
            return Err(GameError::InvalidContent(format!(
                "question {} has no options",
                q.id
            )));
        }
        Ok(())
    }

    /// Distinct years in ascending order
    pub fn years(&self) -> Vec<u32> {
        let mut years: Vec<u32> = self.bubbles.iter().filter_map(|b| b.year).collect();
        years.sort_unstable();
        years.dedup();
        years
    }

    /// First year after `year` that has content
    pub fn next_year(&self, year: u32) -> Option<u32> {
        self.years().into_iter().find(|&y| y > year)
    }

    /// Records visible for a mode; career mode shows only `year`
    pub fn bubbles_for(&self, mode: ContentMode, year: Option<u32>) -> Vec<&BubbleRecord> {
        self.bubbles
            .iter()
            .filter(|b| match mode {
                ContentMode::Project => true,
                ContentMode::Career => year.is_none() || b.year == year,
            })
            .collect()
    }

    pub fn bubble(&self, id: BubbleId) -> Option<&BubbleRecord> {
        self.bubbles.iter().find(|b| b.id == id)
    }

    pub fn question(&self, id: u32) -> Option<&PhilosophyQuestion> {
        self.questions.iter().find(|q| q.id == id)
    }

    /// Question linked to a bubble, or a random one when the link is missing
    /// or dangling
    pub fn question_for<R: Rng>(
        &self,
        question_id: Option<u32>,
        rng: &mut R,
    ) -> Option<&PhilosophyQuestion> {
        if let Some(q) = question_id.and_then(|id| self.question(id)) {
            return Some(q);
        }
        if self.questions.is_empty() {
            return None;
        }
        if let Some(id) = question_id {
            log::warn!("Question {} not found, picking a random one", id);
        }
        let idx = rng.random_range(0..self.questions.len());
        self.questions.get(idx)
    }
}
