//! Achievements: a closed set of ids, a fixed tier table, and an unlock
//! store guarded against double unlocks

use std::collections::{BTreeSet, HashSet};

use serde::{Deserialize, Serialize};

use crate::tuning::Tuning;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum AchievementId {
    FirstBubble,
    /// First visited-count milestone
    Explorer,
    /// Second visited-count milestone
    Adventurer,
    /// Third visited-count milestone
    Completionist,
    SecretDiscoverer,
    ToughCracker,
    Philosopher,
    TimeTraveler,
    /// Level achievements only unlock as a consequence of a level-up
    FirstLevelUp,
    HalfwayThere,
    MaxLevel,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AchievementTier {
    /// Shown, never rewarded
    Badge,
    Basic,
    Intermediate,
    Advanced,
    Master,
}

impl AchievementTier {
    pub fn xp(self, tuning: &Tuning) -> u32 {
        let table = &tuning.achievement_xp;
        match self {
            AchievementTier::Badge => 0,
            AchievementTier::Basic => table.basic,
            AchievementTier::Intermediate => table.intermediate,
            AchievementTier::Advanced => table.advanced,
            AchievementTier::Master => table.master,
        }
    }
}

impl AchievementId {
    pub const ALL: [AchievementId; 11] = [
        AchievementId::FirstBubble,
        AchievementId::Explorer,
        AchievementId::Adventurer,
        AchievementId::Completionist,
        AchievementId::SecretDiscoverer,
        AchievementId::ToughCracker,
        AchievementId::Philosopher,
        AchievementId::TimeTraveler,
        AchievementId::FirstLevelUp,
        AchievementId::HalfwayThere,
        AchievementId::MaxLevel,
    ];

    pub fn tier(self) -> AchievementTier {
        match self {
            // Unlocked by a close that pays only the bubble's own XP
            AchievementId::FirstBubble => AchievementTier::Badge,
            AchievementId::Explorer
            | AchievementId::FirstLevelUp
            | AchievementId::Philosopher => AchievementTier::Basic,
            AchievementId::Adventurer
            | AchievementId::ToughCracker
            | AchievementId::TimeTraveler => AchievementTier::Intermediate,
            AchievementId::Completionist
            | AchievementId::SecretDiscoverer
            | AchievementId::HalfwayThere => AchievementTier::Advanced,
            AchievementId::MaxLevel => AchievementTier::Master,
        }
    }

    pub fn is_level_achievement(self) -> bool {
        matches!(
            self,
            AchievementId::FirstLevelUp | AchievementId::HalfwayThere | AchievementId::MaxLevel
        )
    }

    pub fn title(self) -> &'static str {
        match self {
            AchievementId::FirstBubble => "First Pop",
            AchievementId::Explorer => "Explorer",
            AchievementId::Adventurer => "Adventurer",
            AchievementId::Completionist => "Completionist",
            AchievementId::SecretDiscoverer => "Secret Discoverer",
            AchievementId::ToughCracker => "Tough Cracker",
            AchievementId::Philosopher => "Philosopher",
            AchievementId::TimeTraveler => "Time Traveler",
            AchievementId::FirstLevelUp => "Leveling Up",
            AchievementId::HalfwayThere => "Halfway There",
            AchievementId::MaxLevel => "Grandmaster",
        }
    }

    pub fn description(self) -> &'static str {
        match self {
            AchievementId::FirstBubble => "Open your first bubble",
            AchievementId::Explorer => "Visit the first milestone of bubbles",
            AchievementId::Adventurer => "Visit the second milestone of bubbles",
            AchievementId::Completionist => "Visit the third milestone of bubbles",
            AchievementId::SecretDiscoverer => "Find a hidden bubble",
            AchievementId::ToughCracker => "Crack a tough bubble",
            AchievementId::Philosopher => "Answer a philosophy question",
            AchievementId::TimeTraveler => "Clear a whole year",
            AchievementId::FirstLevelUp => "Reach level 2",
            AchievementId::HalfwayThere => "Reach level 5",
            AchievementId::MaxLevel => "Reach the maximum level",
        }
    }

    /// Level achievement unlocked by reaching `level`
    pub fn for_level(level: u32, max_level: u32) -> Option<AchievementId> {
        if level == max_level {
            Some(AchievementId::MaxLevel)
        } else if level == 2 {
            Some(AchievementId::FirstLevelUp)
        } else if level == 5 {
            Some(AchievementId::HalfwayThere)
        } else {
            None
        }
    }
}

/// An unlocked achievement as presented to the player
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Achievement {
    pub id: AchievementId,
    pub title: String,
    pub description: String,
    pub tier: AchievementTier,
    pub xp: u32,
}

impl Achievement {
    pub fn new(id: AchievementId, tuning: &Tuning) -> Self {
        Self {
            id,
            title: id.title().to_string(),
            description: id.description().to_string(),
            tier: id.tier(),
            xp: id.tier().xp(tuning),
        }
    }
}

/// Proof that an unlock was started; consumed by `complete_unlock`
#[derive(Debug, PartialEq, Eq)]
#[must_use]
pub struct PendingUnlock(AchievementId);

impl PendingUnlock {
    pub fn id(&self) -> AchievementId {
        self.0
    }
}

#[derive(Debug, Clone, Default)]
pub struct AchievementStore {
    unlocked: BTreeSet<AchievementId>,
    /// Unlocks started but not yet completed
    pending: HashSet<AchievementId>,
}

impl AchievementStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_unlocked(&self, id: AchievementId) -> bool {
        self.unlocked.contains(&id)
    }

    pub fn is_pending(&self, id: AchievementId) -> bool {
        self.pending.contains(&id)
    }

    pub fn unlocked(&self) -> impl Iterator<Item = AchievementId> + '_ {
        self.unlocked.iter().copied()
    }

    /// Claim an unlock. None if it is already unlocked or in flight.
    pub fn begin_unlock(&mut self, id: AchievementId) -> Option<PendingUnlock> {
        if self.unlocked.contains(&id) || !self.pending.insert(id) {
            log::debug!("Unlock of {:?} ignored (already unlocked or pending)", id);
            return None;
        }
        Some(PendingUnlock(id))
    }

    /// Finish a claimed unlock
    pub fn complete_unlock(&mut self, ticket: PendingUnlock, tuning: &Tuning) -> Option<Achievement> {
        let id = ticket.0;
        self.pending.remove(&id);
        if !self.unlocked.insert(id) {
            return None;
        }
        log::info!("Achievement unlocked: {:?}", id);
        Some(Achievement::new(id, tuning))
    }

    pub fn unlock(&mut self, id: AchievementId, tuning: &Tuning) -> Option<Achievement> {
        let ticket = self.begin_unlock(id)?;
        self.complete_unlock(ticket, tuning)
    }

    pub fn reset(&mut self) {
        self.unlocked.clear();
        self.pending.clear();
    }
}
