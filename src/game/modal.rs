//! Event-chain modal scheduler
//!
//! Modals are mutually exclusive. Everything the player sees after an action
//! is one [`EventChain`] walked strictly in order:
//! content -> achievements -> level achievements -> level-up.
//! Empty steps are skipped. A bonus modal may interrupt a chain; the chain is
//! parked and resumed when the bonus closes.

use std::collections::VecDeque;

use serde::{Deserialize, Serialize};

use super::achievements::Achievement;
use super::progression::{BonusContent, LevelUpResult};
use crate::error::GameError;
use crate::sim::BubbleId;

/// Something on screen
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Modal {
    Welcome,
    BubbleDetail { bubble_id: BubbleId },
    PhilosophyQuestion { bubble_id: BubbleId, question_id: u32 },
    Achievement(Achievement),
    LevelUp(LevelUpResult),
    GameOver,
    Bonus(BonusContent),
}

impl Modal {
    /// Content modals belong to a bubble and gate its removal
    pub fn bubble_id(&self) -> Option<BubbleId> {
        match self {
            Modal::BubbleDetail { bubble_id } | Modal::PhilosophyQuestion { bubble_id, .. } => {
                Some(*bubble_id)
            }
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ChainKind {
    Bubble,
    Philosophy,
    /// Not tied to a bubble: welcome, queued achievements, game over
    Manual,
}

impl ChainKind {
    fn priority(self) -> u8 {
        match self {
            ChainKind::Manual => 0,
            ChainKind::Bubble | ChainKind::Philosophy => 1,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum ChainStep {
    Content,
    Achievement,
    LevelAchievement,
    LevelUp,
    Done,
}

impl ChainStep {
    fn next(self) -> Self {
        match self {
            ChainStep::Content => ChainStep::Achievement,
            ChainStep::Achievement => ChainStep::LevelAchievement,
            ChainStep::LevelAchievement => ChainStep::LevelUp,
            ChainStep::LevelUp | ChainStep::Done => ChainStep::Done,
        }
    }
}

/// Free-form payload carried along a chain
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ChainContext {
    pub bubble_id: Option<BubbleId>,
}

/// An ordered plan of modals triggered by one action
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EventChain {
    pub kind: ChainKind,
    pub content: Option<Modal>,
    pub pending_achievements: VecDeque<Achievement>,
    /// Unlocked by the level-up, so shown after regular achievements
    pub pending_level_achievements: VecDeque<Achievement>,
    pub pending_level_up: Option<LevelUpResult>,
    pub current_step: ChainStep,
    pub context: ChainContext,
    /// Level-up already presented (survives a bonus interruption)
    level_up_shown: bool,
}

impl EventChain {
    pub fn new(kind: ChainKind, content: Option<Modal>) -> Self {
        let context = ChainContext {
            bubble_id: content.as_ref().and_then(Modal::bubble_id),
        };
        Self {
            kind,
            content,
            pending_achievements: VecDeque::new(),
            pending_level_achievements: VecDeque::new(),
            pending_level_up: None,
            current_step: ChainStep::Content,
            context,
            level_up_shown: false,
        }
    }

    pub fn bubble(bubble_id: BubbleId) -> Self {
        Self::new(ChainKind::Bubble, Some(Modal::BubbleDetail { bubble_id }))
    }

    pub fn philosophy(bubble_id: BubbleId, question_id: u32) -> Self {
        Self::new(
            ChainKind::Philosophy,
            Some(Modal::PhilosophyQuestion {
                bubble_id,
                question_id,
            }),
        )
    }

    pub fn manual(content: Option<Modal>) -> Self {
        Self::new(ChainKind::Manual, content)
    }

    pub fn with_achievement(mut self, achievement: Achievement) -> Self {
        self.push_achievement(achievement);
        self
    }

    pub fn with_level_up(mut self, result: LevelUpResult) -> Self {
        self.merge_level_up(result);
        self
    }

    /// Sorts level achievements into their own queue
    pub fn push_achievement(&mut self, achievement: Achievement) {
        if achievement.id.is_level_achievement() {
            self.pending_level_achievements.push_back(achievement);
        } else {
            self.pending_achievements.push_back(achievement);
        }
    }

    /// Fold another level-up into this chain, keeping the highest level
    pub fn merge_level_up(&mut self, result: LevelUpResult) {
        if !result.leveled_up {
            return;
        }
        match &mut self.pending_level_up {
            Some(existing) => {
                existing.levels_crossed.extend(result.levels_crossed);
                if result.new_level > existing.new_level {
                    existing.new_level = result.new_level;
                    existing.level_data = result.level_data;
                }
            }
            None => self.pending_level_up = Some(result),
        }
    }

    /// Whether an achievement can still be shown by this chain
    fn accepts_achievement(&self, achievement: &Achievement) -> bool {
        if achievement.id.is_level_achievement() {
            self.current_step <= ChainStep::LevelAchievement
        } else {
            self.current_step <= ChainStep::Achievement
        }
    }

    fn accepts_level_up(&self) -> bool {
        self.current_step < ChainStep::LevelUp
    }

    fn step_modal(&self, step: ChainStep) -> Option<Modal> {
        match step {
            ChainStep::Content => self.content.clone(),
            ChainStep::Achievement => self.pending_achievements.front().cloned().map(Modal::Achievement),
            ChainStep::LevelAchievement => self
                .pending_level_achievements
                .front()
                .cloned()
                .map(Modal::Achievement),
            ChainStep::LevelUp if !self.level_up_shown => {
                self.pending_level_up.clone().map(Modal::LevelUp)
            }
            ChainStep::LevelUp | ChainStep::Done => None,
        }
    }

    /// Drop the payload of the step that was just shown
    fn consume_current(&mut self) {
        match self.current_step {
            ChainStep::Content => self.content = None,
            ChainStep::Achievement => {
                self.pending_achievements.pop_front();
            }
            ChainStep::LevelAchievement => {
                self.pending_level_achievements.pop_front();
            }
            ChainStep::LevelUp => {
                self.pending_level_up = None;
                self.level_up_shown = true;
            }
            ChainStep::Done => {}
        }
    }

    /// Advance to the first step with something to show
    fn settle(&mut self) -> Option<Modal> {
        loop {
            if let Some(modal) = self.step_modal(self.current_step) {
                return Some(modal);
            }
            if self.current_step == ChainStep::Done {
                return None;
            }
            self.current_step = self.current_step.next();
        }
    }

    pub fn is_empty(&self) -> bool {
        self.content.is_none()
            && self.pending_achievements.is_empty()
            && self.pending_level_achievements.is_empty()
            && (self.pending_level_up.is_none() || self.level_up_shown)
    }
}

/// Coarse scheduler state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SchedulerState {
    Idle,
    ChainActive(ChainStep),
    /// A bonus modal is up; any interrupted chain is parked
    Paused,
}

/// What a close did
#[derive(Debug, Clone, PartialEq)]
pub struct CloseOutcome {
    pub closed: Modal,
    pub opened: Option<Modal>,
    /// Nothing is on screen any more
    pub idle: bool,
    /// Flows are waiting for a deferred `process_queue`
    pub queue_waiting: bool,
}

#[derive(Debug, Clone, Default)]
pub struct ModalScheduler {
    active: Option<Modal>,
    chain: Option<EventChain>,
    /// Chain interrupted by the bonus modal
    paused_chain: Option<EventChain>,
    /// Flows waiting for the screen to free up
    queued: VecDeque<EventChain>,
    /// Bubbles to pop once no modal is open, in request order
    pending_removals: VecDeque<BubbleId>,
}

impl ModalScheduler {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> SchedulerState {
        if matches!(self.active, Some(Modal::Bonus(_))) {
            SchedulerState::Paused
        } else if let Some(chain) = &self.chain {
            SchedulerState::ChainActive(chain.current_step)
        } else {
            SchedulerState::Idle
        }
    }

    pub fn active_modal(&self) -> Option<&Modal> {
        self.active.as_ref()
    }

    pub fn current_chain(&self) -> Option<&EventChain> {
        self.chain.as_ref()
    }

    pub fn has_active_modals(&self) -> bool {
        self.active.is_some()
    }

    pub fn queued_len(&self) -> usize {
        self.queued.len()
    }

    /// Begin a chain. Allowed from idle, or over a lower-priority flow which
    /// is then re-queued in front.
    pub fn start_event_chain(&mut self, chain: EventChain) -> Result<Option<Modal>, GameError> {
        if self.state() == SchedulerState::Paused {
            return Err(GameError::ModalBusy);
        }
        if let Some(current) = self.chain.take() {
            if chain.kind.priority() <= current.kind.priority() {
                self.chain = Some(current);
                return Err(GameError::ModalBusy);
            }
            log::debug!("{:?} chain overrides {:?} chain", chain.kind, current.kind);
            self.queued.push_front(current);
        }
        log::info!("Event chain started: {:?}", chain.kind);
        self.chain = Some(chain);
        Ok(self.present())
    }

    /// Start now if the screen is free, otherwise wait in line
    pub fn queue_chain(&mut self, chain: EventChain) -> Option<Modal> {
        if chain.is_empty() {
            return None;
        }
        if self.state() == SchedulerState::Idle {
            self.chain = Some(chain);
            return self.present();
        }
        self.queued.push_back(chain);
        None
    }

    /// Show the current chain step, or finish the chain
    fn present(&mut self) -> Option<Modal> {
        let modal = self.chain.as_mut().and_then(EventChain::settle);
        match &modal {
            Some(m) => self.active = Some(m.clone()),
            None => {
                if let Some(done) = self.chain.take() {
                    log::info!("Event chain finished: {:?}", done.kind);
                }
                self.active = None;
            }
        }
        modal
    }

    /// Close whatever is showing and move to the next non-empty step
    pub fn close_current_modal(&mut self) -> Result<CloseOutcome, GameError> {
        let closed = self.active.take().ok_or(GameError::NoActiveModal)?;

        let opened = if matches!(closed, Modal::Bonus(_)) {
            match self.paused_chain.take() {
                Some(chain) => {
                    log::info!("Resuming {:?} chain after bonus", chain.kind);
                    self.chain = Some(chain);
                    self.present()
                }
                None => None,
            }
        } else {
            if let Some(chain) = self.chain.as_mut() {
                chain.consume_current();
            }
            self.present()
        };

        let idle = self.active.is_none();
        Ok(CloseOutcome {
            closed,
            opened,
            idle,
            queue_waiting: idle && !self.queued.is_empty(),
        })
    }

    /// Start the next waiting flow if the screen is free
    pub fn process_queue(&mut self) -> Option<Modal> {
        while self.state() == SchedulerState::Idle {
            let chain = self.queued.pop_front()?;
            self.chain = Some(chain);
            if let Some(modal) = self.present() {
                return Some(modal);
            }
        }
        None
    }

    /// Show an achievement inside the current chain if it can still reach
    /// it, otherwise in a waiting manual flow
    pub fn queue_or_show_achievement(&mut self, achievement: Achievement) -> Option<Modal> {
        if let Some(chain) = self.chain.as_mut().filter(|c| c.accepts_achievement(&achievement)) {
            chain.push_achievement(achievement);
            return None;
        }
        if let Some(waiting) = self.waiting_manual_chain() {
            waiting.push_achievement(achievement);
            return None;
        }
        self.queue_chain(EventChain::manual(None).with_achievement(achievement))
    }

    /// Same routing for a level-up
    pub fn queue_or_show_level_up(&mut self, result: LevelUpResult) -> Option<Modal> {
        if !result.leveled_up {
            return None;
        }
        if let Some(chain) = self.chain.as_mut().filter(|c| c.accepts_level_up()) {
            chain.merge_level_up(result);
            return None;
        }
        if let Some(waiting) = self.waiting_manual_chain() {
            waiting.merge_level_up(result);
            return None;
        }
        self.queue_chain(EventChain::manual(None).with_level_up(result))
    }

    /// Last queued manual flow that has not started, for batching
    fn waiting_manual_chain(&mut self) -> Option<&mut EventChain> {
        self.queued
            .back_mut()
            .filter(|c| c.kind == ChainKind::Manual && c.content.is_none())
    }

    /// Open the side-quest bonus, parking any running chain
    pub fn open_bonus(&mut self, bonus: BonusContent) -> Result<Modal, GameError> {
        if self.state() == SchedulerState::Paused {
            return Err(GameError::ModalBusy);
        }
        if let Some(mut chain) = self.chain.take() {
            if matches!(self.active, Some(Modal::LevelUp(_))) {
                // Shown already; do not show it again on resume
                chain.consume_current();
            }
            log::info!("Pausing {:?} chain for bonus", chain.kind);
            self.paused_chain = Some(chain);
        }
        let modal = Modal::Bonus(bonus);
        self.active = Some(modal.clone());
        Ok(modal)
    }

    pub fn queue_bubble_removal(&mut self, id: BubbleId) {
        if !self.pending_removals.contains(&id) {
            self.pending_removals.push_back(id);
        }
    }

    pub fn pending_removals(&self) -> impl Iterator<Item = BubbleId> + '_ {
        self.pending_removals.iter().copied()
    }

    /// Release queued removals, in order, only when nothing is on screen
    pub fn process_pending_bubble_removals(&mut self) -> Vec<BubbleId> {
        if self.has_active_modals() {
            return Vec::new();
        }
        self.pending_removals.drain(..).collect()
    }

    pub fn reset(&mut self) {
        *self = Self::default();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::game::achievements::AchievementId;
    use crate::game::progression::level_data;
    use crate::tuning::Tuning;

    fn achievement(id: AchievementId) -> Achievement {
        Achievement::new(id, &Tuning::default())
    }

    fn level_up(level: u32) -> LevelUpResult {
        LevelUpResult {
            leveled_up: true,
            new_level: level,
            level_data: Some(level_data(level, &Tuning::default())),
            levels_crossed: vec![level],
        }
    }

    fn bonus() -> BonusContent {
        BonusContent {
            level: 3,
            title: "bonus".into(),
        }
    }

    #[test]
    fn test_chain_order() {
        let mut scheduler = ModalScheduler::new();
        let opened = scheduler.start_event_chain(EventChain::bubble(7)).unwrap();
        assert_eq!(opened, Some(Modal::BubbleDetail { bubble_id: 7 }));

        // Added while the content modal is up, out of order on purpose
        scheduler.queue_or_show_level_up(level_up(2));
        scheduler.queue_or_show_achievement(achievement(AchievementId::FirstLevelUp));
        scheduler.queue_or_show_achievement(achievement(AchievementId::FirstBubble));
        scheduler.queue_or_show_achievement(achievement(AchievementId::Philosopher));

        let mut shown = Vec::new();
        loop {
            let outcome = scheduler.close_current_modal().unwrap();
            match outcome.opened {
                Some(Modal::Achievement(a)) => shown.push(format!("{:?}", a.id)),
                Some(Modal::LevelUp(l)) => shown.push(format!("L{}", l.new_level)),
                Some(other) => panic!("unexpected {:?}", other),
                None => break,
            }
        }
        assert_eq!(shown, vec!["FirstBubble", "Philosopher", "FirstLevelUp", "L2"]);
        assert_eq!(scheduler.state(), SchedulerState::Idle);
    }

    #[test]
    fn test_empty_steps_skipped() {
        let mut scheduler = ModalScheduler::new();
        let chain = EventChain::manual(None).with_level_up(level_up(3));
        let opened = scheduler.start_event_chain(chain).unwrap();
        assert!(matches!(opened, Some(Modal::LevelUp(_))));
        assert_eq!(scheduler.state(), SchedulerState::ChainActive(ChainStep::LevelUp));

        // A chain with nothing in it never shows anything
        let mut scheduler = ModalScheduler::new();
        assert_eq!(scheduler.start_event_chain(EventChain::manual(None)).unwrap(), None);
        assert_eq!(scheduler.state(), SchedulerState::Idle);
    }

    #[test]
    fn test_busy_rejects_equal_priority() {
        let mut scheduler = ModalScheduler::new();
        scheduler.start_event_chain(EventChain::bubble(1)).unwrap();
        assert_eq!(
            scheduler.start_event_chain(EventChain::bubble(2)),
            Err(GameError::ModalBusy)
        );
        assert_eq!(
            scheduler.active_modal(),
            Some(&Modal::BubbleDetail { bubble_id: 1 })
        );
    }

    #[test]
    fn test_bubble_chain_overrides_manual() {
        let mut scheduler = ModalScheduler::new();
        scheduler.start_event_chain(EventChain::manual(Some(Modal::Welcome))).unwrap();
        let opened = scheduler.start_event_chain(EventChain::bubble(3)).unwrap();
        assert_eq!(opened, Some(Modal::BubbleDetail { bubble_id: 3 }));
        let outcome = scheduler.close_current_modal().unwrap();
        assert!(outcome.idle);
        assert!(outcome.queue_waiting);
        assert_eq!(scheduler.process_queue(), Some(Modal::Welcome));
    }

    #[test]
    fn test_late_achievement_deferred() {
        let mut scheduler = ModalScheduler::new();
        scheduler
            .start_event_chain(EventChain::manual(None).with_level_up(level_up(2)))
            .unwrap();
        // Chain is already on its level-up step
        assert_eq!(
            scheduler.queue_or_show_achievement(achievement(AchievementId::SecretDiscoverer)),
            None
        );
        assert_eq!(scheduler.queued_len(), 1);
        let outcome = scheduler.close_current_modal().unwrap();
        assert!(outcome.queue_waiting);
        let next = scheduler.process_queue().unwrap();
        assert!(matches!(next, Modal::Achievement(a) if a.id == AchievementId::SecretDiscoverer));
    }

    #[test]
    fn test_idle_achievement_shows_immediately() {
        let mut scheduler = ModalScheduler::new();
        let shown = scheduler.queue_or_show_achievement(achievement(AchievementId::Explorer));
        assert!(matches!(shown, Some(Modal::Achievement(_))));
    }

    #[test]
    fn test_bonus_pause_resume_skips_shown_level_up() {
        let mut scheduler = ModalScheduler::new();
        let chain = EventChain::manual(None).with_level_up(level_up(3));
        scheduler.start_event_chain(chain).unwrap();

        scheduler.open_bonus(bonus()).unwrap();
        assert_eq!(scheduler.state(), SchedulerState::Paused);
        assert!(scheduler.has_active_modals());
        assert!(scheduler.current_chain().is_none());
        assert_eq!(scheduler.open_bonus(bonus()), Err(GameError::ModalBusy));

        let outcome = scheduler.close_current_modal().unwrap();
        assert!(matches!(outcome.closed, Modal::Bonus(_)));
        assert_eq!(outcome.opened, None);
        assert_eq!(scheduler.state(), SchedulerState::Idle);
    }

    #[test]
    fn test_bonus_resume_reshows_unfinished_step() {
        let mut scheduler = ModalScheduler::new();
        let chain = EventChain::manual(None)
            .with_achievement(achievement(AchievementId::Explorer))
            .with_level_up(level_up(3));
        scheduler.start_event_chain(chain).unwrap();
        scheduler.open_bonus(bonus()).unwrap();

        let outcome = scheduler.close_current_modal().unwrap();
        assert!(matches!(outcome.opened, Some(Modal::Achievement(_))));
        let outcome = scheduler.close_current_modal().unwrap();
        assert!(matches!(outcome.opened, Some(Modal::LevelUp(_))));
    }

    #[test]
    fn test_removals_wait_for_last_modal() {
        let mut scheduler = ModalScheduler::new();
        scheduler.start_event_chain(EventChain::bubble(5)).unwrap();
        scheduler.queue_bubble_removal(5);
        scheduler.queue_or_show_achievement(achievement(AchievementId::FirstBubble));
        scheduler.queue_bubble_removal(9);
        scheduler.queue_bubble_removal(5);
        assert!(scheduler.process_pending_bubble_removals().is_empty());

        scheduler.close_current_modal().unwrap();
        assert!(scheduler.process_pending_bubble_removals().is_empty());

        let outcome = scheduler.close_current_modal().unwrap();
        assert!(outcome.idle);
        assert_eq!(scheduler.process_pending_bubble_removals(), vec![5, 9]);
        assert!(scheduler.process_pending_bubble_removals().is_empty());
    }

    #[test]
    fn test_close_without_modal() {
        let mut scheduler = ModalScheduler::new();
        assert_eq!(scheduler.close_current_modal(), Err(GameError::NoActiveModal));
    }

    #[test]
    fn test_chain_survives_serde() {
        let chain = EventChain::philosophy(-1000, 4)
            .with_achievement(achievement(AchievementId::Philosopher))
            .with_level_up(level_up(2));
        let json = serde_json::to_string(&chain).unwrap();
        let back: EventChain = serde_json::from_str(&json).unwrap();
        assert_eq!(back, chain);
        assert_eq!(back.context.bubble_id, Some(-1000));
    }
}
