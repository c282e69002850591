//! Game orchestration
//!
//! `Game` wires the scene, the interaction controller, the modal scheduler
//! and the progression rules together. Everything the host needs to react to
//! comes out as [`GameEvent`]s, drained once per frame.
//!
//! No error escapes `frame` or `draw`; pointer handlers log and swallow.

pub mod achievements;
pub mod interaction;
pub mod modal;
pub mod progression;

use std::collections::BTreeMap;

use glam::Vec2;
use rand::Rng;

use crate::consts::*;
use crate::content::{BubbleRecord, ContentLibrary, ContentMode};
use crate::error::GameError;
use crate::render::{self, Surface};
use crate::settings::Settings;
use crate::sim::{BubbleId, BubbleKind, Scene, SkillLevel, TextKind, TimerAction, TimerQueue};
use crate::tuning::Tuning;

use achievements::{AchievementId, AchievementStore};
use interaction::{ClickOutcome, InteractionController};
use modal::{EventChain, Modal, ModalScheduler};
use progression::{PhilosophyAnswer, UserSession, philosophy_outcome};

/// Outbound notifications for the host
#[derive(Debug, Clone, PartialEq)]
pub enum GameEvent {
    ModalOpened(Modal),
    ModalClosed(Modal),
    XpGained { amount: u32, total: u32 },
    LevelUp { level: u32 },
    LifeLost { remaining: u32 },
    GameOver,
    AchievementUnlocked(AchievementId),
    YearAdvanced { year: u32 },
    BubbleRemoved(BubbleId),
    Restarted,
}

const MILESTONE_ACHIEVEMENTS: [AchievementId; 3] = [
    AchievementId::Explorer,
    AchievementId::Adventurer,
    AchievementId::Completionist,
];

pub struct Game {
    tuning: Tuning,
    content: ContentLibrary,
    mode: ContentMode,
    scene: Scene,
    interaction: InteractionController,
    scheduler: ModalScheduler,
    achievements: AchievementStore,
    session: UserSession,
    timers: TimerQueue,
    events: Vec<GameEvent>,
    /// Philosophy and hidden bubbles, generated once per year (None in
    /// project mode)
    synthetic: BTreeMap<Option<u32>, Vec<BubbleRecord>>,
    next_philosophy_id: BubbleId,
    next_hidden_id: BubbleId,
    /// Answer given to the open philosophy question
    pending_answer: Option<(BubbleId, PhilosophyAnswer)>,
}

impl Game {
    pub fn new(
        content: ContentLibrary,
        tuning: Tuning,
        settings: &Settings,
        mode: ContentMode,
        width: f32,
        height: f32,
        seed: u64,
    ) -> Result<Self, GameError> {
        tuning.validate()?;
        let session = UserSession::new(&tuning, content.years().first().copied());
        let scene = Scene::new(
            width,
            height,
            seed,
            settings.breathing_enabled(),
            settings.max_debris(),
            settings.effective_screen_shake(),
        );

        let mut game = Self {
            tuning,
            content,
            mode,
            scene,
            interaction: InteractionController::new(settings.effective_parallax()),
            scheduler: ModalScheduler::new(),
            achievements: AchievementStore::new(),
            session,
            timers: TimerQueue::new(),
            events: Vec::new(),
            synthetic: BTreeMap::new(),
            next_philosophy_id: PHILOSOPHY_ID_BASE,
            next_hidden_id: HIDDEN_ID_BASE,
            pending_answer: None,
        };
        game.rebuild_scene();
        game.show_welcome();
        log::info!(
            "Game started: {:?} mode, year {:?}, {} bubbles",
            mode,
            game.session.current_year,
            game.scene.nodes().len()
        );
        Ok(game)
    }

    pub fn session(&self) -> &UserSession {
        &self.session
    }

    pub fn scene(&self) -> &Scene {
        &self.scene
    }

    /// Direct scene access for hosts that pin or inspect bubbles
    pub fn scene_mut(&mut self) -> &mut Scene {
        &mut self.scene
    }

    pub fn scheduler(&self) -> &ModalScheduler {
        &self.scheduler
    }

    pub fn achievements(&self) -> &AchievementStore {
        &self.achievements
    }

    pub fn interaction(&self) -> &InteractionController {
        &self.interaction
    }

    pub fn tuning(&self) -> &Tuning {
        &self.tuning
    }

    pub fn content(&self) -> &ContentLibrary {
        &self.content
    }

    pub fn active_modal(&self) -> Option<&Modal> {
        self.scheduler.active_modal()
    }

    pub fn drain_events(&mut self) -> Vec<GameEvent> {
        std::mem::take(&mut self.events)
    }

    pub fn apply_settings(&mut self, settings: &Settings) {
        self.scene.lifecycle.set_breathing(settings.breathing_enabled());
        self.scene
            .effects
            .set_shake_enabled(settings.effective_screen_shake());
        self.scene
            .effects
            .set_max_debris_per_burst(settings.max_debris());
        self.interaction
            .set_parallax_enabled(settings.effective_parallax());
    }

    // === Frame ===

    /// Run due timers, then advance physics and idle animation
    pub fn frame(&mut self, now_ms: f64) {
        for action in self.timers.drain_due(now_ms) {
            match action {
                TimerAction::RemoveBubble(id) => {
                    if self.scene.remove_bubble(id) {
                        self.events.push(GameEvent::BubbleRemoved(id));
                    }
                    self.check_year_cleared(now_ms);
                }
                TimerAction::AdvanceYear => self.advance_year(now_ms),
                TimerAction::ProcessModalQueue => {
                    if let Some(modal) = self.scheduler.process_queue() {
                        self.emit_opened(modal);
                    }
                }
            }
        }
        self.scene.frame(now_ms);
    }

    pub fn draw<S: Surface>(&mut self, surface: &mut S, now_ms: f64) {
        let parallax = self.interaction.parallax_offset(now_ms);
        render::draw_frame(surface, &mut self.scene, parallax, now_ms);
    }

    // === Pointer input ===

    pub fn handle_pointer_move(&mut self, point: Vec2, now_ms: f64) {
        self.interaction
            .handle_pointer_move(&mut self.scene, point, now_ms);
    }

    pub fn handle_pointer_leave(&mut self) {
        self.interaction.clear_hover(&mut self.scene);
    }

    /// Clicks land only while no modal covers the canvas
    pub fn handle_click(&mut self, point: Vec2, now_ms: f64) -> ClickOutcome {
        if self.session.game_completed || self.scheduler.has_active_modals() {
            return ClickOutcome::Ignored;
        }
        let outcome = self
            .interaction
            .handle_click(&mut self.scene, point, now_ms);
        match outcome {
            ClickOutcome::ToughHit {
                pos,
                clicks,
                required,
                ..
            } => {
                log::debug!("Tough hit {}/{}", clicks, required);
                self.grant_xp(self.tuning.tough_click_xp, Some(pos), now_ms);
            }
            ClickOutcome::HiddenFound { id, pos } => {
                log::info!("Hidden bubble {} found", id);
                self.session.add_visited_bubble(id);
                self.grant_xp(self.tuning.secret_bubble_xp, Some(pos), now_ms);
                self.unlock(AchievementId::SecretDiscoverer, now_ms);
                if self.scene.remove_bubble(id) {
                    self.events.push(GameEvent::BubbleRemoved(id));
                }
                self.check_year_cleared(now_ms);
            }
            ClickOutcome::Opened { id, kind, cracked } => {
                self.open_content(id, kind, now_ms);
                if cracked {
                    self.unlock(AchievementId::ToughCracker, now_ms);
                }
            }
            ClickOutcome::Ignored | ClickOutcome::EmptyExplosion { .. } => {}
        }
        self.interaction.finish_click();
        outcome
    }

    fn open_content(&mut self, id: BubbleId, kind: BubbleKind, now_ms: f64) {
        self.session.add_visited_bubble(id);
        let chain = if kind == BubbleKind::Philosophy {
            let linked = self.scene.node(id).and_then(|n| n.question_id);
            match self
                .content
                .question_for(linked, self.scene.rng_mut())
                .map(|q| q.id)
            {
                Some(question_id) => EventChain::philosophy(id, question_id),
                None => {
                    log::warn!("No questions available for bubble {}", id);
                    EventChain::bubble(id)
                }
            }
        } else {
            EventChain::bubble(id)
        };

        match self.scheduler.start_event_chain(chain) {
            Ok(Some(modal)) => self.emit_opened(modal),
            Ok(None) => {}
            Err(e) => log::warn!("Could not open bubble {} at {}: {}", id, now_ms, e),
        }
    }

    // === Modals ===

    /// Record the answer to the open philosophy question. Rewards are paid
    /// when the modal closes.
    pub fn answer_question(&mut self, answer: PhilosophyAnswer) -> Result<(), GameError> {
        let Some(&Modal::PhilosophyQuestion {
            bubble_id,
            question_id,
        }) = self.scheduler.active_modal()
        else {
            return Err(GameError::NotAwaitingAnswer);
        };
        let question = self.content.question(question_id).ok_or_else(|| {
            GameError::InvalidContent(format!("question {} not found", question_id))
        })?;
        philosophy_outcome(&answer, question, &self.tuning)?;
        self.pending_answer = Some((bubble_id, answer));
        Ok(())
    }

    /// Close the visible modal. Closing a content modal runs the bubble's
    /// continuation first, so its rewards join the same chain.
    pub fn close_modal(&mut self, now_ms: f64) -> Result<(), GameError> {
        let active = self
            .scheduler
            .active_modal()
            .cloned()
            .ok_or(GameError::NoActiveModal)?;
        if active.bubble_id().is_some() {
            self.bubble_continue(&active, now_ms);
        }

        let outcome = self.scheduler.close_current_modal()?;
        self.events.push(GameEvent::ModalClosed(outcome.closed));
        if let Some(modal) = outcome.opened {
            self.emit_opened(modal);
        }
        if outcome.idle {
            self.flush_removals(now_ms);
            if outcome.queue_waiting {
                self.schedule_queue_processing(now_ms);
            }
        }
        Ok(())
    }

    /// Open the bonus unlocked at `level` as a side quest
    pub fn open_bonus(&mut self, level: u32) -> Result<(), GameError> {
        let bonus = self
            .session
            .unlocked_bonuses
            .iter()
            .find(|b| b.level == level)
            .cloned()
            .ok_or_else(|| GameError::InvalidContent(format!("no bonus unlocked for level {}", level)))?;
        let modal = self.scheduler.open_bonus(bonus)?;
        self.emit_opened(modal);
        Ok(())
    }

    fn show_welcome(&mut self) {
        match self
            .scheduler
            .start_event_chain(EventChain::manual(Some(Modal::Welcome)))
        {
            Ok(Some(modal)) => self.emit_opened(modal),
            Ok(None) => {}
            Err(e) => log::warn!("Welcome modal skipped: {}", e),
        }
    }

    fn emit_opened(&mut self, modal: Modal) {
        log::debug!("Modal opened: {:?}", modal);
        self.events.push(GameEvent::ModalOpened(modal));
    }

    fn schedule_queue_processing(&mut self, now_ms: f64) {
        if !self.timers.is_pending(TimerAction::ProcessModalQueue) {
            self.timers
                .schedule(now_ms, QUEUE_PROCESS_DELAY_MS, TimerAction::ProcessModalQueue);
        }
    }

    /// Pop every bubble whose removal waited on modals; the nodes go after a
    /// short delay so the blast impulse applies first
    fn flush_removals(&mut self, now_ms: f64) {
        for id in self.scheduler.process_pending_bubble_removals() {
            self.scene.pop_bubble(id, POP_RADIUS, POP_STRENGTH, now_ms);
            self.timers
                .schedule(now_ms, BUBBLE_REMOVAL_DELAY_MS, TimerAction::RemoveBubble(id));
        }
    }

    // === Progression ===

    /// Reward a closed content modal and queue its bubble for removal
    fn bubble_continue(&mut self, modal: &Modal, now_ms: f64) {
        let Some(id) = modal.bubble_id() else {
            return;
        };
        let (pos, skill, tough) = match self.scene.node(id) {
            Some(node) => (Some(node.pos), node.skill_level, node.is_tough),
            None => {
                log::warn!("Continue for missing bubble {}", id);
                (None, SkillLevel::Novice, false)
            }
        };

        match modal {
            Modal::PhilosophyQuestion { question_id, .. } => {
                self.apply_answer(id, *question_id, pos, now_ms)
            }
            // Paid per click already
            _ if tough => {}
            _ => self.grant_xp(self.tuning.bubble_xp(skill), pos, now_ms),
        }

        self.unlock(AchievementId::FirstBubble, now_ms);
        self.check_milestones(now_ms);
        self.scheduler.queue_bubble_removal(id);
    }

    fn apply_answer(&mut self, id: BubbleId, question_id: u32, pos: Option<Vec2>, now_ms: f64) {
        let answer = match self.pending_answer.take() {
            Some((answered, answer)) if answered == id => answer,
            _ => {
                log::debug!("Question on bubble {} closed without an answer", id);
                return;
            }
        };
        let outcome = match self.content.question(question_id) {
            Some(question) => philosophy_outcome(&answer, question, &self.tuning),
            None => Err(GameError::InvalidContent(format!(
                "question {} not found",
                question_id
            ))),
        };
        let (xp, lives_lost) = match outcome {
            Ok(outcome) => outcome,
            Err(e) => {
                log::warn!("Answer to question {} dropped: {}", question_id, e);
                return;
            }
        };

        self.grant_xp(xp, pos, now_ms);
        self.unlock(AchievementId::Philosopher, now_ms);
        if lives_lost > 0 {
            self.lose_life(lives_lost, pos, now_ms);
        }
    }

    fn lose_life(&mut self, amount: u32, pos: Option<Vec2>, now_ms: f64) {
        let loss = match self.session.lose_life(amount) {
            Ok(loss) => loss,
            Err(e) => {
                log::debug!("Life loss ignored: {}", e);
                return;
            }
        };
        self.events.push(GameEvent::LifeLost {
            remaining: loss.remaining,
        });
        if let Some(pos) = pos {
            self.scene.effects.create_floating_text(
                format!("-{} life", amount),
                pos,
                TextKind::LifeLoss,
                now_ms,
            );
        }
        if loss.game_over {
            self.events.push(GameEvent::GameOver);
            if let Some(modal) = self
                .scheduler
                .queue_chain(EventChain::manual(Some(Modal::GameOver)))
            {
                self.emit_opened(modal);
            }
        }
    }

    /// Add XP; level achievements are routed before the level-up so they
    /// land in the same chain ahead of it
    fn grant_xp(&mut self, amount: u32, pos: Option<Vec2>, now_ms: f64) {
        if amount == 0 {
            return;
        }
        let result = match self.session.add_xp(amount, &self.tuning) {
            Ok(result) => result,
            Err(e) => {
                log::debug!("XP grant of {} ignored: {}", amount, e);
                return;
            }
        };
        self.events.push(GameEvent::XpGained {
            amount,
            total: self.session.xp,
        });
        if let Some(pos) = pos {
            self.scene.effects.create_floating_text(
                format!("+{} XP", amount),
                pos,
                TextKind::Xp,
                now_ms,
            );
        }

        if !result.leveled_up {
            return;
        }
        self.events.push(GameEvent::LevelUp {
            level: result.new_level,
        });
        let max_level = self.tuning.max_level();
        for &level in &result.levels_crossed {
            if let Some(id) = AchievementId::for_level(level, max_level) {
                self.unlock(id, now_ms);
            }
        }
        if let Some(modal) = self.scheduler.queue_or_show_level_up(result) {
            self.emit_opened(modal);
        }
    }

    /// Unlock once, show it, then pay its tier XP
    fn unlock(&mut self, id: AchievementId, now_ms: f64) {
        if self.session.game_completed {
            return;
        }
        let Some(ticket) = self.achievements.begin_unlock(id) else {
            return;
        };
        let Some(achievement) = self.achievements.complete_unlock(ticket, &self.tuning) else {
            return;
        };
        self.events.push(GameEvent::AchievementUnlocked(id));
        let xp = achievement.xp;
        if let Some(modal) = self.scheduler.queue_or_show_achievement(achievement) {
            self.emit_opened(modal);
        }
        self.grant_xp(xp, None, now_ms);
    }

    fn check_milestones(&mut self, now_ms: f64) {
        let visited = self.session.visited_count() as u32;
        for (milestone, id) in self.tuning.milestones.into_iter().zip(MILESTONE_ACHIEVEMENTS) {
            if visited >= milestone {
                self.unlock(id, now_ms);
            }
        }
    }

    // === Years ===

    /// Schedule the next year once nothing but hidden bubbles is left
    fn check_year_cleared(&mut self, now_ms: f64) {
        if self.mode != ContentMode::Career || self.timers.is_pending(TimerAction::AdvanceYear) {
            return;
        }
        let Some(year) = self.session.current_year else {
            return;
        };
        if self.content.next_year(year).is_none() {
            return;
        }
        let cleared = self.scene.nodes().iter().all(|n| n.is_hidden)
            && self.scheduler.pending_removals().next().is_none();
        if cleared {
            log::debug!("Year {} cleared", year);
            self.timers
                .schedule(now_ms, YEAR_ADVANCE_DELAY_MS, TimerAction::AdvanceYear);
        }
    }

    fn advance_year(&mut self, now_ms: f64) {
        let Some(next) = self
            .session
            .current_year
            .and_then(|year| self.content.next_year(year))
        else {
            return;
        };
        log::info!("Advancing to year {}", next);
        self.session.current_year = Some(next);
        self.interaction.clear_hover(&mut self.scene);
        self.rebuild_scene();
        self.events.push(GameEvent::YearAdvanced { year: next });
        self.unlock(AchievementId::TimeTraveler, now_ms);
        self.check_year_cleared(now_ms);
    }

    // === Scene population ===

    fn synthetic_key(&self) -> Option<u32> {
        match self.mode {
            ContentMode::Career => self.session.current_year,
            ContentMode::Project => None,
        }
    }

    /// Generate the philosophy and hidden bubbles for `key` once
    fn ensure_synthetic(&mut self, key: Option<u32>) {
        if self.synthetic.contains_key(&key) {
            return;
        }
        let rng = self.scene.rng_mut();
        let mut records = Vec::new();

        if !self.content.questions.is_empty() {
            for _ in 0..self.tuning.philosophy_bubbles_per_year {
                let idx = rng.random_range(0..self.content.questions.len());
                let question_id = self.content.questions.get(idx).map(|q| q.id);
                records.push(BubbleRecord {
                    id: self.next_philosophy_id,
                    name: "?".into(),
                    year: key,
                    is_question: true,
                    question_id,
                    ..Default::default()
                });
                self.next_philosophy_id -= 1;
            }
        }
        if rng.random::<f32>() < self.tuning.hidden_bubble_chance {
            records.push(BubbleRecord {
                id: self.next_hidden_id,
                year: key,
                is_hidden: true,
                ..Default::default()
            });
            self.next_hidden_id -= 1;
        }
        log::debug!("Generated {} synthetic bubbles for {:?}", records.len(), key);
        self.synthetic.insert(key, records);
    }

    /// Records to show: unvisited ones, plus visited ones still waiting on
    /// their modals
    fn visible_records(&mut self) -> Vec<BubbleRecord> {
        let key = self.synthetic_key();
        self.ensure_synthetic(key);

        let lingering: Vec<BubbleId> = self
            .scheduler
            .pending_removals()
            .chain(
                self.scheduler
                    .current_chain()
                    .and_then(|c| c.context.bubble_id),
            )
            .collect();
        let keep = |r: &&BubbleRecord| !self.session.has_visited(r.id) || lingering.contains(&r.id);

        let mut records: Vec<BubbleRecord> = self
            .content
            .bubbles_for(self.mode, self.session.current_year)
            .into_iter()
            .chain(self.synthetic.get(&key).into_iter().flatten())
            .filter(keep)
            .cloned()
            .collect();

        let rng = self.scene.rng_mut();
        for record in &mut records {
            let eligible = !record.is_hidden && !record.is_question;
            record.is_tough =
                self.interaction
                    .tough
                    .assign(record.id, record.is_tough, eligible, &self.tuning, rng);
        }
        records
    }

    fn rebuild_scene(&mut self) {
        let records = self.visible_records();
        self.scene.set_bubbles(&records);
        for node in self.scene.sim.nodes_mut() {
            node.is_visited = self.session.has_visited(node.id);
        }
    }

    // === Session lifecycle ===

    /// Single teardown path: stale timers dropped, physics stopped, effects
    /// cleared
    fn teardown(&mut self, forget_positions: bool) {
        self.timers.clear();
        self.scene.teardown(forget_positions);
    }

    /// Re-init for a new canvas size, keeping positions
    pub fn resize(&mut self, width: f32, height: f32, now_ms: f64) {
        log::info!("Resize to {}x{}", width, height);
        // Their removal timers die with the teardown
        let popped: Vec<BubbleId> = self
            .scene
            .nodes()
            .iter()
            .filter(|n| n.is_popped)
            .map(|n| n.id)
            .collect();
        for id in popped {
            if self.scene.remove_bubble(id) {
                self.events.push(GameEvent::BubbleRemoved(id));
            }
        }
        self.teardown(false);
        self.scene.restart_simulation();
        self.scene.resize(width, height);
        self.rebuild_scene();

        // Re-arm what the teardown dropped
        if !self.scheduler.has_active_modals() && self.scheduler.queued_len() > 0 {
            self.schedule_queue_processing(now_ms);
        }
        self.check_year_cleared(now_ms);
    }

    /// Fresh session on the same content
    pub fn restart(&mut self) {
        log::info!("Restarting session");
        self.teardown(true);
        self.scheduler.reset();
        self.achievements.reset();
        self.interaction.reset();
        self.synthetic.clear();
        self.next_philosophy_id = PHILOSOPHY_ID_BASE;
        self.next_hidden_id = HIDDEN_ID_BASE;
        self.pending_answer = None;
        self.session = UserSession::new(&self.tuning, self.content.years().first().copied());
        self.scene.restart_simulation();
        self.rebuild_scene();
        self.events.push(GameEvent::Restarted);
        self.show_welcome();
    }

    /// Stop everything; the host drops its listeners after this
    pub fn destroy(&mut self) {
        log::info!("Destroying game");
        self.teardown(true);
        self.scheduler.reset();
        self.interaction.reset();
    }
}
