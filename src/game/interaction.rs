//! Pointer input -> physical consequences
//!
//! The controller only touches the scene. Rewards, achievements and modals
//! are decided by the caller from the returned [`ClickOutcome`].

use std::collections::HashMap;

use glam::Vec2;
use rand::Rng;

use crate::consts::*;
use crate::ease_out_cubic;
use crate::sim::{BubbleId, BubbleKind, RadiusPulse, Scene};
use crate::tuning::Tuning;

/// Click progress of one tough bubble
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ToughState {
    pub clicks: u32,
    /// Drawn once when the bubble is first seen
    pub required: u32,
}

/// Per-id toughness decisions and click counters, kept off the nodes so
/// they survive node-set rebuilds
#[derive(Debug, Clone, Default)]
pub struct ToughTracker {
    /// None: rolled and not tough
    decided: HashMap<BubbleId, Option<ToughState>>,
}

impl ToughTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Decide toughness for a bubble the first time it is seen. Later calls
    /// return the stored decision and never re-roll.
    pub fn assign<R: Rng>(
        &mut self,
        id: BubbleId,
        forced: bool,
        eligible: bool,
        tuning: &Tuning,
        rng: &mut R,
    ) -> bool {
        self.decided
            .entry(id)
            .or_insert_with(|| {
                let tough = forced || (eligible && rng.random::<f32>() < tuning.tough_chance);
                tough.then(|| ToughState {
                    clicks: 0,
                    required: rng.random_range(tuning.tough_clicks_min..=tuning.tough_clicks_max),
                })
            })
            .is_some()
    }

    pub fn state(&self, id: BubbleId) -> Option<ToughState> {
        self.decided.get(&id).copied().flatten()
    }

    /// Count a click. Returns the updated state, None if the id is not tough.
    pub fn click(&mut self, id: BubbleId) -> Option<ToughState> {
        let state = self.decided.get_mut(&id)?.as_mut()?;
        state.clicks = (state.clicks + 1).min(state.required);
        Some(*state)
    }

    pub fn clear(&mut self) {
        self.decided.clear();
    }
}

/// What a click did
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ClickOutcome {
    /// Re-entrant click, or a visited bubble under the cursor
    Ignored,
    /// Tough bubble took a hit but held
    ToughHit {
        id: BubbleId,
        pos: Vec2,
        clicks: u32,
        required: u32,
    },
    /// Hidden bubble found and burst
    HiddenFound { id: BubbleId, pos: Vec2 },
    /// Bubble opened; its content flow should start
    Opened {
        id: BubbleId,
        kind: BubbleKind,
        /// A tough bubble that just took its final click
        cracked: bool,
    },
    /// Nothing hit: repulsion blast only
    EmptyExplosion { pos: Vec2 },
}

/// Eased pointer parallax
#[derive(Debug, Clone, Copy)]
struct Parallax {
    from: Vec2,
    to: Vec2,
    start_ms: f64,
}

impl Parallax {
    fn at(&self, now_ms: f64) -> Vec2 {
        let t = ((now_ms - self.start_ms) / PARALLAX_EASE_MS) as f32;
        self.from.lerp(self.to, ease_out_cubic(t))
    }
}

impl Default for Parallax {
    fn default() -> Self {
        Self {
            from: Vec2::ZERO,
            to: Vec2::ZERO,
            start_ms: 0.0,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct InteractionController {
    /// Set while a click is being applied
    is_dragging: bool,
    hovered: Option<BubbleId>,
    parallax: Parallax,
    parallax_enabled: bool,
    pub tough: ToughTracker,
}

impl InteractionController {
    pub fn new(parallax_enabled: bool) -> Self {
        Self {
            parallax_enabled,
            ..Self::default()
        }
    }

    pub fn is_dragging(&self) -> bool {
        self.is_dragging
    }

    pub fn hovered(&self) -> Option<BubbleId> {
        self.hovered
    }

    pub fn set_parallax_enabled(&mut self, enabled: bool) {
        self.parallax_enabled = enabled;
        if !enabled {
            self.parallax = Parallax::default();
        }
    }

    pub fn parallax_offset(&self, now_ms: f64) -> Vec2 {
        self.parallax.at(now_ms)
    }

    pub fn handle_pointer_move(&mut self, scene: &mut Scene, point: Vec2, now_ms: f64) {
        if self.parallax_enabled {
            let center = Vec2::new(scene.width(), scene.height()) * 0.5;
            let norm = (point - center) / center.max(Vec2::ONE);
            let target = (norm * PARALLAX_MAX * PARALLAX_DAMPING)
                .clamp(Vec2::splat(-PARALLAX_MAX), Vec2::splat(PARALLAX_MAX));
            if target != self.parallax.to {
                self.parallax = Parallax {
                    from: self.parallax.at(now_ms),
                    to: target,
                    start_ms: now_ms,
                };
            }
        }

        if self.is_dragging {
            return;
        }
        let hit = scene.find_bubble_under_cursor(point);
        if hit != self.hovered {
            self.set_hover(scene, hit);
        }
    }

    /// Pointer left the canvas
    pub fn clear_hover(&mut self, scene: &mut Scene) {
        self.set_hover(scene, None);
    }

    fn set_hover(&mut self, scene: &mut Scene, target: Option<BubbleId>) {
        if let Some(node) = self.hovered.take().and_then(|prev| scene.node_mut(prev)) {
            node.is_hovered = false;
            node.target_radius = node.base_radius;
        }
        let Some(id) = target else {
            return;
        };
        if let Some(node) = scene.node_mut(id) {
            node.is_hovered = true;
            node.target_radius = node.base_radius * HOVER_SCALE;
            self.hovered = Some(id);
            scene.push_neighbors_of(id);
        }
    }

    /// Dispatch a click. Leaves the controller busy until [`finish_click`].
    ///
    /// [`finish_click`]: InteractionController::finish_click
    pub fn handle_click(&mut self, scene: &mut Scene, point: Vec2, now_ms: f64) -> ClickOutcome {
        if self.is_dragging {
            log::debug!("Click ignored while another is in flight");
            return ClickOutcome::Ignored;
        }
        self.is_dragging = true;

        let Some(id) = scene.find_bubble_under_cursor(point) else {
            scene.explode_at(point, EMPTY_CLICK_RADIUS, EMPTY_CLICK_STRENGTH, now_ms);
            return ClickOutcome::EmptyExplosion { pos: point };
        };
        let Some(node) = scene.node(id) else {
            return ClickOutcome::Ignored;
        };
        if node.is_visited {
            return ClickOutcome::Ignored;
        }
        let kind = node.kind();

        match kind {
            BubbleKind::Tough => {
                let Some(state) = self.tough.click(id) else {
                    log::warn!("Tough bubble {} has no click counter", id);
                    return self.open(scene, id, BubbleKind::Regular, false, now_ms);
                };
                if state.clicks >= state.required {
                    log::debug!("Tough bubble {} cracked after {} clicks", id, state.clicks);
                    let inner = if scene.node(id).is_some_and(|n| n.is_question) {
                        BubbleKind::Philosophy
                    } else {
                        BubbleKind::Regular
                    };
                    return self.open(scene, id, inner, true, now_ms);
                }
                let pos = bounce(scene, id, point, now_ms);
                ClickOutcome::ToughHit {
                    id,
                    pos,
                    clicks: state.clicks,
                    required: state.required,
                }
            }
            BubbleKind::Hidden => {
                if let Some(node) = scene.node_mut(id) {
                    node.is_visited = true;
                }
                let pos = scene
                    .pop_bubble(id, HIDDEN_POP_RADIUS, HIDDEN_POP_STRENGTH, now_ms)
                    .unwrap_or(point);
                ClickOutcome::HiddenFound { id, pos }
            }
            BubbleKind::Philosophy | BubbleKind::Regular => {
                self.open(scene, id, kind, false, now_ms)
            }
        }
    }

    fn open(
        &mut self,
        scene: &mut Scene,
        id: BubbleId,
        kind: BubbleKind,
        cracked: bool,
        now_ms: f64,
    ) -> ClickOutcome {
        if let Some(node) = scene.node_mut(id) {
            node.is_visited = true;
            node.pulse = Some(RadiusPulse::squash(now_ms));
        }
        ClickOutcome::Opened { id, kind, cracked }
    }

    /// Release the re-entrancy guard once the outcome has been applied
    pub fn finish_click(&mut self) {
        self.is_dragging = false;
    }

    pub fn reset(&mut self) {
        self.is_dragging = false;
        self.hovered = None;
        self.parallax = Parallax::default();
        self.tough.clear();
    }
}

/// Radius the bounce strength is tuned for
const BOUNCE_REFERENCE_RADIUS: f32 = 40.0;

/// Knock a tough bubble away from the click point and swell it
fn bounce(scene: &mut Scene, id: BubbleId, point: Vec2, now_ms: f64) -> Vec2 {
    let Some(node) = scene.node_mut(id) else {
        return point;
    };
    let offset = node.pos - point;
    let radius = node.current_radius.max(1.0);
    let off_center = (offset.length() / radius).clamp(0.2, 1.0);
    let dir = offset.try_normalize().unwrap_or(Vec2::NEG_Y);
    let speed = TOUGH_BOUNCE_STRENGTH * off_center * (radius / BOUNCE_REFERENCE_RADIUS);
    node.vel = (node.vel + dir * speed).clamp_length_max(PUSH_MAX_SPEED);
    node.pulse = Some(RadiusPulse::swell(now_ms));
    node.pos
}
