//! Deferred actions on the frame clock
//!
//! Replaces fire-and-forget browser timeouts. Every timer is stamped with the
//! generation it was scheduled in; `clear` bumps the generation so callbacks
//! scheduled before a reset can never fire into the new session.

use super::node::BubbleId;

/// Work to run once a timer is due
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimerAction {
    /// Remove a popped bubble after its explosion impulse has applied
    RemoveBubble(BubbleId),
    /// Move to the next content year after exit animations
    AdvanceYear,
    /// Show queued modal flows outside the close-modal call stack
    ProcessModalQueue,
}

#[derive(Debug, Clone)]
struct Timer {
    due_ms: f64,
    seq: u64,
    generation: u64,
    action: TimerAction,
}

#[derive(Debug, Clone, Default)]
pub struct TimerQueue {
    timers: Vec<Timer>,
    generation: u64,
    next_seq: u64,
}

impl TimerQueue {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn len(&self) -> usize {
        self.timers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.timers.is_empty()
    }

    pub fn schedule(&mut self, now_ms: f64, delay_ms: f64, action: TimerAction) {
        let seq = self.next_seq;
        self.next_seq += 1;
        self.timers.push(Timer {
            due_ms: now_ms + delay_ms.max(0.0),
            seq,
            generation: self.generation,
            action,
        });
    }

    /// True if an identical action is already waiting
    pub fn is_pending(&self, action: TimerAction) -> bool {
        self.timers.iter().any(|t| t.action == action)
    }

    /// Remove and return due actions in (due time, schedule order)
    pub fn drain_due(&mut self, now_ms: f64) -> Vec<TimerAction> {
        let generation = self.generation;
        let mut due: Vec<Timer> = Vec::new();
        self.timers.retain(|t| {
            if t.generation != generation {
                return false;
            }
            if t.due_ms <= now_ms {
                due.push(t.clone());
                return false;
            }
            true
        });
        due.sort_by(|a, b| a.due_ms.total_cmp(&b.due_ms).then(a.seq.cmp(&b.seq)));
        due.into_iter().map(|t| t.action).collect()
    }

    /// Discard everything outstanding
    pub fn clear(&mut self) {
        self.generation += 1;
        self.timers.clear();
    }
}
