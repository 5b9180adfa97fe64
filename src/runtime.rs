//! Runtime for driving a conversation
//!
//! `ChatRuntime` owns the transcript and the state machine and runs as a
//! single task. `ChatHandle` is the surface the presentation layer talks to.

mod executor;

#[cfg(test)]
pub mod testing;

pub use executor::ChatRuntime;

use crate::state_machine::{Event, RoundOutcome};
use crate::transcript::Turn;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::{broadcast, mpsc, watch};

/// Notifications sent to subscribers
#[derive(Debug, Clone)]
pub enum ChatEvent {
    /// Any durable or transient transcript mutation
    TranscriptChanged { turns: Vec<Turn> },
    /// `false` is sent only after the round's last transcript change
    BusyChanged { busy: bool },
    RoundFinished { outcome: RoundOutcome },
}

/// Handle to interact with a running conversation
#[derive(Clone)]
pub struct ChatHandle {
    event_tx: mpsc::Sender<Event>,
    broadcast_tx: broadcast::Sender<ChatEvent>,
    /// Set by the handle that gets its input accepted, cleared by the
    /// runtime once that input has been fully processed. At most one input
    /// is ever waiting in or being processed by the runtime.
    claimed: Arc<AtomicBool>,
    transcript_rx: watch::Receiver<Vec<Turn>>,
    search_enabled: Arc<AtomicBool>,
}

impl ChatHandle {
    /// Start a round with `text`. Returns false without doing anything when
    /// the text is blank or another input is still being handled; input is
    /// never queued.
    pub fn submit_user_turn(&self, text: impl Into<String>) -> bool {
        let text = text.into();
        if text.trim().is_empty() {
            tracing::debug!("Blank input ignored");
            return false;
        }

        if !self.claim() {
            tracing::debug!("Round in flight, ignoring user turn");
            return false;
        }

        self.send(Event::UserTurn {
            text,
            search_enabled: self.search_enabled(),
        })
    }

    /// Clear the transcript back to the greeting. Only honoured when idle.
    pub fn reset(&self) -> bool {
        if !self.claim() {
            tracing::debug!("Round in flight, ignoring reset");
            return false;
        }

        self.send(Event::Reset)
    }

    pub fn subscribe(&self) -> broadcast::Receiver<ChatEvent> {
        self.broadcast_tx.subscribe()
    }

    /// True from the moment input is accepted until the runtime is done with it
    pub fn is_busy(&self) -> bool {
        self.claimed.load(Ordering::Acquire)
    }

    /// Snapshot of the current transcript
    pub fn transcript(&self) -> Vec<Turn> {
        self.transcript_rx.borrow().clone()
    }

    /// Takes effect from the next round on
    pub fn set_search_enabled(&self, enabled: bool) {
        self.search_enabled.store(enabled, Ordering::Relaxed);
    }

    pub fn search_enabled(&self) -> bool {
        self.search_enabled.load(Ordering::Relaxed)
    }

    fn claim(&self) -> bool {
        self.claimed
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_ok()
    }

    fn send(&self, event: Event) -> bool {
        match self.event_tx.try_send(event) {
            Ok(()) => true,
            Err(e) => {
                tracing::warn!(error = %e, "Failed to forward input to chat runtime");
                self.claimed.store(false, Ordering::Release);
                false
            }
        }
    }
}
