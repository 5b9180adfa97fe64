//! Chat runtime executor

use super::{ChatEvent, ChatHandle};
use crate::llm::{CompletionClient, CompletionRequest};
use crate::state_machine::{
    transition, ChatContext, ChatState, Effect, Event, RoundError, RoundOutcome, TransitionError,
};
use crate::transcript::{Transcript, Turn};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::{broadcast, mpsc, watch};
use tracing::Instrument;

const EVENT_CHANNEL_CAPACITY: usize = 32;
const BROADCAST_CAPACITY: usize = 256;

/// Conversation runtime, generic over the completion client
pub struct ChatRuntime<C>
where
    C: CompletionClient + 'static,
{
    context: ChatContext,
    state: ChatState,
    transcript: Transcript,
    client: Arc<C>,
    event_rx: mpsc::Receiver<Event>,
    broadcast_tx: broadcast::Sender<ChatEvent>,
    claimed: Arc<AtomicBool>,
    transcript_tx: watch::Sender<Vec<Turn>>,
}

impl<C> ChatRuntime<C>
where
    C: CompletionClient + 'static,
{
    pub fn new(
        context: ChatContext,
        transcript: Transcript,
        client: C,
        search_enabled: bool,
    ) -> (Self, ChatHandle) {
        let (event_tx, event_rx) = mpsc::channel(EVENT_CHANNEL_CAPACITY);
        let (broadcast_tx, _) = broadcast::channel(BROADCAST_CAPACITY);
        let (transcript_tx, transcript_rx) = watch::channel(transcript.turns().to_vec());
        let claimed = Arc::new(AtomicBool::new(false));

        let handle = ChatHandle {
            event_tx,
            broadcast_tx: broadcast_tx.clone(),
            claimed: Arc::clone(&claimed),
            transcript_rx,
            search_enabled: Arc::new(AtomicBool::new(search_enabled)),
        };

        let runtime = Self {
            context,
            state: ChatState::Idle,
            transcript,
            client: Arc::new(client),
            event_rx,
            broadcast_tx,
            claimed,
            transcript_tx,
        };

        (runtime, handle)
    }

    /// Process input until every handle is dropped
    pub async fn run(mut self) {
        tracing::info!(model = %self.context.model, "Starting chat runtime");

        while let Some(event) = self.event_rx.recv().await {
            let result = if matches!(event, Event::UserTurn { .. }) {
                let span = tracing::info_span!("round", round_id = %uuid::Uuid::new_v4());
                self.process_event(event).instrument(span).await
            } else {
                self.process_event(event).await
            };

            // The accepted input is fully handled; handles may submit again
            self.claimed.store(false, Ordering::Release);

            match result {
                Ok(true) => {
                    debug_assert!(self.transcript.is_alternating());
                    debug_assert!(!self.transcript.has_transient());
                    let _ = self.broadcast_tx.send(ChatEvent::BusyChanged { busy: false });
                }
                Ok(false) => {}
                Err(e @ TransitionError::InvalidTransition(_)) => {
                    tracing::warn!(error = %e, state = self.state.name(), "Event rejected");
                }
                Err(e @ (TransitionError::AgentBusy | TransitionError::EmptyMessage)) => {
                    tracing::debug!(error = %e, "Input ignored");
                }
            }
        }

        tracing::info!("Chat runtime stopped");
    }

    /// Run `event` and everything it sets off. Returns whether a round ran;
    /// the state is `Idle` again either way.
    async fn process_event(&mut self, event: Event) -> Result<bool, TransitionError> {
        let mut round_ran = false;

        // Completion results come back as events; loop instead of recursing
        let mut events_to_process = vec![event];

        while let Some(current_event) = events_to_process.pop() {
            // Pure state transition
            let result = transition(&self.state, &self.context, &self.transcript, current_event)?;

            let was_busy = self.state.is_busy();
            self.state = result.new_state;
            tracing::debug!(state = self.state.name(), "State transition");

            if self.state.is_busy() && !was_busy {
                round_ran = true;
                let _ = self.broadcast_tx.send(ChatEvent::BusyChanged { busy: true });
            }

            for effect in result.effects {
                if let Some(generated_event) = self.execute_effect(effect).await {
                    events_to_process.push(generated_event);
                }
            }
        }

        Ok(round_ran)
    }

    async fn execute_effect(&mut self, effect: Effect) -> Option<Event> {
        match effect {
            Effect::AppendTurn { turn } => {
                self.transcript.push(turn);
                self.publish_transcript();
                None
            }
            Effect::RemoveTransient => {
                if self.transcript.remove_transient() > 0 {
                    self.publish_transcript();
                }
                None
            }
            Effect::ResetTranscript => {
                self.transcript.reset();
                self.publish_transcript();
                tracing::info!("Transcript reset");
                None
            }
            Effect::RequestCompletion { request } => Some(self.request_completion(request).await),
            Effect::RoundFinished { outcome } => {
                log_outcome(&outcome);
                let _ = self.broadcast_tx.send(ChatEvent::RoundFinished { outcome });
                None
            }
        }
    }

    /// Make one completion call. Handles hold the claim for the whole round,
    /// so nothing should arrive meanwhile; anything that does is run through
    /// the state machine, which rejects it.
    async fn request_completion(&mut self, request: CompletionRequest) -> Event {
        tracing::debug!(
            state = self.state.name(),
            messages = request.messages.len(),
            tools = request.tools.len(),
            "Requesting completion"
        );

        let client = Arc::clone(&self.client);
        let call = async move { client.complete(&request).await };
        tokio::pin!(call);

        let settled = loop {
            tokio::select! {
                settled = &mut call => break settled,
                Some(event) = self.event_rx.recv() => self.reject_while_busy(event),
            }
        };

        match settled {
            Ok(response) => Event::CompletionReceived { response },
            Err(error) => Event::CompletionFailed { error },
        }
    }

    fn reject_while_busy(&self, event: Event) {
        match transition(&self.state, &self.context, &self.transcript, event) {
            Err(e) => tracing::debug!(error = %e, "Input ignored during round"),
            Ok(_) => tracing::warn!(
                state = self.state.name(),
                "Event accepted mid-round by the state machine; dropped"
            ),
        }
    }

    fn publish_transcript(&self) {
        let turns = self.transcript.turns().to_vec();
        self.transcript_tx.send_replace(turns.clone());
        let _ = self.broadcast_tx.send(ChatEvent::TranscriptChanged { turns });
    }
}

fn log_outcome(outcome: &RoundOutcome) {
    match outcome {
        RoundOutcome::Completed { searched } => {
            tracing::info!(searched, "Round completed");
        }
        RoundOutcome::Recovered(RoundError::EmptyCompletion { searched }) => {
            tracing::warn!(searched, "Completion had no text, recorded fallback reply");
        }
        RoundOutcome::Recovered(RoundError::Transport(e)) => {
            tracing::error!(
                error = %e,
                kind = e.kind.as_str(),
                "Completion call failed, recorded apology"
            );
        }
    }
}
