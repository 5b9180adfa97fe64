//! Mock implementations for testing
//!
//! These mocks enable runtime tests without network I/O.

use crate::llm::{
    CompletionClient, CompletionRequest, CompletionResponse, ContentBlock, StopReason,
    TransportError, Usage,
};
use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use tokio::sync::Notify;

// ============================================================================
// Mock Completion Client
// ============================================================================

/// Mock client that returns queued responses
pub struct MockCompletionClient {
    responses: Mutex<VecDeque<Result<CompletionResponse, TransportError>>>,
    /// Record of all requests made
    pub requests: Mutex<Vec<CompletionRequest>>,
}

impl MockCompletionClient {
    pub fn new() -> Self {
        Self {
            responses: Mutex::new(VecDeque::new()),
            requests: Mutex::new(Vec::new()),
        }
    }

    /// Queue a successful response
    pub fn queue_response(&self, response: CompletionResponse) {
        self.responses.lock().unwrap().push_back(Ok(response));
    }

    /// Queue an error response
    pub fn queue_error(&self, error: TransportError) {
        self.responses.lock().unwrap().push_back(Err(error));
    }

    /// Get recorded requests
    pub fn recorded_requests(&self) -> Vec<CompletionRequest> {
        self.requests.lock().unwrap().clone()
    }

    fn next(&self, request: &CompletionRequest) -> Result<CompletionResponse, TransportError> {
        self.requests.lock().unwrap().push(request.clone());
        self.responses
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Err(TransportError::network("No mock response queued")))
    }
}

impl Default for MockCompletionClient {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl CompletionClient for MockCompletionClient {
    async fn complete(
        &self,
        request: &CompletionRequest,
    ) -> Result<CompletionResponse, TransportError> {
        self.next(request)
    }
}

// ============================================================================
// Gated Mock Client (for in-flight behaviour)
// ============================================================================

/// Mock client that holds every call until the test releases it
pub struct GatedMockClient {
    inner: MockCompletionClient,
    /// Notified when a request starts
    pub request_started: Arc<Notify>,
    release: Arc<Notify>,
}

impl GatedMockClient {
    pub fn new() -> Self {
        Self {
            inner: MockCompletionClient::new(),
            request_started: Arc::new(Notify::new()),
            release: Arc::new(Notify::new()),
        }
    }

    pub fn queue_response(&self, response: CompletionResponse) {
        self.inner.queue_response(response);
    }

    /// Let the oldest waiting call settle
    pub fn release_one(&self) {
        self.release.notify_one();
    }

    pub fn recorded_requests(&self) -> Vec<CompletionRequest> {
        self.inner.recorded_requests()
    }
}

impl Default for GatedMockClient {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl CompletionClient for GatedMockClient {
    async fn complete(
        &self,
        request: &CompletionRequest,
    ) -> Result<CompletionResponse, TransportError> {
        self.request_started.notify_one();
        self.release.notified().await;
        self.inner.next(request)
    }
}

// ============================================================================
// Response builders
// ============================================================================

pub fn text_response(text: &str) -> CompletionResponse {
    CompletionResponse {
        content: vec![ContentBlock::text(text)],
        stop_reason: StopReason::EndTurn,
        usage: Usage::default(),
    }
}

pub fn tool_use_response(id: &str) -> CompletionResponse {
    CompletionResponse {
        content: vec![ContentBlock::tool_use(id, "web_search")],
        stop_reason: StopReason::ToolUse,
        usage: Usage::default(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::{MessageContent, MessageRole};
    use crate::runtime::{ChatEvent, ChatHandle, ChatRuntime};
    use crate::state_machine::continuation::TOOL_RESULT_ACK;
    use crate::state_machine::transition::{
        EMPTY_REPLY_FALLBACK, SEARCHING_MARKER, TRANSPORT_APOLOGY,
    };
    use crate::state_machine::{ChatContext, RoundError, RoundOutcome};
    use crate::transcript::{Transcript, Turn, GREETING};
    use tokio::sync::broadcast;

    fn start<C: CompletionClient + 'static>(client: C) -> ChatHandle {
        let (runtime, handle) =
            ChatRuntime::new(ChatContext::default(), Transcript::default(), client, true);
        tokio::spawn(runtime.run());
        handle
    }

    /// Collect events up to and including the idle signal that ends a round
    async fn wait_for_round(
        rx: &mut broadcast::Receiver<ChatEvent>,
    ) -> (RoundOutcome, Vec<ChatEvent>) {
        let mut outcome = None;
        let mut seen = Vec::new();
        loop {
            let event = rx.recv().await.expect("runtime alive");
            if let ChatEvent::RoundFinished { outcome: finished } = &event {
                outcome = Some(finished.clone());
            }
            let idle = matches!(event, ChatEvent::BusyChanged { busy: false });
            seen.push(event);
            if idle {
                return (outcome.expect("round finished before going idle"), seen);
            }
        }
    }

    fn snapshots(events: &[ChatEvent]) -> Vec<Vec<Turn>> {
        events
            .iter()
            .filter_map(|e| match e {
                ChatEvent::TranscriptChanged { turns } => Some(turns.clone()),
                _ => None,
            })
            .collect()
    }

    #[tokio::test]
    async fn test_mock_completion_client() {
        let mock = MockCompletionClient::new();
        mock.queue_response(text_response("Hello"));

        let request = CompletionRequest {
            model: "test-model".to_string(),
            max_tokens: 100,
            messages: vec![],
            tools: vec![],
        };

        let response = mock.complete(&request).await.unwrap();
        assert_eq!(response.text(), "Hello");

        // Second call should fail (no more responses)
        assert!(mock.complete(&request).await.is_err());
        assert_eq!(mock.recorded_requests().len(), 2);
    }

    #[tokio::test]
    async fn test_simple_reply() {
        let llm = Arc::new(MockCompletionClient::new());
        llm.queue_response(text_response("Hello!"));

        let handle = start(Arc::clone(&llm));
        let mut rx = handle.subscribe();

        assert!(handle.submit_user_turn("hi"));
        let (outcome, _) = wait_for_round(&mut rx).await;

        assert!(matches!(outcome, RoundOutcome::Completed { searched: false }));
        assert!(!handle.is_busy());
        assert_eq!(
            handle.transcript(),
            vec![Turn::assistant(GREETING), Turn::user("hi"), Turn::assistant("Hello!")]
        );

        let requests = llm.recorded_requests();
        assert_eq!(requests.len(), 1);
        assert_eq!(requests[0].model, "claude-sonnet-4-20250514");
        assert_eq!(requests[0].max_tokens, 2000);
        assert_eq!(requests[0].tools.len(), 1);
        assert_eq!(requests[0].messages[0].role, MessageRole::Assistant);
    }

    #[tokio::test]
    async fn test_tool_round_trip() {
        let llm = Arc::new(MockCompletionClient::new());
        llm.queue_response(tool_use_response("t1"));
        llm.queue_response(text_response("Here is today's news."));

        let handle = start(Arc::clone(&llm));
        let mut rx = handle.subscribe();

        handle.submit_user_turn("latest news?");
        let (outcome, events) = wait_for_round(&mut rx).await;

        assert!(matches!(outcome, RoundOutcome::Completed { searched: true }));

        // Marker shows up exactly once and is gone at the end
        let snapshots = snapshots(&events);
        let with_marker: Vec<_> = snapshots
            .iter()
            .filter(|turns| turns.iter().any(|t| t.transient))
            .collect();
        assert_eq!(with_marker.len(), 1);
        assert_eq!(
            with_marker[0].last(),
            Some(&Turn::marker(SEARCHING_MARKER))
        );

        let transcript = handle.transcript();
        assert!(transcript.iter().all(|t| !t.transient));
        assert_eq!(transcript.last(), Some(&Turn::assistant("Here is today's news.")));
        assert_eq!(transcript.len(), 3);

        let requests = llm.recorded_requests();
        assert_eq!(requests.len(), 2);
        assert_eq!(requests[1].tools, requests[0].tools);
        assert_eq!(
            requests[1].messages.last().map(|m| &m.content),
            Some(&MessageContent::Blocks(vec![ContentBlock::tool_result("t1", TOOL_RESULT_ACK)]))
        );
    }

    #[tokio::test]
    async fn test_transport_failure() {
        let llm = MockCompletionClient::new();
        llm.queue_error(TransportError::server_error("Server error: 502"));

        let handle = start(llm);
        let mut rx = handle.subscribe();

        handle.submit_user_turn("hi");
        let (outcome, _) = wait_for_round(&mut rx).await;

        assert!(matches!(outcome, RoundOutcome::Recovered(RoundError::Transport(_))));
        assert!(!handle.is_busy());
        let transcript = handle.transcript();
        assert_eq!(transcript.last(), Some(&Turn::assistant(TRANSPORT_APOLOGY)));
        assert!(transcript.iter().all(|t| !t.transient));
    }

    #[tokio::test]
    async fn test_continuation_failure_removes_marker() {
        let llm = MockCompletionClient::new();
        llm.queue_response(tool_use_response("t1"));
        llm.queue_error(TransportError::network("connection reset"));

        let handle = start(llm);
        let mut rx = handle.subscribe();

        handle.submit_user_turn("latest news?");
        wait_for_round(&mut rx).await;

        let transcript = handle.transcript();
        assert_eq!(transcript.len(), 3);
        assert_eq!(transcript.last(), Some(&Turn::assistant(TRANSPORT_APOLOGY)));
    }

    #[tokio::test]
    async fn test_empty_reply_uses_fallback() {
        let llm = MockCompletionClient::new();
        llm.queue_response(CompletionResponse {
            content: vec![],
            stop_reason: StopReason::EndTurn,
            usage: Usage::default(),
        });

        let handle = start(llm);
        let mut rx = handle.subscribe();

        handle.submit_user_turn("hi");
        let (outcome, _) = wait_for_round(&mut rx).await;

        assert!(matches!(
            outcome,
            RoundOutcome::Recovered(RoundError::EmptyCompletion { searched: false })
        ));
        assert_eq!(
            handle.transcript().last(),
            Some(&Turn::assistant(EMPTY_REPLY_FALLBACK))
        );
    }

    #[tokio::test]
    async fn test_input_ignored_while_busy() {
        let llm = Arc::new(GatedMockClient::new());
        llm.queue_response(text_response("first answer"));

        let handle = start(Arc::clone(&llm));
        let mut rx = handle.subscribe();

        assert!(handle.submit_user_turn("first"));
        llm.request_started.notified().await;

        assert!(handle.is_busy());
        assert!(!handle.submit_user_turn("second"));
        assert!(!handle.reset());

        llm.release_one();
        wait_for_round(&mut rx).await;

        assert!(!handle.is_busy());
        assert_eq!(llm.recorded_requests().len(), 1);
        assert_eq!(
            handle.transcript(),
            vec![Turn::assistant(GREETING), Turn::user("first"), Turn::assistant("first answer")]
        );
    }

    #[tokio::test]
    async fn test_busy_signal_brackets_round() {
        let llm = MockCompletionClient::new();
        llm.queue_response(text_response("ok"));

        let handle = start(llm);
        let mut rx = handle.subscribe();

        handle.submit_user_turn("hi");
        let (_, events) = wait_for_round(&mut rx).await;

        let busy: Vec<bool> = events
            .iter()
            .filter_map(|e| match e {
                ChatEvent::BusyChanged { busy } => Some(*busy),
                _ => None,
            })
            .collect();
        assert_eq!(busy, vec![true, false]);
    }

    #[tokio::test]
    async fn test_search_toggle_read_at_round_start() {
        let llm = Arc::new(GatedMockClient::new());
        llm.queue_response(text_response("one"));
        llm.queue_response(text_response("two"));

        let handle = start(Arc::clone(&llm));
        let mut rx = handle.subscribe();

        handle.set_search_enabled(false);
        handle.submit_user_turn("no search please");
        llm.request_started.notified().await;

        // Flipping mid-round does not touch the round in flight
        handle.set_search_enabled(true);
        llm.release_one();
        wait_for_round(&mut rx).await;

        handle.submit_user_turn("search again");
        llm.request_started.notified().await;
        llm.release_one();
        wait_for_round(&mut rx).await;

        let requests = llm.recorded_requests();
        assert!(requests[0].tools.is_empty());
        assert_eq!(requests[1].tools.len(), 1);
        assert_eq!(requests[1].tools[0].kind, "web_search_20250305");
    }

    #[tokio::test]
    async fn test_reset_restores_greeting() {
        let llm = MockCompletionClient::new();
        llm.queue_response(text_response("Hello!"));

        let handle = start(llm);
        let mut rx = handle.subscribe();

        handle.submit_user_turn("hi");
        wait_for_round(&mut rx).await;

        assert!(handle.reset());
        loop {
            if let ChatEvent::TranscriptChanged { turns } = rx.recv().await.unwrap() {
                assert_eq!(turns, vec![Turn::assistant(GREETING)]);
                break;
            }
        }
        assert_eq!(handle.transcript(), vec![Turn::assistant(GREETING)]);
    }

    #[tokio::test]
    async fn test_blank_input_starts_no_round() {
        let llm = Arc::new(MockCompletionClient::new());
        llm.queue_response(text_response("real answer"));

        let handle = start(Arc::clone(&llm));
        let mut rx = handle.subscribe();

        assert!(!handle.submit_user_turn("   "));
        assert!(!handle.submit_user_turn("\n\t"));
        assert!(!handle.is_busy());

        assert!(handle.submit_user_turn("real question"));
        wait_for_round(&mut rx).await;

        assert_eq!(llm.recorded_requests().len(), 1);
        assert_eq!(handle.transcript()[1], Turn::user("real question"));
    }

    #[tokio::test]
    async fn test_back_to_back_submits_start_one_round() {
        let llm = Arc::new(MockCompletionClient::new());
        let handle = start(Arc::clone(&llm));
        let other = handle.clone();
        let mut rx = handle.subscribe();

        for i in 0..20 {
            llm.queue_response(text_response(&format!("answer {i}")));

            // No yield between these: the runtime has not seen the first yet
            assert!(handle.submit_user_turn(format!("first {i}")));
            assert!(!handle.submit_user_turn(format!("second {i}")));
            assert!(!other.submit_user_turn(format!("other {i}")));
            assert!(!other.reset());

            let (outcome, _) = wait_for_round(&mut rx).await;
            assert!(matches!(outcome, RoundOutcome::Completed { searched: false }));
        }

        // A queued input would surface as an extra round here
        for _ in 0..10 {
            tokio::task::yield_now().await;
        }

        assert_eq!(llm.recorded_requests().len(), 20);
        let transcript = handle.transcript();
        assert_eq!(transcript.len(), 1 + 2 * 20);
        assert!(transcript
            .iter()
            .all(|t| !t.text().starts_with("second") && !t.text().starts_with("other")));
    }

    #[tokio::test]
    async fn test_idle_signal_follows_final_transcript() {
        let llm = MockCompletionClient::new();
        llm.queue_response(tool_use_response("t1"));
        llm.queue_response(text_response("done"));

        let handle = start(llm);
        let mut rx = handle.subscribe();

        assert!(handle.submit_user_turn("latest news?"));
        let (_, events) = wait_for_round(&mut rx).await;
        assert!(!handle.is_busy());

        let idle_at = events
            .iter()
            .position(|e| matches!(e, ChatEvent::BusyChanged { busy: false }))
            .unwrap();
        assert_eq!(idle_at, events.len() - 1);

        let last_snapshot = snapshots(&events[..idle_at]).pop().unwrap();
        assert!(last_snapshot.iter().all(|t| !t.transient));
        assert_eq!(last_snapshot.last(), Some(&Turn::assistant("done")));
    }
}
