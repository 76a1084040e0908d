//! End-to-end orchestration of one relay exchange.
//!
//! Drives the exchange as a small state machine: validate, assemble the
//! payload, open the network call, demultiplex the stream, and re-publish
//! events to the caller's sinks. Whatever path the exchange takes, the
//! hidden terminal "Done" status is emitted exactly once, last.

use std::time::Duration;

use futures::StreamExt;
use tokio::sync::mpsc;

use inlet_config::RelayConfig;
use inlet_core::{
    ErrorPayload, Message, Notification, NotificationSink, RelayError, RelayOutcome, StreamEvent,
};

use crate::client::{ChatPayload, ChunkStream, ExchangeTransport, RelayClient};
use crate::context::{ContextAssembler, DocumentRef, SourceMarker};
use crate::demux::{Demultiplexer, Utf8Carry};

/// Where one exchange currently is, for diagnostics.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ExchangeState {
    Validating,
    Assembling,
    Requesting,
    Streaming,
}

/// Everything one exchange needs from the caller.
#[derive(Debug, Clone, Default)]
pub struct ExchangeRequest {
    /// Caller identity; must resolve to an email-like identifier.
    pub user: Option<String>,

    /// The conversation so far, in chronological order.
    pub messages: Vec<Message>,

    /// Uploaded documents available to this exchange.
    pub documents: Vec<DocumentRef>,

    /// Pre-fetched web search results to inject as context.
    pub web_results: Vec<String>,

    /// Source-context markers, most recent last.
    pub source_order: Vec<SourceMarker>,

    /// Whether the remote endpoint should run its own web search.
    pub web_search_activated: bool,

    /// Set for background tasks (title/tag generation); such exchanges are
    /// non-streamed and never surface errors.
    pub task: Option<String>,
}

impl ExchangeRequest {
    pub fn is_task(&self) -> bool {
        self.task.is_some()
    }
}

/// Drives relay exchanges against one configured endpoint.
pub struct RelayOrchestrator {
    transport: Box<dyn ExchangeTransport>,
    assembler: ContextAssembler,
    language: String,
    smoothing_delay: Duration,
}

impl RelayOrchestrator {
    pub fn new(config: &RelayConfig) -> Result<Self, RelayError> {
        Ok(Self::with_transport(
            Box::new(RelayClient::new(config)?),
            config,
        ))
    }

    /// Build against any transport (the seam tests use).
    pub fn with_transport(transport: Box<dyn ExchangeTransport>, config: &RelayConfig) -> Self {
        Self {
            transport,
            assembler: ContextAssembler::new(config.max_context_tokens),
            language: config.language.clone(),
            smoothing_delay: Duration::from_millis(config.smoothing_delay_ms),
        }
    }

    /// Run one exchange.
    ///
    /// Content fragments go to `content` in arrival order; status, citation,
    /// and error events go to `sink`. The first notification is a visible
    /// "Processing..." status and the last is always the hidden "Done".
    pub async fn run(
        &self,
        request: &ExchangeRequest,
        sink: &dyn NotificationSink,
        content: mpsc::Sender<String>,
    ) -> RelayOutcome {
        sink.emit(Notification::status("Processing...")).await;

        let outcome = match self.drive(request, sink, content).await {
            Ok(outcome) => outcome,
            Err(err) => {
                if request.is_task() {
                    // Background tasks never surface an error bubble.
                    tracing::warn!(error = %err, "Task exchange failed, returning empty result");
                    RelayOutcome::Task(String::new())
                } else {
                    tracing::error!(error = %err, "Exchange failed");
                    let payload = ErrorPayload::from(&err);
                    sink.emit(Notification::message(payload.content.clone()))
                        .await;
                    RelayOutcome::Error(payload)
                }
            }
        };

        sink.emit(Notification::done()).await;
        outcome
    }

    async fn drive(
        &self,
        request: &ExchangeRequest,
        sink: &dyn NotificationSink,
        content: mpsc::Sender<String>,
    ) -> Result<RelayOutcome, RelayError> {
        tracing::debug!(state = ?ExchangeState::Validating);
        let user = self.validate(request)?;

        tracing::debug!(state = ?ExchangeState::Assembling);
        let messages = self.assembler.assemble(
            &request.messages,
            &request.documents,
            &request.web_results,
            &request.source_order,
        );
        let payload = ChatPayload::new(user, &messages, request.web_search_activated);

        tracing::debug!(state = ?ExchangeState::Requesting, task = request.is_task());
        if request.is_task() {
            let text = self.transport.post_task(&payload).await?;
            return Ok(RelayOutcome::Task(text));
        }

        let body = self.transport.open_stream(&payload).await?;

        tracing::debug!(state = ?ExchangeState::Streaming);
        self.stream(body, sink, content).await
    }

    fn validate(&self, request: &ExchangeRequest) -> Result<String, RelayError> {
        if request.messages.is_empty() {
            return Err(RelayError::Validation(self.localized(
                "No messages provided.",
                "Aucun message fourni.",
            )));
        }
        match &request.user {
            Some(user) if user.contains('@') => Ok(user.clone()),
            _ => Err(RelayError::Validation(self.localized(
                "Could not detect user email.",
                "Impossible de détecter l'e-mail de l'utilisateur.",
            ))),
        }
    }

    async fn stream(
        &self,
        mut body: ChunkStream,
        sink: &dyn NotificationSink,
        content: mpsc::Sender<String>,
    ) -> Result<RelayOutcome, RelayError> {
        let mut demux = Demultiplexer::new();
        let mut carry = Utf8Carry::new();
        let mut chunks = 0usize;

        let mut ended = false;
        'stream: while !ended {
            let events = match body.next().await {
                Some(Ok(bytes)) => demux.feed(&carry.push(&bytes)),
                Some(Err(e)) => vec![StreamEvent::StreamError(e.to_string())],
                // End of stream; a truncated character left in the carry
                // has no continuation coming.
                None => {
                    ended = true;
                    demux.feed(&carry.finish())
                }
            };

            for event in events {
                match event {
                    StreamEvent::Content(text) => {
                        if content.send(text).await.is_err() {
                            // Receiver dropped: the caller went away. Stop
                            // cleanly, the Done status still fires.
                            tracing::debug!("Content receiver closed, ending stream");
                            break 'stream;
                        }
                        chunks += 1;
                        if !self.smoothing_delay.is_zero() {
                            tokio::time::sleep(self.smoothing_delay).await;
                        }
                    }
                    StreamEvent::Status(data) => {
                        sink.emit(Notification::Status(data)).await;
                    }
                    StreamEvent::Citation(data) => {
                        sink.emit(Notification::Citation(data)).await;
                    }
                    StreamEvent::StreamError(cause) => {
                        return Err(RelayError::StreamInterrupted(cause));
                    }
                }
            }
        }

        tracing::debug!(chunks, "Stream complete");
        Ok(RelayOutcome::Streamed { chunks })
    }

    fn localized(&self, en: &str, fr: &str) -> String {
        if self.language == "fr" {
            fr.to_owned()
        } else {
            en.to_owned()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use inlet_core::{ChannelSink, StatusData};

    /// A transport that replays a fixed list of frames.
    struct ScriptedTransport {
        frames: Vec<Result<Vec<u8>, RelayError>>,
        task_reply: String,
    }

    impl ScriptedTransport {
        fn new(frames: Vec<Result<Vec<u8>, RelayError>>) -> Box<Self> {
            Box::new(Self {
                frames,
                task_reply: String::new(),
            })
        }

        fn frames_of(chunks: &[&str]) -> Box<Self> {
            Self::new(chunks.iter().map(|c| Ok(c.as_bytes().to_vec())).collect())
        }
    }

    #[async_trait]
    impl ExchangeTransport for ScriptedTransport {
        async fn post_task(&self, _payload: &ChatPayload) -> Result<String, RelayError> {
            Ok(self.task_reply.clone())
        }

        async fn open_stream(&self, _payload: &ChatPayload) -> Result<ChunkStream, RelayError> {
            Ok(Box::pin(futures::stream::iter(self.frames.clone())))
        }
    }

    fn test_config(language: &str) -> RelayConfig {
        RelayConfig {
            language: language.into(),
            smoothing_delay_ms: 0,
            ..RelayConfig::default()
        }
    }

    fn orchestrator(language: &str) -> RelayOrchestrator {
        RelayOrchestrator::new(&test_config(language)).unwrap()
    }

    fn scripted(transport: Box<ScriptedTransport>) -> RelayOrchestrator {
        RelayOrchestrator::with_transport(transport, &test_config("en"))
    }

    fn valid_request() -> ExchangeRequest {
        ExchangeRequest {
            user: Some("user@example.com".into()),
            messages: vec![Message::user("hello")],
            ..ExchangeRequest::default()
        }
    }

    fn collect_statuses(notifications: &[Notification]) -> Vec<&StatusData> {
        notifications
            .iter()
            .filter_map(|n| match n {
                Notification::Status(s) => Some(s),
                _ => None,
            })
            .collect()
    }

    async fn run_and_collect(
        orch: &RelayOrchestrator,
        request: &ExchangeRequest,
    ) -> (RelayOutcome, Vec<Notification>) {
        let (notif_tx, mut notif_rx) = mpsc::channel(64);
        let (content_tx, _content_rx) = mpsc::channel(64);
        let sink = ChannelSink::new(notif_tx);
        let outcome = orch.run(request, &sink, content_tx).await;
        drop(sink);
        let mut notifications = Vec::new();
        while let Some(n) = notif_rx.recv().await {
            notifications.push(n);
        }
        (outcome, notifications)
    }

    async fn run_and_collect_content(
        orch: &RelayOrchestrator,
        request: &ExchangeRequest,
    ) -> (RelayOutcome, Vec<Notification>, Vec<String>) {
        let (notif_tx, mut notif_rx) = mpsc::channel(64);
        let (content_tx, mut content_rx) = mpsc::channel(64);
        let sink = ChannelSink::new(notif_tx);
        let outcome = orch.run(request, &sink, content_tx).await;
        drop(sink);
        let mut notifications = Vec::new();
        while let Some(n) = notif_rx.recv().await {
            notifications.push(n);
        }
        let mut contents = Vec::new();
        while let Some(c) = content_rx.recv().await {
            contents.push(c);
        }
        (outcome, notifications, contents)
    }

    #[tokio::test]
    async fn successful_stream_forwards_content_in_order() {
        let orch = scripted(ScriptedTransport::frames_of(&[
            r#"{"type":"status","description":"Searching"}"#,
            "Hello",
            " world",
        ]));
        let (outcome, notifications, contents) =
            run_and_collect_content(&orch, &valid_request()).await;

        assert_eq!(outcome, RelayOutcome::Streamed { chunks: 2 });
        assert_eq!(contents, vec!["Hello", " world"]);

        // Status order: Processing..., the relayed control status, the
        // hidden Answering, then Done.
        let statuses = collect_statuses(&notifications);
        let descriptions: Vec<&str> =
            statuses.iter().map(|s| s.description.as_str()).collect();
        assert_eq!(
            descriptions,
            vec!["Processing...", "Searching", "Answering", "Done"]
        );
        assert!(statuses[2].hidden);
    }

    #[tokio::test]
    async fn successful_stream_emits_done_exactly_once_and_last() {
        let orch = scripted(ScriptedTransport::frames_of(&["answer text"]));
        let (outcome, notifications, _) =
            run_and_collect_content(&orch, &valid_request()).await;

        assert!(!outcome.is_error());
        let done_count = notifications
            .iter()
            .filter(|n| matches!(n, Notification::Status(s) if s.description == "Done"))
            .count();
        assert_eq!(done_count, 1);
        assert!(matches!(
            notifications.last().unwrap(),
            Notification::Status(s) if s.description == "Done" && s.done && s.hidden
        ));
    }

    #[tokio::test]
    async fn relayed_citation_passes_through_unmodified() {
        let orch = scripted(ScriptedTransport::frames_of(&[
            r#"{"type":"citation","document":["excerpt"],"metadata":[{"source":"https://e.com"}]}"#,
            "text",
        ]));
        let (_, notifications, _) = run_and_collect_content(&orch, &valid_request()).await;

        assert!(notifications.iter().any(|n| matches!(
            n,
            Notification::Citation(c) if c.document == ["excerpt"]
        )));
    }

    #[tokio::test]
    async fn multibyte_character_split_across_frames_stays_intact() {
        let orch = scripted(ScriptedTransport::new(vec![
            Ok(b"caf".to_vec()),
            Ok(vec![0xC3]),
            Ok(vec![0xA9]),
        ]));
        let (outcome, _, contents) = run_and_collect_content(&orch, &valid_request()).await;

        assert!(!outcome.is_error());
        assert_eq!(contents.join(""), "café");
        assert!(!contents.join("").contains('\u{FFFD}'));
    }

    #[tokio::test]
    async fn mid_stream_error_yields_transport_payload_with_done_last() {
        let orch = scripted(ScriptedTransport::new(vec![
            Ok(b"partial".to_vec()),
            Err(RelayError::Network("connection reset".into())),
        ]));
        let (outcome, notifications, contents) =
            run_and_collect_content(&orch, &valid_request()).await;

        match outcome {
            RelayOutcome::Error(payload) => {
                assert!(payload.content.starts_with("TransportError: "));
                assert!(payload.content.contains("connection reset"));
            }
            other => panic!("Expected error outcome, got {other:?}"),
        }
        // Content delivered before the fault is not clawed back.
        assert_eq!(contents, vec!["partial"]);
        assert!(matches!(
            notifications.last().unwrap(),
            Notification::Status(s) if s.description == "Done"
        ));
    }

    #[tokio::test]
    async fn task_mode_returns_transport_reply() {
        let mut transport = ScriptedTransport::new(vec![]);
        transport.task_reply = "Generated title".into();
        let orch = scripted(transport);
        let request = ExchangeRequest {
            task: Some("title_generation".into()),
            ..valid_request()
        };
        let (outcome, _, _) = run_and_collect_content(&orch, &request).await;
        assert_eq!(outcome, RelayOutcome::Task("Generated title".into()));
    }

    #[tokio::test]
    async fn empty_conversation_fails_validation_with_done_last() {
        let orch = orchestrator("en");
        let request = ExchangeRequest {
            user: Some("user@example.com".into()),
            ..ExchangeRequest::default()
        };
        let (outcome, notifications) = run_and_collect(&orch, &request).await;

        match outcome {
            RelayOutcome::Error(payload) => {
                assert_eq!(payload.content, "ValidationError: No messages provided.");
                assert!(payload.citations.is_empty());
            }
            other => panic!("Expected error outcome, got {other:?}"),
        }

        let statuses = collect_statuses(&notifications);
        assert_eq!(statuses.first().unwrap().description, "Processing...");
        let last = statuses.last().unwrap();
        assert_eq!(last.description, "Done");
        assert!(last.done);
        assert!(last.hidden);
        // Done is the final notification of the whole exchange.
        assert!(matches!(
            notifications.last().unwrap(),
            Notification::Status(s) if s.description == "Done"
        ));
    }

    #[tokio::test]
    async fn missing_email_fails_validation_localized() {
        let orch = orchestrator("fr");
        let request = ExchangeRequest {
            user: Some("not-an-email".into()),
            messages: vec![Message::user("bonjour")],
            ..ExchangeRequest::default()
        };
        let (outcome, _) = run_and_collect(&orch, &request).await;
        match outcome {
            RelayOutcome::Error(payload) => {
                assert!(payload.content.contains("Impossible de détecter"));
            }
            other => panic!("Expected error outcome, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn validation_error_published_as_message_notification() {
        let orch = orchestrator("en");
        let request = ExchangeRequest::default();
        let (_, notifications) = run_and_collect(&orch, &request).await;
        assert!(notifications.iter().any(|n| matches!(
            n,
            Notification::Message(m) if m.content.starts_with("ValidationError: ")
        )));
    }

    #[tokio::test]
    async fn task_mode_swallows_validation_error() {
        let orch = orchestrator("en");
        let request = ExchangeRequest {
            task: Some("title_generation".into()),
            ..ExchangeRequest::default()
        };
        let (outcome, notifications) = run_and_collect(&orch, &request).await;
        assert_eq!(outcome, RelayOutcome::Task(String::new()));
        // No error bubble, but Done still fires.
        assert!(!notifications
            .iter()
            .any(|n| matches!(n, Notification::Message(_))));
        assert!(matches!(
            notifications.last().unwrap(),
            Notification::Status(s) if s.description == "Done"
        ));
    }

    #[tokio::test]
    async fn done_emitted_exactly_once() {
        let orch = orchestrator("en");
        let request = ExchangeRequest::default();
        let (_, notifications) = run_and_collect(&orch, &request).await;
        let done_count = notifications
            .iter()
            .filter(|n| matches!(n, Notification::Status(s) if s.description == "Done"))
            .count();
        assert_eq!(done_count, 1);
    }
}
