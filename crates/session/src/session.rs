//! Conversation session: an append-only turn log plus the respond step.
//!
//! A session owns its [`Conversation`]. The log lock is short and never held
//! across an await; a separate async gate admits one response at a time, and
//! a second caller is turned away with [`Error::Busy`] rather than queued.

use std::sync::{Arc, Mutex, MutexGuard};

use nextstep_core::{
    Conversation, ConversationId, Error, GenerationConfig, ProviderError, Result, Role, Turn,
};
use tracing::{debug, info, warn};

use crate::context::ContextWindow;
use crate::gateway::ModelGateway;
use crate::stream_event::{EventSink, StreamEvent, emit};

pub struct ConversationSession {
    id: ConversationId,
    conversation: Mutex<Conversation>,
    respond_gate: tokio::sync::Mutex<()>,
    gateway: Arc<ModelGateway>,
    window: ContextWindow,
    config: GenerationConfig,
}

impl ConversationSession {
    /// Create a session with an empty log.
    pub fn new(
        id: ConversationId,
        gateway: Arc<ModelGateway>,
        window: ContextWindow,
        config: GenerationConfig,
    ) -> Self {
        Self {
            conversation: Mutex::new(Conversation::new(id.clone())),
            id,
            respond_gate: tokio::sync::Mutex::new(()),
            gateway,
            window,
            config,
        }
    }

    /// Create a session whose log opens with an assistant greeting.
    pub fn with_greeting(
        id: ConversationId,
        greeting: &str,
        gateway: Arc<ModelGateway>,
        window: ContextWindow,
        config: GenerationConfig,
    ) -> Result<Self> {
        let session = Self::new(id, gateway, window, config);
        session.log().push(Turn::assistant(greeting)?);
        Ok(session)
    }

    pub fn id(&self) -> &ConversationId {
        &self.id
    }

    /// Snapshot of the turns so far.
    pub fn history(&self) -> Vec<Turn> {
        self.log().turns().to_vec()
    }

    pub fn len(&self) -> usize {
        self.log().len()
    }

    pub fn is_empty(&self) -> bool {
        self.log().is_empty()
    }

    /// Append a user turn. Rejected while a response is in flight.
    pub fn append_user(&self, text: &str) -> Result<()> {
        let _gate = self.try_gate()?;
        self.push_user(text)
    }

    /// Generate a reply to the pending user turn and append it.
    ///
    /// `system_instruction` replaces the session's configured instruction for
    /// this call only. Nothing is appended unless the whole stream completes
    /// with non-empty text; dropping the returned future appends nothing.
    pub async fn respond(
        &self,
        system_instruction: Option<&str>,
        observer: Option<&EventSink>,
    ) -> Result<String> {
        let _gate = self.try_gate()?;
        self.respond_locked(system_instruction, observer).await
    }

    /// Append `text` as a user turn and respond to it, under one busy guard.
    pub async fn submit(&self, text: &str, observer: Option<&EventSink>) -> Result<String> {
        let _gate = self.try_gate()?;
        self.push_user(text)?;
        self.respond_locked(None, observer).await
    }

    fn log(&self) -> MutexGuard<'_, Conversation> {
        self.conversation.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn try_gate(&self) -> Result<tokio::sync::MutexGuard<'_, ()>> {
        self.respond_gate.try_lock().map_err(|_| {
            debug!(conversation = %self.id, "Rejecting call while a response is in flight");
            Error::Busy(format!("conversation {} is generating a response", self.id))
        })
    }

    fn push_user(&self, text: &str) -> Result<()> {
        let turn = Turn::user(text)
            .map_err(|_| Error::InvalidInput("message must not be empty".into()))?;
        self.log().push(turn);
        Ok(())
    }

    async fn respond_locked(
        &self,
        system_instruction: Option<&str>,
        observer: Option<&EventSink>,
    ) -> Result<String> {
        let turns = {
            let log = self.log();
            let (pending, prior) = match log.turns().split_last() {
                Some((last, prior)) if last.role() == Role::User => (last.text(), prior),
                _ => {
                    return Err(Error::InvalidInput(
                        "no pending user message to respond to".into(),
                    ));
                }
            };
            self.window.build(prior, pending)?
        };

        let config = match system_instruction.filter(|i| !i.trim().is_empty()) {
            Some(instruction) => self.config.clone().with_system_instruction(instruction),
            None => self.config.clone(),
        };

        debug!(
            conversation = %self.id,
            context_turns = turns.len(),
            "Generating response"
        );

        let completion = match self.gateway.generate(turns, &config, observer).await {
            Ok(c) if !c.text.trim().is_empty() => c,
            Ok(_) => return Err(self.fail(ProviderError::EmptyResponse, observer)),
            Err(e) => return Err(self.fail(e, observer)),
        };

        let turn = Turn::assistant(&completion.text)?;
        let text = turn.text().to_string();
        let (total, tokens) = {
            let mut log = self.log();
            log.push(turn);
            (log.len(), log.estimated_tokens())
        };

        info!(
            conversation = %self.id,
            turns = total,
            estimated_tokens = tokens,
            "Response committed"
        );
        emit(
            observer,
            StreamEvent::Done {
                conversation_id: self.id.to_string(),
                usage: completion.usage,
            },
        );
        Ok(text)
    }

    fn fail(&self, error: ProviderError, observer: Option<&EventSink>) -> Error {
        warn!(conversation = %self.id, error = %error, kind = ?error.kind(), "Response failed");
        emit(
            observer,
            StreamEvent::Error {
                message: error.to_string(),
                kind: error.kind(),
            },
        );
        Error::Provider(error)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_helpers::{GatedProvider, HangingProvider, Reply, ScriptedProvider};
    use nextstep_core::FailureKind;
    use std::time::Duration;

    fn session_with(provider: Arc<dyn nextstep_core::Provider>) -> ConversationSession {
        let gateway = Arc::new(ModelGateway::new(provider, "test-model"));
        ConversationSession::with_greeting(
            ConversationId::from("c1"),
            "Welcome!",
            gateway,
            ContextWindow::default(),
            GenerationConfig::new("counselor", 0.9, 0.95).unwrap(),
        )
        .unwrap()
    }

    #[tokio::test]
    async fn submit_appends_user_and_assistant_turns() {
        let provider = Arc::new(ScriptedProvider::new(vec![Reply::fragments(&[
            "Try ", "backend ", "development.  ",
        ])]));
        let session = session_with(provider.clone());

        let reply = session.submit("  what should I learn? ", None).await.unwrap();
        assert_eq!(reply, "Try backend development.");

        let history = session.history();
        assert_eq!(history.len(), 3);
        assert_eq!(history[1].role(), Role::User);
        assert_eq!(history[1].text(), "what should I learn?");
        assert_eq!(history[2].role(), Role::Assistant);
        assert_eq!(history[2].text(), "Try backend development.");

        let request = provider.last_request().unwrap();
        assert_eq!(request.system_instruction, "counselor");
        assert_eq!(request.turns.last().unwrap().text(), "what should I learn?");
    }

    #[tokio::test]
    async fn blank_submit_is_rejected_without_calling_provider() {
        let provider = Arc::new(ScriptedProvider::new(vec![]));
        let session = session_with(provider.clone());

        let err = session.submit("   \n", None).await.unwrap_err();
        assert!(matches!(err, Error::InvalidInput(_)));
        assert_eq!(session.len(), 1);
        assert_eq!(provider.call_count(), 0);
    }

    #[tokio::test]
    async fn respond_requires_pending_user_turn() {
        let provider = Arc::new(ScriptedProvider::new(vec![]));
        let session = session_with(provider.clone());

        let err = session.respond(None, None).await.unwrap_err();
        assert!(matches!(err, Error::InvalidInput(_)));
        assert_eq!(provider.call_count(), 0);
    }

    #[tokio::test]
    async fn failed_stream_appends_nothing() {
        let provider = Arc::new(ScriptedProvider::new(vec![Reply::FailMidStream(
            vec!["Half an ans".into()],
            ProviderError::Network("connection reset".into()),
        )]));
        let session = session_with(provider);
        let (tx, mut rx) = tokio::sync::mpsc::unbounded_channel();

        let err = session.submit("hello", Some(&tx)).await.unwrap_err();
        assert_eq!(err.failure_kind(), Some(FailureKind::Transport));

        let history = session.history();
        assert_eq!(history.len(), 2);
        assert_eq!(history.last().unwrap().role(), Role::User);

        let mut saw_error = false;
        while let Ok(event) = rx.try_recv() {
            assert!(!matches!(event, StreamEvent::Done { .. }));
            if let StreamEvent::Error { kind, .. } = event {
                assert_eq!(kind, FailureKind::Transport);
                saw_error = true;
            }
        }
        assert!(saw_error);
    }

    #[tokio::test]
    async fn pending_turn_can_be_retried_with_respond() {
        let provider = Arc::new(ScriptedProvider::new(vec![
            Reply::Fail(ProviderError::QuotaExhausted("RESOURCE_EXHAUSTED".into())),
            Reply::text("second time lucky"),
        ]));
        let session = session_with(provider.clone());

        let err = session.submit("hello", None).await.unwrap_err();
        assert_eq!(err.failure_kind(), Some(FailureKind::Quota));

        let reply = session.respond(None, None).await.unwrap();
        assert_eq!(reply, "second time lucky");
        assert_eq!(session.len(), 3);

        // The retried request carries the pending turn once, not twice.
        let request = provider.last_request().unwrap();
        let users = request
            .turns
            .iter()
            .filter(|t| t.role() == Role::User)
            .count();
        assert_eq!(users, 1);
    }

    #[tokio::test]
    async fn empty_reply_is_a_transport_failure() {
        let provider = Arc::new(ScriptedProvider::new(vec![Reply::fragments(&["  ", "\n"])]));
        let session = session_with(provider);

        let err = session.submit("hello", None).await.unwrap_err();
        assert!(matches!(
            err,
            Error::Provider(ProviderError::EmptyResponse)
        ));
        assert_eq!(session.len(), 2);
    }

    #[tokio::test]
    async fn override_replaces_system_instruction_for_one_call() {
        let provider = Arc::new(ScriptedProvider::new(vec![
            Reply::text("one"),
            Reply::text("two"),
        ]));
        let session = session_with(provider.clone());

        session.append_user("first").unwrap();
        session.respond(Some("recommender"), None).await.unwrap();
        session.submit("second", None).await.unwrap();

        let requests = provider.requests();
        assert_eq!(requests[0].system_instruction, "recommender");
        assert_eq!(requests[1].system_instruction, "counselor");
    }

    #[tokio::test]
    async fn blank_override_keeps_default_instruction() {
        let provider = Arc::new(ScriptedProvider::new(vec![Reply::text("one")]));
        let session = session_with(provider.clone());

        session.append_user("first").unwrap();
        session.respond(Some("   "), None).await.unwrap();

        assert_eq!(provider.last_request().unwrap().system_instruction, "counselor");
    }

    #[tokio::test]
    async fn observer_sees_fragments_then_done() {
        let provider = Arc::new(ScriptedProvider::new(vec![Reply::fragments(&["a", "b"])]));
        let session = session_with(provider);
        let (tx, mut rx) = tokio::sync::mpsc::unbounded_channel();

        session.submit("go", Some(&tx)).await.unwrap();

        let mut names = Vec::new();
        while let Ok(event) = rx.try_recv() {
            names.push(event.event_type());
        }
        assert_eq!(names, vec!["fragment", "fragment", "done"]);
    }

    #[tokio::test]
    async fn concurrent_calls_are_rejected_while_busy() {
        let provider = Arc::new(GatedProvider::new("done"));
        let session = Arc::new(session_with(provider.clone()));

        let first = {
            let session = session.clone();
            tokio::spawn(async move { session.submit("first", None).await })
        };
        provider.entered.notified().await;

        let err = session.submit("second", None).await.unwrap_err();
        assert!(matches!(err, Error::Busy(_)));
        let err = session.append_user("third").unwrap_err();
        assert!(matches!(err, Error::Busy(_)));

        provider.release.notify_one();
        assert_eq!(first.await.unwrap().unwrap(), "done");
        assert_eq!(provider.call_count(), 1);
        assert_eq!(session.len(), 3);
    }

    #[tokio::test]
    async fn abandoned_response_appends_nothing() {
        let provider = Arc::new(HangingProvider::new());
        let session = session_with(provider.clone());

        let result =
            tokio::time::timeout(Duration::from_millis(50), session.submit("hello", None)).await;
        assert!(result.is_err());

        assert!(provider.closed());
        let history = session.history();
        assert_eq!(history.len(), 2);
        assert_eq!(history.last().unwrap().role(), Role::User);

        // The gate was released with the dropped future.
        assert!(session.append_user("again").is_ok());
    }
}
