//! `CareerDesk`: the inbound surface a UI shell talks to.
//!
//! Owns the gateway, the open conversations, and the structured flows. The
//! desk is caller-owned; share it as `Arc<CareerDesk>` across tasks.

use std::collections::HashMap;
use std::sync::Arc;

use nextstep_config::AppConfig;
use nextstep_core::{ConversationId, Error, GenerationConfig, Provider, Result, Tool, Turn};
use tokio::sync::{Mutex, RwLock};
use tracing::{debug, info};

use crate::context::ContextWindow;
use crate::flow::{FlowState, FlowStep, StructuredFlow};
use crate::gateway::ModelGateway;
use crate::planner::{self, StudyLevel};
use crate::resources::{ResourceAnswer, ResourceQuery, ResourceSearch};
use crate::roadmaps::{self, RoadmapLink};
use crate::session::ConversationSession;
use crate::stream_event::EventSink;

pub struct CareerDesk {
    gateway: Arc<ModelGateway>,
    window: ContextWindow,
    chat: GenerationConfig,
    greeting: String,
    recommender: GenerationConfig,
    resource_search: ResourceSearch,
    conversations: RwLock<HashMap<ConversationId, Arc<ConversationSession>>>,
    flows: RwLock<HashMap<ConversationId, Arc<Mutex<StructuredFlow>>>>,
}

impl CareerDesk {
    /// Build a desk around an existing provider.
    pub fn new(provider: Arc<dyn Provider>, config: &AppConfig) -> Result<Self> {
        config.validate().map_err(|e| Error::Config {
            message: e.to_string(),
        })?;

        let chat = GenerationConfig::new(
            &config.chat.system_instruction,
            config.chat.temperature,
            config.chat.top_p,
        )?;
        let recommender = GenerationConfig::new(
            &config.recommender.system_instruction,
            config.recommender.temperature,
            config.recommender.top_p,
        )?;
        let mut search = GenerationConfig::new(
            &config.resources.system_instruction,
            config.resources.temperature,
            config.resources.top_p,
        )?;
        if config.resources.web_search {
            search = search.with_tool(Tool::WebSearch);
        }

        info!(
            provider = provider.name(),
            model = %config.model,
            context_window = config.context_window,
            "Career desk ready"
        );

        Ok(Self {
            gateway: Arc::new(ModelGateway::new(provider, &config.model)),
            window: ContextWindow::new(config.context_window),
            chat,
            greeting: config.chat.greeting.clone(),
            recommender,
            resource_search: ResourceSearch::new(search),
            conversations: RwLock::new(HashMap::new()),
            flows: RwLock::new(HashMap::new()),
        })
    }

    /// Build a desk backed by the Gemini provider described in `config`.
    pub fn from_config(config: &AppConfig) -> Result<Self> {
        let provider = nextstep_providers::build_from_config(config)?;
        Self::new(Arc::new(provider), config)
    }

    pub fn gateway(&self) -> &ModelGateway {
        &self.gateway
    }

    // --- Open chat ---

    async fn conversation(&self, id: &ConversationId) -> Result<Arc<ConversationSession>> {
        if let Some(session) = self.conversations.read().await.get(id) {
            return Ok(session.clone());
        }

        let mut conversations = self.conversations.write().await;
        if let Some(session) = conversations.get(id) {
            return Ok(session.clone());
        }
        let session = Arc::new(ConversationSession::with_greeting(
            id.clone(),
            &self.greeting,
            self.gateway.clone(),
            self.window,
            self.chat.clone(),
        )?);
        conversations.insert(id.clone(), session.clone());
        debug!(conversation = %id, "Opened conversation");
        Ok(session)
    }

    /// Send a student message and stream the counselor's reply.
    ///
    /// Unknown ids open a new conversation seeded with the welcome greeting.
    pub async fn submit_user_text(
        &self,
        id: &ConversationId,
        text: &str,
        observer: Option<&EventSink>,
    ) -> Result<String> {
        if text.trim().is_empty() {
            return Err(Error::InvalidInput("message must not be empty".into()));
        }
        self.conversation(id).await?.submit(text, observer).await
    }

    pub async fn get_history(&self, id: &ConversationId) -> Result<Vec<Turn>> {
        Ok(self.conversation(id).await?.history())
    }

    /// Forget a conversation and any flow under the same id.
    pub async fn end_conversation(&self, id: &ConversationId) -> bool {
        let chat = self.conversations.write().await.remove(id).is_some();
        let flow = self.flows.write().await.remove(id).is_some();
        if chat || flow {
            debug!(conversation = %id, "Ended conversation");
        }
        chat || flow
    }

    pub async fn conversation_count(&self) -> usize {
        self.conversations.read().await.len()
    }

    // --- Structured flow ---

    /// Start (or restart) the career recommender under `id`.
    ///
    /// Returns the opening text: intro plus the first question.
    pub async fn start_structured_flow(&self, id: &ConversationId) -> Result<String> {
        let flow = StructuredFlow::new(id.clone(), self.recommender.clone())?;
        let opening = flow.opening().to_string();
        self.flows
            .write()
            .await
            .insert(id.clone(), Arc::new(Mutex::new(flow)));
        debug!(flow = %id, "Started structured flow");
        Ok(opening)
    }

    pub async fn submit_flow_answer(
        &self,
        id: &ConversationId,
        text: &str,
        observer: Option<&EventSink>,
    ) -> Result<FlowStep> {
        let flow = self.flow(id).await?;
        let mut flow = flow.try_lock().map_err(|_| {
            Error::Busy(format!("flow {id} is already handling an answer"))
        })?;
        flow.submit_answer(&self.gateway, text, observer).await
    }

    pub async fn flow_history(&self, id: &ConversationId) -> Result<Vec<Turn>> {
        let flow = self.flow(id).await?;
        let flow = flow.lock().await;
        Ok(flow.transcript().to_vec())
    }

    pub async fn flow_state(&self, id: &ConversationId) -> Result<FlowState> {
        let flow = self.flow(id).await?;
        let state = flow.lock().await.state();
        Ok(state)
    }

    async fn flow(&self, id: &ConversationId) -> Result<Arc<Mutex<StructuredFlow>>> {
        self.flows
            .read()
            .await
            .get(id)
            .cloned()
            .ok_or_else(|| Error::InvalidInput(format!("no structured flow started for {id}")))
    }

    // --- Resources ---

    /// The offline plan, without touching the network.
    pub fn request_fallback_plan(
        &self,
        query: &str,
        level: StudyLevel,
        weekly_hours: u32,
        include_extra: bool,
    ) -> String {
        planner::plan(query, level, weekly_hours, include_extra)
    }

    pub async fn search_resources(
        &self,
        query: &ResourceQuery,
        observer: Option<&EventSink>,
    ) -> Result<ResourceAnswer> {
        self.resource_search
            .search(&self.gateway, query, observer)
            .await
    }

    pub fn search_roadmaps(&self, query: &str) -> Vec<RoadmapLink> {
        roadmaps::search(query)
    }
}
