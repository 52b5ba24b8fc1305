//! Learning-resource search: a grounded live answer, or the offline plan.

use nextstep_core::{Error, FailureKind, GenerationConfig, Result, Turn};
use serde::Serialize;
use tracing::{info, warn};

use crate::gateway::ModelGateway;
use crate::planner::{self, StudyLevel};
use crate::stream_event::EventSink;

/// Default weekly study hours for a new query.
pub const DEFAULT_WEEKLY_HOURS: u32 = 12;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResourceQuery {
    pub query: String,
    pub level: StudyLevel,
    pub weekly_hours: u32,
    pub free_first: bool,
    pub include_ai_plan: bool,
}

impl ResourceQuery {
    pub fn new(query: impl Into<String>) -> Self {
        Self {
            query: query.into(),
            level: StudyLevel::Beginner,
            weekly_hours: DEFAULT_WEEKLY_HOURS,
            free_first: true,
            include_ai_plan: true,
        }
    }

    pub fn with_level(mut self, level: StudyLevel) -> Self {
        self.level = level;
        self
    }

    pub fn with_weekly_hours(mut self, hours: u32) -> Self {
        self.weekly_hours = hours;
        self
    }

    pub fn with_free_first(mut self, free_first: bool) -> Self {
        self.free_first = free_first;
        self
    }

    pub fn with_ai_plan(mut self, include: bool) -> Self {
        self.include_ai_plan = include;
        self
    }
}

/// The curator prompt sent for a live search.
pub fn build_prompt(query: &ResourceQuery) -> String {
    let free_pref = if query.free_first {
        "Prioritize free resources first; include paid options only if highly valuable."
    } else {
        "Include both free and paid resources, but label clearly."
    };
    let ai_plan = if query.include_ai_plan {
        "Also include an 'AI Learning Plan Generator Output' section with a concise \
         4-week adaptive plan based on the user goal."
    } else {
        ""
    };
    let hours = query.weekly_hours;

    format!(
        "You are an expert learning-resources curator for engineering students in India.
Use web search grounding and provide only high-quality, trustworthy, official links.

User query:
{text}

Constraints:
1. Do not dump random links.
2. Keep output concise and structured.
3. Prefer official sources and reputable platforms.
4. Give practical, filtered recommendations.
5. User level: {level}
6. Weekly study hours available: {hours}
7. {free_pref}

Include these sections exactly:
1) Goal Understanding (2-3 bullets)
2) Best Resource Stack (grouped):
   - Websites/Docs
   - YouTube Channels
   - Courses/Tutorials
   - Recommended Books
   - Practice Platforms
   - Certification Options
   For each item include: Name | Why useful (1 line) | Official Link
3) Basic Roadmap (phase-wise, not paragraph)
4) Weekly Timetable (table format for {hours} hours/week)
5) Quick Start Checklist (first 7 days)
6) Quality Notes (short: why these are trusted)
{ai_plan}

Style:
- Crisp, actionable, no long paragraphs.
- Use headings and bullets/tables.
- Maximum 5 items per subsection unless unavoidable.",
        text = query.query.trim(),
        level = query.level,
    )
}

/// Why the offline plan was shown instead of a live answer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FallbackNotice {
    QuotaExhausted,
    Unavailable,
}

impl FallbackNotice {
    pub fn for_kind(kind: FailureKind) -> Self {
        match kind {
            FailureKind::Quota => Self::QuotaExhausted,
            FailureKind::Transport => Self::Unavailable,
        }
    }

    pub fn message(&self) -> &'static str {
        match self {
            Self::QuotaExhausted => {
                "Gemini quota is exhausted right now, so I generated an offline trusted-plan fallback."
            }
            Self::Unavailable => {
                "Live search is unavailable right now, so I generated an offline trusted-plan fallback."
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", content = "notice", rename_all = "snake_case")]
pub enum AnswerSource {
    Live,
    Fallback(FallbackNotice),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ResourceAnswer {
    pub text: String,
    pub source: AnswerSource,
}

impl ResourceAnswer {
    pub fn is_fallback(&self) -> bool {
        matches!(self.source, AnswerSource::Fallback(_))
    }
}

/// Runs resource queries against the gateway with web-search grounding.
pub struct ResourceSearch {
    config: GenerationConfig,
}

impl ResourceSearch {
    /// `config` should already carry [`Tool::WebSearch`](nextstep_core::Tool)
    /// when grounding is wanted.
    pub fn new(config: GenerationConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &GenerationConfig {
        &self.config
    }

    /// Search once. Provider failures never surface as errors: they select
    /// the offline plan and the matching notice.
    pub async fn search(
        &self,
        gateway: &ModelGateway,
        query: &ResourceQuery,
        observer: Option<&EventSink>,
    ) -> Result<ResourceAnswer> {
        if query.query.trim().is_empty() {
            return Err(Error::InvalidInput(
                "please enter your learning goal or query".into(),
            ));
        }

        let prompt = Turn::user(build_prompt(query))?;
        let kind = match gateway.generate(vec![prompt], &self.config, observer).await {
            Ok(completion) if !completion.text.trim().is_empty() => {
                info!(level = %query.level, hours = query.weekly_hours, "Live resource search succeeded");
                return Ok(ResourceAnswer {
                    text: completion.text.trim().to_string(),
                    source: AnswerSource::Live,
                });
            }
            Ok(_) => FailureKind::Transport,
            Err(e) => {
                warn!(error = %e, "Live resource search failed, using offline plan");
                e.kind()
            }
        };

        Ok(ResourceAnswer {
            text: planner::plan(
                query.query.trim(),
                query.level,
                query.weekly_hours,
                query.include_ai_plan,
            ),
            source: AnswerSource::Fallback(FallbackNotice::for_kind(kind)),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_helpers::{Reply, ScriptedProvider};
    use nextstep_core::{ProviderError, Tool};
    use std::sync::Arc;

    fn search_with(replies: Vec<Reply>) -> (Arc<ScriptedProvider>, ModelGateway, ResourceSearch) {
        let provider = Arc::new(ScriptedProvider::new(replies));
        let gateway = ModelGateway::new(provider.clone(), "test-model");
        let config = GenerationConfig::new("", 0.35, 0.95)
            .unwrap()
            .with_tool(Tool::WebSearch);
        (provider, gateway, ResourceSearch::new(config))
    }

    #[test]
    fn prompt_reflects_preferences() {
        let query = ResourceQuery::new("  backend in 3 months ")
            .with_level(StudyLevel::Intermediate)
            .with_weekly_hours(9)
            .with_free_first(false)
            .with_ai_plan(false);
        let prompt = build_prompt(&query);

        assert!(prompt.starts_with("You are an expert learning-resources curator"));
        assert!(prompt.contains("User query:\nbackend in 3 months\n"));
        assert!(prompt.contains("5. User level: Intermediate"));
        assert!(prompt.contains("6. Weekly study hours available: 9"));
        assert!(prompt.contains("table format for 9 hours/week"));
        assert!(prompt.contains("7. Include both free and paid resources, but label clearly."));
        assert!(!prompt.contains("AI Learning Plan Generator Output"));
    }

    #[test]
    fn prompt_defaults_to_free_first_with_ai_plan() {
        let prompt = build_prompt(&ResourceQuery::new("GATE CSE"));
        assert!(prompt.contains("5. User level: Beginner"));
        assert!(prompt.contains("Weekly study hours available: 12"));
        assert!(prompt.contains("Prioritize free resources first"));
        assert!(prompt.contains(
            "'AI Learning Plan Generator Output' section with a concise 4-week adaptive plan"
        ));
    }

    #[tokio::test]
    async fn live_answer_uses_grounding() {
        let (provider, gateway, search) =
            search_with(vec![Reply::fragments(&["### Goal", " Understanding\n"])]);

        let answer = search
            .search(&gateway, &ResourceQuery::new("data analyst"), None)
            .await
            .unwrap();
        assert_eq!(answer.source, AnswerSource::Live);
        assert_eq!(answer.text, "### Goal Understanding");

        let request = provider.last_request().unwrap();
        assert_eq!(request.tools, vec![Tool::WebSearch]);
        assert_eq!(request.temperature, 0.35);
        assert_eq!(request.turns.len(), 1);
    }

    #[tokio::test]
    async fn quota_failure_falls_back_with_quota_notice() {
        let (_, gateway, search) = search_with(vec![Reply::Fail(ProviderError::QuotaExhausted(
            "RESOURCE_EXHAUSTED".into(),
        ))]);
        let query = ResourceQuery::new("I need AI/ML resources");

        let answer = search.search(&gateway, &query, None).await.unwrap();
        assert_eq!(
            answer.source,
            AnswerSource::Fallback(FallbackNotice::QuotaExhausted)
        );
        assert_eq!(
            answer.text,
            planner::plan("I need AI/ML resources", StudyLevel::Beginner, 12, true)
        );
    }

    #[tokio::test]
    async fn transport_failure_falls_back_with_unavailable_notice() {
        let (_, gateway, search) = search_with(vec![Reply::FailMidStream(
            vec!["### Go".into()],
            ProviderError::Timeout("120s".into()),
        )]);

        let answer = search
            .search(&gateway, &ResourceQuery::new("I need AI/ML resources"), None)
            .await
            .unwrap();
        assert_eq!(
            answer.source,
            AnswerSource::Fallback(FallbackNotice::Unavailable)
        );
        // Same content whichever way the live path failed.
        assert_eq!(
            answer.text,
            planner::plan("I need AI/ML resources", StudyLevel::Beginner, 12, true)
        );
    }

    #[tokio::test]
    async fn empty_live_answer_falls_back() {
        let (_, gateway, search) = search_with(vec![Reply::text("   ")]);
        let answer = search
            .search(&gateway, &ResourceQuery::new("django"), None)
            .await
            .unwrap();
        assert!(answer.is_fallback());
        assert!(answer.text.contains("Backend Development"));
    }

    #[tokio::test]
    async fn blank_query_is_rejected_before_any_call() {
        let (provider, gateway, search) = search_with(vec![]);
        let err = search
            .search(&gateway, &ResourceQuery::new("  "), None)
            .await
            .unwrap_err();
        assert!(matches!(err, Error::InvalidInput(_)));
        assert_eq!(provider.call_count(), 0);
    }

    #[test]
    fn notice_messages() {
        assert!(FallbackNotice::QuotaExhausted.message().starts_with("Gemini quota is exhausted"));
        assert!(FallbackNotice::Unavailable.message().starts_with("Live search is unavailable"));
        assert_eq!(
            FallbackNotice::for_kind(FailureKind::Quota),
            FallbackNotice::QuotaExhausted
        );
    }
}
