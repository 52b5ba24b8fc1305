//! Structured career-recommender flow.
//!
//! Five fixed questions are asked one at a time; once all are answered a
//! single composite prompt is sent to the model and the flow is finished.
//!
//! ```text
//! Collecting(0) → … → Collecting(4) → Synthesizing → Done
//! ```

use nextstep_config::prompts::RECOMMENDER_INTRO;
use nextstep_core::{
    Conversation, ConversationId, Error, FailureKind, GenerationConfig, ProviderError, Result,
    Turn,
};
use tracing::{debug, info, warn};

use crate::gateway::ModelGateway;
use crate::stream_event::{EventSink, StreamEvent, emit};

/// One question of the flow, with sample answers shown to the student.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FlowQuestion {
    pub prompt: &'static str,
    /// How the answer is labelled in the synthesis prompt.
    pub label: &'static str,
    pub examples: [&'static str; 3],
}

pub const CAREER_QUESTIONS: [FlowQuestion; 5] = [
    FlowQuestion {
        prompt: "What subjects or activities do you enjoy the most?",
        label: "Subjects/activities enjoyed",
        examples: ["Math and coding", "Robotics club", "Designing apps"],
    },
    FlowQuestion {
        prompt: "What skills do you currently have? (technical skills, soft skills, tools, programming languages, etc.)",
        label: "Current skills",
        examples: ["Python, SQL basics", "Good communication", "Canva and Excel"],
    },
    FlowQuestion {
        prompt: "Do you prefer creative work, analytical work, technical work, or management-related work?",
        label: "Preferred work type",
        examples: ["Mostly analytical", "Technical + creative", "Management-oriented"],
    },
    FlowQuestion {
        prompt: "Do you prefer working in a team or independently?",
        label: "Team vs independent preference",
        examples: ["Prefer team projects", "Prefer independent work", "Both are fine"],
    },
    FlowQuestion {
        prompt: "What are your long-term goals? (job, higher studies, startup, government exams, research, etc.)",
        label: "Long-term goals",
        examples: ["Product job in 2 years", "M.Tech after B.Tech", "Prepare for GATE"],
    },
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FlowState {
    /// Waiting for the answer to question `n` (zero-based).
    Collecting(usize),
    /// The synthesis request has been issued and has not finished.
    Synthesizing,
    Done,
}

/// How a finished flow ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FlowOutcome {
    Recommendation(String),
    Failed(FailureKind),
    /// The caller dropped the synthesis before it finished.
    Abandoned,
}

/// What the student sees after an accepted answer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FlowStep {
    /// The next question, already appended to the transcript.
    Question { index: usize, text: String },
    /// The final recommendation.
    Recommendation(String),
}

pub struct StructuredFlow {
    id: ConversationId,
    state: FlowState,
    answers: Vec<String>,
    outcome: Option<FlowOutcome>,
    transcript: Conversation,
    synthesis_requests: usize,
    config: GenerationConfig,
}

impl StructuredFlow {
    /// Start a flow at the first question.
    ///
    /// `config` is used for the synthesis call; it should carry the
    /// recommender system instruction.
    pub fn new(id: ConversationId, config: GenerationConfig) -> Result<Self> {
        let opening = format!("{RECOMMENDER_INTRO}\n\n{}", question_text(0));
        Ok(Self {
            transcript: Conversation::with_greeting(id.clone(), &opening)?,
            id,
            state: FlowState::Collecting(0),
            answers: Vec::with_capacity(CAREER_QUESTIONS.len()),
            outcome: None,
            synthesis_requests: 0,
            config,
        })
    }

    /// Discard everything and start again at the first question.
    pub fn reset(&mut self) -> Result<()> {
        *self = Self::new(self.id.clone(), self.config.clone())?;
        Ok(())
    }

    pub fn id(&self) -> &ConversationId {
        &self.id
    }

    pub fn state(&self) -> FlowState {
        self.state
    }

    pub fn answers(&self) -> &[String] {
        &self.answers
    }

    pub fn outcome(&self) -> Option<&FlowOutcome> {
        self.outcome.as_ref()
    }

    pub fn transcript(&self) -> &[Turn] {
        self.transcript.turns()
    }

    /// The text the student sees first: intro plus question 1.
    pub fn opening(&self) -> &str {
        self.transcript.turns().first().map(Turn::text).unwrap_or_default()
    }

    /// Number of synthesis requests issued by this instance (0 or 1).
    pub fn synthesis_requests(&self) -> usize {
        self.synthesis_requests
    }

    /// The composite prompt built from the collected answers.
    pub fn synthesis_prompt(&self) -> String {
        let mut prompt = String::from("Student responses:\n");
        for (i, (question, answer)) in CAREER_QUESTIONS.iter().zip(&self.answers).enumerate() {
            prompt.push_str(&format!("{}. {}: {}\n", i + 1, question.label, answer));
        }
        prompt.push_str("\nNow provide personalized recommendations exactly as instructed.");
        prompt
    }

    /// Record an answer and advance.
    ///
    /// The fifth answer triggers the one synthesis call. If that call fails
    /// the flow still finishes, with [`FlowOutcome::Failed`], and the error
    /// is returned; a new recommendation needs [`reset`](Self::reset).
    /// A synthesis whose future was dropped is closed as
    /// [`FlowOutcome::Abandoned`] on the next answer.
    pub async fn submit_answer(
        &mut self,
        gateway: &ModelGateway,
        text: &str,
        observer: Option<&EventSink>,
    ) -> Result<FlowStep> {
        let index = match self.state {
            FlowState::Collecting(i) => i,
            // `&mut self` rules out a live synthesis, so the last one was dropped.
            FlowState::Synthesizing => {
                warn!(flow = %self.id, "Recommendation was abandoned");
                self.state = FlowState::Done;
                self.outcome = Some(FlowOutcome::Abandoned);
                return Err(Error::AlreadyComplete);
            }
            FlowState::Done => return Err(Error::AlreadyComplete),
        };

        let answer = Turn::user(text)
            .map_err(|_| Error::InvalidInput("answer must not be empty".into()))?;
        self.answers.push(answer.text().to_string());
        self.transcript.push(answer);

        let next = index + 1;
        if next < CAREER_QUESTIONS.len() {
            let text = question_text(next);
            self.transcript.push(Turn::assistant(&text)?);
            self.state = FlowState::Collecting(next);
            debug!(flow = %self.id, question = next + 1, "Asked next question");
            return Ok(FlowStep::Question { index: next, text });
        }

        self.state = FlowState::Synthesizing;
        self.synthesis_requests += 1;
        info!(flow = %self.id, "All answers collected, requesting recommendations");

        let prompt = Turn::user(self.synthesis_prompt())?;
        let result = match gateway.generate(vec![prompt], &self.config, observer).await {
            Ok(c) if !c.text.trim().is_empty() => Ok(c),
            Ok(_) => Err(ProviderError::EmptyResponse),
            Err(e) => Err(e),
        };
        self.state = FlowState::Done;

        match result {
            Ok(completion) => {
                let turn = Turn::assistant(&completion.text)?;
                let text = turn.text().to_string();
                self.transcript.push(turn);
                self.outcome = Some(FlowOutcome::Recommendation(text.clone()));
                emit(
                    observer,
                    StreamEvent::Done {
                        conversation_id: self.id.to_string(),
                        usage: completion.usage,
                    },
                );
                Ok(FlowStep::Recommendation(text))
            }
            Err(e) => {
                warn!(flow = %self.id, error = %e, kind = ?e.kind(), "Recommendation failed");
                self.outcome = Some(FlowOutcome::Failed(e.kind()));
                emit(
                    observer,
                    StreamEvent::Error {
                        message: e.to_string(),
                        kind: e.kind(),
                    },
                );
                Err(Error::Provider(e))
            }
        }
    }
}

/// Display text for question `index`: numbered prompt plus sample answers.
pub fn question_text(index: usize) -> String {
    let question = &CAREER_QUESTIONS[index];
    format!(
        "Question {}: {}\n\nExample answers: {}",
        index + 1,
        question.prompt,
        question.examples.join(" | ")
    )
}
