//! Conversation sessions and guidance flows for NextStep.
//!
//! Everything a UI shell needs sits behind [`CareerDesk`]:
//!
//! 1. **Open chat**: each message is appended to a bounded-context session
//!    and answered by one streamed generation
//! 2. **Career recommender**: five fixed questions, then a single synthesis
//! 3. **Learning resources**: a grounded live search, falling back to an
//!    offline plan when the model is out of quota or unreachable
//! 4. **Roadmaps**: a preset roadmap.sh catalog
//!
//! The library installs no tracing subscriber; the embedding shell owns it.

pub mod context;
pub mod desk;
pub mod flow;
pub mod gateway;
pub mod planner;
pub mod resources;
pub mod roadmaps;
pub mod session;
pub mod stream_event;

#[cfg(test)]
mod test_helpers;

pub use context::{ContextWindow, DEFAULT_CONTEXT_TURNS};
pub use desk::CareerDesk;
pub use flow::{CAREER_QUESTIONS, FlowOutcome, FlowQuestion, FlowState, FlowStep, StructuredFlow};
pub use gateway::{Completion, FragmentStream, ModelGateway};
pub use planner::{StudyLevel, Track, plan};
pub use resources::{AnswerSource, FallbackNotice, ResourceAnswer, ResourceQuery, ResourceSearch};
pub use roadmaps::RoadmapLink;
pub use session::ConversationSession;
pub use stream_event::{EventSink, StreamEvent};
