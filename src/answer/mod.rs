//! Grounded answer generation over retrieved context.

mod context;
mod generator;

pub use context::{ContextAssembler, ContextEntry, PromptContext};
pub use generator::{Answer, AnswerGenerator, AnswerModel, OpenAIAnswerModel};

/// The stages a query moves through. Traced per query for debugging.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueryPhase {
    Received,
    Embedding,
    Retrieving,
    Assembling,
    Generating,
    Validating,
    Done,
    Failed,
}

impl std::fmt::Display for QueryPhase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            QueryPhase::Received => "received",
            QueryPhase::Embedding => "embedding",
            QueryPhase::Retrieving => "retrieving",
            QueryPhase::Assembling => "assembling",
            QueryPhase::Generating => "generating",
            QueryPhase::Validating => "validating",
            QueryPhase::Done => "done",
            QueryPhase::Failed => "failed",
        };
        write!(f, "{}", s)
    }
}
