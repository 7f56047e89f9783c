pub mod chatbot;
pub mod confidence;
pub mod context;
pub mod expansion;
pub mod generator;
pub mod retriever;
pub mod terms;

pub use chatbot::{ChatOutcome, Chatbot};
pub use context::ContextAssembler;
pub use expansion::QueryExpander;
pub use generator::AnswerGenerator;
pub use retriever::{HybridRetriever, SearchResult, SearchType};
