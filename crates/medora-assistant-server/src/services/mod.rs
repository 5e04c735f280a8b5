pub mod assistant;
pub mod conversation;
pub mod llm_service;

pub use assistant::{AssistantService, ClinicDataProvider, LlmProvider};
pub use llm_service::LlmService;
