pub mod chat_service;
pub mod classifier;
pub mod confirmations;
pub mod dispatcher;
pub mod interpreter;
pub mod prompt_builder;

pub use chat_service::{ChatService, ChatStage};
pub use dispatcher::ActionDispatcher;
pub use interpreter::ResponseInterpreter;
pub use prompt_builder::PromptBuilder;
