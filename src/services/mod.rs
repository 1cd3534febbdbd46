pub mod chunker;
pub mod llm_provider;
pub mod pipeline;
pub mod prompts;
pub mod text_extract;
