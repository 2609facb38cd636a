pub mod builder;
pub mod composer;
pub mod config;
pub mod export;
pub mod lines;
pub mod llm;
pub mod model;
pub mod normalize;
pub mod planner;
pub mod style;

pub use builder::ScriptBuilder;
pub use config::Config;
pub use llm::{create_llm, GenerationOptions, LlmClient};
pub use model::{BuildRequest, Character, PresentationStyle, Script};
