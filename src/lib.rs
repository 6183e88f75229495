pub mod api;
pub mod cli;
pub mod config;
pub mod conversation;
pub mod embeddings;
pub mod errors;
pub mod export;
pub mod knowledge;
pub mod llm;
pub mod logging;
pub mod models;
pub mod rag;


pub use config::AppConfig;
pub use errors::*;
