pub mod cache_key;
pub mod dto;
pub mod handlers;
pub mod llm;
pub mod repo;
pub mod service;

pub use handlers::router;
