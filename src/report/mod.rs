pub mod aggregate;
pub mod handlers;
pub mod pdf;
pub mod repo;

pub use handlers::router;
