//! HTTP request handlers

pub mod chat;
pub mod health;
pub mod users;

pub use chat::chat;
pub use health::{guardial_health, health, version};
pub use users::{create_user, list_users};
