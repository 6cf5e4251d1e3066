pub mod admin;
pub mod auth;
pub mod config;
pub mod documents;
pub mod error;
pub mod extract;
pub mod mailer;
pub mod middleware;
pub mod render;
pub mod routes;
pub mod templates;
