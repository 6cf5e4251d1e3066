//! Typed client for the DocGen service: session handling, the document form
//! and admin operations, plus a headless model of the frontend's screens.

pub mod admin;
pub mod app;
pub mod client;
pub mod error;
pub mod form;
pub mod session;

pub use admin::AdminClient;
pub use app::{App, Screen};
pub use client::DocgenClient;
pub use error::ClientError;
pub use form::DocumentForm;
pub use session::{FileStore, MemoryStore, Session, SessionStore};
