//! Assessment flow: the orchestrator state machine, the session record
//! store, and the HTTP handlers that drive them.

pub mod handlers;
pub mod orchestrator;
pub mod store;

pub use orchestrator::{NextStep, Orchestrator};
pub use store::{PgSessionStore, SessionStore};
