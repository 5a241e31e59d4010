//! bandcoach-core: band-score tracking, decay, and repair workflow engine.
//!
//! This crate owns the learner's predicted band score, the active weakness
//! set, and the exclusive overlay state machine that decides which workflow
//! may mutate them. Presentation layers read state and subscribe to
//! [`session::SessionEvent`]s; they never mutate state directly.

pub mod assessment;
pub mod config;
pub mod controller;
pub mod decay;
pub mod error;
pub mod mock;
pub mod model;
pub mod notification;
pub mod scheduler;
pub mod score;
pub mod session;
pub mod snapshot;
pub mod streak;
pub mod traits;
pub mod weakness;
pub mod workflow;

pub use error::SessionError;
pub use session::{Session, SessionEvent};
