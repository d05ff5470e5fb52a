//! Wire types for the livebridge remote execution protocol.
//!
//! This crate is the single source of truth for the messages exchanged
//! between the bridge server and its clients:
//!
//! - [`Request`] -- an inbound message carrying exactly one of four
//!   verbs (`call`, `eval`, `get`, `set`)
//! - [`Response`] -- an outbound message with a [`Outcome`] tag, an
//!   optional return value, and an optional [`StateSnapshot`]
//! - [`StateSnapshot`] -- the `modules`/`connections` payload published
//!   to clients whenever the model entity changes
//!
//! All types serialize to the JSON shapes the dashboard clients expect;
//! absent optional fields are omitted from the output entirely.

pub mod request;
pub mod response;

// Re-export all public types at crate root for convenience.
pub use request::{Request, Verb};
pub use response::{Outcome, Response, StateSnapshot};
