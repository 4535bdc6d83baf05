//! event_log.v1 input schema
//!
//! This module defines the rows delivered by the upstream event stream and
//! their conversion into validated, immutable events.

mod adapter;
mod event;

pub use adapter::*;
pub use event::*;
