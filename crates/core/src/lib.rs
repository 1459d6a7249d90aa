//! `vigil-core` -- alert definitions and the pure evaluation logic.
//!
//! Nothing in this crate performs I/O. The agent feeds observations into
//! [`state_machine::AlertStateMachine`] and acts on the returned
//! [`state_machine::Action`].

pub mod alert;
pub mod error;
pub mod severity;
pub mod state_machine;
pub mod threshold_validation;
