//! # rytm-types
//!
//! Shared type definitions for the rytm trigger module.
//! This crate holds the plain data that flows between the core engine, the
//! persistence layer and whatever front end issues commands: pattern and
//! channel configuration, clock modifiers, and the `Command` enum.

pub mod action;
pub mod state;

pub use action::*;
pub use state::*;

/// Number of physical trigger outputs.
pub const CHANNEL_COUNT: usize = 6;
