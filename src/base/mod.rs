//! Core components, types, and utilities for the relay.
//!
//! This module contains fundamental building blocks used throughout the crate:
//! - Configuration handling and environment variables.
//! - Address parsing.
//! - The decoded stanza model.
//! - Common types and result handling.

pub mod address;
pub mod config;
pub mod stanza;
pub mod types;
