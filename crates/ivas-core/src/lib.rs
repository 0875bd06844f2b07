//! Core domain + application logic for the iVAS SMS bot.
//!
//! This crate is framework-agnostic. The HTTP stack and Telegram live behind
//! ports (traits) implemented in adapter crates.

pub mod config;
pub mod conversation;
pub mod domain;
pub mod errors;
pub mod formatting;
pub mod logging;
pub mod messaging;
pub mod portal;
pub mod registry;
pub mod service;

pub use errors::{Error, Result};
