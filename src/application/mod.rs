//! Application layer: the order lifecycle engine and the collaborators it
//! orchestrates.
//!
//! `StorefrontEngine` is the entry point. Every inbound event is processed to
//! completion under the buyer's lock, so events for one buyer are linearized
//! while different buyers proceed concurrently.

pub mod admin;
pub mod config;
pub mod engine;
pub mod gateway;
pub mod sessions;
