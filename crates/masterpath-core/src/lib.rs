//! masterpath-core — Mastery and progression engine.
//!
//! This crate defines the data model, the Leitner scheduler, study sessions,
//! mastery tracking, answer evaluation, exam attempts and path progression,
//! plus the collaborator traits the rest of masterpath builds on.

pub mod config;
pub mod engine;
pub mod error;
pub mod evaluator;
pub mod events;
pub mod exam;
pub mod mastery;
pub mod model;
pub mod parser;
pub mod progression;
pub mod scheduler;
pub mod session;
pub mod store;
pub mod traits;
