//! Core use-case services.
//!
//! # Responsibility
//! - Orchestrate repository calls and engine steps into use-case APIs.
//! - Keep CLI/transport layers decoupled from storage details.

pub mod ranking_service;
