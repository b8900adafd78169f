//! Core use-case services.
//!
//! # Responsibility
//! - Orchestrate repository calls into availability and account use-cases.
//! - Keep callers decoupled from storage details.

pub mod availability_service;
pub mod user_service;
pub mod week;
