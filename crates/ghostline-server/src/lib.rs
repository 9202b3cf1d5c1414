//! # ghostline-server
//!
//! REST API server for the Ghostline virtual-number messaging service.
//!
//! This crate provides:
//! - **REST API** (axum) for contacts, virtual numbers, messages, and user
//!   profile operations, all scoped to the session identity
//! - **Bearer-token sessions** so a user id never comes from a request body
//! - **Simulated replies**: a cancellable scheduler that writes a canned
//!   counterpart response shortly after every outgoing message
//! - **Per-IP rate limiting** to protect against abuse

pub mod api;
pub mod auth;
pub mod config;
pub mod error;
pub mod persona;
pub mod rate_limit;
pub mod responder;
