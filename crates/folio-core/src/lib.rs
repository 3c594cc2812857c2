//! # Folio Core
//!
//! The domain layer of the Folio blog backend: entities, text helpers,
//! ports, and the services that implement the business rules.
//! This crate has no infrastructure dependencies.

pub mod domain;
pub mod error;
pub mod ports;
pub mod services;
pub mod text;

pub use error::{DomainError, RepoError};
