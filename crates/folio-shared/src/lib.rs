//! # Folio Shared
//!
//! Wire types of the HTTP API: response DTOs built from domain values,
//! request bodies and query parameters, and the response envelopes.

pub mod dto;
pub mod response;

pub use response::{ApiResponse, ErrorResponse};
