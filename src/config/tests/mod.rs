//! Unit tests for configuration loading and precedence.
//!
//! Tests are organised into modules by functional area:
//! - `helpers`: Shared test utilities
//! - `precedence`: Layer precedence tests
//! - `field_resolution`: Provider, token, identifier, and label resolution
//! - `provider_kind`: Provider name parsing

mod helpers;
mod precedence;
