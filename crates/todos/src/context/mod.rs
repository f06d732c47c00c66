//! Request-scoped context module.
//!
//! Provides the `RequestContext` extractor that hands each API handler the
//! connection opened for its request, complementing application-scoped
//! `AppState`.

mod extractor;
mod types;

pub use extractor::extract_request_id;
pub use types::RequestContext;
