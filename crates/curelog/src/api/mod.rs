//! API interaction layer: retry and token accounting.
//!
//! These modules handle everything between the pipeline stages and the
//! OpenRouter API:
//!
//! - [`retry`] — classification of failed calls against the client's error
//!   strings ([`ErrorClass`]), with configurable exponential backoff and
//!   jitter for the transient ones. 400/401-class failures are never retried.
//! - [`usage`] — cumulative [`UsageTotals`] across the pipeline's calls, for
//!   end-of-run reporting.

pub mod retry;
pub mod usage;

// Re-export commonly used items at the module level.
pub use retry::{ErrorClass, RetryConfig, classify_error};
pub use usage::UsageTotals;
