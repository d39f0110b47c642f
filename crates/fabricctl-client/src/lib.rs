//! Transport collaborator for the reconciliation core.
//!
//! [`OrchClient`] owns the HTTP session against the orchestration service: it
//! builds request paths under the versioned API root, attaches the bearer
//! token, and maps non-success responses to [`fabricctl_core::Error::Api`].
//! The reconciler never constructs raw HTTP; it only hands this client a path
//! and a body. No retries happen here or anywhere above.

mod client;

pub use client::{ApiMethod, OrchClient, validate_base_url};
