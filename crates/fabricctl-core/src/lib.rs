//! Core types shared across the fabricctl crates: the error taxonomy, the
//! desired-state selector, reference-string handling, and the diff engine.

pub mod diff;
pub mod error;
pub mod reference;
pub mod state;

pub use error::{Error, ErrorCategory, Result};
pub use reference::{EntityRef, RefTarget, normalize_template_name};
pub use state::DesiredState;
