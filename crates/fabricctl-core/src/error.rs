use thiserror::Error;

/// Error taxonomy for fabricctl operations.
///
/// Every variant is fatal to the reconciliation call that produced it: the
/// driver never retries and never transmits after a failure. Messages name the
/// missing prerequisite and enumerate valid alternatives where feasible.
#[derive(Debug, Error)]
pub enum Error {
    #[error("Schema '{0}' not found")]
    SchemaNotFound(String),

    #[error("Site '{0}' not found")]
    SiteNotFound(String),

    #[error("Provided template '{name}' does not exist. Existing templates: {}", .existing.join(", "))]
    TemplateNotFound { name: String, existing: Vec<String> },

    #[error(
        "Site '{site}' is not associated with template '{template}'. \
         Associate the site with the template before managing site-local objects"
    )]
    AssociationMissing { site: String, template: String },

    #[error("Provided {kind} '{name}' does not exist{}", existing_suffix(.existing))]
    EntityNotFound {
        kind: String,
        name: String,
        existing: Vec<String>,
    },

    #[error("Referenced {kind} '{name}' could not be resolved")]
    ReferenceUnresolved { kind: String, name: String },

    #[error("Invalid request: {0}")]
    InvalidInput(String),

    #[error("API request failed (HTTP {status}): {message}")]
    Api { status: u16, message: String },

    #[error("Transport error: {0}")]
    Transport(String),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

fn existing_suffix(existing: &[String]) -> String {
    if existing.is_empty() {
        String::new()
    } else {
        format!(". Existing: {}", existing.join(", "))
    }
}

impl Error {
    pub fn schema_not_found(name: impl Into<String>) -> Self {
        Self::SchemaNotFound(name.into())
    }

    pub fn site_not_found(name: impl Into<String>) -> Self {
        Self::SiteNotFound(name.into())
    }

    pub fn template_not_found(name: impl Into<String>, existing: Vec<String>) -> Self {
        Self::TemplateNotFound {
            name: name.into(),
            existing,
        }
    }

    pub fn association_missing(site: impl Into<String>, template: impl Into<String>) -> Self {
        Self::AssociationMissing {
            site: site.into(),
            template: template.into(),
        }
    }

    pub fn entity_not_found(
        kind: impl Into<String>,
        name: impl Into<String>,
        existing: Vec<String>,
    ) -> Self {
        Self::EntityNotFound {
            kind: kind.into(),
            name: name.into(),
            existing,
        }
    }

    pub fn reference_unresolved(kind: impl Into<String>, name: impl Into<String>) -> Self {
        Self::ReferenceUnresolved {
            kind: kind.into(),
            name: name.into(),
        }
    }

    pub fn invalid_input(message: impl Into<String>) -> Self {
        Self::InvalidInput(message.into())
    }

    pub fn api(status: u16, message: impl Into<String>) -> Self {
        Self::Api {
            status,
            message: message.into(),
        }
    }

    pub fn transport(message: impl Into<String>) -> Self {
        Self::Transport(message.into())
    }

    /// True for every absence-of-prerequisite failure (schema, site, template,
    /// association, or entity missing when a specific identifier was required).
    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            Self::SchemaNotFound(_)
                | Self::SiteNotFound(_)
                | Self::TemplateNotFound { .. }
                | Self::AssociationMissing { .. }
                | Self::EntityNotFound { .. }
        )
    }

    /// Error category for logging and classification.
    pub fn category(&self) -> ErrorCategory {
        match self {
            Self::SchemaNotFound(_)
            | Self::SiteNotFound(_)
            | Self::TemplateNotFound { .. }
            | Self::AssociationMissing { .. }
            | Self::EntityNotFound { .. } => ErrorCategory::NotFound,
            Self::ReferenceUnresolved { .. } => ErrorCategory::Reference,
            Self::InvalidInput(_) => ErrorCategory::Validation,
            Self::Api { .. } => ErrorCategory::Api,
            Self::Transport(_) => ErrorCategory::Transport,
            Self::Json(_) => ErrorCategory::Serialization,
        }
    }
}

/// Error categories for logging and monitoring.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    NotFound,
    Reference,
    Validation,
    Api,
    Transport,
    Serialization,
}

impl std::fmt::Display for ErrorCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::NotFound => write!(f, "not_found"),
            Self::Reference => write!(f, "reference"),
            Self::Validation => write!(f, "validation"),
            Self::Api => write!(f, "api"),
            Self::Transport => write!(f, "transport"),
            Self::Serialization => write!(f, "serialization"),
        }
    }
}

/// Convenience result type for fabricctl operations.
pub type Result<T> = std::result::Result<T, Error>;
