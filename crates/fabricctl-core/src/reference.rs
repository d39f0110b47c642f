//! Reference-string handling.
//!
//! Entities point at each other with path-shaped reference strings of the form
//! `/schemas/{schemaId}/templates/{template}/{collection}/{name}`, possibly
//! crossing schema and template boundaries. A reference must resolve to a
//! currently existing entity; the reconciler aborts before any mutation when it
//! does not.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// The orchestration service rejects template names containing spaces; callers
/// may still pass display names such as "Template 1".
pub fn normalize_template_name(name: &str) -> String {
    name.replace(' ', "")
}

/// A fully qualified reference to a named entity inside a schema document.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct EntityRef {
    pub schema_id: String,
    pub template: String,
    pub collection: String,
    pub name: String,
}

impl EntityRef {
    pub fn new(
        schema_id: impl Into<String>,
        template: impl Into<String>,
        collection: impl Into<String>,
        name: impl Into<String>,
    ) -> Self {
        Self {
            schema_id: schema_id.into(),
            template: template.into(),
            collection: collection.into(),
            name: name.into(),
        }
    }

    /// Renders the persisted reference-string form.
    pub fn to_path(&self) -> String {
        format!(
            "/schemas/{}/templates/{}/{}/{}",
            self.schema_id, self.template, self.collection, self.name
        )
    }

    /// Parses a persisted reference string back into its components.
    pub fn parse(reference: &str) -> Result<Self> {
        let parts: Vec<&str> = reference.trim_start_matches('/').split('/').collect();
        match parts.as_slice() {
            ["schemas", schema_id, "templates", template, collection, name]
                if !schema_id.is_empty()
                    && !template.is_empty()
                    && !collection.is_empty()
                    && !name.is_empty() =>
            {
                Ok(Self::new(*schema_id, *template, *collection, *name))
            }
            _ => Err(Error::invalid_input(format!(
                "Malformed reference '{reference}'. \
                 Expected /schemas/{{id}}/templates/{{template}}/{{collection}}/{{name}}"
            ))),
        }
    }

    /// The entity name embedded in a reference string, if it parses.
    pub fn name_of(reference: &str) -> Option<String> {
        Self::parse(reference).ok().map(|r| r.name)
    }
}

impl fmt::Display for EntityRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_path())
    }
}

/// Caller-supplied reference target: a name plus optional schema/template that
/// default to the schema and template currently being reconciled.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RefTarget {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub schema: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub template: Option<String>,
}

impl RefTarget {
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            schema: None,
            template: None,
        }
    }

    /// Schema to resolve against, defaulting to the current one.
    pub fn schema_or<'a>(&'a self, current: &'a str) -> &'a str {
        self.schema.as_deref().unwrap_or(current)
    }

    /// Template to resolve against, normalized, defaulting to the current one.
    pub fn template_or(&self, current: &str) -> String {
        normalize_template_name(self.template.as_deref().unwrap_or(current))
    }
}
