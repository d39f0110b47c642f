//! The tree locator.
//!
//! All lookups operate over one fetched, immutable-for-the-call schema
//! snapshot. The locator never mutates it; it only computes positions and
//! references into it. Collections are small, so exact-match linear scans keep
//! ordering stable without any indexing machinery.

use serde_json::Value;
use tracing::debug;

use fabricctl_client::OrchClient;
use fabricctl_core::{EntityRef, Error, Result};

/// One fetched schema document plus its addressing information.
#[derive(Debug, Clone)]
pub struct SchemaSnapshot {
    /// Opaque identifier the service resolved the schema name to.
    pub id: String,
    /// Request path of the document, used for the mutating call.
    pub path: String,
    /// The full nested document.
    pub doc: Value,
}

/// Resolves a schema name to its identifier via the schema listing.
pub async fn lookup_schema_id(client: &OrchClient, name: &str) -> Result<String> {
    let listing = client.get("schemas").await?;
    for schema in array_at(&listing, "schemas") {
        if schema.get("displayName").and_then(Value::as_str) == Some(name) {
            if let Some(id) = schema.get("id").and_then(Value::as_str) {
                return Ok(id.to_string());
            }
        }
    }
    Err(Error::schema_not_found(name))
}

/// Fetches the full schema document for `name`.
pub async fn fetch_schema(client: &OrchClient, name: &str) -> Result<SchemaSnapshot> {
    let id = lookup_schema_id(client, name).await?;
    let path = format!("schemas/{id}");
    let doc = client.get(&path).await?;
    debug!(schema = name, id = %id, "fetched schema snapshot");
    Ok(SchemaSnapshot { id, path, doc })
}

/// Resolves a site name to its identifier via the site listing.
pub async fn resolve_site(client: &OrchClient, name: &str) -> Result<String> {
    let listing = client.get("sites").await?;
    for site in array_at(&listing, "sites") {
        if site.get("name").and_then(Value::as_str) == Some(name) {
            if let Some(id) = site.get("id").and_then(Value::as_str) {
                return Ok(id.to_string());
            }
        }
    }
    Err(Error::site_not_found(name))
}

impl SchemaSnapshot {
    /// Position of the named template in the template array. The error lists
    /// the template names that do exist.
    pub fn template_index(&self, name: &str) -> Result<usize> {
        let templates = array_at(&self.doc, "templates");
        match templates
            .iter()
            .position(|t| t.get("name").and_then(Value::as_str) == Some(name))
        {
            Some(idx) => Ok(idx),
            None => Err(Error::template_not_found(name, entity_names(templates))),
        }
    }

    /// Position of the (site, template) association among the document's site
    /// entries. The association must exist before any site-local overlay can be
    /// created, queried, or removed; `site_name` only feeds the error message.
    pub fn site_template_index(
        &self,
        site_id: &str,
        template: &str,
        site_name: &str,
    ) -> Result<usize> {
        array_at(&self.doc, "sites")
            .iter()
            .position(|s| {
                s.get("siteId").and_then(Value::as_str) == Some(site_id)
                    && s.get("templateName").and_then(Value::as_str) == Some(template)
            })
            .ok_or_else(|| Error::association_missing(site_name, template))
    }
}

/// Composite addressing token for site-scoped resource paths.
pub fn site_token(site_id: &str, template: &str) -> String {
    format!("{site_id}-{template}")
}

/// Exact-match scan of a named-entity collection.
pub fn entity_index(collection: &[Value], name: &str) -> Option<usize> {
    collection
        .iter()
        .position(|e| e.get("name").and_then(Value::as_str) == Some(name))
}

/// Scan of a collection whose entries carry identity in a reference string
/// under `ref_key` (site overlays point back at their template entity this
/// way) rather than a `name` attribute.
pub fn entity_index_by_ref(collection: &[Value], ref_key: &str, reference: &str) -> Option<usize> {
    collection
        .iter()
        .position(|e| e.get(ref_key).and_then(Value::as_str) == Some(reference))
}

/// Names present in a named-entity collection, for error messages.
pub fn entity_names(collection: &[Value]) -> Vec<String> {
    collection
        .iter()
        .filter_map(|e| e.get("name").and_then(Value::as_str))
        .map(str::to_string)
        .collect()
}

/// Entity names recovered from the reference strings under `ref_key`.
pub fn entity_ref_names(collection: &[Value], ref_key: &str) -> Vec<String> {
    collection
        .iter()
        .filter_map(|e| e.get(ref_key).and_then(Value::as_str))
        .map(|r| EntityRef::name_of(r).unwrap_or_else(|| r.to_string()))
        .collect()
}

/// Borrow the array under `key`, treating a missing or non-array value as
/// empty. Absent collections are common; the service omits empty arrays.
pub fn array_at<'a>(value: &'a Value, key: &str) -> &'a [Value] {
    value
        .get(key)
        .and_then(Value::as_array)
        .map(Vec::as_slice)
        .unwrap_or(&[])
}
