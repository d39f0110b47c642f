//! Patch builder for the targeted wire strategy.
//!
//! Simple, independently-addressable leaf collections are converged with a
//! small RFC 6902 operation list batched into one PATCH against the schema
//! path. `add` targets the collection's array-append path, `remove` and
//! `replace` target the located element index path. Paths follow the
//! service's addressing (sites keyed by token, networks by name), so they are
//! only meaningful to the remote endpoint, never applied locally.

use json_patch::{AddOperation, Patch, PatchOperation, RemoveOperation, ReplaceOperation};
use jsonptr::PointerBuf;
use serde_json::Value;

use fabricctl_core::{Error, Result};

fn pointer(path: &str) -> Result<PointerBuf> {
    PointerBuf::parse(path)
        .map_err(|e| Error::invalid_input(format!("Malformed patch path '{path}': {e}")))
}

pub fn add(path: &str, value: Value) -> Result<PatchOperation> {
    Ok(PatchOperation::Add(AddOperation {
        path: pointer(path)?,
        value,
    }))
}

pub fn remove(path: &str) -> Result<PatchOperation> {
    Ok(PatchOperation::Remove(RemoveOperation {
        path: pointer(path)?,
    }))
}

pub fn replace(path: &str, value: Value) -> Result<PatchOperation> {
    Ok(PatchOperation::Replace(ReplaceOperation {
        path: pointer(path)?,
        value,
    }))
}

/// Array-tail insertion path for a collection.
pub fn append_path(collection_path: &str) -> String {
    format!("{collection_path}/-")
}

/// Serializes the operation list into the request body.
pub fn to_body(ops: &Patch) -> Result<Value> {
    Ok(serde_json::to_value(ops)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_add_serializes_with_append_marker() {
        let op = add(
            &append_path("/sites/site-a-Template1/networks/N1/dcnmStaticPorts"),
            json!({"switchSN": "ABCD1234"}),
        )
        .unwrap();
        let body = to_body(&Patch(vec![op])).unwrap();
        assert_eq!(
            body,
            json!([{
                "op": "add",
                "path": "/sites/site-a-Template1/networks/N1/dcnmStaticPorts/-",
                "value": {"switchSN": "ABCD1234"}
            }])
        );
    }

    #[test]
    fn test_remove_serializes_index_path() {
        let op = remove("/sites/site-a-Template1/networks/N1/dcnmStaticPorts/2").unwrap();
        let body = to_body(&Patch(vec![op])).unwrap();
        assert_eq!(
            body,
            json!([{
                "op": "remove",
                "path": "/sites/site-a-Template1/networks/N1/dcnmStaticPorts/2"
            }])
        );
    }

    #[test]
    fn test_replace_serializes_index_path() {
        let op = replace(
            "/sites/site-a-Template1/networks/N1/dcnmStaticPorts/0",
            json!({"switchSN": "ABCD1234", "ports": ["eth1/2"]}),
        )
        .unwrap();
        let body = to_body(&Patch(vec![op])).unwrap();
        assert_eq!(
            body,
            json!([{
                "op": "replace",
                "path": "/sites/site-a-Template1/networks/N1/dcnmStaticPorts/0",
                "value": {"switchSN": "ABCD1234", "ports": ["eth1/2"]}
            }])
        );
    }

    #[test]
    fn test_malformed_path_rejected() {
        let err = add("no-leading-slash", json!(1)).unwrap_err();
        assert!(err.to_string().contains("Malformed patch path"));
    }
}
