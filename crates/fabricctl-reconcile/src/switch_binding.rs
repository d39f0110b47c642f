//! Site-local network switch bindings, converged with the targeted-patch
//! strategy: a one-element RFC 6902 operation list PATCHed against the schema
//! path. Bindings live in the `dcnmStaticPorts` collection of a site-local
//! network overlay and are keyed by switch serial number.

use json_patch::Patch;
use serde_json::{Value, json};
use tracing::{debug, info};

use fabricctl_client::OrchClient;
use fabricctl_core::diff::{diff_values, merge_payload};
use fabricctl_core::{DesiredState, EntityRef, Error, Result, normalize_template_name};

use crate::driver::{Decision, ReconcileOutcome, decide};
use crate::{patch, snapshot};

const STATIC_PORTS: &str = "dcnmStaticPorts";

/// Desired-state descriptor for one switch binding.
#[derive(Debug, Clone)]
pub struct SwitchBindingRequest {
    pub schema: String,
    pub site: String,
    pub template: String,
    pub network: String,
    /// Switch serial number. Optional only for querying the full collection.
    pub serial_number: Option<String>,
    /// Interface to bind, recorded as the binding's port list.
    pub interface: Option<String>,
    pub state: DesiredState,
}

pub(crate) async fn reconcile(
    client: &OrchClient,
    check_mode: bool,
    request: &SwitchBindingRequest,
) -> Result<ReconcileOutcome> {
    let template = normalize_template_name(&request.template);
    if request.state.is_mutating() && request.serial_number.is_none() {
        return Err(Error::invalid_input(
            "'serial_number' is required for present and absent states",
        ));
    }

    let snapshot = snapshot::fetch_schema(client, &request.schema).await?;
    let site_id = snapshot::resolve_site(client, &request.site).await?;
    let site_idx = snapshot.site_template_index(&site_id, &template, &request.site)?;
    let token = snapshot::site_token(&site_id, &template);

    // The site-local network is located through its template reference, not by
    // array position.
    let network_ref = EntityRef::new(&snapshot.id, &template, "networks", &request.network);
    let site_entry = &snapshot.doc["sites"][site_idx];
    let networks = snapshot::array_at(site_entry, "networks");
    let network_idx = snapshot::entity_index_by_ref(networks, "nwRef", &network_ref.to_path())
        .ok_or_else(|| {
            Error::entity_not_found(
                "Network",
                &request.network,
                snapshot::entity_ref_names(networks, "nwRef"),
            )
        })?;

    let ports = snapshot::array_at(&networks[network_idx], STATIC_PORTS);
    let existing_idx = request.serial_number.as_deref().and_then(|serial| {
        ports
            .iter()
            .position(|p| p.get("switchSN").and_then(Value::as_str) == Some(serial))
    });
    let existing = existing_idx.map(|idx| ports[idx].clone());

    if request.state == DesiredState::Query {
        return match request.serial_number.as_deref() {
            None => Ok(ReconcileOutcome::query(Value::Array(ports.to_vec()))),
            Some(serial) => existing.map(ReconcileOutcome::query).ok_or_else(|| {
                Error::entity_not_found("Switch binding", serial, binding_serials(ports))
            }),
        };
    }

    let serial = request.serial_number.as_deref().unwrap_or_default();
    let collection_path = format!("/sites/{token}/networks/{}/{STATIC_PORTS}", request.network);

    let mut payload = json!({ "switchSN": serial });
    if let Some(interface) = &request.interface {
        payload["ports"] = json!([interface]);
    }

    let diff = match &existing {
        Some(current) => diff_values(&payload, current, &[]),
        None => Default::default(),
    };

    match decide(request.state, existing.is_some(), diff.is_empty()) {
        Decision::NoOp => Ok(match existing {
            Some(current) => ReconcileOutcome::unchanged(current),
            None => ReconcileOutcome::absent_noop(),
        }),
        Decision::Create => {
            let ops = Patch(vec![patch::add(
                &patch::append_path(&collection_path),
                payload.clone(),
            )?]);
            transmit(client, check_mode, &snapshot.path, &ops).await?;
            info!(network = %request.network, serial, "appended switch binding");
            Ok(ReconcileOutcome::created(payload.clone(), payload))
        }
        Decision::Update => {
            let current = existing.unwrap_or_else(|| json!({}));
            let merged = Value::Object(merge_payload(
                &diff,
                &current.as_object().cloned().unwrap_or_default(),
            ));
            let element_path = element_path(&collection_path, existing_idx.unwrap_or_default());
            let ops = Patch(vec![patch::replace(&element_path, merged.clone())?]);
            transmit(client, check_mode, &snapshot.path, &ops).await?;
            info!(network = %request.network, serial, "replaced switch binding");
            Ok(ReconcileOutcome::updated(current, merged.clone(), merged))
        }
        Decision::Remove => {
            let element_path = element_path(&collection_path, existing_idx.unwrap_or_default());
            let ops = Patch(vec![patch::remove(&element_path)?]);
            transmit(client, check_mode, &snapshot.path, &ops).await?;
            info!(network = %request.network, serial, "removed switch binding");
            Ok(ReconcileOutcome::removed(existing.unwrap_or_else(|| json!({}))))
        }
    }
}

fn element_path(collection_path: &str, idx: usize) -> String {
    format!("{collection_path}/{idx}")
}

fn binding_serials(ports: &[Value]) -> Vec<String> {
    ports
        .iter()
        .filter_map(|p| p.get("switchSN").and_then(Value::as_str))
        .map(str::to_string)
        .collect()
}

async fn transmit(client: &OrchClient, check_mode: bool, path: &str, ops: &Patch) -> Result<()> {
    if check_mode {
        debug!(%path, "check mode: patch transmission suppressed");
        return Ok(());
    }
    client.patch(path, &patch::to_body(ops)?).await?;
    Ok(())
}
