//! L3Out interface policy groups inside tenant-policy templates, converged
//! with the whole-document strategy against the `templates/{id}` endpoint.
//!
//! Tenant-policy templates are addressed by identifier, resolved by name and
//! type through the template summaries; policy groups live at
//! `tenantPolicyTemplate.template.l3OutIntfPolGroups`.

use serde_json::{Value, json};
use tracing::{debug, info};

use fabricctl_client::OrchClient;
use fabricctl_core::diff::{diff_values, merge_payload};
use fabricctl_core::{DesiredState, Error, Result, normalize_template_name};

use crate::driver::{Decision, ReconcileOutcome, decide};
use crate::snapshot;

const GROUPS_KEY: &str = "l3OutIntfPolGroups";
const TEMPLATE_TYPE: &str = "tenantPolicy";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AdminState {
    #[default]
    Enabled,
    Disabled,
}

impl AdminState {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Enabled => "enabled",
            Self::Disabled => "disabled",
        }
    }
}

/// BFD sub-policy carried by an interface policy group.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BfdSettings {
    pub admin_state: AdminState,
    pub detection_multiplier: u32,
    pub receive_interval: u32,
    pub transmit_interval: u32,
    pub echo_interval: u32,
    pub echo_admin_state: AdminState,
    pub interface_control: bool,
}

impl Default for BfdSettings {
    fn default() -> Self {
        Self {
            admin_state: AdminState::Enabled,
            detection_multiplier: 3,
            receive_interval: 50,
            transmit_interval: 50,
            echo_interval: 50,
            echo_admin_state: AdminState::Enabled,
            interface_control: false,
        }
    }
}

impl BfdSettings {
    fn to_value(&self) -> Value {
        json!({
            "adminState": self.admin_state.as_str(),
            "detectionMultiplier": self.detection_multiplier,
            "minRxInterval": self.receive_interval,
            "minTxInterval": self.transmit_interval,
            "echoAdminState": self.echo_admin_state.as_str(),
            "echoRxInterval": self.echo_interval,
            "ifControl": self.interface_control,
        })
    }
}

/// Desired-state descriptor for one interface policy group.
#[derive(Debug, Clone)]
pub struct InterfacePolicyRequest {
    pub template: String,
    /// Policy group name. Optional only for querying the full collection.
    pub name: Option<String>,
    pub description: Option<String>,
    /// At least one protocol setting must be enabled for a present state.
    pub bfd: Option<BfdSettings>,
    pub state: DesiredState,
}

pub(crate) async fn reconcile(
    client: &OrchClient,
    check_mode: bool,
    request: &InterfacePolicyRequest,
) -> Result<ReconcileOutcome> {
    let template = normalize_template_name(&request.template);

    if request.state.is_mutating() {
        if request.name.is_none() {
            return Err(Error::invalid_input(
                "'name' is required for present and absent states",
            ));
        }
        if request.state == DesiredState::Present && request.bfd.is_none() {
            return Err(Error::invalid_input(
                "At least one protocol setting (BFD) must be enabled",
            ));
        }
    }

    let template_id = resolve_template(client, &template).await?;
    let path = format!("templates/{template_id}");
    let doc = client.get(&path).await?;
    debug!(template = %template, id = %template_id, "fetched tenant-policy template");

    let groups = snapshot::array_at(&doc["tenantPolicyTemplate"]["template"], GROUPS_KEY);
    let existing_idx = request
        .name
        .as_deref()
        .and_then(|name| snapshot::entity_index(groups, name));
    let existing = existing_idx.map(|idx| groups[idx].clone());

    if request.state == DesiredState::Query {
        return match request.name.as_deref() {
            None => Ok(ReconcileOutcome::query(Value::Array(groups.to_vec()))),
            Some(name) => existing.map(ReconcileOutcome::query).ok_or_else(|| {
                Error::entity_not_found(
                    "L3Out interface policy",
                    name,
                    snapshot::entity_names(groups),
                )
            }),
        };
    }
    let name = request.name.as_deref().unwrap_or_default();

    let desired = desired_record(request, name);
    let diff = match &existing {
        Some(current) => diff_values(&desired, current, &[]),
        None => Default::default(),
    };

    match decide(request.state, existing.is_some(), diff.is_empty()) {
        Decision::NoOp => Ok(match existing {
            Some(current) => ReconcileOutcome::unchanged(current),
            None => ReconcileOutcome::absent_noop(),
        }),
        Decision::Create => {
            let mut doc = doc.clone();
            let slot = &mut doc["tenantPolicyTemplate"]["template"][GROUPS_KEY];
            if !slot.is_array() {
                *slot = Value::Array(Vec::new());
            }
            if let Some(collection) = slot.as_array_mut() {
                collection.push(desired.clone());
            }
            transmit(client, check_mode, &path, &doc).await?;
            info!(policy = name, template = %template, "created interface policy group");
            Ok(ReconcileOutcome::created(desired.clone(), desired))
        }
        Decision::Update => {
            let current = existing.unwrap_or_else(|| json!({}));
            let merged = Value::Object(merge_payload(
                &diff,
                &current.as_object().cloned().unwrap_or_default(),
            ));
            let mut doc = doc.clone();
            doc["tenantPolicyTemplate"]["template"][GROUPS_KEY]
                [existing_idx.unwrap_or_default()] = merged.clone();
            transmit(client, check_mode, &path, &doc).await?;
            info!(policy = name, template = %template, "updated interface policy group");
            Ok(ReconcileOutcome::updated(current, merged.clone(), merged))
        }
        Decision::Remove => {
            let mut doc = doc.clone();
            let template_obj = &mut doc["tenantPolicyTemplate"]["template"];
            let emptied = match template_obj.get_mut(GROUPS_KEY).and_then(Value::as_array_mut) {
                Some(collection) => {
                    if let Some(idx) = existing_idx {
                        collection.remove(idx);
                    }
                    collection.is_empty()
                }
                None => false,
            };
            // the service rejects an explicit empty collection
            if emptied {
                if let Some(obj) = template_obj.as_object_mut() {
                    obj.remove(GROUPS_KEY);
                }
            }
            transmit(client, check_mode, &path, &doc).await?;
            info!(policy = name, template = %template, "removed interface policy group");
            Ok(ReconcileOutcome::removed(existing.unwrap_or_else(|| json!({}))))
        }
    }
}

/// Resolves a tenant-policy template name to its identifier through the
/// summaries listing. The error enumerates the tenant-policy templates that do
/// exist.
async fn resolve_template(client: &OrchClient, template: &str) -> Result<String> {
    let summaries = client.get("templates/summaries").await?;
    let mut existing = Vec::new();
    for summary in summaries.as_array().into_iter().flatten() {
        if summary.get("templateType").and_then(Value::as_str) != Some(TEMPLATE_TYPE) {
            continue;
        }
        match summary.get("templateName").and_then(Value::as_str) {
            Some(name) if name == template => {
                if let Some(id) = summary.get("templateId").and_then(Value::as_str) {
                    return Ok(id.to_string());
                }
            }
            Some(name) => existing.push(name.to_string()),
            None => {}
        }
    }
    Err(Error::template_not_found(template, existing))
}

fn desired_record(request: &InterfacePolicyRequest, name: &str) -> Value {
    let mut record = json!({ "name": name });
    if let Some(description) = &request.description {
        record["description"] = json!(description);
    }
    if let Some(bfd) = &request.bfd {
        record["bfdPol"] = bfd.to_value();
    }
    record
}

async fn transmit(client: &OrchClient, check_mode: bool, path: &str, doc: &Value) -> Result<()> {
    if check_mode {
        debug!(%path, "check mode: document replace suppressed");
        return Ok(());
    }
    client.put(path, doc).await?;
    Ok(())
}
