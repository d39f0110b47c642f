//! Template deployment, undeployment and deployment status against the task
//! endpoint. These are imperative actions rather than converged state, so they
//! return the raw service response instead of a reconcile outcome.

use serde_json::{Value, json};
use tracing::{debug, info};

use fabricctl_client::OrchClient;
use fabricctl_core::{Error, Result, normalize_template_name};

use crate::snapshot;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeployAction {
    Deploy,
    Undeploy,
    Status,
}

#[derive(Debug, Clone)]
pub struct DeployRequest {
    pub schema: String,
    pub template: String,
    /// Site to pull the template from. Required for undeploy only.
    pub site: Option<String>,
    pub action: DeployAction,
}

pub(crate) async fn run(
    client: &OrchClient,
    check_mode: bool,
    request: &DeployRequest,
) -> Result<Value> {
    let template = normalize_template_name(&request.template);

    if request.action == DeployAction::Undeploy && request.site.is_none() {
        return Err(Error::invalid_input("'site' is required for undeploy"));
    }

    let schema_id = snapshot::lookup_schema_id(client, &request.schema).await?;

    if request.action == DeployAction::Status {
        let path = format!("status/schema/{schema_id}/template/{template}");
        return client.get(&path).await;
    }

    let mut payload = json!({
        "schemaId": schema_id,
        "templateName": template,
    });
    if let Some(site) = &request.site {
        if request.action == DeployAction::Undeploy {
            let site_id = snapshot::resolve_site(client, site).await?;
            payload["undeploy"] = json!([site_id]);
        }
    }

    if check_mode {
        debug!(schema = %request.schema, template = %template, "check mode: task submission suppressed");
        return Ok(payload);
    }
    let response = client.post("task", &payload).await?;
    info!(schema = %request.schema, template = %template, "submitted deployment task");
    Ok(response)
}
