//! End-to-end reconciliation tests against a mocked orchestration service.
//!
//! Every test asserts both the returned outcome and the number of mutating
//! transmissions the pass produced. At most one mutating call per pass is an
//! invariant, so mutation mocks carry explicit expectations.

use assert_json_diff::assert_json_include;
use serde_json::{Value, json};
use wiremock::matchers::{body_json, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use fabricctl_client::OrchClient;
use fabricctl_core::{DesiredState, Error, RefTarget};
use fabricctl_reconcile::deploy::{DeployAction, DeployRequest};
use fabricctl_reconcile::external_epg::{EpgType, ExternalEpgRequest};
use fabricctl_reconcile::interface_policy::{BfdSettings, InterfacePolicyRequest};
use fabricctl_reconcile::switch_binding::SwitchBindingRequest;
use fabricctl_reconcile::Reconciler;

fn schema_doc() -> Value {
    json!({
        "id": "s1",
        "displayName": "Schema1",
        "templates": [{
            "name": "Template1",
            "networks": [{"name": "N1"}],
            "vrfs": [{"name": "VRF1"}],
            "externalEpgs": [{
                "name": "E1",
                "displayName": "E1",
                "vrfRef": "/schemas/s1/templates/Template1/vrfs/VRF1",
                "externalEpgRef": "/schemas/s1/templates/Template1/externalEpgs/E1",
                "preferredGroup": false,
                "subnets": [],
                "contractRelationships": [],
                "extEpgType": "on-premise",
                "selectors": [],
                "qosPriority": "unspecified",
                "description": "",
                "tagAnnotations": []
            }]
        }],
        "sites": [{
            "siteId": "site-a",
            "templateName": "Template1",
            "networks": [{
                "nwRef": "/schemas/s1/templates/Template1/networks/N1",
                "dcnmStaticPorts": [{"switchSN": "FDO1", "ports": ["eth1/1"]}]
            }],
            "externalEpgs": [{
                "externalEpgRef": "/schemas/s1/templates/Template1/externalEpgs/E1",
                "subnets": [],
                "l3outRef": "uuid-l3o1",
                "routeReachabilityInternetType": "internet",
                "l3outDn": ""
            }]
        }]
    })
}

/// Read-only mocks every flow starts from: schema listing, schema document,
/// and site listing.
async fn mount_schema_fixtures(server: &MockServer) {
    Mock::given(method("GET"))
        .and(path("/api/v1/schemas"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "schemas": [{"id": "s1", "displayName": "Schema1"}]
        })))
        .mount(server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/v1/schemas/s1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(schema_doc()))
        .mount(server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/v1/sites"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "sites": [
                {"id": "site-a", "name": "SiteA"},
                {"id": "site-b", "name": "SiteB"}
            ]
        })))
        .mount(server)
        .await;
}

/// Template summaries plus the L3Out template document, needed whenever an
/// external EPG pass reaches reference resolution.
async fn mount_l3out_fixtures(server: &MockServer) {
    Mock::given(method("GET"))
        .and(path("/api/v1/templates/summaries"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            {"templateName": "Template1", "templateType": "l3out", "templateId": "l3-1"},
            {"templateName": "TP1", "templateType": "tenantPolicy", "templateId": "tp-1"}
        ])))
        .mount(server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/v1/templates/l3-1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "l3outTemplate": {"l3outs": [{"name": "L3O1", "uuid": "uuid-l3o1"}]}
        })))
        .mount(server)
        .await;
}

fn reconciler(server: &MockServer) -> Reconciler {
    Reconciler::new(OrchClient::with_token(&server.uri(), "session-token"))
}

fn binding_request(serial: &str, interface: &str, state: DesiredState) -> SwitchBindingRequest {
    SwitchBindingRequest {
        schema: "Schema1".to_string(),
        site: "SiteA".to_string(),
        template: "Template1".to_string(),
        network: "N1".to_string(),
        serial_number: Some(serial.to_string()),
        interface: Some(interface.to_string()),
        state,
    }
}

fn epg_request(name: &str, state: DesiredState) -> ExternalEpgRequest {
    ExternalEpgRequest {
        schema: "Schema1".to_string(),
        template: "Template1".to_string(),
        site: "SiteA".to_string(),
        name: Some(name.to_string()),
        description: None,
        display_name: None,
        vrf: RefTarget::named("VRF1"),
        l3out: RefTarget::named("L3O1"),
        anp: None,
        preferred_group: false,
        epg_type: EpgType::OnPremise,
        qos_level: "unspecified".to_string(),
        state,
    }
}

async fn mutating_requests(server: &MockServer) -> Vec<wiremock::Request> {
    server
        .received_requests()
        .await
        .unwrap_or_default()
        .into_iter()
        .filter(|r| matches!(r.method.as_str(), "PUT" | "PATCH" | "POST"))
        .collect()
}

#[tokio::test]
async fn test_switch_binding_create_appends_targeted_patch() {
    let server = MockServer::start().await;
    mount_schema_fixtures(&server).await;
    Mock::given(method("PATCH"))
        .and(path("/api/v1/schemas/s1"))
        .and(body_json(json!([{
            "op": "add",
            "path": "/sites/site-a-Template1/networks/N1/dcnmStaticPorts/-",
            "value": {"switchSN": "FDO2", "ports": ["eth1/2"]}
        }])))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({})))
        .expect(1)
        .mount(&server)
        .await;

    let outcome = reconciler(&server)
        .switch_binding(&binding_request("FDO2", "eth1/2", DesiredState::Present))
        .await
        .unwrap();

    assert!(outcome.changed);
    assert_eq!(outcome.previous, json!({}));
    assert_eq!(outcome.current["switchSN"], "FDO2");
    assert!(outcome.sent.is_some());
}

#[tokio::test]
async fn test_switch_binding_converged_present_transmits_nothing() {
    let server = MockServer::start().await;
    mount_schema_fixtures(&server).await;
    Mock::given(method("PATCH"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    let outcome = reconciler(&server)
        .switch_binding(&binding_request("FDO1", "eth1/1", DesiredState::Present))
        .await
        .unwrap();

    assert!(!outcome.changed);
    assert_eq!(outcome.previous, outcome.current);
    assert!(outcome.sent.is_none());
}

#[tokio::test]
async fn test_switch_binding_absent_on_missing_is_noop_success() {
    let server = MockServer::start().await;
    mount_schema_fixtures(&server).await;
    Mock::given(method("PATCH"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    let outcome = reconciler(&server)
        .switch_binding(&binding_request("FDO9", "eth1/9", DesiredState::Absent))
        .await
        .unwrap();

    assert!(!outcome.changed);
    assert_eq!(outcome.previous, json!({}));
    assert_eq!(outcome.current, json!({}));
}

#[tokio::test]
async fn test_switch_binding_absent_removes_at_located_index() {
    let server = MockServer::start().await;
    mount_schema_fixtures(&server).await;
    Mock::given(method("PATCH"))
        .and(path("/api/v1/schemas/s1"))
        .and(body_json(json!([{
            "op": "remove",
            "path": "/sites/site-a-Template1/networks/N1/dcnmStaticPorts/0"
        }])))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({})))
        .expect(1)
        .mount(&server)
        .await;

    let outcome = reconciler(&server)
        .switch_binding(&binding_request("FDO1", "eth1/1", DesiredState::Absent))
        .await
        .unwrap();

    assert!(outcome.changed);
    assert_eq!(outcome.previous["switchSN"], "FDO1");
    assert_eq!(outcome.current, json!({}));
}

#[tokio::test]
async fn test_check_mode_computes_but_suppresses_transmission() {
    let server = MockServer::start().await;
    mount_schema_fixtures(&server).await;
    Mock::given(method("PATCH"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    let outcome = reconciler(&server)
        .with_check_mode(true)
        .switch_binding(&binding_request("FDO2", "eth1/2", DesiredState::Present))
        .await
        .unwrap();

    // The outcome reports the predicted converged state.
    assert!(outcome.changed);
    assert_eq!(outcome.current["switchSN"], "FDO2");
    assert_eq!(outcome.current["ports"], json!(["eth1/2"]));
}

#[tokio::test]
async fn test_association_gate_blocks_before_any_mutation() {
    let server = MockServer::start().await;
    mount_schema_fixtures(&server).await;

    let mut request = binding_request("FDO2", "eth1/2", DesiredState::Present);
    request.site = "SiteB".to_string();
    let err = reconciler(&server)
        .switch_binding(&request)
        .await
        .unwrap_err();

    assert!(matches!(err, Error::AssociationMissing { .. }));
    assert!(mutating_requests(&server).await.is_empty());
}

#[tokio::test]
async fn test_switch_binding_query_without_serial_lists_collection() {
    let server = MockServer::start().await;
    mount_schema_fixtures(&server).await;

    let mut request = binding_request("FDO1", "eth1/1", DesiredState::Query);
    request.serial_number = None;
    let outcome = reconciler(&server).switch_binding(&request).await.unwrap();

    assert!(!outcome.changed);
    assert_eq!(outcome.current, json!([{"switchSN": "FDO1", "ports": ["eth1/1"]}]));
}

#[tokio::test]
async fn test_external_epg_create_puts_whole_document_once() {
    let server = MockServer::start().await;
    mount_schema_fixtures(&server).await;
    mount_l3out_fixtures(&server).await;
    Mock::given(method("PUT"))
        .and(path("/api/v1/schemas/s1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({})))
        .expect(1)
        .mount(&server)
        .await;

    let outcome = reconciler(&server)
        .external_epg(&epg_request("E2", DesiredState::Present))
        .await
        .unwrap();

    assert!(outcome.changed);
    assert_eq!(outcome.current["name"], "E2");
    assert_eq!(
        outcome.current["vrfRef"],
        "/schemas/s1/templates/Template1/vrfs/VRF1"
    );

    // Both sides of the pair land in the single submitted document.
    let sent = mutating_requests(&server).await;
    assert_eq!(sent.len(), 1);
    let doc: Value = sent[0].body_json().unwrap();
    assert_json_include!(
        actual: doc.clone(),
        expected: json!({"templates": [{"externalEpgs": [{"name": "E1"}, {"name": "E2"}]}]})
    );
    let site_epgs = doc["sites"][0]["externalEpgs"].as_array().unwrap();
    assert_eq!(site_epgs.len(), 2);
    assert_eq!(
        site_epgs[1]["externalEpgRef"],
        "/schemas/s1/templates/Template1/externalEpgs/E2"
    );
    assert_eq!(site_epgs[1]["l3outRef"], "uuid-l3o1");
}

#[tokio::test]
async fn test_external_epg_converged_present_transmits_nothing() {
    let server = MockServer::start().await;
    mount_schema_fixtures(&server).await;
    mount_l3out_fixtures(&server).await;
    Mock::given(method("PUT"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    let outcome = reconciler(&server)
        .external_epg(&epg_request("E1", DesiredState::Present))
        .await
        .unwrap();

    assert!(!outcome.changed);
    assert_eq!(outcome.current["name"], "E1");
}

#[tokio::test]
async fn test_external_epg_unresolved_vrf_aborts_without_mutation() {
    let server = MockServer::start().await;
    mount_schema_fixtures(&server).await;
    mount_l3out_fixtures(&server).await;

    let mut request = epg_request("E2", DesiredState::Present);
    request.vrf = RefTarget::named("VRF9");
    let err = reconciler(&server)
        .external_epg(&request)
        .await
        .unwrap_err();

    assert!(matches!(err, Error::ReferenceUnresolved { .. }));
    assert!(mutating_requests(&server).await.is_empty());
}

#[tokio::test]
async fn test_external_epg_absent_removes_both_records() {
    let server = MockServer::start().await;
    mount_schema_fixtures(&server).await;
    mount_l3out_fixtures(&server).await;
    Mock::given(method("PUT"))
        .and(path("/api/v1/schemas/s1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({})))
        .expect(1)
        .mount(&server)
        .await;

    let outcome = reconciler(&server)
        .external_epg(&epg_request("E1", DesiredState::Absent))
        .await
        .unwrap();

    assert!(outcome.changed);
    let sent = mutating_requests(&server).await;
    let doc: Value = sent[0].body_json().unwrap();
    assert!(doc["templates"][0]["externalEpgs"].as_array().unwrap().is_empty());
    assert!(doc["sites"][0]["externalEpgs"].as_array().unwrap().is_empty());
}

#[tokio::test]
async fn test_external_epg_cloud_requires_anp_before_any_call() {
    let server = MockServer::start().await;

    let mut request = epg_request("E2", DesiredState::Present);
    request.epg_type = EpgType::Cloud;
    let err = reconciler(&server)
        .external_epg(&request)
        .await
        .unwrap_err();

    assert!(matches!(err, Error::InvalidInput(_)));
    assert!(server.received_requests().await.unwrap_or_default().is_empty());
}

#[tokio::test]
async fn test_interface_policy_create_includes_bfd_subpolicy() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/v1/templates/summaries"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            {"templateName": "TP1", "templateType": "tenantPolicy", "templateId": "tp-1"}
        ])))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/v1/templates/tp-1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "tenantPolicyTemplate": {"template": {}}
        })))
        .mount(&server)
        .await;
    Mock::given(method("PUT"))
        .and(path("/api/v1/templates/tp-1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({})))
        .expect(1)
        .mount(&server)
        .await;

    let outcome = reconciler(&server)
        .interface_policy(&InterfacePolicyRequest {
            template: "TP1".to_string(),
            name: Some("pg1".to_string()),
            description: None,
            bfd: Some(BfdSettings::default()),
            state: DesiredState::Present,
        })
        .await
        .unwrap();

    assert!(outcome.changed);
    let sent = mutating_requests(&server).await;
    let doc: Value = sent[0].body_json().unwrap();
    let groups = doc["tenantPolicyTemplate"]["template"]["l3OutIntfPolGroups"]
        .as_array()
        .unwrap();
    assert_eq!(groups[0]["name"], "pg1");
    assert_eq!(groups[0]["bfdPol"]["detectionMultiplier"], 3);
    assert_eq!(groups[0]["bfdPol"]["adminState"], "enabled");
}

#[tokio::test]
async fn test_interface_policy_absent_drops_emptied_collection() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/v1/templates/summaries"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            {"templateName": "TP1", "templateType": "tenantPolicy", "templateId": "tp-1"}
        ])))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/v1/templates/tp-1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "tenantPolicyTemplate": {"template": {
                "l3OutIntfPolGroups": [{"name": "pg1"}]
            }}
        })))
        .mount(&server)
        .await;
    Mock::given(method("PUT"))
        .and(path("/api/v1/templates/tp-1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({})))
        .expect(1)
        .mount(&server)
        .await;

    let outcome = reconciler(&server)
        .interface_policy(&InterfacePolicyRequest {
            template: "TP1".to_string(),
            name: Some("pg1".to_string()),
            description: None,
            bfd: None,
            state: DesiredState::Absent,
        })
        .await
        .unwrap();

    assert!(outcome.changed);
    let sent = mutating_requests(&server).await;
    let doc: Value = sent[0].body_json().unwrap();
    assert!(doc["tenantPolicyTemplate"]["template"]
        .get("l3OutIntfPolGroups")
        .is_none());
}

#[tokio::test]
async fn test_interface_policy_missing_template_lists_tenant_policy_names() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/v1/templates/summaries"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            {"templateName": "TP1", "templateType": "tenantPolicy", "templateId": "tp-1"},
            {"templateName": "L3T", "templateType": "l3out", "templateId": "l3-1"}
        ])))
        .mount(&server)
        .await;

    let err = reconciler(&server)
        .interface_policy(&InterfacePolicyRequest {
            template: "TP9".to_string(),
            name: None,
            description: None,
            bfd: None,
            state: DesiredState::Query,
        })
        .await
        .unwrap_err();

    // Only same-type templates are offered as alternatives.
    assert_eq!(
        err.to_string(),
        "Provided template 'TP9' does not exist. Existing templates: TP1"
    );
}

#[tokio::test]
async fn test_deploy_posts_task_payload() {
    let server = MockServer::start().await;
    mount_schema_fixtures(&server).await;
    Mock::given(method("POST"))
        .and(path("/api/v1/task"))
        .and(body_json(json!({
            "schemaId": "s1",
            "templateName": "Template1"
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"id": "task-1"})))
        .expect(1)
        .mount(&server)
        .await;

    let response = reconciler(&server)
        .deploy(&DeployRequest {
            schema: "Schema1".to_string(),
            template: "Template1".to_string(),
            site: None,
            action: DeployAction::Deploy,
        })
        .await
        .unwrap();

    assert_eq!(response["id"], "task-1");
}

#[tokio::test]
async fn test_undeploy_targets_resolved_site() {
    let server = MockServer::start().await;
    mount_schema_fixtures(&server).await;
    Mock::given(method("POST"))
        .and(path("/api/v1/task"))
        .and(body_json(json!({
            "schemaId": "s1",
            "templateName": "Template1",
            "undeploy": ["site-a"]
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"id": "task-2"})))
        .expect(1)
        .mount(&server)
        .await;

    let response = reconciler(&server)
        .deploy(&DeployRequest {
            schema: "Schema1".to_string(),
            template: "Template1".to_string(),
            site: Some("SiteA".to_string()),
            action: DeployAction::Undeploy,
        })
        .await
        .unwrap();

    assert_eq!(response["id"], "task-2");
}

#[tokio::test]
async fn test_undeploy_without_site_is_rejected_locally() {
    let server = MockServer::start().await;

    let err = reconciler(&server)
        .deploy(&DeployRequest {
            schema: "Schema1".to_string(),
            template: "Template1".to_string(),
            site: None,
            action: DeployAction::Undeploy,
        })
        .await
        .unwrap_err();

    assert!(matches!(err, Error::InvalidInput(_)));
    assert!(server.received_requests().await.unwrap_or_default().is_empty());
}

#[tokio::test]
async fn test_deploy_check_mode_returns_payload_without_posting() {
    let server = MockServer::start().await;
    mount_schema_fixtures(&server).await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    let payload = reconciler(&server)
        .with_check_mode(true)
        .deploy(&DeployRequest {
            schema: "Schema1".to_string(),
            template: "Template1".to_string(),
            site: None,
            action: DeployAction::Deploy,
        })
        .await
        .unwrap();

    assert_eq!(payload, json!({"schemaId": "s1", "templateName": "Template1"}));
}

#[tokio::test]
async fn test_deploy_status_reads_status_path() {
    let server = MockServer::start().await;
    mount_schema_fixtures(&server).await;
    Mock::given(method("GET"))
        .and(path("/api/v1/status/schema/s1/template/Template1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "status": [{"siteId": "site-a", "state": "Deployed"}]
        })))
        .expect(1)
        .mount(&server)
        .await;

    let status = reconciler(&server)
        .deploy(&DeployRequest {
            schema: "Schema1".to_string(),
            template: "Template1".to_string(),
            site: None,
            action: DeployAction::Status,
        })
        .await
        .unwrap();

    assert_eq!(status["status"][0]["state"], "Deployed");
}
