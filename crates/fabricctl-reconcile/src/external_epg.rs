//! Template external EPGs, converged with the whole-document strategy.
//!
//! An external EPG has a template-level record and a site-level overlay record
//! that must stay consistent; both are mutated in the fetched document and the
//! entire schema is submitted back in a single PUT. The two records are paired
//! by name identity through the overlay's `externalEpgRef` reference string,
//! never by array position.

use serde_json::{Map, Value, json};
use tracing::{debug, info};

use fabricctl_client::OrchClient;
use fabricctl_core::diff::{diff_values, merge_payload};
use fabricctl_core::{
    DesiredState, EntityRef, Error, RefTarget, Result, normalize_template_name,
};

use crate::driver::{Decision, ReconcileOutcome, decide};
use crate::snapshot::{self, SchemaSnapshot};

/// Substructures owned by independent reconciliation flows; never compared,
/// never overwritten.
pub const EXCLUDED_KEYS: &[&str] = &["subnets", "contractRelationships"];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum EpgType {
    #[default]
    OnPremise,
    Cloud,
}

impl EpgType {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::OnPremise => "on-premise",
            Self::Cloud => "cloud",
        }
    }
}

/// Desired-state descriptor for one external EPG.
#[derive(Debug, Clone)]
pub struct ExternalEpgRequest {
    pub schema: String,
    pub template: String,
    pub site: String,
    /// EPG name. Optional only for querying the full collection.
    pub name: Option<String>,
    pub description: Option<String>,
    pub display_name: Option<String>,
    /// VRF the EPG belongs to; schema/template default to the current ones.
    pub vrf: RefTarget,
    /// L3Out providing external reachability, resolved name-to-uuid against
    /// its owning L3Out template.
    pub l3out: RefTarget,
    /// Application network profile; mandatory for cloud-type EPGs.
    pub anp: Option<RefTarget>,
    pub preferred_group: bool,
    pub epg_type: EpgType,
    pub qos_level: String,
    pub state: DesiredState,
}

/// Template-side and site-side records of one EPG, located independently by
/// name identity.
#[derive(Debug, Clone, Default)]
struct OverlayPair {
    template: Option<(usize, Value)>,
    site: Option<(usize, Value)>,
}

impl OverlayPair {
    fn locate(doc: &Value, template_idx: usize, site_idx: usize, epg_ref: &str, name: &str) -> Self {
        let template_epgs = snapshot::array_at(&doc["templates"][template_idx], "externalEpgs");
        let site_epgs = snapshot::array_at(&doc["sites"][site_idx], "externalEpgs");
        Self {
            template: snapshot::entity_index(template_epgs, name)
                .map(|idx| (idx, template_epgs[idx].clone())),
            site: snapshot::entity_index_by_ref(site_epgs, "externalEpgRef", epg_ref)
                .map(|idx| (idx, site_epgs[idx].clone())),
        }
    }

    fn exists(&self) -> bool {
        self.template.is_some() || self.site.is_some()
    }
}

pub(crate) async fn reconcile(
    client: &OrchClient,
    check_mode: bool,
    request: &ExternalEpgRequest,
) -> Result<ReconcileOutcome> {
    let template = normalize_template_name(&request.template);

    // Input-shape validation happens before any remote call; reference
    // resolution happens after the snapshot fetch.
    if request.epg_type == EpgType::Cloud && request.anp.is_none() {
        return Err(Error::invalid_input(
            "Cloud-type external EPGs require an 'anp' reference",
        ));
    }
    if request.state.is_mutating() && request.name.is_none() {
        return Err(Error::invalid_input(
            "'name' is required for present and absent states",
        ));
    }

    let snapshot = snapshot::fetch_schema(client, &request.schema).await?;
    let template_idx = snapshot.template_index(&template)?;
    let site_id = snapshot::resolve_site(client, &request.site).await?;
    let site_idx = snapshot.site_template_index(&site_id, &template, &request.site)?;

    let template_epgs = snapshot::array_at(&snapshot.doc["templates"][template_idx], "externalEpgs");
    if request.state == DesiredState::Query {
        return match request.name.as_deref() {
            None => Ok(ReconcileOutcome::query(Value::Array(
                template_epgs.to_vec(),
            ))),
            Some(name) => snapshot::entity_index(template_epgs, name)
                .map(|idx| ReconcileOutcome::query(template_epgs[idx].clone()))
                .ok_or_else(|| {
                    Error::entity_not_found(
                        "External EPG",
                        name,
                        snapshot::entity_names(template_epgs),
                    )
                }),
        };
    }
    let name = request.name.as_deref().unwrap_or_default();
    let epg_ref = EntityRef::new(&snapshot.id, &template, "externalEpgs", name).to_path();

    if request.state == DesiredState::Absent {
        let pair = OverlayPair::locate(&snapshot.doc, template_idx, site_idx, &epg_ref, name);
        if !pair.exists() {
            return Ok(ReconcileOutcome::absent_noop());
        }
        let mut doc = snapshot.doc.clone();
        // Each side is removed at its own located index; removing the
        // template entity cascades to its overlay in the same call.
        if let Some((idx, _)) = pair.template {
            remove_entity(&mut doc["templates"][template_idx], "externalEpgs", idx);
        }
        if let Some((idx, _)) = pair.site {
            remove_entity(&mut doc["sites"][site_idx], "externalEpgs", idx);
        }
        transmit(client, check_mode, &snapshot.path, &doc).await?;
        info!(epg = name, "removed external EPG and site overlay");
        return Ok(ReconcileOutcome::removed(
            pair.template
                .map(|(_, record)| record)
                .unwrap_or_else(|| json!({})),
        ));
    }

    // Pre-mutation gating: every cross-entity reference must resolve before
    // anything is transmitted.
    let vrf_ref = resolve_vrf(client, &snapshot, request, &template).await?;
    let l3out_uuid = resolve_l3out(client, &request.l3out, &template).await?;
    let desired_template = desired_template_record(request, name, &vrf_ref, &epg_ref);
    let mut desired_site = json!({
        "subnets": [],
        "l3outRef": l3out_uuid,
        "routeReachabilityInternetType": "internet",
        "l3outDn": "",
        "externalEpgRef": epg_ref,
    });
    if let Some(anp) = &request.anp {
        let anp_schema = if anp.schema_or(&request.schema) == request.schema {
            snapshot.id.clone()
        } else {
            snapshot::lookup_schema_id(client, anp.schema_or(&request.schema)).await?
        };
        desired_site["anpRef"] =
            json!(EntityRef::new(anp_schema, anp.template_or(&template), "anps", &anp.name).to_path());
    }

    let pair = OverlayPair::locate(&snapshot.doc, template_idx, site_idx, &epg_ref, name);

    let (template_diff, site_diff) = match (&pair.template, &pair.site) {
        (Some((_, current)), site) => {
            let template_diff = diff_values(&desired_template, current, EXCLUDED_KEYS);
            // A missing overlay for an existing template record is drift: the
            // whole desired overlay is the diff.
            let site_diff = match site {
                Some((_, current_site)) => diff_values(&desired_site, current_site, EXCLUDED_KEYS),
                None => desired_site.as_object().cloned().unwrap_or_default(),
            };
            (template_diff, site_diff)
        }
        _ => Default::default(),
    };
    let diff_empty = template_diff.is_empty() && site_diff.is_empty();

    // The template-level record is authoritative for existence; an orphan
    // overlay alone is drift the create path repairs in place.
    match decide(request.state, pair.template.is_some(), diff_empty) {
        Decision::NoOp => Ok(match pair.template {
            Some((_, current)) => ReconcileOutcome::unchanged(current),
            None => ReconcileOutcome::absent_noop(),
        }),
        Decision::Create => {
            let mut doc = snapshot.doc.clone();
            push_entity(
                &mut doc["templates"][template_idx],
                "externalEpgs",
                desired_template.clone(),
            );
            // An overlay left behind by an earlier partial removal is
            // overwritten in place rather than duplicated.
            match &pair.site {
                Some((idx, _)) => {
                    doc["sites"][site_idx]["externalEpgs"][*idx] = desired_site.clone();
                }
                None => push_entity(&mut doc["sites"][site_idx], "externalEpgs", desired_site.clone()),
            }
            transmit(client, check_mode, &snapshot.path, &doc).await?;
            info!(epg = name, "created external EPG with site overlay");
            Ok(ReconcileOutcome::created(
                desired_template,
                json!({ "template": doc["templates"][template_idx]["externalEpgs"],
                        "site": doc["sites"][site_idx]["externalEpgs"] }),
            ))
        }
        Decision::Update => {
            let mut doc = snapshot.doc.clone();
            let previous = pair
                .template
                .as_ref()
                .map(|(_, record)| record.clone())
                .unwrap_or_else(|| json!({}));
            let mut merged_template = previous.clone();

            if let Some((idx, current)) = &pair.template {
                if !template_diff.is_empty() {
                    merged_template = merge_record(&template_diff, current);
                    doc["templates"][template_idx]["externalEpgs"][*idx] =
                        merged_template.clone();
                }
            }
            match &pair.site {
                Some((idx, current_site)) => {
                    if !site_diff.is_empty() {
                        doc["sites"][site_idx]["externalEpgs"][*idx] =
                            merge_record(&site_diff, current_site);
                    }
                }
                None => push_entity(&mut doc["sites"][site_idx], "externalEpgs", desired_site),
            }

            transmit(client, check_mode, &snapshot.path, &doc).await?;
            info!(epg = name, "updated external EPG");
            Ok(ReconcileOutcome::updated(
                previous,
                merged_template,
                json!({ "template": Value::Object(template_diff),
                        "site": Value::Object(site_diff) }),
            ))
        }
        // Absent returned earlier; query and absent-on-missing never reach a
        // computed diff.
        Decision::Remove => unreachable!("absent handled before reference resolution"),
    }
}

fn desired_template_record(
    request: &ExternalEpgRequest,
    name: &str,
    vrf_ref: &str,
    epg_ref: &str,
) -> Value {
    json!({
        "name": name,
        "displayName": request.display_name.as_deref().unwrap_or(name),
        "vrfRef": vrf_ref,
        "externalEpgRef": epg_ref,
        "preferredGroup": request.preferred_group,
        "subnets": [],
        "contractRelationships": [],
        "extEpgType": request.epg_type.as_str(),
        "selectors": [],
        "qosPriority": request.qos_level,
        "description": request.description.as_deref().unwrap_or(""),
        "tagAnnotations": [],
    })
}

/// Verifies the referenced VRF exists in its owning schema and renders the
/// persisted reference string.
async fn resolve_vrf(
    client: &OrchClient,
    snapshot: &SchemaSnapshot,
    request: &ExternalEpgRequest,
    current_template: &str,
) -> Result<String> {
    let vrf_schema_name = request.vrf.schema_or(&request.schema);
    let vrf_template = request.vrf.template_or(current_template);

    let owned;
    let vrf_snapshot = if vrf_schema_name == request.schema {
        snapshot
    } else {
        owned = snapshot::fetch_schema(client, vrf_schema_name).await?;
        &owned
    };

    let template_idx = vrf_snapshot
        .template_index(&vrf_template)
        .map_err(|_| Error::reference_unresolved("VRF template", &vrf_template))?;
    let vrfs = snapshot::array_at(&vrf_snapshot.doc["templates"][template_idx], "vrfs");
    if snapshot::entity_index(vrfs, &request.vrf.name).is_none() {
        return Err(Error::reference_unresolved("VRF", &request.vrf.name));
    }

    Ok(EntityRef::new(&vrf_snapshot.id, &vrf_template, "vrfs", &request.vrf.name).to_path())
}

/// Resolves an L3Out name to its uuid through the template summaries and the
/// owning L3Out template document.
async fn resolve_l3out(
    client: &OrchClient,
    l3out: &RefTarget,
    current_template: &str,
) -> Result<String> {
    let template_name = l3out.template_or(current_template);
    let summaries = client.get("templates/summaries").await?;
    let template_id = summaries
        .as_array()
        .into_iter()
        .flatten()
        .find(|t| {
            t.get("templateName").and_then(Value::as_str) == Some(template_name.as_str())
                && t.get("templateType").and_then(Value::as_str) == Some("l3out")
        })
        .and_then(|t| t.get("templateId").and_then(Value::as_str))
        .map(str::to_string)
        .ok_or_else(|| Error::reference_unresolved("L3Out template", &template_name))?;

    let template_doc = client.get(&format!("templates/{template_id}")).await?;
    debug!(template = %template_name, id = %template_id, "resolved L3Out template");

    let l3outs = snapshot::array_at(&template_doc["l3outTemplate"], "l3outs");
    snapshot::entity_index(l3outs, &l3out.name)
        .and_then(|idx| l3outs[idx].get("uuid").and_then(Value::as_str))
        .map(str::to_string)
        .ok_or_else(|| Error::reference_unresolved("L3Out", &l3out.name))
}

fn push_entity(parent: &mut Value, key: &str, entity: Value) {
    let slot = &mut parent[key];
    if !slot.is_array() {
        *slot = Value::Array(Vec::new());
    }
    if let Some(collection) = slot.as_array_mut() {
        collection.push(entity);
    }
}

fn remove_entity(parent: &mut Value, key: &str, idx: usize) {
    if let Some(collection) = parent.get_mut(key).and_then(Value::as_array_mut) {
        if idx < collection.len() {
            collection.remove(idx);
        }
    }
}

fn merge_record(diff: &Map<String, Value>, current: &Value) -> Value {
    Value::Object(merge_payload(
        diff,
        &current.as_object().cloned().unwrap_or_default(),
    ))
}

async fn transmit(client: &OrchClient, check_mode: bool, path: &str, doc: &Value) -> Result<()> {
    if check_mode {
        debug!(%path, "check mode: document replace suppressed");
        return Ok(());
    }
    client.put(path, doc).await?;
    Ok(())
}
