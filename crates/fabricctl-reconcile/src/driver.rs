//! The reconciliation driver: the transition table deciding whether a mutating
//! transmission is needed at all, and the explicit per-call outcome each
//! decision step returns and passes forward.

use serde::Serialize;
use serde_json::{Value, json};

use fabricctl_client::OrchClient;
use fabricctl_core::{DesiredState, Result};

use crate::{deploy, external_epg, interface_policy, switch_binding};

/// What a reconciliation pass must do, given the requested state, whether the
/// entity currently exists, and whether the computed diff is empty.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    /// Nothing to transmit; report current state as-is.
    NoOp,
    /// Construct and append a new entity (plus overlay where the kind has one).
    Create,
    /// Merge the diff into the existing record(s).
    Update,
    /// Remove the entity plus its paired overlay.
    Remove,
}

impl Decision {
    /// Whether this decision leads to the pass's single mutating transmission.
    pub fn transmits(self) -> bool {
        !matches!(self, Self::NoOp)
    }
}

/// The transition table. Query never mutates; absent-on-missing is a no-op
/// success; present creates when absent, updates only on a non-empty diff.
pub fn decide(state: DesiredState, exists: bool, diff_empty: bool) -> Decision {
    match (state, exists) {
        (DesiredState::Query, _) => Decision::NoOp,
        (DesiredState::Absent, false) => Decision::NoOp,
        (DesiredState::Absent, true) => Decision::Remove,
        (DesiredState::Present, false) => Decision::Create,
        (DesiredState::Present, true) => {
            if diff_empty {
                Decision::NoOp
            } else {
                Decision::Update
            }
        }
    }
}

/// Result of one reconciliation pass.
///
/// Built and returned by each flow rather than accumulated on shared mutable
/// state: `previous` is the record before the pass, `current` the (possibly
/// predicted) record after it, `proposed` the record the caller asked for, and
/// `sent` what the mutating transmission carried, when there was one.
#[derive(Debug, Clone, Serialize)]
pub struct ReconcileOutcome {
    pub previous: Value,
    pub current: Value,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub proposed: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sent: Option<Value>,
    pub changed: bool,
}

impl ReconcileOutcome {
    /// A non-mutating read: previous and current are the same record.
    pub fn query(found: Value) -> Self {
        Self {
            previous: found.clone(),
            current: found,
            proposed: None,
            sent: None,
            changed: false,
        }
    }

    /// Present request against an already-converged entity.
    pub fn unchanged(existing: Value) -> Self {
        Self {
            previous: existing.clone(),
            current: existing,
            proposed: None,
            sent: None,
            changed: false,
        }
    }

    /// Absent request against an entity that was never there.
    pub fn absent_noop() -> Self {
        Self {
            previous: json!({}),
            current: json!({}),
            proposed: None,
            sent: None,
            changed: false,
        }
    }

    pub fn created(current: Value, sent: Value) -> Self {
        Self {
            previous: json!({}),
            proposed: Some(current.clone()),
            current,
            sent: Some(sent),
            changed: true,
        }
    }

    pub fn updated(previous: Value, current: Value, sent: Value) -> Self {
        Self {
            previous,
            proposed: Some(current.clone()),
            current,
            sent: Some(sent),
            changed: true,
        }
    }

    pub fn removed(previous: Value) -> Self {
        Self {
            previous,
            current: json!({}),
            proposed: Some(json!({})),
            sent: Some(json!({})),
            changed: true,
        }
    }
}

/// Entry point tying the flows to one client and one check-mode setting.
///
/// Each call is synchronous from the caller's perspective: fetch a snapshot,
/// compute, transmit at most once, return. Concurrent callers against the same
/// schema are not coordinated; the remote service resolves such races
/// last-writer-wins.
pub struct Reconciler {
    client: OrchClient,
    check_mode: bool,
}

impl Reconciler {
    pub fn new(client: OrchClient) -> Self {
        Self {
            client,
            check_mode: false,
        }
    }

    /// Check mode runs every computation, including path and payload
    /// construction, but suppresses the mutating transmission.
    pub fn with_check_mode(mut self, check_mode: bool) -> Self {
        self.check_mode = check_mode;
        self
    }

    pub fn client(&self) -> &OrchClient {
        &self.client
    }

    pub fn check_mode(&self) -> bool {
        self.check_mode
    }

    pub async fn switch_binding(
        &self,
        request: &switch_binding::SwitchBindingRequest,
    ) -> Result<ReconcileOutcome> {
        switch_binding::reconcile(&self.client, self.check_mode, request).await
    }

    pub async fn external_epg(
        &self,
        request: &external_epg::ExternalEpgRequest,
    ) -> Result<ReconcileOutcome> {
        external_epg::reconcile(&self.client, self.check_mode, request).await
    }

    pub async fn interface_policy(
        &self,
        request: &interface_policy::InterfacePolicyRequest,
    ) -> Result<ReconcileOutcome> {
        interface_policy::reconcile(&self.client, self.check_mode, request).await
    }

    pub async fn deploy(&self, request: &deploy::DeployRequest) -> Result<Value> {
        deploy::run(&self.client, self.check_mode, request).await
    }
}
