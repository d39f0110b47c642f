//! The reconciliation engine.
//!
//! Each call converges one entity inside a remote schema document to a
//! caller-declared desired state: fetch a snapshot, locate the entity by
//! name, diff the desired record against the current one, and transmit at
//! most one mutating call per pass. Depending on the entity kind that call is
//! either a targeted RFC 6902 patch list or a whole-document replace. Check
//! mode runs every computation but suppresses the transmission, reporting the
//! predicted converged state instead.
//!
//! The pieces, leaf-first: [`snapshot`] resolves names to indices over one
//! immutable fetched document, [`patch`] builds the targeted patch lists,
//! [`driver`] holds the transition table and the per-call outcome, and the
//! entity-kind flows ([`switch_binding`], [`external_epg`],
//! [`interface_policy`], plus the [`deploy`] task glue) tie them together.

pub mod deploy;
pub mod driver;
pub mod external_epg;
pub mod interface_policy;
pub mod patch;
pub mod snapshot;
pub mod switch_binding;

pub use deploy::{DeployAction, DeployRequest};
pub use driver::{Decision, ReconcileOutcome, Reconciler, decide};
pub use external_epg::{EpgType, ExternalEpgRequest};
pub use interface_policy::{AdminState, BfdSettings, InterfacePolicyRequest};
pub use snapshot::SchemaSnapshot;
pub use switch_binding::SwitchBindingRequest;
