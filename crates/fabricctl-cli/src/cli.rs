use clap::{Parser, Subcommand, ValueEnum};

use fabricctl_core::DesiredState;
use fabricctl_reconcile::external_epg::EpgType;

#[derive(Parser)]
#[command(name = "fabricctl")]
#[command(about = "Converge fabric orchestration schemas to a declared desired state")]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Orchestrator base URL (overrides config and FABRICCTL_HOST env var)
    #[arg(short = 'H', long, global = true, env = "FABRICCTL_HOST")]
    pub host: Option<String>,

    /// Config profile name
    #[arg(
        short,
        long,
        global = true,
        env = "FABRICCTL_PROFILE",
        default_value = "default"
    )]
    pub profile: String,

    /// Output format
    #[arg(short, long, global = true)]
    pub format: Option<OutputFormat>,

    /// Compute the pass but transmit nothing; report the predicted state
    #[arg(long, global = true)]
    pub check: bool,
}

#[derive(Clone, Copy, ValueEnum, Default)]
pub enum OutputFormat {
    #[default]
    Json,
    Table,
}

/// Desired state as presented on the command line.
#[derive(Clone, Copy, ValueEnum, Default)]
pub enum StateArg {
    #[default]
    Present,
    Absent,
    Query,
}

impl From<StateArg> for DesiredState {
    fn from(state: StateArg) -> Self {
        match state {
            StateArg::Present => DesiredState::Present,
            StateArg::Absent => DesiredState::Absent,
            StateArg::Query => DesiredState::Query,
        }
    }
}

#[derive(Clone, Copy, ValueEnum, Default)]
pub enum EpgTypeArg {
    #[default]
    OnPremise,
    Cloud,
}

impl From<EpgTypeArg> for EpgType {
    fn from(epg_type: EpgTypeArg) -> Self {
        match epg_type {
            EpgTypeArg::OnPremise => EpgType::OnPremise,
            EpgTypeArg::Cloud => EpgType::Cloud,
        }
    }
}

#[derive(Subcommand)]
pub enum Commands {
    /// Log in to the orchestrator and store the session token
    Login(LoginArgs),
    /// Log out (remove stored credentials)
    Logout,
    /// Show current auth info
    Whoami,
    /// Manage CLI configuration
    Config(ConfigArgs),
    /// Converge a switch port binding inside a site-local network
    SwitchPort(SwitchPortArgs),
    /// Converge an external EPG and its site overlay
    ExternalEpg(ExternalEpgArgs),
    /// Converge an L3Out interface policy group
    InterfacePolicy(InterfacePolicyArgs),
    /// Deploy a schema template to its associated sites
    Deploy(DeployArgs),
    /// Pull a schema template from one site
    Undeploy(UndeployArgs),
    /// Show per-site deployment status of a schema template
    DeployStatus(DeployStatusArgs),
}

#[derive(clap::Args)]
pub struct LoginArgs {
    /// Username
    #[arg(short, long)]
    pub username: String,
    /// Password
    #[arg(long)]
    pub password: String,
}

#[derive(clap::Args)]
pub struct SwitchPortArgs {
    /// Schema display name
    pub schema: String,
    /// Site name
    pub site: String,
    /// Template name
    pub template: String,
    /// Site-local network name
    pub network: String,
    /// Switch serial number (omit with --state query to list all bindings)
    #[arg(long)]
    pub serial: Option<String>,
    /// Interface to bind (e.g. eth1/12)
    #[arg(long)]
    pub interface: Option<String>,
    #[arg(long, default_value = "present")]
    pub state: StateArg,
}

#[derive(clap::Args)]
pub struct ExternalEpgArgs {
    /// Schema display name
    pub schema: String,
    /// Template name
    pub template: String,
    /// Site name
    pub site: String,
    /// External EPG name (omit with --state query to list all)
    #[arg(long)]
    pub name: Option<String>,
    #[arg(long)]
    pub display_name: Option<String>,
    #[arg(long)]
    pub description: Option<String>,
    /// VRF name the EPG attaches to
    #[arg(long)]
    pub vrf: Option<String>,
    /// Schema owning the VRF (defaults to the EPG's schema)
    #[arg(long)]
    pub vrf_schema: Option<String>,
    /// Template owning the VRF (defaults to the EPG's template)
    #[arg(long)]
    pub vrf_template: Option<String>,
    /// L3Out name providing external reachability
    #[arg(long)]
    pub l3out: Option<String>,
    /// L3Out template owning the L3Out (defaults to the EPG's template)
    #[arg(long)]
    pub l3out_template: Option<String>,
    /// Application profile, required for cloud-type EPGs
    #[arg(long)]
    pub anp: Option<String>,
    #[arg(long)]
    pub preferred_group: bool,
    #[arg(long = "type", default_value = "on-premise")]
    pub epg_type: EpgTypeArg,
    /// QoS priority level
    #[arg(long, default_value = "unspecified")]
    pub qos: String,
    #[arg(long, default_value = "present")]
    pub state: StateArg,
}

#[derive(clap::Args)]
pub struct InterfacePolicyArgs {
    /// Tenant-policy template name
    pub template: String,
    /// Policy group name (omit with --state query to list all)
    #[arg(long)]
    pub name: Option<String>,
    #[arg(long)]
    pub description: Option<String>,
    /// Enable the BFD sub-policy with its defaults
    #[arg(long)]
    pub bfd: bool,
    #[arg(long, default_value_t = 3)]
    pub bfd_multiplier: u32,
    #[arg(long, default_value_t = 50)]
    pub bfd_min_rx: u32,
    #[arg(long, default_value_t = 50)]
    pub bfd_min_tx: u32,
    #[arg(long, default_value_t = 50)]
    pub bfd_echo_rx: u32,
    #[arg(long, default_value = "present")]
    pub state: StateArg,
}

#[derive(clap::Args)]
pub struct DeployArgs {
    /// Schema display name
    pub schema: String,
    /// Template name
    pub template: String,
}

#[derive(clap::Args)]
pub struct UndeployArgs {
    /// Schema display name
    pub schema: String,
    /// Template name
    pub template: String,
    /// Site to pull the template from
    #[arg(long)]
    pub site: String,
}

#[derive(clap::Args)]
pub struct DeployStatusArgs {
    /// Schema display name
    pub schema: String,
    /// Template name
    pub template: String,
}

#[derive(clap::Args)]
pub struct ConfigArgs {
    #[command(subcommand)]
    pub command: ConfigCommands,
}

#[derive(Subcommand)]
pub enum ConfigCommands {
    /// Show current config
    Show,
    /// Set config value
    Set(ConfigSetArgs),
}

#[derive(clap::Args)]
pub struct ConfigSetArgs {
    /// Key to set (host, format)
    pub key: String,
    /// Value
    pub value: String,
}
