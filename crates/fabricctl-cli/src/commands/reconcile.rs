use anyhow::Result;

use fabricctl_core::RefTarget;
use fabricctl_reconcile::external_epg::ExternalEpgRequest;
use fabricctl_reconcile::interface_policy::{AdminState, BfdSettings, InterfacePolicyRequest};
use fabricctl_reconcile::switch_binding::SwitchBindingRequest;
use fabricctl_reconcile::Reconciler;

use crate::cli::{ExternalEpgArgs, InterfacePolicyArgs, OutputFormat, StateArg, SwitchPortArgs};
use crate::output::print_outcome;

pub async fn switch_port(
    reconciler: &Reconciler,
    args: &SwitchPortArgs,
    format: OutputFormat,
) -> Result<()> {
    let request = SwitchBindingRequest {
        schema: args.schema.clone(),
        site: args.site.clone(),
        template: args.template.clone(),
        network: args.network.clone(),
        serial_number: args.serial.clone(),
        interface: args.interface.clone(),
        state: args.state.into(),
    };
    let outcome = reconciler.switch_binding(&request).await?;
    print_outcome(&outcome, reconciler.check_mode(), format);
    Ok(())
}

pub async fn external_epg(
    reconciler: &Reconciler,
    args: &ExternalEpgArgs,
    format: OutputFormat,
) -> Result<()> {
    // References are only resolved when converging towards present.
    let present = matches!(args.state, StateArg::Present);
    let vrf_name = match args.vrf.as_deref() {
        Some(name) => name,
        None if present => anyhow::bail!("--vrf is required for state present"),
        None => "",
    };
    let l3out_name = match args.l3out.as_deref() {
        Some(name) => name,
        None if present => anyhow::bail!("--l3out is required for state present"),
        None => "",
    };

    let request = ExternalEpgRequest {
        schema: args.schema.clone(),
        template: args.template.clone(),
        site: args.site.clone(),
        name: args.name.clone(),
        description: args.description.clone(),
        display_name: args.display_name.clone(),
        vrf: RefTarget {
            name: vrf_name.to_string(),
            schema: args.vrf_schema.clone(),
            template: args.vrf_template.clone(),
        },
        l3out: RefTarget {
            name: l3out_name.to_string(),
            schema: None,
            template: args.l3out_template.clone(),
        },
        anp: args.anp.as_deref().map(RefTarget::named),
        preferred_group: args.preferred_group,
        epg_type: args.epg_type.into(),
        qos_level: args.qos.clone(),
        state: args.state.into(),
    };
    let outcome = reconciler.external_epg(&request).await?;
    print_outcome(&outcome, reconciler.check_mode(), format);
    Ok(())
}

pub async fn interface_policy(
    reconciler: &Reconciler,
    args: &InterfacePolicyArgs,
    format: OutputFormat,
) -> Result<()> {
    let bfd = args.bfd.then(|| BfdSettings {
        admin_state: AdminState::Enabled,
        detection_multiplier: args.bfd_multiplier,
        receive_interval: args.bfd_min_rx,
        transmit_interval: args.bfd_min_tx,
        echo_interval: args.bfd_echo_rx,
        ..Default::default()
    });
    let request = InterfacePolicyRequest {
        template: args.template.clone(),
        name: args.name.clone(),
        description: args.description.clone(),
        bfd,
        state: args.state.into(),
    };
    let outcome = reconciler.interface_policy(&request).await?;
    print_outcome(&outcome, reconciler.check_mode(), format);
    Ok(())
}
