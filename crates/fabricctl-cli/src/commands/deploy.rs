use anyhow::Result;

use fabricctl_reconcile::deploy::{DeployAction, DeployRequest};
use fabricctl_reconcile::Reconciler;

use crate::cli::{DeployArgs, DeployStatusArgs, OutputFormat, UndeployArgs};
use crate::output::{print_success, print_value};

pub async fn deploy(reconciler: &Reconciler, args: &DeployArgs, format: OutputFormat) -> Result<()> {
    let response = reconciler
        .deploy(&DeployRequest {
            schema: args.schema.clone(),
            template: args.template.clone(),
            site: None,
            action: DeployAction::Deploy,
        })
        .await?;
    if reconciler.check_mode() {
        print_success("Would submit deployment task (check mode)");
    } else {
        print_success(&format!("Deployment task submitted for '{}'", args.template));
    }
    print_value(&response, format);
    Ok(())
}

pub async fn undeploy(
    reconciler: &Reconciler,
    args: &UndeployArgs,
    format: OutputFormat,
) -> Result<()> {
    let response = reconciler
        .deploy(&DeployRequest {
            schema: args.schema.clone(),
            template: args.template.clone(),
            site: Some(args.site.clone()),
            action: DeployAction::Undeploy,
        })
        .await?;
    if reconciler.check_mode() {
        print_success("Would submit undeploy task (check mode)");
    } else {
        print_success(&format!(
            "Undeploy task submitted for '{}' from site '{}'",
            args.template, args.site
        ));
    }
    print_value(&response, format);
    Ok(())
}

pub async fn status(
    reconciler: &Reconciler,
    args: &DeployStatusArgs,
    format: OutputFormat,
) -> Result<()> {
    let response = reconciler
        .deploy(&DeployRequest {
            schema: args.schema.clone(),
            template: args.template.clone(),
            site: None,
            action: DeployAction::Status,
        })
        .await?;
    print_value(&response, format);
    Ok(())
}
