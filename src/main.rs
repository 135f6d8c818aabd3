//! rankgate - account verification and tiered role reconciliation.

use anyhow::Context;
use clap::Parser;
use rankgate::cli::{Cli, Commands, RequirementsAction, xp_level_table};
use rankgate::config::{Config, ConfigHandle, validate};
use rankgate::db::Database;
use rankgate::telemetry;
use rankgate::verify::{Collaborators, Verified, Verifier, VerifyOptions};
use tracing::{error, info};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    telemetry::init(cli.log_json);

    match &cli.command {
        Commands::CheckConfig => return check_config(&cli),
        Commands::Xp { from, to } => {
            let table = xp_level_table(&cli.config);
            println!("{:.0}", table.xp_between(*from, *to));
            return Ok(());
        }
        _ => {}
    }

    let config = ConfigHandle::load(&cli.config).map_err(|e| {
        error!(path = %cli.config.display(), error = %e, "Failed to load config");
        e
    })?;

    if let Commands::Requirements { action } = &cli.command {
        return requirements(&cli, &config, action);
    }

    let snapshot = config.snapshot();
    let db = Database::new(&snapshot.config.database.path)
        .await
        .context("opening linkage store")?;
    let services = Collaborators::from_config(&snapshot.config.providers)
        .context("building provider clients")?;
    let verifier = Verifier::new(config.clone(), db, services);
    info!(config_version = snapshot.version, "rankgate ready");

    match cli.command {
        Commands::Verify {
            name,
            member,
            profile,
            bypass_link_check,
            allow_override,
        } => {
            let options = VerifyOptions {
                profile_name: profile,
                bypass_account_link_check: bypass_link_check,
                allow_linkage_override: allow_override,
                ..VerifyOptions::labelled(&cli.label)
            };
            report(verifier.verify(&name, &member, &options).await?);
        }
        Commands::ForceVerify {
            name,
            member,
            level,
            no_api,
            bypass_link_check,
            allow_override,
        } => {
            let options = VerifyOptions {
                level_override: level,
                bypass_stats: no_api,
                bypass_account_link_check: bypass_link_check,
                allow_linkage_override: allow_override,
                ..VerifyOptions::labelled(&cli.label)
            };
            report(verifier.verify(&name, &member, &options).await?);
        }
        Commands::Refresh { member } => report(verifier.refresh(&member, &cli.label).await?),
        Commands::RefreshAll => {
            let linked = verifier.database().linkages().list_linked().await?;
            let members = linked.into_iter().filter_map(|record| record.chat_identity_id);
            let outcomes = verifier.refresh_all(members, &cli.label).await;
            let failed = outcomes.iter().filter(|o| o.result.is_err()).count();
            for outcome in &outcomes {
                match &outcome.result {
                    Ok(verified) => println!("{}\tlevel {}", outcome.member, verified.level),
                    Err(e) => println!("{}\tfailed: {e}", outcome.member),
                }
            }
            println!("{} refreshed, {failed} failed", outcomes.len() - failed);
        }
        Commands::Unverify { member } => {
            let unverified = verifier.unverify(&member, &cli.label).await?;
            println!(
                "unverified {member}: {} linkage(s) removed, {} role(s) kept",
                unverified.removed_linkages,
                unverified.roles.len()
            );
        }
        Commands::Fix { member } => {
            let roles = verifier.fix(&member, &cli.label).await?;
            println!("fixed {member}: {} role(s)", roles.len());
        }
        Commands::Requirements { .. } | Commands::Xp { .. } | Commands::CheckConfig => {}
    }

    Ok(())
}

fn check_config(cli: &Cli) -> anyhow::Result<()> {
    let config = Config::load(&cli.config)?;
    match validate(&config) {
        Ok(()) => {
            println!("{}: ok", cli.config.display());
            Ok(())
        }
        Err(errors) => {
            for e in &errors {
                println!("{}: {e}", cli.config.display());
            }
            anyhow::bail!("{} configuration error(s)", errors.len())
        }
    }
}

fn requirements(cli: &Cli, config: &ConfigHandle, action: &RequirementsAction) -> anyhow::Result<()> {
    if let RequirementsAction::Set {
        badge,
        field,
        value,
    } = action
    {
        config.set_requirement(*badge, *field, *value)?;
        config.save(&cli.config)?;
        info!(%badge, %field, ?value, "Requirement updated");
    }

    let snapshot = config.snapshot();
    for (badge, req) in snapshot.config.requirements.iter() {
        println!("[{badge}] role {}", req.role);
        for field in rankgate_rules::RequirementField::ALL {
            match req.get(field) {
                Some(value) => println!("  {field} = {value}"),
                None => println!("  {field} = disabled"),
            }
        }
    }
    Ok(())
}

fn report(verified: Verified) {
    println!(
        "verified {} ({}) level {}",
        verified.account.name, verified.account.id, verified.level
    );
    if let Some(nickname) = &verified.nickname {
        println!("  nickname: {nickname}");
    }
    let roles: Vec<&str> = verified.roles.iter().map(|r| r.as_str()).collect();
    println!("  roles: {}", roles.join(", "));
    if let Some(displaced) = &verified.displaced {
        println!("  displaced member {displaced}");
    }
    println!("  linkage revision {}", verified.linkage.revision);
}
