use std::process::ExitCode;
use std::sync::Arc;

use chrono::Utc;
use forgemirror::ProtectedSet;
use forgemirror::ledger::LedgerStore;
use forgemirror::prune::{PruneOptions, run_prune};

use crate::PruneArgs;
use crate::commands::report::render_prune;
use crate::commands::shared::{CliResult, accounts, github_client, gitlab_client, group_id};
use crate::config::Config;
use crate::progress::LoggingReporter;
use crate::shutdown::is_shutdown_requested;

/// Merge CLI flags over configuration.
pub(crate) fn prune_options(args: &PruneArgs, config: &Config) -> CliResult<PruneOptions> {
    let mut options = PruneOptions::new(
        accounts(config, &args.accounts)?,
        group_id(config, args.group_id)?,
    );
    options.grace_days = args.grace_days.unwrap_or_else(|| config.grace_days());
    options.dry_run = if args.delete {
        false
    } else {
        args.dry_run || config.dry_run()
    };
    options.allow_empty_source = args.allow_empty_source || config.prune.allow_empty_source;

    let mut protected = config.protected();
    protected.extend(args.protect.iter().cloned());
    options.protected = ProtectedSet::new(protected);
    Ok(options)
}

pub(crate) async fn handle_prune(args: PruneArgs, config: &Config) -> CliResult<ExitCode> {
    let options = prune_options(&args, config)?;
    let store = LedgerStore::new(
        args.state_file
            .clone()
            .unwrap_or_else(|| config.state_file()),
    );

    let github = github_client(config)?;
    let gitlab = gitlab_client(config)?;
    let reporter = Arc::new(LoggingReporter::new());
    let callback = reporter.as_callback();

    tracing::info!(
        group_id = options.group_id,
        grace_days = options.grace_days,
        dry_run = options.dry_run,
        protected = options.protected.len(),
        state_file = %store.path().display(),
        "Starting prune run"
    );

    let report = run_prune(
        &github,
        &gitlab,
        &store,
        &options,
        Utc::now(),
        &is_shutdown_requested,
        Some(&callback),
    )
    .await?;

    println!("{}", render_prune(&report, args.output)?);

    if report.interrupted() {
        return Ok(ExitCode::from(130));
    }
    if report.has_failures() {
        return Ok(ExitCode::FAILURE);
    }
    Ok(ExitCode::SUCCESS)
}
