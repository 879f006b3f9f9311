use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;

use forgemirror::mirror::{MirrorOptions, run_mirror};
use forgemirror::transfer::{GitCliTransfer, MirrorTransfer};

use crate::MirrorArgs;
use crate::commands::report::render_mirror;
use crate::commands::shared::{CliResult, accounts, github_client, gitlab_client, group_id};
use crate::config::Config;
use crate::progress::LoggingReporter;
use crate::shutdown::is_shutdown_requested;

pub(crate) async fn handle_mirror(args: MirrorArgs, config: &Config) -> CliResult<ExitCode> {
    let accounts = accounts(config, &args.accounts)?;
    let group_id = group_id(config, args.group_id)?;
    let fallback = config.mirror.fallback && !args.no_fallback;

    let github = github_client(config)?;
    let gitlab = gitlab_client(config)?;
    let transfer = GitCliTransfer::new()
        .with_timeout(Duration::from_secs(config.mirror.transfer_timeout_secs));

    let options = MirrorOptions::new(accounts, group_id).with_fallback(fallback);
    let reporter = Arc::new(LoggingReporter::new());
    let callback = reporter.as_callback();

    tracing::info!(
        group_id,
        accounts = ?options.accounts,
        fallback,
        "Starting mirror run"
    );

    let report = run_mirror(
        &github,
        &gitlab,
        Some(&transfer as &dyn MirrorTransfer),
        &options,
        &is_shutdown_requested,
        Some(&callback),
    )
    .await?;

    println!("{}", render_mirror(&report, args.output)?);

    if report.interrupted() {
        return Ok(ExitCode::from(130));
    }
    if report.has_failures() {
        tracing::error!(failed = report.failed(), "Mirror run finished with failures");
        return Ok(ExitCode::FAILURE);
    }
    Ok(ExitCode::SUCCESS)
}
