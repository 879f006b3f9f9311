//! Final run reports, as a table or JSON.

use clap::ValueEnum;
use forgemirror::mirror::{MirrorResult, OutcomeStatus};
use forgemirror::prune::{PruneDecision, PruneStatus};
use forgemirror::{MirrorReport, PruneReport};
use serde::Serialize;
use tabled::Tabled;

/// Output format for run reports.
#[derive(Debug, Clone, Copy, Default, ValueEnum)]
pub(crate) enum OutputFormat {
    /// Display as a formatted table (default)
    #[default]
    Table,
    /// Display as JSON
    Json,
}

#[derive(Debug, Clone, Serialize, Tabled)]
pub(crate) struct MirrorRow {
    #[tabled(rename = "Repository")]
    pub repo: String,
    #[tabled(rename = "Project")]
    pub project_id: String,
    #[tabled(rename = "Outcome")]
    pub outcome: &'static str,
    #[tabled(rename = "Detail")]
    pub detail: String,
}

#[derive(Debug, Serialize)]
struct MirrorSummary {
    source_total: usize,
    created: usize,
    already_existing: usize,
    configured: usize,
    fallback: usize,
    failed: usize,
    skipped: usize,
    not_attempted: usize,
    repos: Vec<MirrorRow>,
}

#[derive(Debug, Clone, Serialize, Tabled)]
pub(crate) struct PruneRow {
    #[tabled(rename = "Repository")]
    pub repo: String,
    #[tabled(rename = "Project")]
    pub project_id: String,
    #[tabled(rename = "Decision")]
    pub decision: &'static str,
    #[tabled(rename = "Detail")]
    pub detail: String,
}

#[derive(Debug, Serialize)]
struct PruneSummary {
    dry_run: bool,
    deleted: usize,
    candidates: usize,
    protected: usize,
    aging: usize,
    healed: usize,
    failed: usize,
    dropped: usize,
    not_attempted: usize,
    ledger_corrupt: Option<String>,
    repos: Vec<PruneRow>,
}

fn project_cell(project_id: Option<u64>) -> String {
    project_id.map(|id| id.to_string()).unwrap_or_default()
}

pub(crate) fn mirror_rows(report: &MirrorReport) -> Vec<MirrorRow> {
    report
        .outcomes
        .iter()
        .map(|outcome| {
            let status = outcome.status();
            let detail = match status {
                OutcomeStatus::Failed => outcome
                    .error()
                    .map(|e| e.to_string())
                    .unwrap_or_default(),
                OutcomeStatus::FallbackUsed => outcome
                    .steps
                    .iter()
                    .find_map(|s| match s {
                        MirrorResult::FallbackUsed { reason } => Some(reason.clone()),
                        _ => None,
                    })
                    .unwrap_or_default(),
                _ => String::new(),
            };
            MirrorRow {
                repo: outcome.key.to_string(),
                project_id: project_cell(outcome.project_id),
                outcome: status.as_str(),
                detail,
            }
        })
        .collect()
}

pub(crate) fn prune_rows(report: &PruneReport) -> Vec<PruneRow> {
    report
        .items
        .iter()
        .map(|item| {
            let detail = match &item.decision {
                PruneDecision::Aging { age_days } | PruneDecision::Protected { age_days } => {
                    format!("missing for {age_days}d")
                }
                PruneDecision::DeleteFailed(e) => e.to_string(),
                _ => String::new(),
            };
            PruneRow {
                repo: item.key.to_string(),
                project_id: project_cell(item.project_id),
                decision: item.decision.status().as_str(),
                detail,
            }
        })
        .collect()
}

fn table<T: Tabled>(rows: Vec<T>) -> String {
    let mut table = tabled::Table::new(rows);
    table.with(tabled::settings::Style::rounded());
    table.to_string()
}

/// Render a mirror report.
pub(crate) fn render_mirror(
    report: &MirrorReport,
    format: OutputFormat,
) -> Result<String, serde_json::Error> {
    let rows = mirror_rows(report);
    match format {
        OutputFormat::Table => {
            let mut out = String::new();
            if !rows.is_empty() {
                out.push_str(&table(rows));
                out.push('\n');
            }
            out.push_str(&format!(
                "{} source repos: {} created, {} existing, {} configured, {} fallback, {} failed, {} skipped",
                report.source_total,
                report.created(),
                report.already_existing(),
                report.configured(),
                report.fallback(),
                report.failed(),
                report.skipped.len(),
            ));
            if report.interrupted() {
                out.push_str(&format!(
                    "\nInterrupted: {} repos not attempted",
                    report.not_attempted
                ));
            }
            Ok(out)
        }
        OutputFormat::Json => serde_json::to_string_pretty(&MirrorSummary {
            source_total: report.source_total,
            created: report.created(),
            already_existing: report.already_existing(),
            configured: report.configured(),
            fallback: report.fallback(),
            failed: report.failed(),
            skipped: report.skipped.len(),
            not_attempted: report.not_attempted,
            repos: rows,
        }),
    }
}

/// Render a prune report.
pub(crate) fn render_prune(
    report: &PruneReport,
    format: OutputFormat,
) -> Result<String, serde_json::Error> {
    let rows = prune_rows(report);
    let aging = report.count(PruneStatus::Aging) + report.count(PruneStatus::Marked);
    let healed = report.count(PruneStatus::Healed) + report.count(PruneStatus::Reappeared);
    match format {
        OutputFormat::Table => {
            let mut out = String::new();
            if report.dry_run {
                out.push_str("Dry run: nothing was deleted\n");
            }
            if let Some(err) = &report.ledger_corrupt {
                out.push_str(&format!("Warning: {err}\n"));
            }
            if !rows.is_empty() {
                out.push_str(&table(rows));
                out.push('\n');
            }
            let removed = if report.dry_run {
                format!("{} would be deleted", report.count(PruneStatus::Candidate))
            } else {
                format!("{} deleted", report.count(PruneStatus::Deleted))
            };
            out.push_str(&format!(
                "{removed}, {} protected, {aging} within grace period, {healed} healed, {} failed",
                report.count(PruneStatus::Protected),
                report.count(PruneStatus::DeleteFailed),
            ));
            if report.interrupted() {
                out.push_str(&format!(
                    "\nInterrupted: {} repos not evaluated",
                    report.not_attempted
                ));
            }
            Ok(out)
        }
        OutputFormat::Json => serde_json::to_string_pretty(&PruneSummary {
            dry_run: report.dry_run,
            deleted: report.count(PruneStatus::Deleted),
            candidates: report.count(PruneStatus::Candidate),
            protected: report.count(PruneStatus::Protected),
            aging,
            healed,
            failed: report.count(PruneStatus::DeleteFailed),
            dropped: report.dropped.len(),
            not_attempted: report.not_attempted,
            ledger_corrupt: report.ledger_corrupt.as_ref().map(|e| e.to_string()),
            repos: rows,
        }),
    }
}

#[cfg(test)]
mod tests {
    use forgemirror::mirror::MirrorOutcome;
    use forgemirror::prune::PruneItem;
    use forgemirror::{MirrorError, RepoKey};

    use super::*;

    fn mirror_report() -> MirrorReport {
        MirrorReport {
            source_total: 4,
            outcomes: vec![
                MirrorOutcome {
                    key: RepoKey::new("alice", "foo"),
                    project_id: Some(10),
                    steps: vec![
                        MirrorResult::Created { project_id: 10 },
                        MirrorResult::MirrorConfigured { changed: true },
                    ],
                },
                MirrorOutcome {
                    key: RepoKey::new("alice", "bar"),
                    project_id: Some(11),
                    steps: vec![
                        MirrorResult::AlreadyExists { project_id: 11 },
                        MirrorResult::FallbackUsed {
                            reason: "Unsupported: tier".into(),
                        },
                    ],
                },
                MirrorOutcome {
                    key: RepoKey::new("alice", "tool"),
                    project_id: None,
                    steps: vec![MirrorResult::Failed(MirrorError::PathConflict {
                        key: "alice/tool".into(),
                        existing: "bob/tool".into(),
                    })],
                },
            ],
            skipped: vec![RepoKey::new("alice", ".github")],
            not_attempted: 0,
        }
    }

    #[test]
    fn mirror_rows_carry_status_and_detail() {
        let rows = mirror_rows(&mirror_report());
        assert_eq!(rows.len(), 3);
        assert_eq!(rows[0].outcome, "created");
        assert_eq!(rows[0].project_id, "10");
        assert_eq!(rows[1].outcome, "fallback_used");
        assert_eq!(rows[1].detail, "Unsupported: tier");
        assert_eq!(rows[2].outcome, "failed");
        assert_eq!(rows[2].project_id, "");
        assert!(rows[2].detail.contains("bob/tool"));
    }

    #[test]
    fn mirror_table_has_summary_line() {
        let out = render_mirror(&mirror_report(), OutputFormat::Table).unwrap();
        assert!(out.contains("alice/foo"));
        assert!(out.contains(
            "4 source repos: 1 created, 0 existing, 0 configured, 1 fallback, 1 failed, 1 skipped"
        ));
    }

    #[test]
    fn mirror_json_is_machine_readable() {
        let out = render_mirror(&mirror_report(), OutputFormat::Json).unwrap();
        let value: serde_json::Value = serde_json::from_str(&out).unwrap();
        assert_eq!(value["created"], 1);
        assert_eq!(value["failed"], 1);
        assert_eq!(value["repos"][2]["outcome"], "failed");
    }

    #[test]
    fn prune_table_mentions_dry_run() {
        let report = PruneReport {
            dry_run: true,
            items: vec![
                PruneItem {
                    key: RepoKey::new("alice", "gone"),
                    project_id: Some(7),
                    decision: PruneDecision::Candidate,
                },
                PruneItem {
                    key: RepoKey::new("alice", "mirror-scripts"),
                    project_id: Some(8),
                    decision: PruneDecision::Protected { age_days: 30 },
                },
            ],
            ..PruneReport::default()
        };
        let out = render_prune(&report, OutputFormat::Table).unwrap();
        assert!(out.starts_with("Dry run"));
        assert!(out.contains("missing for 30d"));
        assert!(out.contains("1 would be deleted, 1 protected"));
    }

    #[test]
    fn prune_json_reports_corrupt_ledger() {
        let report = PruneReport {
            ledger_corrupt: Some(MirrorError::LedgerCorrupt {
                path: "/tmp/prune_state.json".into(),
                message: "expected value".into(),
            }),
            items: vec![PruneItem {
                key: RepoKey::new("alice", "gone"),
                project_id: Some(7),
                decision: PruneDecision::Deleted,
            }],
            ..PruneReport::default()
        };
        let out = render_prune(&report, OutputFormat::Json).unwrap();
        let value: serde_json::Value = serde_json::from_str(&out).unwrap();
        assert_eq!(value["deleted"], 1);
        assert_eq!(value["dry_run"], false);
        assert!(value["ledger_corrupt"].as_str().unwrap().contains("expected value"));
        assert_eq!(value["repos"][0]["decision"], "deleted");
    }
}
