//! Decide command - show what a stored admission review would trigger
//!
//! Nothing is sent to the cluster; the review is decoded and run through
//! the decision table only.

use std::path::Path;

use console::style;
use kube::api::DynamicObject;
use kube::core::admission::{AdmissionRequest, AdmissionReview};
use nsbackup_core::{Action, BackupConfig, LabelView, decide};

use crate::error::{CliError, Result};
use crate::webhook::record_for;

pub fn run(review_path: &Path, config_path: Option<&Path>) -> Result<()> {
    let config = BackupConfig::load(config_path)?;

    let content = std::fs::read(review_path)?;
    let review: AdmissionReview<DynamicObject> = serde_json::from_slice(&content)
        .map_err(|e| CliError::review(format!("{}: {}", review_path.display(), e)))?;
    let request = TryInto::<AdmissionRequest<DynamicObject>>::try_into(review)
        .map_err(|e| CliError::review(e.to_string()))?;
    let record =
        record_for(&request, &config.labels).map_err(|e| CliError::review(e.to_string()))?;

    println!(
        "{} {} of namespace {}",
        style("→").blue(),
        record.kind,
        style(&record.resource_name).cyan()
    );

    if !record.kind.is_recognized() {
        println!("  {} operation is not handled", style("⚠").yellow());
        return Ok(());
    }

    println!("  now:    {}", describe(&record.current));
    println!("  before: {}", describe(&record.previous));

    let actions = decide(&record);
    if actions.is_empty() {
        println!("{} No backup changes required", style("✓").green());
        return Ok(());
    }

    for action in &actions {
        let schedule = config.schedule_name(action.target(), &record.resource_name);
        let verb = match action {
            Action::EnsureScheduleAndBackup { .. } => style("+").green(),
            Action::DeleteSchedule { .. } => style("-").red(),
        };
        println!("  {} {} [{}]", verb, action, schedule);
    }
    if request.dry_run {
        println!("{} Request is a dry run, the webhook would skip these", style("⚠").yellow());
    }

    Ok(())
}

fn describe(view: &LabelView) -> String {
    match view.target() {
        Some(target) => format!("enrolled (target {})", target),
        None => "not enrolled".to_string(),
    }
}
