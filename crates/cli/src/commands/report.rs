use std::path::Path;

use serde::Serialize;

use ringside_core::summary::BatchSummary;
use ringside_core::transcripts::TranscriptStore;

use crate::commands::CommandResult;

#[derive(Debug, Serialize)]
struct ReportPayload {
    command: &'static str,
    status: &'static str,
    file: String,
    summary: BatchSummary,
}

pub fn run(path: &Path, json: bool) -> CommandResult {
    let logs = match TranscriptStore::load(path) {
        Ok(logs) => logs,
        Err(error) => return CommandResult::from_error("report", &error),
    };

    let summary = BatchSummary::from_logs(&logs, logs.len() as u32);
    if json {
        let payload = ReportPayload {
            command: "report",
            status: "ok",
            file: path.display().to_string(),
            summary,
        };
        return CommandResult::report(None, &payload);
    }

    CommandResult { exit_code: 0, output: render_text(path, &summary) }
}

fn render_text(path: &Path, summary: &BatchSummary) -> String {
    let mut lines = vec![
        format!("transcripts: {}", path.display()),
        format!("conversations: {}", summary.completed),
        format!(
            "intent accuracy: {:.1}% ({}/{}, {} without detection)",
            summary.intent_accuracy * 100.0,
            summary.intent_matches,
            summary.completed,
            summary.missing_detections
        ),
        format!(
            "outcomes: agreed_to_free_class={} not_interested={} reached_message_limit={}",
            summary.outcomes.agreed_to_free_class,
            summary.outcomes.not_interested,
            summary.outcomes.reached_message_limit
        ),
        format!("qualified leads: {}", summary.qualified_leads),
        format!(
            "tokens: {} total, {:.1} per conversation, {:.1} exchanges on average",
            summary.total_tokens_used,
            summary.average_tokens_per_conversation,
            summary.average_exchanges
        ),
        "per intent:".to_string(),
    ];

    for (intent, tally) in &summary.by_intent {
        lines.push(format!(
            "- {intent}: {}/{} correct ({:.1}%)",
            tally.matches,
            tally.conversations,
            tally.accuracy() * 100.0
        ));
    }

    lines.join("\n")
}
