use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use chrono::Utc;
use serde::Serialize;
use tracing::info;

use ringside_agent::batch::{BatchProgress, BatchRunner, ConversationFailure, ProgressObserver};
use ringside_agent::llm::LlmGateway;
use ringside_agent::openai::OpenAiCompatibleGateway;
use ringside_core::config::{AppConfig, ConfigOverrides, LoadOptions};
use ringside_core::errors::ApplicationError;
use ringside_core::summary::BatchSummary;
use ringside_core::transcripts::TranscriptStore;

use crate::commands::CommandResult;
use crate::logging;

pub const NO_CONVERSATIONS_EXIT_CODE: u8 = 5;

#[derive(Clone, Debug, Default)]
pub struct SimulateOptions {
    pub count: Option<u32>,
    pub max_exchanges: Option<u32>,
    pub concurrency: Option<u32>,
    pub seed: Option<u64>,
    pub output_dir: Option<PathBuf>,
    pub no_save: bool,
}

impl SimulateOptions {
    fn overrides(&self) -> ConfigOverrides {
        ConfigOverrides {
            num_simulations: self.count,
            max_message_exchanges: self.max_exchanges,
            concurrency: self.concurrency,
            output_directory: self.output_dir.clone(),
            ..ConfigOverrides::default()
        }
    }
}

#[derive(Debug, Serialize)]
struct SimulateReport {
    command: &'static str,
    status: &'static str,
    run_id: String,
    requested: u32,
    completed: u32,
    dropped: u32,
    total_tokens_used: u64,
    transcript_path: Option<String>,
    summary: BatchSummary,
    failures: Vec<ConversationFailure>,
}

struct LoggedProgress;

impl ProgressObserver for LoggedProgress {
    fn conversation_finished(&self, progress: &BatchProgress) {
        info!(
            event_name = "batch.progress",
            conversation_id = %progress.conversation_id,
            finished = progress.finished,
            requested = progress.requested,
            succeeded = progress.succeeded,
            "conversation finished"
        );
    }
}

pub fn run(options: SimulateOptions) -> CommandResult {
    let config = match AppConfig::load(LoadOptions {
        overrides: options.overrides(),
        ..LoadOptions::default()
    }) {
        Ok(config) => config,
        Err(error) => {
            return CommandResult::from_error(
                "simulate",
                &ApplicationError::Configuration(error.to_string()),
            )
        }
    };
    logging::init(&config.logging);

    let gateway = match OpenAiCompatibleGateway::from_config(&config.llm) {
        Ok(gateway) => gateway,
        Err(error) => {
            return CommandResult::failure("simulate", "gateway_setup", error.to_string(), 3)
        }
    };

    execute(&config, Arc::new(gateway), &options)
}

/// Runs a batch against an already-built gateway and persists the result.
pub fn execute(
    config: &AppConfig,
    gateway: Arc<dyn LlmGateway>,
    options: &SimulateOptions,
) -> CommandResult {
    let runtime = match build_runtime(config.simulation.concurrency) {
        Ok(runtime) => runtime,
        Err(error) => {
            return CommandResult::failure("simulate", "runtime", format!("{error:#}"), 3)
        }
    };

    let mut runner = BatchRunner::new(gateway, Arc::new(config.simulation.clone()))
        .with_progress(Arc::new(LoggedProgress));
    if let Some(seed) = options.seed {
        runner = runner.with_seed(seed);
    }
    let report = runtime.block_on(runner.run());

    if report.completed() == 0 {
        return CommandResult::failure(
            "simulate",
            "no_conversations",
            format!("all {} conversations failed", report.requested),
            NO_CONVERSATIONS_EXIT_CODE,
        );
    }

    let transcript_path = if options.no_save {
        None
    } else {
        let store = TranscriptStore::new(&config.output.directory);
        match store.save(&report.logs, Utc::now()) {
            Ok(path) => Some(path.display().to_string()),
            Err(error) => return CommandResult::from_error("simulate", &error),
        }
    };

    let summary = report.summary();
    let payload = SimulateReport {
        command: "simulate",
        status: "ok",
        run_id: report.run_id.to_string(),
        requested: report.requested,
        completed: report.completed(),
        dropped: report.dropped(),
        total_tokens_used: report.total_tokens_used,
        transcript_path,
        failures: report.failures.clone(),
        summary,
    };

    CommandResult::report(Some(payload.summary.headline()), &payload)
}

fn build_runtime(concurrency: u32) -> anyhow::Result<tokio::runtime::Runtime> {
    tokio::runtime::Builder::new_multi_thread()
        .worker_threads(concurrency.clamp(1, 8) as usize)
        .enable_all()
        .build()
        .context("failed to initialize async runtime")
}
