use std::sync::atomic::{AtomicU32, AtomicU64, Ordering};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::sync::Semaphore;
use tracing::{error, info};
use uuid::Uuid;

use ringside_core::config::SimulationConfig;
use ringside_core::domain::conversation::{ConversationId, ConversationLog};
use ringside_core::generator::ProfileGenerator;
use ringside_core::summary::BatchSummary;

use crate::conversation::ConversationEngine;
use crate::llm::LlmGateway;

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct ConversationFailure {
    pub conversation_id: ConversationId,
    pub reason: String,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BatchProgress {
    pub conversation_id: ConversationId,
    pub finished: u32,
    pub requested: u32,
    pub succeeded: bool,
}

pub trait ProgressObserver: Send + Sync {
    fn conversation_finished(&self, progress: &BatchProgress);
}

#[derive(Clone, Debug)]
pub struct BatchReport {
    pub run_id: Uuid,
    pub started_at: DateTime<Utc>,
    pub requested: u32,
    /// Completed conversations ordered by identifier.
    pub logs: Vec<ConversationLog>,
    pub failures: Vec<ConversationFailure>,
    pub total_tokens_used: u64,
}

impl BatchReport {
    pub fn completed(&self) -> u32 {
        self.logs.len() as u32
    }

    pub fn dropped(&self) -> u32 {
        self.requested.saturating_sub(self.completed())
    }

    pub fn summary(&self) -> BatchSummary {
        BatchSummary::from_logs(&self.logs, self.requested)
    }
}

/// Runs `num_simulations` independent conversations.
///
/// A conversation that errors or panics is logged and dropped; nothing escapes `run`.
/// Profiles are drawn up front so a seeded batch is reproducible at any concurrency.
pub struct BatchRunner {
    engine: Arc<ConversationEngine>,
    config: Arc<SimulationConfig>,
    seed: Option<u64>,
    progress: Option<Arc<dyn ProgressObserver>>,
}

impl BatchRunner {
    pub fn new(gateway: Arc<dyn LlmGateway>, config: Arc<SimulationConfig>) -> Self {
        Self {
            engine: Arc::new(ConversationEngine::new(gateway, config.clone())),
            config,
            seed: None,
            progress: None,
        }
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    pub fn with_progress(mut self, observer: Arc<dyn ProgressObserver>) -> Self {
        self.progress = Some(observer);
        self
    }

    pub async fn run(&self) -> BatchReport {
        let run_id = Uuid::new_v4();
        let started_at = Utc::now();
        let requested = self.config.num_simulations;
        let concurrency = self.config.concurrency.max(1) as usize;

        info!(
            event_name = "batch.started",
            run_id = %run_id,
            requested,
            concurrency,
            seed = ?self.seed,
            "simulation batch started"
        );

        let profiles = {
            let mut generator = match self.seed {
                Some(seed) => ProfileGenerator::seeded(seed),
                None => ProfileGenerator::from_entropy(),
            };
            (0..requested).map(|_| generator.generate()).collect::<Vec<_>>()
        };

        let semaphore = Arc::new(Semaphore::new(concurrency));
        let tokens = Arc::new(AtomicU64::new(0));
        let finished = Arc::new(AtomicU32::new(0));
        let mut handles = Vec::with_capacity(profiles.len());
        let mut failures = Vec::new();

        for (index, profile) in (0u32..).zip(profiles) {
            let conversation_id = ConversationId::for_batch(started_at, index);
            let permit = match semaphore.clone().acquire_owned().await {
                Ok(permit) => permit,
                Err(closed) => {
                    let reason = format!("scheduler unavailable: {closed}");
                    report_dropped(run_id, &conversation_id, &reason);
                    let observer = self.progress.as_deref();
                    notify(observer, &finished, &conversation_id, requested, false);
                    failures.push(ConversationFailure { conversation_id, reason });
                    continue;
                }
            };

            let engine = self.engine.clone();
            let tokens = tokens.clone();
            let finished = finished.clone();
            let progress = self.progress.clone();
            let task_id = conversation_id.clone();
            let handle = tokio::spawn(async move {
                // A panic inside the engine surfaces as a JoinError of the inner task.
                let inner_id = task_id.clone();
                let conversation = tokio::spawn(async move { engine.run(inner_id, profile).await });
                let outcome = match conversation.await {
                    Ok(Ok(log)) => {
                        tokens.fetch_add(log.total_tokens_used, Ordering::Relaxed);
                        Ok(log)
                    }
                    Ok(Err(domain_error)) => Err(domain_error.to_string()),
                    Err(join_error) => Err(format!("conversation task aborted: {join_error}")),
                };

                if let Err(reason) = &outcome {
                    report_dropped(run_id, &task_id, reason);
                }
                notify(progress.as_deref(), &finished, &task_id, requested, outcome.is_ok());
                drop(permit);
                outcome
            });
            handles.push((conversation_id, handle));
        }

        let mut logs = Vec::with_capacity(handles.len());
        for (conversation_id, handle) in handles {
            match handle.await {
                Ok(Ok(log)) => logs.push(log),
                Ok(Err(reason)) => failures.push(ConversationFailure { conversation_id, reason }),
                Err(join_error) => {
                    let reason = format!("conversation task aborted: {join_error}");
                    report_dropped(run_id, &conversation_id, &reason);
                    failures.push(ConversationFailure { conversation_id, reason });
                }
            }
        }

        logs.sort_by(|left, right| left.conversation_id.cmp(&right.conversation_id));
        let report = BatchReport {
            run_id,
            started_at,
            requested,
            logs,
            failures,
            total_tokens_used: tokens.load(Ordering::Relaxed),
        };

        info!(
            event_name = "batch.finished",
            run_id = %run_id,
            requested,
            completed = report.completed(),
            dropped = report.dropped(),
            total_tokens = report.total_tokens_used,
            "simulation batch finished"
        );
        report
    }
}

fn report_dropped(run_id: Uuid, conversation_id: &ConversationId, reason: &str) {
    error!(
        event_name = "batch.conversation_dropped",
        run_id = %run_id,
        conversation_id = %conversation_id,
        reason = %reason,
        "conversation dropped from batch"
    );
}

fn notify(
    observer: Option<&dyn ProgressObserver>,
    finished: &AtomicU32,
    conversation_id: &ConversationId,
    requested: u32,
    succeeded: bool,
) {
    let finished = finished.fetch_add(1, Ordering::SeqCst) + 1;
    if let Some(observer) = observer {
        observer.conversation_finished(&BatchProgress {
            conversation_id: conversation_id.clone(),
            finished,
            requested,
            succeeded,
        });
    }
}
