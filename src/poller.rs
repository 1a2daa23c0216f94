use crate::circuit_breaker::{create_store_circuit_breaker, guarded, StoreCircuitBreaker};
use crate::errors::AppError;
use crate::models::IntakeRecord;
use crate::store::{persist_document, ClientStore};
use crate::synthesis::synthesize;
use crate::watermark::Watermark;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use utoipa::ToSchema;

/// Snapshot of the poller published for `/health`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, ToSchema)]
pub struct PollerStatus {
    pub running: bool,
    pub watermark: Option<DateTime<Utc>>,
    pub last_cycle_at: Option<DateTime<Utc>>,
    pub cycles: u64,
    pub records_processed: u64,
    pub persist_failures: u64,
    pub rows_rejected: u64,
    pub last_error: Option<String>,
}

/// What one poll cycle did.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CycleReport {
    pub fetched: usize,
    pub persisted: usize,
    pub persist_failures: usize,
    /// Rows skipped because they did not decode into an intake record.
    pub rejected: usize,
}

/// Background loop turning new intake rows into stored analysis rows.
///
/// Rows are processed in creation order, one at a time. A failed insert is
/// logged and skipped; the watermark still moves past the row, as it does
/// past a row that cannot be decoded. A failed fetch aborts the cycle and
/// leaves the watermark where it was, so the same rows are asked for again
/// next cycle.
pub struct IngestionPoller {
    store: Arc<dyn ClientStore>,
    watermark: Watermark,
    interval: Duration,
    user_id: String,
    breaker: StoreCircuitBreaker,
    status: watch::Sender<PollerStatus>,
}

impl IngestionPoller {
    /// Creates a poller with an unresolved watermark.
    ///
    /// # Arguments
    ///
    /// * `store` - Source of intake rows and sink for analysis rows.
    /// * `interval` - Pause between cycles.
    /// * `user_id` - Owner tag written on every analysis row.
    pub fn new(store: Arc<dyn ClientStore>, interval: Duration, user_id: impl Into<String>) -> Self {
        let (status, _) = watch::channel(PollerStatus::default());
        Self {
            store,
            watermark: Watermark::unresolved(),
            interval,
            user_id: user_id.into(),
            breaker: create_store_circuit_breaker(),
            status,
        }
    }

    /// Starts from a known position instead of asking the store.
    pub fn with_watermark(mut self, watermark: Watermark) -> Self {
        self.watermark = watermark;
        self
    }

    pub fn watermark(&self) -> Watermark {
        self.watermark
    }

    /// Receiver for status snapshots, updated after every cycle.
    pub fn subscribe(&self) -> watch::Receiver<PollerStatus> {
        self.status.subscribe()
    }

    /// Runs until `shutdown` carries `true` or its sender is dropped.
    ///
    /// The stop signal is checked between cycles; a cycle in flight runs to
    /// completion. Errors never end the loop.
    pub async fn run(mut self, mut shutdown: watch::Receiver<bool>) {
        tracing::info!(
            "Intake poller started (interval {}s, user {})",
            self.interval.as_secs_f64(),
            self.user_id
        );
        self.status.send_modify(|s| s.running = true);

        if let Err(e) = self.watermark.resolve(self.store.as_ref()).await {
            tracing::warn!("Could not resolve watermark, retrying next cycle: {}", e);
        }

        while !*shutdown.borrow() {
            tokio::select! {
                _ = tokio::time::sleep(self.interval) => {}
                changed = shutdown.changed() => {
                    if changed.is_err() {
                        break;
                    }
                    continue;
                }
            }

            if *shutdown.borrow() {
                break;
            }
            // Logged and published by the cycle itself.
            self.run_cycle().await.ok();
        }

        self.status.send_modify(|s| s.running = false);
        tracing::info!("Intake poller stopped");
    }

    /// One fetch-and-process pass.
    ///
    /// Returns `Err` only for faults that abort the cycle: the watermark
    /// could not be resolved or the fetch failed.
    pub async fn run_cycle(&mut self) -> Result<CycleReport, AppError> {
        let result = self.process_new_rows().await;

        match &result {
            Err(e) if e.is_transient() => {
                tracing::warn!("Poll cycle aborted, retrying next interval: {}", e)
            }
            Err(e) => tracing::error!("Poll cycle aborted: {}", e),
            Ok(_) => {}
        }

        let watermark = self.watermark.position();
        self.status.send_modify(|s| {
            s.cycles += 1;
            s.last_cycle_at = Some(Utc::now());
            s.watermark = watermark;
            match &result {
                Ok(report) => {
                    s.records_processed += report.fetched as u64;
                    s.persist_failures += report.persist_failures as u64;
                    s.rows_rejected += report.rejected as u64;
                    s.last_error = None;
                }
                Err(e) => s.last_error = Some(e.to_string()),
            }
        });

        result
    }

    async fn process_new_rows(&mut self) -> Result<CycleReport, AppError> {
        let since = self.watermark.resolve(self.store.as_ref()).await?;
        let rows = guarded(&self.breaker, self.store.fetch_intake_since(since)).await?;

        let mut report = CycleReport {
            fetched: rows.len(),
            ..CycleReport::default()
        };
        if rows.is_empty() {
            tracing::debug!("No new intake rows after {}", since);
            return Ok(report);
        }
        tracing::info!("Found {} new intake row(s)", rows.len());

        for row in &rows {
            match &row.record {
                Ok(intake) => match self.process_record(intake).await {
                    Ok(()) => report.persisted += 1,
                    Err(e) => {
                        report.persist_failures += 1;
                        tracing::error!(
                            "Failed to store analysis for client {}: {}",
                            intake.client_id,
                            e
                        );
                    }
                },
                Err(e) => {
                    report.rejected += 1;
                    tracing::error!(
                        "Skipping intake row created at {}: {}",
                        row.created_at,
                        e
                    );
                }
            }

            if self.watermark.advance(row.created_at) {
                tracing::debug!("Watermark advanced to {}", row.created_at);
            }
        }

        tracing::info!(
            "Poll cycle done: {} stored, {} failed, {} skipped",
            report.persisted,
            report.persist_failures,
            report.rejected
        );
        Ok(report)
    }

    async fn process_record(&self, intake: &IntakeRecord) -> Result<(), AppError> {
        tracing::info!("Processing new client {}", intake.client_id);

        let doc = synthesize(intake);
        tracing::debug!(
            "Client {}: {} goal(s), tolerance {}, capacity {}, equity {}",
            intake.client_id,
            doc.investment_objectives.primary_goals.len(),
            doc.risk_profile.tolerance_level.as_str(),
            doc.risk_profile.risk_capacity.as_str(),
            doc.investment_strategy.asset_allocation.equity
        );

        persist_document(self.store.as_ref(), &intake.client_id, &self.user_id, &doc).await?;
        tracing::info!("Stored analysis for client {}", intake.client_id);
        Ok(())
    }
}
