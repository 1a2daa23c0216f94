use crate::errors::AppError;
use crate::models::{AnalysisDocument, AnalysisRecord, FetchedIntake, IntakeRecord};
use async_trait::async_trait;
use chrono::{DateTime, Utc};

/// The client data store: source of intake rows, sink for analysis rows.
///
/// Implemented over Postgres (`pg_store`) and over Supabase's REST API
/// (`supabase_client`).
#[async_trait]
pub trait ClientStore: Send + Sync {
    /// Creation time of the newest intake row, `None` for an empty table.
    async fn latest_intake_created_at(&self) -> Result<Option<DateTime<Utc>>, AppError>;

    /// All intake rows created strictly after `watermark`, oldest first.
    ///
    /// Unpaginated. A row without a readable `created_at` fails the whole
    /// fetch; any other decode failure is carried on that row alone.
    async fn fetch_intake_since(
        &self,
        watermark: DateTime<Utc>,
    ) -> Result<Vec<FetchedIntake>, AppError>;

    /// The intake row for `client_id`, if any.
    async fn fetch_intake_by_client_id(
        &self,
        client_id: &str,
    ) -> Result<Option<IntakeRecord>, AppError>;

    /// Inserts one analysis row. Never updates an existing one.
    async fn insert_analysis(&self, record: &AnalysisRecord) -> Result<(), AppError>;
}

/// Serializes a derived document and inserts it as one analysis row.
pub async fn persist_document(
    store: &dyn ClientStore,
    client_id: &str,
    user_id: &str,
    doc: &AnalysisDocument,
) -> Result<(), AppError> {
    let record = AnalysisRecord::from_document(client_id, user_id, doc)?;
    store.insert_analysis(&record).await
}
