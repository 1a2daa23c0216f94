use crate::errors::{AppError, ResultExt};
use crate::models::{AnalysisRecord, FetchedIntake, IntakeRecord};
use crate::store::ClientStore;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde_json::Value;
use sqlx::PgPool;

/// Postgres-backed client data store.
///
/// Intake rows are read through `to_jsonb` so the column set can vary and
/// decoding is shared with the REST backend. Table names come from config,
/// where they are validated as plain identifiers.
pub struct PgClientStore {
    pool: PgPool,
    intake_table: String,
    analysis_table: String,
}

impl PgClientStore {
    pub fn new(pool: PgPool, intake_table: &str, analysis_table: &str) -> Self {
        Self {
            pool,
            intake_table: intake_table.to_string(),
            analysis_table: analysis_table.to_string(),
        }
    }

    fn decode_rows(rows: Vec<Value>) -> Result<Vec<FetchedIntake>, AppError> {
        rows.into_iter().map(FetchedIntake::from_json).collect()
    }
}

#[async_trait]
impl ClientStore for PgClientStore {
    async fn latest_intake_created_at(&self) -> Result<Option<DateTime<Utc>>, AppError> {
        let latest = sqlx::query_scalar::<_, Option<DateTime<Utc>>>(&format!(
            "SELECT max(created_at) FROM {}",
            self.intake_table
        ))
        .fetch_one(&self.pool)
        .await
        .context("Reading newest intake timestamp")?;

        Ok(latest)
    }

    async fn fetch_intake_since(
        &self,
        watermark: DateTime<Utc>,
    ) -> Result<Vec<FetchedIntake>, AppError> {
        let rows = sqlx::query_scalar::<_, Value>(&format!(
            r#"
            SELECT to_jsonb(f)
            FROM {} f
            WHERE f.created_at > $1
            ORDER BY f.created_at ASC
            "#,
            self.intake_table
        ))
        .bind(watermark)
        .fetch_all(&self.pool)
        .await
        .context("Fetching new intake rows")?;

        Self::decode_rows(rows)
    }

    async fn fetch_intake_by_client_id(
        &self,
        client_id: &str,
    ) -> Result<Option<IntakeRecord>, AppError> {
        let row = sqlx::query_scalar::<_, Value>(&format!(
            r#"
            SELECT to_jsonb(f)
            FROM {} f
            WHERE f.client_id::text = $1
            ORDER BY f.created_at DESC
            LIMIT 1
            "#,
            self.intake_table
        ))
        .bind(client_id)
        .fetch_optional(&self.pool)
        .await
        .with_context(|| format!("Fetching intake for client {}", client_id))?;

        row.map(IntakeRecord::from_json).transpose()
    }

    async fn insert_analysis(&self, record: &AnalysisRecord) -> Result<(), AppError> {
        sqlx::query(&format!(
            r#"
            INSERT INTO {} (
                client_id, user_id, client_profile, financial_situation,
                investment_objectives, investment_strategy, risk_profile,
                portfolio_data, portfolio_recommendation, mutual_funds_analysis,
                bonds_analysis, fixed_deposits_analysis
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12)
            "#,
            self.analysis_table
        ))
        .bind(&record.client_id)
        .bind(&record.user_id)
        .bind(&record.client_profile)
        .bind(&record.financial_situation)
        .bind(&record.investment_objectives)
        .bind(&record.investment_strategy)
        .bind(&record.risk_profile)
        .bind(&record.portfolio_data)
        .bind(&record.portfolio_recommendation)
        .bind(&record.mutual_funds_analysis)
        .bind(&record.bonds_analysis)
        .bind(&record.fixed_deposits_analysis)
        .execute(&self.pool)
        .await
        .with_context(|| format!("Storing analysis for client {}", record.client_id))?;

        tracing::debug!("Stored analysis row for client {}", record.client_id);
        Ok(())
    }
}
