use crate::errors::{AppError, ResultExt};
use crate::models::{parse_timestamp, AnalysisRecord, FetchedIntake, IntakeRecord};
use crate::store::ClientStore;
use async_trait::async_trait;
use chrono::{DateTime, SecondsFormat, Utc};
use reqwest::{RequestBuilder, Response};
use serde_json::Value;
use std::time::Duration;
use url::Url;

/// Client data store over Supabase's PostgREST API.
#[derive(Clone)]
pub struct SupabaseClient {
    client: reqwest::Client,
    rest_url: Url,
    key: String,
    intake_table: String,
    analysis_table: String,
}

impl SupabaseClient {
    /// Creates a new `SupabaseClient`.
    ///
    /// # Arguments
    ///
    /// * `base_url` - The project URL, e.g. `https://xyz.supabase.co`.
    /// * `key` - The service key, sent as `apikey` and bearer token.
    /// * `timeout` - Per-request timeout.
    pub fn new(
        base_url: &str,
        key: String,
        intake_table: &str,
        analysis_table: &str,
        timeout: Duration,
    ) -> Result<Self, AppError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| {
                AppError::InternalError(format!("Failed to create Supabase client: {}", e))
            })?;

        let rest_url = Url::parse(&format!("{}/rest/v1/", base_url.trim_end_matches('/')))
            .map_err(|e| AppError::BadRequest(format!("Invalid Supabase URL: {}", e)))?;

        Ok(Self {
            client,
            rest_url,
            key,
            intake_table: intake_table.to_string(),
            analysis_table: analysis_table.to_string(),
        })
    }

    fn table_url(&self, table: &str, query: &[(&str, &str)]) -> Result<Url, AppError> {
        let mut url = self
            .rest_url
            .join(table)
            .map_err(|e| AppError::InternalError(format!("Invalid table path {}: {}", table, e)))?;
        if !query.is_empty() {
            url.query_pairs_mut().extend_pairs(query);
        }
        Ok(url)
    }

    fn authorized(&self, request: RequestBuilder) -> RequestBuilder {
        request
            .header("apikey", &self.key)
            .header("Authorization", format!("Bearer {}", self.key))
    }

    async fn check_status(response: Response, action: &str) -> Result<Response, AppError> {
        if response.status().is_success() {
            return Ok(response);
        }
        let status = response.status();
        let error_text = response
            .text()
            .await
            .unwrap_or_else(|_| "Unknown error".to_string());
        Err(AppError::StoreUnavailable(format!(
            "{} returned {}: {}",
            action, status, error_text
        )))
    }

    async fn select_rows(&self, query: &[(&str, &str)], action: &str) -> Result<Vec<Value>, AppError> {
        let url = self.table_url(&self.intake_table, query)?;
        tracing::debug!("{}: GET {}", action, url.path());

        let response = self
            .authorized(self.client.get(url))
            .send()
            .await
            .context(action)?;
        let response = Self::check_status(response, action).await?;

        let body: Value = response
            .json()
            .await
            .with_context(|| format!("{}: reading body", action))?;

        match body {
            Value::Array(rows) => Ok(rows),
            other => Err(AppError::MalformedResponse(format!(
                "{}: expected a list of rows, got {}",
                action,
                type_name(&other)
            ))),
        }
    }
}

fn type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "a list",
        Value::Object(_) => "an object",
    }
}

fn format_watermark(watermark: DateTime<Utc>) -> String {
    watermark.to_rfc3339_opts(SecondsFormat::Micros, true)
}

#[async_trait]
impl ClientStore for SupabaseClient {
    async fn latest_intake_created_at(&self) -> Result<Option<DateTime<Utc>>, AppError> {
        let rows = self
            .select_rows(
                &[
                    ("select", "created_at"),
                    ("order", "created_at.desc"),
                    ("limit", "1"),
                ],
                "Newest intake lookup",
            )
            .await?;

        let Some(row) = rows.first() else {
            return Ok(None);
        };
        let created_at = row
            .get("created_at")
            .and_then(Value::as_str)
            .ok_or_else(|| {
                AppError::MalformedResponse("Newest intake row without created_at".to_string())
            })?;

        parse_timestamp(created_at).map(Some)
    }

    async fn fetch_intake_since(
        &self,
        watermark: DateTime<Utc>,
    ) -> Result<Vec<FetchedIntake>, AppError> {
        let filter = format!("gt.{}", format_watermark(watermark));
        let rows = self
            .select_rows(
                &[
                    ("select", "*"),
                    ("created_at", filter.as_str()),
                    ("order", "created_at.asc"),
                ],
                "Intake poll",
            )
            .await?;

        rows.into_iter().map(FetchedIntake::from_json).collect()
    }

    async fn fetch_intake_by_client_id(
        &self,
        client_id: &str,
    ) -> Result<Option<IntakeRecord>, AppError> {
        let filter = format!("eq.{}", client_id);
        let rows = self
            .select_rows(
                &[
                    ("select", "*"),
                    ("client_id", filter.as_str()),
                    ("order", "created_at.desc"),
                    ("limit", "1"),
                ],
                "Intake lookup",
            )
            .await?;

        rows.into_iter().next().map(IntakeRecord::from_json).transpose()
    }

    async fn insert_analysis(&self, record: &AnalysisRecord) -> Result<(), AppError> {
        let url = self.table_url(&self.analysis_table, &[])?;

        let response = self
            .authorized(self.client.post(url))
            .header("Prefer", "return=minimal")
            .json(record)
            .send()
            .await
            .context("Analysis insert")?;
        Self::check_status(response, "Analysis insert").await?;

        tracing::debug!("Stored analysis row for client {}", record.client_id);
        Ok(())
    }
}
