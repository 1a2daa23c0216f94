use crate::errors::AppError;
use crate::market_data::MarketAnalysis;
use chrono::{DateTime, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use utoipa::ToSchema;

/// Age assumed when the intake form carries none we can read.
pub const DEFAULT_AGE: i64 = 35;

// ============ Intake ============

/// One row of the intake table, as submitted by the client.
///
/// Only `client_id` and `created_at` are typed; every other column is kept
/// as raw JSON and read through the coercing accessors below, because the
/// form stores numbers as text as often as not.
#[derive(Debug, Clone, PartialEq)]
pub struct IntakeRecord {
    /// Unique, immutable client identifier.
    pub client_id: String,
    /// Store-assigned creation time; the only ordering key the poller trusts.
    pub created_at: DateTime<Utc>,
    /// All columns of the row, including the two above.
    pub fields: Map<String, Value>,
}

impl IntakeRecord {
    /// Decodes a row returned by either store backend.
    ///
    /// A row without a `client_id` or a readable `created_at` is a malformed
    /// store response, not malformed client input.
    pub fn from_json(row: Value) -> Result<Self, AppError> {
        FetchedIntake::from_json(row)?.record
    }

    fn from_fields(
        created_at: DateTime<Utc>,
        fields: Map<String, Value>,
    ) -> Result<Self, AppError> {
        let client_id = match fields.get("client_id") {
            Some(Value::String(s)) if !s.trim().is_empty() => s.clone(),
            Some(Value::Number(n)) => n.to_string(),
            _ => {
                return Err(AppError::MalformedResponse(format!(
                    "intake row created at {} without client_id",
                    created_at
                )))
            }
        };

        Ok(Self {
            client_id,
            created_at,
            fields,
        })
    }

    /// Raw column value, if present and not null.
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.fields.get(key).filter(|v| !v.is_null())
    }

    /// Column read as text; numbers are rendered, other shapes ignored.
    pub fn text(&self, key: &str) -> Option<String> {
        match self.get(key)? {
            Value::String(s) => Some(s.clone()),
            Value::Number(n) => Some(n.to_string()),
            Value::Bool(b) => Some(b.to_string()),
            _ => None,
        }
    }

    /// Money column; anything not coercible to a number reads as 0.
    pub fn amount(&self, key: &str) -> f64 {
        match self.get(key).and_then(coerce_f64) {
            Some(value) => value,
            None => {
                if let Some(raw) = self.get(key) {
                    tracing::debug!(
                        "Client {}: non-numeric {} ({}), using 0",
                        self.client_id,
                        key,
                        raw
                    );
                }
                0.0
            }
        }
    }

    /// Age in whole years, `DEFAULT_AGE` when missing or unreadable.
    pub fn age(&self) -> i64 {
        self.get("age")
            .and_then(coerce_i64)
            .unwrap_or(DEFAULT_AGE)
    }

    /// The declared tolerance, or the scenario answer when no tier was declared.
    pub fn declared_risk_tolerance(&self) -> Option<String> {
        self.text("risk_tolerance")
            .filter(|s| !s.trim().is_empty())
            .or_else(|| self.text("risk_scenario"))
    }

    /// The heterogeneous goals payload, `Value::Null` when absent.
    pub fn goals_payload(&self) -> &Value {
        static NO_GOALS: Value = Value::Null;
        self.fields.get("financial_goals").unwrap_or(&NO_GOALS)
    }
}

/// One row of a poll fetch.
///
/// The creation time is always known, so the poller can move past the row
/// even when the rest of it does not decode into an `IntakeRecord`.
#[derive(Debug, Clone)]
pub struct FetchedIntake {
    pub created_at: DateTime<Utc>,
    pub record: Result<IntakeRecord, AppError>,
}

impl FetchedIntake {
    /// Splits a raw row into its creation time and the decoded record.
    ///
    /// Only a row that is not an object, or has no readable `created_at`,
    /// is an error here: without a timestamp the row cannot be ordered.
    pub fn from_json(row: Value) -> Result<Self, AppError> {
        let Value::Object(fields) = row else {
            return Err(AppError::MalformedResponse(
                "intake row is not a JSON object".to_string(),
            ));
        };

        let created_at = fields
            .get("created_at")
            .and_then(Value::as_str)
            .ok_or_else(|| {
                AppError::MalformedResponse("intake row without created_at".to_string())
            })
            .and_then(parse_timestamp)?;

        Ok(Self {
            created_at,
            record: IntakeRecord::from_fields(created_at, fields),
        })
    }
}

impl From<IntakeRecord> for FetchedIntake {
    fn from(record: IntakeRecord) -> Self {
        Self {
            created_at: record.created_at,
            record: Ok(record),
        }
    }
}

/// Parses the store's timestamp formats into UTC.
pub fn parse_timestamp(timestamp_str: &str) -> Result<DateTime<Utc>, AppError> {
    DateTime::parse_from_rfc3339(timestamp_str)
        .map(|dt| dt.with_timezone(&Utc))
        .or_else(|_| {
            DateTime::parse_from_str(timestamp_str, "%Y-%m-%d %H:%M:%S%.f %z")
                .map(|dt| dt.with_timezone(&Utc))
        })
        .or_else(|_| {
            NaiveDateTime::parse_from_str(timestamp_str, "%Y-%m-%dT%H:%M:%S%.f")
                .or_else(|_| NaiveDateTime::parse_from_str(timestamp_str, "%Y-%m-%d %H:%M:%S%.f"))
                .map(|ndt| DateTime::<Utc>::from_naive_utc_and_offset(ndt, Utc))
        })
        .map_err(|e| {
            AppError::MalformedResponse(format!(
                "Invalid timestamp format '{}': {}",
                timestamp_str, e
            ))
        })
}

/// Number, numeric string, or bool as f64. Non-finite values are rejected.
pub fn coerce_f64(value: &Value) -> Option<f64> {
    let n = match value {
        Value::Number(n) => n.as_f64()?,
        Value::String(s) => s.trim().parse::<f64>().ok()?,
        Value::Bool(b) => f64::from(u8::from(*b)),
        _ => return None,
    };
    n.is_finite().then_some(n)
}

/// Integer, whole-number string, or bool as i64; floats truncate toward zero.
pub fn coerce_i64(value: &Value) -> Option<i64> {
    match value {
        Value::Number(n) => n
            .as_i64()
            .or_else(|| n.as_f64().filter(|f| f.is_finite()).map(|f| f.trunc() as i64)),
        Value::String(s) => s.trim().parse::<i64>().ok(),
        Value::Bool(b) => Some(i64::from(*b)),
        _ => None,
    }
}

/// Rounds to one decimal place.
pub fn round1(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}

// ============ Derived Models ============

/// One selected financial goal from the intake payload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct GoalRecord {
    /// Goal name as keyed in the payload (e.g. "retirement").
    #[serde(rename = "type")]
    pub goal_type: String,
    /// Years to the goal; 0 when missing or unreadable.
    pub years: u32,
    /// Target amount; 0 when missing or unreadable.
    pub amount: f64,
    /// Free-text description.
    pub description: String,
}

/// Monthly cash-flow figures derived from the intake form.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct FinancialMetrics {
    pub monthly_income: f64,
    pub monthly_expenses: f64,
    pub monthly_savings: f64,
    pub emergency_cash: f64,
    /// `monthly_savings * 12`.
    pub annual_investment_capacity: f64,
    /// Months of expenses covered by emergency cash, one decimal; 0 when
    /// there are no expenses.
    pub emergency_fund_ratio: f64,
}

/// Declared appetite for risk.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize, ToSchema,
)]
#[serde(rename_all = "lowercase")]
pub enum RiskTolerance {
    Low,
    #[default]
    Moderate,
    High,
}

impl RiskTolerance {
    pub fn as_str(&self) -> &'static str {
        match self {
            RiskTolerance::Low => "low",
            RiskTolerance::Moderate => "moderate",
            RiskTolerance::High => "high",
        }
    }
}

/// Capacity to bear risk. Variants are declared in rank order so the
/// derived `Ord` gives `Low < Medium < High`.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, ToSchema,
)]
pub enum RiskBand {
    Low,
    Medium,
    High,
}

impl RiskBand {
    pub fn as_str(&self) -> &'static str {
        match self {
            RiskBand::Low => "Low",
            RiskBand::Medium => "Medium",
            RiskBand::High => "High",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct RiskProfile {
    pub tolerance_level: RiskTolerance,
    pub risk_capacity: RiskBand,
    pub investment_horizon: String,
    pub emergency_fund_ratio: f64,
}

/// Percentage weights across the four sleeves.
///
/// Not guaranteed to total 100 once the age adjustment clamps equity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct Allocation {
    pub equity: i32,
    pub debt: i32,
    pub gold: i32,
    pub real_estate: i32,
}

impl Allocation {
    pub fn total(&self) -> i32 {
        self.equity + self.debt + self.gold + self.real_estate
    }
}

// ============ Analysis Document ============

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct ClientProfile {
    pub name: Option<String>,
    pub age: i64,
    pub occupation: Option<String>,
    pub city: Option<String>,
    pub financial_goals: Vec<String>,
    pub initial_investment: f64,
    pub investment_timeline: String,
    pub risk_tolerance: RiskTolerance,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct FinancialSituation {
    pub monthly_income: f64,
    pub monthly_expenses: f64,
    pub monthly_savings: f64,
    pub emergency_fund: f64,
    pub investment_capacity: f64,
    pub emergency_fund_ratio: f64,
    pub liquidity_needs: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct InvestmentObjectives {
    pub primary_goals: Vec<String>,
    /// Goal type to target amount, in payload order.
    #[schema(value_type = Object)]
    pub target_amounts: Map<String, Value>,
    /// Goal type to years, in payload order.
    #[schema(value_type = Object)]
    pub timeline: Map<String, Value>,
    pub target_return: String,
    pub constraints: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct SleeveWeights {
    pub equity: String,
    pub debt: String,
    pub gold: String,
    pub real_estate: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct MutualFundSplit {
    pub equity_funds: String,
    pub debt_funds: String,
    pub hybrid_funds: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct InvestmentVehicles {
    pub mutual_funds: MutualFundSplit,
    pub direct_stocks: String,
    pub fixed_income_instruments: String,
    pub real_estate_investments: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct InvestmentStrategy {
    pub asset_allocation: SleeveWeights,
    pub investment_vehicles: InvestmentVehicles,
    pub tax_planning_strategy: String,
}

/// Numeric breakdown of the sleeves into holding types.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct PortfolioData {
    #[serde(rename = "Equity Mutual Funds")]
    pub equity_mutual_funds: f64,
    #[serde(rename = "Direct Equity")]
    pub direct_equity: f64,
    #[serde(rename = "Debt Mutual Funds")]
    pub debt_mutual_funds: f64,
    #[serde(rename = "Government Bonds")]
    pub government_bonds: f64,
    #[serde(rename = "Corporate FDs")]
    pub corporate_fds: f64,
    #[serde(rename = "Gold ETFs")]
    pub gold_etfs: f64,
    #[serde(rename = "Real Estate")]
    pub real_estate: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct RecommendedPortfolio {
    #[serde(rename = "Large_Cap_Stocks")]
    pub large_cap_stocks: String,
    #[serde(rename = "Mid_Cap_Stocks")]
    pub mid_cap_stocks: String,
    #[serde(rename = "Small_Cap_Stocks")]
    pub small_cap_stocks: String,
    #[serde(rename = "Government_Bonds")]
    pub government_bonds: String,
    #[serde(rename = "Corporate_FDs")]
    pub corporate_fds: String,
    #[serde(rename = "Gold_ETFs")]
    pub gold_etfs: String,
    #[serde(rename = "Real_Estate")]
    pub real_estate: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct PortfolioRecommendation {
    pub portfolio: RecommendedPortfolio,
    pub strategy: String,
}

/// Full derived document for one client, as returned by the on-demand endpoint.
#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
pub struct AnalysisDocument {
    pub client_profile: ClientProfile,
    pub financial_situation: FinancialSituation,
    pub investment_objectives: InvestmentObjectives,
    pub risk_profile: RiskProfile,
    pub investment_strategy: InvestmentStrategy,
    pub portfolio_data: PortfolioData,
    pub portfolio_recommendation: PortfolioRecommendation,
    #[schema(value_type = MarketAnalysis)]
    pub market_analysis: &'static MarketAnalysis,
}

// ============ Persistence Model ============

/// Denormalized row written to the analysis table.
///
/// Each sub-document is stored as JSON text.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisRecord {
    pub client_id: String,
    pub user_id: String,
    pub client_profile: String,
    pub financial_situation: String,
    pub investment_objectives: String,
    pub investment_strategy: String,
    pub risk_profile: String,
    pub portfolio_data: String,
    pub portfolio_recommendation: String,
    pub mutual_funds_analysis: String,
    pub bonds_analysis: String,
    pub fixed_deposits_analysis: String,
}

impl AnalysisRecord {
    pub fn from_document(
        client_id: &str,
        user_id: &str,
        doc: &AnalysisDocument,
    ) -> Result<Self, AppError> {
        Ok(Self {
            client_id: client_id.to_string(),
            user_id: user_id.to_string(),
            client_profile: serde_json::to_string(&doc.client_profile)?,
            financial_situation: serde_json::to_string(&doc.financial_situation)?,
            investment_objectives: serde_json::to_string(&doc.investment_objectives)?,
            investment_strategy: serde_json::to_string(&doc.investment_strategy)?,
            risk_profile: serde_json::to_string(&doc.risk_profile)?,
            portfolio_data: serde_json::to_string(&doc.portfolio_data)?,
            portfolio_recommendation: serde_json::to_string(&doc.portfolio_recommendation)?,
            mutual_funds_analysis: serde_json::to_string(&doc.market_analysis.mutual_funds)?,
            bonds_analysis: serde_json::to_string(&doc.market_analysis.bonds)?,
            fixed_deposits_analysis: serde_json::to_string(&serde_json::json!({
                "Fixed_Deposits": doc.market_analysis.fixed_deposits,
            }))?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn record(fields: Value) -> IntakeRecord {
        IntakeRecord::from_json(fields).unwrap()
    }

    #[test]
    fn test_from_json_requires_identity_and_timestamp() {
        assert!(IntakeRecord::from_json(json!({"created_at": "2024-05-01T10:00:00Z"})).is_err());
        assert!(IntakeRecord::from_json(json!({"client_id": "c-1"})).is_err());
        assert!(IntakeRecord::from_json(json!({"client_id": "c-1", "created_at": "yesterday"}))
            .is_err());
        assert!(IntakeRecord::from_json(json!(["c-1"])).is_err());
    }

    #[test]
    fn test_fetched_row_without_identity_keeps_timestamp() {
        for client_id in [json!(null), json!(""), json!("   ")] {
            let fetched = FetchedIntake::from_json(json!({
                "client_id": client_id,
                "created_at": "2024-05-01T10:00:01Z",
            }))
            .unwrap();

            assert_eq!(fetched.created_at, parse_timestamp("2024-05-01T10:00:01Z").unwrap());
            assert!(matches!(fetched.record, Err(AppError::MalformedResponse(_))));
        }
    }

    #[test]
    fn test_fetched_row_without_timestamp_is_an_error() {
        assert!(FetchedIntake::from_json(json!({"client_id": "c-1"})).is_err());
        assert!(FetchedIntake::from_json(json!({"client_id": "c-1", "created_at": 17})).is_err());
        assert!(FetchedIntake::from_json(json!("c-1")).is_err());
    }

    #[test]
    fn test_timestamp_formats() {
        let expected = parse_timestamp("2024-05-01T10:00:00Z").unwrap();
        assert_eq!(parse_timestamp("2024-05-01T10:00:00+00:00").unwrap(), expected);
        assert_eq!(parse_timestamp("2024-05-01T15:30:00+05:30").unwrap(), expected);
        assert_eq!(parse_timestamp("2024-05-01 10:00:00").unwrap(), expected);
        assert_eq!(parse_timestamp("2024-05-01T10:00:00.000").unwrap(), expected);
    }

    #[test]
    fn test_amount_coercion() {
        let r = record(json!({
            "client_id": "c-1",
            "created_at": "2024-05-01T10:00:00Z",
            "monthly_salary": "85000",
            "monthly_side_income": 1500.5,
            "monthly_other_income": "n/a",
            "monthly_bills": null,
        }));

        assert_eq!(r.amount("monthly_salary"), 85000.0);
        assert_eq!(r.amount("monthly_side_income"), 1500.5);
        assert_eq!(r.amount("monthly_other_income"), 0.0);
        assert_eq!(r.amount("monthly_bills"), 0.0);
        assert_eq!(r.amount("missing"), 0.0);
    }

    #[test]
    fn test_age_defaults_and_truncates() {
        let base = json!({"client_id": "c-1", "created_at": "2024-05-01T10:00:00Z"});
        assert_eq!(record(base.clone()).age(), DEFAULT_AGE);

        let mut with_age = base.clone();
        with_age["age"] = json!("42");
        assert_eq!(record(with_age).age(), 42);

        let mut float_age = base.clone();
        float_age["age"] = json!(29.9);
        assert_eq!(record(float_age).age(), 29);

        let mut bad_age = base;
        bad_age["age"] = json!("thirty");
        assert_eq!(record(bad_age).age(), DEFAULT_AGE);
    }

    #[test]
    fn test_declared_tolerance_falls_back_to_scenario() {
        let r = record(json!({
            "client_id": "c-1",
            "created_at": "2024-05-01T10:00:00Z",
            "risk_tolerance": "",
            "risk_scenario": "Let me wait and watch for a while",
        }));
        assert_eq!(
            r.declared_risk_tolerance().as_deref(),
            Some("Let me wait and watch for a while")
        );
    }

    #[test]
    fn test_risk_band_rank_order() {
        assert!(RiskBand::Low < RiskBand::Medium);
        assert!(RiskBand::Medium < RiskBand::High);
        assert_eq!(RiskBand::High.min(RiskBand::Medium), RiskBand::Medium);
    }
}
