//! Risk tolerance resolution and risk-capacity profiling.

use crate::metrics::{emergency_fund_months, monthly_expenses};
use crate::models::{round1, IntakeRecord, RiskBand, RiskProfile, RiskTolerance};

/// Horizon attached to every profile.
pub const INVESTMENT_HORIZON: &str = "10 years";

/// Answers to the market-drop question on the intake form.
const SCENARIO_ANSWERS: [(&str, RiskTolerance); 3] = [
    ("get me out of here! sell everything!", RiskTolerance::Low),
    ("let me wait and watch for a while", RiskTolerance::Moderate),
    ("great time to buy more at a discount!", RiskTolerance::High),
];

/// Resolves a declared tolerance or a scenario answer to a tier.
///
/// Matching is case-insensitive; anything unrecognized is `Moderate`.
pub fn resolve_tolerance(declared: Option<&str>) -> RiskTolerance {
    let Some(declared) = declared else {
        return RiskTolerance::default();
    };
    let normalized = declared.trim().to_lowercase();

    match normalized.as_str() {
        "low" => RiskTolerance::Low,
        "moderate" => RiskTolerance::Moderate,
        "high" => RiskTolerance::High,
        phrase => SCENARIO_ANSWERS
            .iter()
            .find(|(answer, _)| *answer == phrase)
            .map(|(_, tolerance)| *tolerance)
            .unwrap_or_default(),
    }
}

/// Capacity band from age alone.
pub fn age_band(age: i64) -> RiskBand {
    match age {
        a if a < 30 => RiskBand::High,
        a if a < 45 => RiskBand::Medium,
        _ => RiskBand::Low,
    }
}

/// Applies the emergency-fund adjustment to an age band.
///
/// Under 3 months forces `Low`; under 6 months caps at `Medium` and never
/// raises a lower band.
pub fn adjust_for_emergency_fund(band: RiskBand, emergency_months: f64) -> RiskBand {
    if emergency_months < 3.0 {
        RiskBand::Low
    } else if emergency_months < 6.0 {
        band.min(RiskBand::Medium)
    } else {
        band
    }
}

/// Builds the risk profile for one intake record.
pub fn determine_risk_profile(intake: &IntakeRecord) -> RiskProfile {
    let tolerance = resolve_tolerance(intake.declared_risk_tolerance().as_deref());
    let emergency_months =
        emergency_fund_months(intake.amount("emergency_cash"), monthly_expenses(intake));
    let risk_capacity = adjust_for_emergency_fund(age_band(intake.age()), emergency_months);

    RiskProfile {
        tolerance_level: tolerance,
        risk_capacity,
        investment_horizon: INVESTMENT_HORIZON.to_string(),
        emergency_fund_ratio: round1(emergency_months),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn intake(mut fields: serde_json::Value) -> IntakeRecord {
        fields["client_id"] = json!("c-1");
        fields["created_at"] = json!("2024-05-01T10:00:00Z");
        IntakeRecord::from_json(fields).unwrap()
    }

    #[test]
    fn test_tolerance_tiers_case_insensitive() {
        assert_eq!(resolve_tolerance(Some("HIGH")), RiskTolerance::High);
        assert_eq!(resolve_tolerance(Some(" Low ")), RiskTolerance::Low);
        assert_eq!(resolve_tolerance(Some("Moderate")), RiskTolerance::Moderate);
    }

    #[test]
    fn test_tolerance_from_scenario_answers() {
        assert_eq!(
            resolve_tolerance(Some("Get me out of here! Sell everything!")),
            RiskTolerance::Low
        );
        assert_eq!(
            resolve_tolerance(Some("Let me wait and watch for a while")),
            RiskTolerance::Moderate
        );
        assert_eq!(
            resolve_tolerance(Some("Great time to buy more at a discount!")),
            RiskTolerance::High
        );
    }

    #[test]
    fn test_unrecognized_tolerance_is_moderate() {
        assert_eq!(resolve_tolerance(Some("aggressive")), RiskTolerance::Moderate);
        assert_eq!(resolve_tolerance(Some("")), RiskTolerance::Moderate);
        assert_eq!(resolve_tolerance(None), RiskTolerance::Moderate);
    }

    #[test]
    fn test_age_bands() {
        assert_eq!(age_band(22), RiskBand::High);
        assert_eq!(age_band(29), RiskBand::High);
        assert_eq!(age_band(30), RiskBand::Medium);
        assert_eq!(age_band(44), RiskBand::Medium);
        assert_eq!(age_band(45), RiskBand::Low);
        assert_eq!(age_band(70), RiskBand::Low);
    }

    #[test]
    fn test_thin_emergency_fund_forces_low() {
        assert_eq!(adjust_for_emergency_fund(RiskBand::High, 2.9), RiskBand::Low);
        assert_eq!(adjust_for_emergency_fund(RiskBand::Medium, 0.0), RiskBand::Low);
    }

    #[test]
    fn test_moderate_emergency_fund_caps_by_rank() {
        // Compared by rank, High is capped. A string comparison would keep "High".
        assert_eq!(adjust_for_emergency_fund(RiskBand::High, 4.0), RiskBand::Medium);
        assert_eq!(adjust_for_emergency_fund(RiskBand::Medium, 5.9), RiskBand::Medium);
        assert_eq!(adjust_for_emergency_fund(RiskBand::Low, 3.0), RiskBand::Low);
    }

    #[test]
    fn test_healthy_emergency_fund_keeps_age_band() {
        assert_eq!(adjust_for_emergency_fund(RiskBand::High, 6.0), RiskBand::High);
        assert_eq!(adjust_for_emergency_fund(RiskBand::Low, 24.0), RiskBand::Low);
    }

    #[test]
    fn test_profile_for_older_client_with_large_buffer() {
        let profile = determine_risk_profile(&intake(json!({
            "age": 55,
            "risk_tolerance": "high",
            "emergency_cash": 600000,
            "monthly_bills": 20000,
            "monthly_daily_life": 10000,
            "monthly_entertainment": 5000
        })));

        assert_eq!(profile.tolerance_level, RiskTolerance::High);
        assert_eq!(profile.risk_capacity, RiskBand::Low);
        assert_eq!(profile.investment_horizon, "10 years");
        assert_eq!(profile.emergency_fund_ratio, 17.1);
    }

    #[test]
    fn test_profile_young_client_without_expenses() {
        // No expenses means a ratio of 0, which forces Low.
        let profile = determine_risk_profile(&intake(json!({
            "age": "25",
            "risk_tolerance": "Great time to buy more at a discount!",
            "emergency_cash": 100000
        })));

        assert_eq!(profile.tolerance_level, RiskTolerance::High);
        assert_eq!(profile.risk_capacity, RiskBand::Low);
        assert_eq!(profile.emergency_fund_ratio, 0.0);
    }
}
