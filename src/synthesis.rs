//! Record synthesis: intake record -> full analysis document.
//!
//! Pure composition of the goal, metrics, risk and allocation steps plus
//! the shared market content. Used unchanged by the poller and by the
//! on-demand endpoint.

use crate::allocation::allocate;
use crate::goals::normalize_goals;
use crate::market_data::market_analysis;
use crate::metrics::calculate_financial_metrics;
use crate::models::*;
use crate::risk::determine_risk_profile;
use serde_json::Value;

const TARGET_RETURN: &str = "7-9% p.a.";
const TAX_PLANNING_STRATEGY: &str =
    "Investing in ELSS Mutual Funds, Utilizing Section 80C and 10(14)";
const CONSTRAINTS: [&str; 2] = [
    "Tax-efficiency",
    "Maintaining liquidity for short term needs",
];

/// Runs every derivation step for one intake record.
pub fn synthesize(intake: &IntakeRecord) -> AnalysisDocument {
    let goals = normalize_goals(intake.goals_payload());
    let metrics = calculate_financial_metrics(intake);
    let risk_profile = determine_risk_profile(intake);
    let allocation = allocate(
        risk_profile.tolerance_level,
        intake.age(),
        metrics.emergency_fund_ratio,
    );

    compose(intake, &goals, &metrics, risk_profile, allocation)
}

/// Assembles the document from already-derived parts.
pub fn compose(
    intake: &IntakeRecord,
    goals: &[GoalRecord],
    metrics: &FinancialMetrics,
    risk_profile: RiskProfile,
    allocation: Allocation,
) -> AnalysisDocument {
    let goal_types: Vec<String> = goals.iter().map(|g| g.goal_type.clone()).collect();

    let client_profile = ClientProfile {
        name: intake.text("name"),
        age: intake.age(),
        occupation: intake.text("occupation"),
        city: intake.text("city"),
        financial_goals: goal_types.clone(),
        initial_investment: metrics.annual_investment_capacity,
        investment_timeline: risk_profile.investment_horizon.clone(),
        risk_tolerance: risk_profile.tolerance_level,
    };

    let financial_situation = FinancialSituation {
        monthly_income: metrics.monthly_income,
        monthly_expenses: metrics.monthly_expenses,
        monthly_savings: metrics.monthly_savings,
        emergency_fund: metrics.emergency_cash,
        investment_capacity: metrics.annual_investment_capacity,
        emergency_fund_ratio: metrics.emergency_fund_ratio,
        liquidity_needs: if metrics.emergency_fund_ratio > 6.0 {
            "Low".to_string()
        } else {
            "Medium".to_string()
        },
    };

    let investment_objectives = InvestmentObjectives {
        primary_goals: goal_types,
        target_amounts: goals
            .iter()
            .map(|g| (g.goal_type.clone(), Value::from(g.amount)))
            .collect(),
        timeline: goals
            .iter()
            .map(|g| (g.goal_type.clone(), Value::from(g.years)))
            .collect(),
        target_return: TARGET_RETURN.to_string(),
        constraints: CONSTRAINTS.iter().map(|c| c.to_string()).collect(),
    };

    let equity = f64::from(allocation.equity);
    let debt = f64::from(allocation.debt);

    let investment_strategy = InvestmentStrategy {
        asset_allocation: SleeveWeights {
            equity: whole_pct(allocation.equity),
            debt: whole_pct(allocation.debt),
            gold: whole_pct(allocation.gold),
            real_estate: whole_pct(allocation.real_estate),
        },
        investment_vehicles: InvestmentVehicles {
            mutual_funds: MutualFundSplit {
                equity_funds: pct(equity * 0.6),
                debt_funds: pct(debt * 0.6),
                hybrid_funds: pct((equity + debt) * 0.1),
            },
            direct_stocks: pct(equity * 0.4),
            fixed_income_instruments: pct(debt * 0.4),
            real_estate_investments: whole_pct(allocation.real_estate),
        },
        tax_planning_strategy: TAX_PLANNING_STRATEGY.to_string(),
    };

    let portfolio_data = PortfolioData {
        equity_mutual_funds: round1(equity * 0.6),
        direct_equity: round1(equity * 0.4),
        debt_mutual_funds: round1(debt * 0.6),
        government_bonds: round1(debt * 0.2),
        corporate_fds: round1(debt * 0.2),
        gold_etfs: f64::from(allocation.gold),
        real_estate: f64::from(allocation.real_estate),
    };

    let portfolio_recommendation = PortfolioRecommendation {
        portfolio: RecommendedPortfolio {
            large_cap_stocks: pct(equity * 0.4),
            mid_cap_stocks: pct(equity * 0.3),
            small_cap_stocks: pct(equity * 0.3),
            government_bonds: pct(debt * 0.4),
            corporate_fds: pct(debt * 0.2),
            gold_etfs: whole_pct(allocation.gold),
            real_estate: whole_pct(allocation.real_estate),
        },
        strategy: strategy_narrative(intake.age(), metrics, &risk_profile, &allocation),
    };

    AnalysisDocument {
        client_profile,
        financial_situation,
        investment_objectives,
        risk_profile,
        investment_strategy,
        portfolio_data,
        portfolio_recommendation,
        market_analysis: market_analysis(),
    }
}

fn strategy_narrative(
    age: i64,
    metrics: &FinancialMetrics,
    risk_profile: &RiskProfile,
    allocation: &Allocation,
) -> String {
    format!(
        "Based on your {} risk tolerance and age of {}, we recommend a {} risk portfolio. \
         With monthly savings of ₹{} and an emergency fund covering {:.1} months of expenses, \
         this portfolio is designed to help achieve your financial goals while maintaining \
         appropriate risk levels. The strategy focuses on {}% equity exposure through a mix of \
         mutual funds and direct stocks, providing growth potential while managing risk through \
         diversification across {}% debt instruments and {}% gold for stability.",
        risk_profile.tolerance_level.as_str(),
        age,
        risk_profile.risk_capacity.as_str(),
        format_money(metrics.monthly_savings),
        metrics.emergency_fund_ratio,
        allocation.equity,
        allocation.debt,
        allocation.gold,
    )
}

fn whole_pct(value: i32) -> String {
    format!("{}%", value)
}

fn pct(value: f64) -> String {
    format!("{:.1}%", round1(value))
}

/// Two decimals with comma-grouped thousands, e.g. `1,234,567.80`.
pub fn format_money(value: f64) -> String {
    let fixed = format!("{:.2}", value.abs());
    let (int_part, frac_part) = fixed.split_once('.').unwrap_or((fixed.as_str(), "00"));

    let mut grouped = String::with_capacity(int_part.len() + int_part.len() / 3);
    for (i, ch) in int_part.chars().enumerate() {
        if i > 0 && (int_part.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(ch);
    }

    let sign = if value < 0.0 { "-" } else { "" };
    format!("{}{}.{}", sign, grouped, frac_part)
}
