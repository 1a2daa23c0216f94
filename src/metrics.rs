use crate::models::{round1, FinancialMetrics, IntakeRecord};

const INCOME_FIELDS: [&str; 3] = [
    "monthly_salary",
    "monthly_side_income",
    "monthly_other_income",
];

const EXPENSE_FIELDS: [&str; 3] = [
    "monthly_bills",
    "monthly_daily_life",
    "monthly_entertainment",
];

/// Sum of the monthly expense columns.
pub fn monthly_expenses(intake: &IntakeRecord) -> f64 {
    EXPENSE_FIELDS.iter().map(|f| intake.amount(f)).sum()
}

/// Emergency cash over monthly expenses, unrounded. Zero expenses give 0.
pub fn emergency_fund_months(emergency_cash: f64, monthly_expenses: f64) -> f64 {
    if monthly_expenses > 0.0 {
        emergency_cash / monthly_expenses
    } else {
        0.0
    }
}

/// Cash-flow figures for one intake record.
pub fn calculate_financial_metrics(intake: &IntakeRecord) -> FinancialMetrics {
    let monthly_income = INCOME_FIELDS.iter().map(|f| intake.amount(f)).sum();
    let monthly_expenses = monthly_expenses(intake);
    let monthly_savings = intake.amount("monthly_savings");
    let emergency_cash = intake.amount("emergency_cash");

    FinancialMetrics {
        monthly_income,
        monthly_expenses,
        monthly_savings,
        emergency_cash,
        annual_investment_capacity: monthly_savings * 12.0,
        emergency_fund_ratio: round1(emergency_fund_months(emergency_cash, monthly_expenses)),
    }
}
