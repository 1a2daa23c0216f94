//! Four-sleeve asset allocation.
//!
//! A base table per tolerance tier, then one adjustment: clients over 50
//! move 10 points from equity to debt (equity floored at 30); otherwise a
//! buffer under 6 months does the same with equity floored at 20 and debt
//! capped at 60. The floors and the cap are applied independently, so the
//! adjusted weights do not always total 100 (a low-tolerance client over
//! 50 ends at 110). That is kept as-is rather than renormalized.

use crate::models::{Allocation, RiskTolerance};

/// Age above which the equity-to-debt shift always applies.
pub const AGE_SHIFT_THRESHOLD: i64 = 50;
/// Emergency cover (months) below which younger clients are shifted.
pub const EMERGENCY_MONTHS_THRESHOLD: f64 = 6.0;

/// Unadjusted weights for a tier. Each totals 100.
pub fn base_allocation(tolerance: RiskTolerance) -> Allocation {
    match tolerance {
        RiskTolerance::High => Allocation {
            equity: 70,
            debt: 20,
            gold: 5,
            real_estate: 5,
        },
        RiskTolerance::Moderate => Allocation {
            equity: 50,
            debt: 30,
            gold: 10,
            real_estate: 10,
        },
        RiskTolerance::Low => Allocation {
            equity: 30,
            debt: 50,
            gold: 10,
            real_estate: 10,
        },
    }
}

/// Final weights for a client.
///
/// `emergency_fund_ratio` is the rounded ratio from the financial metrics.
pub fn allocate(tolerance: RiskTolerance, age: i64, emergency_fund_ratio: f64) -> Allocation {
    let mut allocation = base_allocation(tolerance);

    if age > AGE_SHIFT_THRESHOLD {
        allocation.equity = (allocation.equity - 10).max(30);
        allocation.debt += 10;
    } else if emergency_fund_ratio < EMERGENCY_MONTHS_THRESHOLD {
        allocation.debt = (allocation.debt + 10).min(60);
        allocation.equity = (allocation.equity - 10).max(20);
    }

    allocation
}
