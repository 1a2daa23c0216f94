//! Illustrative market listings attached to every analysis.
//!
//! These are fixed content, not quotes: nothing here is fetched or derived
//! from client input. Both the poller and the on-demand endpoint read the
//! same instance through [`market_analysis`].

use serde::{Deserialize, Serialize};
use std::sync::OnceLock;
use utoipa::ToSchema;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct FundListing {
    pub fund_name: String,
    pub category: String,
    pub recommendation: String,
    #[serde(rename = "1yr_returns")]
    pub one_year_returns: String,
    #[serde(rename = "3yr_returns")]
    pub three_year_returns: String,
    pub risk_rating: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct BondListing {
    pub bond_name: String,
    #[serde(rename = "yield")]
    pub bond_yield: String,
    pub maturity: String,
    pub recommendation: String,
    pub risk_rating: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct FixedDepositListing {
    pub bank_name: String,
    pub duration: String,
    pub interest_rate: String,
    pub recommendation: String,
    pub special_benefits: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct MutualFunds {
    pub equity_funds: Vec<FundListing>,
    pub debt_funds: Vec<FundListing>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct Bonds {
    pub government: Vec<BondListing>,
    pub corporate: Vec<BondListing>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct MarketAnalysis {
    pub mutual_funds: MutualFunds,
    pub bonds: Bonds,
    pub fixed_deposits: Vec<FixedDepositListing>,
}

/// The shared market-content block.
pub fn market_analysis() -> &'static MarketAnalysis {
    static CONTENT: OnceLock<MarketAnalysis> = OnceLock::new();
    CONTENT.get_or_init(build)
}

fn build() -> MarketAnalysis {
    MarketAnalysis {
        mutual_funds: MutualFunds {
            equity_funds: vec![FundListing {
                fund_name: "HDFC Top 100 Fund".into(),
                category: "Large Cap".into(),
                recommendation: "BUY".into(),
                one_year_returns: "12.5%".into(),
                three_year_returns: "15.8%".into(),
                risk_rating: "Moderate".into(),
            }],
            debt_funds: vec![FundListing {
                fund_name: "ICICI Prudential Corporate Bond Fund".into(),
                category: "Corporate Bond".into(),
                recommendation: "BUY".into(),
                one_year_returns: "6.8%".into(),
                three_year_returns: "8.2%".into(),
                risk_rating: "Low to Moderate".into(),
            }],
        },
        bonds: Bonds {
            government: vec![BondListing {
                bond_name: "7.26% GOI 2033".into(),
                bond_yield: "7.26%".into(),
                maturity: "2033".into(),
                recommendation: "BUY".into(),
                risk_rating: "Sovereign".into(),
            }],
            corporate: vec![BondListing {
                bond_name: "HDFC 7.95% 2025".into(),
                bond_yield: "7.95%".into(),
                maturity: "2025".into(),
                recommendation: "BUY".into(),
                risk_rating: "Low".into(),
            }],
        },
        fixed_deposits: vec![FixedDepositListing {
            bank_name: "SBI".into(),
            duration: "5 years".into(),
            interest_rate: "6.50%".into(),
            recommendation: "BUY".into(),
            special_benefits: "Additional 0.5% for senior citizens".into(),
        }],
    }
}
