use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// All monetary values, in the portfolio's base currency.
pub type Money = Decimal;

/// Rates expressed as decimals (0.05 = 5%). Never as percentages.
pub type Rate = Decimal;

/// Portfolio weights as fractions of portfolio value (0.10 = 10%).
pub type Weight = Decimal;

/// Instrument class, used to pick a concentration ceiling.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProductType {
    Equity,
    Etf,
    MutualFund,
    /// Exchange-traded commodity.
    Etc,
    Unknown,
}

/// Market regime hint passed through to the expected-returns collaborator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MarketRegime {
    Bull,
    Bear,
    Sideways,
}

fn default_true() -> bool {
    true
}

/// Business rules for one tradeable instrument.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SecurityRule {
    pub symbol: String,
    #[serde(default = "default_true")]
    pub active: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub country: Option<String>,
    /// Single industry or a comma-separated list.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub industry: Option<String>,
    /// Minimum tradeable quantity (0 = no lot rule).
    #[serde(default)]
    pub min_lot: Decimal,
    #[serde(default = "default_true")]
    pub allow_buy: bool,
    #[serde(default = "default_true")]
    pub allow_sell: bool,
    /// Custom minimum target, in percent (5 = 5%).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min_portfolio_target_pct: Option<Decimal>,
    /// Custom maximum target, in percent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_portfolio_target_pct: Option<Decimal>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub product_type: Option<ProductType>,
}

impl SecurityRule {
    /// An active, freely tradeable security with no overrides.
    pub fn new(symbol: impl Into<String>) -> Self {
        Self {
            symbol: symbol.into(),
            active: true,
            country: None,
            industry: None,
            min_lot: Decimal::ZERO,
            allow_buy: true,
            allow_sell: true,
            min_portfolio_target_pct: None,
            max_portfolio_target_pct: None,
            product_type: None,
        }
    }

    /// Industry names listed on the security, trimmed, empties dropped.
    pub fn industries(&self) -> Vec<&str> {
        self.industry
            .as_deref()
            .map(|raw| {
                raw.split(',')
                    .map(str::trim)
                    .filter(|s| !s.is_empty())
                    .collect()
            })
            .unwrap_or_default()
    }
}

/// Current position in one symbol.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CurrentHolding {
    pub symbol: String,
    pub quantity: Decimal,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub market_value_base: Option<Money>,
}

/// Everything the optimizer reads about the account for one run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PortfolioSnapshot {
    pub securities: Vec<SecurityRule>,
    #[serde(default)]
    pub holdings: Vec<CurrentHolding>,
    pub portfolio_value: Money,
    #[serde(default)]
    pub current_prices: HashMap<String, Money>,
    #[serde(default)]
    pub cash_balance: Money,
}

impl PortfolioSnapshot {
    /// Holdings indexed by symbol. Later duplicates win.
    pub fn holdings_by_symbol(&self) -> HashMap<String, CurrentHolding> {
        self.holdings
            .iter()
            .map(|h| (h.symbol.clone(), h.clone()))
            .collect()
    }
}

/// Weight of a holding from its stored market value; 0 when absent.
pub fn current_weight(holding: Option<&CurrentHolding>, portfolio_value: Money) -> Weight {
    if portfolio_value <= Decimal::ZERO {
        return Decimal::ZERO;
    }
    holding
        .and_then(|h| h.market_value_base)
        .map(|v| v / portfolio_value)
        .unwrap_or(Decimal::ZERO)
}

/// Like [`current_weight`], falling back to `quantity * price` when the
/// market value is missing.
pub fn current_weight_with_price(
    holding: Option<&CurrentHolding>,
    price: Option<Money>,
    portfolio_value: Money,
) -> Weight {
    if portfolio_value <= Decimal::ZERO {
        return Decimal::ZERO;
    }
    match holding {
        Some(h) => match (h.market_value_base, price) {
            (Some(v), _) => v / portfolio_value,
            (None, Some(p)) => h.quantity * p / portfolio_value,
            (None, None) => Decimal::ZERO,
        },
        None => Decimal::ZERO,
    }
}
