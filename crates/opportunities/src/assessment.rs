//! Assessment - scenario projections and threshold alerts for an
//! opportunity, computed before committing to it
//!
//! Three scenarios shift the expected return down and up by a fixed band
//! around the base. Alerts flag a low base return, a wide spread between
//! the outer scenarios, and a short maturity.

use bases_core::{Amount, Opportunity, OpportunityId, Rate, Tick};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};

/// Return shift between the base scenario and each outer scenario
pub const SCENARIO_BAND: Rate = dec!(0.02);

/// capital * (1 + rate), floored at zero. None on overflow.
pub fn payout_at(capital: Amount, rate: Rate) -> Option<Amount> {
    let payout = capital.scale(Decimal::ONE + rate)?;
    Some(payout.max(Amount::ZERO))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ScenarioLabel {
    Pessimistic,
    Base,
    Optimistic,
}

/// Payout of the required capital under one scenario
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ScenarioProjection {
    pub label: ScenarioLabel,
    pub expected_return: Rate,
    pub payout: Amount,
    /// Payout minus capital; negative when the scenario loses money
    pub gain: Amount,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ScenarioSet {
    pub pessimistic: ScenarioProjection,
    pub base: ScenarioProjection,
    pub optimistic: ScenarioProjection,
}

impl ScenarioSet {
    /// Project `opportunity` at its expected return and `band` either side
    pub fn project(opportunity: &Opportunity, band: Rate) -> Option<Self> {
        let capital = opportunity.required_capital;
        let base = opportunity.expected_return;
        Some(Self {
            pessimistic: projection(ScenarioLabel::Pessimistic, capital, base - band)?,
            base: projection(ScenarioLabel::Base, capital, base)?,
            optimistic: projection(ScenarioLabel::Optimistic, capital, base + band)?,
        })
    }

    pub fn iter(&self) -> impl Iterator<Item = &ScenarioProjection> {
        [&self.pessimistic, &self.base, &self.optimistic].into_iter()
    }

    /// Optimistic minus pessimistic payout, relative to the base gain
    ///
    /// Zero when the base scenario gains nothing.
    pub fn risk_spread(&self) -> Decimal {
        if !self.base.gain.is_positive() {
            return Decimal::ZERO;
        }
        let spread = self.optimistic.payout.minor() - self.pessimistic.payout.minor();
        Decimal::from(spread) / Decimal::from(self.base.gain.minor())
    }
}

fn projection(label: ScenarioLabel, capital: Amount, rate: Rate) -> Option<ScenarioProjection> {
    let payout = payout_at(capital, rate)?;
    Some(ScenarioProjection {
        label,
        expected_return: rate,
        payout,
        gain: payout.checked_sub(capital)?,
    })
}

/// Limits past which an assessment raises an alert
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AlertThresholds {
    /// Base returns below this are flagged
    pub min_return: Rate,
    /// Risk spreads above this are flagged
    pub max_risk_spread: Rate,
    /// Maturities shorter than this are flagged
    pub short_maturity: Tick,
}

impl Default for AlertThresholds {
    fn default() -> Self {
        Self {
            min_return: dec!(0.01),
            max_risk_spread: dec!(0.5),
            short_maturity: 24,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum AlertSeverity {
    Info,
    Warning,
    Critical,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AlertKind {
    LowReturn,
    HighRiskSpread,
    ShortMaturity,
}

impl AlertKind {
    pub fn severity(self) -> AlertSeverity {
        match self {
            AlertKind::LowReturn => AlertSeverity::Warning,
            AlertKind::HighRiskSpread => AlertSeverity::Critical,
            AlertKind::ShortMaturity => AlertSeverity::Info,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OpportunityAlert {
    pub kind: AlertKind,
    pub severity: AlertSeverity,
    pub message: String,
}

impl OpportunityAlert {
    fn new(kind: AlertKind, message: String) -> Self {
        Self {
            kind,
            severity: kind.severity(),
            message,
        }
    }
}

/// Scenarios and alerts for one opportunity
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Assessment {
    pub opportunity_id: OpportunityId,
    pub scenarios: ScenarioSet,
    pub alerts: Vec<OpportunityAlert>,
}

impl Assessment {
    /// None if a scenario payout does not fit in an `Amount`
    pub fn of(opportunity: &Opportunity, thresholds: &AlertThresholds) -> Option<Self> {
        let scenarios = ScenarioSet::project(opportunity, SCENARIO_BAND)?;
        let mut alerts = Vec::new();

        if opportunity.expected_return < thresholds.min_return {
            alerts.push(OpportunityAlert::new(
                AlertKind::LowReturn,
                format!(
                    "expected return {} is below {}",
                    opportunity.expected_return, thresholds.min_return
                ),
            ));
        }

        let spread = scenarios.risk_spread();
        if spread > thresholds.max_risk_spread {
            alerts.push(OpportunityAlert::new(
                AlertKind::HighRiskSpread,
                format!(
                    "scenario spread is {} times the base gain",
                    spread.round_dp(2)
                ),
            ));
        }

        if opportunity.maturity_ticks < thresholds.short_maturity {
            alerts.push(OpportunityAlert::new(
                AlertKind::ShortMaturity,
                format!(
                    "matures after {} ticks, under {}",
                    opportunity.maturity_ticks, thresholds.short_maturity
                ),
            ));
        }

        Some(Self {
            opportunity_id: opportunity.id,
            scenarios,
            alerts,
        })
    }

    pub fn has(&self, kind: AlertKind) -> bool {
        self.alerts.iter().any(|alert| alert.kind == kind)
    }

    /// Most severe alert raised, if any
    pub fn severity(&self) -> Option<AlertSeverity> {
        self.alerts.iter().map(|alert| alert.severity).max()
    }
}
