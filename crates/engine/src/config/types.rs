use bases_core::{AccountId, Amount, InstrumentId, OpportunitySpec, Rate, Tick};
use bases_expansion::{AlwaysFail, AlwaysSucceed, ProbabilisticMaturity};
use bases_opportunities::{
    NoOpportunities, RandomOpportunities, RandomOpportunitiesConfig, ScheduledOpportunities,
};
use bases_ports::{MaturityPolicy, OpportunityPolicy};
use serde::{Deserialize, Serialize};

/// Simulation configuration file
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimulationSettings {
    /// Wall-clock pacing for the async driver. Never affects results.
    pub tick_interval_ms: u64,
    /// First tick the engine executes
    pub start_tick: Tick,
    /// Instruments listed on the venue at startup
    pub instruments: Vec<InstrumentId>,
    /// Accounts seeded from the market account at startup
    pub initial_accounts: Vec<InitialAccount>,
    /// Matching rule by name ("price-time", "midpoint")
    pub matching_algorithm: String,
    pub opportunity_policy: OpportunityPolicyConfig,
    pub maturity_policy: MaturityPolicyConfig,
}

impl Default for SimulationSettings {
    fn default() -> Self {
        Self {
            tick_interval_ms: 100,
            start_tick: 0,
            instruments: Vec::new(),
            initial_accounts: Vec::new(),
            matching_algorithm: "price-time".to_string(),
            opportunity_policy: OpportunityPolicyConfig::None,
            maturity_policy: MaturityPolicyConfig::AlwaysSucceed,
        }
    }
}

/// Seed balance for one account
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InitialAccount {
    pub id: AccountId,
    pub balance: Amount,
}

/// One entry of a scheduled opportunity list
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScheduledEntry {
    pub tick: Tick,
    pub spec: OpportunitySpec,
}

/// Built-in opportunity generation policies
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum OpportunityPolicyConfig {
    None,
    Scheduled {
        entries: Vec<ScheduledEntry>,
    },
    Random {
        seed: u64,
        #[serde(default)]
        ranges: RandomOpportunitiesConfig,
    },
}

impl OpportunityPolicyConfig {
    pub fn build(&self) -> Box<dyn OpportunityPolicy> {
        match self {
            OpportunityPolicyConfig::None => Box::new(NoOpportunities),
            OpportunityPolicyConfig::Scheduled { entries } => Box::new(
                entries
                    .iter()
                    .fold(ScheduledOpportunities::new(), |schedule, entry| {
                        schedule.at(entry.tick, entry.spec.clone())
                    }),
            ),
            OpportunityPolicyConfig::Random { seed, ranges } => {
                Box::new(RandomOpportunities::with_seed(ranges.clone(), *seed))
            }
        }
    }
}

/// Built-in maturity outcome rules
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum MaturityPolicyConfig {
    AlwaysSucceed,
    AlwaysFail {
        loss_fraction: Rate,
    },
    Probabilistic {
        success_probability: f64,
        loss_fraction: Rate,
        seed: u64,
    },
}

impl MaturityPolicyConfig {
    pub fn build(&self) -> Box<dyn MaturityPolicy> {
        match self {
            MaturityPolicyConfig::AlwaysSucceed => Box::new(AlwaysSucceed),
            MaturityPolicyConfig::AlwaysFail { loss_fraction } => {
                Box::new(AlwaysFail::new(*loss_fraction))
            }
            MaturityPolicyConfig::Probabilistic {
                success_probability,
                loss_fraction,
                seed,
            } => Box::new(ProbabilisticMaturity::new(
                *success_probability,
                *loss_fraction,
                *seed,
            )),
        }
    }
}

/// Settings plus the policies the engine will run with
///
/// Policies default to the ones named in the settings; the `with_*`
/// builders inject custom implementations instead.
pub struct EngineConfig {
    pub settings: SimulationSettings,
    opportunity_policy: Option<Box<dyn OpportunityPolicy>>,
    maturity_policy: Option<Box<dyn MaturityPolicy>>,
}

impl EngineConfig {
    pub fn new(settings: SimulationSettings) -> Self {
        Self {
            settings,
            opportunity_policy: None,
            maturity_policy: None,
        }
    }

    pub fn with_opportunity_policy(mut self, policy: Box<dyn OpportunityPolicy>) -> Self {
        self.opportunity_policy = Some(policy);
        self
    }

    pub fn with_maturity_policy(mut self, policy: Box<dyn MaturityPolicy>) -> Self {
        self.maturity_policy = Some(policy);
        self
    }

    /// Split into settings and the resolved policies
    pub(crate) fn into_parts(
        self,
    ) -> (
        SimulationSettings,
        Box<dyn OpportunityPolicy>,
        Box<dyn MaturityPolicy>,
    ) {
        let opportunity_policy = self
            .opportunity_policy
            .unwrap_or_else(|| self.settings.opportunity_policy.build());
        let maturity_policy = self
            .maturity_policy
            .unwrap_or_else(|| self.settings.maturity_policy.build());
        (self.settings, opportunity_policy, maturity_policy)
    }
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self::new(SimulationSettings::default())
    }
}

impl From<SimulationSettings> for EngineConfig {
    fn from(settings: SimulationSettings) -> Self {
        Self::new(settings)
    }
}
