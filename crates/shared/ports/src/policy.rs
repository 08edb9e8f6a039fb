use bases_core::{ExpansionCommitment, InstrumentId, OpportunitySpec, Rate, Tick};

/// What a generation policy can see when asked for new opportunities
#[derive(Debug, Clone, Copy)]
pub struct GenerationContext<'a> {
    pub tick: Tick,
    /// Opportunities currently open and uncommitted
    pub open_count: usize,
    /// Opportunities announced but not yet open
    pub pending_count: usize,
    /// Instruments listed on the venue
    pub instruments: &'a [InstrumentId],
}

/// Port for opportunity generation
///
/// Called once per tick by the generator. Implementations must be
/// deterministic for a given seed so simulations are reproducible.
pub trait OpportunityPolicy: Send {
    /// Produce the opportunities announced at this tick
    fn generate(&mut self, ctx: &GenerationContext<'_>) -> Vec<OpportunitySpec>;

    /// Get the name of the policy
    fn name(&self) -> &str;
}

/// Result of maturing a commitment
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MaturityOutcome {
    /// Pay out capital × (1 + expected return)
    Success,
    /// Lose `capital × loss_fraction`
    Failure { loss_fraction: Rate },
}

/// Port for the maturation outcome rule
pub trait MaturityPolicy: Send {
    /// Decide the outcome of a commitment that reached its maturity tick
    fn decide(&mut self, commitment: &ExpansionCommitment, tick: Tick) -> MaturityOutcome;

    /// Get the name of the policy
    fn name(&self) -> &str;
}
