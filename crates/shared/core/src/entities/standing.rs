use serde::{Deserialize, Serialize};

/// Financial standing tier of an account, lowest first
///
/// An account sees opportunities whose minimum standing is at or below
/// its own.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
pub enum Standing {
    /// Covering immediate obligations
    #[default]
    Survival,
    /// Building a reserve
    Stabilizing,
    Growth,
    Expansion,
}

/// Health indicators an account is classified from
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StandingIndicators {
    /// Stability score, 0 to 1000
    pub stability_score: u32,
    /// Periods of expenses covered by reserves
    pub reserve_periods: u32,
}

impl StandingIndicators {
    pub fn new(stability_score: u32, reserve_periods: u32) -> Self {
        Self {
            stability_score,
            reserve_periods,
        }
    }

    /// Reaching a tier takes both its score floor and its reserve floor
    pub fn standing(&self) -> Standing {
        // Floors of the tier above each entry
        let tiers = [
            (Standing::Survival, 400, 1),
            (Standing::Stabilizing, 700, 3),
            (Standing::Growth, 900, 6),
        ];
        tiers
            .into_iter()
            .find(|(_, score, reserve)| {
                self.stability_score < *score || self.reserve_periods < *reserve
            })
            .map(|(standing, _, _)| standing)
            .unwrap_or(Standing::Expansion)
    }
}

/// Who may see an opportunity in a standing-gated listing
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Eligibility {
    pub min_standing: Standing,
    pub min_score: u32,
}

impl Eligibility {
    pub fn admits(&self, indicators: &StandingIndicators) -> bool {
        indicators.standing() >= self.min_standing && indicators.stability_score >= self.min_score
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_standing_tiers() {
        assert_eq!(StandingIndicators::new(399, 10).standing(), Standing::Survival);
        assert_eq!(StandingIndicators::new(950, 0).standing(), Standing::Survival);
        assert_eq!(StandingIndicators::new(400, 1).standing(), Standing::Stabilizing);
        assert_eq!(StandingIndicators::new(700, 2).standing(), Standing::Stabilizing);
        assert_eq!(StandingIndicators::new(700, 3).standing(), Standing::Growth);
        assert_eq!(StandingIndicators::new(899, 9).standing(), Standing::Growth);
        assert_eq!(StandingIndicators::new(900, 6).standing(), Standing::Expansion);
    }

    #[test]
    fn test_eligibility_needs_standing_and_score() {
        let eligibility = Eligibility {
            min_standing: Standing::Stabilizing,
            min_score: 600,
        };
        assert!(!eligibility.admits(&StandingIndicators::new(650, 0)));
        assert!(!eligibility.admits(&StandingIndicators::new(500, 2)));
        assert!(eligibility.admits(&StandingIndicators::new(650, 2)));
        // Higher tiers see everything below them
        assert!(eligibility.admits(&StandingIndicators::new(1000, 12)));
        assert!(Eligibility::default().admits(&StandingIndicators::default()));
    }
}
