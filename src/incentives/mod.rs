//! Jurisdiction-based purchase incentives.
//!
//! Each rule is a pure function from a listing and jurisdiction to an
//! optional amount. Rules never fail; a rule that does not apply returns
//! `None`, which is distinct from an applicable $0 incentive. The engine
//! evaluates every registered rule and sums the non-absent results. New
//! jurisdictions are added by appending a rule, not by editing the engine.

use crate::inventory::models::RawListing;

/// Where the buyer takes delivery, for incentive eligibility.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Jurisdiction {
    pub country: String,
    pub state: String,
    pub county: String,
    pub city: String,
}

impl Jurisdiction {
    pub fn new(
        country: impl Into<String>,
        state: impl Into<String>,
        county: impl Into<String>,
        city: impl Into<String>,
    ) -> Self {
        Self {
            country: country.into(),
            state: state.into(),
            county: county.into(),
            city: city.into(),
        }
    }
}

impl From<&crate::config::Config> for Jurisdiction {
    fn from(config: &crate::config::Config) -> Self {
        Self::new(&config.country, &config.state, &config.county, &config.city)
    }
}

/// One incentive program.
pub trait IncentiveRule: Send + Sync {
    /// The incentive amount, or `None` when the rule does not apply.
    fn evaluate(&self, listing: &RawListing, jurisdiction: &Jurisdiction) -> Option<f64>;

    /// Returns a description of this rule.
    fn description(&self) -> String;
}

/// A price bracket: listings priced strictly below `below` earn `amount`.
#[derive(Debug, Clone, Copy)]
pub struct Bracket {
    pub below: f64,
    pub amount: f64,
}

/// Price-bracketed incentive scoped to a country and optionally a state.
///
/// Brackets are checked low-to-high; the first match wins, so a listing can
/// never earn two amounts from the same rule.
pub struct BracketRule {
    name: String,
    country: String,
    state: Option<String>,
    brackets: Vec<Bracket>,
}

impl BracketRule {
    /// A country-wide rule.
    pub fn federal(name: impl Into<String>, country: impl Into<String>, brackets: Vec<Bracket>) -> Self {
        Self { name: name.into(), country: country.into(), state: None, brackets }
    }

    /// A state-scoped rule.
    pub fn state(
        name: impl Into<String>,
        country: impl Into<String>,
        state: impl Into<String>,
        brackets: Vec<Bracket>,
    ) -> Self {
        Self { name: name.into(), country: country.into(), state: Some(state.into()), brackets }
    }
}

impl IncentiveRule for BracketRule {
    fn evaluate(&self, listing: &RawListing, jurisdiction: &Jurisdiction) -> Option<f64> {
        if jurisdiction.country != self.country {
            return None;
        }
        if let Some(state) = &self.state {
            if &jurisdiction.state != state {
                return None;
            }
        }

        // First bracket wins; brackets are registered low-to-high.
        self.brackets
            .iter()
            .find(|bracket| listing.purchase_price < bracket.below)
            .map(|bracket| bracket.amount)
    }

    fn description(&self) -> String {
        match &self.state {
            Some(state) => format!("{} ({}/{})", self.name, self.country, state),
            None => format!("{} ({})", self.name, self.country),
        }
    }
}

/// Ordered collection of incentive rules.
pub struct IncentiveEngine {
    rules: Vec<Box<dyn IncentiveRule>>,
}

impl IncentiveEngine {
    /// Creates an engine with no rules.
    pub fn empty() -> Self {
        Self { rules: Vec::new() }
    }

    /// Appends a rule to the evaluation list.
    pub fn register(&mut self, rule: impl IncentiveRule + 'static) -> &mut Self {
        self.rules.push(Box::new(rule));
        self
    }

    /// Sum of all applicable incentives for a listing. Absent results count
    /// as zero; the total is never negative.
    pub fn total(&self, listing: &RawListing, jurisdiction: &Jurisdiction) -> f64 {
        self.rules
            .iter()
            .filter_map(|rule| rule.evaluate(listing, jurisdiction))
            .sum()
    }

    /// Returns descriptions of all registered rules.
    pub fn descriptions(&self) -> Vec<String> {
        self.rules.iter().map(|rule| rule.description()).collect()
    }

    /// Returns the number of registered rules.
    pub fn len(&self) -> usize {
        self.rules.len()
    }

    /// Returns true if no rules are registered.
    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }
}

impl Default for IncentiveEngine {
    /// The baseline US program set: federal EV credit plus the NJ and NY
    /// state programs.
    fn default() -> Self {
        let mut engine = Self::empty();
        engine.register(BracketRule::federal(
            "Federal EV credit",
            "US",
            vec![Bracket { below: 55_000.0, amount: 7_500.0 }],
        ));
        engine.register(BracketRule::state(
            "NJ Charge Up",
            "US",
            "NJ",
            vec![
                Bracket { below: 45_000.0, amount: 4_000.0 },
                Bracket { below: 55_000.0, amount: 1_500.0 },
            ],
        ));
        engine.register(BracketRule::state(
            "NY Drive Clean",
            "US",
            "NY",
            vec![
                Bracket { below: 42_000.0, amount: 2_000.0 },
                Bracket { below: 80_000.0, amount: 500.0 },
            ],
        ));
        engine
    }
}
