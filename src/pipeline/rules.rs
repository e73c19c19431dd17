//! Keyword rules engine.
//!
//! Every rule is checked against the lower-cased message in table order and
//! every firing rule contributes its response. A rule fires when:
//! - all `contains_all` keywords are substrings,
//! - at least one `contains_any` keyword is a substring (or the list is empty),
//! - no `does_not_contain` keyword is a substring.

use std::path::Path;

use tracing::{debug, error, info};

use crate::error::RulesError;
use crate::pipeline::loader;
use crate::pipeline::types::{OutboundResponse, Rule};

/// Immutable, ordered rule table.
#[derive(Debug, Clone, Default)]
pub struct RulesEngine {
    rules: Vec<Rule>,
}

impl RulesEngine {
    pub fn new(rules: Vec<Rule>) -> Self {
        Self { rules }
    }

    /// An engine with no rules (every message gets the fallback reply).
    pub fn empty() -> Self {
        Self::default()
    }

    /// Load the rule table from a CSV file.
    pub fn load(path: &Path) -> Result<Self, RulesError> {
        loader::load_rules(path).map(Self::new)
    }

    /// Load the rule table, degrading to an empty table on any failure.
    pub fn load_or_empty(path: &Path) -> Self {
        match Self::load(path) {
            Ok(engine) => {
                info!(path = %path.display(), rules = engine.len(), "Rule table loaded");
                engine
            }
            Err(e) => {
                error!(error = %e, "Failed to load rule table; continuing with no rules");
                Self::empty()
            }
        }
    }

    pub fn rules(&self) -> &[Rule] {
        &self.rules
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    /// Responses of every firing rule, in table order.
    pub fn evaluate(&self, message: &str) -> Vec<OutboundResponse> {
        let responses = match_rules(message, &self.rules);
        debug!(
            matched = responses.len(),
            total = self.rules.len(),
            "Rules evaluated"
        );
        responses
    }
}

/// Match a message against an ordered rule list.
pub fn match_rules(message: &str, rules: &[Rule]) -> Vec<OutboundResponse> {
    let lowered = message.to_lowercase();
    rules
        .iter()
        .filter(|rule| rule.fires(&lowered))
        .map(|rule| rule.response.clone())
        .collect()
}
