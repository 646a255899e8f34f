// src/narrative.rs

//! Turns an aggregated contribution map into short, ranked sentences.

use crate::core::{ContributionMap, RawCase};

/// Which contribution signs a [`ReasonRule`] applies to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Sign {
    Positive,
    Negative,
    Any,
}

impl Sign {
    fn admits(self, value: f64) -> bool {
        match self {
            Sign::Positive => value > 0.0,
            Sign::Negative => value < 0.0,
            Sign::Any => true,
        }
    }
}

/// Qualitative reason attached to a feature line when the rule matches.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReasonRule {
    /// Substring of the semantic feature name.
    pub feature: &'static str,
    pub sign: Sign,
    /// Substring the raw input value must contain, if any.
    pub value_contains: Option<&'static str>,
    pub reason: &'static str,
}

impl ReasonRule {
    fn matches(&self, feature: &str, value: f64, raw: Option<String>) -> bool {
        feature.contains(self.feature)
            && self.sign.admits(value)
            && match self.value_contains {
                Some(needle) => raw.is_some_and(|v| v.contains(needle)),
                None => true,
            }
    }
}

/// First matching rule wins.
pub const VOYAGE_RULES: &[ReasonRule] = &[
    ReasonRule {
        feature: "Wave_Height",
        sign: Sign::Positive,
        value_contains: None,
        reason: "due to added resistance from rough seas",
    },
    ReasonRule {
        feature: "Wind",
        sign: Sign::Positive,
        value_contains: None,
        reason: "due to aerodynamic drag",
    },
    ReasonRule {
        feature: "Avg_Speed",
        sign: Sign::Positive,
        value_contains: None,
        reason: "(higher speeds drastically increase power demand)",
    },
    ReasonRule {
        feature: "Avg_Speed",
        sign: Sign::Negative,
        value_contains: None,
        reason: "(slower steaming sharply cuts power demand)",
    },
    ReasonRule {
        feature: "Season",
        sign: Sign::Any,
        value_contains: Some("Southwest"),
        reason: "reflecting monsoon conditions",
    },
    ReasonRule {
        feature: "Current_Direction",
        sign: Sign::Positive,
        value_contains: Some("Head"),
        reason: "as a head current raises speed through water",
    },
    ReasonRule {
        feature: "Current_Direction",
        sign: Sign::Negative,
        value_contains: Some("Following"),
        reason: "helped by a following current",
    },
    ReasonRule {
        feature: "Draft",
        sign: Sign::Positive,
        value_contains: None,
        reason: "from a deeper laden draft",
    },
    ReasonRule {
        feature: "Distance",
        sign: Sign::Positive,
        value_contains: None,
        reason: "over a longer passage",
    },
];

#[derive(Debug, Clone)]
pub struct NarrativeGenerator {
    top_n: usize,
    unit: String,
    rules: &'static [ReasonRule],
}

impl Default for NarrativeGenerator {
    fn default() -> Self {
        NarrativeGenerator {
            top_n: 3,
            unit: "tons".to_string(),
            rules: VOYAGE_RULES,
        }
    }
}

impl NarrativeGenerator {
    pub fn new(top_n: usize, unit: impl Into<String>) -> Self {
        NarrativeGenerator {
            top_n,
            unit: unit.into(),
            rules: VOYAGE_RULES,
        }
    }

    pub fn with_rules(mut self, rules: &'static [ReasonRule]) -> Self {
        self.rules = rules;
        self
    }

    /// Contributions by descending magnitude; ties keep declaration order.
    pub fn rank<'m>(&self, contributions: &'m ContributionMap) -> Vec<(&'m str, f64)> {
        let mut ranked: Vec<(&str, f64)> = contributions.iter().collect();
        ranked.sort_by(|a, b| b.1.abs().total_cmp(&a.1.abs()));
        ranked
    }

    /// One summary line, then one line for each of the top contributors.
    pub fn render(&self, contributions: &ContributionMap, predicted_value: f64, raw_case: &RawCase) -> Vec<String> {
        let mut lines = Vec::with_capacity(self.top_n + 1);
        lines.push(format!(
            "The estimated fuel consumption is {:.2} {}.",
            predicted_value, self.unit
        ));

        for (feature, impact) in self.rank(contributions).into_iter().take(self.top_n) {
            let direction = if impact > 0.0 { "increased" } else { "decreased" };
            let raw_value = raw_case.get(feature).map(|v| v.to_string());
            let reason = self
                .rules
                .iter()
                .find(|rule| rule.matches(feature, impact, raw_value.clone()))
                .map(|rule| format!(" {}", rule.reason))
                .unwrap_or_default();
            lines.push(format!(
                "{} {} consumption by {:.2} {}{}.",
                feature.replace('_', " "),
                direction,
                impact.abs(),
                self.unit,
                reason
            ));
        }
        lines
    }
}
