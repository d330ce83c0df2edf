use std::collections::BTreeSet;

use clap::ValueEnum;

pub const TERMS_ENV: &str = "GRADEBOOK_TERMS";
pub const DEFAULT_TERM: &str = "S1-MP1";

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum)]
pub enum AggregationStrategy {
    /// Category averages over redistributed worth points, then weighted by category.
    #[default]
    Redistributed,
    /// One weighted average over every row, ignoring objective layout.
    Flat,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunConfig {
    pub terms: BTreeSet<String>,
    pub strategy: AggregationStrategy,
}

impl RunConfig {
    /// Explicit terms win; otherwise the environment list; otherwise the default term.
    pub fn resolve(
        terms: Vec<String>,
        env_terms: Option<String>,
        strategy: AggregationStrategy,
    ) -> RunConfig {
        let mut resolved: BTreeSet<String> = terms
            .iter()
            .map(|t| t.trim().to_string())
            .filter(|t| !t.is_empty())
            .collect();

        if resolved.is_empty() {
            if let Some(value) = env_terms {
                resolved = parse_term_list(&value);
            }
        }
        if resolved.is_empty() {
            resolved.insert(DEFAULT_TERM.to_string());
        }

        RunConfig {
            terms: resolved,
            strategy,
        }
    }

    pub fn from_env(terms: Vec<String>, strategy: AggregationStrategy) -> RunConfig {
        Self::resolve(terms, std::env::var(TERMS_ENV).ok(), strategy)
    }
}

pub fn parse_term_list(value: &str) -> BTreeSet<String> {
    value
        .split(',')
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .map(str::to_string)
        .collect()
}
