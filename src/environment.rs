use std::env;
use std::str::FromStr;
use tracing::warn;

use crate::brand::batch::DEFAULT_CHUNK_SIZE;
use crate::brand::HeuristicRules;

pub const DATABASE_PATH: &str = "DATABASE_PATH";
pub const BRAND_SOURCE: &str = "BRAND_SOURCE";
pub const BRAND_CHUNK_SIZE: &str = "BRAND_CHUNK_SIZE";
pub const BRAND_WORKERS: &str = "BRAND_WORKERS";
pub const BRAND_IGNORE_WORDS: &str = "BRAND_IGNORE_WORDS";
pub const BRAND_FRONT_WORDS: &str = "BRAND_FRONT_WORDS";
pub const BRAND_FIRST_OR_SECOND_WORDS: &str = "BRAND_FIRST_OR_SECOND_WORDS";
pub const BRAND_EXACT_WORDS: &str = "BRAND_EXACT_WORDS";

/// Retrieves an environment variable and splits it into a vector of strings based on a delimiter.
///
/// # Arguments
/// - `var`: The name of the environment variable.
/// - `delimiter`: The character to split the environment variable's value by.
///
/// # Returns
/// - `Vec<String>` without empty entries; empty when the variable is unset.
pub fn get_env_var_as_vec(var: &str, delimiter: char) -> Vec<String> {
    env::var(var)
        .unwrap_or_default()
        .split(delimiter)
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect()
}

/// Parses an environment variable, falling back to `default` when it is unset
/// or invalid.
pub fn get_env_var_or<T: FromStr>(var: &str, default: T) -> T {
    match env::var(var) {
        Ok(value) => value.trim().parse().unwrap_or_else(|_| {
            warn!("Ignoring invalid value '{}' for {}", value, var);
            default
        }),
        Err(_) => default,
    }
}

/// Runtime configuration of a brand assignment run.
#[derive(Debug, Clone)]
pub struct RunConfig {
    pub database_path: String,
    pub source: String,
    pub chunk_size: usize,
    pub workers: usize,
    pub rules: HeuristicRules,
}

impl Default for RunConfig {
    fn default() -> Self {
        RunConfig {
            database_path: "brands.db".to_string(),
            source: "default".to_string(),
            chunk_size: DEFAULT_CHUNK_SIZE,
            workers: 1,
            rules: HeuristicRules::default(),
        }
    }
}

impl RunConfig {
    pub fn from_env() -> Self {
        let defaults = RunConfig::default();

        RunConfig {
            database_path: get_env_var_or(DATABASE_PATH, defaults.database_path),
            source: get_env_var_or(BRAND_SOURCE, defaults.source),
            chunk_size: get_env_var_or(BRAND_CHUNK_SIZE, defaults.chunk_size).max(1),
            workers: get_env_var_or(BRAND_WORKERS, defaults.workers).max(1),
            rules: rules_from_env(defaults.rules),
        }
    }
}

/// Word lists from the environment replace the corresponding default list.
pub fn rules_from_env(mut rules: HeuristicRules) -> HeuristicRules {
    let overrides = [
        (BRAND_IGNORE_WORDS, &mut rules.ignore_words),
        (BRAND_FRONT_WORDS, &mut rules.front_words),
        (BRAND_FIRST_OR_SECOND_WORDS, &mut rules.first_or_second_words),
        (BRAND_EXACT_WORDS, &mut rules.exact_capitalized_words),
    ];

    for (var, list) in overrides {
        if env::var(var).is_ok() {
            *list = get_env_var_as_vec(var, ';');
        }
    }

    rules
}
