pub mod batch;
pub mod clustering;
pub mod index;
pub mod matching;
pub mod normalizer;
pub mod resolver;
pub mod types;
pub mod validation;

pub use resolver::BrandResolver;
pub use types::*;
pub use validation::HeuristicRules;

pub use crate::{TARGET_BATCH, TARGET_BRAND};
