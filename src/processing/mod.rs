pub mod anova;
pub mod contingency;
pub mod correlation;
pub mod descriptive;
pub mod engine;
pub mod error;
pub mod operation;
pub mod result;
