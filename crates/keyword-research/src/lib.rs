//! Keyword research documents: a typed builder for the JSON output and a
//! validator for files produced elsewhere.

pub mod output;
pub mod validate;

pub use output::{
    CompetitiveInsights, ContentOpportunity, DataSource, Difficulty, KeywordEntry,
    KeywordResearch, KeywordResearchOutput, Pillar, ResearchMode, SearchIntent, SerpFeature,
    VolumeBucket,
};
pub use validate::{validate_file, validate_value, ValidationReport};
