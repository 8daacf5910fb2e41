mod path_normalizer;
mod vulnerability_extractor;

pub use path_normalizer::PathNormalizer;
pub use vulnerability_extractor::{VulnerabilityExtractor, MAX_DESCRIPTION_CHARS, NO_DESCRIPTION};
