pub mod analyzer;
pub mod linguistic;

pub use analyzer::{AnalyzeError, LlmAnalyzer, WordAnalyzer};
pub use linguistic::LinguisticService;
