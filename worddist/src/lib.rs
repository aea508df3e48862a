pub mod counts;
pub mod corpus;
pub mod dist;
pub mod divergence;
pub mod cosine;
pub mod naive_bayes;
pub mod errors;

pub type Word = arcstr::ArcStr;
pub type Probability = f64;

pub use corpus::CorpusStatistics;
pub use dist::WordDist;
pub use divergence::DivergenceExt;
pub use cosine::CosineExt;
pub use errors::WordDistError;
