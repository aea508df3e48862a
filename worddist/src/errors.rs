use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq)]
pub enum WordDistError {
    #[error("The word distribution is already finished and can not be changed.")]
    AlreadyFinished,
    #[error("The word distribution has to be finished first.")]
    Unfinished,
    #[error("The corpus statistics are already finished, no further counts can be noted.")]
    StatisticsAlreadyFinished,
    #[error("The corpus statistics have to be finished first.")]
    StatisticsUnfinished,
    #[error("Fast KL divergence {fast} and slow KL divergence {slow} differ by more than {tolerance}!")]
    KlMismatch {
        fast: f64,
        slow: f64,
        tolerance: f64,
    },
}
