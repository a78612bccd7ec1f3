use michigan_core::bundle::BundleError;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EngineError {
    /// The search or tracker handed the advisor nothing to shed. A hand that reaches this
    /// should have been flagged as going out.
    #[error("no discard candidate among {leftover} leftover cards")]
    NoDiscardCandidate { leftover: usize },
    #[error("lay-off plan covers {found} bundles but {expected} are open")]
    LayOffMismatch { expected: usize, found: usize },
    #[error(transparent)]
    Bundle(#[from] BundleError),
}
