//! Platform error types

use thiserror::Error;

/// Invalid lifecycle transition
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum PlatformError {
    #[error("Platform has already been enabled")]
    AlreadyEnabled,

    #[error("Platform has been disabled and cannot be enabled again")]
    Disabled,

    #[error("Platform has already been disabled")]
    AlreadyDisabled,
}
