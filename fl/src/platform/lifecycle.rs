//! Enable/disable state machine

use std::sync::atomic::{AtomicU8, Ordering};

use tracing::debug;

use super::PlatformError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum LifecycleState {
    Created = 0,
    Enabled = 1,
    Disabled = 2,
}

impl LifecycleState {
    fn from_u8(value: u8) -> Self {
        match value {
            0 => LifecycleState::Created,
            1 => LifecycleState::Enabled,
            _ => LifecycleState::Disabled,
        }
    }
}

/// Atomic `Created → Enabled → Disabled` state; `Disabled` is terminal
#[derive(Debug)]
pub struct Lifecycle {
    state: AtomicU8,
}

impl Lifecycle {
    pub fn new() -> Self {
        Self {
            state: AtomicU8::new(LifecycleState::Created as u8),
        }
    }

    pub fn state(&self) -> LifecycleState {
        LifecycleState::from_u8(self.state.load(Ordering::Acquire))
    }

    /// `Created → Enabled`
    pub fn enable(&self) -> Result<(), PlatformError> {
        debug!("Lifecycle::enable: called");
        self.state
            .compare_exchange(
                LifecycleState::Created as u8,
                LifecycleState::Enabled as u8,
                Ordering::AcqRel,
                Ordering::Acquire,
            )
            .map(|_| ())
            .map_err(|actual| match LifecycleState::from_u8(actual) {
                LifecycleState::Disabled => PlatformError::Disabled,
                _ => PlatformError::AlreadyEnabled,
            })
    }

    /// `Created | Enabled → Disabled`, returning the state left behind
    pub fn disable(&self) -> Result<LifecycleState, PlatformError> {
        debug!("Lifecycle::disable: called");
        let previous = self.state.swap(LifecycleState::Disabled as u8, Ordering::AcqRel);
        match LifecycleState::from_u8(previous) {
            LifecycleState::Disabled => Err(PlatformError::AlreadyDisabled),
            state => Ok(state),
        }
    }
}

impl Default for Lifecycle {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[test]
    fn test_enable_once() {
        let lifecycle = Lifecycle::new();
        assert_eq!(lifecycle.enable(), Ok(()));
        assert_eq!(lifecycle.enable(), Err(PlatformError::AlreadyEnabled));
        assert_eq!(lifecycle.state(), LifecycleState::Enabled);
    }

    #[test]
    fn test_disable_is_terminal() {
        let lifecycle = Lifecycle::new();
        lifecycle.enable().unwrap();
        assert_eq!(lifecycle.disable(), Ok(LifecycleState::Enabled));
        assert_eq!(lifecycle.disable(), Err(PlatformError::AlreadyDisabled));
        assert_eq!(lifecycle.enable(), Err(PlatformError::Disabled));
    }

    #[test]
    fn test_disable_without_enable() {
        let lifecycle = Lifecycle::new();
        assert_eq!(lifecycle.disable(), Ok(LifecycleState::Created));
        assert_eq!(lifecycle.state(), LifecycleState::Disabled);
    }

    #[test]
    fn test_concurrent_enable_has_one_winner() {
        let lifecycle = Arc::new(Lifecycle::new());
        let handles: Vec<_> = (0..8)
            .map(|_| {
                let lifecycle = lifecycle.clone();
                std::thread::spawn(move || lifecycle.enable().is_ok())
            })
            .collect();
        let winners = handles.into_iter().map(|h| h.join().unwrap()).filter(|won| *won).count();
        assert_eq!(winners, 1);
    }
}
