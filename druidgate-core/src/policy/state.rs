//! Process-wide read-only switch.

/// Whether read-only enforcement is active.
///
/// Built once at startup from configuration and never mutated afterwards.
/// It is `Copy`, so every guard holds its own value and no synchronization
/// is needed. Defaults to disabled.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PolicyState {
    enabled: bool,
}

impl PolicyState {
    /// Creates a state from the configured flag.
    #[must_use]
    pub const fn new(enabled: bool) -> Self {
        Self { enabled }
    }

    /// Read-only enforcement on.
    #[must_use]
    pub const fn enabled() -> Self {
        Self::new(true)
    }

    /// Read-only enforcement off (the default).
    #[must_use]
    pub const fn disabled() -> Self {
        Self::new(false)
    }

    #[inline]
    #[must_use]
    pub const fn is_enabled(&self) -> bool {
        self.enabled
    }
}

impl From<bool> for PolicyState {
    fn from(enabled: bool) -> Self {
        Self::new(enabled)
    }
}
