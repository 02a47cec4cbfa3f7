#![forbid(unsafe_code)]

//! Registry behavior knobs.

/// Configuration for a [`ListenerRegistry`](crate::ListenerRegistry).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RegistryConfig {
    /// Remove an existing entry with the same identity before appending a
    /// new one. When disabled, repeated registration adds duplicate entries.
    pub replace_on_add: bool,
    /// Contain panics raised by a listener and report them as faults instead
    /// of unwinding through the broadcast.
    pub catch_panics: bool,
    /// Open a `debug` span around every broadcast.
    pub trace_broadcasts: bool,
}

impl Default for RegistryConfig {
    fn default() -> Self {
        Self {
            replace_on_add: true,
            catch_panics: true,
            trace_broadcasts: false,
        }
    }
}

impl RegistryConfig {
    /// Configuration for registries that keep every registration, including
    /// repeats of the same listener.
    #[must_use]
    pub fn append_only() -> Self {
        Self {
            replace_on_add: false,
            ..Self::default()
        }
    }

    /// Set replace-on-add behavior.
    #[must_use]
    pub fn with_replace_on_add(mut self, enabled: bool) -> Self {
        self.replace_on_add = enabled;
        self
    }

    /// Set panic containment.
    #[must_use]
    pub fn with_catch_panics(mut self, enabled: bool) -> Self {
        self.catch_panics = enabled;
        self
    }

    /// Set per-broadcast span emission.
    #[must_use]
    pub fn with_trace_broadcasts(mut self, enabled: bool) -> Self {
        self.trace_broadcasts = enabled;
        self
    }
}
