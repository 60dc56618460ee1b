//! Session timing configuration.

/// Configuration for session behavior.
#[derive(Debug, Clone)]
pub struct SessionConfig {
    /// How long (in seconds) an accepted connection has to authenticate
    /// and join before it is dropped. Bounds the window in which an
    /// anonymous peer can tie up a task.
    ///
    /// Default: 10 seconds.
    pub auth_timeout_secs: u64,

    /// Optional idle reaper for joined sessions: if no frame arrives for
    /// this many seconds, the connection is closed and cleaned up like
    /// any other departure. `None` (the default) disables the reaper —
    /// correctness never depends on it, it is hardening against dead
    /// peers that never send a close frame.
    pub idle_timeout_secs: Option<u64>,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            auth_timeout_secs: 10,
            idle_timeout_secs: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_session_config_default() {
        let config = SessionConfig::default();
        assert_eq!(config.auth_timeout_secs, 10);
        assert!(config.idle_timeout_secs.is_none());
    }
}
