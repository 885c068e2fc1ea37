use std::sync::OnceLock;

use crate::core::error::CommandError;

/// Process-wide engine configuration.
#[derive(Clone, Debug)]
pub struct EngineConfig {
    /// Emit a breadcrumb to the notifier before each command body runs.
    pub emit_breadcrumbs: bool,
    /// Emit tracing events for invocation lifecycle transitions.
    pub trace_invocations: bool,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            emit_breadcrumbs: true,
            trace_invocations: true,
        }
    }
}

static CONFIG: OnceLock<EngineConfig> = OnceLock::new();

/// Loads the engine configuration. May be called at most once, before any
/// command runs.
pub fn load_config(config: EngineConfig) -> Result<(), CommandError> {
    CONFIG
        .set(config)
        .map_err(|_| CommandError::runtime("engine configuration already loaded"))
}

/// The active configuration; defaults apply when none was loaded.
pub fn get_config() -> EngineConfig {
    CONFIG.get().cloned().unwrap_or_default()
}
