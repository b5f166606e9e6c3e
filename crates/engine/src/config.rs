use jsontools_protocol::DEFAULT_EVAL_TIMEOUT_MS;
use std::env;
use std::time::Duration;

pub const ENV_EVAL_TIMEOUT_MS: &str = "JSONTOOLS_EVAL_TIMEOUT_MS";
pub const ENV_MAX_CALL_LEVELS: &str = "JSONTOOLS_MAX_CALL_LEVELS";
pub const ENV_MAX_EXPR_DEPTH: &str = "JSONTOOLS_MAX_EXPR_DEPTH";
pub const ENV_MAX_ARRAY_SIZE: &str = "JSONTOOLS_MAX_ARRAY_SIZE";
pub const ENV_MAX_MAP_SIZE: &str = "JSONTOOLS_MAX_MAP_SIZE";
pub const ENV_MAX_STRING_SIZE: &str = "JSONTOOLS_MAX_STRING_SIZE";

/// Limits applied to every script run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EngineConfig {
    /// Wall-clock budget for one script run.
    pub timeout: Duration,

    /// Extra time granted to the host-side watchdog before it gives up on a run that the
    /// engine itself could not interrupt.
    pub watchdog_grace: Duration,

    /// Maximum function call nesting inside a script.
    pub max_call_levels: usize,

    /// Maximum expression nesting depth (global scope, function bodies).
    pub max_expr_depth: usize,

    /// Largest array a script may build, counting nested arrays. Also caps the index
    /// `util::set` may grow an array to.
    pub max_array_size: usize,

    /// Largest object map a script may build, counting nested maps.
    pub max_map_size: usize,

    /// Longest string a script may build, in bytes.
    pub max_string_size: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            timeout: Duration::from_millis(DEFAULT_EVAL_TIMEOUT_MS),
            watchdog_grace: Duration::from_secs(2),
            max_call_levels: 64,
            max_expr_depth: 128,
            max_array_size: 1 << 22,
            max_map_size: 1 << 22,
            max_string_size: 64 << 20,
        }
    }
}

impl EngineConfig {
    /// Defaults, overridden by `JSONTOOLS_*` environment variables when they parse.
    pub fn from_env() -> Self {
        let mut config = Self::default();
        if let Some(ms) = env_number(ENV_EVAL_TIMEOUT_MS) {
            config.timeout = Duration::from_millis(ms.max(1));
        }
        if let Some(levels) = env_number(ENV_MAX_CALL_LEVELS) {
            config.max_call_levels = levels as usize;
        }
        if let Some(depth) = env_number(ENV_MAX_EXPR_DEPTH) {
            config.max_expr_depth = depth as usize;
        }
        if let Some(size) = env_limit(ENV_MAX_ARRAY_SIZE) {
            config.max_array_size = size;
        }
        if let Some(size) = env_limit(ENV_MAX_MAP_SIZE) {
            config.max_map_size = size;
        }
        if let Some(size) = env_limit(ENV_MAX_STRING_SIZE) {
            config.max_string_size = size;
        }
        config
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

fn env_number(var: &str) -> Option<u64> {
    let raw = env::var(var).ok()?;
    match raw.trim().parse::<u64>() {
        Ok(value) => Some(value),
        Err(_) => {
            log::warn!("ignoring {var}={raw:?}: not a non-negative integer");
            None
        }
    }
}

/// Size limits must be positive; zero would switch the engine's own check off.
fn env_limit(var: &str) -> Option<usize> {
    match env_number(var) {
        Some(0) => {
            log::warn!("ignoring {var}=0: size limits cannot be disabled");
            None
        }
        Some(value) => Some(usize::try_from(value).unwrap_or(usize::MAX)),
        None => None,
    }
}
