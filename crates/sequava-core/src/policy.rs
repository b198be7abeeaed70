use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// EnginePolicy
// ---------------------------------------------------------------------------

/// Tunable sanity limits for validation and dispatch.
///
/// All fields have defaults so a partial config file (or none at all) is
/// fine. None of these change compiled timings; they only control which
/// warnings are raised and how the runtime reacts to sink failures.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EnginePolicy {
    /// Iteration counts above this draw a confirm-but-allow warning.
    #[serde(default = "default_max_iterations")]
    pub iteration_warn_threshold: u32,

    /// Single delays/durations above this (ms) draw a warning.
    #[serde(default = "default_long_duration_ms")]
    pub long_duration_warn_ms: u64,

    /// Delay-in-delay nesting deeper than this draws a warning.
    #[serde(default = "default_max_nesting")]
    pub max_delay_nesting: u32,

    /// Consecutive sink failures before an execution is marked failed.
    #[serde(default = "default_retry_budget")]
    pub dispatch_retry_budget: u32,
}

fn default_max_iterations() -> u32 {
    1000
}

fn default_long_duration_ms() -> u64 {
    60 * 60 * 1000
}

fn default_max_nesting() -> u32 {
    3
}

fn default_retry_budget() -> u32 {
    3
}

impl Default for EnginePolicy {
    fn default() -> Self {
        Self {
            iteration_warn_threshold: default_max_iterations(),
            long_duration_warn_ms: default_long_duration_ms(),
            max_delay_nesting: default_max_nesting(),
            dispatch_retry_budget: default_retry_budget(),
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let p = EnginePolicy::default();
        assert_eq!(p.iteration_warn_threshold, 1000);
        assert_eq!(p.long_duration_warn_ms, 3_600_000);
        assert_eq!(p.max_delay_nesting, 3);
        assert_eq!(p.dispatch_retry_budget, 3);
    }

    #[test]
    fn partial_yaml_fills_defaults() {
        let p: EnginePolicy = serde_yaml::from_str("iteration_warn_threshold: 50\n").unwrap();
        assert_eq!(p.iteration_warn_threshold, 50);
        assert_eq!(p.dispatch_retry_budget, 3);
    }
}
