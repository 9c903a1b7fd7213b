//! Resource limits for untrusted programs.
//!
//! The evaluator recurses on the host stack, so an unbounded runaway
//! recursion eventually aborts the process. Hosts embedding untrusted code
//! can cap evaluation depth instead, turning that failure mode into an
//! ordinary RuntimeError. The default is no cap.

/// Limits applied to every `run` call of a session.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ResourceLimits {
    /// Maximum evaluator recursion depth, or `None` for unlimited.
    pub max_recursion_depth: Option<usize>,
}

impl ResourceLimits {
    /// No limits; pathological programs run until the host stops them.
    #[must_use]
    pub fn unlimited() -> Self {
        Self::default()
    }

    /// Caps evaluator recursion at `depth` nested evaluations.
    #[must_use]
    pub fn with_max_recursion_depth(depth: usize) -> Self {
        Self {
            max_recursion_depth: Some(depth),
        }
    }
}
