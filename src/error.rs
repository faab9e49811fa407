use thiserror::Error;

// ─── Top-level error hierarchy ───────────────────────────────────────────────

/// Structured error hierarchy for `docent`.
///
/// Each pipeline stage defines its own error variant. The gateway matches on
/// these to decide whether a failure becomes an HTTP status or an `error`
/// frame on an already-open stream; internal code continues to use
/// `anyhow::Result` for ad-hoc context chains.
#[derive(Debug, Error)]
pub enum AgentError {
    // ── Inbound request ─────────────────────────────────────────────────
    #[error("validation: {0}")]
    Validation(String),

    // ── Plan generation ─────────────────────────────────────────────────
    #[error("planning: {0}")]
    Planning(#[from] PlanningError),

    // ── Plan execution ──────────────────────────────────────────────────
    #[error("execution: {0}")]
    Execution(#[from] ExecutionError),

    // ── Conversation store ──────────────────────────────────────────────
    #[error("storage: {0}")]
    Storage(String),

    // ── Event stream / gateway ──────────────────────────────────────────
    #[error("transport: {0}")]
    Transport(String),

    // ── Generic fallthrough (wraps anyhow for interop) ──────────────────
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

// ─── Planning errors ─────────────────────────────────────────────────────────

/// Always recovered locally by the fallback plan; never surfaced to a caller.
#[derive(Debug, Error)]
pub enum PlanningError {
    #[error("model returned no parseable JSON")]
    NoJson,

    #[error("invalid plan JSON: {0}")]
    Parse(String),

    #[error("plan failed structural validation: {0}")]
    Structure(String),

    #[error("plan generation request failed: {0}")]
    Generation(String),
}

// ─── Execution errors ────────────────────────────────────────────────────────

/// Aborts the remainder of the plan and is surfaced verbatim as the stream's
/// `error` frame.
#[derive(Debug, Error)]
pub enum ExecutionError {
    #[error("duplicate step id: {id}")]
    DuplicateStep { id: String },

    #[error("step {step} depends on unknown step {reference}")]
    UnknownDependency { step: String, reference: String },

    #[error("dependency cycle: {0}")]
    Cycle(String),

    #[error("step {step} failed: {message}")]
    Step { step: String, message: String },
}

// ─── Convenience re-exports ──────────────────────────────────────────────────

/// Shorthand result type for the crate.
pub type Result<T> = std::result::Result<T, AgentError>;
