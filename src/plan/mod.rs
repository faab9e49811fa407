mod executor;
mod graph;
mod interpolate;
mod parser;
mod types;
mod validate;

pub use executor::{ExecutionObserver, ExecutionOutcome, NullObserver, PlanExecutor};
pub use interpolate::{interpolate, StepResults};
pub use parser::PlanParser;
pub use types::{ExecutionPlan, ExecutionStep, StepStatus, TraceEntry};
pub use validate::{
    fallback_plan, generate_plan, FALLBACK_QUERY_MAX_CHARS, FALLBACK_TOOL,
    MAX_GENERATION_ATTEMPTS,
};
