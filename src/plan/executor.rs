use crate::error::ExecutionError;
use crate::plan::graph;
use crate::plan::interpolate::{interpolate, StepResults};
use crate::plan::types::{ExecutionPlan, ExecutionStep, TraceEntry};
use crate::tools::ToolInvoker;
use async_trait::async_trait;
use std::collections::{BTreeMap, BTreeSet};
use std::future::Future;
use std::pin::Pin;

/// Finished values of a successful run: the per-step results and the ordered
/// trace log. Both are owned by the run and returned, not mutated shared
/// state.
#[derive(Debug)]
pub struct ExecutionOutcome {
    pub results: StepResults,
    pub trace: Vec<TraceEntry>,
}

/// Receives each trace transition as it happens, so a caller can stream the
/// log live while the run is in flight.
#[async_trait]
pub trait ExecutionObserver: Send + Sync {
    async fn on_trace(&self, entry: &TraceEntry);
}

/// Observer that drops every transition. Used where only the finished outcome
/// matters.
pub struct NullObserver;

#[async_trait]
impl ExecutionObserver for NullObserver {
    async fn on_trace(&self, _entry: &TraceEntry) {}
}

struct RunState {
    results: StepResults,
    completed: BTreeSet<String>,
    trace: Vec<TraceEntry>,
}

pub struct PlanExecutor;

impl PlanExecutor {
    /// Execute every step of `plan`, resolving dependencies depth-first with
    /// memoization so each step id runs at most once, in an order that
    /// respects `depends_on` with declared order as the tie-break.
    ///
    /// The run is fail-fast: the first failing tool invocation aborts all
    /// not-yet-executed steps, dependent or not. Dangling `depends_on`
    /// references and cycles are rejected before any step runs.
    pub async fn execute(
        plan: &ExecutionPlan,
        invoker: &dyn ToolInvoker,
        observer: &dyn ExecutionObserver,
    ) -> Result<ExecutionOutcome, ExecutionError> {
        graph::validate(plan)?;

        let index = plan.step_index();
        let mut state = RunState {
            results: StepResults::new(),
            completed: BTreeSet::new(),
            trace: Vec::new(),
        };

        for step in &plan.steps {
            resolve(step, &index, invoker, observer, &mut state).await?;
        }

        Ok(ExecutionOutcome {
            results: state.results,
            trace: state.trace,
        })
    }
}

/// Recursive, memoized resolution of one step: dependencies first, then the
/// step itself. Boxed because async recursion needs an indirection.
fn resolve<'a>(
    step: &'a ExecutionStep,
    index: &'a BTreeMap<&'a str, &'a ExecutionStep>,
    invoker: &'a dyn ToolInvoker,
    observer: &'a dyn ExecutionObserver,
    state: &'a mut RunState,
) -> Pin<Box<dyn Future<Output = Result<(), ExecutionError>> + Send + 'a>> {
    Box::pin(async move {
        if state.completed.contains(&step.id) {
            return Ok(());
        }

        for reference in &step.depends_on {
            let dependency =
                index
                    .get(reference.as_str())
                    .ok_or_else(|| ExecutionError::UnknownDependency {
                        step: step.id.clone(),
                        reference: reference.clone(),
                    })?;
            resolve(dependency, index, invoker, observer, &mut *state).await?;
        }

        let parameters = interpolate(&step.parameters, &state.results);

        let entry_index = state.trace.len();
        state
            .trace
            .push(TraceEntry::running(&step.description, &step.tool, &parameters));
        observer.on_trace(&state.trace[entry_index]).await;

        tracing::debug!(step = %step.id, tool = %step.tool, "executing plan step");

        match invoker.invoke(&step.tool, parameters.clone()).await {
            Ok(result) => {
                let result_size = result.to_string().len();
                state.trace[entry_index].complete(&step.tool, &parameters, result_size);
                observer.on_trace(&state.trace[entry_index]).await;

                state.results.insert(step.id.clone(), result);
                state.completed.insert(step.id.clone());
                Ok(())
            }
            Err(error) => {
                let message = error.to_string();
                state.trace[entry_index].fail(&step.tool, &message);
                observer.on_trace(&state.trace[entry_index]).await;

                tracing::warn!(step = %step.id, %message, "plan step failed, aborting run");
                Err(ExecutionError::Step {
                    step: step.id.clone(),
                    message,
                })
            }
        }
    })
}
