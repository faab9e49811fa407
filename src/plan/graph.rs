use crate::error::ExecutionError;
use crate::plan::types::ExecutionPlan;
use std::collections::{BTreeMap, BTreeSet};

/// Validate a plan's `depends_on` relation before any step runs: every id is
/// unique, every referenced id exists, and the relation is acyclic. A plan
/// that fails here executes zero steps.
pub fn validate(plan: &ExecutionPlan) -> Result<(), ExecutionError> {
    let mut ids = BTreeSet::new();
    for step in &plan.steps {
        if !ids.insert(step.id.as_str()) {
            return Err(ExecutionError::DuplicateStep {
                id: step.id.clone(),
            });
        }
    }

    let mut dependencies: BTreeMap<&str, Vec<&str>> = BTreeMap::new();
    for step in &plan.steps {
        for reference in &step.depends_on {
            if !ids.contains(reference.as_str()) {
                return Err(ExecutionError::UnknownDependency {
                    step: step.id.clone(),
                    reference: reference.clone(),
                });
            }
        }
        dependencies.insert(
            step.id.as_str(),
            step.depends_on.iter().map(String::as_str).collect(),
        );
    }

    let mut states = BTreeMap::new();
    let mut stack = Vec::new();
    for step in &plan.steps {
        if states.contains_key(step.id.as_str()) {
            continue;
        }
        if let Some(path) = detect_cycle(&step.id, &dependencies, &mut states, &mut stack) {
            return Err(ExecutionError::Cycle(path.join(" -> ")));
        }
    }

    Ok(())
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum NodeState {
    Visiting,
    Visited,
}

fn detect_cycle<'a>(
    id: &'a str,
    dependencies: &BTreeMap<&str, Vec<&'a str>>,
    states: &mut BTreeMap<&'a str, NodeState>,
    stack: &mut Vec<&'a str>,
) -> Option<Vec<String>> {
    states.insert(id, NodeState::Visiting);
    stack.push(id);

    if let Some(references) = dependencies.get(id) {
        for reference in references {
            match states.get(reference) {
                Some(NodeState::Visiting) => {
                    let position = stack.iter().position(|entry| entry == reference)?;
                    let mut cycle: Vec<String> =
                        stack[position..].iter().map(ToString::to_string).collect();
                    cycle.push((*reference).to_string());
                    return Some(cycle);
                }
                Some(NodeState::Visited) => {}
                None => {
                    if let Some(path) = detect_cycle(reference, dependencies, states, stack) {
                        return Some(path);
                    }
                }
            }
        }
    }

    stack.pop();
    states.insert(id, NodeState::Visited);
    None
}
