//! Structural plan validation
//!
//! Must run before any plan is dispatched. Violations are reported as
//! values, never thrown, so the caller can discard the plan and fall back
//! to the generative strategy instead of failing the turn.

use crate::planner::ExecutionPlan;
use ahash::AHashMap;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// One structural defect in a plan
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum PlanViolation {
    #[error("dependency cycle detected at task '{task_id}'")]
    DependencyCycle { task_id: String },

    #[error("task '{task_id}' depends on unknown task '{dependency}'")]
    DanglingDependency { task_id: String, dependency: String },

    #[error("task '{task_id}' ({action}) requires a merchant identifier")]
    MissingMerchant { task_id: String, action: String },
}

/// Validation outcome: all violations, not just the first
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlanValidation {
    pub valid: bool,
    pub errors: Vec<PlanViolation>,
}

/// Check a plan for cycles, dangling dependency edges, and tasks missing
/// a required merchant identifier.
pub fn validate_plan(plan: &ExecutionPlan) -> PlanValidation {
    let mut errors = Vec::new();

    let ids: AHashMap<&str, usize> = plan
        .tasks
        .iter()
        .enumerate()
        .map(|(i, t)| (t.id.as_str(), i))
        .collect();

    // Dangling edges
    for task in &plan.tasks {
        for dep in &task.depends_on {
            if !ids.contains_key(dep.as_str()) {
                errors.push(PlanViolation::DanglingDependency {
                    task_id: task.id.clone(),
                    dependency: dep.clone(),
                });
            }
        }
    }

    // Cycles: DFS with recursion-stack tracking over known edges
    let n = plan.tasks.len();
    let mut visited = vec![false; n];
    let mut on_stack = vec![false; n];
    for start in 0..n {
        if !visited[start] {
            dfs_cycles(plan, &ids, start, &mut visited, &mut on_stack, &mut errors);
        }
    }

    // Merchant identifier required unless the action is entity-independent
    for task in &plan.tasks {
        if !task.action.entity_independent() && task.params.merchant_id.is_none() {
            errors.push(PlanViolation::MissingMerchant {
                task_id: task.id.clone(),
                action: task.action.as_str().to_string(),
            });
        }
    }

    if !errors.is_empty() {
        tracing::warn!(plan_id = ?plan.plan_id, errors = errors.len(), "plan failed validation");
    }
    PlanValidation {
        valid: errors.is_empty(),
        errors,
    }
}

fn dfs_cycles(
    plan: &ExecutionPlan,
    ids: &AHashMap<&str, usize>,
    node: usize,
    visited: &mut [bool],
    on_stack: &mut [bool],
    errors: &mut Vec<PlanViolation>,
) {
    visited[node] = true;
    on_stack[node] = true;

    for dep in &plan.tasks[node].depends_on {
        let Some(&next) = ids.get(dep.as_str()) else {
            continue; // dangling, reported separately
        };
        if on_stack[next] {
            errors.push(PlanViolation::DependencyCycle {
                task_id: plan.tasks[node].id.clone(),
            });
        } else if !visited[next] {
            dfs_cycles(plan, ids, next, visited, on_stack, errors);
        }
    }

    on_stack[node] = false;
}
