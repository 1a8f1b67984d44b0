//! Topological batching of validated plans
//!
//! Kahn's algorithm, but layered: each round extracts every task whose
//! remaining in-degree is zero as one parallel batch. Batches must be
//! executed in order; tasks inside a batch are independent by
//! construction. This core only computes the schedule and never spawns
//! concurrent work itself.

use crate::core::error::{OpsError, Result};
use crate::planner::ExecutionPlan;
use ahash::AHashMap;

/// Compute the parallel execution batches of `plan`.
///
/// Returns task ids grouped into ordered batches. A non-empty remainder
/// with no zero-in-degree task means a cycle survived validation; that is
/// reported as an error rather than looping forever.
pub fn execution_batches(plan: &ExecutionPlan) -> Result<Vec<Vec<String>>> {
    let ids: AHashMap<&str, usize> = plan
        .tasks
        .iter()
        .enumerate()
        .map(|(i, t)| (t.id.as_str(), i))
        .collect();

    // In-degree over known edges; dependents list per task
    let n = plan.tasks.len();
    let mut in_degree = vec![0usize; n];
    let mut dependents: Vec<Vec<usize>> = vec![Vec::new(); n];
    for (i, task) in plan.tasks.iter().enumerate() {
        for dep in &task.depends_on {
            if let Some(&d) = ids.get(dep.as_str()) {
                in_degree[i] += 1;
                dependents[d].push(i);
            }
        }
    }

    let mut remaining = n;
    let mut done = vec![false; n];
    let mut batches = Vec::new();

    while remaining > 0 {
        // Plan order within a batch keeps output deterministic
        let batch: Vec<usize> = (0..n)
            .filter(|&i| !done[i] && in_degree[i] == 0)
            .collect();

        if batch.is_empty() {
            // Defensive: unreachable after validate_plan
            let stuck = plan
                .tasks
                .iter()
                .enumerate()
                .find(|(i, _)| !done[*i])
                .map(|(_, t)| t.id.clone())
                .unwrap_or_default();
            return Err(OpsError::UnresolvedCycle(stuck));
        }

        for &i in &batch {
            done[i] = true;
            remaining -= 1;
            for &dep in &dependents[i] {
                in_degree[dep] -= 1;
            }
        }
        batches.push(batch.into_iter().map(|i| plan.tasks[i].id.clone()).collect());
    }

    Ok(batches)
}
