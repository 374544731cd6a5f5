//! Task scheduling
//!
//! Maps tasks onto the kernel's dependency graph: an edge runs from the task
//! producing a data node to every task consuming it.

use crate::entities::Task;
use crate::error::Result;
use strata_kernel::TaskGraph;

/// Producer → consumer graph over `tasks`, nodes in the given order
#[must_use]
pub fn build_graph(tasks: Vec<Task>) -> TaskGraph<Task> {
    TaskGraph::from_artifacts(tasks.into_iter().map(|task| {
        let inputs = task.inputs().to_vec();
        let outputs = task.outputs().to_vec();
        (task, inputs, outputs)
    }))
}

/// Tasks in dispatch order
///
/// # Errors
/// `GraphHasCycle` if tasks depend on each other
pub fn order(tasks: Vec<Task>) -> Result<Vec<Task>> {
    let graph = build_graph(tasks);
    let order = graph.order()?;
    let mut slots: Vec<Option<Task>> = graph.into_nodes().into_iter().map(Some).collect();
    Ok(order.into_iter().filter_map(|i| slots[i].take()).collect())
}

/// Tasks grouped by dependency level
///
/// # Errors
/// `GraphHasCycle` if tasks depend on each other
pub fn levels(tasks: Vec<Task>) -> Result<Vec<Vec<Task>>> {
    let graph = build_graph(tasks);
    let levels = graph.levels()?;
    let mut slots: Vec<Option<Task>> = graph.into_nodes().into_iter().map(Some).collect();
    Ok(levels
        .into_iter()
        .map(|level| level.into_iter().filter_map(|i| slots[i].take()).collect())
        .collect())
}
