// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Step graph: `needs` defaulting, cycle rejection, topological order

use crate::error::CompileError;
use osiris_oml::Step;
use std::collections::{HashMap, HashSet};

/// A step with its dependency list made explicit.
#[derive(Debug, Clone)]
pub struct OrderedStep {
    pub step: Step,
    pub needs: Vec<String>,
    /// True when `needs` was omitted and defaulted to the previous step.
    pub defaulted: bool,
}

/// Resolve implicit dependencies and topologically sort the steps.
///
/// A step with no `needs` field depends on the previous step (the first
/// step on nothing); `needs: []` means explicitly no dependency. The sort
/// is stable: among ready steps, source order wins.
pub fn order_steps(steps: &[Step]) -> Result<Vec<OrderedStep>, CompileError> {
    let mut ordered: Vec<OrderedStep> = Vec::with_capacity(steps.len());
    let mut previous: Option<&str> = None;
    for step in steps {
        let (needs, defaulted) = match &step.needs {
            Some(needs) => (needs.clone(), false),
            None => (
                previous.map(|p| vec![p.to_string()]).unwrap_or_default(),
                previous.is_some(),
            ),
        };
        ordered.push(OrderedStep {
            step: step.clone(),
            needs,
            defaulted,
        });
        previous = Some(&step.id);
    }

    topo_sort(ordered)
}

fn topo_sort(steps: Vec<OrderedStep>) -> Result<Vec<OrderedStep>, CompileError> {
    let index: HashMap<&str, usize> = steps
        .iter()
        .enumerate()
        .map(|(i, s)| (s.step.id.as_str(), i))
        .collect();

    let mut in_degree = vec![0usize; steps.len()];
    let mut dependents: Vec<Vec<usize>> = vec![Vec::new(); steps.len()];
    for (i, step) in steps.iter().enumerate() {
        for upstream in &step.needs {
            if let Some(&j) = index.get(upstream.as_str()) {
                in_degree[i] += 1;
                dependents[j].push(i);
            }
        }
    }

    // Kahn's algorithm; the ready list is kept in source order for a
    // stable result.
    let mut ready: Vec<usize> = (0..steps.len()).filter(|&i| in_degree[i] == 0).collect();
    let mut order = Vec::with_capacity(steps.len());
    let mut done: HashSet<usize> = HashSet::new();
    while let Some(&i) = ready.first() {
        ready.remove(0);
        order.push(i);
        done.insert(i);
        for &j in &dependents[i] {
            in_degree[j] -= 1;
            if in_degree[j] == 0 {
                let pos = ready.partition_point(|&k| k < j);
                ready.insert(pos, j);
            }
        }
    }

    if order.len() != steps.len() {
        let mut cycle: Vec<String> = steps
            .iter()
            .enumerate()
            .filter(|(i, _)| !done.contains(i))
            .map(|(_, s)| s.step.id.clone())
            .collect();
        cycle.sort();
        return Err(CompileError::GraphCycle { steps: cycle });
    }

    let mut by_index: Vec<Option<OrderedStep>> = steps.into_iter().map(Some).collect();
    Ok(order
        .into_iter()
        .filter_map(|i| by_index[i].take())
        .collect())
}

#[cfg(test)]
#[path = "graph_tests.rs"]
mod tests;
