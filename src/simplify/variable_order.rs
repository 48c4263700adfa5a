//! Application of a variable order
//!
//! The ordering heuristic lives elsewhere; this module renumbers variables as
//! requested and drops the variables the order leaves out.

use rustc_hash::FxHashSet;
use tracing::info;

use super::FactRenaming;
use crate::error::{Result, TranslateError};
use crate::sas::SasTask;

/// Computes the order in which variables appear in the final task
///
/// The returned order may omit variables; they are removed from the task.
pub trait VariableOrdering {
    /// Returns the old variable placed at each new position
    fn order(&self, task: &SasTask) -> Vec<usize>;
}

/// Keeps every variable at its position
#[derive(Clone, Copy, Debug, Default)]
pub struct KeepOrder;

impl VariableOrdering for KeepOrder {
    fn order(&self, task: &SasTask) -> Vec<usize> {
        (0..task.variables.len()).collect()
    }
}

/// A fixed order computed elsewhere
#[derive(Clone, Debug, Default)]
pub struct ExplicitOrder(pub Vec<usize>);

impl VariableOrdering for ExplicitOrder {
    fn order(&self, _task: &SasTask) -> Vec<usize> {
        self.0.clone()
    }
}

/// Moves variable `order[i]` to position `i` and drops the others
///
/// # Errors
/// Returns `InvalidArgument` if the order repeats a variable, names a variable
/// that does not exist, or leaves out a goal variable.
pub fn apply_variable_order(task: &mut SasTask, order: &[usize]) -> Result<FactRenaming> {
    let num_vars = task.variables.len();
    let mut seen = FxHashSet::default();
    for &var in order {
        if var >= num_vars {
            return Err(TranslateError::InvalidArgument(format!(
                "variable order names var{} but the task has {} variables",
                var, num_vars
            )));
        }
        if !seen.insert(var) {
            return Err(TranslateError::InvalidArgument(format!(
                "variable order repeats var{}",
                var
            )));
        }
    }
    if let Some(&(var, _)) = task.goal.iter().find(|(var, _)| !seen.contains(var)) {
        return Err(TranslateError::InvalidArgument(format!(
            "variable order drops goal variable var{}",
            var
        )));
    }

    let renaming = FactRenaming::from_order(&task.variables.ranges, order);
    renaming
        .apply_to_task(task)
        .map_err(|reason| TranslateError::InvalidArgument(format!("reordering failed: {}", reason)))?;
    info!(
        kept = order.len(),
        dropped = num_vars - order.len(),
        operators = task.operators.len(),
        "applied variable order"
    );
    Ok(renaming)
}
