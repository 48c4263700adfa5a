//! Removal of unreachable values
//!
//! A value is reachable if it is the initial value, the post value of some
//! operator effect, or the effect of some axiom.

use std::collections::BTreeSet;

use tracing::info;

use super::{FactRenaming, Unsimplifiable};
use crate::sas::SasTask;

/// Removes unreachable values and constant variables from `task`
///
/// Returns the renaming from old to new facts.
///
/// # Errors
/// Returns `Impossible` if a goal value is unreachable and
/// `TriviallySolvable` if every goal variable is constant at its goal value.
pub fn filter_unreachable_propositions(task: &mut SasTask) -> Result<FactRenaming, Unsimplifiable> {
    let mut reachable: Vec<BTreeSet<usize>> = task.init.iter().map(|&val| BTreeSet::from([val])).collect();
    for op in &task.operators {
        for effect in &op.pre_post {
            reachable[effect.var].insert(effect.post);
        }
    }
    for axiom in &task.axioms {
        let (var, val) = axiom.effect;
        reachable[var].insert(val);
    }

    let mut renaming = FactRenaming::new();
    for (var, domain) in reachable.iter().enumerate() {
        renaming.register_variable(task.variables.ranges[var], task.init[var], domain);
    }
    renaming.apply_to_task(task)?;

    info!(
        removed_values = renaming.removed_values(),
        variables = task.variables.len(),
        operators = task.operators.len(),
        "filtered unreachable propositions"
    );
    Ok(renaming)
}
