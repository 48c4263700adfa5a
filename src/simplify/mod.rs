//! Simplifications of the finite-domain task
//!
//! Both simplifications rename facts: values disappear, variables are
//! renumbered or removed. A [`FactRenaming`] records the mapping and rewrites
//! the task; callers use it to carry symmetry generators along.

mod reachability;
mod variable_order;

pub use reachability::filter_unreachable_propositions;
pub use variable_order::{apply_variable_order, ExplicitOrder, KeepOrder, VariableOrdering};

use std::collections::BTreeSet;

use thiserror::Error;

use crate::sas::{PrePost, SasAxiom, SasMutexGroup, SasOperator, SasTask, SasVariables};
use crate::task::Fact;

/// A simplification proved the task trivial
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum Unsimplifiable {
    /// Some goal fact can never hold
    #[error("goal is unreachable")]
    Impossible,
    /// Every goal fact always holds
    #[error("goal is always satisfied")]
    TriviallySolvable,
}

/// Image of an old fact under a renaming
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Renamed {
    /// The fact survives under a new name
    To(Fact),
    /// The fact holds in every reachable state (or no longer matters)
    AlwaysTrue,
    /// The fact never holds
    AlwaysFalse,
}

/// A renaming of finite-domain facts
#[derive(Clone, Debug, Default)]
pub struct FactRenaming {
    new_vars: Vec<Option<usize>>,
    new_values: Vec<Vec<Renamed>>,
    new_ranges: Vec<usize>,
    removed_values: usize,
}

impl FactRenaming {
    /// Creates an empty renaming
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers the next old variable, keeping the values in `domain`
    ///
    /// A variable with a single remaining value is constant: it is removed and
    /// its initial value becomes always true.
    pub fn register_variable(&mut self, old_range: usize, init: usize, domain: &BTreeSet<usize>) {
        debug_assert!(domain.contains(&init));
        if domain.len() == 1 {
            let mut values = vec![Renamed::AlwaysFalse; old_range];
            values[init] = Renamed::AlwaysTrue;
            self.new_vars.push(None);
            self.new_values.push(values);
            self.removed_values += old_range;
            return;
        }

        let new_var = self.new_ranges.len();
        let mut next = 0;
        let values = (0..old_range)
            .map(|val| {
                if domain.contains(&val) {
                    next += 1;
                    Renamed::To((new_var, next - 1))
                } else {
                    self.removed_values += 1;
                    Renamed::AlwaysFalse
                }
            })
            .collect();
        self.new_vars.push(Some(new_var));
        self.new_values.push(values);
        self.new_ranges.push(next);
    }

    /// Builds the renaming that moves variable `order[i]` to position `i`
    ///
    /// Variables missing from `order` are removed; conditions on them are
    /// dropped as always true.
    pub fn from_order(ranges: &[usize], order: &[usize]) -> Self {
        let mut new_vars = vec![None; ranges.len()];
        for (new_var, &old_var) in order.iter().enumerate() {
            new_vars[old_var] = Some(new_var);
        }
        let new_values = ranges
            .iter()
            .zip(&new_vars)
            .map(|(&range, new_var)| match new_var {
                Some(new_var) => (0..range).map(|val| Renamed::To((*new_var, val))).collect(),
                None => vec![Renamed::AlwaysTrue; range],
            })
            .collect();
        let removed_values = ranges
            .iter()
            .zip(&new_vars)
            .filter(|(_, v)| v.is_none())
            .map(|(&range, _)| range)
            .sum();
        Self {
            new_vars,
            new_values,
            new_ranges: order.iter().map(|&var| ranges[var]).collect(),
            removed_values,
        }
    }

    /// Returns the number of removed values
    pub fn removed_values(&self) -> usize {
        self.removed_values
    }

    /// Returns the number of variables after renaming
    pub fn num_new_variables(&self) -> usize {
        self.new_ranges.len()
    }

    /// Returns the image of an old fact
    pub fn rename(&self, (var, val): Fact) -> Renamed {
        self.new_values
            .get(var)
            .and_then(|values| values.get(val))
            .copied()
            .unwrap_or(Renamed::AlwaysFalse)
    }

    /// Returns the new name of a surviving fact
    pub fn translate_fact(&self, fact: Fact) -> Option<Fact> {
        match self.rename(fact) {
            Renamed::To(new) => Some(new),
            Renamed::AlwaysTrue | Renamed::AlwaysFalse => None,
        }
    }

    /// Renames a conjunction, dropping always-true facts
    ///
    /// Returns `None` if some fact is always false.
    fn convert_pairs(&self, pairs: &[Fact]) -> Option<Vec<Fact>> {
        let mut converted = Vec::with_capacity(pairs.len());
        for &pair in pairs {
            match self.rename(pair) {
                Renamed::To(new) => converted.push(new),
                Renamed::AlwaysTrue => {}
                Renamed::AlwaysFalse => return None,
            }
        }
        converted.sort_unstable();
        Some(converted)
    }

    /// Rewrites `task` in place
    ///
    /// # Errors
    /// Returns `Impossible` if a goal fact is always false and
    /// `TriviallySolvable` if no goal fact remains. `task` is left unchanged
    /// in both cases.
    pub fn apply_to_task(&self, task: &mut SasTask) -> Result<(), Unsimplifiable> {
        let goal = self.convert_pairs(&task.goal).ok_or(Unsimplifiable::Impossible)?;
        if goal.is_empty() {
            return Err(Unsimplifiable::TriviallySolvable);
        }

        let variables = self.apply_to_variables(&task.variables);
        let mut init = vec![0; self.num_new_variables()];
        for (var, &val) in task.init.iter().enumerate() {
            if let Renamed::To((new_var, new_val)) = self.rename((var, val)) {
                init[new_var] = new_val;
            }
        }
        let mutexes = task
            .mutexes
            .iter()
            .filter_map(|mutex| {
                let facts: Vec<Fact> = mutex
                    .facts
                    .iter()
                    .filter_map(|&fact| self.translate_fact(fact))
                    .collect();
                (facts.len() >= 2).then_some(SasMutexGroup { facts })
            })
            .collect();
        let operators = task
            .operators
            .iter()
            .filter_map(|op| self.apply_to_operator(op))
            .collect();
        let axioms = task
            .axioms
            .iter()
            .filter_map(|axiom| self.apply_to_axiom(axiom))
            .collect();

        task.variables = variables;
        task.init = init;
        task.goal = goal;
        task.mutexes = mutexes;
        task.operators = operators;
        task.axioms = axioms;
        Ok(())
    }

    fn apply_to_variables(&self, variables: &SasVariables) -> SasVariables {
        let count = self.num_new_variables();
        let mut axiom_layers = vec![None; count];
        let mut value_names = vec![Vec::new(); count];
        for (var, new_var) in self.new_vars.iter().enumerate() {
            let Some(new_var) = *new_var else {
                continue;
            };
            axiom_layers[new_var] = variables.axiom_layers.get(var).copied().flatten();
            if let Some(names) = variables.value_names.get(var) {
                value_names[new_var] = names
                    .iter()
                    .enumerate()
                    .filter(|&(val, _)| matches!(self.rename((var, val)), Renamed::To(_)))
                    .map(|(_, name)| name.clone())
                    .collect();
            }
        }
        SasVariables {
            ranges: self.new_ranges.clone(),
            axiom_layers,
            value_names,
        }
    }

    fn apply_to_operator(&self, op: &SasOperator) -> Option<SasOperator> {
        let applicability: Vec<Fact> = op
            .prevail
            .iter()
            .copied()
            .chain(op.pre_post.iter().filter_map(|e| e.pre.map(|pre| (e.var, pre))))
            .collect();
        let conditions = self.convert_pairs(&applicability)?;
        let mut prevail_vars: BTreeSet<usize> = conditions.iter().map(|&(var, _)| var).collect();

        let mut pre_post = Vec::with_capacity(op.pre_post.len());
        for effect in &op.pre_post {
            let (new_var, post) = match self.rename((effect.var, effect.post)) {
                Renamed::To(new) => new,
                // the variable is gone, the effect does nothing
                Renamed::AlwaysTrue | Renamed::AlwaysFalse => continue,
            };
            let pre = match effect.pre.map(|pre| self.rename((effect.var, pre))) {
                None => None,
                Some(Renamed::To((_, pre))) => Some(pre),
                Some(Renamed::AlwaysTrue) => None,
                Some(Renamed::AlwaysFalse) => return None,
            };
            let Some(effect_conditions) = self.convert_pairs(&effect.conditions) else {
                continue;
            };
            prevail_vars.remove(&new_var);
            pre_post.push(PrePost {
                var: new_var,
                pre,
                post,
                conditions: effect_conditions,
            });
        }
        if pre_post.is_empty() {
            return None;
        }
        pre_post.sort_by_key(|effect| effect.var);

        Some(SasOperator {
            name: op.name.clone(),
            prevail: conditions
                .into_iter()
                .filter(|(var, _)| prevail_vars.contains(var))
                .collect(),
            pre_post,
            cost: op.cost,
        })
    }

    fn apply_to_axiom(&self, axiom: &SasAxiom) -> Option<SasAxiom> {
        let condition = self.convert_pairs(&axiom.condition)?;
        match self.rename(axiom.effect) {
            Renamed::To(effect) => Some(SasAxiom { condition, effect }),
            Renamed::AlwaysTrue | Renamed::AlwaysFalse => None,
        }
    }

    /// Returns true if the old variable survives
    pub fn keeps_variable(&self, var: usize) -> bool {
        matches!(self.new_vars.get(var), Some(Some(_)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn constant_variable_is_removed() {
        let mut renaming = FactRenaming::new();
        renaming.register_variable(3, 1, &BTreeSet::from([1]));
        renaming.register_variable(3, 0, &BTreeSet::from([0, 2]));
        assert_eq!(renaming.rename((0, 1)), Renamed::AlwaysTrue);
        assert_eq!(renaming.rename((0, 0)), Renamed::AlwaysFalse);
        assert_eq!(renaming.rename((1, 2)), Renamed::To((0, 1)));
        assert_eq!(renaming.rename((1, 1)), Renamed::AlwaysFalse);
        assert_eq!(renaming.removed_values(), 4);
        assert_eq!(renaming.num_new_variables(), 1);
        assert!(!renaming.keeps_variable(0));
        assert!(renaming.keeps_variable(1));
    }

    #[test]
    fn order_renaming_moves_variables() {
        let renaming = FactRenaming::from_order(&[2, 3, 4], &[2, 0]);
        assert_eq!(renaming.rename((2, 3)), Renamed::To((0, 3)));
        assert_eq!(renaming.rename((0, 1)), Renamed::To((1, 1)));
        assert_eq!(renaming.rename((1, 0)), Renamed::AlwaysTrue);
        assert_eq!(renaming.translate_fact((1, 0)), None);
        assert_eq!(renaming.removed_values(), 3);
    }

    #[test]
    fn goal_shortcuts() {
        let mut task = SasTask::trivial(false);
        let mut renaming = FactRenaming::new();
        renaming.register_variable(2, 0, &BTreeSet::from([0]));
        assert_eq!(renaming.apply_to_task(&mut task), Err(Unsimplifiable::Impossible));

        let mut task = SasTask::trivial(true);
        assert_eq!(renaming.apply_to_task(&mut task), Err(Unsimplifiable::TriviallySolvable));
        assert_eq!(task, SasTask::trivial(true));
    }
}
