//! STRIPS to finite-domain translation
//!
//! Translates a grounded task against a fact grouping: one variable per group,
//! conditions as DNFs of partial assignments, operators and axioms as SAS
//! operators and rules.

mod conditions;
mod dictionary;
mod operators;

pub use conditions::{Assignment, ConditionTranslator};
pub use dictionary::FactDictionary;
pub use operators::{
    build_implied_facts, prune_stupid_effect_conditions, ImpliedFacts, OperatorCounters,
    OperatorTranslator,
};

use tracing::{debug, info};

use crate::error::{Result, TranslateError};
use crate::sas::{SasMutexGroup, SasTask, SasVariables};
use crate::task::{Atom, Fact, FactGrouping, GroundTask};

/// Result of translating a task
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum TaskOutcome {
    /// A regular finite-domain task
    Translated(SasTask),
    /// The goal violates a mutex; the reason is attached
    Unsolvable(&'static str),
    /// The goal is empty; the reason is attached
    Solvable(&'static str),
}

impl TaskOutcome {
    /// Returns the task, replacing shortcuts with placeholder tasks
    pub fn into_task(self) -> SasTask {
        match self {
            TaskOutcome::Translated(task) => task,
            TaskOutcome::Unsolvable(_) => SasTask::trivial(false),
            TaskOutcome::Solvable(_) => SasTask::trivial(true),
        }
    }

    /// Returns true unless this is a placeholder shortcut
    pub fn is_translated(&self) -> bool {
        matches!(self, TaskOutcome::Translated(_))
    }
}

/// Translates grounded tasks against a fixed fact grouping
pub struct TaskTranslator<'a> {
    grouping: &'a FactGrouping,
    dictionary: FactDictionary,
    mutex_dictionary: FactDictionary,
    implied_facts: Option<ImpliedFacts>,
}

impl<'a> TaskTranslator<'a> {
    /// Builds the dictionaries for `grouping`
    ///
    /// # Errors
    /// Returns `EncodingPolicy` if the grouping claims a partial encoding but
    /// some atom occurs in several groups, and `InvalidArgument` if the
    /// translation key does not name every value of every variable.
    pub fn new(grouping: &'a FactGrouping, add_implied_preconditions: bool) -> Result<Self> {
        check_translation_key(grouping)?;
        let dictionary = FactDictionary::from_groups(&grouping.groups, grouping.partial_encoding)?;
        let mutex_dictionary = FactDictionary::from_groups(&grouping.mutex_groups, false)?;
        let implied_facts = add_implied_preconditions
            .then(|| build_implied_facts(&dictionary, &grouping.groups, &grouping.mutex_groups));
        debug!(
            variables = dictionary.num_variables(),
            atoms = dictionary.len(),
            "built fact dictionary"
        );
        Ok(Self {
            grouping,
            dictionary,
            mutex_dictionary,
            implied_facts,
        })
    }

    /// Returns the fact dictionary
    pub fn dictionary(&self) -> &FactDictionary {
        &self.dictionary
    }

    /// Returns a condition translator over this translator's dictionaries
    pub fn conditions(&self) -> ConditionTranslator<'_> {
        ConditionTranslator::new(&self.dictionary, &self.mutex_dictionary)
    }

    /// Translates `task` into a finite-domain task
    ///
    /// # Errors
    /// Returns `InconsistentInit` if two init facts set one variable to
    /// different values, `UnsupportedNegativeGoal` if the goal needs a
    /// disjunction, and `EncodingPolicy` for derived atoms encoded by several
    /// facts.
    pub fn translate_task(&self, task: &GroundTask, counters: &mut OperatorCounters) -> Result<TaskOutcome> {
        let init = self.initial_values(task)?;

        let Some(mut goal_branches) = self.conditions().translate(&task.goal) else {
            return Ok(TaskOutcome::Unsolvable("goal violates a mutex"));
        };
        if goal_branches.len() != 1 {
            return Err(TranslateError::UnsupportedNegativeGoal(format!(
                "goal translates into {} branches",
                goal_branches.len()
            )));
        }
        let goal: Vec<Fact> = goal_branches.swap_remove(0).into_iter().collect();
        if goal.is_empty() {
            return Ok(TaskOutcome::Solvable("empty goal"));
        }

        let operator_translator = OperatorTranslator::new(self.conditions(), self.implied_facts.as_ref());
        let operators = task
            .actions
            .iter()
            .flat_map(|action| operator_translator.translate_action(action, counters))
            .collect();
        let mut axioms = Vec::new();
        for axiom in &task.axioms {
            axioms.extend(operator_translator.translate_axiom(axiom)?);
        }

        let mut axiom_layers = vec![None; self.dictionary.num_variables()];
        for (atom, &layer) in &task.axiom_layers {
            let (var, _) = self.dictionary.single(atom)?;
            axiom_layers[var] = Some(layer);
        }

        let mutexes = build_mutex_key(&self.dictionary, &self.grouping.mutex_groups)
            .into_iter()
            .map(|facts| SasMutexGroup { facts })
            .collect();

        info!(
            simplified_effect_conditions = counters.simplified_effect_conditions,
            added_implied_preconditions = counters.added_implied_preconditions,
            "translated task"
        );

        Ok(TaskOutcome::Translated(SasTask {
            variables: SasVariables {
                ranges: self.dictionary.ranges().to_vec(),
                axiom_layers,
                value_names: self.grouping.translation_key.clone(),
            },
            mutexes,
            init,
            goal,
            operators,
            axioms,
            use_min_cost_metric: task.use_min_cost_metric,
            search_generators: None,
        }))
    }

    fn initial_values(&self, task: &GroundTask) -> Result<Vec<usize>> {
        let dictionary = &self.dictionary;
        let mut init: Vec<usize> = (0..dictionary.num_variables())
            .map(|var| dictionary.none_of_those(var))
            .collect();
        for atom in task.init.iter().chain(&task.axiom_init) {
            // static atoms have no facts
            for &(var, val) in dictionary.get(atom) {
                let current = init[var];
                if current != dictionary.none_of_those(var) && current != val {
                    return Err(TranslateError::InconsistentInit(format!(
                        "{} sets var{} to {}, already set to {}",
                        atom, var, val, current
                    )));
                }
                init[var] = val;
            }
        }
        Ok(init)
    }
}

/// Maps every mutex group to the facts encoding its atoms
///
/// An atom encoded by several facts contributes all of them. Atoms without
/// facts are left out.
pub fn build_mutex_key(dictionary: &FactDictionary, mutex_groups: &[Vec<Atom>]) -> Vec<Vec<Fact>> {
    mutex_groups
        .iter()
        .map(|group| {
            let mut key = Vec::with_capacity(group.len());
            for atom in group {
                match dictionary.lookup(atom) {
                    Some(facts) => key.extend_from_slice(facts),
                    None => debug!(%atom, "not in dictionary, left out of mutex group"),
                }
            }
            key
        })
        .collect()
}

fn check_translation_key(grouping: &FactGrouping) -> Result<()> {
    if grouping.translation_key.len() != grouping.groups.len() {
        return Err(TranslateError::InvalidArgument(format!(
            "translation key names {} variables, grouping has {}",
            grouping.translation_key.len(),
            grouping.groups.len()
        )));
    }
    for (var, (names, group)) in grouping.translation_key.iter().zip(&grouping.groups).enumerate() {
        if names.len() != group.len() + 1 {
            return Err(TranslateError::InvalidArgument(format!(
                "translation key names {} values for var{}, expected {}",
                names.len(),
                var,
                group.len() + 1
            )));
        }
    }
    Ok(())
}
