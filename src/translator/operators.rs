//! Translation of ground actions and axioms into SAS operators and rules
//!
//! Effects are bucketed by variable and value. A delete effect that is not
//! provably overridden by an add effect on the same variable sets the variable
//! to its none-of-those value, guarded by "the deleted value held and no add
//! effect on this variable triggers".

use std::collections::{BTreeMap, BTreeSet};

use rustc_hash::{FxHashMap, FxHashSet};

use super::conditions::{Assignment, ConditionTranslator};
use super::dictionary::FactDictionary;
use crate::error::Result;
use crate::sas::{PrePost, SasAxiom, SasOperator};
use crate::task::{Atom, Fact, Literal, PropositionalAction, PropositionalAxiom};

/// Facts implied by a fact in every reachable state
pub type ImpliedFacts = FxHashMap<Fact, Vec<Fact>>;

/// Effect conditions per variable and value
type EffectsByVariable = BTreeMap<usize, BTreeMap<usize, Vec<Assignment>>>;

/// Counters of simplifications applied while building operators
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct OperatorCounters {
    /// Effect conditions pruned on binary variables
    pub simplified_effect_conditions: usize,
    /// Preconditions added from implied facts
    pub added_implied_preconditions: usize,
}

/// Translates ground actions and axioms
pub struct OperatorTranslator<'a> {
    conditions: ConditionTranslator<'a>,
    implied_facts: Option<&'a ImpliedFacts>,
}

impl<'a> OperatorTranslator<'a> {
    /// Creates an operator translator
    ///
    /// With `implied_facts`, binary effect variables whose other value is
    /// implied by the precondition get an explicit precondition.
    pub fn new(conditions: ConditionTranslator<'a>, implied_facts: Option<&'a ImpliedFacts>) -> Self {
        Self {
            conditions,
            implied_facts,
        }
    }

    fn dictionary(&self) -> &'a FactDictionary {
        self.conditions.dictionary()
    }

    /// Translates an action into one SAS operator per precondition branch
    ///
    /// Branches whose precondition is unsatisfiable and branches without any
    /// effect are dropped.
    pub fn translate_action(
        &self,
        action: &PropositionalAction,
        counters: &mut OperatorCounters,
    ) -> Vec<SasOperator> {
        let Some(branches) = self.conditions.translate(&action.precondition) else {
            return Vec::new();
        };
        let effects = self.collect_effects(action);
        branches
            .into_iter()
            .filter_map(|condition| {
                self.build_operator(&action.name, condition, effects.clone(), action.cost, counters)
            })
            .collect()
    }

    fn collect_effects(&self, action: &PropositionalAction) -> EffectsByVariable {
        let dictionary = self.dictionary();
        let mut effects_by_variable = EffectsByVariable::new();
        let mut add_conds_by_variable: BTreeMap<usize, Vec<Vec<Literal>>> = BTreeMap::new();

        for effect in &action.add_effects {
            let Some(conditions) = self.conditions.translate(&effect.condition) else {
                continue;
            };
            for &(var, val) in dictionary.get(&effect.atom) {
                effects_by_variable
                    .entry(var)
                    .or_default()
                    .entry(val)
                    .or_default()
                    .extend(conditions.iter().cloned());
                add_conds_by_variable
                    .entry(var)
                    .or_default()
                    .push(effect.condition.clone());
            }
        }

        let mut del_effects_by_variable = EffectsByVariable::new();
        for effect in &action.del_effects {
            let Some(conditions) = self.conditions.translate(&effect.condition) else {
                continue;
            };
            for &(var, val) in dictionary.get(&effect.atom) {
                del_effects_by_variable
                    .entry(var)
                    .or_default()
                    .entry(val)
                    .or_default()
                    .extend(conditions.iter().cloned());
            }
        }

        for (var, deleted) in del_effects_by_variable {
            let add_conds = add_conds_by_variable.get(&var).map(Vec::as_slice).unwrap_or(&[]);
            let Some(no_add_effect) = self.conditions.negate_and_translate(add_conds) else {
                // some add effect on var always triggers
                continue;
            };
            let none_of_those = dictionary.none_of_those(var);
            for (val, conds) in deleted {
                for mut cond in conds {
                    if cond.get(&var).is_some_and(|&v| v != val) {
                        continue;
                    }
                    cond.insert(var, val);
                    for no_add_cond in &no_add_effect {
                        if let Some(guarded) = merge(&cond, no_add_cond) {
                            effects_by_variable
                                .entry(var)
                                .or_default()
                                .entry(none_of_those)
                                .or_default()
                                .push(guarded);
                        }
                    }
                }
            }
        }

        effects_by_variable
    }

    fn build_operator(
        &self,
        name: &str,
        mut condition: Assignment,
        effects_by_variable: EffectsByVariable,
        cost: i64,
        counters: &mut OperatorCounters,
    ) -> Option<SasOperator> {
        let ranges = self.dictionary().ranges();
        let implied_precondition: Option<FxHashSet<Fact>> = self.implied_facts.map(|implied| {
            condition
                .iter()
                .filter_map(|(&var, &val)| implied.get(&(var, val)))
                .flatten()
                .copied()
                .collect()
        });

        let prevail_and_pre = condition.clone();
        let mut pre_post = Vec::new();
        for (var, effects) in effects_by_variable {
            let orig_pre = condition.get(&var).copied();
            let posts: BTreeSet<usize> = effects.keys().copied().collect();
            let mut added_effect = false;
            for (post, eff_conditions) in effects {
                let mut pre = orig_pre;
                if pre == Some(post) {
                    continue;
                }
                let mut eff_condition_lists: Vec<Vec<Fact>> = eff_conditions
                    .iter()
                    .map(|c| c.iter().map(|(&v, &x)| (v, x)).collect())
                    .collect();
                if ranges[var] == 2 {
                    let dual_has_effect = posts.contains(&(1 - post));
                    if prune_stupid_effect_conditions(var, post, &mut eff_condition_lists, dual_has_effect) {
                        counters.simplified_effect_conditions += 1;
                    }
                    let dual = (var, 1 - post);
                    if pre.is_none()
                        && implied_precondition.as_ref().is_some_and(|implied| implied.contains(&dual))
                    {
                        counters.added_implied_preconditions += 1;
                        pre = Some(1 - post);
                    }
                }
                for eff_condition in eff_condition_lists {
                    // preconditions need not be repeated as effect conditions,
                    // and effects contradicting them never fire
                    let mut filtered = Vec::with_capacity(eff_condition.len());
                    let mut contradicts = false;
                    for (variable, value) in eff_condition {
                        match prevail_and_pre.get(&variable) {
                            Some(&required) if required != value => {
                                contradicts = true;
                                break;
                            }
                            Some(_) => {}
                            None => filtered.push((variable, value)),
                        }
                    }
                    if contradicts {
                        continue;
                    }
                    pre_post.push(PrePost {
                        var,
                        pre,
                        post,
                        conditions: filtered,
                    });
                    added_effect = true;
                }
            }
            if added_effect {
                // a changed variable is a precondition, not a prevail condition
                condition.remove(&var);
            }
        }

        if pre_post.is_empty() {
            return None;
        }
        Some(SasOperator {
            name: name.to_string(),
            prevail: condition.into_iter().collect(),
            pre_post,
            cost,
        })
    }

    /// Translates an axiom into one SAS rule per body branch
    ///
    /// # Errors
    /// Returns `EncodingPolicy` if the derived atom is not encoded by exactly
    /// one fact.
    pub fn translate_axiom(&self, axiom: &PropositionalAxiom) -> Result<Vec<SasAxiom>> {
        let Some(branches) = self.conditions.translate(&axiom.condition) else {
            return Ok(Vec::new());
        };
        let dictionary = self.dictionary();
        let effect = if axiom.effect.is_negated() {
            let (var, _) = dictionary.single(axiom.effect.atom())?;
            (var, dictionary.none_of_those(var))
        } else {
            dictionary.single(axiom.effect.atom())?
        };
        Ok(branches
            .into_iter()
            .map(|condition| SasAxiom {
                condition: condition.into_iter().collect(),
                effect,
            })
            .collect())
    }
}

fn merge(cond: &Assignment, extra: &Assignment) -> Option<Assignment> {
    let mut merged = cond.clone();
    for (&var, &val) in extra {
        match merged.get(&var) {
            Some(&existing) if existing != val => return None,
            _ => {
                merged.insert(var, val);
            }
        }
    }
    Some(merged)
}

/// Simplifies the DNF condition of an effect `var := val` on a binary variable
///
/// Drops conditions `var = 1 - val` (the effect is a no-op when they fail) and
/// collapses the DNF to `[[]]` once a disjunct becomes empty. Nothing is
/// pruned if the operator also has an effect setting the dual value. Returns
/// true if anything changed.
pub fn prune_stupid_effect_conditions(
    var: usize,
    val: usize,
    conditions: &mut Vec<Vec<Fact>>,
    dual_has_effect: bool,
) -> bool {
    if conditions.len() == 1 && conditions[0].is_empty() {
        return false;
    }
    if dual_has_effect {
        return false;
    }
    debug_assert!(val <= 1, "effect value {} on binary variable", val);
    let dual = (var, 1 - val);
    let mut simplified = false;
    let mut collapse = false;
    for condition in conditions.iter_mut() {
        let before = condition.len();
        condition.retain(|fact| *fact != dual);
        simplified |= condition.len() != before;
        if condition.is_empty() {
            collapse = true;
            break;
        }
    }
    if collapse {
        *conditions = vec![Vec::new()];
        simplified = true;
    }
    simplified
}

/// Computes facts implied by other facts through lonely propositions
///
/// A proposition is lonely if it forms a group of its own; only then is
/// "not prop" encoded by a fact, `(var, 1)`. Every other member of a mutex
/// group containing a lonely proposition implies that fact.
pub fn build_implied_facts(
    dictionary: &FactDictionary,
    groups: &[Vec<Atom>],
    mutex_groups: &[Vec<Atom>],
) -> ImpliedFacts {
    let lonely: FxHashMap<&Atom, usize> = groups
        .iter()
        .enumerate()
        .filter_map(|(var, group)| match group.as_slice() {
            [prop] => Some((prop, var)),
            _ => None,
        })
        .collect();

    let mut implied = ImpliedFacts::default();
    for mutex_group in mutex_groups {
        for prop in mutex_group {
            let Some(&prop_var) = lonely.get(prop) else {
                continue;
            };
            let prop_is_false = (prop_var, 1);
            let others: BTreeSet<&Atom> = mutex_group.iter().filter(|other| *other != prop).collect();
            for other in others {
                for &fact in dictionary.get(other) {
                    implied.entry(fact).or_default().push(prop_is_false);
                }
            }
        }
    }
    implied
}
