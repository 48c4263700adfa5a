//! Translation of STRIPS conditions into finite-domain assignments
//!
//! A conjunction of literals becomes a disjunction (DNF) of partial
//! assignments. Positive literals fix a value; a negative literal removes one
//! value from the admissible set of its variable. When a negative literal is
//! not already covered by a constrained variable, the candidate variable with
//! the fewest admissible values is chosen and its values are multiplied out.

use std::collections::{BTreeMap, BTreeSet};

use itertools::Itertools;

use super::dictionary::FactDictionary;
use crate::task::Literal;

/// A partial finite-domain assignment `var -> val`
pub type Assignment = BTreeMap<usize, usize>;

/// Translates conditions against a primary and a mutex dictionary
#[derive(Clone, Copy)]
pub struct ConditionTranslator<'a> {
    dictionary: &'a FactDictionary,
    mutex_dictionary: &'a FactDictionary,
}

impl<'a> ConditionTranslator<'a> {
    /// Creates a translator over the given dictionaries
    pub fn new(dictionary: &'a FactDictionary, mutex_dictionary: &'a FactDictionary) -> Self {
        Self {
            dictionary,
            mutex_dictionary,
        }
    }

    /// Returns the primary dictionary
    pub fn dictionary(&self) -> &'a FactDictionary {
        self.dictionary
    }

    /// Translates a conjunction into a DNF of assignments
    ///
    /// Returns `None` if the conjunction violates a mutex or is otherwise
    /// unsatisfiable. An empty conjunction yields a single empty assignment.
    pub fn translate(&self, conditions: &[Literal]) -> Option<Vec<Assignment>> {
        if conditions.is_empty() {
            return Some(vec![Assignment::new()]);
        }

        translate_aux(conditions, self.mutex_dictionary)?;
        translate_aux(conditions, self.dictionary)
    }

    /// Negates a DNF of literal conjunctions and translates the result
    ///
    /// Returns `None` if the negation is unsatisfiable, in particular when one
    /// of the disjuncts is empty (always true).
    pub fn negate_and_translate(&self, condition: &[Vec<Literal>]) -> Option<Vec<Assignment>> {
        if condition.iter().any(Vec::is_empty) {
            return None;
        }
        if condition.is_empty() {
            // no disjunct can trigger
            return Some(vec![Assignment::new()]);
        }

        let mut negation = Vec::new();
        for combination in condition.iter().map(|c| c.iter()).multi_cartesian_product() {
            let negated: Vec<Literal> = combination.into_iter().map(Literal::negate).collect();
            if let Some(translated) = self.translate(&negated) {
                negation.extend(translated);
            }
        }

        if negation.is_empty() {
            None
        } else {
            Some(negation)
        }
    }
}

fn translate_aux(conditions: &[Literal], dictionary: &FactDictionary) -> Option<Vec<Assignment>> {
    let mut condition: BTreeMap<usize, BTreeSet<usize>> = BTreeMap::new();

    // Negative literals come second so that they can be folded into values
    // already fixed by positive literals.
    for literal in conditions.iter().filter(|l| !l.is_negated()) {
        for &(var, val) in dictionary.get(literal.atom()) {
            if let Some(vals) = condition.get(&var) {
                if !vals.contains(&val) {
                    return None;
                }
            }
            condition.insert(var, BTreeSet::from([val]));
        }
    }

    for literal in conditions.iter().filter(|l| l.is_negated()) {
        let mut done = false;
        let mut candidates: Vec<(usize, BTreeSet<usize>)> = Vec::new();
        for &(var, val) in dictionary.get(literal.atom()) {
            let possible: BTreeSet<usize> = (0..dictionary.range(var)).filter(|&v| v != val).collect();
            match condition.get_mut(&var) {
                None => candidates.push((var, possible)),
                Some(previous) => {
                    done = true;
                    previous.retain(|v| possible.contains(v));
                    if previous.is_empty() {
                        return None;
                    }
                }
            }
        }

        if !done {
            // first smallest candidate wins
            if let Some(index) = candidates.iter().position_min_by_key(|(_, vals)| vals.len()) {
                let (var, vals) = candidates.swap_remove(index);
                condition.insert(var, vals);
            }
        }
    }

    Some(multiply_out(condition))
}

fn multiply_out(condition: BTreeMap<usize, BTreeSet<usize>>) -> Vec<Assignment> {
    let mut sorted: Vec<(usize, BTreeSet<usize>)> = condition.into_iter().collect();
    sorted.sort_by_key(|(_, vals)| vals.len());

    let mut flat = vec![Assignment::new()];
    for (var, vals) in sorted {
        if let (1, Some(&val)) = (vals.len(), vals.iter().next()) {
            for assignment in &mut flat {
                assignment.insert(var, val);
            }
        } else {
            flat = flat
                .iter()
                .flat_map(|assignment| {
                    vals.iter().map(move |&val| {
                        let mut extended = assignment.clone();
                        extended.insert(var, val);
                        extended
                    })
                })
                .collect();
        }
    }
    flat
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::task::Atom;

    fn at(x: &str) -> Atom {
        Atom::new("at", [x])
    }

    fn pos(x: &str) -> Literal {
        Literal::positive(at(x))
    }

    fn neg(x: &str) -> Literal {
        Literal::negative(at(x))
    }

    fn dict(groups: &[Vec<Atom>]) -> FactDictionary {
        FactDictionary::from_groups(groups, true).unwrap()
    }

    #[test]
    fn empty_condition_is_true() {
        let d = dict(&[vec![at("a")]]);
        let t = ConditionTranslator::new(&d, &d);
        assert_eq!(t.translate(&[]), Some(vec![Assignment::new()]));
    }

    #[test]
    fn positive_literals_fix_values() {
        let d = dict(&[vec![at("a"), at("b")], vec![at("c")]]);
        let t = ConditionTranslator::new(&d, &d);
        let dnf = t.translate(&[pos("b"), pos("c")]).unwrap();
        assert_eq!(dnf, vec![Assignment::from([(0, 1), (1, 0)])]);
    }

    #[test]
    fn conflicting_positive_literals_are_unsatisfiable() {
        let d = dict(&[vec![at("a"), at("b")]]);
        let t = ConditionTranslator::new(&d, &d);
        assert_eq!(t.translate(&[pos("a"), pos("b")]), None);
    }

    #[test]
    fn negative_literal_folds_into_positive() {
        let d = dict(&[vec![at("a"), at("b")]]);
        let t = ConditionTranslator::new(&d, &d);
        assert_eq!(
            t.translate(&[pos("a"), neg("b")]),
            Some(vec![Assignment::from([(0, 0)])])
        );
        assert_eq!(t.translate(&[pos("a"), neg("a")]), None);
    }

    #[test]
    fn negative_literal_is_multiplied_out() {
        let d = dict(&[vec![at("a"), at("b")]]);
        let t = ConditionTranslator::new(&d, &d);
        let dnf = t.translate(&[neg("a")]).unwrap();
        assert_eq!(
            dnf,
            vec![Assignment::from([(0, 1)]), Assignment::from([(0, 2)])]
        );
    }

    #[test]
    fn smallest_candidate_is_chosen() {
        // at(b) is encoded twice under the full encoding: in a range-4 and a
        // range-2 variable
        let groups = [vec![at("a"), at("b"), at("c")], vec![at("b")]];
        let d = FactDictionary::from_groups(&groups, false).unwrap();
        let t = ConditionTranslator::new(&d, &d);
        let dnf = t.translate(&[neg("b")]).unwrap();
        assert_eq!(dnf, vec![Assignment::from([(1, 1)])]);
    }

    #[test]
    fn mutex_check_short_circuits() {
        let primary = dict(&[vec![at("a")], vec![at("b")]]);
        let mutex = FactDictionary::from_groups(&[vec![at("a"), at("b")]], false).unwrap();
        let t = ConditionTranslator::new(&primary, &mutex);
        assert_eq!(t.translate(&[pos("a"), pos("b")]), None);

        let unchecked = ConditionTranslator::new(&primary, &primary);
        assert!(unchecked.translate(&[pos("a"), pos("b")]).is_some());
    }

    #[test]
    fn static_atoms_are_ignored() {
        let d = dict(&[vec![at("a")]]);
        let t = ConditionTranslator::new(&d, &d);
        assert_eq!(t.translate(&[pos("static")]), Some(vec![Assignment::new()]));
    }

    #[test]
    fn negation_of_always_true_is_unsatisfiable() {
        let d = dict(&[vec![at("a"), at("b")]]);
        let t = ConditionTranslator::new(&d, &d);
        assert_eq!(t.negate_and_translate(&[vec![pos("a")], vec![]]), None);
        assert_eq!(
            t.negate_and_translate(&[]),
            Some(vec![Assignment::new()])
        );
    }

    #[test]
    fn negation_multiplies_disjuncts() {
        let d = dict(&[vec![at("a"), at("b")]]);
        let t = ConditionTranslator::new(&d, &d);
        // not (a or b) = not a and not b = none-of-those
        let negation = t.negate_and_translate(&[vec![pos("a")], vec![pos("b")]]).unwrap();
        assert_eq!(negation, vec![Assignment::from([(0, 2)])]);
    }
}
