//! Grounded (propositional) task and fact grouping
//!
//! These are the outputs of instantiation, fact-group computation and axiom
//! layering that the finite-domain translation consumes.

use std::collections::BTreeMap;

use super::{Atom, Literal};

/// An effect `condition -> atom`, used for both add and delete effects
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ConditionalEffect {
    /// Effect condition (empty = unconditional)
    pub condition: Vec<Literal>,
    /// Added or deleted atom
    pub atom: Atom,
}

impl ConditionalEffect {
    /// Creates an unconditional effect
    pub fn unconditional(atom: Atom) -> Self {
        Self {
            condition: Vec::new(),
            atom,
        }
    }

    /// Creates a conditional effect
    pub fn when(condition: Vec<Literal>, atom: Atom) -> Self {
        Self { condition, atom }
    }
}

/// A ground action
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PropositionalAction {
    /// Name, conventionally `(schema arg1 arg2 ...)`
    pub name: String,
    /// Precondition conjunction
    pub precondition: Vec<Literal>,
    /// Add effects
    pub add_effects: Vec<ConditionalEffect>,
    /// Delete effects
    pub del_effects: Vec<ConditionalEffect>,
    /// Action cost
    pub cost: i64,
}

impl PropositionalAction {
    /// Creates an action with unit cost
    pub fn new(
        name: impl Into<String>,
        precondition: Vec<Literal>,
        add_effects: Vec<ConditionalEffect>,
        del_effects: Vec<ConditionalEffect>,
    ) -> Self {
        Self {
            name: name.into(),
            precondition,
            add_effects,
            del_effects,
            cost: 1,
        }
    }
}

/// A ground derivation rule
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PropositionalAxiom {
    /// Rule name
    pub name: String,
    /// Body conjunction
    pub condition: Vec<Literal>,
    /// Derived literal; a negated effect derives the default value
    pub effect: Literal,
}

/// A grounded task, after axiom processing
#[derive(Clone, Debug, Default)]
pub struct GroundTask {
    /// Initial atoms (static facts included)
    pub init: Vec<Atom>,
    /// Goal conjunction
    pub goal: Vec<Literal>,
    /// Ground actions
    pub actions: Vec<PropositionalAction>,
    /// Ground derivation rules
    pub axioms: Vec<PropositionalAxiom>,
    /// Initially true derived atoms
    pub axiom_init: Vec<Atom>,
    /// Axiom layer of each derived atom
    pub axiom_layers: BTreeMap<Atom, u32>,
    /// Whether the task asks for minimal cost plans
    pub use_min_cost_metric: bool,
}

/// Partition of the reachable atoms into variables, plus mutex information
#[derive(Clone, Debug, Default)]
pub struct FactGrouping {
    /// One group per finite-domain variable
    pub groups: Vec<Vec<Atom>>,
    /// Mutex groups (may overlap)
    pub mutex_groups: Vec<Vec<Atom>>,
    /// Value names per variable, including the trailing none-of-those name
    pub translation_key: Vec<Vec<String>>,
    /// Whether each atom occurs in exactly one group
    pub partial_encoding: bool,
}

/// Name of the value standing for "no atom of the group holds"
pub const NONE_OF_THOSE: &str = "<none of those>";

impl FactGrouping {
    /// Creates a partial-encoding grouping and derives its translation key
    pub fn new(groups: Vec<Vec<Atom>>, mutex_groups: Vec<Vec<Atom>>) -> Self {
        let translation_key = groups
            .iter()
            .map(|group| {
                group
                    .iter()
                    .map(ToString::to_string)
                    .chain(std::iter::once(NONE_OF_THOSE.to_string()))
                    .collect()
            })
            .collect();
        Self {
            groups,
            mutex_groups,
            translation_key,
            partial_encoding: true,
        }
    }
}
