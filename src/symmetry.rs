//! Symmetry generators
//!
//! A lifted generator maps predicate and object names. Grounding it against
//! the fact dictionary gives a permutation of finite-domain facts, which is
//! kept valid through every later renaming of the task.

mod search_encoding;

pub use search_encoding::{EncodingCounts, SearchGenerators};

use std::collections::BTreeMap;

use tracing::{debug, info};

use crate::error::{Result, TranslateError};
use crate::graph::{ColoredGraph, NodeKey, NodeKind};
use crate::task::{Atom, Fact};
use crate::translator::FactDictionary;

/// A symmetry of the lifted task as a predicate and an object mapping
///
/// Identity entries are never stored; a generator has at least one entry.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LiftedGenerator {
    predicates: BTreeMap<String, String>,
    objects: BTreeMap<String, String>,
    affects_operators: bool,
    maps_whole_operators: bool,
}

impl LiftedGenerator {
    /// Creates a generator from explicit mappings
    ///
    /// Returns `None` if both mappings are the identity.
    pub fn new(predicates: BTreeMap<String, String>, objects: BTreeMap<String, String>) -> Option<Self> {
        let predicates: BTreeMap<_, _> = predicates.into_iter().filter(|(from, to)| from != to).collect();
        let objects: BTreeMap<_, _> = objects.into_iter().filter(|(from, to)| from != to).collect();
        if predicates.is_empty() && objects.is_empty() {
            return None;
        }
        Some(Self {
            predicates,
            objects,
            affects_operators: false,
            maps_whole_operators: false,
        })
    }

    /// Extracts the generator induced by a graph automorphism
    ///
    /// Only predicate and object vertices contribute; equality vertices are
    /// skipped. Moved operator or axiom vertices set the diagnostic flags.
    /// Returns `None` if no predicate or object is moved.
    pub fn from_permutation(graph: &ColoredGraph, permutation: &[usize]) -> Option<Self> {
        let mut predicates = BTreeMap::new();
        let mut objects = BTreeMap::new();
        let mut affects_operators = false;
        let mut maps_whole_operators = false;

        for (from, &to) in permutation.iter().enumerate() {
            if from == to || graph.is_excluded(from) || graph.is_excluded(to) {
                continue;
            }
            match (graph.key(from), graph.key(to)) {
                (
                    NodeKey::Predicate {
                        name: from_name,
                        negated: false,
                    },
                    NodeKey::Predicate { name: to_name, .. },
                ) if from_name != to_name => {
                    predicates.insert(from_name.clone(), to_name.clone());
                }
                (NodeKey::Constant(from_name), NodeKey::Constant(to_name)) => {
                    objects.insert(from_name.clone(), to_name.clone());
                }
                (key, _) if matches!(key.kind(), NodeKind::Operator | NodeKind::Axiom) => {
                    affects_operators = true;
                    maps_whole_operators |= key.is_main_node();
                }
                _ => {}
            }
        }

        if affects_operators {
            debug!(maps_whole_operators, "generator affects operators or axioms");
        }
        let mut generator = Self::new(predicates, objects)?;
        generator.affects_operators = affects_operators;
        generator.maps_whole_operators = maps_whole_operators;
        Some(generator)
    }

    /// Returns the predicate mapping
    pub fn predicates(&self) -> &BTreeMap<String, String> {
        &self.predicates
    }

    /// Returns the object mapping
    pub fn objects(&self) -> &BTreeMap<String, String> {
        &self.objects
    }

    /// Returns true if the automorphism moved operator or axiom vertices
    pub fn affects_operators(&self) -> bool {
        self.affects_operators
    }

    /// Returns true if the automorphism moved an operator or axiom main vertex
    pub fn maps_whole_operators(&self) -> bool {
        self.maps_whole_operators
    }

    /// Returns the image of an atom
    pub fn apply_to_atom(&self, atom: &Atom) -> Atom {
        let predicate = self.predicates.get(atom.predicate()).map_or(atom.predicate(), String::as_str);
        Atom::new(
            predicate,
            atom.args()
                .iter()
                .map(|arg| self.objects.get(arg).map_or(arg.as_str(), String::as_str)),
        )
    }
}

/// A permutation of finite-domain facts
///
/// Facts without an entry are fixed or undefined.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct SasGenerator(BTreeMap<Fact, Fact>);

impl SasGenerator {
    /// Creates a generator from its entries
    pub fn new(mapping: BTreeMap<Fact, Fact>) -> Self {
        Self(mapping)
    }

    /// Returns the image of a fact, if defined
    pub fn get(&self, fact: Fact) -> Option<Fact> {
        self.0.get(&fact).copied()
    }

    /// Returns the number of entries
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Returns true if there are no entries
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Iterates over the entries in fact order
    pub fn iter(&self) -> impl Iterator<Item = (Fact, Fact)> + '_ {
        self.0.iter().map(|(&from, &to)| (from, to))
    }

    /// Returns true if every entry maps a fact to itself
    pub fn is_identity(&self) -> bool {
        self.0.iter().all(|(from, to)| from == to)
    }

    /// Returns true if the entries permute the set of mapped facts
    pub fn is_permutation(&self) -> bool {
        let mut targets: Vec<Fact> = self.0.values().copied().collect();
        targets.sort_unstable();
        targets.dedup();
        targets.len() == self.0.len() && targets.iter().all(|target| self.0.contains_key(target))
    }

    /// Returns the order of the permutation (lcm of its cycle lengths)
    ///
    /// Only meaningful for permutations.
    pub fn order(&self) -> usize {
        let mut order = 1;
        let mut visited = BTreeMap::new();
        for &start in self.0.keys() {
            if visited.contains_key(&start) {
                continue;
            }
            let mut length = 0;
            let mut current = start;
            while visited.insert(current, ()).is_none() {
                length += 1;
                match self.0.get(&current) {
                    Some(&next) => current = next,
                    None => break,
                }
            }
            order = lcm(order, length.max(1));
        }
        order
    }

    /// Renames every entry, dropping those whose source or target vanishes
    pub fn remap(&self, rename: impl Fn(Fact) -> Option<Fact>) -> Self {
        Self(
            self.0
                .iter()
                .filter_map(|(&from, &to)| Some((rename(from)?, rename(to)?)))
                .collect(),
        )
    }

    /// Keeps the entries whose source and target satisfy `exists`
    pub fn restrict(&self, exists: impl Fn(Fact) -> bool) -> Self {
        self.remap(|fact| exists(fact).then_some(fact))
    }
}

impl FromIterator<(Fact, Fact)> for SasGenerator {
    fn from_iter<I: IntoIterator<Item = (Fact, Fact)>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

fn gcd(a: usize, b: usize) -> usize {
    if b == 0 {
        a
    } else {
        gcd(b, a % b)
    }
}

fn lcm(a: usize, b: usize) -> usize {
    a / gcd(a, b) * b
}

/// Outcome of grounding lifted generators
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Grounding {
    /// Valid grounded generators
    pub generators: Vec<SasGenerator>,
    /// Generators discarded because they map a fact outside the task
    pub nonexistent: usize,
    /// Generators discarded because they ground to the identity
    pub identities: usize,
}

/// Grounds lifted generators against the fact dictionary
///
/// # Errors
/// Returns `EncodingPolicy` if an atom is encoded by several facts and
/// `NotAPermutation` if a grounded generator collapses facts.
pub fn ground_generators(lifted: &[LiftedGenerator], dictionary: &FactDictionary) -> Result<Grounding> {
    let mut grounding = Grounding::default();
    if lifted.is_empty() {
        return Ok(grounding);
    }
    if !dictionary.is_partial() {
        return Err(TranslateError::EncodingPolicy(
            "symmetries cannot be grounded under the full encoding".to_string(),
        ));
    }

    'generators: for generator in lifted {
        let mut mapping = BTreeMap::new();
        for (atom, facts) in dictionary.iter() {
            let mapped = generator.apply_to_atom(atom);
            match (facts, dictionary.lookup(&mapped)) {
                (&[from], Some(&[to])) => {
                    mapping.insert(from, to);
                }
                (_, None) => {
                    debug!(%atom, %mapped, "generator maps to nonexistent fact");
                    grounding.nonexistent += 1;
                    continue 'generators;
                }
                _ => {
                    return Err(TranslateError::EncodingPolicy(format!(
                        "{} or its image {} is encoded by several facts",
                        atom, mapped
                    )))
                }
            }
        }

        let grounded = SasGenerator::new(mapping);
        if !grounded.is_permutation() {
            return Err(TranslateError::NotAPermutation);
        }
        if grounded.is_identity() {
            debug!("generator grounds to the identity");
            grounding.identities += 1;
            continue;
        }
        grounding.generators.push(grounded);
    }

    info!(
        remaining = grounding.generators.len(),
        lifted = lifted.len(),
        "grounded generators"
    );
    Ok(grounding)
}

/// Drops identity and non-permutation generators
///
/// Returns the number of dropped generators.
pub fn filter_valid(generators: &mut Vec<SasGenerator>) -> usize {
    let before = generators.len();
    generators.retain(|generator| {
        let valid = !generator.is_identity() && generator.is_permutation();
        if !valid {
            debug!(entries = generator.len(), "dropping invalid generator");
        }
        valid
    });
    before - generators.len()
}

/// Counts generators per order
pub fn order_histogram(generators: &[SasGenerator]) -> BTreeMap<usize, usize> {
    let mut histogram = BTreeMap::new();
    for generator in generators {
        *histogram.entry(generator.order()).or_insert(0) += 1;
    }
    histogram
}
