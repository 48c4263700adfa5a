//! Fact-to-variable dictionary
//!
//! Assigns every grouped atom its finite-domain `(var, val)` pairs. Variable
//! `i` gets one value per atom of group `i` plus a trailing none-of-those
//! value.

use rustc_hash::FxHashMap;

use crate::error::{Result, TranslateError};
use crate::task::{Atom, Fact};

/// Maps atoms to the finite-domain facts encoding them
#[derive(Debug, Clone, Default)]
pub struct FactDictionary {
    ranges: Vec<usize>,
    pairs: FxHashMap<Atom, Vec<Fact>>,
}

impl FactDictionary {
    /// Builds the dictionary for the given groups
    ///
    /// With `assert_partial`, every atom must occur in exactly one group.
    ///
    /// # Errors
    /// Returns `EncodingPolicy` if `assert_partial` holds and an atom occurs in
    /// several groups.
    pub fn from_groups(groups: &[Vec<Atom>], assert_partial: bool) -> Result<Self> {
        let mut pairs: FxHashMap<Atom, Vec<Fact>> = FxHashMap::default();
        for (var, group) in groups.iter().enumerate() {
            for (val, atom) in group.iter().enumerate() {
                pairs.entry(atom.clone()).or_default().push((var, val));
            }
        }

        if assert_partial {
            if let Some((atom, facts)) = pairs.iter().find(|(_, facts)| facts.len() != 1) {
                return Err(TranslateError::EncodingPolicy(format!(
                    "{} is encoded by {} facts under the partial encoding",
                    atom,
                    facts.len()
                )));
            }
        }

        Ok(Self {
            ranges: groups.iter().map(|group| group.len() + 1).collect(),
            pairs,
        })
    }

    /// Returns the range of every variable
    pub fn ranges(&self) -> &[usize] {
        &self.ranges
    }

    /// Returns the range of a variable
    pub fn range(&self, var: usize) -> usize {
        self.ranges[var]
    }

    /// Returns the none-of-those value of a variable
    pub fn none_of_those(&self, var: usize) -> usize {
        self.ranges[var] - 1
    }

    /// Returns the facts encoding an atom (empty for static atoms)
    pub fn get(&self, atom: &Atom) -> &[Fact] {
        self.pairs.get(atom).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Returns the facts encoding an atom, or `None` if it has no entry
    pub fn lookup(&self, atom: &Atom) -> Option<&[Fact]> {
        self.pairs.get(atom).map(Vec::as_slice)
    }

    /// Returns the single fact encoding an atom
    ///
    /// # Errors
    /// Returns `EncodingPolicy` if the atom has no entry or several.
    pub fn single(&self, atom: &Atom) -> Result<Fact> {
        match self.get(atom) {
            [fact] => Ok(*fact),
            facts => Err(TranslateError::EncodingPolicy(format!(
                "expected exactly one fact for {}, found {}",
                atom,
                facts.len()
            ))),
        }
    }

    /// Iterates over all atoms and their facts
    pub fn iter(&self) -> impl Iterator<Item = (&Atom, &[Fact])> {
        self.pairs.iter().map(|(atom, facts)| (atom, facts.as_slice()))
    }

    /// Returns true if every atom is encoded by exactly one fact
    pub fn is_partial(&self) -> bool {
        self.pairs.values().all(|facts| facts.len() == 1)
    }

    /// Returns the number of variables
    pub fn num_variables(&self) -> usize {
        self.ranges.len()
    }

    /// Returns the number of atoms with an entry
    pub fn len(&self) -> usize {
        self.pairs.len()
    }

    /// Returns true if no atom has an entry
    pub fn is_empty(&self) -> bool {
        self.pairs.is_empty()
    }
}
