//! Planning task data model
//!
//! Atoms and literals are shared by the lifted task (where arguments may be
//! parameters such as `?x`) and the grounded task (where every argument is an
//! object name).

pub mod ground;
pub mod lifted;

pub use ground::{ConditionalEffect, FactGrouping, GroundTask, PropositionalAction, PropositionalAxiom};
pub use lifted::{
    Action, CostExpression, Effect, FunctionDecl, InitEntry, LiftedAxiom, LiftedTask, Parameter,
    PredicateDecl, PrimitiveNumericExpression, TypeDecl, TypedObject,
};

use std::fmt;

/// A finite-domain fact: `(variable, value)`
pub type Fact = (usize, usize);

/// Returns true if a literal argument is a parameter rather than an object
pub fn is_parameter(arg: &str) -> bool {
    arg.starts_with('?')
}

/// A predicate applied to an ordered list of arguments
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Atom {
    predicate: String,
    args: Vec<String>,
}

impl Atom {
    /// Creates an atom from a predicate name and its arguments
    pub fn new<I, S>(predicate: impl Into<String>, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            predicate: predicate.into(),
            args: args.into_iter().map(Into::into).collect(),
        }
    }

    /// Creates an atom without arguments
    pub fn nullary(predicate: impl Into<String>) -> Self {
        Self {
            predicate: predicate.into(),
            args: Vec::new(),
        }
    }

    /// Returns the predicate name
    pub fn predicate(&self) -> &str {
        &self.predicate
    }

    /// Returns the arguments
    pub fn args(&self) -> &[String] {
        &self.args
    }

    /// Returns the number of arguments
    pub fn arity(&self) -> usize {
        self.args.len()
    }
}

impl fmt::Debug for Atom {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}({})", self.predicate, self.args.join(", "))
    }
}

impl fmt::Display for Atom {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Atom {:?}", self)
    }
}

/// An atom with a polarity
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Literal {
    atom: Atom,
    negated: bool,
}

impl Literal {
    /// Creates a positive literal
    pub fn positive(atom: Atom) -> Self {
        Self { atom, negated: false }
    }

    /// Creates a negative literal
    pub fn negative(atom: Atom) -> Self {
        Self { atom, negated: true }
    }

    /// Returns the underlying (positive) atom
    pub fn atom(&self) -> &Atom {
        &self.atom
    }

    /// Returns true if this literal is negated
    pub fn is_negated(&self) -> bool {
        self.negated
    }

    /// Returns the literal with the opposite polarity
    pub fn negate(&self) -> Self {
        Self {
            atom: self.atom.clone(),
            negated: !self.negated,
        }
    }

    /// Returns the predicate name
    pub fn predicate(&self) -> &str {
        self.atom.predicate()
    }

    /// Returns the arguments
    pub fn args(&self) -> &[String] {
        self.atom.args()
    }
}

impl From<Atom> for Literal {
    fn from(atom: Atom) -> Self {
        Literal::positive(atom)
    }
}

impl fmt::Debug for Literal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.negated {
            write!(f, "not {:?}", self.atom)
        } else {
            write!(f, "{:?}", self.atom)
        }
    }
}

impl fmt::Display for Literal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.negated {
            write!(f, "NegatedAtom {:?}", self.atom)
        } else {
            write!(f, "Atom {:?}", self.atom)
        }
    }
}
