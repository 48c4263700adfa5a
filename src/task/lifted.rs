//! Lifted (normalized PDDL) task
//!
//! Produced by the parser and normalizer, consumed by the symmetry graph
//! builder. Conditions are conjunctions of literals, effects are conditional
//! single-literal effects with their own parameters.

use super::{Atom, Literal};

/// Name of the root type every object belongs to
pub const OBJECT_TYPE: &str = "object";

/// Name of the implicit action cost function
pub const TOTAL_COST: &str = "total-cost";

/// A declared type with its optional base type
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TypeDecl {
    /// Type name
    pub name: String,
    /// Base type (`None` only for `object`)
    pub basetype: Option<String>,
}

impl TypeDecl {
    /// Creates a type deriving from `basetype`
    pub fn new(name: impl Into<String>, basetype: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            basetype: Some(basetype.into()),
        }
    }

    /// Creates the root `object` type
    pub fn object() -> Self {
        Self {
            name: OBJECT_TYPE.to_string(),
            basetype: None,
        }
    }

    /// Returns the name of the unary predicate encoding membership in this type
    pub fn predicate_name(&self) -> String {
        type_predicate_name(&self.name)
    }
}

/// Returns the name of the unary predicate encoding membership in `type_name`
pub fn type_predicate_name(type_name: &str) -> String {
    format!("type@{}", type_name)
}

/// An object with its type
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TypedObject {
    /// Object name
    pub name: String,
    /// Type name
    pub type_name: String,
}

impl TypedObject {
    /// Creates a typed object
    pub fn new(name: impl Into<String>, type_name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            type_name: type_name.into(),
        }
    }
}

/// A typed parameter (`?x - block`)
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Parameter {
    /// Parameter name, including the leading `?`
    pub name: String,
    /// Type name
    pub type_name: String,
}

impl Parameter {
    /// Creates a typed parameter
    pub fn new(name: impl Into<String>, type_name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            type_name: type_name.into(),
        }
    }
}

/// A predicate declaration
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PredicateDecl {
    /// Predicate name
    pub name: String,
    /// Declared arguments
    pub arguments: Vec<Parameter>,
}

impl PredicateDecl {
    /// Creates a predicate with untyped arguments of the given arity
    pub fn new(name: impl Into<String>, arity: usize) -> Self {
        Self {
            name: name.into(),
            arguments: (0..arity)
                .map(|i| Parameter::new(format!("?a{}", i), OBJECT_TYPE))
                .collect(),
        }
    }

    /// Returns the arity
    pub fn arity(&self) -> usize {
        self.arguments.len()
    }
}

/// A numeric function declaration
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FunctionDecl {
    /// Function name
    pub name: String,
    /// Declared arguments
    pub arguments: Vec<Parameter>,
}

impl FunctionDecl {
    /// Creates a function with untyped arguments of the given arity
    pub fn new(name: impl Into<String>, arity: usize) -> Self {
        Self {
            name: name.into(),
            arguments: (0..arity)
                .map(|i| Parameter::new(format!("?a{}", i), OBJECT_TYPE))
                .collect(),
        }
    }

    /// Returns the arity
    pub fn arity(&self) -> usize {
        self.arguments.len()
    }
}

/// A function symbol applied to arguments, e.g. `(road-length ?from ?to)`
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PrimitiveNumericExpression {
    /// Function name
    pub symbol: String,
    /// Arguments (objects or parameters)
    pub args: Vec<String>,
}

impl PrimitiveNumericExpression {
    /// Creates a primitive numeric expression
    pub fn new<I, S>(symbol: impl Into<String>, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            symbol: symbol.into(),
            args: args.into_iter().map(Into::into).collect(),
        }
    }
}

/// An entry of the initial state
///
/// The derived order (atoms before assignments, then lexicographic) is the
/// order in which init entries enter the symmetry graph.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord)]
pub enum InitEntry {
    /// A true atom
    Atom(Atom),
    /// A numeric fluent assignment `(= fluent value)`
    Assign {
        /// Assigned fluent
        fluent: PrimitiveNumericExpression,
        /// Assigned value
        value: i64,
    },
}

/// An action cost expression
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum CostExpression {
    /// A constant cost
    Constant(i64),
    /// A cost read from a numeric fluent
    Function(PrimitiveNumericExpression),
}

/// A conditional effect `forall params: condition -> literal`
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Effect {
    /// Universally quantified effect parameters
    pub parameters: Vec<Parameter>,
    /// Effect condition (empty = unconditional)
    pub condition: Vec<Literal>,
    /// Affected literal
    pub literal: Literal,
}

impl Effect {
    /// Creates an unconditional effect without parameters
    pub fn simple(literal: Literal) -> Self {
        Self {
            parameters: Vec::new(),
            condition: Vec::new(),
            literal,
        }
    }
}

/// A lifted action schema
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Action {
    /// Action name
    pub name: String,
    /// Parameters
    pub parameters: Vec<Parameter>,
    /// Precondition
    pub precondition: Vec<Literal>,
    /// Conditional effects
    pub effects: Vec<Effect>,
    /// Cost expression (`None` = unit cost)
    pub cost: Option<CostExpression>,
}

/// A lifted derivation rule `condition -> effect`
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LiftedAxiom {
    /// Rule name
    pub name: String,
    /// Parameters
    pub parameters: Vec<Parameter>,
    /// Body
    pub condition: Vec<Literal>,
    /// Derived literal
    pub effect: Literal,
}

/// A normalized lifted planning task
#[derive(Clone, Debug, Default)]
pub struct LiftedTask {
    /// Declared types (including `object`)
    pub types: Vec<TypeDecl>,
    /// Objects
    pub objects: Vec<TypedObject>,
    /// Predicate declarations (not including type predicates)
    pub predicates: Vec<PredicateDecl>,
    /// Numeric function declarations
    pub functions: Vec<FunctionDecl>,
    /// Initial state
    pub init: Vec<InitEntry>,
    /// Goal conjunction
    pub goal: Vec<Literal>,
    /// Action schemas
    pub actions: Vec<Action>,
    /// Derivation rules
    pub axioms: Vec<LiftedAxiom>,
}

impl LiftedTask {
    /// Returns the declaration of the named type
    pub fn type_decl(&self, name: &str) -> Option<&TypeDecl> {
        self.types.iter().find(|t| t.name == name)
    }

    /// Returns the named type and all of its ancestors except `object`
    ///
    /// Returns `None` if some type on the chain is not declared. A cyclic
    /// hierarchy is cut after visiting every declared type once.
    pub fn type_chain(&self, name: &str) -> Option<Vec<&TypeDecl>> {
        let mut chain = Vec::new();
        let mut current = name;
        while current != OBJECT_TYPE {
            if chain.len() > self.types.len() {
                break;
            }
            let decl = self.type_decl(current)?;
            chain.push(decl);
            match &decl.basetype {
                Some(base) => current = base,
                None => break,
            }
        }
        Some(chain)
    }

    /// Largest predicate arity, counting type predicates as unary
    pub fn max_predicate_arity(&self) -> usize {
        let type_arity = usize::from(self.types.len() > 1);
        self.predicates
            .iter()
            .map(PredicateDecl::arity)
            .chain(std::iter::once(type_arity))
            .max()
            .unwrap_or(0)
    }

    /// Largest function arity (0 without functions)
    pub fn max_function_arity(&self) -> usize {
        self.functions.iter().map(FunctionDecl::arity).max().unwrap_or(0)
    }
}
