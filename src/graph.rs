//! Vertex-colored structure graph
//!
//! Vertices are identified by a [`NodeKey`], a tagged node identity with one
//! variant per kind of task component. Colors are plain integers allocated by
//! a [`Palette`].

mod builder;

pub use builder::{GraphOptions, SymmetryGraph};

use std::collections::BTreeSet;
use std::fmt;

use rustc_hash::FxHashMap;

use crate::error::{Result, TranslateError};
use crate::task::is_parameter;

/// Owner of a condition literal
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ConditionOwner {
    /// Precondition of the `n`-th operator
    Operator(usize),
    /// Condition of effect `e` of operator `op`
    Effect(usize, usize),
    /// Body of the `n`-th axiom
    Axiom(usize),
}

/// Identity of a graph vertex
///
/// Literal and term chains use `position`: `0` for the head of a positive
/// literal or term, `-1` for the head of a negative literal, `i + 1` for the
/// `i`-th argument. `name` is the predicate, function or argument name.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum NodeKey {
    /// An object
    Constant(String),
    /// A predicate symbol, positive or negative
    Predicate {
        /// Predicate name
        name: String,
        /// Whether this is the negative node
        negated: bool,
    },
    /// A function symbol
    Function(String),
    /// A numeric constant
    Number(i64),
    /// Node of an initial-state literal or fluent; `entry` is `None` for the
    /// synthetic facts of constant cost functions
    Init {
        /// Index of the init entry
        entry: Option<usize>,
        /// Position in the chain
        position: i32,
        /// Symbol or argument name
        name: String,
    },
    /// Node of a goal literal
    Goal {
        /// Index of the goal literal
        entry: usize,
        /// Position in the chain
        position: i32,
        /// Symbol or argument name
        name: String,
    },
    /// Operator main node (named after the operator) or parameter node
    Operator {
        /// Index of the operator in name order
        op: usize,
        /// Operator or parameter name
        name: String,
    },
    /// Effect main node or effect parameter node
    Effect {
        /// Operator index
        op: usize,
        /// Effect index
        effect: usize,
        /// `e_<op>_<effect>` or parameter name
        name: String,
    },
    /// Node of a condition literal
    Condition {
        /// Operator, effect or axiom the condition belongs to
        owner: ConditionOwner,
        /// Index of the literal within its condition
        cond: usize,
        /// Position in the chain
        position: i32,
        /// Symbol or argument name
        name: String,
    },
    /// Node of the literal an effect changes
    EffectLiteral {
        /// Operator index
        op: usize,
        /// Effect index
        effect: usize,
        /// Position in the chain
        position: i32,
        /// Symbol or argument name
        name: String,
    },
    /// Node of an operator cost term
    Cost {
        /// Operator index
        op: usize,
        /// Position in the chain
        position: i32,
        /// Symbol or argument name
        name: String,
    },
    /// Axiom main node (named after the axiom) or parameter node
    Axiom {
        /// Index of the axiom in name order
        axiom: usize,
        /// Axiom or parameter name
        name: String,
    },
    /// Node of the literal an axiom derives
    AxiomLiteral {
        /// Axiom index
        axiom: usize,
        /// Position in the chain
        position: i32,
        /// Symbol or argument name
        name: String,
    },
}

/// Discriminant of a [`NodeKey`]
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum NodeKind {
    /// [`NodeKey::Constant`]
    Constant,
    /// [`NodeKey::Predicate`]
    Predicate,
    /// [`NodeKey::Function`]
    Function,
    /// [`NodeKey::Number`]
    Number,
    /// [`NodeKey::Init`]
    Init,
    /// [`NodeKey::Goal`]
    Goal,
    /// [`NodeKey::Operator`]
    Operator,
    /// [`NodeKey::Effect`]
    Effect,
    /// [`NodeKey::Condition`]
    Condition,
    /// [`NodeKey::EffectLiteral`]
    EffectLiteral,
    /// [`NodeKey::Cost`]
    Cost,
    /// [`NodeKey::Axiom`]
    Axiom,
    /// [`NodeKey::AxiomLiteral`]
    AxiomLiteral,
}

impl NodeKey {
    /// Returns the kind of this node
    pub fn kind(&self) -> NodeKind {
        match self {
            NodeKey::Constant(_) => NodeKind::Constant,
            NodeKey::Predicate { .. } => NodeKind::Predicate,
            NodeKey::Function(_) => NodeKind::Function,
            NodeKey::Number(_) => NodeKind::Number,
            NodeKey::Init { .. } => NodeKind::Init,
            NodeKey::Goal { .. } => NodeKind::Goal,
            NodeKey::Operator { .. } => NodeKind::Operator,
            NodeKey::Effect { .. } => NodeKind::Effect,
            NodeKey::Condition { .. } => NodeKind::Condition,
            NodeKey::EffectLiteral { .. } => NodeKind::EffectLiteral,
            NodeKey::Cost { .. } => NodeKind::Cost,
            NodeKey::Axiom { .. } => NodeKind::Axiom,
            NodeKey::AxiomLiteral { .. } => NodeKind::AxiomLiteral,
        }
    }

    /// Returns true for operator and axiom main nodes
    pub fn is_main_node(&self) -> bool {
        match self {
            NodeKey::Operator { name, .. } | NodeKey::Axiom { name, .. } => !is_parameter(name),
            _ => false,
        }
    }

    /// Returns the label used in dot output
    pub fn label(&self) -> String {
        match self {
            NodeKey::Constant(name) | NodeKey::Function(name) => name.clone(),
            NodeKey::Predicate { name, negated: true } => format!("not {}", name),
            NodeKey::Predicate { name, negated: false } => name.clone(),
            NodeKey::Number(value) => value.to_string(),
            NodeKey::Condition { position: -1, name, .. }
            | NodeKey::EffectLiteral { position: -1, name, .. }
            | NodeKey::AxiomLiteral { position: -1, name, .. } => format!("not {}", name),
            NodeKey::Init { name, .. }
            | NodeKey::Goal { name, .. }
            | NodeKey::Operator { name, .. }
            | NodeKey::Effect { name, .. }
            | NodeKey::Condition { name, .. }
            | NodeKey::EffectLiteral { name, .. }
            | NodeKey::Cost { name, .. }
            | NodeKey::Axiom { name, .. }
            | NodeKey::AxiomLiteral { name, .. } => name.clone(),
        }
    }
}

impl fmt::Display for NodeKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}", self)
    }
}

/// Vertex color
pub type Color = u32;

/// Color allocation
///
/// Fixed colors come first, then one block of predicate colors, one block of
/// function colors (by arity) and finally one color per distinct number.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Palette {
    predicate_slots: u32,
    function_slots: u32,
}

impl Palette {
    /// Objects
    pub const CONSTANT: Color = 0;
    /// Initial-state chains
    pub const INIT: Color = 1;
    /// Goal chains
    pub const GOAL: Color = 2;
    /// Operator main and parameter nodes
    pub const OPERATOR: Color = 3;
    /// Condition chains
    pub const CONDITION: Color = 4;
    /// Effect main and parameter nodes
    pub const EFFECT: Color = 5;
    /// Effect literal chains
    pub const EFFECT_LITERAL: Color = 6;
    /// Cost chains
    pub const COST: Color = 7;
    /// Axiom main and parameter nodes
    pub const AXIOM: Color = 8;
    /// First predicate color
    pub const PREDICATE_BASE: Color = 9;

    /// Creates a palette with `predicate_slots` predicate colors and
    /// `max_function_arity + 1` function colors
    pub fn new(predicate_slots: usize, max_function_arity: usize) -> Self {
        Self {
            predicate_slots: predicate_slots as u32,
            function_slots: max_function_arity as u32 + 1,
        }
    }

    /// Returns the color of predicate slot `slot` (the arity, or a per-symbol
    /// index when only objects may be permuted)
    pub fn predicate(&self, slot: usize) -> Color {
        Self::PREDICATE_BASE + slot as Color
    }

    /// Returns the first function color
    pub fn function_base(&self) -> Color {
        Self::PREDICATE_BASE + self.predicate_slots
    }

    /// Returns the color of functions of the given arity
    pub fn function(&self, arity: usize) -> Color {
        self.function_base() + arity as Color
    }

    /// Returns the first number color
    pub fn number_base(&self) -> Color {
        self.function_base() + self.function_slots
    }

    /// Returns the color of the `k`-th distinct number
    pub fn number(&self, k: usize) -> Color {
        self.number_base() + k as Color
    }

    /// Returns the number of predicate colors
    pub fn predicate_slots(&self) -> usize {
        self.predicate_slots as usize
    }

    /// Returns the number of function colors
    pub fn function_slots(&self) -> usize {
        self.function_slots as usize
    }
}

#[derive(Clone, Debug)]
struct Vertex {
    key: NodeKey,
    color: Color,
    excluded: bool,
}

/// A vertex-colored digraph without self-loops
///
/// Vertex ids are assigned in insertion order.
#[derive(Clone, Debug, Default)]
pub struct ColoredGraph {
    vertices: Vec<Vertex>,
    index: FxHashMap<NodeKey, usize>,
    edges: BTreeSet<(usize, usize)>,
}

impl ColoredGraph {
    /// Creates an empty graph
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a vertex and returns its id
    ///
    /// Re-adding an existing vertex with the same color returns its id; an
    /// excluded re-add marks the vertex excluded.
    ///
    /// # Errors
    /// Returns `InvalidArgument` if the vertex exists with another color.
    pub fn add_vertex(&mut self, key: NodeKey, color: Color, excluded: bool) -> Result<usize> {
        if let Some(&id) = self.index.get(&key) {
            let vertex = &mut self.vertices[id];
            if vertex.color != color {
                return Err(TranslateError::InvalidArgument(format!(
                    "vertex {} re-added with color {} (has {})",
                    key, color, vertex.color
                )));
            }
            vertex.excluded |= excluded;
            return Ok(id);
        }
        let id = self.vertices.len();
        self.index.insert(key.clone(), id);
        self.vertices.push(Vertex { key, color, excluded });
        Ok(id)
    }

    /// Adds an edge between two existing vertices
    ///
    /// # Errors
    /// Returns `InvalidArgument` for a self-loop or an unknown vertex.
    pub fn add_edge(&mut self, from: &NodeKey, to: &NodeKey) -> Result<()> {
        let from_id = self.require(from)?;
        let to_id = self.require(to)?;
        if from_id == to_id {
            return Err(TranslateError::InvalidArgument(format!("self-loop on {}", from)));
        }
        self.edges.insert((from_id, to_id));
        Ok(())
    }

    fn require(&self, key: &NodeKey) -> Result<usize> {
        self.id(key)
            .ok_or_else(|| TranslateError::InvalidArgument(format!("unknown vertex {}", key)))
    }

    /// Returns the id of a vertex
    pub fn id(&self, key: &NodeKey) -> Option<usize> {
        self.index.get(key).copied()
    }

    /// Returns the key of a vertex
    pub fn key(&self, id: usize) -> &NodeKey {
        &self.vertices[id].key
    }

    /// Returns the color of a vertex
    pub fn color(&self, id: usize) -> Color {
        self.vertices[id].color
    }

    /// Returns true if the vertex belongs to an equality literal
    pub fn is_excluded(&self, id: usize) -> bool {
        self.vertices[id].excluded
    }

    /// Returns the number of vertices
    pub fn num_vertices(&self) -> usize {
        self.vertices.len()
    }

    /// Returns the number of edges
    pub fn num_edges(&self) -> usize {
        self.edges.len()
    }

    /// Returns the colors of all vertices, indexed by id
    pub fn colors(&self) -> Vec<Color> {
        self.vertices.iter().map(|v| v.color).collect()
    }

    /// Iterates over all edges in ascending order
    pub fn edges(&self) -> impl Iterator<Item = (usize, usize)> + '_ {
        self.edges.iter().copied()
    }

    /// Returns true if the edge exists
    pub fn has_edge(&self, from: usize, to: usize) -> bool {
        self.edges.contains(&(from, to))
    }

    /// Iterates over the successors of a vertex in ascending order
    pub fn successors(&self, id: usize) -> impl Iterator<Item = usize> + '_ {
        self.edges.range((id, 0)..=(id, usize::MAX)).map(|&(_, to)| to)
    }

    /// Returns true if `permutation` maps the graph onto itself
    pub fn is_automorphism(&self, permutation: &[usize]) -> bool {
        let n = self.num_vertices();
        if permutation.len() != n {
            return false;
        }
        let mut seen = vec![false; n];
        for (v, &image) in permutation.iter().enumerate() {
            if image >= n || seen[image] || self.color(v) != self.color(image) {
                return false;
            }
            seen[image] = true;
        }
        self.edges
            .iter()
            .all(|&(from, to)| self.has_edge(permutation[from], permutation[to]))
    }
}
