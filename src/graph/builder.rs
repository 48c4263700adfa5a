//! Structure graph of a lifted task
//!
//! Automorphisms of the graph built here are structural symmetries of the
//! task: every literal and term becomes a chain of argument nodes hanging off
//! its predicate or function node, every argument node is linked to the object
//! or parameter it refers to.

use std::collections::BTreeMap;
use std::io::Write;

use rustc_hash::FxHashMap;
use tracing::debug;

use super::{Color, ColoredGraph, ConditionOwner, NodeKey, Palette};
use crate::error::{Result, TranslateError};
use crate::task::lifted::{type_predicate_name, OBJECT_TYPE, TOTAL_COST};
use crate::task::{
    is_parameter, Atom, CostExpression, InitEntry, LiftedTask, Literal, Parameter, PrimitiveNumericExpression,
};

/// Name of the equality predicate
const EQUALITY: &str = "=";

/// Options of graph construction
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct GraphOptions {
    /// Give every predicate its own color so only objects can be permuted
    pub only_object_symmetries: bool,
    /// Include the initial state, so symmetries must preserve it
    pub stabilize_initial_state: bool,
}

impl Default for GraphOptions {
    fn default() -> Self {
        Self {
            only_object_symmetries: false,
            stabilize_initial_state: true,
        }
    }
}

type ParameterScope = FxHashMap<String, NodeKey>;

/// The colored structure graph of a lifted task
#[derive(Clone, Debug)]
pub struct SymmetryGraph {
    graph: ColoredGraph,
    palette: Palette,
    numbers: BTreeMap<i64, NodeKey>,
    constant_functions: BTreeMap<i64, (NodeKey, String)>,
}

impl SymmetryGraph {
    /// Builds the structure graph of `task`
    ///
    /// Init entries and operators are sorted before insertion, so equal
    /// tasks give equal graphs.
    ///
    /// # Errors
    /// Returns `InvalidArgument` if the task refers to undeclared objects,
    /// parameters, predicates, functions or types.
    pub fn build(task: &LiftedTask, options: &GraphOptions) -> Result<Self> {
        let predicate_slots = if options.only_object_symmetries {
            task.predicates.len() + task.types.iter().filter(|t| t.name != OBJECT_TYPE).count()
        } else {
            task.max_predicate_arity() + 1
        };
        let mut builder = Self {
            graph: ColoredGraph::new(),
            palette: Palette::new(predicate_slots, task.max_function_arity()),
            numbers: BTreeMap::new(),
            constant_functions: BTreeMap::new(),
        };

        builder.add_objects(task)?;
        builder.add_predicates(task, options)?;
        builder.add_functions(task)?;
        if options.stabilize_initial_state {
            builder.add_init(task)?;
        }
        builder.add_goal(task)?;
        builder.add_operators(task)?;
        builder.add_axioms(task)?;

        debug!(
            vertices = builder.graph.num_vertices(),
            edges = builder.graph.num_edges(),
            "built symmetry graph"
        );
        Ok(builder)
    }

    /// Returns the colored graph
    pub fn graph(&self) -> &ColoredGraph {
        &self.graph
    }

    /// Returns the color palette
    pub fn palette(&self) -> &Palette {
        &self.palette
    }

    fn add_objects(&mut self, task: &LiftedTask) -> Result<()> {
        for object in &task.objects {
            self.graph
                .add_vertex(NodeKey::Constant(object.name.clone()), Palette::CONSTANT, false)?;
        }
        Ok(())
    }

    fn add_predicates(&mut self, task: &LiftedTask, options: &GraphOptions) -> Result<()> {
        let mut slot = 0;
        for predicate in &task.predicates {
            let color = if options.only_object_symmetries {
                slot += 1;
                self.palette.predicate(slot - 1)
            } else {
                self.palette.predicate(predicate.arity())
            };
            self.add_predicate(&predicate.name, color, false)?;
        }
        for decl in task.types.iter().filter(|t| t.name != OBJECT_TYPE) {
            let color = if options.only_object_symmetries {
                slot += 1;
                self.palette.predicate(slot - 1)
            } else {
                self.palette.predicate(1)
            };
            self.add_predicate(&decl.predicate_name(), color, true)?;
        }
        Ok(())
    }

    fn add_predicate(&mut self, name: &str, color: Color, only_positive: bool) -> Result<()> {
        let excluded = name == EQUALITY;
        let positive = NodeKey::Predicate {
            name: name.to_string(),
            negated: false,
        };
        self.graph.add_vertex(positive.clone(), color, excluded)?;
        if !only_positive {
            let negative = NodeKey::Predicate {
                name: name.to_string(),
                negated: true,
            };
            self.graph.add_vertex(negative.clone(), color, excluded)?;
            self.graph.add_edge(&negative, &positive)?;
            self.graph.add_edge(&positive, &negative)?;
        }
        Ok(())
    }

    fn add_functions(&mut self, task: &LiftedTask) -> Result<()> {
        for function in task.functions.iter().filter(|f| f.name != TOTAL_COST) {
            let color = self.palette.function(function.arity());
            self.graph
                .add_vertex(NodeKey::Function(function.name.clone()), color, false)?;
        }
        Ok(())
    }

    fn number_node(&mut self, value: i64) -> Result<NodeKey> {
        if let Some(node) = self.numbers.get(&value) {
            return Ok(node.clone());
        }
        let node = NodeKey::Number(value);
        let color = self.palette.number(self.numbers.len());
        self.graph.add_vertex(node.clone(), color, false)?;
        self.numbers.insert(value, node.clone());
        Ok(node)
    }

    /// Adds the chain of a literal and returns its head
    fn add_literal(
        &mut self,
        make: impl Fn(i32, &str) -> NodeKey,
        color: Color,
        literal: &Literal,
        scopes: &[&ParameterScope],
    ) -> Result<NodeKey> {
        let predicate = NodeKey::Predicate {
            name: literal.predicate().to_string(),
            negated: literal.is_negated(),
        };
        let predicate_id = self.graph.id(&predicate).ok_or_else(|| {
            TranslateError::InvalidArgument(format!("undeclared predicate {}", literal.predicate()))
        })?;
        let excluded = self.graph.is_excluded(predicate_id);

        let head = make(if literal.is_negated() { -1 } else { 0 }, literal.predicate());
        self.graph.add_vertex(head.clone(), color, excluded)?;
        self.graph.add_edge(&predicate, &head)?;
        self.add_arguments(&make, color, excluded, head.clone(), literal.args(), scopes)?;
        Ok(head)
    }

    /// Adds the chain of a numeric term and returns its head and tail
    fn add_term(
        &mut self,
        make: impl Fn(i32, &str) -> NodeKey,
        color: Color,
        term: &PrimitiveNumericExpression,
        scopes: &[&ParameterScope],
    ) -> Result<(NodeKey, NodeKey)> {
        let function = NodeKey::Function(term.symbol.clone());
        let head = make(0, &term.symbol);
        self.graph.add_vertex(head.clone(), color, false)?;
        self.graph.add_edge(&function, &head)?;
        let tail = self.add_arguments(&make, color, false, head.clone(), &term.args, scopes)?;
        Ok((head, tail))
    }

    fn add_arguments(
        &mut self,
        make: &impl Fn(i32, &str) -> NodeKey,
        color: Color,
        excluded: bool,
        head: NodeKey,
        args: &[String],
        scopes: &[&ParameterScope],
    ) -> Result<NodeKey> {
        let mut previous = head;
        for (i, arg) in args.iter().enumerate() {
            let node = make(i as i32 + 1, arg);
            self.graph.add_vertex(node.clone(), color, excluded)?;
            self.graph.add_edge(&previous, &node)?;
            let source = if is_parameter(arg) {
                scopes
                    .iter()
                    .find_map(|scope| scope.get(arg))
                    .cloned()
                    .ok_or_else(|| TranslateError::InvalidArgument(format!("unbound parameter {}", arg)))?
            } else {
                NodeKey::Constant(arg.clone())
            };
            self.graph.add_edge(&source, &node)?;
            previous = node;
        }
        Ok(previous)
    }

    fn add_init(&mut self, task: &LiftedTask) -> Result<()> {
        let mut init: Vec<&InitEntry> = task.init.iter().collect();
        init.sort();
        for (entry, item) in init.iter().enumerate() {
            let make = |position: i32, name: &str| NodeKey::Init {
                entry: Some(entry),
                position,
                name: name.to_string(),
            };
            match item {
                InitEntry::Atom(atom) => {
                    self.add_literal(make, Palette::INIT, &Literal::positive(atom.clone()), &[])?;
                }
                InitEntry::Assign { fluent, .. } if fluent.symbol == TOTAL_COST => {}
                InitEntry::Assign { fluent, value } => {
                    let (_, tail) = self.add_term(make, Palette::INIT, fluent, &[])?;
                    let number = self.number_node(*value)?;
                    self.graph.add_edge(&tail, &number)?;
                }
            }
        }

        let mut entry = init.len();
        for object in &task.objects {
            let chain = task.type_chain(&object.type_name).ok_or_else(|| {
                TranslateError::InvalidArgument(format!("undeclared type {} of {}", object.type_name, object.name))
            })?;
            for decl in chain {
                let literal = Literal::positive(Atom::new(decl.predicate_name(), [object.name.as_str()]));
                let make = |position: i32, name: &str| NodeKey::Init {
                    entry: Some(entry),
                    position,
                    name: name.to_string(),
                };
                self.add_literal(make, Palette::INIT, &literal, &[])?;
                entry += 1;
            }
        }
        Ok(())
    }

    fn add_goal(&mut self, task: &LiftedTask) -> Result<()> {
        for (entry, literal) in task.goal.iter().enumerate() {
            let make = |position: i32, name: &str| NodeKey::Goal {
                entry,
                position,
                name: name.to_string(),
            };
            self.add_literal(make, Palette::GOAL, literal, &[])?;
        }
        Ok(())
    }

    /// Adds a main node with one node per parameter
    fn add_structure(
        &mut self,
        make: impl Fn(&str) -> NodeKey,
        name: &str,
        color: Color,
        parameters: &[Parameter],
    ) -> Result<(NodeKey, ParameterScope)> {
        let main = make(name);
        self.graph.add_vertex(main.clone(), color, false)?;
        let mut scope = ParameterScope::default();
        for parameter in parameters {
            let node = make(&parameter.name);
            self.graph.add_vertex(node.clone(), color, false)?;
            self.graph.add_edge(&main, &node)?;
            scope.insert(parameter.name.clone(), node);
        }
        Ok((main, scope))
    }

    /// Adds condition chains, including the type conditions of `parameters`
    fn add_conditions(
        &mut self,
        owner: ConditionOwner,
        base: &NodeKey,
        condition: &[Literal],
        parameters: &[Parameter],
        scopes: &[&ParameterScope],
    ) -> Result<()> {
        let type_conditions = parameters
            .iter()
            .filter(|p| p.type_name != OBJECT_TYPE)
            .map(|p| Literal::positive(Atom::new(type_predicate_name(&p.type_name), [p.name.as_str()])));
        let literals: Vec<Literal> = condition.iter().cloned().chain(type_conditions).collect();
        for (cond, literal) in literals.iter().enumerate() {
            let make = |position: i32, name: &str| NodeKey::Condition {
                owner,
                cond,
                position,
                name: name.to_string(),
            };
            let head = self.add_literal(make, Palette::CONDITION, literal, scopes)?;
            self.graph.add_edge(base, &head)?;
        }
        Ok(())
    }

    fn add_operators(&mut self, task: &LiftedTask) -> Result<()> {
        let mut actions: Vec<_> = task.actions.iter().collect();
        actions.sort_by(|a, b| a.name.cmp(&b.name));
        for (op, action) in actions.into_iter().enumerate() {
            let (op_node, op_scope) = self.add_structure(
                |name| NodeKey::Operator {
                    op,
                    name: name.to_string(),
                },
                &action.name,
                Palette::OPERATOR,
                &action.parameters,
            )?;
            self.add_conditions(
                ConditionOwner::Operator(op),
                &op_node,
                &action.precondition,
                &action.parameters,
                &[&op_scope],
            )?;

            for (effect, eff) in action.effects.iter().enumerate() {
                let (eff_node, eff_scope) = self.add_structure(
                    |name| NodeKey::Effect {
                        op,
                        effect,
                        name: name.to_string(),
                    },
                    &format!("e_{}_{}", op, effect),
                    Palette::EFFECT,
                    &eff.parameters,
                )?;
                self.graph.add_edge(&op_node, &eff_node)?;
                self.add_conditions(
                    ConditionOwner::Effect(op, effect),
                    &eff_node,
                    &eff.condition,
                    &eff.parameters,
                    &[&eff_scope, &op_scope],
                )?;
                let make = |position: i32, name: &str| NodeKey::EffectLiteral {
                    op,
                    effect,
                    position,
                    name: name.to_string(),
                };
                let head = self.add_literal(make, Palette::EFFECT_LITERAL, &eff.literal, &[&eff_scope, &op_scope])?;
                self.graph.add_edge(&eff_node, &head)?;
            }

            if let Some(cost) = &action.cost {
                let cost_node = self.add_cost(op, cost, &op_scope)?;
                self.graph.add_edge(&op_node, &cost_node)?;
            }
        }
        Ok(())
    }

    fn add_cost(&mut self, op: usize, cost: &CostExpression, scope: &ParameterScope) -> Result<NodeKey> {
        let make = |position: i32, name: &str| NodeKey::Cost {
            op,
            position,
            name: name.to_string(),
        };
        match cost {
            CostExpression::Function(term) => {
                let (head, _) = self.add_term(make, Palette::COST, term, &[scope])?;
                Ok(head)
            }
            CostExpression::Constant(value) => {
                let number = self.number_node(*value)?;
                if !self.constant_functions.contains_key(value) {
                    // a constant cost is read from a synthetic nullary
                    // function whose initial value is the constant
                    let name = format!("const@{}", value);
                    let symbol = NodeKey::Function(name.clone());
                    self.graph.add_vertex(symbol.clone(), self.palette.function(0), false)?;
                    let init = NodeKey::Init {
                        entry: None,
                        position: 0,
                        name: name.clone(),
                    };
                    self.graph.add_vertex(init.clone(), Palette::INIT, false)?;
                    self.graph.add_edge(&symbol, &init)?;
                    self.graph.add_edge(&init, &number)?;
                    self.constant_functions.insert(*value, (symbol, name));
                }
                let (symbol, name) = self.constant_functions[value].clone();
                let cost_node = make(0, &name);
                self.graph.add_vertex(cost_node.clone(), Palette::COST, false)?;
                self.graph.add_edge(&symbol, &cost_node)?;
                self.graph.add_edge(&cost_node, &number)?;
                Ok(cost_node)
            }
        }
    }

    fn add_axioms(&mut self, task: &LiftedTask) -> Result<()> {
        let mut axioms: Vec<_> = task.axioms.iter().collect();
        axioms.sort_by(|a, b| a.name.cmp(&b.name));
        for (axiom, rule) in axioms.into_iter().enumerate() {
            let (main, scope) = self.add_structure(
                |name| NodeKey::Axiom {
                    axiom,
                    name: name.to_string(),
                },
                &rule.name,
                Palette::AXIOM,
                &rule.parameters,
            )?;
            self.add_conditions(
                ConditionOwner::Axiom(axiom),
                &main,
                &rule.condition,
                &rule.parameters,
                &[&scope],
            )?;
            let make = |position: i32, name: &str| NodeKey::AxiomLiteral {
                axiom,
                position,
                name: name.to_string(),
            };
            let head = self.add_literal(make, Palette::EFFECT_LITERAL, &rule.effect, &[&scope])?;
            self.graph.add_edge(&main, &head)?;
        }
        Ok(())
    }

    /// Writes the graph in Graphviz dot format
    ///
    /// With `hide_excluded`, equality vertices and their edges are left out and
    /// a warning vertex is added.
    ///
    /// # Errors
    /// Returns `Io` if writing fails.
    pub fn write_dot<W: Write>(&self, out: &mut W, hide_excluded: bool) -> Result<()> {
        let graph = &self.graph;
        writeln!(out, "digraph g {{")?;
        if hide_excluded {
            writeln!(
                out,
                "\"extra\" [style=filled, fillcolor=red, label=\"Warning: hidden =-predicates\"];"
            )?;
        }
        let visible = |id: usize| !(hide_excluded && graph.is_excluded(id));
        for id in (0..graph.num_vertices()).filter(|&id| visible(id)) {
            let (scheme, color) = self.dot_color(graph.color(id));
            writeln!(
                out,
                "\"n{}\" [style=filled, label=\"{}\", colorscheme={}, fillcolor={}];",
                id,
                graph.key(id).label().replace('"', "\\\""),
                scheme,
                color
            )?;
        }
        for (from, to) in graph.edges().filter(|&(from, to)| visible(from) && visible(to)) {
            writeln!(out, "\"n{}\" -> \"n{}\";", from, to)?;
        }
        writeln!(out, "}}")?;
        Ok(())
    }

    fn dot_color(&self, color: Color) -> (String, String) {
        let x11 = |name: &str| ("X11".to_string(), name.to_string());
        let scheme = |family: &str, slots: usize, offset: u32| {
            // brewer schemes exist for 3 to 9 classes
            let classes = slots.clamp(3, 9);
            let class = (offset as usize % classes) + 1;
            (format!("{}{}", family, classes), class.to_string())
        };
        match color {
            Palette::CONSTANT => x11("blue"),
            Palette::INIT => x11("lightyellow"),
            Palette::GOAL => x11("yellow"),
            Palette::OPERATOR => x11("green4"),
            Palette::CONDITION => x11("green2"),
            Palette::EFFECT => x11("green3"),
            Palette::EFFECT_LITERAL => x11("yellowgreen"),
            Palette::COST => x11("tomato"),
            Palette::AXIOM => x11("orchid"),
            c if c < self.palette.function_base() => {
                scheme("blues", self.palette.predicate_slots(), c - Palette::PREDICATE_BASE)
            }
            c if c < self.palette.number_base() => {
                scheme("oranges", self.palette.function_slots(), c - self.palette.function_base())
            }
            _ => x11("gray100"),
        }
    }
}
