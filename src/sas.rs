//! Finite-domain (SAS+) task
//!
//! The task produced by the translator and consumed by the search component.
//! Every variable's last value is its none-of-those value. `write_to` emits
//! the `output.sas` text format, version 3.

use std::io::Write;

use tracing::info;

use crate::error::Result;
use crate::symmetry::SearchGenerators;
use crate::task::Fact;

/// Output format version written by [`SasTask::write_to`]
pub const SAS_FILE_VERSION: u32 = 3;

/// Finite-domain variables
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct SasVariables {
    /// Number of values per variable
    pub ranges: Vec<usize>,
    /// Axiom layer of derived variables, `None` for state variables
    pub axiom_layers: Vec<Option<u32>>,
    /// Value names per variable
    pub value_names: Vec<Vec<String>>,
}

impl SasVariables {
    /// Returns the number of variables
    pub fn len(&self) -> usize {
        self.ranges.len()
    }

    /// Returns true if there are no variables
    pub fn is_empty(&self) -> bool {
        self.ranges.is_empty()
    }

    /// Returns the total number of facts
    pub fn num_facts(&self) -> usize {
        self.ranges.iter().sum()
    }

    /// Iterates over all facts in variable order
    pub fn facts(&self) -> impl Iterator<Item = Fact> + '_ {
        self.ranges
            .iter()
            .enumerate()
            .flat_map(|(var, &range)| (0..range).map(move |val| (var, val)))
    }

    /// Returns true if `fact` is a value of an existing variable
    pub fn contains(&self, (var, val): Fact) -> bool {
        self.ranges.get(var).is_some_and(|&range| val < range)
    }
}

/// A set of facts of which at most one holds in any reachable state
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SasMutexGroup {
    /// Mutually exclusive facts
    pub facts: Vec<Fact>,
}

/// An effect `conditions -> var := post`, optionally requiring `var = pre`
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PrePost {
    /// Affected variable
    pub var: usize,
    /// Required value before the effect (`None` = any)
    pub pre: Option<usize>,
    /// Value after the effect
    pub post: usize,
    /// Effect conditions
    pub conditions: Vec<Fact>,
}

/// A finite-domain operator
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SasOperator {
    /// Name, conventionally `(schema arg1 arg2 ...)`
    pub name: String,
    /// Conditions on variables the operator does not change
    pub prevail: Vec<Fact>,
    /// Effects
    pub pre_post: Vec<PrePost>,
    /// Cost
    pub cost: i64,
}

impl SasOperator {
    /// Returns the size of this operator in the task size measure
    pub fn encoding_size(&self) -> usize {
        1 + self.prevail.len()
            + self
                .pre_post
                .iter()
                .map(|effect| 1 + effect.conditions.len() + usize::from(effect.pre.is_some()))
                .sum::<usize>()
    }
}

/// A finite-domain derivation rule
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SasAxiom {
    /// Body
    pub condition: Vec<Fact>,
    /// Derived fact
    pub effect: Fact,
}

/// A finite-domain planning task
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SasTask {
    /// Variables
    pub variables: SasVariables,
    /// Mutex groups
    pub mutexes: Vec<SasMutexGroup>,
    /// Initial value of every variable
    pub init: Vec<usize>,
    /// Goal facts
    pub goal: Vec<Fact>,
    /// Operators
    pub operators: Vec<SasOperator>,
    /// Derivation rules
    pub axioms: Vec<SasAxiom>,
    /// Whether plans should minimize the summed operator cost
    pub use_min_cost_metric: bool,
    /// Symmetry generators in the search representation
    pub search_generators: Option<SearchGenerators>,
}

impl SasTask {
    /// Creates the one-variable placeholder task
    ///
    /// The goal is the initial value if `solvable`, otherwise a value no
    /// operator can reach.
    pub fn trivial(solvable: bool) -> Self {
        Self {
            variables: SasVariables {
                ranges: vec![2],
                axiom_layers: vec![None],
                value_names: vec![vec![
                    "Atom dummy(val1)".to_string(),
                    "Atom dummy(val2)".to_string(),
                ]],
            },
            mutexes: Vec::new(),
            init: vec![0],
            goal: vec![(0, if solvable { 0 } else { 1 })],
            operators: Vec::new(),
            axioms: Vec::new(),
            use_min_cost_metric: true,
            search_generators: None,
        }
    }

    /// Returns the task size: variables and facts, mutex facts, goal facts,
    /// operator and axiom sizes
    pub fn encoding_size(&self) -> usize {
        self.variables.len()
            + self.variables.num_facts()
            + self.mutexes.iter().map(|m| m.facts.len()).sum::<usize>()
            + self.goal.len()
            + self.operators.iter().map(SasOperator::encoding_size).sum::<usize>()
            + self.axioms.iter().map(|a| 1 + a.condition.len()).sum::<usize>()
    }

    /// Logs size statistics of the task
    pub fn dump_statistics(&self) {
        let derived = self.variables.axiom_layers.iter().filter(|l| l.is_some()).count();
        info!(
            variables = self.variables.len(),
            derived_variables = derived,
            facts = self.variables.num_facts(),
            goal_facts = self.goal.len(),
            mutex_groups = self.mutexes.len(),
            total_mutex_groups_size = self.mutexes.iter().map(|m| m.facts.len()).sum::<usize>(),
            operators = self.operators.len(),
            axioms = self.axioms.len(),
            task_size = self.encoding_size(),
            "translator statistics"
        );
    }

    /// Writes the task in `output.sas` format
    ///
    /// Search generators, if present, follow in a `begin_symmetries` block.
    ///
    /// # Errors
    /// Returns `Io` if writing fails.
    pub fn write_to<W: Write>(&self, out: &mut W) -> Result<()> {
        writeln!(out, "begin_version\n{}\nend_version", SAS_FILE_VERSION)?;
        writeln!(out, "begin_metric\n{}\nend_metric", u8::from(self.use_min_cost_metric))?;

        writeln!(out, "{}", self.variables.len())?;
        for (var, &range) in self.variables.ranges.iter().enumerate() {
            writeln!(out, "begin_variable\nvar{}", var)?;
            match self.variables.axiom_layers.get(var).copied().flatten() {
                Some(layer) => writeln!(out, "{}", layer)?,
                None => writeln!(out, "-1")?,
            }
            writeln!(out, "{}", range)?;
            for name in self.variables.value_names.get(var).into_iter().flatten() {
                writeln!(out, "{}", name)?;
            }
            writeln!(out, "end_variable")?;
        }

        writeln!(out, "{}", self.mutexes.len())?;
        for mutex in &self.mutexes {
            writeln!(out, "begin_mutex_group\n{}", mutex.facts.len())?;
            for (var, val) in &mutex.facts {
                writeln!(out, "{} {}", var, val)?;
            }
            writeln!(out, "end_mutex_group")?;
        }

        writeln!(out, "begin_state")?;
        for val in &self.init {
            writeln!(out, "{}", val)?;
        }
        writeln!(out, "end_state")?;

        writeln!(out, "begin_goal\n{}", self.goal.len())?;
        for (var, val) in &self.goal {
            writeln!(out, "{} {}", var, val)?;
        }
        writeln!(out, "end_goal")?;

        writeln!(out, "{}", self.operators.len())?;
        for op in &self.operators {
            write_operator(out, op)?;
        }

        writeln!(out, "{}", self.axioms.len())?;
        for axiom in &self.axioms {
            writeln!(out, "begin_rule\n{}", axiom.condition.len())?;
            for (var, val) in &axiom.condition {
                writeln!(out, "{} {}", var, val)?;
            }
            let (var, val) = axiom.effect;
            // derived variables are binary: the rule flips the other value
            writeln!(out, "{} {} {}", var, 1 - val.min(1), val)?;
            writeln!(out, "end_rule")?;
        }

        if let Some(generators) = &self.search_generators {
            generators.write_to(out)?;
        }
        Ok(())
    }
}

fn write_operator<W: Write>(out: &mut W, op: &SasOperator) -> Result<()> {
    let name = op
        .name
        .strip_prefix('(')
        .and_then(|n| n.strip_suffix(')'))
        .unwrap_or(&op.name);
    writeln!(out, "begin_operator\n{}", name)?;
    writeln!(out, "{}", op.prevail.len())?;
    for (var, val) in &op.prevail {
        writeln!(out, "{} {}", var, val)?;
    }
    writeln!(out, "{}", op.pre_post.len())?;
    for effect in &op.pre_post {
        write!(out, "{}", effect.conditions.len())?;
        for (cvar, cval) in &effect.conditions {
            write!(out, " {} {}", cvar, cval)?;
        }
        let pre = effect.pre.map_or(-1, |p| p as i64);
        writeln!(out, " {} {} {}", effect.var, pre, effect.post)?;
    }
    writeln!(out, "{}\nend_operator", op.cost)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_task() -> SasTask {
        SasTask {
            variables: SasVariables {
                ranges: vec![3, 2],
                axiom_layers: vec![None, Some(0)],
                value_names: vec![
                    vec!["Atom at(a)".into(), "Atom at(b)".into(), "<none of those>".into()],
                    vec!["Atom ok()".into(), "NegatedAtom ok()".into()],
                ],
            },
            mutexes: vec![SasMutexGroup {
                facts: vec![(0, 0), (0, 1)],
            }],
            init: vec![0, 1],
            goal: vec![(0, 1)],
            operators: vec![SasOperator {
                name: "(move a b)".into(),
                prevail: vec![],
                pre_post: vec![PrePost {
                    var: 0,
                    pre: Some(0),
                    post: 1,
                    conditions: vec![(1, 0)],
                }],
                cost: 1,
            }],
            axioms: vec![SasAxiom {
                condition: vec![(0, 1)],
                effect: (1, 0),
            }],
            use_min_cost_metric: false,
            search_generators: None,
        }
    }

    #[test]
    fn trivial_tasks() {
        let solvable = SasTask::trivial(true);
        assert_eq!(solvable.variables.ranges, vec![2]);
        assert_eq!(solvable.goal, vec![(0, 0)]);
        assert_eq!(solvable.init, vec![0]);
        assert!(solvable.use_min_cost_metric);

        let unsolvable = SasTask::trivial(false);
        assert_eq!(unsolvable.goal, vec![(0, 1)]);
        assert!(unsolvable.operators.is_empty());
        assert_eq!(
            unsolvable.variables.value_names[0],
            vec!["Atom dummy(val1)", "Atom dummy(val2)"]
        );
    }

    #[test]
    fn encoding_size_counts_every_component() {
        let task = sample_task();
        // 2 vars + 5 facts + 2 mutex facts + 1 goal + (1 + 0 + (1 + 1 + 1)) + (1 + 1)
        assert_eq!(task.encoding_size(), 2 + 5 + 2 + 1 + 4 + 2);
    }

    #[test]
    fn writes_output_sas() {
        let mut out = Vec::new();
        sample_task().write_to(&mut out).unwrap();
        let text = String::from_utf8(out).unwrap();
        assert!(text.starts_with("begin_version\n3\nend_version\nbegin_metric\n0\nend_metric\n2\n"));
        assert!(text.contains("begin_variable\nvar1\n0\n2\nAtom ok()\nNegatedAtom ok()\nend_variable"));
        assert!(text.contains("begin_variable\nvar0\n-1\n3\n"));
        assert!(text.contains("begin_state\n0\n1\nend_state"));
        assert!(text.contains("begin_operator\nmove a b\n0\n1\n1 1 0 0 0 1\n1\nend_operator"));
        assert!(text.contains("begin_rule\n1\n0 1\n1 1 0\nend_rule"));
        assert!(!text.contains("begin_symmetries"));
    }

    #[test]
    fn facts_enumerate_all_values() {
        let task = sample_task();
        let facts: Vec<Fact> = task.variables.facts().collect();
        assert_eq!(facts, vec![(0, 0), (0, 1), (0, 2), (1, 0), (1, 1)]);
        assert!(task.variables.contains((0, 2)));
        assert!(!task.variables.contains((1, 2)));
        assert!(!task.variables.contains((2, 0)));
    }
}
