//! End-to-end translation pipeline
//!
//! Runs symmetry detection on the lifted task, translates the grounded task
//! into a finite-domain task and keeps the grounded generators valid through
//! every simplification.

use std::borrow::Cow;
use std::collections::BTreeMap;
use std::time::{Duration, Instant};

use tracing::{info, info_span, warn};

use crate::engine::{AutomorphismOracle, SearchLimits, SearchStatus};
use crate::graph::{GraphOptions, SymmetryGraph};
use crate::sas::SasTask;
use crate::simplify::{apply_variable_order, filter_unreachable_propositions, Unsimplifiable, VariableOrdering};
use crate::symmetry::{filter_valid, ground_generators, order_histogram, LiftedGenerator, SasGenerator, SearchGenerators};
use crate::task::{FactGrouping, GroundTask, LiftedTask};
use crate::translator::{OperatorCounters, TaskOutcome, TaskTranslator};
use crate::{Result, TranslateError};

/// Translation options
#[derive(Debug, Clone)]
pub struct TranslateOptions {
    /// Require every atom to be encoded by a single fact
    pub use_partial_encoding: bool,
    /// Add preconditions implied by delete effects and mutex groups
    pub add_implied_preconditions: bool,
    /// Remove unreachable values and constant variables
    pub filter_unreachable_facts: bool,
    /// Apply the variable order given to the pipeline
    pub reorder_variables: bool,
    /// Search for structural symmetries of the lifted task
    pub compute_symmetries: bool,
    /// Symmetry graph options
    pub graph: GraphOptions,
    /// Limits of the automorphism search
    pub limits: SearchLimits,
}

impl Default for TranslateOptions {
    fn default() -> Self {
        Self {
            use_partial_encoding: true,
            add_implied_preconditions: false,
            filter_unreachable_facts: true,
            reorder_variables: true,
            compute_symmetries: false,
            graph: GraphOptions::default(),
            limits: SearchLimits::default(),
        }
    }
}

/// Lifted generators extracted from an automorphism search
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct LiftedSymmetries {
    /// Generators mapping at least one predicate or object
    pub generators: Vec<LiftedGenerator>,
    /// Number of vertex permutations returned by the oracle
    pub found: usize,
    /// How the search ended
    pub status: SearchStatus,
}

/// Output of a pipeline run
#[derive(Clone, Debug)]
pub struct Translation {
    /// Final finite-domain task, search generators attached
    pub task: SasTask,
    /// Counters collected during the run
    pub statistics: Statistics,
}

/// Counters and timings of one pipeline run
#[derive(Clone, Debug, Default)]
pub struct Statistics {
    lifted_generators: usize,
    lifted_mapping_symbols: usize,
    affecting_operators: usize,
    after_grounding: usize,
    after_task_creation: usize,
    after_unreachable_filtering: Option<usize>,
    after_reordering: Option<usize>,
    removed_generators: usize,
    remaining_generators: usize,
    with_undefined_entries: usize,
    inconsistent_generators: usize,
    order_histogram: BTreeMap<usize, usize>,
    simplified_effect_conditions: usize,
    added_implied_preconditions: usize,
    oracle_status: Option<SearchStatus>,
    stage_times: Vec<(&'static str, Duration)>,
}

impl Statistics {
    /// Returns the number of generators found on the lifted task
    pub fn lifted_generators(&self) -> usize {
        self.lifted_generators
    }

    /// Returns the number of lifted generators moving a predicate or object
    pub fn lifted_mapping_symbols(&self) -> usize {
        self.lifted_mapping_symbols
    }

    /// Returns the number of lifted generators moving operator or axiom
    /// vertices
    pub fn affecting_operators(&self) -> usize {
        self.affecting_operators
    }

    /// Returns the number of generators left after grounding
    pub fn after_grounding(&self) -> usize {
        self.after_grounding
    }

    /// Returns the number of generators left after task creation
    pub fn after_task_creation(&self) -> usize {
        self.after_task_creation
    }

    /// Returns the number of generators left after unreachable-fact filtering,
    /// or `None` if the stage did not run
    pub fn after_unreachable_filtering(&self) -> Option<usize> {
        self.after_unreachable_filtering
    }

    /// Returns the number of generators left after variable reordering, or
    /// `None` if the stage did not run
    pub fn after_reordering(&self) -> Option<usize> {
        self.after_reordering
    }

    /// Returns the number of generators discarded by grounding and filtering
    pub fn removed_generators(&self) -> usize {
        self.removed_generators
    }

    /// Returns the number of generators attached to the final task
    pub fn remaining_generators(&self) -> usize {
        self.remaining_generators
    }

    /// Returns the number of encoded generators with undefined entries
    pub fn with_undefined_entries(&self) -> usize {
        self.with_undefined_entries
    }

    /// Returns the number of generators dropped by the search encoding
    pub fn inconsistent_generators(&self) -> usize {
        self.inconsistent_generators
    }

    /// Returns the number of final generators per order
    pub fn order_histogram(&self) -> &BTreeMap<usize, usize> {
        &self.order_histogram
    }

    /// Returns the number of effect conditions removed on binary variables
    pub fn simplified_effect_conditions(&self) -> usize {
        self.simplified_effect_conditions
    }

    /// Returns the number of added implied preconditions
    pub fn added_implied_preconditions(&self) -> usize {
        self.added_implied_preconditions
    }

    /// Returns how the automorphism search ended, if it ran
    pub fn oracle_status(&self) -> Option<SearchStatus> {
        self.oracle_status
    }

    /// Returns the wall-clock time of every stage, in run order
    pub fn stage_times(&self) -> &[(&'static str, Duration)] {
        &self.stage_times
    }

    /// Returns the summed time of all stages
    pub fn total_time(&self) -> Duration {
        self.stage_times.iter().map(|(_, time)| *time).sum()
    }

    fn discard(&mut self, generators: &mut Vec<SasGenerator>) {
        self.removed_generators += generators.len();
        generators.clear();
    }
}

/// Runs `stage` inside a span and records its duration
fn timed<T>(stats: &mut Statistics, stage: &'static str, run: impl FnOnce() -> T) -> T {
    let _span = info_span!("stage", name = stage).entered();
    let start = Instant::now();
    let result = run();
    stats.stage_times.push((stage, start.elapsed()));
    result
}

/// Symmetry-aware STRIPS to finite-domain translator
pub struct SymmetryTranslator {
    options: TranslateOptions,
}

impl SymmetryTranslator {
    /// Creates a translator with the given options
    pub fn new(options: TranslateOptions) -> Self {
        Self { options }
    }

    /// Returns the options
    pub fn options(&self) -> &TranslateOptions {
        &self.options
    }

    /// Builds the symmetry graph of `task` and extracts lifted generators
    ///
    /// # Errors
    /// Returns `InvalidArgument` if the lifted task refers to undeclared
    /// objects or types.
    pub fn compute_lifted_generators<O>(&self, task: &LiftedTask, oracle: &mut O) -> Result<LiftedSymmetries>
    where
        O: AutomorphismOracle + ?Sized,
    {
        let graph = SymmetryGraph::build(task, &self.options.graph)?;
        let result = oracle.find_automorphisms(graph.graph(), &self.options.limits);
        if result.status != SearchStatus::Complete {
            warn!(status = ?result.status, "using a partial generator set");
        }
        let generators: Vec<LiftedGenerator> = result
            .generators
            .iter()
            .filter_map(|permutation| LiftedGenerator::from_permutation(graph.graph(), permutation))
            .collect();
        info!(
            vertices = graph.graph().num_vertices(),
            edges = graph.graph().num_edges(),
            found = result.generators.len(),
            mapping_symbols = generators.len(),
            "computed lifted generators"
        );
        Ok(LiftedSymmetries {
            found: result.generators.len(),
            generators,
            status: result.status,
        })
    }

    /// Translates a task, searching for symmetries if enabled
    ///
    /// # Errors
    /// Returns the errors of [`Self::compute_lifted_generators`] and
    /// [`Self::translate_with_generators`].
    pub fn translate<O, V>(
        &self,
        lifted: &LiftedTask,
        ground: &GroundTask,
        grouping: &FactGrouping,
        oracle: &mut O,
        ordering: &V,
    ) -> Result<Translation>
    where
        O: AutomorphismOracle + ?Sized,
        V: VariableOrdering + ?Sized,
    {
        let mut stats = Statistics::default();
        let symmetries = if self.options.compute_symmetries {
            let symmetries = timed(&mut stats, "symmetry graph", || {
                self.compute_lifted_generators(lifted, oracle)
            })?;
            stats.oracle_status = Some(symmetries.status);
            symmetries
        } else {
            LiftedSymmetries::default()
        };
        stats.lifted_generators = symmetries.found;
        self.run(ground, grouping, &symmetries.generators, ordering, stats)
    }

    /// Translates a task with precomputed lifted generators
    ///
    /// # Errors
    /// Returns `EncodingPolicy` for encoding violations (including generators
    /// under the full encoding), `InconsistentInit`, `UnsupportedNegativeGoal`,
    /// `NotAPermutation` and `InvalidArgument` for a bad variable order.
    pub fn translate_with_generators<V>(
        &self,
        ground: &GroundTask,
        grouping: &FactGrouping,
        generators: &[LiftedGenerator],
        ordering: &V,
    ) -> Result<Translation>
    where
        V: VariableOrdering + ?Sized,
    {
        let stats = Statistics {
            lifted_generators: generators.len(),
            ..Default::default()
        };
        self.run(ground, grouping, generators, ordering, stats)
    }

    fn run<V>(
        &self,
        ground: &GroundTask,
        grouping: &FactGrouping,
        lifted: &[LiftedGenerator],
        ordering: &V,
        mut stats: Statistics,
    ) -> Result<Translation>
    where
        V: VariableOrdering + ?Sized,
    {
        stats.lifted_mapping_symbols = lifted.len();
        stats.affecting_operators = lifted.iter().filter(|g| g.affects_operators()).count();

        let grouping = if self.options.use_partial_encoding || !grouping.partial_encoding {
            Cow::Borrowed(grouping)
        } else {
            Cow::Owned(FactGrouping {
                partial_encoding: false,
                ..grouping.clone()
            })
        };
        if !grouping.partial_encoding && !lifted.is_empty() {
            return Err(TranslateError::EncodingPolicy(
                "symmetries cannot be grounded under the full encoding".to_string(),
            ));
        }
        let translator = timed(&mut stats, "dictionary", || {
            TaskTranslator::new(&grouping, self.options.add_implied_preconditions)
        })?;

        // Step 1: ground the lifted generators
        let grounding = timed(&mut stats, "ground generators", || {
            ground_generators(lifted, translator.dictionary())
        })?;
        stats.removed_generators += grounding.nonexistent + grounding.identities;
        stats.after_grounding = grounding.generators.len();
        let mut generators = grounding.generators;

        // Step 2: translate the task
        let mut counters = OperatorCounters::default();
        let outcome = timed(&mut stats, "translate task", || {
            translator.translate_task(ground, &mut counters)
        })?;
        stats.simplified_effect_conditions = counters.simplified_effect_conditions;
        stats.added_implied_preconditions = counters.added_implied_preconditions;
        let mut task = match outcome {
            TaskOutcome::Translated(task) => task,
            shortcut => {
                if let TaskOutcome::Unsolvable(reason) | TaskOutcome::Solvable(reason) = &shortcut {
                    info!(reason, "writing placeholder task");
                }
                stats.discard(&mut generators);
                return Ok(self.finish(shortcut.into_task(), generators, stats));
            }
        };
        generators = generators
            .iter()
            .map(|generator| generator.restrict(|fact| task.variables.contains(fact)))
            .collect();
        stats.removed_generators += filter_valid(&mut generators);
        stats.after_task_creation = generators.len();

        // Step 3: remove unreachable facts
        if self.options.filter_unreachable_facts {
            let filtered = timed(&mut stats, "unreachable facts", || filter_unreachable_propositions(&mut task));
            match filtered {
                Ok(renaming) => {
                    generators = generators
                        .iter()
                        .map(|generator| generator.remap(|fact| renaming.translate_fact(fact)))
                        .collect();
                    stats.removed_generators += filter_valid(&mut generators);
                    stats.after_unreachable_filtering = Some(generators.len());
                }
                Err(reason) => {
                    info!(%reason, "writing placeholder task");
                    stats.discard(&mut generators);
                    stats.after_unreachable_filtering = Some(0);
                    let placeholder = SasTask::trivial(reason == Unsimplifiable::TriviallySolvable);
                    return Ok(self.finish(placeholder, generators, stats));
                }
            }
        }

        // Step 4: apply the variable order
        if self.options.reorder_variables {
            let renaming = timed(&mut stats, "variable order", || {
                let order = ordering.order(&task);
                apply_variable_order(&mut task, &order)
            })?;
            generators = generators
                .iter()
                .map(|generator| generator.remap(|fact| renaming.translate_fact(fact)))
                .collect();
            stats.removed_generators += filter_valid(&mut generators);
            stats.after_reordering = Some(generators.len());
        }

        Ok(self.finish(task, generators, stats))
    }

    /// Encodes the surviving generators and attaches them to `task`
    fn finish(&self, mut task: SasTask, generators: Vec<SasGenerator>, mut stats: Statistics) -> Translation {
        stats.order_histogram = order_histogram(&generators);
        if !generators.is_empty() {
            let (encoded, counts) = timed(&mut stats, "search encoding", || {
                SearchGenerators::encode(&task.variables.ranges, &generators)
            });
            stats.inconsistent_generators = counts.inconsistent;
            stats.with_undefined_entries = counts.with_undefined_entries;
            stats.remaining_generators = encoded.len();
            if !encoded.is_empty() {
                task.search_generators = Some(encoded);
            }
        }
        info!(
            lifted = stats.lifted_generators,
            grounded = stats.after_grounding,
            removed = stats.removed_generators,
            remaining = stats.remaining_generators,
            inconsistent = stats.inconsistent_generators,
            "symmetry generators"
        );
        task.dump_statistics();
        Translation { task, statistics: stats }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::FixedOracle;
    use crate::simplify::{ExplicitOrder, KeepOrder};
    use crate::task::{Atom, ConditionalEffect, Literal, PropositionalAction};

    fn at(room: &str) -> Atom {
        Atom::new("at", [room])
    }

    fn move_action(from: &str, to: &str) -> PropositionalAction {
        PropositionalAction::new(
            format!("(move {} {})", from, to),
            vec![Literal::positive(at(from))],
            vec![ConditionalEffect::unconditional(at(to))],
            vec![ConditionalEffect::unconditional(at(from))],
        )
    }

    /// A robot in room `a` that may move to `b` or `c`
    fn rooms() -> (GroundTask, FactGrouping) {
        let ground = GroundTask {
            init: vec![at("a")],
            goal: vec![Literal::positive(at("b"))],
            actions: vec![
                move_action("a", "b"),
                move_action("a", "c"),
                move_action("b", "a"),
                move_action("c", "a"),
            ],
            ..Default::default()
        };
        let grouping = FactGrouping::new(vec![vec![at("a"), at("b"), at("c")]], vec![]);
        (ground, grouping)
    }

    fn swap(a: &str, b: &str) -> LiftedGenerator {
        let objects = BTreeMap::from([(a.to_string(), b.to_string()), (b.to_string(), a.to_string())]);
        LiftedGenerator::new(BTreeMap::new(), objects).unwrap()
    }

    #[test]
    fn translates_without_symmetries() {
        let (ground, grouping) = rooms();
        let translator = SymmetryTranslator::new(TranslateOptions::default());
        let translation = translator
            .translate_with_generators(&ground, &grouping, &[], &KeepOrder)
            .unwrap();
        // none-of-those is unreachable
        assert_eq!(translation.task.variables.ranges, vec![3]);
        assert_eq!(translation.task.operators.len(), 4);
        assert!(translation.task.search_generators.is_none());
        assert_eq!(translation.statistics.remaining_generators(), 0);
        assert_eq!(translation.statistics.after_reordering(), Some(0));
    }

    #[test]
    fn carries_generator_to_search_encoding() {
        let (ground, grouping) = rooms();
        let translator = SymmetryTranslator::new(TranslateOptions::default());
        let translation = translator
            .translate_with_generators(&ground, &grouping, &[swap("b", "c")], &KeepOrder)
            .unwrap();
        let stats = &translation.statistics;
        assert_eq!(stats.after_grounding(), 1);
        assert_eq!(stats.after_task_creation(), 1);
        assert_eq!(stats.after_unreachable_filtering(), Some(1));
        assert_eq!(stats.after_reordering(), Some(1));
        assert_eq!(stats.remaining_generators(), 1);
        assert_eq!(stats.order_histogram(), &BTreeMap::from([(2, 1)]));

        let encoded = translation.task.search_generators.unwrap();
        assert_eq!(encoded.generators(), &[vec![0, 1, 3, 2]]);
    }

    #[test]
    fn generator_to_nonexistent_fact_is_removed() {
        let (ground, grouping) = rooms();
        let translator = SymmetryTranslator::new(TranslateOptions::default());
        let translation = translator
            .translate_with_generators(&ground, &grouping, &[swap("a", "d")], &KeepOrder)
            .unwrap();
        assert_eq!(translation.statistics.after_grounding(), 0);
        assert_eq!(translation.statistics.removed_generators(), 1);
    }

    #[test]
    fn unreachable_goal_gives_placeholder() {
        let (mut ground, grouping) = rooms();
        ground.actions.retain(|action| !action.name.ends_with("b)"));
        let translator = SymmetryTranslator::new(TranslateOptions::default());
        let translation = translator
            .translate_with_generators(&ground, &grouping, &[swap("b", "c")], &KeepOrder)
            .unwrap();
        assert_eq!(translation.task, SasTask::trivial(false));
        assert_eq!(translation.statistics.after_unreachable_filtering(), Some(0));
        assert_eq!(translation.statistics.removed_generators(), 1);
    }

    #[test]
    fn full_encoding_rejects_generators() {
        let (ground, grouping) = rooms();
        let options = TranslateOptions {
            use_partial_encoding: false,
            ..Default::default()
        };
        let translator = SymmetryTranslator::new(options);
        assert!(translator
            .translate_with_generators(&ground, &grouping, &[swap("b", "c")], &KeepOrder)
            .is_err());
        assert!(translator
            .translate_with_generators(&ground, &grouping, &[], &KeepOrder)
            .is_ok());
    }

    #[test]
    fn bad_order_is_rejected() {
        let (ground, grouping) = rooms();
        let translator = SymmetryTranslator::new(TranslateOptions::default());
        let result = translator.translate_with_generators(&ground, &grouping, &[], &ExplicitOrder(vec![]));
        assert!(result.is_err());
    }

    #[test]
    fn oracle_runs_only_when_enabled() {
        let (ground, grouping) = rooms();
        let lifted = LiftedTask::default();
        let mut oracle = FixedOracle::default();

        let translator = SymmetryTranslator::new(TranslateOptions::default());
        let translation = translator
            .translate(&lifted, &ground, &grouping, &mut oracle, &KeepOrder)
            .unwrap();
        assert_eq!(oracle.calls(), 0);
        assert_eq!(translation.statistics.oracle_status(), None);

        let translator = SymmetryTranslator::new(TranslateOptions {
            compute_symmetries: true,
            ..Default::default()
        });
        let translation = translator
            .translate(&lifted, &ground, &grouping, &mut oracle, &KeepOrder)
            .unwrap();
        assert_eq!(oracle.calls(), 1);
        assert_eq!(translation.statistics.oracle_status(), Some(SearchStatus::Complete));
        assert!(translation
            .statistics
            .stage_times()
            .iter()
            .any(|(stage, _)| *stage == "symmetry graph"));
    }
}
