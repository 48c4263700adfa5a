//! End-to-end tests of the symmetry-aware translation

mod common;

use std::collections::BTreeSet;

use sas_symmetry::engine::{FixedOracle, RefinementOracle, SearchStatus};
use sas_symmetry::sas::{SasOperator, SasTask};
use sas_symmetry::simplify::{ExplicitOrder, KeepOrder};
use sas_symmetry::symmetry::SearchGenerators;
use sas_symmetry::task::Fact;
use sas_symmetry::{SymmetryTranslator, TranslateOptions};

fn options() -> TranslateOptions {
    TranslateOptions {
        compute_symmetries: true,
        ..Default::default()
    }
}

fn map_fact(layout: &SearchGenerators, generator: &[i64], fact: Fact) -> Fact {
    let image = generator[layout.index_of(fact)];
    assert!(image >= 0, "fact {:?} has no image", fact);
    layout.fact_at(image as usize).unwrap()
}

/// Effects and conditions of an operator as a comparable set
fn signature(op: &SasOperator, map: &dyn Fn(Fact) -> Fact, map_var: &dyn Fn(usize) -> usize) -> BTreeSet<String> {
    let mut items = BTreeSet::new();
    for &fact in &op.prevail {
        items.insert(format!("prevail {:?}", map(fact)));
    }
    for effect in &op.pre_post {
        let (var, post) = map((effect.var, effect.post));
        let pre = effect.pre.map(|pre| map((effect.var, pre)).1);
        assert_eq!(var, map_var(effect.var));
        let conditions: BTreeSet<Fact> = effect.conditions.iter().map(|&c| map(c)).collect();
        items.insert(format!("effect {} {:?} {} {:?}", var, pre, post, conditions));
    }
    items
}

fn operator_set(task: &SasTask, map: &dyn Fn(Fact) -> Fact, map_var: &dyn Fn(usize) -> usize) -> BTreeSet<BTreeSet<String>> {
    task.operators.iter().map(|op| signature(op, map, map_var)).collect()
}

#[test]
fn finds_and_carries_room_symmetry() {
    let translator = SymmetryTranslator::new(options());
    let mut oracle = RefinementOracle::new();
    let translation = translator
        .translate(
            &common::lifted_task(),
            &common::ground_task(),
            &common::grouping(),
            &mut oracle,
            &KeepOrder,
        )
        .unwrap();

    let stats = &translation.statistics;
    assert_eq!(stats.oracle_status(), Some(SearchStatus::Complete));
    assert!(stats.lifted_generators() >= 1);
    assert_eq!(stats.lifted_mapping_symbols(), 1);
    assert_eq!(stats.remaining_generators(), 1);
    assert_eq!(stats.inconsistent_generators(), 0);
    // none-of-those values of the visited variables have no image
    assert_eq!(stats.with_undefined_entries(), 1);

    let task = &translation.task;
    // at: start, left, right (none-of-those unreachable); visited: yes / no
    assert_eq!(task.variables.ranges, vec![3, 2, 2, 2]);
    let layout = task.search_generators.as_ref().unwrap();
    let generator = &layout.generators()[0];
    assert_eq!(&generator[..4], &[0, 2, 1, 3]);
    assert_eq!(map_fact(layout, generator, (0, 1)), (0, 2));
    assert_eq!(map_fact(layout, generator, (0, 0)), (0, 0));
}

#[test]
fn final_generator_permutes_operators_and_goal() {
    let translator = SymmetryTranslator::new(options());
    let translation = translator
        .translate(
            &common::lifted_task(),
            &common::ground_task(),
            &common::grouping(),
            &mut RefinementOracle::new(),
            &KeepOrder,
        )
        .unwrap();
    let task = &translation.task;
    let layout = task.search_generators.as_ref().unwrap();

    for generator in layout.generators() {
        let map = |fact: Fact| map_fact(layout, generator, fact);
        let map_var = |var: usize| generator[var] as usize;
        assert_eq!(operator_set(task, &map, &map_var), operator_set(task, &|f: Fact| f, &|v: usize| v));

        let goal: BTreeSet<Fact> = task.goal.iter().map(|&fact| map(fact)).collect();
        assert_eq!(goal, task.goal.iter().copied().collect());
        for (var, &val) in task.init.iter().enumerate() {
            if generator[layout.index_of((var, val))] >= 0 {
                let (image_var, image_val) = map((var, val));
                assert_eq!(task.init[image_var], image_val);
            }
        }
    }
}

#[test]
fn generator_counts_never_grow() {
    let translator = SymmetryTranslator::new(options());
    let translation = translator
        .translate(
            &common::lifted_task(),
            &common::ground_task(),
            &common::grouping(),
            &mut RefinementOracle::new(),
            &ExplicitOrder(vec![1, 2, 0]),
        )
        .unwrap();
    let stats = &translation.statistics;
    let after_unreachable = stats.after_unreachable_filtering().unwrap();
    let after_reordering = stats.after_reordering().unwrap();
    assert!(stats.lifted_mapping_symbols() >= stats.after_grounding());
    assert!(stats.after_grounding() >= stats.after_task_creation());
    assert!(stats.after_task_creation() >= after_unreachable);
    assert!(after_unreachable >= after_reordering);
    assert!(after_reordering >= stats.remaining_generators());

    // visited(start) was left out of the order
    assert_eq!(translation.task.variables.len(), 3);
    assert_eq!(stats.remaining_generators(), 1);
    let generator = &translation.task.search_generators.as_ref().unwrap().generators()[0];
    assert_eq!(&generator[..3], &[1, 0, 2]);
}

#[test]
fn writes_symmetries_block() {
    let translator = SymmetryTranslator::new(options());
    let translation = translator
        .translate(
            &common::lifted_task(),
            &common::ground_task(),
            &common::grouping(),
            &mut RefinementOracle::new(),
            &KeepOrder,
        )
        .unwrap();
    let mut out = Vec::new();
    translation.task.write_to(&mut out).unwrap();
    let text = String::from_utf8(out).unwrap();
    assert!(text.starts_with("begin_version\n3\nend_version\n"));
    assert!(text.contains("begin_symmetries\n1 13\n0 2 1 3 "));
    assert!(text.ends_with("end_symmetries\n"));
}

#[test]
fn exhausted_oracle_keeps_partial_generators() {
    let translator = SymmetryTranslator::new(options());
    let mut oracle = FixedOracle::with_status(vec![], SearchStatus::TimedOut);
    let translation = translator
        .translate(
            &common::lifted_task(),
            &common::ground_task(),
            &common::grouping(),
            &mut oracle,
            &KeepOrder,
        )
        .unwrap();
    assert_eq!(translation.statistics.oracle_status(), Some(SearchStatus::TimedOut));
    assert_eq!(translation.statistics.remaining_generators(), 0);
    assert!(translation.task.search_generators.is_none());
    assert_eq!(translation.task.operators.len(), 6);
}

#[test]
fn symmetry_search_can_be_switched_off() {
    let translator = SymmetryTranslator::new(TranslateOptions::default());
    let mut oracle = RefinementOracle::new();
    let translation = translator
        .translate(
            &common::lifted_task(),
            &common::ground_task(),
            &common::grouping(),
            &mut oracle,
            &KeepOrder,
        )
        .unwrap();
    assert_eq!(oracle.nodes_visited(), 0);
    assert_eq!(translation.statistics.lifted_generators(), 0);
    assert!(translation.task.search_generators.is_none());
}

#[test]
fn translates_overlapping_groups_under_full_encoding() {
    let mut grouping = sas_symmetry::task::FactGrouping::new(
        vec![
            vec![common::at("start"), common::at("left")],
            vec![common::at("left"), common::at("right")],
            vec![common::visited("left")],
            vec![common::visited("right")],
            vec![common::visited("start")],
        ],
        vec![common::ROOMS.iter().map(|room| common::at(room)).collect()],
    );
    grouping.partial_encoding = false;
    let translator = SymmetryTranslator::new(TranslateOptions {
        use_partial_encoding: false,
        filter_unreachable_facts: false,
        reorder_variables: false,
        ..Default::default()
    });
    let translation = translator
        .translate_with_generators(&common::ground_task(), &grouping, &[], &KeepOrder)
        .unwrap();

    let task = &translation.task;
    assert_eq!(task.variables.ranges, vec![3, 3, 2, 2, 2]);
    assert_eq!(task.init[0], 0);
    assert_eq!(task.mutexes.len(), 1);
    assert_eq!(task.mutexes[0].facts, vec![(0, 0), (0, 1), (1, 0), (1, 1)]);
    assert!(task.search_generators.is_none());
}
