//! Tests for the STRIPS to finite-domain translation

use sas_symmetry::sas::{PrePost, SasTask};
use sas_symmetry::simplify::KeepOrder;
use sas_symmetry::task::{
    Atom, ConditionalEffect, FactGrouping, GroundTask, Literal, PropositionalAction, PropositionalAxiom,
};
use sas_symmetry::translator::{OperatorCounters, TaskOutcome, TaskTranslator};
use sas_symmetry::{SymmetryTranslator, TranslateError, TranslateOptions};

fn atom(name: &str) -> Atom {
    Atom::nullary(name)
}

fn translate(task: &GroundTask, grouping: &FactGrouping) -> SasTask {
    let translator = TaskTranslator::new(grouping, false).unwrap();
    match translator.translate_task(task, &mut OperatorCounters::default()).unwrap() {
        TaskOutcome::Translated(sas) => sas,
        other => panic!("expected a translated task, got {:?}", other),
    }
}

#[test]
fn binary_variable_effect_needs_no_none_of_those() {
    let grouping = FactGrouping::new(vec![vec![atom("A"), atom("B")]], vec![vec![atom("A"), atom("B")]]);
    let task = GroundTask {
        init: vec![atom("B")],
        goal: vec![Literal::positive(atom("A"))],
        actions: vec![PropositionalAction::new(
            "(flip)",
            vec![],
            vec![ConditionalEffect::unconditional(atom("A"))],
            vec![ConditionalEffect::unconditional(atom("B"))],
        )],
        ..Default::default()
    };

    let sas = translate(&task, &grouping);
    assert_eq!(
        sas.operators[0].pre_post,
        vec![PrePost {
            var: 0,
            pre: None,
            post: 0,
            conditions: vec![],
        }]
    );

    // the unused none-of-those value disappears with the unreachable facts
    let translation = SymmetryTranslator::new(TranslateOptions::default())
        .translate_with_generators(&task, &grouping, &[], &KeepOrder)
        .unwrap();
    assert_eq!(translation.task.variables.ranges, vec![2]);
    assert_eq!(translation.task.operators[0].pre_post[0].post, 0);
}

#[test]
fn uncovered_delete_sets_none_of_those() {
    let grouping = FactGrouping::new(vec![vec![atom("A"), atom("B")]], vec![]);
    let task = GroundTask {
        init: vec![atom("A")],
        goal: vec![Literal::negative(atom("A"))],
        actions: vec![PropositionalAction::new(
            "(drop)",
            vec![Literal::positive(atom("A"))],
            vec![],
            vec![ConditionalEffect::unconditional(atom("A"))],
        )],
        ..Default::default()
    };
    let translator = TaskTranslator::new(&grouping, false).unwrap();
    let result = translator.translate_task(&task, &mut OperatorCounters::default());
    // not A is a disjunction over B and none-of-those
    assert!(matches!(result, Err(TranslateError::UnsupportedNegativeGoal(_))));

    let task = GroundTask {
        goal: vec![Literal::positive(atom("B"))],
        ..task
    };
    let sas = translate(&task, &grouping);
    assert_eq!(sas.operators[0].pre_post[0].pre, Some(0));
    assert_eq!(sas.operators[0].pre_post[0].post, 2);
}

#[test]
fn no_op_operators_are_dropped() {
    let grouping = FactGrouping::new(vec![vec![atom("A"), atom("B")]], vec![]);
    let task = GroundTask {
        init: vec![atom("A")],
        goal: vec![Literal::positive(atom("B"))],
        actions: vec![
            PropositionalAction::new(
                "(stay)",
                vec![Literal::positive(atom("A"))],
                vec![ConditionalEffect::unconditional(atom("A"))],
                vec![],
            ),
            PropositionalAction::new(
                "(go)",
                vec![Literal::positive(atom("A"))],
                vec![ConditionalEffect::unconditional(atom("B"))],
                vec![ConditionalEffect::unconditional(atom("A"))],
            ),
        ],
        ..Default::default()
    };
    let sas = translate(&task, &grouping);
    assert_eq!(sas.operators.len(), 1);
    assert_eq!(sas.operators[0].name, "(go)");
}

#[test]
fn mutex_violating_goal_gives_unsolvable_placeholder() {
    let grouping = FactGrouping::new(
        vec![vec![atom("A")], vec![atom("B")]],
        vec![vec![atom("A"), atom("B")]],
    );
    let task = GroundTask {
        init: vec![atom("A")],
        goal: vec![Literal::positive(atom("A")), Literal::positive(atom("B"))],
        ..Default::default()
    };
    let translation = SymmetryTranslator::new(TranslateOptions::default())
        .translate_with_generators(&task, &grouping, &[], &KeepOrder)
        .unwrap();
    let placeholder = translation.task;
    assert_eq!(placeholder, SasTask::trivial(false));
    assert_eq!(placeholder.variables.ranges, vec![2]);
    assert_eq!(placeholder.goal, vec![(0, 1)]);
    assert!(placeholder.operators.is_empty());
}

#[test]
fn axioms_and_layers_are_translated() {
    let grouping = FactGrouping::new(vec![vec![atom("A")], vec![atom("derived")]], vec![]);
    let task = GroundTask {
        init: vec![],
        goal: vec![Literal::positive(atom("derived"))],
        actions: vec![PropositionalAction::new(
            "(make)",
            vec![],
            vec![ConditionalEffect::unconditional(atom("A"))],
            vec![],
        )],
        axioms: vec![PropositionalAxiom {
            name: "(derive)".into(),
            condition: vec![Literal::positive(atom("A"))],
            effect: Literal::positive(atom("derived")),
        }],
        axiom_layers: [(atom("derived"), 0)].into_iter().collect(),
        ..Default::default()
    };
    let sas = translate(&task, &grouping);
    assert_eq!(sas.variables.axiom_layers, vec![None, Some(0)]);
    assert_eq!(sas.axioms.len(), 1);
    assert_eq!(sas.axioms[0].condition, vec![(0, 0)]);
    assert_eq!(sas.axioms[0].effect, (1, 0));

    let mut out = Vec::new();
    sas.write_to(&mut out).unwrap();
    let text = String::from_utf8(out).unwrap();
    assert!(text.contains("begin_rule\n1\n0 0\n1 1 0\nend_rule"));
}

#[test]
fn conditional_effects_on_binary_variables_are_simplified() {
    let grouping = FactGrouping::new(vec![vec![atom("A"), atom("B")], vec![atom("C")]], vec![]);
    let task = GroundTask {
        init: vec![atom("A")],
        goal: vec![Literal::positive(atom("C"))],
        actions: vec![PropositionalAction::new(
            "(light)",
            vec![],
            vec![ConditionalEffect::when(
                vec![Literal::positive(atom("A")), Literal::negative(atom("C"))],
                atom("C"),
            )],
            vec![],
        )],
        ..Default::default()
    };
    let translator = TaskTranslator::new(&grouping, false).unwrap();
    let mut counters = OperatorCounters::default();
    let outcome = translator.translate_task(&task, &mut counters).unwrap();
    assert!(outcome.is_translated());
    let sas = outcome.into_task();
    // "not C" is dropped: the effect is a no-op whenever C already holds
    assert_eq!(sas.operators[0].pre_post[0].var, 1);
    assert_eq!(sas.operators[0].pre_post[0].conditions, vec![(0, 0)]);
    assert_eq!(counters.simplified_effect_conditions, 1);
}
