//! Shared fixtures: a robot visiting two symmetric rooms
//!
//! The robot starts in `start`; the goal is to have visited `left` and
//! `right`. Swapping `left` and `right` is a symmetry of the task.

#![allow(dead_code)]

use sas_symmetry::task::{
    Action, Atom, ConditionalEffect, Effect, FactGrouping, GroundTask, InitEntry, LiftedTask, Literal,
    Parameter, PredicateDecl, PropositionalAction, TypeDecl, TypedObject,
};

pub const ROOMS: [&str; 3] = ["start", "left", "right"];

pub fn at(room: &str) -> Atom {
    Atom::new("at", [room])
}

pub fn visited(room: &str) -> Atom {
    Atom::new("visited", [room])
}

pub fn lifted_task() -> LiftedTask {
    LiftedTask {
        types: vec![TypeDecl::object(), TypeDecl::new("room", "object")],
        objects: ROOMS.iter().map(|room| TypedObject::new(*room, "room")).collect(),
        predicates: vec![PredicateDecl::new("at", 1), PredicateDecl::new("visited", 1)],
        functions: vec![],
        init: vec![InitEntry::Atom(at("start"))],
        goal: vec![Literal::positive(visited("left")), Literal::positive(visited("right"))],
        actions: vec![Action {
            name: "move".into(),
            parameters: vec![Parameter::new("?from", "room"), Parameter::new("?to", "room")],
            precondition: vec![Literal::positive(Atom::new("at", ["?from"]))],
            effects: vec![
                Effect::simple(Literal::positive(Atom::new("at", ["?to"]))),
                Effect::simple(Literal::negative(Atom::new("at", ["?from"]))),
                Effect::simple(Literal::positive(Atom::new("visited", ["?to"]))),
            ],
            cost: None,
        }],
        axioms: vec![],
    }
}

pub fn move_action(from: &str, to: &str) -> PropositionalAction {
    PropositionalAction::new(
        format!("(move {} {})", from, to),
        vec![Literal::positive(at(from))],
        vec![
            ConditionalEffect::unconditional(at(to)),
            ConditionalEffect::unconditional(visited(to)),
        ],
        vec![ConditionalEffect::unconditional(at(from))],
    )
}

pub fn ground_task() -> GroundTask {
    let mut actions = Vec::new();
    for from in ROOMS {
        for to in ROOMS.iter().filter(|&&to| to != from) {
            actions.push(move_action(from, to));
        }
    }
    GroundTask {
        init: vec![at("start")],
        goal: vec![Literal::positive(visited("left")), Literal::positive(visited("right"))],
        actions,
        ..Default::default()
    }
}

pub fn grouping() -> FactGrouping {
    FactGrouping::new(
        vec![
            ROOMS.iter().map(|room| at(room)).collect(),
            vec![visited("left")],
            vec![visited("right")],
            vec![visited("start")],
        ],
        vec![ROOMS.iter().map(|room| at(room)).collect()],
    )
}
