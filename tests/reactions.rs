#![allow(non_snake_case)]

use pokesmash::{
    catalog::SpeciesMetadata,
    reaction,
    session::Direction,
};

fn species(is_baby: bool) -> SpeciesMetadata {
    SpeciesMetadata {
        is_baby,
        flavor_text: Some(String::from("A test entry.")),
    }
}

#[test]
fn evaluate__baby_form_plus_right_swipe_is_a_default_shock() {
    // given
    let baby = species(true);

    // when
    let outcome = reaction::evaluate(Some(&baby), 172, Direction::Right);

    // then
    let shock = outcome.expect("a baby form smashed must shock");
    assert!(shock.message.is_none());
}

#[test]
fn evaluate__the_hard_coded_entry_plus_left_swipe_is_a_custom_shock() {
    // given
    let ordinary = species(false);

    // when
    let outcome = reaction::evaluate(Some(&ordinary), 428, Direction::Left);

    // then
    let shock = outcome.expect("passing on 428 must shock");
    assert!(shock.message.is_some());
}

#[test]
fn evaluate__every_other_pair_is_calm() {
    // given
    let ordinary = species(false);
    let baby = species(true);

    // then
    assert!(reaction::evaluate(Some(&ordinary), 1, Direction::Right).is_none());
    assert!(reaction::evaluate(Some(&ordinary), 1, Direction::Left).is_none());
    assert!(reaction::evaluate(Some(&baby), 172, Direction::Left).is_none());
    assert!(reaction::evaluate(Some(&ordinary), 428, Direction::Right).is_none());
    assert!(reaction::evaluate(Some(&ordinary), 427, Direction::Left).is_none());
}

#[test]
fn evaluate__navigation_directions_never_shock() {
    // given
    let baby = species(true);

    // then
    assert!(reaction::evaluate(Some(&baby), 172, Direction::Up).is_none());
    assert!(reaction::evaluate(Some(&baby), 172, Direction::Down).is_none());
}

#[test]
fn evaluate__missing_metadata_never_blocks_the_swipe() {
    // when: the species fetch has not resolved yet
    let outcome = reaction::evaluate(None, 172, Direction::Right);

    // then: fail open, no reaction
    assert!(outcome.is_none());
}
