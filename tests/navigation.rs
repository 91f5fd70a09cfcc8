#![allow(non_snake_case)]

use pokesmash::session::{
    Choice,
    DEX_START,
    ENDING_ID,
    NavError,
    RenderStyle,
    SessionState,
};
use proptest::prelude::*;

#[derive(Clone, Copy, Debug)]
enum Op {
    Advance,
    Retreat,
    Smash,
    Pass,
}

fn op_strategy() -> impl Strategy<Value = Op> {
    prop_oneof![
        Just(Op::Advance),
        Just(Op::Retreat),
        Just(Op::Smash),
        Just(Op::Pass),
    ]
}

proptest! {
    #![proptest_config(ProptestConfig { cases: 64, .. ProptestConfig::default() })]
    #[test]
    fn session__invariants_hold_for_any_input_sequence(
        ops in prop::collection::vec(op_strategy(), 0..600),
    ) {
        let mut session = SessionState::new(RenderStyle::Pixel);
        let mut prev_smashes = 0u32;
        let mut prev_passes = 0u32;
        for op in ops {
            match op {
                Op::Advance => {
                    let _ = session.advance();
                }
                Op::Retreat => {
                    let _ = session.retreat();
                }
                Op::Smash => {
                    let _ = session.record_decision(Choice::Smash);
                }
                Op::Pass => {
                    let _ = session.record_decision(Choice::Pass);
                }
            }
            // Position stays inside [1, 899] and never outruns the frontier.
            prop_assert!(session.current_id() >= DEX_START);
            prop_assert!(session.current_id() <= ENDING_ID);
            prop_assert!(
                u32::from(session.current_id())
                    <= u32::from(session.highest_decided()) + 1
            );
            // Counters are monotonic and bounded by the frontier.
            prop_assert!(
                session.smashes() + session.passes()
                    <= u32::from(session.highest_decided())
            );
            prop_assert!(session.smashes() >= prev_smashes);
            prop_assert!(session.passes() >= prev_passes);
            prev_smashes = session.smashes();
            prev_passes = session.passes();
        }
    }
}

#[test]
fn advance__refuses_to_browse_past_the_frontier() {
    // given
    let mut session = SessionState::new(RenderStyle::Pixel);
    session.record_decision(Choice::Smash).unwrap();
    session.retreat().unwrap();

    // when: one step forward is fine, the next crosses the frontier
    session.advance().unwrap();
    let result = session.advance();

    // then
    assert_eq!(result, Err(NavError::Undecided));
    assert_eq!(session.current_id(), 2);
}

#[test]
fn retreat__then_advance_walks_decided_territory_freely() {
    // given
    let mut session = SessionState::new(RenderStyle::Pixel);
    for _ in 0..20 {
        session.record_decision(Choice::Pass).unwrap();
    }

    // when
    for _ in 0..15 {
        session.retreat().unwrap();
    }
    for _ in 0..10 {
        session.advance().unwrap();
    }

    // then
    assert_eq!(session.current_id(), 16);
    assert_eq!(session.passes(), 20);
}

#[test]
fn move_to__ignores_out_of_range_targets_without_touching_state() {
    // given
    let mut session = SessionState::new(RenderStyle::Pixel);
    session.record_decision(Choice::Smash).unwrap();

    // when
    let below = session.move_to(0);
    let above = session.move_to(900);

    // then
    assert_eq!(below, Err(NavError::OutOfRange));
    assert_eq!(above, Err(NavError::OutOfRange));
    assert_eq!(session.current_id(), 2);
    assert_eq!(session.highest_decided(), 1);
}
