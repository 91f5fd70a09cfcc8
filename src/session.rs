use chrono::{
    DateTime,
    Utc,
};
use serde::{
    Deserialize,
    Serialize,
};
use std::fmt;

pub type DexId = u16;

pub const DEX_START: DexId = 1;
pub const DEX_END: DexId = 898;
// One past the dex: "every entry decided".
pub const ENDING_ID: DexId = 899;

#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Choice {
    Smash,
    Pass,
}

impl Choice {
    pub fn as_str(self) -> &'static str {
        match self {
            Choice::Smash => "smash",
            Choice::Pass => "pass",
        }
    }
}

impl fmt::Display for Choice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Direction {
    Up,
    Down,
    Left,
    Right,
}

impl Direction {
    // Left/right swipes carry a rating; up/down are pure navigation.
    pub fn choice(self) -> Option<Choice> {
        match self {
            Direction::Right => Some(Choice::Smash),
            Direction::Left => Some(Choice::Pass),
            Direction::Up | Direction::Down => None,
        }
    }
}

#[derive(Clone, Copy, Debug, Default, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RenderStyle {
    #[default]
    Pixel,
    Hd,
    Showdown,
}

impl RenderStyle {
    pub fn as_str(self) -> &'static str {
        match self {
            RenderStyle::Pixel => "pixel",
            RenderStyle::Hd => "hd",
            RenderStyle::Showdown => "showdown",
        }
    }

    pub fn parse(raw: &str) -> Option<Self> {
        match raw {
            "pixel" => Some(RenderStyle::Pixel),
            "hd" => Some(RenderStyle::Hd),
            "showdown" => Some(RenderStyle::Showdown),
            _ => None,
        }
    }

    pub fn next(self) -> Self {
        match self {
            RenderStyle::Pixel => RenderStyle::Hd,
            RenderStyle::Hd => RenderStyle::Showdown,
            RenderStyle::Showdown => RenderStyle::Pixel,
        }
    }
}

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum NavError {
    OutOfRange,
    // Browsing ahead of the decision frontier.
    Undecided,
}

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum SessionPhase {
    Active,
    Completed,
}

#[derive(Clone, Debug, Serialize)]
pub struct ChoiceRecord {
    pub id: DexId,
    pub choice: Choice,
    pub decided_at: DateTime<Utc>,
}

/// Single source of truth for where the player is in the dex and what they
/// have decided so far. Invariants: `current_id <= highest_decided + 1` and
/// `smashes + passes <= highest_decided`.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct SessionState {
    current_id: DexId,
    highest_decided: DexId,
    smashes: u32,
    passes: u32,
    pub style: RenderStyle,
}

impl SessionState {
    pub fn new(style: RenderStyle) -> Self {
        SessionState {
            current_id: DEX_START,
            highest_decided: 0,
            smashes: 0,
            passes: 0,
            style,
        }
    }

    /// Pick the session back up behind a previously recorded score: the player
    /// lands on the first entry they have not decided yet.
    pub fn resume(
        highest_decided: DexId,
        smashes: u32,
        passes: u32,
        style: RenderStyle,
    ) -> Self {
        let highest_decided = highest_decided.min(DEX_END);
        SessionState {
            current_id: (highest_decided + 1).min(ENDING_ID).max(DEX_START),
            highest_decided,
            smashes,
            passes,
            style,
        }
    }

    pub fn current_id(&self) -> DexId {
        self.current_id
    }

    pub fn highest_decided(&self) -> DexId {
        self.highest_decided
    }

    pub fn smashes(&self) -> u32 {
        self.smashes
    }

    pub fn passes(&self) -> u32 {
        self.passes
    }

    pub fn phase(&self) -> SessionPhase {
        if self.current_id >= ENDING_ID {
            SessionPhase::Completed
        } else {
            SessionPhase::Active
        }
    }

    pub fn move_to(&mut self, id: DexId) -> Result<(), NavError> {
        if id < DEX_START || id > ENDING_ID {
            return Err(NavError::OutOfRange);
        }
        if id > self.highest_decided.saturating_add(1) {
            return Err(NavError::Undecided);
        }
        self.current_id = id;
        Ok(())
    }

    /// Up: step forward through already-decided territory.
    pub fn advance(&mut self) -> Result<(), NavError> {
        if self.current_id >= ENDING_ID {
            return Ok(());
        }
        self.move_to(self.current_id + 1)
    }

    /// Down: step back to re-browse earlier entries. Never touches counters.
    pub fn retreat(&mut self) -> Result<(), NavError> {
        if self.current_id <= DEX_START || self.current_id >= ENDING_ID {
            return Ok(());
        }
        self.move_to(self.current_id - 1)
    }

    /// Commit a rating for the current entry and advance past it, atomically.
    ///
    /// A fresh decision bumps a counter and pushes the frontier. Re-deciding a
    /// retreated-to entry leaves the counters alone but still yields a record
    /// so the remote log gets the overwrite. Returns `None` once the dex is
    /// exhausted.
    pub fn record_decision(&mut self, choice: Choice) -> Option<ChoiceRecord> {
        if self.current_id > DEX_END {
            return None;
        }
        let id = self.current_id;
        if id > self.highest_decided {
            match choice {
                Choice::Smash => self.smashes += 1,
                Choice::Pass => self.passes += 1,
            }
            self.highest_decided = id;
        }
        // Counters and position move together; id <= DEX_END guarantees the
        // step lands at most on ENDING_ID.
        self.current_id = id + 1;
        Some(ChoiceRecord {
            id,
            choice,
            decided_at: Utc::now(),
        })
    }
}

#[cfg(test)]
mod tests {
    #![allow(non_snake_case)]
    use super::*;

    #[test]
    fn move_to__rejects_ids_outside_the_dex() {
        // given
        let mut session = SessionState::new(RenderStyle::Pixel);

        // when / then
        assert_eq!(session.move_to(0), Err(NavError::OutOfRange));
        assert_eq!(session.move_to(900), Err(NavError::OutOfRange));
        assert_eq!(session.current_id(), DEX_START);
    }

    #[test]
    fn move_to__rejects_ids_past_the_decision_frontier() {
        // given
        let mut session = SessionState::new(RenderStyle::Pixel);
        session.record_decision(Choice::Smash).unwrap();

        // when
        let result = session.move_to(5);

        // then
        assert_eq!(result, Err(NavError::Undecided));
        assert_eq!(session.current_id(), 2);
    }

    #[test]
    fn record_decision__fresh_decision_counts_and_advances() {
        // given
        let mut session = SessionState::new(RenderStyle::Pixel);

        // when
        let record = session.record_decision(Choice::Smash).unwrap();

        // then
        assert_eq!(record.id, 1);
        assert_eq!(record.choice, Choice::Smash);
        assert_eq!(session.current_id(), 2);
        assert_eq!(session.highest_decided(), 1);
        assert_eq!(session.smashes(), 1);
        assert_eq!(session.passes(), 0);
    }

    #[test]
    fn record_decision__redecision_advances_without_counting() {
        // given
        let mut session = SessionState::new(RenderStyle::Pixel);
        session.record_decision(Choice::Smash).unwrap();
        session.record_decision(Choice::Pass).unwrap();
        session.retreat().unwrap();
        session.retreat().unwrap();

        // when
        let record = session.record_decision(Choice::Pass).unwrap();

        // then
        assert_eq!(record.id, 1);
        assert_eq!(record.choice, Choice::Pass);
        assert_eq!(session.current_id(), 2);
        assert_eq!(session.smashes(), 1);
        assert_eq!(session.passes(), 1);
        assert_eq!(session.highest_decided(), 2);
    }

    #[test]
    fn record_decision__is_a_noop_once_completed() {
        // given
        let mut session =
            SessionState::resume(DEX_END, 500, 398, RenderStyle::Pixel);
        assert_eq!(session.phase(), SessionPhase::Completed);

        // when
        let record = session.record_decision(Choice::Smash);

        // then
        assert!(record.is_none());
        assert_eq!(session.smashes(), 500);
        assert_eq!(session.passes(), 398);
        assert_eq!(session.current_id(), ENDING_ID);
    }

    #[test]
    fn resume__lands_on_the_first_undecided_entry() {
        // given / when
        let session = SessionState::resume(150, 90, 60, RenderStyle::Hd);

        // then
        assert_eq!(session.current_id(), 151);
        assert_eq!(session.highest_decided(), 150);
        assert_eq!(session.phase(), SessionPhase::Active);
    }

    #[test]
    fn retreat__is_a_noop_at_the_first_entry_and_after_the_ending() {
        // given
        let mut fresh = SessionState::new(RenderStyle::Pixel);
        let mut done = SessionState::resume(DEX_END, 0, 0, RenderStyle::Pixel);

        // when
        fresh.retreat().unwrap();
        done.retreat().unwrap();

        // then
        assert_eq!(fresh.current_id(), DEX_START);
        assert_eq!(done.current_id(), ENDING_ID);
    }
}
