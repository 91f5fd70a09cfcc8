use crate::{
    catalog::SpeciesMetadata,
    session::{
        DexId,
        Direction,
    },
};
use std::time::Duration;

// How long the shock sequence holds the card before the decision commits.
pub const SHOCK_DURATION: Duration = Duration::from_millis(1500);

const WRONG_MOVE_ID: DexId = 428;
const WRONG_MOVE_MESSAGE: &str = "That was the wrong fucking move, kid.";

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Shock {
    pub message: Option<&'static str>,
}

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
enum Trigger {
    // The catalog marks the species as an early growth stage.
    BabyForm,
    Exact(DexId),
}

impl Trigger {
    fn matches(self, species: Option<&SpeciesMetadata>, id: DexId) -> bool {
        match self {
            // Missing metadata never matches: a slow catalog must not block
            // the swipe.
            Trigger::BabyForm => species.map(|s| s.is_baby).unwrap_or(false),
            Trigger::Exact(target) => id == target,
        }
    }
}

struct ReactionRule {
    trigger: Trigger,
    direction: Direction,
    message: Option<&'static str>,
}

// Certain entries have a narratively wrong answer. Extend by adding rows,
// first match wins.
const RULES: &[ReactionRule] = &[
    ReactionRule {
        trigger: Trigger::BabyForm,
        direction: Direction::Right,
        message: None,
    },
    ReactionRule {
        trigger: Trigger::Exact(WRONG_MOVE_ID),
        direction: Direction::Left,
        message: Some(WRONG_MOVE_MESSAGE),
    },
];

pub fn evaluate(
    species: Option<&SpeciesMetadata>,
    id: DexId,
    direction: Direction,
) -> Option<Shock> {
    RULES
        .iter()
        .find(|rule| {
            rule.direction == direction && rule.trigger.matches(species, id)
        })
        .map(|rule| Shock {
            message: rule.message,
        })
}
