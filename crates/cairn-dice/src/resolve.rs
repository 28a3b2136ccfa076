//! Turns a parsed command into an outcome using a source of die draws.

use rand::Rng;
use tracing::trace;

use cairn_types::models::{Outcome, RollOutcome, SaveOutcome};

use crate::command::{Command, RollCommand, SaveCommand};
use crate::parser;

/// Something that can roll a single die.
pub trait DiceSource {
    /// A uniform draw in `1..=faces`. `faces` is always at least 1.
    fn draw(&mut self, faces: u32) -> u32;
}

/// Rolls dice from any `rand` generator.
#[derive(Debug, Clone)]
pub struct RngSource<R>(pub R);

impl<R: Rng> DiceSource for RngSource<R> {
    fn draw(&mut self, faces: u32) -> u32 {
        self.0.random_range(1..=faces)
    }
}

/// Resolve `command` against `dice`. Never fails for a parsed command.
pub fn resolve(command: &Command, dice: &mut impl DiceSource) -> Outcome {
    match command {
        Command::Roll(roll) => Outcome::Roll(resolve_roll(roll, dice)),
        Command::Save(save) => Outcome::Save(resolve_save(save, dice)),
    }
}

/// The modifier is added to every kept die, not once to the sum:
/// `4d6d1+2` over `[1, 5, 3, 6]` keeps `[5, 3, 6]` and totals 23.
pub fn resolve_roll(command: &RollCommand, dice: &mut impl DiceSource) -> RollOutcome {
    let rolls: Vec<u32> = (0..command.count).map(|_| dice.draw(command.faces)).collect();

    let dropped = command
        .drop_lowest
        .map(|drop| dropped_indices(&rolls, drop as usize))
        .unwrap_or_default();

    let buff = command.buff();
    let total = rolls
        .iter()
        .enumerate()
        .filter(|(index, _)| dropped.binary_search(index).is_err())
        .map(|(_, &roll)| i64::from(roll) + buff)
        .sum();

    RollOutcome {
        rolls,
        drop: command.drop_lowest,
        add: command.modifier.map(|m| m.magnitude),
        sign: command.modifier.map(|m| m.sign),
        total,
    }
}

pub fn resolve_save(command: &SaveCommand, dice: &mut impl DiceSource) -> SaveOutcome {
    SaveOutcome {
        roll: dice.draw(20),
        modifier: command.modifier,
        threshold: command.threshold,
    }
}

/// Indices of the `drop` lowest rolls, ascending. Equal values drop the
/// earlier die first.
pub fn dropped_indices(rolls: &[u32], drop: usize) -> Vec<usize> {
    let mut by_value: Vec<(usize, u32)> = rolls.iter().copied().enumerate().collect();
    by_value.sort_by_key(|&(index, value)| (value, index));

    let mut dropped: Vec<usize> = by_value
        .into_iter()
        .take(drop)
        .map(|(index, _)| index)
        .collect();
    dropped.sort_unstable();
    dropped
}

/// Parse and resolve `text` with the thread-local generator. `None` for
/// ordinary chat.
pub fn interpret(text: &str) -> Option<Outcome> {
    let command = parser::parse(text)?;
    let outcome = resolve(&command, &mut RngSource(rand::rng()));
    trace!(?command, ?outcome, "resolved dice command");
    Some(outcome)
}
