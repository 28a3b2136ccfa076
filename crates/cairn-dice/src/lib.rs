//! Dice commands posted as chat messages.
//!
//! `!r 4d6d1+2` rolls four six-sided dice, drops the lowest and adds two to
//! every kept die. `!s 14-2` rolls a d20 save against 14 with a -2 modifier.
//! Text that does not match either form is ordinary chat content.

pub mod command;
pub mod parser;
pub mod resolve;

pub use command::{Command, Modifier, RollCommand, SaveCommand, MAX_DICE, MAX_FACES};
pub use parser::parse;
pub use resolve::{DiceSource, RngSource, dropped_indices, interpret, resolve};
