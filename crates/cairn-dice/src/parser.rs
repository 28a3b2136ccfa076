//! Recognises dice commands in raw message text.
//!
//! ```text
//! roll: !r<ws><count>d<faces>[d<drop>][<ws>*(+|-)<ws>*<magnitude>]
//! save: !s<ws><threshold>[(+|-)<magnitude>]
//! ```
//!
//! `<ws>` is one or more spaces or tabs. The whole text must match; anything
//! else, including an invalid roll such as `!r 2d6d2`, is plain chat.

use cairn_types::models::Sign;

use crate::command::{Command, Modifier, RollCommand, SaveCommand};

/// Parse `text` as a dice command. `None` means the text is ordinary content.
pub fn parse(text: &str) -> Option<Command> {
    let mut cursor = Cursor::new(text);
    if cursor.eat("!r") {
        parse_roll(cursor).map(Command::Roll)
    } else if cursor.eat("!s") {
        parse_save(cursor).map(Command::Save)
    } else {
        None
    }
}

fn parse_roll(mut cursor: Cursor<'_>) -> Option<RollCommand> {
    if cursor.skip_blanks() == 0 {
        return None;
    }

    let count = cursor.number()?;
    if !cursor.eat("d") {
        return None;
    }
    let faces = cursor.number()?;

    let drop_lowest = if cursor.eat("d") {
        Some(cursor.number()?)
    } else {
        None
    };

    let modifier = if cursor.is_done() {
        None
    } else {
        cursor.skip_blanks();
        let sign = cursor.sign()?;
        cursor.skip_blanks();
        Some(Modifier {
            sign,
            magnitude: cursor.number()?,
        })
    };

    if !cursor.is_done() {
        return None;
    }

    let command = RollCommand {
        count,
        faces,
        drop_lowest,
        modifier,
    };
    command.is_valid().then_some(command)
}

fn parse_save(mut cursor: Cursor<'_>) -> Option<SaveCommand> {
    if cursor.skip_blanks() == 0 {
        return None;
    }

    let threshold = cursor.number()?;
    let modifier = if cursor.is_done() {
        None
    } else {
        let sign = cursor.sign()?;
        Some(sign.apply(cursor.number()?))
    };

    cursor.is_done().then_some(SaveCommand {
        threshold,
        modifier,
    })
}

struct Cursor<'a> {
    rest: &'a str,
}

impl<'a> Cursor<'a> {
    fn new(text: &'a str) -> Self {
        Self { rest: text }
    }

    fn eat(&mut self, literal: &str) -> bool {
        match self.rest.strip_prefix(literal) {
            Some(rest) => {
                self.rest = rest;
                true
            }
            None => false,
        }
    }

    /// Skips spaces and tabs, returning how many were consumed.
    fn skip_blanks(&mut self) -> usize {
        let trimmed = self.rest.trim_start_matches([' ', '\t']);
        let skipped = self.rest.len() - trimmed.len();
        self.rest = trimmed;
        skipped
    }

    fn number(&mut self) -> Option<u32> {
        let end = self
            .rest
            .find(|c: char| !c.is_ascii_digit())
            .unwrap_or(self.rest.len());
        if end == 0 {
            return None;
        }
        let (digits, rest) = self.rest.split_at(end);
        let value = digits.parse().ok()?;
        self.rest = rest;
        Some(value)
    }

    fn sign(&mut self) -> Option<Sign> {
        let sign = Sign::from_char(self.rest.chars().next()?)?;
        self.rest = &self.rest[1..];
        Some(sign)
    }

    fn is_done(&self) -> bool {
        self.rest.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn roll(text: &str) -> RollCommand {
        match parse(text) {
            Some(Command::Roll(command)) => command,
            other => panic!("expected roll for {text:?}, got {other:?}"),
        }
    }

    fn save(text: &str) -> SaveCommand {
        match parse(text) {
            Some(Command::Save(command)) => command,
            other => panic!("expected save for {text:?}, got {other:?}"),
        }
    }

    #[test]
    fn plain_roll() {
        assert_eq!(
            roll("!r 3d8"),
            RollCommand {
                count: 3,
                faces: 8,
                drop_lowest: None,
                modifier: None,
            }
        );
    }

    #[test]
    fn roll_with_drop_and_modifier() {
        assert_eq!(
            roll("!r 4d6d1+2"),
            RollCommand {
                count: 4,
                faces: 6,
                drop_lowest: Some(1),
                modifier: Some(Modifier {
                    sign: Sign::Plus,
                    magnitude: 2,
                }),
            }
        );
    }

    #[test]
    fn roll_modifier_allows_blanks_around_sign() {
        let command = roll("!r 2d10 -\t3");
        assert_eq!(
            command.modifier,
            Some(Modifier {
                sign: Sign::Minus,
                magnitude: 3,
            })
        );
        assert_eq!(roll("!r\t\t1d20 + 5").buff(), 5);
    }

    #[test]
    fn drop_not_below_count_is_plain_text() {
        assert_eq!(parse("!r 2d6d2"), None);
        assert_eq!(parse("!r 2d6d3+1"), None);
        assert!(parse("!r 3d6d2").is_some());
    }

    #[test]
    fn zero_dice_or_faces_is_plain_text() {
        assert_eq!(parse("!r 0d6"), None);
        assert_eq!(parse("!r 2d0"), None);
    }

    #[test]
    fn malformed_rolls_are_plain_text() {
        for text in [
            "!r",
            "!r ",
            "!r3d6",
            "!r d6",
            "!r 3d",
            "!r 3x6",
            "!r 3d6+",
            "!r 3d6 2",
            "!r 3d6d",
            "!r 3d6 ",
            " !r 3d6",
            "!r 3d6 and more",
            "!r -3d6",
            "!R 3d6",
            "!r 99999999999d6",
        ] {
            assert_eq!(parse(text), None, "{text:?} should not parse");
        }
    }

    #[test]
    fn save_with_modifier() {
        assert_eq!(
            save("!s 14-2"),
            SaveCommand {
                threshold: 14,
                modifier: Some(-2),
            }
        );
        assert_eq!(save("!s 9+3").modifier, Some(3));
        assert_eq!(save("!s  12").modifier, None);
    }

    #[test]
    fn save_modifier_must_touch_threshold() {
        assert_eq!(parse("!s 14 -2"), None);
        assert_eq!(parse("!s 14- 2"), None);
        assert_eq!(parse("!s 14-"), None);
    }

    #[test]
    fn malformed_saves_are_plain_text() {
        for text in ["!s", "!s14", "!s x", "!s 14d2", "!s 14-2 "] {
            assert_eq!(parse(text), None, "{text:?} should not parse");
        }
    }

    #[test]
    fn ordinary_chat_is_not_a_command() {
        assert_eq!(parse("hello there"), None);
        assert_eq!(parse(""), None);
        assert_eq!(parse("!x 1d6"), None);
    }
}
