use cairn_types::models::Sign;

/// Largest dice count a roll command may request.
pub const MAX_DICE: u32 = 1000;

/// Largest die a roll command may request.
pub const MAX_FACES: u32 = 1_000_000;

/// A recognised dice command.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    Roll(RollCommand),
    Save(SaveCommand),
}

/// `!r <count>d<faces>[d<drop_lowest>][<sign><magnitude>]`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RollCommand {
    pub count: u32,
    pub faces: u32,
    pub drop_lowest: Option<u32>,
    pub modifier: Option<Modifier>,
}

impl RollCommand {
    /// Dice counts and faces must be positive, and a drop must leave at
    /// least one die kept.
    pub fn is_valid(&self) -> bool {
        (1..=MAX_DICE).contains(&self.count)
            && (1..=MAX_FACES).contains(&self.faces)
            && self.drop_lowest.is_none_or(|drop| drop < self.count)
    }

    /// Signed amount added to each kept die.
    pub fn buff(&self) -> i64 {
        self.modifier.map_or(0, |m| m.sign.apply(m.magnitude))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Modifier {
    pub sign: Sign,
    pub magnitude: u32,
}

/// `!s <threshold>[<sign><magnitude>]`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SaveCommand {
    pub threshold: u32,
    pub modifier: Option<i64>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn roll(count: u32, faces: u32, drop_lowest: Option<u32>) -> RollCommand {
        RollCommand {
            count,
            faces,
            drop_lowest,
            modifier: None,
        }
    }

    #[test]
    fn drop_must_leave_a_die() {
        assert!(roll(4, 6, Some(3)).is_valid());
        assert!(!roll(2, 6, Some(2)).is_valid());
        assert!(!roll(2, 6, Some(5)).is_valid());
    }

    #[test]
    fn zero_and_oversized_pools_are_invalid() {
        assert!(!roll(0, 6, None).is_valid());
        assert!(!roll(3, 0, None).is_valid());
        assert!(!roll(MAX_DICE + 1, 6, None).is_valid());
        assert!(!roll(1, MAX_FACES + 1, None).is_valid());
        assert!(roll(MAX_DICE, MAX_FACES, None).is_valid());
    }

    #[test]
    fn buff_follows_sign() {
        let mut command = roll(1, 6, None);
        assert_eq!(command.buff(), 0);
        command.modifier = Some(Modifier {
            sign: Sign::Minus,
            magnitude: 3,
        });
        assert_eq!(command.buff(), -3);
    }
}
