use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A posted chat line. Created once by the server and never modified.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    pub id: Uuid,
    pub content: String,
    pub author_id: Uuid,
    pub author_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub outcome: Option<Outcome>,
    pub created_at: DateTime<Utc>,
}

/// Resolved result of a dice command, stored next to the message that issued it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum Outcome {
    Roll(RollOutcome),
    Save(SaveOutcome),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Sign {
    #[serde(rename = "+")]
    Plus,
    #[serde(rename = "-")]
    Minus,
}

impl Sign {
    pub fn from_char(c: char) -> Option<Self> {
        match c {
            '+' => Some(Self::Plus),
            '-' => Some(Self::Minus),
            _ => None,
        }
    }

    /// Signed value of `magnitude` under this sign.
    pub fn apply(self, magnitude: u32) -> i64 {
        match self {
            Self::Plus => i64::from(magnitude),
            Self::Minus => -i64::from(magnitude),
        }
    }
}

impl fmt::Display for Sign {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Plus => write!(f, "+"),
            Self::Minus => write!(f, "-"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RollOutcome {
    /// Every die in draw order, dropped ones included.
    pub rolls: Vec<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub drop: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub add: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sign: Option<Sign>,
    pub total: i64,
}

impl RollOutcome {
    /// Modifier as players typed it, e.g. `"+2"`. Empty without a modifier.
    pub fn modifier_label(&self) -> String {
        match (self.sign, self.add) {
            (Some(sign), Some(add)) => format!("{sign}{add}"),
            _ => String::new(),
        }
    }

    /// How many dice were dropped, e.g. `"1"`. Empty when nothing was.
    pub fn drop_label(&self) -> String {
        self.drop.map(|drop| drop.to_string()).unwrap_or_default()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SaveOutcome {
    pub roll: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub modifier: Option<i64>,
    pub threshold: u32,
}

impl SaveOutcome {
    /// The roll after the modifier, the number compared to the threshold.
    pub fn effective(&self) -> i64 {
        i64::from(self.roll) + self.modifier.unwrap_or(0)
    }

    /// Saves succeed at or under the threshold. A natural 20 always fails,
    /// even when the modified roll lands exactly on the threshold.
    pub fn verdict(&self) -> SaveVerdict {
        let threshold = i64::from(self.threshold);
        if self.roll == 20 {
            SaveVerdict::CriticalFailure
        } else if self.effective() == threshold {
            SaveVerdict::CriticalSuccess
        } else if self.effective() < threshold {
            SaveVerdict::Success
        } else {
            SaveVerdict::Failure
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SaveVerdict {
    CriticalFailure,
    CriticalSuccess,
    Success,
    Failure,
}

impl SaveVerdict {
    pub fn is_success(self) -> bool {
        matches!(self, Self::CriticalSuccess | Self::Success)
    }
}

impl fmt::Display for SaveVerdict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::CriticalFailure => write!(f, "Critical Failure!"),
            Self::CriticalSuccess => write!(f, "Critical Success!"),
            Self::Success => write!(f, "Success"),
            Self::Failure => write!(f, "Failure"),
        }
    }
}
