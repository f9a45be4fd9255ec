use serde::{Deserialize, Serialize};

/// Keys drawn from when a simulated participant may press anything.
pub const PRINTABLE_KEYS: &[&str] = &[
    "a", "b", "c", "d", "e", "f", "g", "h", "i", "j", "k", "l", "m", "n", "o", "p", "q", "r", "s",
    "t", "u", "v", "w", "x", "y", "z", "0", "1", "2", "3", "4", "5", "6", "7", "8", "9", " ",
];

/// Input device a response arrived through.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Channel {
    Keyboard,
    Pointer,
}

/// Identity of a single response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Choice {
    Key(String),
    /// Click on the item at this index of the display.
    Item(usize),
    /// The "no target found" button.
    Absent,
}

impl Choice {
    pub fn key(key: impl Into<String>) -> Self {
        Choice::Key(key.into())
    }

    pub fn channel(&self) -> Channel {
        match self {
            Choice::Key(_) => Channel::Keyboard,
            Choice::Item(_) | Choice::Absent => Channel::Pointer,
        }
    }

    /// Value written to the `response` field of an exported record.
    pub fn label(&self) -> String {
        match self {
            Choice::Key(key) => key.clone(),
            Choice::Item(_) => "target".to_string(),
            Choice::Absent => "absent".to_string(),
        }
    }

    pub fn item_index(&self) -> Option<usize> {
        match self {
            Choice::Item(index) => Some(*index),
            _ => None,
        }
    }
}

/// The set of responses a trial listens for.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChoiceSet {
    AllKeys,
    /// No listener is registered at all.
    NoKeys,
    Keys(Vec<String>),
    /// Clickable items of a spatial display, optionally with an "absent" button.
    Items { count: usize, absent: bool },
}

impl Default for ChoiceSet {
    fn default() -> Self {
        ChoiceSet::AllKeys
    }
}

impl ChoiceSet {
    pub fn keys<I, K>(keys: I) -> Self
    where
        I: IntoIterator<Item = K>,
        K: Into<String>,
    {
        ChoiceSet::Keys(keys.into_iter().map(Into::into).collect())
    }

    pub fn accepts(&self, choice: &Choice) -> bool {
        match (self, choice) {
            (ChoiceSet::AllKeys, Choice::Key(_)) => true,
            (ChoiceSet::Keys(keys), Choice::Key(key)) => {
                keys.iter().any(|k| k.eq_ignore_ascii_case(key))
            }
            (ChoiceSet::Items { count, .. }, Choice::Item(index)) => index < count,
            (ChoiceSet::Items { absent, .. }, Choice::Absent) => *absent,
            _ => false,
        }
    }

    pub fn listens(&self) -> bool {
        !matches!(self, ChoiceSet::NoKeys)
    }

    /// Every concrete response a simulated participant may produce.
    pub fn candidates(&self) -> Vec<Choice> {
        match self {
            ChoiceSet::AllKeys => PRINTABLE_KEYS.iter().map(|k| Choice::key(*k)).collect(),
            ChoiceSet::NoKeys => Vec::new(),
            ChoiceSet::Keys(keys) => keys.iter().cloned().map(Choice::Key).collect(),
            ChoiceSet::Items { count, absent } => {
                let mut choices: Vec<Choice> = (0..*count).map(Choice::Item).collect();
                if *absent {
                    choices.push(Choice::Absent);
                }
                choices
            }
        }
    }

    pub fn channel(&self) -> Channel {
        match self {
            ChoiceSet::Items { .. } => Channel::Pointer,
            _ => Channel::Keyboard,
        }
    }
}

/// One accepted response, timestamped relative to presentation onset.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResponseEvent {
    pub rt_ms: u64,
    pub choice: Choice,
    pub channel: Channel,
    /// Stimulus playback position in seconds, for timed media.
    pub stimulus_time: Option<f64>,
}

impl ResponseEvent {
    pub fn new(rt_ms: u64, choice: Choice) -> Self {
        let channel = choice.channel();
        Self {
            rt_ms,
            choice,
            channel,
            stimulus_time: None,
        }
    }

    pub fn at_stimulus_time(mut self, seconds: f64) -> Self {
        self.stimulus_time = Some(seconds);
        self
    }
}
