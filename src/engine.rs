use crate::drill::DrillItem;
use log::debug;
use serde::{Deserialize, Serialize};

/// Which code of the current character is expected next
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, strum_macros::Display)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    AwaitingInitial,
    AwaitingFinal,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorRecord {
    pub item_index: usize,
    pub stage: Stage,
    pub expected_code: String,
    pub actual_key: String,
    pub timestamp_ms: u64,
}

/// Every keystroke, correct or not
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeystrokeRecord {
    pub item_index: usize,
    pub stage: Stage,
    pub expected_code: String,
    pub key: String,
    pub correct: bool,
    pub timestamp_ms: u64,
    /// time since the previous keystroke, session start or resume
    pub interval_ms: u64,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeystrokeOutcome {
    pub matched: bool,
    /// stage after the keystroke was applied
    pub stage: Stage,
    pub item_completed: bool,
    /// the final character was completed by this keystroke
    pub session_completed: bool,
    pub item_index: usize,
    pub expected_code: String,
    pub actual_key: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IgnoreReason {
    NotActive,
    AlreadyCompleted,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum KeystrokeResult {
    Processed(KeystrokeOutcome),
    Ignored(IgnoreReason),
}

impl KeystrokeResult {
    pub fn outcome(&self) -> Option<&KeystrokeOutcome> {
        match self {
            KeystrokeResult::Processed(outcome) => Some(outcome),
            KeystrokeResult::Ignored(_) => None,
        }
    }
}

/// Mutable state of one drill: cursor, stage, counters and logs
#[derive(Debug, Clone)]
pub struct SessionState {
    items: Vec<DrillItem>,
    cursor: usize,
    stage: Stage,
    correct_count: usize,
    error_count: usize,
    errors: Vec<ErrorRecord>,
    keystrokes: Vec<KeystrokeRecord>,
    start_time_ms: u64,
    paused_accumulated_ms: u64,
    last_input_ms: u64,
}

impl SessionState {
    pub fn new(items: Vec<DrillItem>, start_time_ms: u64) -> Self {
        Self {
            items,
            cursor: 0,
            stage: Stage::AwaitingInitial,
            correct_count: 0,
            error_count: 0,
            errors: Vec::new(),
            keystrokes: Vec::new(),
            start_time_ms,
            paused_accumulated_ms: 0,
            last_input_ms: start_time_ms,
        }
    }

    pub fn items(&self) -> &[DrillItem] {
        &self.items
    }

    pub fn cursor(&self) -> usize {
        self.cursor
    }

    pub fn stage(&self) -> Stage {
        self.stage
    }

    pub fn correct_count(&self) -> usize {
        self.correct_count
    }

    pub fn error_count(&self) -> usize {
        self.error_count
    }

    pub fn errors(&self) -> &[ErrorRecord] {
        &self.errors
    }

    pub fn keystrokes(&self) -> &[KeystrokeRecord] {
        &self.keystrokes
    }

    pub fn start_time_ms(&self) -> u64 {
        self.start_time_ms
    }

    pub fn paused_accumulated_ms(&self) -> u64 {
        self.paused_accumulated_ms
    }

    pub fn is_complete(&self) -> bool {
        self.cursor >= self.items.len()
    }

    pub fn current_item(&self) -> Option<&DrillItem> {
        self.items.get(self.cursor)
    }

    /// Code the next keystroke must match, `None` once complete
    pub fn expected_code(&self) -> Option<&str> {
        self.current_item().map(|item| match self.stage {
            Stage::AwaitingInitial => item.initial_code.as_str(),
            Stage::AwaitingFinal => item.final_code.as_str(),
        })
    }

    /// Active time between start and `now_ms`, paused intervals excluded
    pub fn active_elapsed_ms(&self, now_ms: u64) -> u64 {
        now_ms
            .saturating_sub(self.start_time_ms)
            .saturating_sub(self.paused_accumulated_ms)
    }

    pub(crate) fn add_paused(&mut self, paused_ms: u64, resumed_at_ms: u64) {
        self.paused_accumulated_ms += paused_ms;
        self.last_input_ms = resumed_at_ms;
    }

    /// Apply one keystroke to the two-stage machine.
    ///
    /// A match on the initial code moves to the final code of the same
    /// character; a match on the final code advances the cursor. A mismatch
    /// is logged and leaves cursor and stage untouched.
    pub fn handle_keystroke(&mut self, key: &str, timestamp_ms: u64) -> KeystrokeResult {
        let Some(expected) = self.expected_code().map(str::to_owned) else {
            return KeystrokeResult::Ignored(IgnoreReason::AlreadyCompleted);
        };

        let item_index = self.cursor;
        let stage = self.stage;
        let matched = key == expected;
        let interval_ms = timestamp_ms.saturating_sub(self.last_input_ms);
        self.last_input_ms = timestamp_ms;

        self.keystrokes.push(KeystrokeRecord {
            item_index,
            stage,
            expected_code: expected.clone(),
            key: key.to_string(),
            correct: matched,
            timestamp_ms,
            interval_ms,
        });

        let mut item_completed = false;
        if matched {
            self.correct_count += 1;
            match stage {
                Stage::AwaitingInitial => self.stage = Stage::AwaitingFinal,
                Stage::AwaitingFinal => {
                    self.cursor += 1;
                    self.stage = Stage::AwaitingInitial;
                    item_completed = true;
                }
            }
        } else {
            debug!("item {item_index} {stage}: expected '{expected}', got '{key}'");
            self.error_count += 1;
            self.errors.push(ErrorRecord {
                item_index,
                stage,
                expected_code: expected.clone(),
                actual_key: key.to_string(),
                timestamp_ms,
            });
        }

        KeystrokeResult::Processed(KeystrokeOutcome {
            matched,
            stage: self.stage,
            item_completed,
            session_completed: item_completed && self.is_complete(),
            item_index,
            expected_code: expected,
            actual_key: key.to_string(),
        })
    }
}
