//! Escalation stages.
//!
//! ## Stages
//!
//! - **Mild (stage 1)**: reminder sound + servo push, nothing leaves the house.
//! - **Severe (stage 2)**: warning sound + servo push + remote notification.
//!
//! The stage is picked from the day's escalation count after it has been
//! incremented. The comparison is strict: a count equal to the threshold is
//! the first severe escalation.

use std::path::Path;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::config::SoundConfig;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Stage {
    /// Stage 1: local nudge only.
    Mild,
    /// Stage 2: local nudge plus remote notification.
    Severe,
}

impl Stage {
    pub fn for_count(daily_count: u32, threshold: u32) -> Self {
        if daily_count < threshold {
            Stage::Mild
        } else {
            Stage::Severe
        }
    }

    /// 1 or 2.
    pub fn number(self) -> u8 {
        match self {
            Stage::Mild => 1,
            Stage::Severe => 2,
        }
    }

    pub fn notifies_remote(self) -> bool {
        self == Stage::Severe
    }

    pub fn sound(self, sounds: &SoundConfig) -> &Path {
        match self {
            Stage::Mild => &sounds.alert1,
            Stage::Severe => &sounds.alert2,
        }
    }
}

/// An escalation the engine has committed to. Handed to the responder.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Escalation {
    pub stage: Stage,
    /// Count after the increment.
    pub daily_count: u32,
    pub date: NaiveDate,
    /// `(previous date, previous count)` when this escalation rolled the day.
    pub rolled_over: Option<(NaiveDate, u32)>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn boundary_is_strictly_less_than() {
        assert_eq!(Stage::for_count(1, 2), Stage::Mild);
        assert_eq!(Stage::for_count(2, 2), Stage::Severe);
        assert_eq!(Stage::for_count(3, 2), Stage::Severe);
        assert_eq!(Stage::for_count(4, 5), Stage::Mild);
        assert_eq!(Stage::for_count(5, 5), Stage::Severe);
    }

    #[test]
    fn threshold_of_one_is_always_severe() {
        assert_eq!(Stage::for_count(1, 1), Stage::Severe);
    }

    #[test]
    fn stage_selects_sound() {
        let sounds = SoundConfig {
            alert1: PathBuf::from("mild.mp3"),
            alert2: PathBuf::from("severe.mp3"),
        };
        assert_eq!(Stage::Mild.sound(&sounds), Path::new("mild.mp3"));
        assert_eq!(Stage::Severe.sound(&sounds), Path::new("severe.mp3"));
        assert!(!Stage::Mild.notifies_remote());
        assert!(Stage::Severe.notifies_remote());
        assert_eq!(Stage::Severe.number(), 2);
    }
}
