//! Duel configuration.

#[cfg(feature = "serialization")]
use thiserror::Error;

use crate::flags::DuelFlags;

/// Per-duel settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serialization", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serialization", serde(default))]
pub struct DuelOptions {
    /// Seed for coin, dice and shuffle results.
    pub seed: u64,
    pub starting_lp: i32,
    pub start_hand: u32,
    pub draw_count: u32,
    pub flags: DuelFlags,
}

impl Default for DuelOptions {
    fn default() -> Self {
        Self {
            seed: 0,
            starting_lp: 8000,
            start_hand: 5,
            draw_count: 1,
            flags: DuelFlags::empty(),
        }
    }
}

#[cfg(feature = "serialization")]
#[derive(Debug, Error)]
pub enum OptionsError {
    #[error("invalid duel options: {0}")]
    Json(#[from] serde_json::Error),
}

impl DuelOptions {
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    pub fn with_flags(mut self, flags: DuelFlags) -> Self {
        self.flags |= flags;
        self
    }

    /// Parse options from JSON; missing fields keep their defaults.
    #[cfg(feature = "serialization")]
    pub fn from_json(json: &str) -> Result<Self, OptionsError> {
        Ok(serde_json::from_str(json)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let opts = DuelOptions::default();
        assert_eq!(opts.starting_lp, 8000);
        assert_eq!(opts.start_hand, 5);
        assert_eq!(opts.draw_count, 1);
        assert!(opts.flags.is_empty());
    }

    #[cfg(feature = "serialization")]
    #[test]
    fn test_from_json_partial() {
        let opts = DuelOptions::from_json(r#"{"seed": 42, "starting_lp": 4000}"#).unwrap();
        assert_eq!(opts.seed, 42);
        assert_eq!(opts.starting_lp, 4000);
        assert_eq!(opts.draw_count, 1);
    }

    #[cfg(feature = "serialization")]
    #[test]
    fn test_from_json_rejects_garbage() {
        assert!(DuelOptions::from_json("not json").is_err());
    }
}
