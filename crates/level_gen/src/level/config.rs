//! Generation configuration and per-call request.
use std::time::Instant;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::content::Weight;
use crate::error::{Error, Result};

/// Tunables shared by every level a generator builds.
#[non_exhaustive]
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct GenerationConfig {
    /// Grid edge length for level 1.
    pub level_one_grid_size: usize,
    /// Edge length added per growth step.
    pub grid_size_increment: usize,
    /// Number of levels sharing one grid size.
    pub increment_step: u32,
    /// Axis distance a connection point pair must exceed on both axes to be split.
    pub split_threshold: i32,
    /// Cluster side length below which the side counts as small.
    pub small_side_threshold: i32,
    /// Upper bound on partition passes before giving up.
    pub max_partition_passes: usize,
    /// Extra attempts granted to a content source that reuses an item id.
    pub content_retry_limit: usize,
}

impl Default for GenerationConfig {
    fn default() -> Self {
        Self {
            level_one_grid_size: 10,
            grid_size_increment: 2,
            increment_step: 3,
            split_threshold: 4,
            small_side_threshold: 4,
            max_partition_passes: 32,
            content_retry_limit: 3,
        }
    }
}

impl GenerationConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_level_one_grid_size(mut self, size: usize) -> Self {
        self.level_one_grid_size = size;
        self
    }

    /// Sets how the grid grows: `increment` cells every `step` levels.
    pub fn with_growth(mut self, increment: usize, step: u32) -> Self {
        self.grid_size_increment = increment;
        self.increment_step = step;
        self
    }

    pub fn with_split_threshold(mut self, threshold: i32) -> Self {
        self.split_threshold = threshold;
        self
    }

    pub fn with_small_side_threshold(mut self, threshold: i32) -> Self {
        self.small_side_threshold = threshold;
        self
    }

    pub fn with_max_partition_passes(mut self, passes: usize) -> Self {
        self.max_partition_passes = passes;
        self
    }

    pub fn with_content_retry_limit(mut self, limit: usize) -> Self {
        self.content_retry_limit = limit;
        self
    }

    /// Grid edge length for `level_number` (1-based).
    pub fn grid_size_for_level(&self, level_number: u32) -> usize {
        let steps = level_number.saturating_sub(1) / self.increment_step.max(1);
        self.level_one_grid_size + steps as usize * self.grid_size_increment
    }

    /// Validates the configuration, returning an error if invalid.
    pub fn validate(&self) -> Result<()> {
        if self.level_one_grid_size < 2 {
            return Err(Error::InvalidConfig(
                "level_one_grid_size must be >= 2".into(),
            ));
        }
        if self.increment_step == 0 {
            return Err(Error::InvalidConfig("increment_step must be > 0".into()));
        }
        if self.split_threshold < 3 {
            return Err(Error::InvalidConfig("split_threshold must be >= 3".into()));
        }
        if self.small_side_threshold < 1 {
            return Err(Error::InvalidConfig(
                "small_side_threshold must be > 0".into(),
            ));
        }
        if self.max_partition_passes == 0 {
            return Err(Error::InvalidConfig(
                "max_partition_passes must be > 0".into(),
            ));
        }
        Ok(())
    }
}

/// Inputs for generating one level.
#[derive(Debug, Clone, PartialEq)]
pub struct LevelRequest {
    pub level_number: u32,
    pub player_weight: Weight,
    pub player_luck: f64,
    /// Generation is abandoned with [`Error::DeadlineExceeded`] once this passes.
    pub deadline: Option<Instant>,
}

impl LevelRequest {
    pub fn new(level_number: u32, player_weight: Weight) -> Self {
        Self {
            level_number,
            player_weight,
            player_luck: 0.0,
            deadline: None,
        }
    }

    pub fn with_luck(mut self, luck: f64) -> Self {
        self.player_luck = luck;
        self
    }

    pub fn with_deadline(mut self, deadline: Instant) -> Self {
        self.deadline = Some(deadline);
        self
    }

    pub fn validate(&self) -> Result<()> {
        if self.level_number == 0 {
            return Err(Error::InvalidConfig("level_number must be >= 1".into()));
        }
        if !self.player_luck.is_finite() {
            return Err(Error::InvalidConfig("player_luck must be finite".into()));
        }
        Ok(())
    }

    /// Fails once the deadline has passed.
    pub(crate) fn check_deadline(&self) -> Result<()> {
        match self.deadline {
            Some(deadline) if Instant::now() >= deadline => Err(Error::DeadlineExceeded),
            _ => Ok(()),
        }
    }
}
