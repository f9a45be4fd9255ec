//! Random non-overlapping placement of display items.
//!
//! Coordinates are item centers in percent of the display area. Candidates are
//! drawn inside a margin of half an item on each side and accepted once they
//! keep `SPACING_FACTOR` item-widths away from everything already placed.
//! When an item cannot be placed within `MAX_ATTEMPTS` draws it is placed at
//! one more random candidate regardless of overlap.

use log::warn;
use rand::Rng;
use serde::{Deserialize, Serialize};
use trialrig_core::{ConfigError, Position};

pub const MAX_ATTEMPTS: usize = 1000;
pub const SPACING_FACTOR: f64 = 1.2;

/// Item centers for one display, generated once per trial
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Placement {
    pub positions: Vec<Position>,
    /// Items placed without meeting the spacing constraint.
    pub relaxed: usize,
}

impl Placement {
    /// Caller-supplied positions, used verbatim.
    pub fn explicit(positions: Vec<Position>) -> Self {
        Self {
            positions,
            relaxed: 0,
        }
    }

    pub fn len(&self) -> usize {
        self.positions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.positions.is_empty()
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PlacementEngine {
    item_width_pct: f64,
    item_height_pct: f64,
    min_spacing: f64,
}

impl PlacementEngine {
    pub fn new(item_size: f64, area_width: f64, area_height: f64) -> Result<Self, ConfigError> {
        let valid = |v: f64| v.is_finite() && v > 0.0;
        if !(valid(item_size) && valid(area_width) && valid(area_height)) {
            return Err(ConfigError::InvalidArea {
                size: item_size,
                width: area_width,
                height: area_height,
            });
        }
        let item_width_pct = item_size / area_width * 100.0;
        let item_height_pct = item_size / area_height * 100.0;
        Ok(Self {
            item_width_pct,
            item_height_pct,
            min_spacing: item_width_pct.max(item_height_pct) * SPACING_FACTOR,
        })
    }

    /// Minimum center-to-center distance, in percent.
    pub fn min_spacing(&self) -> f64 {
        self.min_spacing
    }

    pub fn generate<R: Rng + ?Sized>(&self, count: usize, rng: &mut R) -> Placement {
        let mut positions: Vec<Position> = Vec::with_capacity(count);
        let mut relaxed = 0;

        for index in 0..count {
            let placed = (0..MAX_ATTEMPTS)
                .map(|_| self.candidate(rng))
                .find(|c| positions.iter().all(|p| c.distance(p) >= self.min_spacing));

            let position = match placed {
                Some(position) => position,
                None => {
                    warn!(
                        "item {index}: no free spot after {MAX_ATTEMPTS} attempts (spacing {:.1}%), placing with overlap",
                        self.min_spacing
                    );
                    relaxed += 1;
                    self.candidate(rng)
                }
            };
            positions.push(position);
        }

        Placement { positions, relaxed }
    }

    fn candidate<R: Rng + ?Sized>(&self, rng: &mut R) -> Position {
        let x = self.item_width_pct / 2.0 + rng.random::<f64>() * (100.0 - self.item_width_pct);
        let y = self.item_height_pct / 2.0 + rng.random::<f64>() * (100.0 - self.item_height_pct);
        Position::new(x, y)
    }
}

/// Places `count` items of `item_size` in an `area_width` x `area_height` area.
pub fn generate<R: Rng + ?Sized>(
    count: usize,
    item_size: f64,
    area_width: f64,
    area_height: f64,
    rng: &mut R,
) -> Result<Placement, ConfigError> {
    Ok(PlacementEngine::new(item_size, area_width, area_height)?.generate(count, rng))
}
