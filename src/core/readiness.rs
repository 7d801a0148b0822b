//! Zone-of-proximal-development readiness classification.
//!
//! Compares a learner's skill vector against an item's requirements:
//! content more than two levels beyond current ability is excluded,
//! content one level beyond is the sweet spot, and content at or below
//! current ability is flagged as already mastered.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::core::skills::{SkillName, SkillVector};

/// Categorical readiness for an item.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Readiness {
    /// Too far ahead (gap of 3 or more somewhere).
    NotReady,
    /// Challenging but possible.
    Stretch,
    /// Just beyond current ability.
    Ready,
    /// At or below current ability everywhere.
    Mastered,
}

impl Readiness {
    /// Whether the selector should consider items in this category.
    pub fn is_selectable(&self) -> bool {
        matches!(self, Readiness::Ready | Readiness::Stretch)
    }
}

/// Classify readiness from per-skill requirements.
///
/// Pure function of its inputs. Items without requirements are entry-level
/// and always `Ready`.
pub fn compute_readiness(
    skills: &SkillVector,
    requirements: &BTreeMap<SkillName, u8>,
) -> Readiness {
    if requirements.is_empty() {
        return Readiness::Ready;
    }

    let gaps: Vec<i32> = requirements
        .iter()
        .map(|(skill, required)| *required as i32 - skills.get(*skill) as i32)
        .collect();

    let max_gap = gaps.iter().copied().max().unwrap_or(0);
    let avg_gap = gaps.iter().sum::<i32>() as f64 / gaps.len() as f64;

    if max_gap > 2 {
        Readiness::NotReady
    } else if max_gap == 2 || avg_gap > 1.0 {
        Readiness::Stretch
    } else if max_gap <= 0 && avg_gap <= 0.0 {
        Readiness::Mastered
    } else {
        Readiness::Ready
    }
}
