//! Tier gating rules.

use serde::Serialize;

use crate::{
    catalogue::{Catalogue, CulturalGuideline, Tier, TierId, UnlockRequirements},
    progress::UserProgress,
};

/// A requirement the learner has not met yet.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum MissingRequirement {
    Points {
        required: u32,
        current: u32,
        missing: u32,
    },
    PreviousTier {
        required: TierId,
        message: String,
    },
    CulturalAcknowledgment {
        required: TierId,
        message: String,
    },
}

/// Every unmet requirement of `tier`, in points / prerequisite / acknowledgment order.
pub fn missing_requirements(progress: &UserProgress, tier: &Tier) -> Vec<MissingRequirement> {
    let requirements = &tier.requirements;
    let mut missing = Vec::new();

    if progress.total_points < requirements.min_points {
        missing.push(MissingRequirement::Points {
            required: requirements.min_points,
            current: progress.total_points,
            missing: requirements.min_points - progress.total_points,
        });
    }

    if let Some(previous) = requirements.prerequisite_tier {
        if !progress.is_unlocked(previous) {
            missing.push(MissingRequirement::PreviousTier {
                required: previous,
                message: format!("Must complete Tier {previous} first"),
            });
        }
    }

    if requirements.requires_cultural_ack && !progress.has_acknowledged(tier.id) {
        missing.push(MissingRequirement::CulturalAcknowledgment {
            required: tier.id,
            message: "Must acknowledge cultural sensitivity guidelines".to_string(),
        });
    }

    missing
}

/// Unlock every locked tier whose requirements are met.
///
/// Tiers are visited in ascending id order, so unlocking one tier within the
/// pass satisfies the prerequisite of the next. Returns the newly unlocked ids.
pub fn unlock_eligible_tiers(progress: &mut UserProgress, catalogue: &Catalogue) -> Vec<TierId> {
    let mut unlocked = Vec::new();

    for tier in catalogue.tiers() {
        if progress.is_unlocked(tier.id) {
            continue;
        }
        if missing_requirements(progress, tier).is_empty() {
            progress.unlocked_tiers.insert(tier.id);
            unlocked.push(tier.id);
        }
    }

    unlocked
}

/// Read-only answer to "can this learner unlock this tier?".
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UnlockCheck {
    pub tier_id: TierId,
    pub tier_name: String,
    pub can_unlock: bool,
    pub already_unlocked: bool,
    pub requirements: UnlockRequirements,
    /// Every unmet requirement, empty when `can_unlock`
    pub missing_requirements: Vec<MissingRequirement>,
    /// The tier's guidelines, for display before acknowledging
    pub cultural_info: Option<CulturalGuideline>,
}

/// Evaluate `tier` against `progress` without changing anything.
pub fn check_unlock(progress: &UserProgress, tier: &Tier) -> UnlockCheck {
    let missing = missing_requirements(progress, tier);

    UnlockCheck {
        tier_id: tier.id,
        tier_name: tier.name.clone(),
        can_unlock: missing.is_empty(),
        already_unlocked: progress.is_unlocked(tier.id),
        requirements: tier.requirements,
        missing_requirements: missing,
        cultural_info: tier.cultural_guidelines.clone(),
    }
}
