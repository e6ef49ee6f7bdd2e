//! Badge identifiers and their display metadata.

use serde::Serialize;

use crate::progress::UserProgress;

/// Given to every new record.
pub const NEWCOMER: &str = "newcomer";
/// First word favorited.
pub const FIRST_FAVORITE: &str = "first_favorite";
/// First quiz recorded.
pub const FIRST_QUIZ: &str = "first_quiz";
/// A tier unlocked through learning events.
pub const TIER_MASTER: &str = "tier_master";
/// Tenth quiz recorded.
pub const QUIZ_MASTER: &str = "quiz_master";
/// Seven day streak. Listed for display; no event awards it.
pub const WEEK_WARRIOR: &str = "week_warrior";
/// Compliment words mastered. Listed for display; no event awards it.
pub const COMPLIMENT_KING: &str = "compliment_king";

/// Number of recorded quizzes that earns [`QUIZ_MASTER`].
pub const QUIZ_MASTER_COUNT: usize = 10;

/// Badge awarded on reaching `level`.
pub fn level_badge(level: u32) -> String {
    format!("level_{level}")
}

/// Static display data of a named badge.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BadgeDefinition {
    pub id: &'static str,
    pub name: &'static str,
    pub icon: &'static str,
    pub description: &'static str,
}

/// Badges with dedicated descriptions. `level_N` badges are described
/// generically by [`describe`].
pub const BADGES: &[BadgeDefinition] = &[
    BadgeDefinition {
        id: NEWCOMER,
        name: "Welcome!",
        icon: "🎯",
        description: "Started your Somali journey",
    },
    BadgeDefinition {
        id: FIRST_FAVORITE,
        name: "First Love",
        icon: "💝",
        description: "Favorited your first word",
    },
    BadgeDefinition {
        id: FIRST_QUIZ,
        name: "Quiz Starter",
        icon: "🧠",
        description: "Completed your first quiz",
    },
    BadgeDefinition {
        id: "level_2",
        name: "Rising Scholar",
        icon: "📚",
        description: "Reached Level 2",
    },
    BadgeDefinition {
        id: "level_3",
        name: "Dedicated Learner",
        icon: "🌟",
        description: "Reached Level 3",
    },
    BadgeDefinition {
        id: "level_5",
        name: "Somali Speaker",
        icon: "🗣️",
        description: "Reached Level 5",
    },
    BadgeDefinition {
        id: TIER_MASTER,
        name: "Tier Climber",
        icon: "🏔️",
        description: "Unlocked a new tier",
    },
    BadgeDefinition {
        id: QUIZ_MASTER,
        name: "Quiz Champion",
        icon: "🏆",
        description: "Completed 10 quizzes",
    },
    BadgeDefinition {
        id: WEEK_WARRIOR,
        name: "Week Warrior",
        icon: "🔥",
        description: "7-day learning streak",
    },
    BadgeDefinition {
        id: COMPLIMENT_KING,
        name: "Compliment King/Queen",
        icon: "👑",
        description: "Mastered compliment words",
    },
];

/// A badge as shown to the learner.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BadgeView {
    pub id: String,
    pub name: String,
    pub icon: String,
    pub description: String,
    pub earned: bool,
}

/// Earned and still available badges of one learner.
#[derive(Debug, Clone, Serialize)]
pub struct BadgeBoard {
    pub user_id: String,
    pub earned_badges: Vec<BadgeView>,
    pub available_badges: Vec<BadgeView>,
    pub total_earned: usize,
}

/// Describe a badge id. Level badges without a dedicated definition get a
/// generic description; any other unknown id yields `None`.
pub fn describe(id: &str, earned: bool) -> Option<BadgeView> {
    if let Some(def) = BADGES.iter().find(|b| b.id == id) {
        return Some(BadgeView {
            id: def.id.to_string(),
            name: def.name.to_string(),
            icon: def.icon.to_string(),
            description: def.description.to_string(),
            earned,
        });
    }

    let level: u32 = id.strip_prefix("level_")?.parse().ok()?;
    Some(BadgeView {
        id: id.to_string(),
        name: format!("Level {level}"),
        icon: "⭐".to_string(),
        description: format!("Reached Level {level}"),
        earned,
    })
}

/// Split the badge catalogue into earned and still available badges.
pub fn badge_board(progress: &UserProgress) -> BadgeBoard {
    let earned_badges: Vec<BadgeView> = progress
        .badges_earned
        .iter()
        .filter_map(|id| describe(id, true))
        .collect();

    let available_badges = BADGES
        .iter()
        .filter(|def| !progress.has_badge(def.id))
        .filter_map(|def| describe(def.id, false))
        .collect();

    BadgeBoard {
        user_id: progress.user_id.clone(),
        total_earned: earned_badges.len(),
        earned_badges,
        available_badges,
    }
}
