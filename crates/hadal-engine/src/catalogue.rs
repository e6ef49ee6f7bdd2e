//! Static vocabulary catalogue and tier ladder.
//!
//! Words are seeded once from `data/vocabulary.json` and never mutated
//! afterwards. Tiers are ordered by id and each tier may only depend on a tier
//! with a smaller id, which lets the unlock pass run in a single ascending
//! sweep.

use std::{fmt, str::FromStr};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::EngineError;

/// Tier identifier, starting at 1.
pub type TierId = u32;

/// The tier every learner starts with.
pub const STARTING_TIER: TierId = 1;

const VOCABULARY_JSON: &str = include_str!("../data/vocabulary.json");

/// Word category
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Category {
    Basic,
    Greetings,
    CuteTease,
    Compliments,
    DeepTalk,
}

impl Category {
    /// Every category, in display order.
    pub const ALL: [Self; 5] = [
        Self::Basic,
        Self::Greetings,
        Self::CuteTease,
        Self::Compliments,
        Self::DeepTalk,
    ];

    /// Snake case name used in URLs and storage.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Basic => "basic",
            Self::Greetings => "greetings",
            Self::CuteTease => "cute_tease",
            Self::Compliments => "compliments",
            Self::DeepTalk => "deep_talk",
        }
    }

    /// Human readable name shown in category listings
    pub const fn display_name(self) -> &'static str {
        match self {
            Self::Basic => "Basic",
            Self::Greetings => "Greetings",
            Self::CuteTease => "Cute Tease",
            Self::Compliments => "Compliments",
            Self::DeepTalk => "Deep Talk",
        }
    }

    /// Emoji shown next to the category.
    pub const fn icon(self) -> &'static str {
        match self {
            Self::Basic => "🌟",
            Self::Greetings => "👋",
            Self::CuteTease => "😊",
            Self::Compliments => "💝",
            Self::DeepTalk => "💭",
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Category {
    type Err = EngineError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_lowercase();
        Self::ALL
            .into_iter()
            .find(|c| c.as_str() == normalized)
            .ok_or_else(|| {
                EngineError::InvalidArgument(format!(
                    "Invalid category: '{s}'. Expected one of basic, greetings, cute_tease, compliments, deep_talk"
                ))
            })
    }
}

/// Word difficulty
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Difficulty {
    Beginner,
    Intermediate,
    Advanced,
}

impl Difficulty {
    /// Snake case name, as serialized.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Beginner => "beginner",
            Self::Intermediate => "intermediate",
            Self::Advanced => "advanced",
        }
    }
}

/// A vocabulary entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Word {
    /// `word_N`, assigned in seed order
    pub id: String,
    /// Somali text
    pub somali: String,
    /// English translation, also the correct quiz answer
    pub english: String,
    /// English-based pronunciation guide
    pub phonetic: String,
    pub category: Category,
    pub tier: TierId,
    /// Example sentence using the word
    pub example_somali: String,
    pub example_english: String,
    /// "DO:" or "DON'T:" usage guidance
    pub cultural_tip: String,
    pub difficulty: Difficulty,
    #[serde(default)]
    pub tags: Vec<String>,
    /// Suggested points for completing the word
    pub points: u32,
    /// Sensitive words require a cultural popup on the client
    #[serde(default)]
    pub is_sensitive: bool,
    #[serde(default)]
    pub audio_cache_key: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl Word {
    /// Case-insensitive substring match over the Somali text, translation and
    /// phonetic guide, or an exact (case-insensitive) tag match.
    pub fn matches_query(&self, query: &str) -> bool {
        let needle = query.trim().to_lowercase();
        if needle.is_empty() {
            return false;
        }

        self.somali.to_lowercase().contains(&needle)
            || self.english.to_lowercase().contains(&needle)
            || self.phonetic.to_lowercase().contains(&needle)
            || self.tags.iter().any(|t| t.to_lowercase() == needle)
    }
}

/// Shape of an entry in the bundled vocabulary file.
#[derive(Debug, Deserialize)]
struct SeedWord {
    somali: String,
    english: String,
    phonetic: String,
    category: Category,
    tier: TierId,
    example_somali: String,
    example_english: String,
    cultural_tip: String,
    difficulty: Difficulty,
    #[serde(default)]
    tags: Vec<String>,
    points: u32,
    #[serde(default)]
    is_sensitive: bool,
}

/// Conditions that must all hold before a tier unlocks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct UnlockRequirements {
    /// Total points the learner must have
    pub min_points: u32,
    /// Tier that must already be unlocked
    pub prerequisite_tier: Option<TierId>,
    /// Whether the tier's guidelines must be acknowledged first
    pub requires_cultural_ack: bool,
}

impl UnlockRequirements {
    /// Points only.
    pub const fn points(min_points: u32) -> Self {
        Self {
            min_points,
            prerequisite_tier: None,
            requires_cultural_ack: false,
        }
    }

    /// Also require `tier` to be unlocked.
    pub const fn after(mut self, tier: TierId) -> Self {
        self.prerequisite_tier = Some(tier);
        self
    }

    /// Also require a cultural acknowledgment.
    pub const fn with_cultural_ack(mut self) -> Self {
        self.requires_cultural_ack = true;
        self
    }
}

/// How culturally delicate the content of a tier is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CulturalLevel {
    Basic,
    Intermediate,
    Advanced,
    Sensitive,
}

/// Guidance a learner must acknowledge before entering a sensitive tier.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CulturalGuideline {
    pub title: String,
    pub content: String,
    pub warning: String,
}

/// One rung of the learning ladder.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tier {
    pub id: TierId,
    pub name: String,
    pub description: String,
    pub requirements: UnlockRequirements,
    /// Number of words the tier is designed to hold
    pub word_count: u32,
    pub cultural_level: CulturalLevel,
    pub color_theme: String,
    /// Present on tiers that need an acknowledgment
    pub cultural_guidelines: Option<CulturalGuideline>,
}

impl Tier {
    /// Whether the tier carries cultural guidelines.
    pub const fn has_cultural_content(&self) -> bool {
        self.cultural_guidelines.is_some()
    }
}

/// The validated tier ladder together with the bundled vocabulary.
#[derive(Debug, Clone)]
pub struct Catalogue {
    tiers: Vec<Tier>,
}

impl Catalogue {
    /// Build a catalogue from tier definitions.
    ///
    /// Tiers are sorted by id. Ids must be unique, start at 1 and every
    /// prerequisite must point at an existing tier with a smaller id.
    pub fn new(mut tiers: Vec<Tier>) -> Result<Self, EngineError> {
        tiers.sort_by_key(|t| t.id);

        if tiers.first().map(|t| t.id) != Some(STARTING_TIER) {
            return Err(EngineError::Catalogue(format!(
                "tier ladder must start at tier {STARTING_TIER}"
            )));
        }

        for (index, tier) in tiers.iter().enumerate() {
            if index > 0 && tiers[index - 1].id == tier.id {
                return Err(EngineError::Catalogue(format!(
                    "duplicate tier id {}",
                    tier.id
                )));
            }

            if let Some(prerequisite) = tier.requirements.prerequisite_tier {
                if prerequisite >= tier.id {
                    return Err(EngineError::Catalogue(format!(
                        "tier {} cannot require tier {prerequisite}",
                        tier.id
                    )));
                }
                if !tiers.iter().any(|t| t.id == prerequisite) {
                    return Err(EngineError::Catalogue(format!(
                        "tier {} requires unknown tier {prerequisite}",
                        tier.id
                    )));
                }
            }
        }

        Ok(Self { tiers })
    }

    /// The five-tier Somali ladder.
    pub fn standard() -> Result<Self, EngineError> {
        Self::new(standard_tiers())
    }

    /// All tiers in ascending id order.
    pub fn tiers(&self) -> &[Tier] {
        &self.tiers
    }

    /// Tier `id`, if it exists.
    pub fn tier(&self, id: TierId) -> Option<&Tier> {
        self.tiers.iter().find(|t| t.id == id)
    }

    /// Tier `id`, or `NotFound`.
    pub fn require_tier(&self, id: TierId) -> Result<&Tier, EngineError> {
        self.tier(id)
            .ok_or_else(|| EngineError::NotFound(format!("Tier {id} not found")))
    }

    /// Parse the bundled vocabulary, assigning ids `word_1..word_N` in file order.
    pub fn vocabulary(&self, now: DateTime<Utc>) -> Result<Vec<Word>, EngineError> {
        let seeds: Vec<SeedWord> = serde_json::from_str(VOCABULARY_JSON)
            .map_err(|e| EngineError::Catalogue(format!("invalid vocabulary data: {e}")))?;

        seeds
            .into_iter()
            .enumerate()
            .map(|(index, seed)| {
                if self.tier(seed.tier).is_none() {
                    return Err(EngineError::Catalogue(format!(
                        "word '{}' references unknown tier {}",
                        seed.somali, seed.tier
                    )));
                }
                if seed.points == 0 {
                    return Err(EngineError::Catalogue(format!(
                        "word '{}' must be worth at least one point",
                        seed.somali
                    )));
                }

                Ok(Word {
                    id: format!("word_{}", index + 1),
                    somali: seed.somali,
                    english: seed.english,
                    phonetic: seed.phonetic,
                    category: seed.category,
                    tier: seed.tier,
                    example_somali: seed.example_somali,
                    example_english: seed.example_english,
                    cultural_tip: seed.cultural_tip,
                    difficulty: seed.difficulty,
                    tags: seed.tags,
                    points: seed.points,
                    is_sensitive: seed.is_sensitive,
                    audio_cache_key: None,
                    created_at: now,
                })
            })
            .collect()
    }
}

fn standard_tiers() -> Vec<Tier> {
    vec![
        Tier {
            id: 1,
            name: "Soo Booqo Starter".to_string(),
            description: "Essential greetings and basic politeness".to_string(),
            requirements: UnlockRequirements::points(0),
            word_count: 8,
            cultural_level: CulturalLevel::Basic,
            color_theme: "green".to_string(),
            cultural_guidelines: None,
        },
        Tier {
            id: 2,
            name: "Salaan Smooth".to_string(),
            description: "Compliments and building connections".to_string(),
            requirements: UnlockRequirements::points(80).after(1),
            word_count: 5,
            cultural_level: CulturalLevel::Intermediate,
            color_theme: "blue".to_string(),
            cultural_guidelines: None,
        },
        Tier {
            id: 3,
            name: "Wadahadal Wizard".to_string(),
            description: "Deeper conversation and mutual interest".to_string(),
            requirements: UnlockRequirements::points(155).after(2),
            word_count: 4,
            cultural_level: CulturalLevel::Intermediate,
            color_theme: "purple".to_string(),
            cultural_guidelines: None,
        },
        Tier {
            id: 4,
            name: "Jacayl Journey".to_string(),
            description: "Romantic expressions and emotional depth".to_string(),
            requirements: UnlockRequirements::points(235).after(3).with_cultural_ack(),
            word_count: 3,
            cultural_level: CulturalLevel::Sensitive,
            color_theme: "pink".to_string(),
            cultural_guidelines: Some(CulturalGuideline {
                title: "Entering Romantic Territory".to_string(),
                content: "You're about to access phrases that express deep romantic feelings. \
                          In Somali culture, these words carry significant weight and should be \
                          used with genuine intention and respect for the recipient's feelings."
                    .to_string(),
                warning: "These expressions are taken seriously and can create expectations. \
                          Use them only when your feelings are sincere."
                    .to_string(),
            }),
        },
        Tier {
            id: 5,
            name: "Smooth Talker Pro".to_string(),
            description: "Advanced poetic romance and commitment".to_string(),
            requirements: UnlockRequirements::points(310).after(4).with_cultural_ack(),
            word_count: 3,
            cultural_level: CulturalLevel::Sensitive,
            color_theme: "orange".to_string(),
            cultural_guidelines: Some(CulturalGuideline {
                title: "Advanced Romantic Expressions".to_string(),
                content: "These are sophisticated, poetic expressions of love used by fluent \
                          speakers. They require understanding of cultural context and should \
                          only be used in appropriate romantic relationships."
                    .to_string(),
                warning: "Misuse of these phrases can be seen as playing with someone's \
                          emotions, which is strongly discouraged in Somali culture."
                    .to_string(),
            }),
        },
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_standard_catalogue_is_ordered() {
        let catalogue = Catalogue::standard().unwrap();
        let ids: Vec<TierId> = catalogue.tiers().iter().map(|t| t.id).collect();
        assert_eq!(ids, vec![1, 2, 3, 4, 5]);
        assert!(catalogue.tier(4).unwrap().has_cultural_content());
        assert!(!catalogue.tier(2).unwrap().has_cultural_content());
    }

    #[test]
    fn test_forward_prerequisite_is_rejected() {
        let mut tiers = standard_tiers();
        tiers[1].requirements.prerequisite_tier = Some(3);
        assert!(matches!(
            Catalogue::new(tiers),
            Err(EngineError::Catalogue(_))
        ));
    }

    #[test]
    fn test_ladder_must_start_at_one() {
        let tiers = standard_tiers().into_iter().skip(1).collect();
        assert!(Catalogue::new(tiers).is_err());
    }

    #[test]
    fn test_vocabulary_per_tier_counts() {
        let catalogue = Catalogue::standard().unwrap();
        let words = catalogue.vocabulary(Utc::now()).unwrap();
        assert_eq!(words.len(), 23);
        assert_eq!(words[0].id, "word_1");
        assert_eq!(words[22].id, "word_23");

        for tier in catalogue.tiers() {
            let count = words.iter().filter(|w| w.tier == tier.id).count();
            assert_eq!(count as u32, tier.word_count, "tier {}", tier.id);
        }
    }

    #[test]
    fn test_matches_query() {
        let catalogue = Catalogue::standard().unwrap();
        let words = catalogue.vocabulary(Utc::now()).unwrap();
        let thanks = words.iter().find(|w| w.english == "Thank you").unwrap();

        assert!(thanks.matches_query("mahad"));
        assert!(thanks.matches_query("THANK"));
        assert!(thanks.matches_query("Gratitude"));
        assert!(!thanks.matches_query("gratit"));
        assert!(!thanks.matches_query("   "));
    }

    #[test]
    fn test_category_from_str() {
        assert_eq!("cute_tease".parse::<Category>().unwrap(), Category::CuteTease);
        assert_eq!(" Greetings ".parse::<Category>().unwrap(), Category::Greetings);
        assert!("romance".parse::<Category>().is_err());
    }
}
