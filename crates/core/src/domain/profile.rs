use std::fmt;

use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::errors::DomainError;

pub const TRAIT_SCORE_MIN: u8 = 1;
pub const TRAIT_SCORE_MAX: u8 = 10;

pub const AGE_RANGES: [&str; 5] = ["18-25", "25-35", "35-45", "45-55", "55+"];
pub const FITNESS_BACKGROUNDS: [&str; 5] =
    ["beginner", "intermediate", "advanced", "couch_to_5k", "former_athlete"];

/// Big Five personality scores on a 1..=10 scale.
///
/// Scores are validated on construction and on deserialization, so a value of this type
/// always satisfies the range invariant.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "RawTraits")]
pub struct BigFiveTraits {
    openness: u8,
    conscientiousness: u8,
    extraversion: u8,
    agreeableness: u8,
    neuroticism: u8,
}

#[derive(Deserialize)]
struct RawTraits {
    openness: u8,
    conscientiousness: u8,
    extraversion: u8,
    agreeableness: u8,
    neuroticism: u8,
}

impl TryFrom<RawTraits> for BigFiveTraits {
    type Error = DomainError;

    fn try_from(raw: RawTraits) -> Result<Self, Self::Error> {
        Self::new(
            raw.openness,
            raw.conscientiousness,
            raw.extraversion,
            raw.agreeableness,
            raw.neuroticism,
        )
    }
}

impl BigFiveTraits {
    pub fn new(
        openness: u8,
        conscientiousness: u8,
        extraversion: u8,
        agreeableness: u8,
        neuroticism: u8,
    ) -> Result<Self, DomainError> {
        let traits =
            Self { openness, conscientiousness, extraversion, agreeableness, neuroticism };
        for (name, score) in traits.scores() {
            if !(TRAIT_SCORE_MIN..=TRAIT_SCORE_MAX).contains(&score) {
                return Err(DomainError::TraitScoreOutOfRange { name, score });
            }
        }
        Ok(traits)
    }

    /// Draws every score independently and uniformly from the valid range.
    pub fn sample<R: Rng + ?Sized>(rng: &mut R) -> Self {
        let mut score = || rng.gen_range(TRAIT_SCORE_MIN..=TRAIT_SCORE_MAX);
        Self {
            openness: score(),
            conscientiousness: score(),
            extraversion: score(),
            agreeableness: score(),
            neuroticism: score(),
        }
    }

    pub fn openness(&self) -> u8 {
        self.openness
    }

    pub fn extraversion(&self) -> u8 {
        self.extraversion
    }

    pub fn scores(&self) -> [(&'static str, u8); 5] {
        [
            ("openness", self.openness),
            ("conscientiousness", self.conscientiousness),
            ("extraversion", self.extraversion),
            ("agreeableness", self.agreeableness),
            ("neuroticism", self.neuroticism),
        ]
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Intent {
    WeightLoss,
    #[serde(rename = "stress_relief_mental_health")]
    StressRelief,
    #[serde(rename = "learn_boxing_technique")]
    BoxingTechnique,
    GeneralFitness,
    SocialCommunity,
    #[serde(rename = "just_wants_free_class")]
    JustFreeClass,
}

impl Intent {
    pub const ALL: [Intent; 6] = [
        Self::WeightLoss,
        Self::StressRelief,
        Self::BoxingTechnique,
        Self::GeneralFitness,
        Self::SocialCommunity,
        Self::JustFreeClass,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::WeightLoss => "weight_loss",
            Self::StressRelief => "stress_relief_mental_health",
            Self::BoxingTechnique => "learn_boxing_technique",
            Self::GeneralFitness => "general_fitness",
            Self::SocialCommunity => "social_community",
            Self::JustFreeClass => "just_wants_free_class",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        let normalized = value.trim().to_ascii_lowercase();
        Self::ALL.into_iter().find(|intent| intent.as_str() == normalized)
    }
}

impl fmt::Display for Intent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ObjectionType {
    Price,
    TimeCommitment,
    InjuryConcerns,
    #[serde(rename = "intimidation_factor")]
    Intimidation,
    LocationParking,
    JustLooking,
}

impl ObjectionType {
    pub const ALL: [ObjectionType; 6] = [
        Self::Price,
        Self::TimeCommitment,
        Self::InjuryConcerns,
        Self::Intimidation,
        Self::LocationParking,
        Self::JustLooking,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Price => "price",
            Self::TimeCommitment => "time_commitment",
            Self::InjuryConcerns => "injury_concerns",
            Self::Intimidation => "intimidation_factor",
            Self::LocationParking => "location_parking",
            Self::JustLooking => "just_looking",
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReadinessLevel {
    Hot,
    Warm,
    Cold,
}

impl ReadinessLevel {
    pub const ALL: [ReadinessLevel; 3] = [Self::Hot, Self::Warm, Self::Cold];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Hot => "hot",
            Self::Warm => "warm",
            Self::Cold => "cold",
        }
    }
}

/// The persona a prospect agent plays for one conversation.
///
/// Created once per conversation and never mutated; `true_intent` is the ground truth the
/// sales agent's detection is scored against.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProspectProfile {
    pub big_five: BigFiveTraits,
    pub true_intent: Intent,
    pub objection_type: Option<ObjectionType>,
    pub readiness_level: ReadinessLevel,
    pub age_range: String,
    pub fitness_background: String,
}
