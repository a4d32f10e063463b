//! Prompt text for the sales, prospect and assessor roles.

use ringside_core::domain::profile::{
    BigFiveTraits, Intent, ObjectionType, ProspectProfile, ReadinessLevel,
};

use crate::llm::ChatMessage;

/// Fixed first sales turn; never sent to the model and recorded with zero tokens.
pub const SALES_OPENING: &str = "Hi! Thanks for reaching out about our boxing fitness gym. \
To match you with the right class I have a few quick questions:

1. What's your main fitness goal? (weight loss, stress relief, learning technique, general fitness, etc.)
2. How often do you exercise right now?
3. Any concerns about high-intensity training?

Looking forward to getting you started!";

/// Sent to the sales agent once, after the dialogue closes.
pub const INTENT_REQUEST: &str = "Based on our conversation, please provide your \
INTENT_DETECTION assessment in the required JSON format.";

pub const ASSESSOR_SYSTEM: &str =
    "You are a conversation analyzer. Return only valid JSON.";

/// Entries of sales-side history shown to the assessor.
pub const ASSESSMENT_WINDOW: usize = 6;

pub fn sales_system_prompt() -> String {
    format!(
        r#"You are a friendly sales assistant for a group fitness boxing gym. A prospect filled out a web form. Qualify them and get them to book a free class.

GYM INFO:
- 45-minute classes: 5 rounds of strength and 5 rounds of boxing, 3 minutes each
- Schedule: weekday mornings and evenings, weekend mornings
- High energy with curated playlists
- Gloves and wraps provided for the free class
- High intensity, not suited to complete beginners

GOALS:
1. Work out their primary fitness goal
2. Get them to agree to a free class

CONVERSATION RULES:
- Keep replies to 2-3 sentences
- Ask for the free class booking early and address hesitation directly
- If they need more time, offer a follow-up from a sales associate within 24 hours
- If they clearly decline, acknowledge politely
- If they agree, ask for their preferred time (morning, evening or weekend)
- You already have their phone number and email from the web form
- You do not decide when the conversation ends; reply naturally to every message

QUALIFICATION:
- Check whether they already exercise regularly
- Judge their PRIMARY intent by emphasis: the topic they ask about repeatedly outweighs the one they mention first

INTENT DETECTION:
Never include structured data in normal chat. Only when you receive exactly this message:
"{INTENT_REQUEST}"
reply in this format:

INTENT_DETECTION:
{{
  "detected_intent": "one of: weight_loss, stress_relief_mental_health, learn_boxing_technique, general_fitness, social_community, just_wants_free_class",
  "confidence_level": 0.0-1.0,
  "reasoning": "short explanation grounded in what they emphasized",
  "best_time_to_visit": "morning/evening/weekend or null"
}}

Be warm and helpful, but move quickly to booking."#
    )
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TraitBand {
    Low,
    Medium,
    High,
}

impl TraitBand {
    pub fn for_score(score: u8) -> Self {
        match score {
            0..=3 => Self::Low,
            4..=7 => Self::Medium,
            _ => Self::High,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Low => "LOW",
            Self::Medium => "MEDIUM",
            Self::High => "HIGH",
        }
    }
}

fn trait_description(name: &str, band: TraitBand) -> &'static str {
    match (name, band) {
        ("openness", TraitBand::Low) => "Prefers routines, skeptical of trends",
        ("openness", TraitBand::Medium) => "Open to reasonable new things",
        ("openness", TraitBand::High) => "Eager to try new approaches",
        ("conscientiousness", TraitBand::Low) => "Spontaneous, goes with the flow",
        ("conscientiousness", TraitBand::Medium) => "Organized when motivated",
        ("conscientiousness", TraitBand::High) => "Disciplined and goal-oriented",
        ("extraversion", TraitBand::Low) => "Introverted, prefers small groups",
        ("extraversion", TraitBand::Medium) => "Moderately social",
        ("extraversion", TraitBand::High) => "Outgoing, loves group activities",
        ("agreeableness", TraitBand::Low) => "Skeptical, challenges claims",
        ("agreeableness", TraitBand::Medium) => "Polite but questioning",
        ("agreeableness", TraitBand::High) => "Friendly, trusting and cooperative",
        ("neuroticism", TraitBand::Low) => "Calm, rarely worries",
        ("neuroticism", TraitBand::Medium) => "Some manageable anxiety",
        ("neuroticism", TraitBand::High) => "Anxious, worries about risks",
        _ => "",
    }
}

fn intent_description(intent: Intent) -> &'static str {
    match intent {
        Intent::WeightLoss => "You want to lose weight and get in better shape",
        Intent::StressRelief => "You want stress relief and the mental health benefits of exercise",
        Intent::BoxingTechnique => "You want to learn proper boxing technique and skills",
        Intent::GeneralFitness => "You want to improve your overall fitness",
        Intent::SocialCommunity => "You want a social community and a group fitness experience",
        Intent::JustFreeClass => "You only want the free class and have no plan to join",
    }
}

fn intent_cues(intent: Intent) -> &'static str {
    match intent {
        Intent::WeightLoss => {
            "Mention your weight, how clothes fit, wanting to slim down or drop pounds. \
             Bring up how you used to look or an upcoming event."
        }
        Intent::StressRelief => {
            "Talk about feeling stressed or overwhelmed and needing an outlet. \
             Mention work pressure, anxiety or needing to blow off steam."
        }
        Intent::BoxingTechnique => {
            "Ask about form, technique coaching and fundamentals. \
             Show interest in the skill side of boxing."
        }
        Intent::GeneralFitness => {
            "Talk about overall health, staying active or getting in shape. Keep goals broad."
        }
        Intent::SocialCommunity => {
            "Ask about class sizes, the group vibe and meeting people. \
             Care more about the people than the workout."
        }
        Intent::JustFreeClass => {
            "Stay vague about commitment and deflect questions about long-term goals. \
             Say you are just curious or want to try it once."
        }
    }
}

fn objection_description(objection: ObjectionType) -> &'static str {
    match objection {
        ObjectionType::Price => "You're concerned about the cost",
        ObjectionType::TimeCommitment => "You're worried about finding the time",
        ObjectionType::InjuryConcerns => "You're worried about getting injured",
        ObjectionType::Intimidation => "Boxing and group fitness feel intimidating to you",
        ObjectionType::LocationParking => "You have doubts about the location or parking",
        ObjectionType::JustLooking => "You're just browsing and not ready to commit",
    }
}

fn readiness_description(readiness: ReadinessLevel) -> &'static str {
    match readiness {
        ReadinessLevel::Hot => "You're very interested and ready to act soon",
        ReadinessLevel::Warm => "You're interested but want to learn more first",
        ReadinessLevel::Cold => "You're only exploring options and in no hurry",
    }
}

fn personality_lines(traits: &BigFiveTraits) -> String {
    traits
        .scores()
        .iter()
        .map(|(name, score)| {
            let band = TraitBand::for_score(*score);
            let mut label = name.to_string();
            if let Some(first) = label.get_mut(0..1) {
                first.make_ascii_uppercase();
            }
            format!("- {label}: {score}/10 ({}) - {}", band.as_str(), trait_description(name, band))
        })
        .collect::<Vec<_>>()
        .join("\n")
}

pub fn prospect_system_prompt(profile: &ProspectProfile) -> String {
    let concern = match profile.objection_type {
        Some(objection) => format!("YOUR CONCERN: {}", objection_description(objection)),
        None => "You have no major objections.".to_string(),
    };

    format!(
        "You are a potential gym member who filled out a web form about a boxing fitness gym.

PERSONALITY PROFILE (Big Five):
{personality}

YOUR TRUE INTENT: {intent}

HOW TO REVEAL YOUR INTENT:
{cues}

YOUR READINESS: {readiness}

DEMOGRAPHICS:
- Age range: {age_range}
- Fitness background: {fitness_background}

{concern}

INSTRUCTIONS:
- You are texting, keep replies to 1-2 sentences
- Respond in line with your personality
- Let your intent surface through the conversation; never state it outright
- Show interest or skepticism as your traits suggest
- Raise your concerns naturally if you have any
- Never mention your personality scores",
        personality = personality_lines(&profile.big_five),
        intent = intent_description(profile.true_intent),
        cues = intent_cues(profile.true_intent),
        readiness = readiness_description(profile.readiness_level),
        age_range = profile.age_range,
        fitness_background = profile.fitness_background,
    )
}

pub fn assessment_prompt(history: &[ChatMessage], latest_prospect_text: &str) -> String {
    let window = &history[history.len().saturating_sub(ASSESSMENT_WINDOW)..];
    let history_json = serde_json::to_string_pretty(window).unwrap_or_else(|_| "[]".to_string());

    format!(
        r#"You are reviewing a sales conversation. Decide from the history and the prospect's latest reply whether the conversation should end.

CONVERSATION HISTORY:
{history_json}

PROSPECT'S LATEST RESPONSE:
"{latest_prospect_text}"

Mark "agreed_to_free_class" when the prospect shows any intent to attend:
- explicit agreement ("sure", "sounds good", "sign me up")
- naming days or times ("Tuesday evening", "mornings work")
- asking about schedules ("when's the next class?")
- logistics questions ("where are you located?", "what should I bring?")
Talking about WHEN, WHERE or HOW to attend counts as agreement. Do not wait for an explicit booking.

Mark "not_interested" only on a clear decline:
- explicit rejection ("no thanks", "not interested", "I'll pass", "not for me")
- clearly backing out after earlier interest
- strong hesitation with no forward movement

Otherwise mark "continue", including when the prospect:
- asks about the gym or classes without touching on booking
- has not engaged with booking yet
- needs more information before deciding

"should_end" is true for agreed_to_free_class and not_interested, false for continue.

Return ONLY JSON in this format:
{{
  "should_end": true or false,
  "outcome": "agreed_to_free_class" or "not_interested" or "continue",
  "reasoning": "short explanation"
}}"#
    )
}
