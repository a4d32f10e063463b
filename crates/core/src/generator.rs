use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::domain::profile::{
    BigFiveTraits, Intent, ObjectionType, ProspectProfile, ReadinessLevel, AGE_RANGES,
    FITNESS_BACKGROUNDS,
};

/// Draws randomized prospect personas.
///
/// Every field is sampled independently and uniformly. The objection slot includes an
/// explicit "no objection" outcome with the same weight as each named objection.
#[derive(Debug)]
pub struct ProfileGenerator<R = StdRng> {
    rng: R,
}

impl ProfileGenerator<StdRng> {
    pub fn seeded(seed: u64) -> Self {
        Self { rng: StdRng::seed_from_u64(seed) }
    }

    pub fn from_entropy() -> Self {
        Self { rng: StdRng::from_entropy() }
    }
}

impl<R: Rng> ProfileGenerator<R> {
    pub fn new(rng: R) -> Self {
        Self { rng }
    }

    pub fn generate(&mut self) -> ProspectProfile {
        let rng = &mut self.rng;

        let big_five = BigFiveTraits::sample(rng);
        let true_intent = Intent::ALL[rng.gen_range(0..Intent::ALL.len())];
        // slot == len maps to "no objection"
        let objection_slot = rng.gen_range(0..=ObjectionType::ALL.len());
        let objection_type = ObjectionType::ALL.get(objection_slot).copied();
        let readiness_level = ReadinessLevel::ALL[rng.gen_range(0..ReadinessLevel::ALL.len())];
        let age_range = AGE_RANGES[rng.gen_range(0..AGE_RANGES.len())].to_string();
        let fitness_background =
            FITNESS_BACKGROUNDS[rng.gen_range(0..FITNESS_BACKGROUNDS.len())].to_string();

        ProspectProfile {
            big_five,
            true_intent,
            objection_type,
            readiness_level,
            age_range,
            fitness_background,
        }
    }
}
