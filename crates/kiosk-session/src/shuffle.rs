//! Question ordering
//!
//! All randomness goes through [`shuffled`], which takes an explicit generator
//! so tests can inject a seeded one.

use kiosk_core::{Question, SurveyDefinition};
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};

/// Uniform random permutation of `items` (Fisher-Yates)
pub fn shuffled<T: Clone, R: Rng + ?Sized>(items: &[T], rng: &mut R) -> Vec<T> {
    let mut out = items.to_vec();
    out.shuffle(rng);
    out
}

/// Order in which one session presents the questions
pub fn question_order<R: Rng + ?Sized>(definition: &SurveyDefinition, rng: &mut R) -> Vec<Question> {
    if definition.randomize {
        shuffled(&definition.questions, rng)
    } else {
        definition.questions.clone()
    }
}

/// Generator for a session: seeded when configured, from the OS otherwise
#[must_use]
pub fn session_rng(seed: Option<u64>) -> StdRng {
    match seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_os_rng(),
    }
}
