use outcome_tally_core::Outcome;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

/// Source of predicted outcomes for the session.
pub trait DrawSource {
    fn next_draw(&mut self) -> Outcome;
}

/// Uniform pseudo-random draw, each label with probability one half.
pub struct UniformDraw {
    rng: StdRng,
}

impl UniformDraw {
    #[must_use]
    pub fn new() -> Self {
        Self {
            rng: StdRng::from_entropy(),
        }
    }

    /// Deterministic variant for reproducible sequences.
    #[must_use]
    pub fn seeded(seed: u64) -> Self {
        Self {
            rng: StdRng::seed_from_u64(seed),
        }
    }
}

impl Default for UniformDraw {
    fn default() -> Self {
        Self::new()
    }
}

impl DrawSource for UniformDraw {
    fn next_draw(&mut self) -> Outcome {
        Outcome::from_bool(self.rng.gen_bool(0.5))
    }
}

/// Replays a fixed sequence of outcomes, cycling once exhausted. An empty
/// script always draws `A`.
pub struct ScriptedDraw {
    script: Vec<Outcome>,
    next: usize,
}

impl ScriptedDraw {
    #[must_use]
    pub fn new(script: Vec<Outcome>) -> Self {
        Self { script, next: 0 }
    }
}

impl DrawSource for ScriptedDraw {
    fn next_draw(&mut self) -> Outcome {
        let Some(value) = self.script.get(self.next).copied() else {
            return Outcome::A;
        };
        self.next = (self.next + 1) % self.script.len();
        value
    }
}
