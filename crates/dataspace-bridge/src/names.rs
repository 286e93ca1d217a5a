//! Instance name tokens.

use rand::SeedableRng;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;

const FIRST_NAMES: &[&str] = &[
    "Ada", "Alan", "Alice", "Barbara", "Bob", "Carol", "Claude", "Dennis", "Donald", "Edsger",
    "Frances", "Grace", "Hedy", "Ivan", "Jean", "John", "Ken", "Leslie", "Linus", "Margaret",
    "Niklaus", "Radia", "Robin", "Sophie", "Tim", "Tony", "Ursula", "Whitfield", "Yukihiro",
];

/// Produces the human-readable token in an instance identity.
pub trait NameGenerator {
    fn generate(&mut self) -> Result<String, NameError>;
}

/// Picks a random first name.
pub struct RandomNameGenerator {
    rng: StdRng,
}

impl RandomNameGenerator {
    /// Seeded from the OS.
    pub fn new() -> Self {
        Self {
            rng: StdRng::from_entropy(),
        }
    }

    /// Deterministic generator.
    pub fn seeded(seed: u64) -> Self {
        Self {
            rng: StdRng::seed_from_u64(seed),
        }
    }
}

impl Default for RandomNameGenerator {
    fn default() -> Self {
        Self::new()
    }
}

impl NameGenerator for RandomNameGenerator {
    fn generate(&mut self) -> Result<String, NameError> {
        FIRST_NAMES
            .choose(&mut self.rng)
            .map(|name| name.to_string())
            .ok_or(NameError::Empty)
    }
}

/// Always returns the same name.
pub struct FixedNameGenerator(String);

impl FixedNameGenerator {
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }
}

impl NameGenerator for FixedNameGenerator {
    fn generate(&mut self) -> Result<String, NameError> {
        if self.0.is_empty() {
            return Err(NameError::Empty);
        }
        Ok(self.0.clone())
    }
}

/// The generator could not produce a usable name.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum NameError {
    #[error("name generator produced an empty name")]
    Empty,
}
