use rand::seq::SliceRandom;
use rand::Rng;

pub const DEFAULT_TAUNT_PROBABILITY: f64 = 0.3;

pub const DEFAULT_TAUNTS: [&str; 6] = [
    "Is that the best you can do?",
    "Interesting move... I guess.",
    "You might want to reconsider your strategy.",
    "My circuits are barely warm!",
    "This game is too easy.",
    "Victory is inevitable.",
];

/// Decides whether to taunt after a move, and with which message.
///
/// Taunting never influences the game, so this holds no state besides its settings.
#[derive(Clone, Debug)]
pub struct Taunts {
    messages: Vec<String>,
    probability: f64,
}

impl Default for Taunts {
    fn default() -> Self {
        Self::new(
            DEFAULT_TAUNTS.iter().map(|&msg| String::from(msg)).collect(),
            DEFAULT_TAUNT_PROBABILITY,
        )
    }
}

impl Taunts {
    /// The probability is clamped to `[0, 1]`; NaN disables taunting.
    pub fn new(messages: Vec<String>, probability: f64) -> Self {
        let probability = if probability.is_nan() {
            0.0
        } else {
            probability.clamp(0.0, 1.0)
        };
        Self {
            messages,
            probability,
        }
    }

    pub fn probability(&self) -> f64 {
        self.probability
    }

    /// Returns a message with the configured probability.
    pub fn pick<R: Rng>(&self, rng: &mut R) -> Option<&str> {
        if self.messages.is_empty() || !rng.gen_bool(self.probability) {
            return None;
        }
        self.messages.choose(rng).map(String::as_str)
    }
}
