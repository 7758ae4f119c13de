use rand::{thread_rng, Rng};

use super::{Card, Rarity, CAT_EMOJIS, CAT_NAMES, RARITIES};

/// Source of randomness for a draw. Each call is independent.
pub trait Entropy {
    /// Uniform value in [0, 100).
    fn percent(&mut self) -> f64;

    /// Uniform integer in [min, max].
    fn between(&mut self, min: u32, max: u32) -> u32;

    /// Uniform index into a non-empty list of the given length.
    fn index(&mut self, len: usize) -> usize;
}

pub struct RngEntropy<R: Rng>(pub R);

impl<R: Rng> Entropy for RngEntropy<R> {
    fn percent(&mut self) -> f64 {
        self.0.gen_range(0.0..100.0)
    }

    fn between(&mut self, min: u32, max: u32) -> u32 {
        self.0.gen_range(min..=max)
    }

    fn index(&mut self, len: usize) -> usize {
        self.0.gen_range(0..len)
    }
}

/// Map a roll in [0, 100) onto a tier by walking the cumulative weights in
/// order. A roll exactly on a boundary belongs to the earlier tier.
pub fn select_rarity(roll: f64) -> Rarity {
    let mut cumulative = 0.0;
    for config in &RARITIES {
        cumulative += f64::from(config.weight);
        if roll <= cumulative {
            return config.rarity;
        }
    }

    // Only reachable if the weights fall short of the roll.
    Rarity::Secret
}

pub fn draw_card_with<E: Entropy>(entropy: &mut E) -> Card {
    let rarity = select_rarity(entropy.percent());
    let config = rarity.config();

    let (min, max) = config.points;
    let points = entropy.between(min, max);
    let name = CAT_NAMES[entropy.index(CAT_NAMES.len())];
    let emoji = CAT_EMOJIS[entropy.index(CAT_EMOJIS.len())];
    let image = config.images[entropy.index(config.images.len())];

    Card::new(
        rarity,
        points,
        name.to_string(),
        emoji.to_string(),
        image.to_string(),
    )
}

pub fn draw_card() -> Card {
    draw_card_with(&mut RngEntropy(thread_rng()))
}
