use std::collections::HashMap;

use crate::cards::{Card, Rarity, RARITIES};

pub use leaderboard::leaderboard;

mod leaderboard;

/// Cards acquired since the process started and the points they are worth.
#[derive(Clone, Debug, Default)]
pub struct Session {
    inventory: Vec<Card>,
    balance: u64,
}

impl Session {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&mut self, card: Card) {
        self.balance += u64::from(card.points);
        self.inventory.push(card);
    }

    /// Cards in the order they were drawn.
    pub fn inventory(&self) -> &[Card] {
        &self.inventory
    }

    pub fn balance(&self) -> u64 {
        self.balance
    }

    pub fn len(&self) -> usize {
        self.inventory.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inventory.is_empty()
    }

    /// Tiers with no cards are absent.
    pub fn counts_by_rarity(&self) -> HashMap<Rarity, usize> {
        let mut counts = HashMap::new();
        for card in &self.inventory {
            *counts.entry(card.rarity).or_default() += 1;
        }
        counts
    }

    pub fn count_of(&self, rarity: Rarity) -> usize {
        self.cards_of(rarity).count()
    }

    pub fn cards_of(&self, rarity: Rarity) -> impl Iterator<Item = &Card> {
        self.inventory.iter().filter(move |c| c.rarity == rarity)
    }

    pub fn average_value(&self) -> f64 {
        if self.is_empty() {
            0.0
        } else {
            self.balance as f64 / self.inventory.len() as f64
        }
    }

    /// Average rounded half away from zero, as shown on the balance tab.
    pub fn rounded_average(&self) -> u64 {
        self.average_value().round() as u64
    }

    /// Highest scoring card. The earliest drawn wins a tie.
    pub fn best_card(&self) -> Option<&Card> {
        self.inventory
            .iter()
            .reduce(|best, card| if card.points > best.points { card } else { best })
    }

    pub fn summary(&self) -> BalanceSummary {
        let best_card = self.best_card().cloned();
        BalanceSummary {
            balance: self.balance,
            total_cards: self.len(),
            average_value: self.rounded_average(),
            best_points: best_card.as_ref().map_or(0, |c| c.points),
            best_card,
        }
    }

    /// Inventory grouped by tier in tier order. Empty tiers are left out.
    pub fn groups(&self) -> Vec<InventoryGroup> {
        RARITIES
            .iter()
            .filter_map(|config| {
                let cards: Vec<Card> = self.cards_of(config.rarity).cloned().collect();
                if cards.is_empty() {
                    None
                } else {
                    Some(InventoryGroup {
                        rarity: config.rarity,
                        label: config.label,
                        color: config.color,
                        count: cards.len(),
                        cards,
                    })
                }
            })
            .collect()
    }

    pub fn profile(&self) -> Profile {
        let counts = self.counts_by_rarity();
        Profile {
            balance: self.balance,
            total_cards: self.len(),
            rarities: RARITIES
                .iter()
                .map(|config| RarityCount {
                    rarity: config.rarity,
                    label: config.label,
                    color: config.color,
                    count: counts.get(&config.rarity).copied().unwrap_or(0),
                })
                .collect(),
        }
    }
}

#[derive(Debug, serde::Serialize)]
pub struct BalanceSummary {
    pub balance: u64,
    pub total_cards: usize,
    pub average_value: u64,
    pub best_points: u32,
    pub best_card: Option<Card>,
}

#[derive(Debug, serde::Serialize)]
pub struct InventoryGroup {
    pub rarity: Rarity,
    pub label: &'static str,
    pub color: &'static str,
    pub count: usize,
    pub cards: Vec<Card>,
}

#[derive(Debug, serde::Serialize)]
pub struct RarityCount {
    pub rarity: Rarity,
    pub label: &'static str,
    pub color: &'static str,
    pub count: usize,
}

#[derive(Debug, serde::Serialize)]
pub struct Profile {
    pub balance: u64,
    pub total_cards: usize,

    /// Every tier, zeros included.
    pub rarities: Vec<RarityCount>,
}
