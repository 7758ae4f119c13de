use uuid::Uuid;

pub mod draw;

#[derive(
    Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, serde::Serialize, serde::Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum Rarity {
    Common,
    Uncommon,
    Rare,
    Epic,
    Mythic,
    Legendary,
    Secret,
}

impl Rarity {
    /// Every tier, most to least probable.
    pub const ALL: [Rarity; 7] = [
        Rarity::Common,
        Rarity::Uncommon,
        Rarity::Rare,
        Rarity::Epic,
        Rarity::Mythic,
        Rarity::Legendary,
        Rarity::Secret,
    ];

    pub fn config(self) -> &'static RarityConfig {
        &RARITIES[self as usize]
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Rarity::Common => "common",
            Rarity::Uncommon => "uncommon",
            Rarity::Rare => "rare",
            Rarity::Epic => "epic",
            Rarity::Mythic => "mythic",
            Rarity::Legendary => "legendary",
            Rarity::Secret => "secret",
        }
    }
}

#[derive(Debug)]
pub struct RarityConfig {
    pub rarity: Rarity,

    /// Display name shown on badges and notifications.
    pub label: &'static str,

    /// Colour token used by the frontend stylesheet.
    pub color: &'static str,

    /// Chance of this tier in percentage points. All weights sum to 100.
    pub weight: u32,

    /// Inclusive bounds on the points a card of this tier is worth.
    pub points: (u32, u32),

    /// Art that cards of this tier may be drawn with.
    pub images: &'static [&'static str],
}

/// Tier configuration in draw order. The cumulative weight walk depends on
/// this order, so it is a list rather than a map.
pub static RARITIES: [RarityConfig; 7] = [
    RarityConfig {
        rarity: Rarity::Common,
        label: "Обычный",
        color: "text-rare-common",
        weight: 40,
        points: (10, 30),
        images: &["/cards/common-1.png", "/cards/common-2.png", "/cards/common-3.png"],
    },
    RarityConfig {
        rarity: Rarity::Uncommon,
        label: "Необычный",
        color: "text-rare-uncommon",
        weight: 30,
        points: (40, 70),
        images: &["/cards/uncommon-1.png", "/cards/uncommon-2.png"],
    },
    RarityConfig {
        rarity: Rarity::Rare,
        label: "Редкий",
        color: "text-rare-rare",
        weight: 15,
        points: (80, 120),
        images: &["/cards/rare-1.png", "/cards/rare-2.png"],
    },
    RarityConfig {
        rarity: Rarity::Epic,
        label: "Эпический",
        color: "text-rare-epic",
        weight: 8,
        points: (150, 250),
        images: &["/cards/epic-1.png", "/cards/epic-2.png"],
    },
    RarityConfig {
        rarity: Rarity::Mythic,
        label: "Мифический",
        color: "text-rare-mythic",
        weight: 4,
        points: (300, 500),
        images: &["/cards/mythic-1.png"],
    },
    RarityConfig {
        rarity: Rarity::Legendary,
        label: "Легендарный",
        color: "text-rare-legendary",
        weight: 2,
        points: (600, 1000),
        images: &["/cards/legendary-1.png"],
    },
    RarityConfig {
        rarity: Rarity::Secret,
        label: "Секретный",
        color: "text-rare-secret",
        weight: 1,
        points: (1500, 3000),
        images: &["/cards/secret-1.png"],
    },
];

pub const CAT_EMOJIS: &[&str] = &[
    "😺", "😸", "😹", "😻", "😼", "😽", "🙀", "😿", "😾", "🐱", "🐈", "🐈‍⬛",
];

pub const CAT_NAMES: &[&str] = &[
    "Мурзик", "Барсик", "Пушок", "Снежок", "Васька", "Кузя", "Маркиз", "Симба", "Персик", "Том",
    "Феликс", "Гарфилд", "Тигра", "Лео", "Рыжик", "Макс", "Оскар", "Чарли", "Люцифер", "Базилио",
    "Матроскин", "Багира",
];

/// The result of a single draw. Never changed after it is created.
#[derive(Clone, Debug, PartialEq, serde::Serialize)]
pub struct Card {
    id: Uuid,
    name: String,
    pub rarity: Rarity,
    pub points: u32,
    emoji: String,
    image: String,
}

impl Card {
    pub fn new(rarity: Rarity, points: u32, name: String, emoji: String, image: String) -> Self {
        Self {
            id: Uuid::new_v4(),
            name,
            rarity,
            points,
            emoji,
            image,
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn emoji(&self) -> &str {
        &self.emoji
    }

    pub fn image(&self) -> &str {
        &self.image
    }

    #[cfg(test)]
    pub fn sample(rarity: Rarity, points: u32) -> Self {
        static ID: std::sync::atomic::AtomicUsize = std::sync::atomic::AtomicUsize::new(1);

        let id = ID.fetch_add(1, std::sync::atomic::Ordering::Relaxed);
        Self::new(
            rarity,
            points,
            format!("Cat {id}"),
            "🐱".to_string(),
            format!("/cards/test-{id}.png"),
        )
    }
}

#[cfg(test)]
mod test {
    use super::{Rarity, CAT_EMOJIS, CAT_NAMES, RARITIES};

    #[test]
    fn test_weights_sum_to_100() {
        assert_eq!(RARITIES.iter().map(|c| c.weight).sum::<u32>(), 100);
    }

    #[test]
    fn test_config_order_matches_tiers() {
        // Rarity::config indexes by discriminant, so the list must line up.
        for (config, rarity) in RARITIES.iter().zip(Rarity::ALL) {
            assert_eq!(config.rarity, rarity);
            assert_eq!(rarity.config().rarity, rarity);
        }

        // Most probable first.
        assert!(RARITIES.windows(2).all(|w| w[0].weight >= w[1].weight));
    }

    #[test]
    fn test_config_is_well_formed() {
        assert!(RARITIES
            .iter()
            .all(|c| c.points.0 <= c.points.1 && !c.images.is_empty()));
        assert!(!CAT_NAMES.is_empty());
        assert!(!CAT_EMOJIS.is_empty());
        assert_eq!(Rarity::Legendary.config().points, (600, 1000));
    }

    #[test]
    fn test_rarity_serializes_lowercase() {
        for rarity in Rarity::ALL {
            assert_eq!(
                serde_json::to_string(&rarity).unwrap(),
                format!("\"{}\"", rarity.as_str())
            );
        }
    }
}
