pub const PLAYER_NAME: &str = "Вы";

/// Fixed rivals shown alongside the player.
const RIVALS: [(&str, u64); 4] = [
    ("КотоМан", 15420),
    ("МяуМастер", 12890),
    ("КотоЛюб", 9340),
    ("ПушистыйКоллектор", 7560),
];

#[derive(Debug, PartialEq, serde::Serialize)]
pub struct Standing {
    pub rank: usize,
    pub name: &'static str,
    pub balance: u64,
    pub is_player: bool,
}

/// Standings by balance, highest first. The player wins ties.
pub fn leaderboard(balance: u64) -> Vec<Standing> {
    let mut standings: Vec<Standing> = std::iter::once((PLAYER_NAME, balance, true))
        .chain(RIVALS.iter().map(|&(name, balance)| (name, balance, false)))
        .map(|(name, balance, is_player)| Standing {
            rank: 0,
            name,
            balance,
            is_player,
        })
        .collect();

    standings.sort_by(|a, b| b.balance.cmp(&a.balance));
    for (i, standing) in standings.iter_mut().enumerate() {
        standing.rank = i + 1;
    }
    standings
}
