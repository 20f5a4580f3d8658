//! Hiscore snapshots pushed by the scraper

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Rows per insert/update batch on the scraper routes
pub const HISCORE_BATCH_SIZE: usize = 500;

/// Declares `Hiscore` from `column => "WireName"` pairs.
///
/// Column order is the insert order for `player_hiscore_data`.
macro_rules! hiscore {
    ($($column:ident => $wire:literal),+ $(,)?) => {
        /// One skill/activity snapshot for a player
        #[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
        pub struct Hiscore {
            #[serde(rename = "Player_id")]
            pub player_id: i64,
            $(
                #[serde(rename = $wire)]
                pub $column: i64,
            )+
        }

        impl Hiscore {
            /// Table columns, `player_id` first.
            pub const COLUMNS: &'static [&'static str] = &["player_id", $(stringify!($column)),+];

            /// Values in `COLUMNS` order.
            pub fn values(&self) -> Vec<i64> {
                vec![self.player_id, $(self.$column),+]
            }
        }
    };
}

hiscore! {
    total => "total",
    attack => "Attack",
    defence => "Defence",
    strength => "Strength",
    hitpoints => "Hitpoints",
    ranged => "Ranged",
    prayer => "Prayer",
    magic => "Magic",
    cooking => "Cooking",
    woodcutting => "Woodcutting",
    fletching => "Fletching",
    fishing => "Fishing",
    firemaking => "Firemaking",
    crafting => "Crafting",
    smithing => "Smithing",
    mining => "Mining",
    herblore => "Herblore",
    agility => "Agility",
    thieving => "Thieving",
    slayer => "Slayer",
    farming => "Farming",
    runecraft => "Runecraft",
    hunter => "Hunter",
    construction => "Construction",
    league => "league",
    bounty_hunter_hunter => "bounty_hunter_hunter",
    bounty_hunter_rogue => "bounty_hunter_rogue",
    cs_all => "cs_all",
    cs_beginner => "cs_beginner",
    cs_easy => "cs_easy",
    cs_medium => "cs_medium",
    cs_hard => "cs_hard",
    cs_elite => "cs_elite",
    cs_master => "cs_master",
    lms_rank => "lms_rank",
    soul_wars_zeal => "soul_wars_zeal",
    abyssal_sire => "abyssal_sire",
    alchemical_hydra => "alchemical_hydra",
    barrows_chests => "barrows_chests",
    bryophyta => "bryophyta",
    callisto => "callisto",
    cerberus => "cerberus",
    chambers_of_xeric => "chambers_of_xeric",
    chambers_of_xeric_challenge_mode => "chambers_of_xeric_challenge_mode",
    chaos_elemental => "chaos_elemental",
    chaos_fanatic => "chaos_fanatic",
    commander_zilyana => "commander_zilyana",
    corporeal_beast => "corporeal_beast",
    crazy_archaeologist => "crazy_archaeologist",
    dagannoth_prime => "dagannoth_prime",
    dagannoth_rex => "dagannoth_rex",
    dagannoth_supreme => "dagannoth_supreme",
    deranged_archaeologist => "deranged_archaeologist",
    general_graardor => "general_graardor",
    giant_mole => "giant_mole",
    grotesque_guardians => "grotesque_guardians",
    hespori => "hespori",
    kalphite_queen => "kalphite_queen",
    king_black_dragon => "king_black_dragon",
    kraken => "kraken",
    kreearra => "kreearra",
    kril_tsutsaroth => "kril_tsutsaroth",
    mimic => "mimic",
    nightmare => "nightmare",
    obor => "obor",
    sarachnis => "sarachnis",
    scorpia => "scorpia",
    skotizo => "skotizo",
    tempoross => "tempoross",
    the_gauntlet => "the_gauntlet",
    the_corrupted_gauntlet => "the_corrupted_gauntlet",
    theatre_of_blood => "theatre_of_blood",
    theatre_of_blood_hard => "theatre_of_blood_hard",
    thermonuclear_smoke_devil => "thermonuclear_smoke_devil",
    tzkal_zuk => "tzkal_zuk",
    tztok_jad => "tztok_jad",
    venenatis => "venenatis",
    vetion => "vetion",
    vorkath => "vorkath",
    wintertodt => "wintertodt",
    zalcano => "zalcano",
    zulrah => "zulrah",
}

/// Player state as reported by the scraper
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScrapedPlayer {
    pub id: i64,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub possible_ban: Option<bool>,
    #[serde(default)]
    pub confirmed_ban: Option<bool>,
    #[serde(default)]
    pub confirmed_player: Option<bool>,
    #[serde(default)]
    pub label_id: Option<i64>,
    #[serde(default)]
    pub label_jagex: Option<i64>,
}

/// One element of a scraper upload
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScraperRecord {
    #[serde(default)]
    pub hiscores: Option<Hiscore>,
    pub player: ScrapedPlayer,
}

/// Player row update stamped with the scrape time
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlayerUpdate {
    pub player: ScrapedPlayer,
    pub updated_at: DateTime<Utc>,
}

/// Split an upload into player updates and the hiscores that came with it.
///
/// Every player is stamped with `now`; records without hiscores only
/// produce a player update.
pub fn split_records(
    records: Vec<ScraperRecord>,
    now: DateTime<Utc>,
) -> (Vec<PlayerUpdate>, Vec<Hiscore>) {
    let mut players = Vec::with_capacity(records.len());
    let mut hiscores = Vec::new();

    for record in records {
        players.push(PlayerUpdate {
            player: record.player,
            updated_at: now,
        });
        if let Some(hiscore) = record.hiscores {
            hiscores.push(hiscore);
        }
    }

    (players, hiscores)
}
