//! Bingo game engine.
//!
//! Standard 75-ball bingo. Cards follow traditional column ranges:
//!
//! - B column (0): 1-15
//! - I column (1): 16-30
//! - N column (2): 31-45, with the FREE space at center
//! - G column (3): 46-60
//! - O column (4): 61-75
//!
//! Win patterns are `single-line` (any row, column, or diagonal),
//! `4-corners`, and `full-card`.

use std::collections::HashSet;
use std::fmt;

use rand::Rng;
use serde::de::{self, Visitor};
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::games::{GameState, GameType};
use crate::session::Session;

/// Cards are square grids of this size.
pub const CARD_SIZE: usize = 5;

/// Numbers run 1..=75, fifteen per column.
pub const MAX_NUMBER: u8 = 75;

/// How many numbers each column draws from.
pub const COLUMN_SPAN: u8 = 15;

/// A 5x5 bingo card, stored row-major.
pub type BingoCard = [[BingoCell; CARD_SIZE]; CARD_SIZE];

/// Value of a single card cell: a number, or the FREE center space.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CellValue {
    Number(u8),
    Free,
}

// The wire and store encoding keeps the original shape: a bare number,
// or the string "FREE" for the center cell.
impl Serialize for CellValue {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Self::Number(n) => serializer.serialize_u8(*n),
            Self::Free => serializer.serialize_str("FREE"),
        }
    }
}

impl<'de> Deserialize<'de> for CellValue {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct CellValueVisitor;

        impl<'de> Visitor<'de> for CellValueVisitor {
            type Value = CellValue;

            fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "a bingo number or \"FREE\"")
            }

            fn visit_u64<E: de::Error>(self, v: u64) -> Result<CellValue, E> {
                if (1..=MAX_NUMBER as u64).contains(&v) {
                    Ok(CellValue::Number(v as u8))
                } else {
                    Err(E::custom(format!("bingo number out of range: {}", v)))
                }
            }

            fn visit_i64<E: de::Error>(self, v: i64) -> Result<CellValue, E> {
                if v >= 0 {
                    self.visit_u64(v as u64)
                } else {
                    Err(E::custom(format!("bingo number out of range: {}", v)))
                }
            }

            fn visit_str<E: de::Error>(self, v: &str) -> Result<CellValue, E> {
                if v == "FREE" {
                    Ok(CellValue::Free)
                } else {
                    Err(E::custom(format!("unknown cell value: {:?}", v)))
                }
            }
        }

        deserializer.deserialize_any(CellValueVisitor)
    }
}

/// A single card cell.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BingoCell {
    pub value: CellValue,
    pub marked: bool,
}

/// Bingo slice of session state: the numbers called so far, in call order.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BingoState {
    pub called_numbers: Vec<u8>,
}

/// Result of calling a number.
#[derive(Debug, Clone, PartialEq)]
pub struct CallResult {
    /// `None` once all 75 numbers are called or bingo is not active
    pub number: Option<u8>,
    pub called_numbers: Vec<u8>,
}

/// Generate a card: each column draws five distinct values from its
/// 15-number range, except the pre-marked FREE center cell.
///
/// Built column-major, then transposed to row-major, because rendering
/// and win patterns are expressed row-major.
pub fn generate_card<R: Rng>(rng: &mut R) -> BingoCard {
    let mut columns: Vec<Vec<BingoCell>> = Vec::with_capacity(CARD_SIZE);

    for col in 0..CARD_SIZE {
        let min = col as u8 * COLUMN_SPAN + 1;
        let max = min + COLUMN_SPAN - 1;
        let mut used = HashSet::new();
        let mut column = Vec::with_capacity(CARD_SIZE);

        for row in 0..CARD_SIZE {
            if col == 2 && row == 2 {
                column.push(BingoCell {
                    value: CellValue::Free,
                    marked: true,
                });
            } else {
                let num = loop {
                    let candidate = rng.gen_range(min..=max);
                    if used.insert(candidate) {
                        break candidate;
                    }
                };
                column.push(BingoCell {
                    value: CellValue::Number(num),
                    marked: false,
                });
            }
        }
        columns.push(column);
    }

    std::array::from_fn(|row| std::array::from_fn(|col| columns[col][row]))
}

/// Initialize a bingo game on the session: empty call list and a fresh
/// card for every player.
pub fn initialize(session: &mut Session) {
    session.game_type = Some(GameType::Bingo);
    session.game = Some(GameState::Bingo(BingoState::default()));

    let mut rng = rand::thread_rng();
    for player in &mut session.players {
        player.bingo_card = Some(generate_card(&mut rng));
    }
}

/// Mark every cell on the player's card matching `number`. No-op if the
/// player has no card.
pub fn mark_number(session: &mut Session, player_id: &str, number: u8) {
    let Some(player) = session.player_mut(player_id) else {
        return;
    };
    let Some(card) = &mut player.bingo_card else {
        return;
    };

    for row in card.iter_mut() {
        for cell in row.iter_mut() {
            if cell.value == CellValue::Number(number) {
                cell.marked = true;
            }
        }
    }
}

/// Call a number uniformly at random among those not yet called.
/// Host-authority action.
pub fn call_number(session: &mut Session) -> CallResult {
    let state = match &mut session.game {
        Some(GameState::Bingo(state)) => state,
        _ => {
            return CallResult {
                number: None,
                called_numbers: Vec::new(),
            }
        }
    };

    let available: Vec<u8> = (1..=MAX_NUMBER)
        .filter(|n| !state.called_numbers.contains(n))
        .collect();

    if available.is_empty() {
        return CallResult {
            number: None,
            called_numbers: state.called_numbers.clone(),
        };
    }

    let number = available[rand::thread_rng().gen_range(0..available.len())];
    state.called_numbers.push(number);

    CallResult {
        number: Some(number),
        called_numbers: state.called_numbers.clone(),
    }
}

/// Check whether a pattern is complete on a card.
///
/// An unknown pattern name is simply not complete; no error is raised.
pub fn check_pattern(card: &BingoCard, pattern: &str) -> bool {
    match pattern {
        "single-line" => {
            let row_done = card.iter().any(|row| row.iter().all(|c| c.marked));
            let col_done = (0..CARD_SIZE).any(|col| card.iter().all(|row| row[col].marked));
            let diag_done = (0..CARD_SIZE).all(|i| card[i][i].marked)
                || (0..CARD_SIZE).all(|i| card[i][CARD_SIZE - 1 - i].marked);
            row_done || col_done || diag_done
        }
        "4-corners" => {
            card[0][0].marked && card[0][4].marked && card[4][0].marked && card[4][4].marked
        }
        "full-card" => card.iter().all(|row| row.iter().all(|c| c.marked)),
        _ => false,
    }
}
