//! Room, round and player records as stored and as returned to clients.

use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use super::keys::field;
use crate::game::Hand;
use crate::store::{StoreError, StoreResult};

/// Winner value recorded when every member folds.
pub const DRAW: &str = "draw";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RoomStatus {
    Waiting,
    Playing,
    Finished,
}

impl RoomStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            RoomStatus::Waiting => "waiting",
            RoomStatus::Playing => "playing",
            RoomStatus::Finished => "finished",
        }
    }
}

impl fmt::Display for RoomStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RoomStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "waiting" => Ok(RoomStatus::Waiting),
            "playing" => Ok(RoomStatus::Playing),
            "finished" => Ok(RoomStatus::Finished),
            other => Err(format!("unknown status '{other}'")),
        }
    }
}

/// Parsed contents of the `room:{id}` hash.
#[derive(Debug, Clone)]
pub struct RoomRecord {
    pub id: String,
    pub name: String,
    pub owner: String,
    pub status: RoomStatus,
    pub created_at: u64,
    pub current_round: u32,
    pub start_time: Option<u64>,
    pub winner: Option<String>,
}

fn required<'a>(hash: &'a HashMap<String, String>, key: &str, name: &str) -> StoreResult<&'a str> {
    hash.get(name)
        .map(String::as_str)
        .ok_or_else(|| StoreError::corrupt(key, format!("missing field {name}")))
}

fn parsed<T>(hash: &HashMap<String, String>, key: &str, name: &str) -> StoreResult<Option<T>>
where
    T: FromStr,
    T::Err: fmt::Display,
{
    hash.get(name)
        .map(|raw| raw.parse::<T>())
        .transpose()
        .map_err(|e| StoreError::corrupt(key, format!("{name}: {e}")))
}

impl RoomRecord {
    /// `None` when the hash is empty, meaning the room does not exist.
    pub fn from_hash(key: &str, hash: &HashMap<String, String>) -> StoreResult<Option<Self>> {
        if hash.is_empty() {
            return Ok(None);
        }
        Ok(Some(Self {
            id: required(hash, key, field::ID)?.to_string(),
            name: required(hash, key, field::NAME)?.to_string(),
            owner: required(hash, key, field::OWNER)?.to_string(),
            status: parsed(hash, key, field::STATUS)?
                .ok_or_else(|| StoreError::corrupt(key, "missing field status"))?,
            created_at: parsed(hash, key, field::CREATED_AT)?.unwrap_or_default(),
            current_round: parsed(hash, key, field::CURRENT_ROUND)?.unwrap_or_default(),
            start_time: parsed(hash, key, field::START_TIME)?,
            winner: hash.get(field::WINNER).cloned(),
        }))
    }

    pub fn is_draw(&self) -> bool {
        self.winner.as_deref() == Some(DRAW)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct RoomSummary {
    pub id: String,
    pub name: String,
    pub owner: String,
    pub status: RoomStatus,
    pub created_at: u64,
    pub current_round: u32,
    pub players: Vec<String>,
    pub player_count: usize,
    pub max_players: usize,
}

/// One player's answer for a round.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Submission {
    pub expression: String,
    pub time: u64,
    pub result: f64,
}

/// Solver output saved when a round ends in a draw.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct SolutionRecord {
    pub has_answer: bool,
    pub solutions: Vec<String>,
    pub cards: Hand,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct GameState {
    pub status: RoomStatus,
    pub cards: Option<Hand>,
    pub winner: Option<String>,
    pub current_round: u32,
    pub folded_players: Vec<String>,
    pub solution_data: Option<SolutionRecord>,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct JoinOutcome {
    pub members: Vec<String>,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct LeaveOutcome {
    pub room_destroyed: bool,
    pub members: Vec<String>,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct StartOutcome {
    pub cards: Hand,
    pub round: u32,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct SubmitOutcome {
    pub winner: String,
    pub elapsed_ms: u64,
    pub expression: String,
    pub result: f64,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct FoldOutcome {
    pub is_draw: bool,
    pub folded_count: usize,
    pub total_players: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub has_answer: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub solutions: Option<Vec<String>>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct PlayerProfile {
    pub username: String,
    pub score: i64,
    pub wins: i64,
    pub games: i64,
    pub created_at: u64,
}

impl PlayerProfile {
    pub fn from_hash(key: &str, hash: &HashMap<String, String>) -> StoreResult<Option<Self>> {
        if hash.is_empty() {
            return Ok(None);
        }
        Ok(Some(Self {
            username: required(hash, key, field::USERNAME)?.to_string(),
            score: parsed(hash, key, field::SCORE)?.unwrap_or_default(),
            wins: parsed(hash, key, field::WINS)?.unwrap_or_default(),
            games: parsed(hash, key, field::GAMES)?.unwrap_or_default(),
            created_at: parsed(hash, key, field::CREATED_AT)?.unwrap_or_default(),
        }))
    }

    /// Percentage of games won, one decimal place.
    pub fn win_rate(&self) -> String {
        if self.games > 0 {
            format!("{:.1}", self.wins as f64 / self.games as f64 * 100.0)
        } else {
            "0.0".to_string()
        }
    }
}

#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct LeaderboardEntry {
    pub rank: usize,
    #[serde(flatten)]
    pub profile: PlayerProfile,
    pub win_rate: String,
}

#[derive(Debug, Clone, Copy, Default, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct SweepReport {
    pub cleaned_players: usize,
    pub cleaned_rooms: usize,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn hash(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect()
    }

    #[test]
    fn room_hash_parses_and_reports_corruption() {
        let h = hash(&[
            ("id", "ABC123"),
            ("name", "den"),
            ("owner", "alice"),
            ("status", "finished"),
            ("currentRound", "3"),
            ("winner", "draw"),
        ]);
        let room = RoomRecord::from_hash("room:ABC123", &h).unwrap().unwrap();
        assert_eq!(room.status, RoomStatus::Finished);
        assert_eq!(room.current_round, 3);
        assert!(room.is_draw());
        assert!(room.start_time.is_none());

        assert!(RoomRecord::from_hash("room:X", &HashMap::new()).unwrap().is_none());
        let bad = hash(&[("id", "X"), ("name", "n"), ("owner", "o"), ("status", "paused")]);
        assert!(matches!(
            RoomRecord::from_hash("room:X", &bad),
            Err(StoreError::Corrupt { .. })
        ));
    }

    #[test]
    fn win_rate_has_one_decimal() {
        let mut p = PlayerProfile {
            username: "alice".into(),
            score: 2,
            wins: 2,
            games: 3,
            created_at: 0,
        };
        assert_eq!(p.win_rate(), "66.7");
        p.games = 0;
        assert_eq!(p.win_rate(), "0.0");
    }

    #[test]
    fn records_use_camel_case_json() {
        let record = SolutionRecord {
            has_answer: true,
            solutions: vec!["(5-3)*(2+4)*2".into()],
            cards: [2, 3, 4, 5],
        };
        let json = serde_json::to_value(&record).unwrap();
        assert_eq!(json["hasAnswer"], true);
        assert_eq!(json["cards"], serde_json::json!([2, 3, 4, 5]));
    }
}
