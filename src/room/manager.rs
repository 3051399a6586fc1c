//! Room lifecycle and round resolution.
//!
//! A room moves `waiting -> playing -> finished`, and back to `playing` each
//! time the owner starts another round. All state lives in the injected
//! store; no operation here holds anything in memory between requests.
//!
//! Transitions read and check first and write last, so a rejected request
//! never leaves partial state behind. Because the store is not
//! transactional, the contested steps use single-key atomic commands:
//!
//! - joining and folding go through set-add, whose result decides
//!   `AlreadyJoined` / `AlreadyFolded`;
//! - the round's `winner` field is claimed with hash-set-if-absent, by the
//!   first valid submission or by the fold that completes a draw, so a round
//!   resolves exactly once;
//! - destruction removes the id from `rooms:all` with set-remove, and only
//!   the caller whose removal succeeded reports it.

use std::collections::HashSet;

use crate::config::GameSettings;
use crate::game::{self, Hand, ValidationError};
use crate::store::{SharedStore, StoreError, StoreResult};
use crate::util::id::new_room_id;
use crate::util::time::now_millis;

use super::keys::{self, field};
use super::model::{
    DRAW, FoldOutcome, GameState, JoinOutcome, LeaveOutcome, RoomRecord, RoomStatus,
    RoomSummary, SolutionRecord, StartOutcome, SubmitOutcome, Submission,
};

#[derive(thiserror::Error, Debug)]
pub enum RoomError {
    #[error("room not found")]
    NotFound,
    #[error("player not found")]
    PlayerNotFound,
    #[error("username already taken")]
    UsernameTaken,
    #[error("invalid name: {0}")]
    InvalidName(&'static str),
    #[error("room full")]
    Full,
    #[error("a round is in progress")]
    GameInProgress,
    #[error("already in this room")]
    AlreadyJoined,
    #[error("only the room owner can start a round")]
    NotOwner,
    #[error("at least {0} players are needed to start")]
    InsufficientPlayers(usize),
    #[error("no round in progress")]
    NotPlaying,
    #[error("player is not in this room")]
    NotMember,
    #[error("player has already folded")]
    AlreadyFolded,
    #[error("an answer has already been accepted this round")]
    AlreadySubmitted,
    #[error(transparent)]
    Invalid(#[from] ValidationError),
    #[error(transparent)]
    Store(#[from] StoreError),
}

impl RoomError {
    /// Store failures, as opposed to requests the game rules rejected.
    pub fn is_operational(&self) -> bool {
        matches!(self, RoomError::Store(_))
    }

    pub fn reason(&self) -> &'static str {
        match self {
            RoomError::NotFound => "room_not_found",
            RoomError::PlayerNotFound => "player_not_found",
            RoomError::UsernameTaken => "username_taken",
            RoomError::InvalidName(_) => "invalid_name",
            RoomError::Full => "room_full",
            RoomError::GameInProgress => "game_in_progress",
            RoomError::AlreadyJoined => "already_joined",
            RoomError::NotOwner => "not_owner",
            RoomError::InsufficientPlayers(_) => "insufficient_players",
            RoomError::NotPlaying => "not_playing",
            RoomError::NotMember => "not_member",
            RoomError::AlreadyFolded => "already_folded",
            RoomError::AlreadySubmitted => "already_submitted",
            RoomError::Invalid(e) => e.reason(),
            RoomError::Store(_) => "store_error",
        }
    }
}

/// Result of removing one member outside the owner-leaves path.
#[derive(Debug)]
pub(super) struct Departure {
    pub removed: bool,
    pub remaining: Vec<String>,
    /// True only for the caller that actually tore the room down.
    pub destroyed_here: bool,
}

#[derive(Clone)]
pub struct RoomManager {
    pub(super) store: SharedStore,
    pub(super) settings: GameSettings,
}

fn encode<T: serde::Serialize>(key: &str, value: &T) -> StoreResult<String> {
    serde_json::to_string(value).map_err(|e| StoreError::corrupt(key, e))
}

fn decode<T: serde::de::DeserializeOwned>(key: &str, raw: &str) -> StoreResult<T> {
    serde_json::from_str(raw).map_err(|e| StoreError::corrupt(key, e))
}

impl RoomManager {
    pub fn new(store: SharedStore, settings: GameSettings) -> Self {
        Self { store, settings }
    }

    async fn load(&self, id: &str) -> Result<RoomRecord, RoomError> {
        let key = keys::room(id);
        let hash = self.store.hget_all(&key).await?;
        RoomRecord::from_hash(&key, &hash)?.ok_or(RoomError::NotFound)
    }

    pub(super) async fn members(&self, id: &str) -> StoreResult<Vec<String>> {
        self.store.smembers(&keys::players(id)).await
    }

    async fn load_cards(&self, id: &str) -> StoreResult<Option<Hand>> {
        let key = keys::cards(id);
        match self.store.get(&key).await? {
            Some(raw) => decode(&key, &raw).map(Some),
            None => Ok(None),
        }
    }

    async fn load_solution(&self, id: &str) -> StoreResult<Option<SolutionRecord>> {
        let key = keys::solutions(id);
        match self.store.get(&key).await? {
            Some(raw) => decode(&key, &raw).map(Some),
            None => Ok(None),
        }
    }

    pub(super) async fn require_player(&self, name: &str) -> Result<(), RoomError> {
        if self.store.exists(&keys::user(name)).await? {
            Ok(())
        } else {
            Err(RoomError::PlayerNotFound)
        }
    }

    fn summary(&self, room: RoomRecord, players: Vec<String>) -> RoomSummary {
        RoomSummary {
            id: room.id,
            name: room.name,
            owner: room.owner,
            status: room.status,
            created_at: room.created_at,
            current_round: room.current_round,
            player_count: players.len(),
            players,
            max_players: self.settings.max_players,
        }
    }

    pub async fn create_room(&self, owner: &str, name: &str) -> Result<RoomSummary, RoomError> {
        let name = name.trim();
        if name.is_empty() {
            return Err(RoomError::InvalidName("room name must not be empty"));
        }
        self.require_player(owner).await?;

        let id = loop {
            let id = new_room_id();
            if self.store.hset_nx(&keys::room(&id), field::ID, &id).await? {
                break id;
            }
            tracing::debug!(room = %id, "room id collision, retrying");
        };
        let created_at = now_millis();
        self.store
            .hset_many(
                &keys::room(&id),
                &[
                    (field::NAME, name.to_string()),
                    (field::OWNER, owner.to_string()),
                    (field::STATUS, RoomStatus::Waiting.to_string()),
                    (field::CREATED_AT, created_at.to_string()),
                    (field::CURRENT_ROUND, "0".to_string()),
                    (field::PLAYER_COUNT, "1".to_string()),
                    (field::MAX_PLAYERS, self.settings.max_players.to_string()),
                ],
            )
            .await?;
        // heartbeat first, or a sweep in between would drop the owner
        self.touch(&id, owner).await?;
        self.store.sadd(&keys::players(&id), owner).await?;
        self.store.sadd(keys::ROOMS_ALL, &id).await?;
        tracing::info!(room = %id, owner, "room created");

        Ok(RoomSummary {
            id,
            name: name.to_string(),
            owner: owner.to_string(),
            status: RoomStatus::Waiting,
            created_at,
            current_round: 0,
            players: vec![owner.to_string()],
            player_count: 1,
            max_players: self.settings.max_players,
        })
    }

    pub async fn room(&self, id: &str) -> Result<RoomSummary, RoomError> {
        let room = self.load(id).await?;
        let players = self.members(id).await?;
        Ok(self.summary(room, players))
    }

    /// Rooms still waiting for players.
    pub async fn list_waiting(&self) -> Result<Vec<RoomSummary>, RoomError> {
        let mut rooms = Vec::new();
        for id in self.store.smembers(keys::ROOMS_ALL).await? {
            let room = match self.load(&id).await {
                Ok(room) => room,
                Err(RoomError::NotFound) => continue,
                Err(RoomError::Store(StoreError::Corrupt { key, reason })) => {
                    tracing::warn!(%key, %reason, "skipping unreadable room");
                    continue;
                }
                Err(e) => return Err(e),
            };
            if room.status == RoomStatus::Waiting {
                let players = self.members(&id).await?;
                rooms.push(self.summary(room, players));
            }
        }
        rooms.sort_by_key(|r| r.created_at);
        Ok(rooms)
    }

    pub async fn join(&self, id: &str, player: &str) -> Result<JoinOutcome, RoomError> {
        let room = self.load(id).await?;
        self.require_player(player).await?;
        if room.status == RoomStatus::Playing {
            return Err(RoomError::GameInProgress);
        }
        let members = self.members(id).await?;
        if members.len() >= self.settings.max_players {
            return Err(RoomError::Full);
        }
        if members.iter().any(|m| m == player) {
            return Err(RoomError::AlreadyJoined);
        }

        let players_key = keys::players(id);
        self.touch(id, player).await?;
        if !self.store.sadd(&players_key, player).await? {
            return Err(RoomError::AlreadyJoined);
        }
        let members = self.members(id).await?;
        if members.len() > self.settings.max_players {
            // lost a race for the last seat
            self.store.srem(&players_key, player).await?;
            self.store.del(&[keys::heartbeat(id, player)]).await?;
            return Err(RoomError::Full);
        }
        self.store
            .hset(&keys::room(id), field::PLAYER_COUNT, &members.len().to_string())
            .await?;
        tracing::info!(room = %id, player, count = members.len(), "player joined");
        Ok(JoinOutcome { members })
    }

    /// Removes `player`. The owner leaving tears the whole room down.
    pub async fn leave(&self, id: &str, player: &str) -> Result<LeaveOutcome, RoomError> {
        let room = self.load(id).await?;
        if room.owner == player {
            self.destroy(id).await?;
            tracing::info!(room = %id, player, "owner left, room closed");
            return Ok(LeaveOutcome { room_destroyed: true, members: Vec::new() });
        }
        let departure = self.drop_member(id, player).await?;
        if departure.removed {
            tracing::info!(room = %id, player, "player left");
        }
        Ok(LeaveOutcome {
            room_destroyed: departure.remaining.is_empty(),
            members: departure.remaining,
        })
    }

    /// Removes a member without the owner rule: an empty room is destroyed,
    /// a vacant owner seat passes to a remaining member, and a round whose
    /// remaining members have all folded is resolved as a draw.
    pub(super) async fn drop_member(&self, id: &str, player: &str) -> StoreResult<Departure> {
        let removed = self.store.srem(&keys::players(id), player).await?;
        self.store.srem(&keys::folds(id), player).await?;
        self.store.del(&[keys::heartbeat(id, player)]).await?;

        let remaining = self.members(id).await?;
        if remaining.is_empty() {
            let destroyed_here = self.destroy(id).await?;
            return Ok(Departure { removed, remaining, destroyed_here });
        }

        let room_key = keys::room(id);
        let hash = self.store.hget_all(&room_key).await?;
        let Some(room) = RoomRecord::from_hash(&room_key, &hash)? else {
            return Ok(Departure { removed, remaining, destroyed_here: false });
        };
        self.store
            .hset(&room_key, field::PLAYER_COUNT, &remaining.len().to_string())
            .await?;
        if !remaining.contains(&room.owner) {
            let heir = &remaining[0];
            self.store.hset(&room_key, field::OWNER, heir).await?;
            tracing::info!(room = %id, owner = %heir, "ownership transferred");
        }
        if room.status == RoomStatus::Playing {
            let folded: HashSet<String> =
                self.store.smembers(&keys::folds(id)).await?.into_iter().collect();
            if remaining.iter().all(|m| folded.contains(m)) {
                self.resolve_draw(id, &remaining).await?;
            }
        }
        Ok(Departure { removed, remaining, destroyed_here: false })
    }

    /// Deletes every key of the room. Returns whether this call removed it
    /// from the room index.
    pub(super) async fn destroy(&self, id: &str) -> StoreResult<bool> {
        let members = self.members(id).await?;
        let removed = self.store.srem(keys::ROOMS_ALL, id).await?;
        let mut doomed = keys::room_state(id);
        doomed.extend(members.iter().map(|m| keys::heartbeat(id, m)));
        self.store.del(&doomed).await?;
        if removed {
            tracing::info!(room = %id, "room destroyed");
        }
        Ok(removed)
    }

    pub async fn start(&self, id: &str, initiator: &str) -> Result<StartOutcome, RoomError> {
        let room = self.load(id).await?;
        if room.owner != initiator {
            return Err(RoomError::NotOwner);
        }
        if self.store.scard(&keys::players(id)).await? < self.settings.min_players {
            return Err(RoomError::InsufficientPlayers(self.settings.min_players));
        }
        if room.status == RoomStatus::Playing {
            return Err(RoomError::GameInProgress);
        }

        let cards = game::deal();
        let cards_key = keys::cards(id);
        let encoded = encode(&cards_key, &cards)?;
        let room_key = keys::room(id);
        self.store
            .del(&[keys::submissions(id), keys::folds(id), keys::solutions(id)])
            .await?;
        self.store.hdel(&room_key, field::WINNER).await?;
        self.store.set(&cards_key, &encoded).await?;
        let round = self.store.hincr_by(&room_key, field::CURRENT_ROUND, 1).await?;
        self.store
            .hset_many(
                &room_key,
                &[
                    (field::STATUS, RoomStatus::Playing.to_string()),
                    (field::START_TIME, now_millis().to_string()),
                ],
            )
            .await?;
        tracing::info!(room = %id, round, ?cards, "round started");
        Ok(StartOutcome { cards, round: u32::try_from(round).unwrap_or(u32::MAX) })
    }

    /// Checks `expression` and, if it is the round's first valid answer,
    /// records `player` as the winner.
    pub async fn submit(
        &self,
        id: &str,
        player: &str,
        expression: &str,
    ) -> Result<SubmitOutcome, RoomError> {
        let room = self.load(id).await?;
        match room.status {
            RoomStatus::Playing => {}
            RoomStatus::Finished => return Err(RoomError::AlreadySubmitted),
            RoomStatus::Waiting => return Err(RoomError::NotPlaying),
        }
        if !self.store.sismember(&keys::players(id), player).await? {
            return Err(RoomError::NotMember);
        }
        if self.store.sismember(&keys::folds(id), player).await? {
            return Err(RoomError::AlreadyFolded);
        }
        let submissions_key = keys::submissions(id);
        if self.store.hget(&submissions_key, player).await?.is_some() {
            return Err(RoomError::AlreadySubmitted);
        }
        let cards_key = keys::cards(id);
        let cards = self
            .load_cards(id)
            .await?
            .ok_or_else(|| StoreError::corrupt(&cards_key, "round in progress without cards"))?;
        let result = game::validate(expression, &cards)?;

        let room_key = keys::room(id);
        if !self.store.hset_nx(&room_key, field::WINNER, player).await? {
            return Err(RoomError::AlreadySubmitted);
        }
        let time = now_millis();
        let submission = Submission { expression: expression.trim().to_string(), time, result };
        self.store
            .hset_nx(&submissions_key, player, &encode(&submissions_key, &submission)?)
            .await?;
        let elapsed_ms = time.saturating_sub(room.start_time.unwrap_or(time));

        let winner_key = keys::user(player);
        self.store.hincr_by(&winner_key, field::SCORE, 1).await?;
        self.store.hincr_by(&winner_key, field::WINS, 1).await?;
        self.store.hincr_by(&winner_key, field::GAMES, 1).await?;
        let folded: HashSet<String> =
            self.store.smembers(&keys::folds(id)).await?.into_iter().collect();
        for member in self.members(id).await? {
            if member != player && !folded.contains(&member) {
                self.store.hincr_by(&keys::user(&member), field::GAMES, 1).await?;
            }
        }
        self.store
            .hset(&room_key, field::STATUS, RoomStatus::Finished.as_str())
            .await?;
        tracing::info!(room = %id, player, elapsed_ms, "round won");

        Ok(SubmitOutcome {
            winner: player.to_string(),
            elapsed_ms,
            expression: submission.expression,
            result,
        })
    }

    pub async fn fold(&self, id: &str, player: &str) -> Result<FoldOutcome, RoomError> {
        let room = self.load(id).await?;
        if room.status != RoomStatus::Playing {
            return Err(RoomError::NotPlaying);
        }
        if !self.store.sismember(&keys::players(id), player).await? {
            return Err(RoomError::NotMember);
        }
        if !self.store.sadd(&keys::folds(id), player).await? {
            return Err(RoomError::AlreadyFolded);
        }

        let members = self.members(id).await?;
        let folded: HashSet<String> =
            self.store.smembers(&keys::folds(id)).await?.into_iter().collect();
        let folded_count = members.iter().filter(|m| folded.contains(*m)).count();
        let total_players = members.len();
        tracing::info!(room = %id, player, folded_count, total_players, "player folded");

        if !members.iter().all(|m| folded.contains(m)) {
            return Ok(FoldOutcome {
                is_draw: false,
                folded_count,
                total_players,
                has_answer: None,
                solutions: None,
            });
        }

        let (is_draw, record) = match self.resolve_draw(id, &members).await? {
            Some(record) => (true, Some(record)),
            // another request resolved the round first
            None => match self.store.hget(&keys::room(id), field::WINNER).await?.as_deref() {
                Some(DRAW) => (true, self.load_solution(id).await?),
                _ => (false, None),
            },
        };
        Ok(FoldOutcome {
            is_draw,
            folded_count,
            total_players,
            has_answer: record.as_ref().map(|r| r.has_answer),
            solutions: record.map(|r| r.solutions),
        })
    }

    /// Ends the round as a draw unless it already has a result. Returns the
    /// stored solution record when this call resolved it.
    async fn resolve_draw(
        &self,
        id: &str,
        members: &[String],
    ) -> StoreResult<Option<SolutionRecord>> {
        let cards_key = keys::cards(id);
        let cards = self
            .load_cards(id)
            .await?
            .ok_or_else(|| StoreError::corrupt(&cards_key, "round in progress without cards"))?;
        let room_key = keys::room(id);
        if !self.store.hset_nx(&room_key, field::WINNER, DRAW).await? {
            return Ok(None);
        }

        let solutions = game::solve(&cards);
        let record = SolutionRecord { has_answer: !solutions.is_empty(), solutions, cards };
        let solutions_key = keys::solutions(id);
        self.store
            .set(&solutions_key, &encode(&solutions_key, &record)?)
            .await?;
        self.store
            .hset(&room_key, field::STATUS, RoomStatus::Finished.as_str())
            .await?;
        for member in members {
            self.store.hincr_by(&keys::user(member), field::GAMES, 1).await?;
        }
        tracing::info!(room = %id, has_answer = record.has_answer, "round drawn");
        Ok(Some(record))
    }

    pub async fn game_state(&self, id: &str) -> Result<GameState, RoomError> {
        let room = self.load(id).await?;
        let cards = self.load_cards(id).await?;
        let folded_players = self.store.smembers(&keys::folds(id)).await?;
        let solution_data = if room.status == RoomStatus::Finished && room.is_draw() {
            self.load_solution(id).await?
        } else {
            None
        };
        Ok(GameState {
            status: room.status,
            cards,
            winner: room.winner,
            current_round: room.current_round,
            folded_players,
            solution_data,
        })
    }
}
