//! Store key layout.

pub const ROOMS_ALL: &str = "rooms:all";
pub const USERS_ALL: &str = "users:all";
pub const SWEEP_MARKER: &str = "sweep:last";

pub fn room(id: &str) -> String {
    format!("room:{id}")
}

pub fn players(id: &str) -> String {
    format!("room:{id}:players")
}

pub fn folds(id: &str) -> String {
    format!("room:{id}:folds")
}

pub fn cards(id: &str) -> String {
    format!("room:{id}:cards")
}

pub fn submissions(id: &str) -> String {
    format!("room:{id}:submissions")
}

pub fn solutions(id: &str) -> String {
    format!("room:{id}:solutions")
}

pub fn user(name: &str) -> String {
    format!("user:{name}")
}

pub fn heartbeat(room: &str, player: &str) -> String {
    format!("heartbeat:{room}:{player}")
}

/// Every key owned by a room, heartbeats excluded.
pub fn room_state(id: &str) -> Vec<String> {
    vec![
        room(id),
        players(id),
        folds(id),
        cards(id),
        submissions(id),
        solutions(id),
    ]
}

/// Fields of the room hash.
pub mod field {
    pub const ID: &str = "id";
    pub const NAME: &str = "name";
    pub const OWNER: &str = "owner";
    pub const STATUS: &str = "status";
    pub const CREATED_AT: &str = "createdAt";
    pub const CURRENT_ROUND: &str = "currentRound";
    pub const PLAYER_COUNT: &str = "playerCount";
    pub const MAX_PLAYERS: &str = "maxPlayers";
    pub const START_TIME: &str = "startTime";
    pub const WINNER: &str = "winner";

    pub const USERNAME: &str = "username";
    pub const SCORE: &str = "score";
    pub const WINS: &str = "wins";
    pub const GAMES: &str = "games";
}
