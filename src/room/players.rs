//! Player registration and standings.

use crate::util::time::now_millis;

use super::keys::{self, field};
use super::manager::{RoomError, RoomManager};
use super::model::{DRAW, LeaderboardEntry, PlayerProfile};

impl RoomManager {
    pub async fn register(&self, username: &str) -> Result<PlayerProfile, RoomError> {
        let username = username.trim();
        if username.is_empty() {
            return Err(RoomError::InvalidName("username must not be empty"));
        }
        // would be indistinguishable from a drawn round's winner
        if username == DRAW {
            return Err(RoomError::InvalidName("username is reserved"));
        }
        if username.contains(':') {
            return Err(RoomError::InvalidName("username must not contain ':'"));
        }

        let key = keys::user(username);
        if !self.store.hset_nx(&key, field::USERNAME, username).await? {
            return Err(RoomError::UsernameTaken);
        }
        let created_at = now_millis();
        self.store
            .hset_many(
                &key,
                &[
                    (field::SCORE, "0".to_string()),
                    (field::WINS, "0".to_string()),
                    (field::GAMES, "0".to_string()),
                    (field::CREATED_AT, created_at.to_string()),
                ],
            )
            .await?;
        self.store.sadd(keys::USERS_ALL, username).await?;
        tracing::info!(player = username, "player registered");

        Ok(PlayerProfile {
            username: username.to_string(),
            score: 0,
            wins: 0,
            games: 0,
            created_at,
        })
    }

    pub async fn profile(&self, username: &str) -> Result<PlayerProfile, RoomError> {
        let key = keys::user(username);
        let hash = self.store.hget_all(&key).await?;
        PlayerProfile::from_hash(&key, &hash)?.ok_or(RoomError::PlayerNotFound)
    }

    /// Every registered player, best score first. Ties keep name order.
    pub async fn leaderboard(&self) -> Result<Vec<LeaderboardEntry>, RoomError> {
        let mut profiles = Vec::new();
        for name in self.store.smembers(keys::USERS_ALL).await? {
            match self.profile(&name).await {
                Ok(profile) => profiles.push(profile),
                Err(RoomError::PlayerNotFound) => {
                    tracing::warn!(player = %name, "indexed player has no record");
                }
                Err(e) => return Err(e),
            }
        }
        profiles.sort_by(|a, b| b.score.cmp(&a.score).then_with(|| a.username.cmp(&b.username)));

        Ok(profiles
            .into_iter()
            .enumerate()
            .map(|(i, profile)| LeaderboardEntry {
                rank: i + 1,
                win_rate: profile.win_rate(),
                profile,
            })
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use crate::room::manager::tests::{manager_with, room_with};
    use crate::room::manager::RoomError;

    #[tokio::test]
    async fn registration_rejects_bad_and_duplicate_names() {
        let manager = manager_with(&[]).await;
        let alice = manager.register("  alice ").await.unwrap();
        assert_eq!(alice.username, "alice");
        assert_eq!((alice.score, alice.wins, alice.games), (0, 0, 0));
        assert!(matches!(manager.register("alice").await, Err(RoomError::UsernameTaken)));
        assert!(matches!(manager.register("").await, Err(RoomError::InvalidName(_))));
        assert!(matches!(manager.register("draw").await, Err(RoomError::InvalidName(_))));
        assert!(matches!(manager.register("a:b").await, Err(RoomError::InvalidName(_))));
        assert_eq!(manager.profile("alice").await.unwrap(), alice);
        assert!(matches!(manager.profile("bob").await, Err(RoomError::PlayerNotFound)));
    }

    #[tokio::test]
    async fn leaderboard_ranks_by_score() {
        let manager = manager_with(&["ann", "bob", "cat"]).await;
        let id = room_with(&manager, &["ann", "bob", "cat"]).await;
        manager.start(&id, "ann").await.unwrap();
        manager.store.set(&crate::room::keys::cards(&id), "[2,3,4,5]").await.unwrap();
        manager.submit(&id, "cat", "4*(5+3-2)").await.unwrap();

        let board = manager.leaderboard().await.unwrap();
        let order: Vec<(&str, usize)> =
            board.iter().map(|e| (e.profile.username.as_str(), e.rank)).collect();
        assert_eq!(order, vec![("cat", 1), ("ann", 2), ("bob", 3)]);
        assert_eq!(board[0].win_rate, "100.0");
        assert_eq!(board[1].win_rate, "0.0");

        let json = serde_json::to_value(&board[0]).unwrap();
        assert_eq!(json["username"], "cat");
        assert_eq!(json["winRate"], "100.0");
        assert_eq!(json["rank"], 1);
    }
}
