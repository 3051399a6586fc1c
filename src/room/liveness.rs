//! Presence tracking.
//!
//! Each member refreshes a `heartbeat:{room}:{player}` key that expires after
//! the configured TTL. A sweep drops members whose key is gone, using the same
//! path as a voluntary departure, so ownership moves on and empty rooms are
//! destroyed. Sweeps are idempotent and safe to run from several replicas at
//! once; only the caller whose removal succeeded counts it.

use crate::util::time::now_millis;

use super::keys;
use super::manager::{RoomError, RoomManager};
use super::model::SweepReport;

impl RoomManager {
    pub(super) async fn touch(&self, id: &str, player: &str) -> Result<(), RoomError> {
        self.store
            .set_ex(
                &keys::heartbeat(id, player),
                &now_millis().to_string(),
                self.settings.heartbeat_ttl,
            )
            .await?;
        Ok(())
    }

    pub async fn heartbeat(&self, id: &str, player: &str) -> Result<(), RoomError> {
        if !self.store.exists(&keys::room(id)).await? {
            return Err(RoomError::NotFound);
        }
        if !self.store.sismember(&keys::players(id), player).await? {
            return Err(RoomError::NotMember);
        }
        self.touch(id, player).await?;
        tracing::debug!(room = %id, player, "heartbeat");
        Ok(())
    }

    pub async fn sweep(&self) -> Result<SweepReport, RoomError> {
        let mut report = SweepReport::default();
        for id in self.store.smembers(keys::ROOMS_ALL).await? {
            let members = self.members(&id).await?;
            if members.is_empty() {
                if self.destroy(&id).await? {
                    report.cleaned_rooms += 1;
                }
                continue;
            }
            for member in members {
                if self.store.exists(&keys::heartbeat(&id, &member)).await? {
                    continue;
                }
                let departure = self.drop_member(&id, &member).await?;
                if departure.removed {
                    report.cleaned_players += 1;
                    tracing::info!(room = %id, player = %member, "dropped stale player");
                }
                if departure.destroyed_here {
                    report.cleaned_rooms += 1;
                }
                if departure.remaining.is_empty() {
                    break;
                }
            }
        }
        if report != SweepReport::default() {
            tracing::info!(
                players = report.cleaned_players,
                rooms = report.cleaned_rooms,
                "sweep finished"
            );
        }
        Ok(report)
    }

    /// Runs a sweep unless one ran within the sweep interval, on this or any
    /// other replica sharing the store.
    pub async fn sweep_if_due(&self) -> Result<Option<SweepReport>, RoomError> {
        let claimed = self
            .store
            .set_nx_ex(
                keys::SWEEP_MARKER,
                &now_millis().to_string(),
                self.settings.sweep_interval,
            )
            .await?;
        if !claimed {
            return Ok(None);
        }
        self.sweep().await.map(Some)
    }
}
