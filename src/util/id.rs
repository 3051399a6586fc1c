//! ID utilities (short room codes).

use ulid::Ulid;

pub const ROOM_ID_LEN: usize = 6;

/// Generate a short, uppercase room code from the random half of a ULID.
///
/// Uniqueness is not guaranteed here; creation claims the id in the store
/// and retries on collision.
pub fn new_room_id() -> String {
    let ulid = Ulid::new().to_string();
    // the leading 10 chars encode the timestamp and barely vary
    ulid[ulid.len() - ROOM_ID_LEN..].to_string()
}
