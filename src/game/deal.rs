//! Card dealing.

use rand::Rng;

use super::{HAND_SIZE, Hand, MAX_CARD, MIN_CARD};

/// Deals a fresh hand, each card uniform in `MIN_CARD..=MAX_CARD`.
pub fn deal_with<R: Rng + ?Sized>(rng: &mut R) -> Hand {
    let mut hand = [0; HAND_SIZE];
    for card in hand.iter_mut() {
        *card = rng.gen_range(MIN_CARD..=MAX_CARD);
    }
    hand
}

pub fn deal() -> Hand {
    deal_with(&mut rand::thread_rng())
}
