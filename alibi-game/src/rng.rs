//! Deterministic RNG streams segregated by game domain.
//!
//! Every random draw in a session comes from one of these streams, so two
//! ends of an online table (or a replayed transcript) stay in lockstep as
//! long as they share a seed.

use hmac::{Hmac, Mac};
use rand::SeedableRng;
use rand_chacha::ChaCha20Rng;
use sha2::Sha256;
use std::cell::{RefCell, RefMut};

/// Bundle of per-domain RNG streams derived from one user-visible seed.
#[derive(Debug, Clone)]
pub struct RngBundle {
    casting: RefCell<CountingRng<ChaCha20Rng>>,
    opponent: RefCell<CountingRng<ChaCha20Rng>>,
    archive: RefCell<CountingRng<ChaCha20Rng>>,
}

impl RngBundle {
    /// Construct the bundle from a user-visible seed.
    #[must_use]
    pub fn from_user_seed(seed: u64) -> Self {
        let casting = CountingRng::new(derive_stream_seed(seed, b"casting"));
        let opponent = CountingRng::new(derive_stream_seed(seed, b"opponent"));
        let archive = CountingRng::new(derive_stream_seed(seed, b"archive"));
        Self {
            casting: RefCell::new(casting),
            opponent: RefCell::new(opponent),
            archive: RefCell::new(archive),
        }
    }

    /// Stream for culprit assignment and reuse re-casting.
    #[must_use]
    pub fn casting(&self) -> RefMut<'_, CountingRng<ChaCha20Rng>> {
        self.casting.borrow_mut()
    }

    /// Stream for machine-opponent answers and think-time jitter.
    #[must_use]
    pub fn opponent(&self) -> RefMut<'_, CountingRng<ChaCha20Rng>> {
        self.opponent.borrow_mut()
    }

    /// Stream for archive admission draws and room codes.
    #[must_use]
    pub fn archive(&self) -> RefMut<'_, CountingRng<ChaCha20Rng>> {
        self.archive.borrow_mut()
    }
}

/// Counting wrapper for RNG streams providing instrumentation.
#[derive(Debug, Clone)]
pub struct CountingRng<R> {
    rng: R,
    draws: u64,
}

impl CountingRng<ChaCha20Rng> {
    fn new(seed: u64) -> Self {
        Self {
            rng: ChaCha20Rng::seed_from_u64(seed),
            draws: 0,
        }
    }
}

impl<R: rand::RngCore> CountingRng<R> {
    /// Number of draw calls performed against this stream.
    #[must_use]
    pub const fn draws(&self) -> u64 {
        self.draws
    }
}

impl<R: rand::RngCore> rand::RngCore for CountingRng<R> {
    fn next_u32(&mut self) -> u32 {
        self.draws = self.draws.saturating_add(1);
        self.rng.next_u32()
    }

    fn next_u64(&mut self) -> u64 {
        self.draws = self.draws.saturating_add(1);
        self.rng.next_u64()
    }

    fn fill_bytes(&mut self, dest: &mut [u8]) {
        self.draws = self.draws.saturating_add(1);
        self.rng.fill_bytes(dest);
    }

    fn try_fill_bytes(&mut self, dest: &mut [u8]) -> Result<(), rand::Error> {
        self.draws = self.draws.saturating_add(1);
        self.rng.try_fill_bytes(dest)
    }
}

fn derive_stream_seed(user_seed: u64, domain_tag: &[u8]) -> u64 {
    let mut mac = Hmac::<Sha256>::new_from_slice(&user_seed.to_le_bytes())
        .expect("64-bit seed is valid key");
    mac.update(domain_tag);
    let digest = mac.finalize().into_bytes();
    let seed_bytes: [u8; 8] = digest[..8].try_into().expect("digest slice length");
    u64::from_le_bytes(seed_bytes)
}
