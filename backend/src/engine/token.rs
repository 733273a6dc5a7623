use std::sync::{Mutex, PoisonError};

/// Shared source of session tokens.
///
/// Backed by `fastrand`'s wyrand generator, which is fast and
/// non-cryptographic: anyone who observes a few outputs can predict the rest.
pub struct TokenSource {
    rng: Mutex<fastrand::Rng>,
}

impl TokenSource {
    /// Seeds from `seed` when given, otherwise from process entropy.
    pub fn new(seed: Option<u64>) -> Self {
        let rng = match seed {
            Some(seed) => fastrand::Rng::with_seed(seed),
            None => fastrand::Rng::new(),
        };

        Self {
            rng: Mutex::new(rng),
        }
    }

    /// Next float in `[0, 1)` rendered as a decimal string.
    pub fn next_token(&self) -> String {
        let mut rng = self.rng.lock().unwrap_or_else(PoisonError::into_inner);
        rng.f64().to_string()
    }
}
