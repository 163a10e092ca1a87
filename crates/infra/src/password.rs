//! Argon2id password hashing behind the identity service's `PasswordHasher` port.
//!
//! Stored hashes are PHC strings, so each one carries its own salt and cost
//! parameters. Changing the cost only affects newly registered accounts.

use argon2::password_hash::{self, SaltString, rand_core::OsRng};
use argon2::{Algorithm, Argon2, Params, PasswordHash, PasswordHasher, PasswordVerifier, Version};

use warden_auth::{HashingError, PasswordHasher as PasswordHasherPort};

/// Argon2id cost for new hashes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PasswordCost {
    pub memory_kib: u32,
    pub iterations: u32,
    pub parallelism: u32,
}

/// m=19 MiB, t=2, p=1.
impl Default for PasswordCost {
    fn default() -> Self {
        Self {
            memory_kib: 19 * 1024,
            iterations: 2,
            parallelism: 1,
        }
    }
}

impl PasswordCost {
    fn params(&self) -> Result<Params, HashingError> {
        Params::new(self.memory_kib, self.iterations, self.parallelism, None)
            .map_err(|e| hashing_error("invalid argon2 parameters", e.into()))
    }
}

#[derive(Clone)]
pub struct Argon2PasswordHasher {
    argon2: Argon2<'static>,
}

impl Argon2PasswordHasher {
    pub fn new() -> Self {
        Self::from_params(PasswordCost::default().params().unwrap_or_default())
    }

    /// Rejected when argon2 considers the cost out of range.
    pub fn with_cost(cost: PasswordCost) -> Result<Self, HashingError> {
        Ok(Self::from_params(cost.params()?))
    }

    fn from_params(params: Params) -> Self {
        Self {
            argon2: Argon2::new(Algorithm::Argon2id, Version::V0x13, params),
        }
    }
}

impl Default for Argon2PasswordHasher {
    fn default() -> Self {
        Self::new()
    }
}

fn hashing_error(context: &str, err: password_hash::Error) -> HashingError {
    HashingError(format!("{context}: {err}"))
}

impl PasswordHasherPort for Argon2PasswordHasher {
    fn hash_password(&self, password: &str) -> Result<String, HashingError> {
        let salt = SaltString::generate(&mut OsRng);
        self.argon2
            .hash_password(password.as_bytes(), &salt)
            .map(|hash| hash.to_string())
            .map_err(|e| hashing_error("failed to hash password", e))
    }

    /// A mismatch is `Ok(false)`; only an unreadable stored hash is an error.
    fn verify_password(&self, password: &str, hash: &str) -> Result<bool, HashingError> {
        let stored =
            PasswordHash::new(hash).map_err(|e| hashing_error("stored hash is not a PHC string", e))?;

        // Verification uses the parameters embedded in `stored`, not `self`'s.
        match self.argon2.verify_password(password.as_bytes(), &stored) {
            Ok(()) => Ok(true),
            Err(password_hash::Error::Password) => Ok(false),
            Err(e) => Err(hashing_error("password verification failed", e)),
        }
    }
}
