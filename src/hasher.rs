//! Password hashing collaborator: PHC-string Argon2id with a rehash
//! policy, plus the trait seam the orchestrator depends on.

use argon2::{Algorithm, Argon2, Params, PasswordHasher, PasswordVerifier, Version};
use password_hash::{PasswordHash, SaltString};

use crate::config::HashCost;
use crate::error::{AuthError, AuthResult};

pub trait Hasher: Send + Sync {
    fn hash(&self, plaintext: &str) -> AuthResult<String>;

    fn verify(&self, plaintext: &str, hash: &str) -> bool;

    /// True when the hash's embedded cost parameters are weaker than the
    /// current policy and the credential should be re-hashed on the next
    /// successful login.
    fn needs_rehash(&self, hash: &str) -> bool;
}

pub struct Argon2Hasher {
    cost: HashCost,
}

impl Argon2Hasher {
    pub fn new(cost: HashCost) -> Self {
        Self { cost }
    }

    fn argon2(&self) -> AuthResult<Argon2<'static>> {
        let params = Params::new(self.cost.m_cost_kib, self.cost.t_cost, self.cost.p_cost, None)
            .map_err(|e| AuthError::Internal(format!("argon2 params: {e}")))?;
        Ok(Argon2::new(Algorithm::Argon2id, Version::V0x13, params))
    }
}

impl Default for Argon2Hasher {
    fn default() -> Self {
        Self::new(HashCost::default())
    }
}

impl Hasher for Argon2Hasher {
    fn hash(&self, plaintext: &str) -> AuthResult<String> {
        let mut salt_bytes = [0u8; 16];
        getrandom::getrandom(&mut salt_bytes)
            .map_err(|e| AuthError::Internal(e.to_string()))?;
        let salt = SaltString::encode_b64(&salt_bytes)
            .map_err(|e| AuthError::Internal(e.to_string()))?;
        let phc = self
            .argon2()?
            .hash_password(plaintext.as_bytes(), &salt)
            .map_err(|e| AuthError::Internal(e.to_string()))?
            .to_string();
        Ok(phc)
    }

    fn verify(&self, plaintext: &str, hash: &str) -> bool {
        if let Ok(parsed) = PasswordHash::new(hash) {
            // params come from the PHC string itself
            Argon2::default().verify_password(plaintext.as_bytes(), &parsed).is_ok()
        } else {
            false
        }
    }

    fn needs_rehash(&self, hash: &str) -> bool {
        let Ok(parsed) = PasswordHash::new(hash) else {
            // unreadable hash: force a rehash at the next opportunity
            return true;
        };
        let param = |key: &str| {
            parsed
                .params
                .iter()
                .find(|(ident, _)| ident.as_str() == key)
                .and_then(|(_, v)| v.decimal().ok())
        };
        let (Some(m), Some(t), Some(p)) = (param("m"), param("t"), param("p")) else {
            return true;
        };
        m < self.cost.m_cost_kib || t < self.cost.t_cost || p < self.cost.p_cost
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fast_cost() -> HashCost {
        HashCost { m_cost_kib: 1024, t_cost: 1, p_cost: 1 }
    }

    #[test]
    fn hash_then_verify_round_trip() {
        let hasher = Argon2Hasher::new(fast_cost());
        let phc = hasher.hash("S3gura!2024").unwrap();
        assert!(phc.starts_with("$argon2id$"));
        assert!(hasher.verify("S3gura!2024", &phc));
        assert!(!hasher.verify("wrong", &phc));
        assert!(!hasher.verify("S3gura!2024", "not-a-phc-string"));
    }

    #[test]
    fn rehash_flags_weaker_params_only() {
        let weak = Argon2Hasher::new(fast_cost());
        let phc = weak.hash("S3gura!2024").unwrap();
        // same policy: fine as-is
        assert!(!weak.needs_rehash(&phc));
        // stricter policy: flags the old hash
        let strict = Argon2Hasher::new(HashCost { m_cost_kib: 2048, t_cost: 2, p_cost: 1 });
        assert!(strict.needs_rehash(&phc));
        // garbage is always due for rehash
        assert!(weak.needs_rehash("garbage"));
    }
}
