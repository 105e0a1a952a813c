//! One-time-password collaborator: TOTP secrets, provisioning URIs and
//! code verification (Google Authenticator compatible: SHA-1, 6 digits,
//! 30 s step, one step of clock skew either way).

use totp_rs::{Algorithm, Secret, TOTP};

use crate::error::{AuthError, AuthResult};

pub trait OtpProvider: Send + Sync {
    /// Fresh base32-encoded shared secret.
    fn generate_secret(&self) -> String;

    /// `otpauth://` URI for QR-code rendering (the rendering itself is
    /// external).
    fn provisioning_uri(&self, account_label: &str, issuer: &str, secret: &str)
        -> AuthResult<String>;

    fn verify(&self, code: &str, secret: &str) -> bool;
}

pub struct TotpProvider {
    digits: usize,
    skew: u8,
    step: u64,
}

impl TotpProvider {
    pub fn new() -> Self {
        Self { digits: 6, skew: 1, step: 30 }
    }

    fn decode(secret: &str) -> AuthResult<Vec<u8>> {
        Secret::Encoded(secret.to_string())
            .to_bytes()
            .map_err(|e| AuthError::Internal(format!("otp secret decode: {e:?}")))
    }
}

impl Default for TotpProvider {
    fn default() -> Self {
        Self::new()
    }
}

impl OtpProvider for TotpProvider {
    fn generate_secret(&self) -> String {
        let mut buf = [0u8; 20];
        let _ = getrandom::getrandom(&mut buf);
        Secret::Raw(buf.to_vec()).to_encoded().to_string()
    }

    fn provisioning_uri(
        &self,
        account_label: &str,
        issuer: &str,
        secret: &str,
    ) -> AuthResult<String> {
        let totp = TOTP::new(
            Algorithm::SHA1,
            self.digits,
            self.skew,
            self.step,
            Self::decode(secret)?,
            Some(issuer.to_string()),
            account_label.to_string(),
        )
        .map_err(|e| AuthError::Internal(format!("otp uri: {e}")))?;
        Ok(totp.get_url())
    }

    fn verify(&self, code: &str, secret: &str) -> bool {
        let Ok(bytes) = Self::decode(secret) else {
            return false;
        };
        let totp = TOTP::new_unchecked(
            Algorithm::SHA1,
            self.digits,
            self.skew,
            self.step,
            bytes,
            None,
            String::new(),
        );
        totp.check_current(code).unwrap_or(false)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn secrets_are_fresh_and_decodable() {
        let provider = TotpProvider::new();
        let a = provider.generate_secret();
        let b = provider.generate_secret();
        assert_ne!(a, b);
        assert_eq!(TotpProvider::decode(&a).unwrap().len(), 20);
    }

    #[test]
    fn provisioning_uri_carries_issuer_and_label() {
        let provider = TotpProvider::new();
        let secret = provider.generate_secret();
        let uri = provider.provisioning_uri("alice@example.com", "keyward", &secret).unwrap();
        assert!(uri.starts_with("otpauth://totp/"), "uri was: {uri}");
        assert!(uri.contains("keyward"));
        assert!(uri.contains("alice%40example.com") || uri.contains("alice@example.com"));
    }

    #[test]
    fn current_code_verifies_and_junk_does_not() {
        let provider = TotpProvider::new();
        let secret = provider.generate_secret();
        // compute the current code with the same parameters
        let totp = TOTP::new_unchecked(
            Algorithm::SHA1,
            6,
            1,
            30,
            TotpProvider::decode(&secret).unwrap(),
            None,
            String::new(),
        );
        let code = totp.generate_current().unwrap();
        assert!(provider.verify(&code, &secret));
        assert!(!provider.verify("000000", &secret) || code == "000000");
        assert!(!provider.verify("not-a-code", &secret));
        assert!(!provider.verify(&code, "!!not-base32!!"));
    }
}
