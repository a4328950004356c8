use rand::{rngs::OsRng, RngCore};
use sha2::{Digest, Sha256};
use time::{Duration, OffsetDateTime};

const SECRET_BYTES: usize = 32;

/// A freshly issued reset secret. `raw` goes to the user by mail, only `hash` is stored.
pub struct ResetToken {
    pub raw: String,
    pub hash: String,
    pub expires_at: OffsetDateTime,
}

impl ResetToken {
    pub fn generate(now: OffsetDateTime, ttl: Duration) -> Self {
        let mut bytes = [0u8; SECRET_BYTES];
        OsRng.fill_bytes(&mut bytes);
        let raw = hex::encode(bytes);
        let hash = hash_reset_token(&raw);
        Self {
            raw,
            hash,
            expires_at: now + ttl,
        }
    }
}

/// SHA-256 hex digest of a raw reset secret.
pub fn hash_reset_token(raw: &str) -> String {
    hex::encode(Sha256::digest(raw.as_bytes()))
}

pub fn reset_url(frontend_url: &str, raw: &str) -> String {
    format!("{}/reset-password/{}", frontend_url.trim_end_matches('/'), raw)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn generated_token_hashes_to_stored_hash() {
        let now = OffsetDateTime::now_utc();
        let token = ResetToken::generate(now, Duration::minutes(15));
        assert_eq!(token.raw.len(), SECRET_BYTES * 2);
        assert_ne!(token.raw, token.hash);
        assert_eq!(hash_reset_token(&token.raw), token.hash);
        assert_eq!(token.expires_at - now, Duration::minutes(15));
    }

    #[test]
    fn tokens_are_unique() {
        let now = OffsetDateTime::now_utc();
        let a = ResetToken::generate(now, Duration::minutes(15));
        let b = ResetToken::generate(now, Duration::minutes(15));
        assert_ne!(a.raw, b.raw);
        assert_ne!(a.hash, b.hash);
    }

    #[test]
    fn hash_matches_known_sha256() {
        assert_eq!(
            hash_reset_token("abc"),
            "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"
        );
    }

    #[test]
    fn reset_url_embeds_raw_secret() {
        assert_eq!(
            reset_url("https://lf.example/", "deadbeef"),
            "https://lf.example/reset-password/deadbeef"
        );
    }
}
