use base64::engine::general_purpose::STANDARD as BASE64_STANDARD;
use base64::Engine;
use sha2::{Digest, Sha256};

/// Answer to an obs-websocket v5 authentication challenge:
/// `base64(sha256(base64(sha256(password + salt)) + challenge))`.
pub fn auth_response(password: &str, salt: &str, challenge: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(password.as_bytes());
    hasher.update(salt.as_bytes());
    let secret = BASE64_STANDARD.encode(hasher.finalize());

    let mut hasher = Sha256::new();
    hasher.update(secret.as_bytes());
    hasher.update(challenge.as_bytes());
    BASE64_STANDARD.encode(hasher.finalize())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn response_is_deterministic() {
        let a = auth_response("hunter2", "salt", "challenge");
        let b = auth_response("hunter2", "salt", "challenge");
        assert_eq!(a, b);
    }

    #[test]
    fn response_is_base64_of_a_sha256() {
        // 32 hash bytes encode to 44 base64 characters
        assert_eq!(auth_response("pw", "s", "c").len(), 44);
    }

    #[test]
    fn every_input_influences_the_hash() {
        let base = auth_response("pw", "salt", "challenge");
        assert_ne!(base, auth_response("pw2", "salt", "challenge"));
        assert_ne!(base, auth_response("pw", "salt2", "challenge"));
        assert_ne!(base, auth_response("pw", "salt", "challenge2"));
    }
}
