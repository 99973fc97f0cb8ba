use aes_gcm::aead::generic_array::GenericArray;
use aes_gcm::{aead::Aead, Aes256Gcm, KeyInit};
use base64::engine::general_purpose::{STANDARD, URL_SAFE_NO_PAD};
use base64::Engine;
use rand::{Rng, RngCore};
use sha2::{Digest, Sha256};
use subtle::ConstantTimeEq;

use crate::error::AppError;

const NONCE_LEN: usize = 12;

/// Authenticated encryption for authorization-code envelopes.
///
/// The value handed to the client is `base64url(nonce || AES-256-GCM ciphertext)`.
/// Any tamper, wrong key, or malformed input fails closed as `InvalidCode`.
#[derive(Clone)]
pub struct CodeCipher {
    key: [u8; 32],
}

impl CodeCipher {
    /// Build from a base64-encoded 32-byte key (the `AUTH_CODE_SECRET` config value).
    pub fn new(encoded_key: &str) -> Result<Self, AppError> {
        let key_bytes = STANDARD
            .decode(encoded_key)
            .map_err(|e| AppError::Internal(format!("Invalid code secret encoding: {e}")))?;
        if key_bytes.len() != 32 {
            return Err(AppError::Internal(format!(
                "Code secret must be 32 bytes, got {}",
                key_bytes.len()
            )));
        }
        let mut key = [0u8; 32];
        key.copy_from_slice(&key_bytes);
        Ok(Self { key })
    }

    pub fn seal(&self, plaintext: &str) -> Result<String, AppError> {
        let cipher = Aes256Gcm::new(GenericArray::from_slice(&self.key));

        let mut nonce_bytes = [0u8; NONCE_LEN];
        rand::thread_rng().fill_bytes(&mut nonce_bytes);
        let nonce = GenericArray::from_slice(&nonce_bytes);

        let ciphertext = cipher
            .encrypt(nonce, plaintext.as_bytes())
            .map_err(|e| AppError::Internal(format!("Code encryption failed: {e}")))?;

        let mut envelope = Vec::with_capacity(NONCE_LEN + ciphertext.len());
        envelope.extend_from_slice(&nonce_bytes);
        envelope.extend_from_slice(&ciphertext);

        Ok(URL_SAFE_NO_PAD.encode(envelope))
    }

    pub fn open(&self, sealed: &str) -> Result<String, AppError> {
        let envelope = URL_SAFE_NO_PAD
            .decode(sealed)
            .map_err(|_| AppError::InvalidCode)?;
        if envelope.len() < NONCE_LEN {
            return Err(AppError::InvalidCode);
        }

        let cipher = Aes256Gcm::new(GenericArray::from_slice(&self.key));
        let nonce = GenericArray::from_slice(&envelope[..NONCE_LEN]);

        let plaintext = cipher
            .decrypt(nonce, &envelope[NONCE_LEN..])
            .map_err(|_| AppError::InvalidCode)?;

        String::from_utf8(plaintext).map_err(|_| AppError::InvalidCode)
    }
}

/// Compute the S256 challenge for a verifier: `BASE64URL(SHA256(verifier))`.
pub fn pkce_challenge(code_verifier: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(code_verifier.as_bytes());
    URL_SAFE_NO_PAD.encode(hasher.finalize())
}

/// Verify a PKCE code_verifier against the stored S256 code_challenge.
/// Constant-time comparison to prevent timing attacks.
pub fn verify_pkce(code_verifier: &str, code_challenge: &str) -> bool {
    pkce_challenge(code_verifier)
        .as_bytes()
        .ct_eq(code_challenge.as_bytes())
        .into()
}

/// A code_challenge is well-formed when it is a 43-character base64url
/// encoding of a SHA-256 digest (RFC 7636, S256 only).
pub fn challenge_is_well_formed(code_challenge: &str) -> bool {
    code_challenge.len() == 43
        && code_challenge
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
}

/// Generate an opaque client identifier.
pub fn generate_client_id() -> String {
    let mut rng = rand::thread_rng();
    let bytes: Vec<u8> = (0..16).map(|_| rng.gen()).collect();
    format!("client_{}", hex::encode(bytes))
}

/// Generate a client secret. Shown once at registration, stored hashed.
pub fn generate_client_secret() -> String {
    let mut rng = rand::thread_rng();
    let bytes: Vec<u8> = (0..32).map(|_| rng.gen()).collect();
    hex::encode(bytes)
}

/// Generate the random server-side id for an authorization-code row.
pub fn generate_code_id() -> String {
    let mut rng = rand::thread_rng();
    let bytes: Vec<u8> = (0..32).map(|_| rng.gen()).collect();
    hex::encode(bytes)
}

/// Generate a base64-encoded 32-byte key, suitable for `AUTH_CODE_SECRET`.
pub fn generate_code_secret() -> String {
    let mut key = [0u8; 32];
    rand::thread_rng().fill_bytes(&mut key);
    STANDARD.encode(key)
}
