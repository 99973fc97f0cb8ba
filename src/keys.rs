use std::path::Path;

use rsa::pkcs8::{EncodePrivateKey, EncodePublicKey, LineEnding};
use rsa::{RsaPrivateKey, RsaPublicKey};

use crate::error::AppError;

/// Generate an RSA key pair for RS256 signing, returned as
/// (private, public) PKCS#8 PEM strings.
pub fn generate_rsa_pem_pair(bits: usize) -> Result<(String, String), AppError> {
    let mut rng = rand::rngs::OsRng;
    let private_key = RsaPrivateKey::new(&mut rng, bits)
        .map_err(|e| AppError::Internal(format!("RSA key generation failed: {e}")))?;
    let public_key = RsaPublicKey::from(&private_key);

    let private_pem = private_key
        .to_pkcs8_pem(LineEnding::LF)
        .map_err(|e| AppError::Internal(format!("Failed to encode private key: {e}")))?
        .to_string();
    let public_pem = public_key
        .to_public_key_pem(LineEnding::LF)
        .map_err(|e| AppError::Internal(format!("Failed to encode public key: {e}")))?;

    Ok((private_pem, public_pem))
}

/// Generate a key pair and write it to the given paths, creating parent
/// directories as needed. Used by the `keygen` subcommand.
pub fn write_rsa_pem_pair(
    private_path: &str,
    public_path: &str,
    bits: usize,
) -> Result<(), AppError> {
    let (private_pem, public_pem) = generate_rsa_pem_pair(bits)?;

    for path in [private_path, public_path] {
        if let Some(parent) = Path::new(path).parent() {
            std::fs::create_dir_all(parent)
                .map_err(|e| AppError::Internal(format!("Failed to create {parent:?}: {e}")))?;
        }
    }

    std::fs::write(private_path, private_pem)
        .map_err(|e| AppError::Internal(format!("Failed to write {private_path}: {e}")))?;
    std::fs::write(public_path, public_pem)
        .map_err(|e| AppError::Internal(format!("Failed to write {public_path}: {e}")))?;

    Ok(())
}
