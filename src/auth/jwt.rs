use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use chrono::Utc;
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use rsa::pkcs8::DecodePublicKey;
use rsa::traits::PublicKeyParts;
use rsa::RsaPublicKey;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::config::Config;
use crate::error::AppError;

pub const TOKEN_TYPE_ACCESS: &str = "access";
pub const TOKEN_TYPE_REFRESH: &str = "refresh";
pub const TOKEN_TYPE_STATE: &str = "state";

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct AccessClaims {
    pub sub: String, // username
    pub client_id: String,
    pub scopes: Vec<String>,
    pub iss: String,
    pub exp: i64,
    pub iat: i64,
    #[serde(rename = "type")]
    pub token_type: String,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct RefreshClaims {
    pub sub: String,
    pub client_id: String,
    pub scopes: Vec<String>,
    pub family_id: String,
    pub generation: i64,
    pub iss: String,
    pub exp: i64,
    pub iat: i64,
    #[serde(rename = "type")]
    pub token_type: String,
}

/// The in-flight authorize request, carried across the login and consent
/// redirects as a signed capability instead of server-side session state.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct StateClaims {
    /// Username, present only once the login step has completed.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sub: Option<String>,
    pub client_id: String,
    pub scopes: Vec<String>,
    pub redirect_uri: String,
    pub state: String,
    pub code_challenge: String,
    pub iss: String,
    pub exp: i64,
    pub iat: i64,
    #[serde(rename = "type")]
    pub token_type: String,
}

/// Unsigned payload for a state token; the signer adds issuer and expiry.
#[derive(Debug, Clone)]
pub struct StatePayload {
    pub username: Option<String>,
    pub client_id: String,
    pub scopes: Vec<String>,
    pub redirect_uri: String,
    pub state: String,
    pub code_challenge: String,
}

/// JWK entry published at /.well-known/jwks.json.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JsonWebKey {
    pub kty: String,
    #[serde(rename = "use")]
    pub key_use: String,
    pub kid: String,
    pub alg: String,
    pub n: String,
    pub e: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JsonWebKeySet {
    pub keys: Vec<JsonWebKey>,
}

/// Signs and verifies all three token kinds with an RS256 key pair.
/// Verification needs only the public half, so resource servers can check
/// tokens without secret material.
#[derive(Clone)]
pub struct TokenSigner {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    public_pem: String,
    issuer: String,
    access_token_ttl_secs: i64,
    refresh_token_ttl_secs: i64,
    state_token_ttl_secs: i64,
}

impl TokenSigner {
    pub fn new(config: &Config) -> Result<Self, AppError> {
        let private_pem = std::fs::read_to_string(&config.jwt_private_key_path)
            .map_err(|e| AppError::Internal(format!("Failed to read private key: {e}")))?;
        let public_pem = std::fs::read_to_string(&config.jwt_public_key_path)
            .map_err(|e| AppError::Internal(format!("Failed to read public key: {e}")))?;

        Self::from_pem(&private_pem, &public_pem, config)
    }

    /// Build from in-memory PEM strings. Tests use this with ephemeral keys.
    pub fn from_pem(
        private_pem: &str,
        public_pem: &str,
        config: &Config,
    ) -> Result<Self, AppError> {
        let encoding_key = EncodingKey::from_rsa_pem(private_pem.as_bytes())
            .map_err(|e| AppError::Internal(format!("Invalid private key: {e}")))?;
        let decoding_key = DecodingKey::from_rsa_pem(public_pem.as_bytes())
            .map_err(|e| AppError::Internal(format!("Invalid public key: {e}")))?;

        Ok(Self {
            encoding_key,
            decoding_key,
            public_pem: public_pem.to_string(),
            issuer: config.jwt_issuer.clone(),
            access_token_ttl_secs: config.access_token_ttl_secs,
            refresh_token_ttl_secs: config.refresh_token_ttl_secs,
            state_token_ttl_secs: config.state_token_ttl_secs,
        })
    }

    pub fn access_token_ttl_secs(&self) -> i64 {
        self.access_token_ttl_secs
    }

    pub fn issue_access_token(
        &self,
        username: &str,
        client_id: &str,
        scopes: Vec<String>,
    ) -> Result<String, AppError> {
        let now = Utc::now().timestamp();
        let claims = AccessClaims {
            sub: username.to_string(),
            client_id: client_id.to_string(),
            scopes,
            iss: self.issuer.clone(),
            exp: now + self.access_token_ttl_secs,
            iat: now,
            token_type: TOKEN_TYPE_ACCESS.to_string(),
        };

        let header = Header::new(Algorithm::RS256);
        encode(&header, &claims, &self.encoding_key).map_err(AppError::Jwt)
    }

    pub fn issue_refresh_token(
        &self,
        username: &str,
        client_id: &str,
        scopes: Vec<String>,
        family_id: &str,
        generation: i64,
    ) -> Result<String, AppError> {
        let now = Utc::now().timestamp();
        let claims = RefreshClaims {
            sub: username.to_string(),
            client_id: client_id.to_string(),
            scopes,
            family_id: family_id.to_string(),
            generation,
            iss: self.issuer.clone(),
            exp: now + self.refresh_token_ttl_secs,
            iat: now,
            token_type: TOKEN_TYPE_REFRESH.to_string(),
        };

        let header = Header::new(Algorithm::RS256);
        encode(&header, &claims, &self.encoding_key).map_err(AppError::Jwt)
    }

    pub fn issue_state_token(&self, payload: StatePayload) -> Result<String, AppError> {
        let now = Utc::now().timestamp();
        let claims = StateClaims {
            sub: payload.username,
            client_id: payload.client_id,
            scopes: payload.scopes,
            redirect_uri: payload.redirect_uri,
            state: payload.state,
            code_challenge: payload.code_challenge,
            iss: self.issuer.clone(),
            exp: now + self.state_token_ttl_secs,
            iat: now,
            token_type: TOKEN_TYPE_STATE.to_string(),
        };

        let header = Header::new(Algorithm::RS256);
        encode(&header, &claims, &self.encoding_key).map_err(AppError::Jwt)
    }

    pub fn verify_access_token(&self, token: &str) -> Result<AccessClaims, AppError> {
        let claims: AccessClaims = self.decode_claims(
            token,
            &["sub", "exp", "iat"],
            AppError::ExpiredToken,
            AppError::InvalidToken,
        )?;
        if claims.token_type != TOKEN_TYPE_ACCESS {
            return Err(AppError::InvalidToken);
        }
        Ok(claims)
    }

    pub fn verify_refresh_token(&self, token: &str) -> Result<RefreshClaims, AppError> {
        let claims: RefreshClaims = self.decode_claims(
            token,
            &["sub", "exp", "iat"],
            AppError::ExpiredToken,
            AppError::InvalidToken,
        )?;
        if claims.token_type != TOKEN_TYPE_REFRESH {
            return Err(AppError::InvalidToken);
        }
        Ok(claims)
    }

    pub fn verify_state_token(&self, token: &str) -> Result<StateClaims, AppError> {
        let claims: StateClaims = self.decode_claims(
            token,
            &["exp", "iat"],
            AppError::ExpiredState,
            AppError::InvalidState,
        )?;
        if claims.token_type != TOKEN_TYPE_STATE {
            return Err(AppError::InvalidState);
        }
        Ok(claims)
    }

    /// Expired signatures map to the kind's expired error, every other
    /// decode failure to its invalid error. Nothing is partially trusted.
    fn decode_claims<T: serde::de::DeserializeOwned>(
        &self,
        token: &str,
        required: &[&str],
        expired: AppError,
        invalid: AppError,
    ) -> Result<T, AppError> {
        let mut validation = Validation::new(Algorithm::RS256);
        validation.set_issuer(&[&self.issuer]);
        validation.set_required_spec_claims(required);
        validation.validate_aud = false;

        match decode::<T>(token, &self.decoding_key, &validation) {
            Ok(data) => Ok(data.claims),
            Err(e) => match e.kind() {
                jsonwebtoken::errors::ErrorKind::ExpiredSignature => Err(expired),
                _ => Err(invalid),
            },
        }
    }

    /// Public signing key as a JWKS document. The kid is derived from the
    /// modulus digest so it is stable across restarts for the same key.
    pub fn jwks(&self) -> Result<JsonWebKeySet, AppError> {
        let public_key = RsaPublicKey::from_public_key_pem(&self.public_pem)
            .map_err(|e| AppError::Internal(format!("Invalid public key: {e}")))?;

        let n_bytes = public_key.n().to_bytes_be();
        let e_bytes = public_key.e().to_bytes_be();

        let mut hasher = Sha256::new();
        hasher.update(&n_bytes);
        let kid = hex::encode(&hasher.finalize()[..8]);

        Ok(JsonWebKeySet {
            keys: vec![JsonWebKey {
                kty: "RSA".to_string(),
                key_use: "sig".to_string(),
                kid,
                alg: "RS256".to_string(),
                n: URL_SAFE_NO_PAD.encode(n_bytes),
                e: URL_SAFE_NO_PAD.encode(e_bytes),
            }],
        })
    }
}
