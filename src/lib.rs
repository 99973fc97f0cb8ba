pub mod auth;
pub mod config;
pub mod error;
pub mod handlers;
pub mod keys;
pub mod routes;
pub mod seed;

use sea_orm::DatabaseConnection;

use auth::crypto::CodeCipher;
use auth::jwt::TokenSigner;
use config::Config;

#[derive(Clone)]
pub struct AppState {
    pub db: DatabaseConnection,
    pub signer: TokenSigner,
    pub code_cipher: CodeCipher,
    pub config: Config,
}

impl AsRef<AppState> for AppState {
    fn as_ref(&self) -> &AppState {
        self
    }
}
