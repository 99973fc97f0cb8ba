use std::env;

#[derive(Clone, Debug)]
pub struct Config {
    pub database_url: String,
    pub jwt_private_key_path: String,
    pub jwt_public_key_path: String,
    pub jwt_issuer: String,
    pub access_token_ttl_secs: i64,
    pub refresh_token_ttl_secs: i64,
    pub state_token_ttl_secs: i64,
    pub auth_code_ttl_secs: i64,
    /// Base64-encoded 32-byte key for authorization-code encryption.
    pub auth_code_secret: String,
    pub admin_api_key: String,
    /// Where /oauth/authorize sends the user agent to collect credentials.
    pub login_page_url: String,
    /// Skip the consent prompt when every requested scope is already granted.
    pub silent_reauth: bool,
    pub server_host: String,
    pub server_port: u16,
}

impl Config {
    pub fn from_env() -> Result<Self, env::VarError> {
        Ok(Self {
            database_url: env::var("DATABASE_URL")?,
            jwt_private_key_path: env::var("JWT_PRIVATE_KEY_PATH")
                .unwrap_or_else(|_| "keys/private.pem".to_string()),
            jwt_public_key_path: env::var("JWT_PUBLIC_KEY_PATH")
                .unwrap_or_else(|_| "keys/public.pem".to_string()),
            jwt_issuer: env::var("JWT_ISSUER").unwrap_or_else(|_| "authz-service".to_string()),
            access_token_ttl_secs: env::var("ACCESS_TOKEN_TTL_SECS")
                .unwrap_or_else(|_| "900".to_string())
                .parse()
                .unwrap_or(900),
            refresh_token_ttl_secs: env::var("REFRESH_TOKEN_TTL_SECS")
                .unwrap_or_else(|_| "86400".to_string())
                .parse()
                .unwrap_or(86400),
            state_token_ttl_secs: env::var("STATE_TOKEN_TTL_SECS")
                .unwrap_or_else(|_| "60".to_string())
                .parse()
                .unwrap_or(60),
            auth_code_ttl_secs: env::var("AUTH_CODE_TTL_SECS")
                .unwrap_or_else(|_| "600".to_string())
                .parse()
                .unwrap_or(600),
            auth_code_secret: env::var("AUTH_CODE_SECRET")?,
            admin_api_key: env::var("ADMIN_API_KEY")?,
            login_page_url: env::var("LOGIN_PAGE_URL")
                .unwrap_or_else(|_| "http://localhost:5173/login".to_string()),
            silent_reauth: env::var("SILENT_REAUTH")
                .unwrap_or_else(|_| "true".to_string())
                .parse()
                .unwrap_or(true),
            server_host: env::var("SERVER_HOST").unwrap_or_else(|_| "127.0.0.1".to_string()),
            server_port: env::var("SERVER_PORT")
                .unwrap_or_else(|_| "3000".to_string())
                .parse()
                .unwrap_or(3000),
        })
    }
}
