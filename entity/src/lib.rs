pub mod account;
pub mod authorization_code;
pub mod client;
pub mod consent;
pub mod refresh_token_family;
pub mod scope;
pub mod types;
