pub mod codes;
pub mod consent;
pub mod crypto;
pub mod exchange;
pub mod flow;
pub mod jwt;
pub mod middleware;
pub mod password;
pub mod registry;
pub mod tokens;
