pub mod accounts;
pub mod admin;
pub mod authorize;
pub mod token;
pub mod well_known;
