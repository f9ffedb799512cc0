//! Reusable test fixtures built on the resolver

pub mod auth;

pub use auth::{Credentials, sign_in};
