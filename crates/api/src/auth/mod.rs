//! Access-token primitives.
//!
//! Users and logins live in the identity service; this server only verifies
//! the HS256 tokens it issues.

pub mod jwt;
