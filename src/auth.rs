//! Session-based authentication for the mutating endpoints.
//!
//! A session is an HS256 token carried in the `fenav_session` cookie or an
//! `Authorization: Bearer` header. Sessions are issued by exchanging the
//! configured service token at `POST /api/auth/login`.

pub mod handlers;
pub mod middleware;
pub mod models;
pub mod session;
