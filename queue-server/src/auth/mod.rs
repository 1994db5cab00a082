//! 认证模块 - JWT 签发/校验与口令哈希
//!
//! Staff accounts authenticate over HTTP (`/api/auth/login`) and present the
//! resulting JWT both on staff REST operations and in the event bus staff
//! handshake.

pub mod extractor;
pub mod jwt;
pub mod password;

pub use extractor::CurrentStaff;
pub use jwt::{Claims, JwtConfig, JwtError, JwtService};
