//! Credentials, session tokens and the route access gate.

pub mod gate;
pub mod password;
pub mod token;

pub use gate::{enforce, Access, Gate};
pub use password::PasswordHasher;
pub use token::{Caller, Claims, TokenService};
