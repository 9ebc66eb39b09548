//! Declarative per-route access requirements.
//!
//! Routes are grouped by [`Access`] level and each group is wrapped in
//! [`enforce`] once, so handlers never repeat token or role checks. A
//! successful check stores the [`Caller`] in the request extensions. Public
//! routes are left unwrapped.

use axum::{
    extract::{Request, State},
    middleware::Next,
    response::Response,
};

use super::token::{Caller, TokenService};
use crate::error::AppError;
use crate::models::Role;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Access {
    /// Any caller with a valid token.
    Authenticated,
    /// A valid token whose role is in the set.
    Roles(&'static [Role]),
}

impl Access {
    pub const STAFF: Access = Access::Roles(&[Role::Admin, Role::CompanyAdmin]);
    pub const ADMIN: Access = Access::Roles(&[Role::Admin]);

    pub fn permits(&self, caller: &Caller) -> bool {
        match self {
            Access::Authenticated => true,
            Access::Roles(roles) => roles.contains(&caller.role),
        }
    }
}

/// Middleware state: token verifier plus the requirement of one route group.
#[derive(Clone)]
pub struct Gate {
    tokens: TokenService,
    access: Access,
}

impl Gate {
    pub fn new(tokens: TokenService, access: Access) -> Self {
        Self { tokens, access }
    }
}

pub async fn enforce(
    State(gate): State<Gate>,
    mut request: Request,
    next: Next,
) -> Result<Response, AppError> {
    let caller = gate.tokens.authenticate(request.headers())?;
    if !gate.access.permits(&caller) {
        tracing::info!(caller_id = %caller.id, role = caller.role.as_str(), path = %request.uri().path(), "insufficient role");
        return Err(AppError::forbidden("Insufficient permissions"));
    }

    request.extensions_mut().insert(caller);
    Ok(next.run(request).await)
}
