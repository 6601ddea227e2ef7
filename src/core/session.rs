// Typed session context for the authenticated back-office operator.
//
// Inserted into the request by the auth middleware and passed explicitly to
// every service operation that records who did what.

use std::future::{ready, Ready};

use actix_web::{dev::Payload, FromRequest, HttpMessage, HttpRequest};
use serde::{Deserialize, Serialize};

use crate::core::AppError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    /// Drafts and submits budgets
    Estimator,
    /// Also approves and rejects budgets under review
    Manager,
}

impl Role {
    pub fn can_review(self) -> bool {
        self == Role::Manager
    }
}

impl std::str::FromStr for Role {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "estimator" => Ok(Role::Estimator),
            "manager" => Ok(Role::Manager),
            _ => Err(format!("Invalid role: {}", s)),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Operator {
    pub id: String,
    pub display_name: String,
    pub role: Role,
}

impl FromRequest for Operator {
    type Error = AppError;
    type Future = Ready<Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _payload: &mut Payload) -> Self::Future {
        ready(
            req.extensions()
                .get::<Operator>()
                .cloned()
                .ok_or_else(|| AppError::unauthorized("No authenticated operator")),
        )
    }
}
