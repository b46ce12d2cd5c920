use actix_web::{FromRequest, HttpMessage, HttpRequest, dev::Payload};
use futures::future::{Ready, ready};

use crate::auth::policy::Capability;
use crate::error::AppError;
use crate::model::role::Role;

/// Identity attached to the request by `auth_middleware`.
#[derive(Debug, Clone)]
pub struct AuthUser {
    pub user_id: u64,
    pub username: String,
    pub role: Role,
    pub company_id: u64,
}

impl FromRequest for AuthUser {
    type Error = actix_web::Error;
    type Future = Ready<Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _: &mut Payload) -> Self::Future {
        match req.extensions().get::<AuthUser>() {
            Some(user) => ready(Ok(user.clone())),
            None => ready(Err(actix_web::error::ErrorUnauthorized("Missing token"))),
        }
    }
}

impl AuthUser {
    pub fn require(&self, capability: Capability) -> Result<(), AppError> {
        if capability.allows(self.role) {
            Ok(())
        } else {
            Err(AppError::Forbidden(capability.denial()))
        }
    }

    pub fn can(&self, capability: Capability) -> bool {
        capability.allows(self.role)
    }
}
