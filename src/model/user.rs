use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::model::role::Role;

/// Directory view of a user, owned by the user service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserProfile {
    pub id: u64,
    pub name: String,
    pub email: String,
    pub role: Role,
    pub company_id: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, ToSchema)]
pub struct EmployeeOption {
    pub id: u64,
    pub name: String,
    pub email: String,
}

impl From<UserProfile> for EmployeeOption {
    fn from(profile: UserProfile) -> Self {
        Self {
            id: profile.id,
            name: profile.name,
            email: profile.email,
        }
    }
}

/// A row of `biometric_devices`. Only active devices may post clock events.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BiometricDevice {
    pub device_id: String,
    pub company_id: u64,
    pub is_active: bool,
}
