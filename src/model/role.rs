use serde::{Deserialize, Serialize};
use strum_macros::{AsRefStr, EnumString};

/// Role ids as carried in the JWT `role` claim; the string form is what the
/// `users.role` column stores.
#[derive(
    Debug, Copy, Clone, Eq, PartialEq, Hash, Serialize, Deserialize, EnumString, AsRefStr,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum Role {
    Owner = 1,
    Admin = 2,
    Employee = 3,
}

impl Role {
    pub fn from_id(id: u8) -> Option<Self> {
        match id {
            1 => Some(Role::Owner),
            2 => Some(Role::Admin),
            3 => Some(Role::Employee),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn role_ids_round_trip() {
        for role in [Role::Owner, Role::Admin, Role::Employee] {
            assert_eq!(Role::from_id(role as u8), Some(role));
        }
        assert_eq!(Role::from_id(0), None);
        assert_eq!(Role::from_id(4), None);
    }

    #[test]
    fn role_column_values_parse() {
        assert_eq!(Role::from_str("employee").ok(), Some(Role::Employee));
        assert_eq!(Role::Owner.as_ref(), "owner");
        assert!(Role::from_str("hr").is_err());
    }
}
