/*!
 * # Role-Based Access Control (RBAC) Module
 *
 * Roles form a strict hierarchy: USER < MANAGER < ADMIN. A requirement is
 * satisfied by the required role or any role above it.
 */

use serde::{Deserialize, Serialize};
use strum::{Display, EnumIter, EnumString, IntoEnumIterator};
use utoipa::ToSchema;

#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Display,
    EnumString,
    EnumIter,
    Serialize,
    Deserialize,
    ToSchema,
)]
#[strum(serialize_all = "UPPERCASE")]
#[serde(rename_all = "UPPERCASE")]
pub enum Role {
    User,
    Manager,
    Admin,
}

impl Role {
    /// Position in the hierarchy, starting at 1 for USER
    pub fn rank(self) -> u8 {
        match self {
            Role::User => 1,
            Role::Manager => 2,
            Role::Admin => 3,
        }
    }

    /// Rank of a stored role string; unknown strings rank 0
    pub fn rank_of(role: &str) -> u8 {
        role.parse::<Role>().map(Role::rank).unwrap_or(0)
    }

    /// Comma separated list of all role names
    pub fn names() -> String {
        Role::iter()
            .map(|r| r.to_string())
            .collect::<Vec<_>>()
            .join(", ")
    }
}

/// `true` when `actual` ranks at or above `required`
pub fn has_role(actual: &str, required: Role) -> bool {
    Role::rank_of(actual) >= required.rank()
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("USER", Role::User, true)]
    #[case("USER", Role::Manager, false)]
    #[case("USER", Role::Admin, false)]
    #[case("MANAGER", Role::User, true)]
    #[case("MANAGER", Role::Manager, true)]
    #[case("MANAGER", Role::Admin, false)]
    #[case("ADMIN", Role::User, true)]
    #[case("ADMIN", Role::Manager, true)]
    #[case("ADMIN", Role::Admin, true)]
    #[case("admin", Role::User, false)]
    #[case("SUPERUSER", Role::User, false)]
    #[case("", Role::User, false)]
    fn role_hierarchy(#[case] actual: &str, #[case] required: Role, #[case] expected: bool) {
        assert_eq!(has_role(actual, required), expected);
    }

    #[test]
    fn ranks_are_monotonic() {
        let ranks: Vec<u8> = Role::iter().map(Role::rank).collect();
        assert_eq!(ranks, vec![1, 2, 3]);
    }

    #[test]
    fn role_names_round_trip_through_strings() {
        assert_eq!(Role::Manager.to_string(), "MANAGER");
        assert_eq!("ADMIN".parse::<Role>(), Ok(Role::Admin));
        assert_eq!(Role::names(), "USER, MANAGER, ADMIN");
        assert_eq!(
            serde_json::to_value(Role::Admin).unwrap(),
            serde_json::json!("ADMIN")
        );
    }
}
