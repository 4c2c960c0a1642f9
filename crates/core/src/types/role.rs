//! Portal roles and the flag reduction that produces them.
//!
//! The policy backend stores role grants as a pair of booleans on the user
//! record. The portal reduces that pair to a single [`Role`] so the rest of
//! the code never has to reason about flag combinations.

use serde::{Deserialize, Serialize};

/// A portal role. Every signed-in user has exactly one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    /// Full access: user, policy, agent, and transaction management.
    Admin,
    /// Access to assigned customers, their applications, and blog authoring.
    Agent,
    /// Default role: browse, quote, apply, pay, claim.
    Customer,
}

impl Role {
    /// Whether this role grants access to areas requiring `required`.
    ///
    /// Roles do not nest: an admin is not implicitly an agent. Each area
    /// names exactly the role it requires.
    #[must_use]
    pub fn satisfies(self, required: Self) -> bool {
        self == required
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Admin => write!(f, "admin"),
            Self::Agent => write!(f, "agent"),
            Self::Customer => write!(f, "customer"),
        }
    }
}

impl std::str::FromStr for Role {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "admin" => Ok(Self::Admin),
            "agent" => Ok(Self::Agent),
            "customer" => Ok(Self::Customer),
            _ => Err(format!("invalid role: {s}")),
        }
    }
}

/// Raw role grants as the backend stores them.
///
/// Both flags may be set on legacy records; [`RoleFlags::reduce`] resolves
/// the ambiguity so it cannot leak past this type.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoleFlags {
    /// Grant of the admin role.
    #[serde(default, rename = "isAdmin")]
    pub is_admin: bool,
    /// Grant of the agent role.
    #[serde(default, rename = "isAgent")]
    pub is_agent: bool,
}

impl RoleFlags {
    /// Reduce the flag pair to a single role. Admin wins over agent; no
    /// flags means customer.
    #[must_use]
    pub fn reduce(self) -> Role {
        if self.is_admin {
            Role::Admin
        } else if self.is_agent {
            Role::Agent
        } else {
            Role::Customer
        }
    }
}

impl From<RoleFlags> for Role {
    fn from(flags: RoleFlags) -> Self {
        flags.reduce()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_reduce_no_flags_is_customer() {
        let flags = RoleFlags::default();
        assert_eq!(flags.reduce(), Role::Customer);
    }

    #[test]
    fn test_reduce_agent_flag() {
        let flags = RoleFlags {
            is_admin: false,
            is_agent: true,
        };
        assert_eq!(flags.reduce(), Role::Agent);
    }

    #[test]
    fn test_reduce_admin_flag() {
        let flags = RoleFlags {
            is_admin: true,
            is_agent: false,
        };
        assert_eq!(flags.reduce(), Role::Admin);
    }

    #[test]
    fn test_reduce_both_flags_prefers_admin() {
        let flags = RoleFlags {
            is_admin: true,
            is_agent: true,
        };
        assert_eq!(flags.reduce(), Role::Admin);
    }

    #[test]
    fn test_roles_do_not_nest() {
        assert!(Role::Admin.satisfies(Role::Admin));
        assert!(!Role::Admin.satisfies(Role::Agent));
        assert!(!Role::Agent.satisfies(Role::Admin));
        assert!(!Role::Admin.satisfies(Role::Customer));
    }

    #[test]
    fn test_wire_field_names() {
        let flags: RoleFlags = serde_json::from_str(r#"{"isAdmin":false,"isAgent":true}"#).unwrap();
        assert_eq!(flags.reduce(), Role::Agent);

        // Missing flags default to false rather than failing the lookup.
        let flags: RoleFlags = serde_json::from_str("{}").unwrap();
        assert_eq!(flags.reduce(), Role::Customer);
    }

    #[test]
    fn test_display_from_str_roundtrip() {
        for role in [Role::Admin, Role::Agent, Role::Customer] {
            let parsed: Role = role.to_string().parse().unwrap();
            assert_eq!(parsed, role);
        }
        assert!("superuser".parse::<Role>().is_err());
    }
}
