//! Process roles and the runtime unit names derived from them.

use std::fmt;

use serde::{Deserialize, Serialize};

use super::InstanceId;

/// Separator between an instance id and a role suffix in a unit name.
///
/// Canonical ids never contain a double underscore, so the split is
/// unambiguous.
const ROLE_SEPARATOR: &str = "__";

/// One process within an instance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// The only process of a single-process instance.
    Primary,
    /// Backend compute engine of a composite instance.
    Server,
    /// Protocol-translation layer fronting the server.
    Adapter,
}

impl Role {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Primary => "primary",
            Self::Server => "server",
            Self::Adapter => "adapter",
        }
    }

    /// Runtime unit name for this role of `id`.
    #[must_use]
    pub fn unit_name(self, id: &InstanceId) -> String {
        match self {
            Self::Primary => id.as_str().to_string(),
            Self::Server | Self::Adapter => {
                format!("{}{ROLE_SEPARATOR}{}", id.as_str(), self.as_str())
            }
        }
    }

    /// Split a runtime unit name into its instance id and role.
    ///
    /// Names without a recognised role suffix belong to a primary role.
    #[must_use]
    pub fn parse_unit(name: &str) -> (InstanceId, Self) {
        if let Some((id, suffix)) = name.rsplit_once(ROLE_SEPARATOR) {
            match suffix {
                "server" => return (InstanceId::new(id), Self::Server),
                "adapter" => return (InstanceId::new(id), Self::Adapter),
                _ => {}
            }
        }
        (InstanceId::new(name), Self::Primary)
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Shape of an instance: one process, or a server fronted by an adapter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InstanceKind {
    Single,
    Composite,
}

impl InstanceKind {
    /// Roles in launch order. Stops use the same order.
    #[must_use]
    pub const fn roles(self) -> &'static [Role] {
        match self {
            Self::Single => &[Role::Primary],
            Self::Composite => &[Role::Server, Role::Adapter],
        }
    }

    /// Role whose port is published to the registry.
    #[must_use]
    pub const fn public_role(self) -> Role {
        match self {
            Self::Single => Role::Primary,
            Self::Composite => Role::Adapter,
        }
    }
}
