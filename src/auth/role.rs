use serde::{Deserialize, Serialize};

use crate::database::models::RoleFlags;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Admin,
    Manager,
    Supervisor,
    Trainer,
}

impl Role {
    /// Highest flag wins: admin > manager > supervisor > trainer
    pub fn from_flags(flags: &RoleFlags) -> Self {
        if flags.admin {
            Role::Admin
        } else if flags.manager {
            Role::Manager
        } else if flags.supervisor {
            Role::Supervisor
        } else {
            Role::Trainer
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Admin => "admin",
            Role::Manager => "manager",
            Role::Supervisor => "supervisor",
            Role::Trainer => "trainer",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn precedence() {
        let all = RoleFlags { admin: true, manager: true, supervisor: true, trainer: true };
        assert_eq!(Role::from_flags(&all), Role::Admin);

        let manager = RoleFlags { manager: true, supervisor: true, ..Default::default() };
        assert_eq!(Role::from_flags(&manager), Role::Manager);

        let supervisor = RoleFlags { supervisor: true, trainer: true, ..Default::default() };
        assert_eq!(Role::from_flags(&supervisor), Role::Supervisor);
    }

    #[test]
    fn no_flags_means_trainer() {
        assert_eq!(Role::from_flags(&RoleFlags::default()), Role::Trainer);
        assert_eq!(Role::Trainer.as_str(), "trainer");
    }
}
