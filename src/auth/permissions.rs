use anyhow::Error;
use once_cell::sync::Lazy;
use rocket::serde::Serialize;
use std::collections::HashSet;
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum Permission {
    ViewOwnWorkouts,
    ManageOwnRecords,

    AssignWorkouts,
    ViewRoster,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Role {
    Student,
    Trainer,
}

static STUDENT_PERMISSIONS: Lazy<HashSet<Permission>> = Lazy::new(|| {
    let mut permissions = HashSet::new();

    permissions.insert(Permission::ViewOwnWorkouts);
    permissions.insert(Permission::ManageOwnRecords);

    permissions
});

static TRAINER_PERMISSIONS: Lazy<HashSet<Permission>> = Lazy::new(|| {
    let mut permissions = HashSet::new();

    permissions.extend(STUDENT_PERMISSIONS.iter().copied());

    permissions.insert(Permission::AssignWorkouts);
    permissions.insert(Permission::ViewRoster);

    permissions
});

impl Role {
    pub fn from_trainer_flag(is_trainer: bool) -> Self {
        if is_trainer { Role::Trainer } else { Role::Student }
    }

    pub fn permissions(&self) -> &'static HashSet<Permission> {
        match self {
            Role::Student => &STUDENT_PERMISSIONS,
            Role::Trainer => &TRAINER_PERMISSIONS,
        }
    }

    pub fn has_permission(&self, permission: Permission) -> bool {
        self.permissions().contains(&permission)
    }

    /// The value stored in the identity provider's `custom:user_type` attribute.
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Student => "Student",
            Role::Trainer => "Trainer",
        }
    }

    pub fn from_str(s: &str) -> Result<Self, Error> {
        match s {
            "Student" => Ok(Role::Student),
            "Trainer" => Ok(Role::Trainer),
            _ => Err(Error::msg(format!("Unknown role: {}", s))),
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn trainer_inherits_student_permissions() {
        for permission in Role::Student.permissions() {
            assert!(Role::Trainer.has_permission(*permission));
        }
        assert!(Role::Trainer.has_permission(Permission::AssignWorkouts));
        assert!(!Role::Student.has_permission(Permission::AssignWorkouts));
        assert!(!Role::Student.has_permission(Permission::ViewRoster));
    }

    #[test]
    fn role_names_round_trip() {
        for role in [Role::Student, Role::Trainer] {
            assert_eq!(Role::from_str(role.as_str()).unwrap(), role);
        }
        assert!(Role::from_str("trainer").is_err());
        assert!(Role::from_str("Admin").is_err());
    }
}
