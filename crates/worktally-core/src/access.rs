//! What a signed-in user may do, derived once from their role.

use serde::Serialize;

use crate::model::{Role, User};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Capabilities {
    pub can_run_surveys: bool,
    pub can_manage_templates: bool,
    pub can_view_summary: bool,
    pub can_manage_data: bool,
    pub can_manage_users: bool,
    /// Create users in another company.
    pub can_assign_company: bool,
}

impl Capabilities {
    pub fn for_role(role: Role) -> Self {
        let admin = matches!(role, Role::Master | Role::Super);
        Self {
            can_run_surveys: true,
            can_manage_templates: admin,
            can_view_summary: admin,
            can_manage_data: admin,
            can_manage_users: admin,
            can_assign_company: role == Role::Super,
        }
    }
}

impl User {
    pub fn capabilities(&self) -> Capabilities {
        Capabilities::for_role(self.role)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plain_users_can_only_count() {
        let caps = Capabilities::for_role(Role::User);
        assert!(caps.can_run_surveys);
        assert!(!caps.can_manage_templates);
        assert!(!caps.can_view_summary);
        assert!(!caps.can_manage_data);
        assert!(!caps.can_manage_users);
    }

    #[test]
    fn masters_administer_their_company() {
        let caps = Capabilities::for_role(Role::Master);
        assert!(caps.can_manage_templates && caps.can_view_summary && caps.can_manage_users);
        assert!(!caps.can_assign_company);
    }

    #[test]
    fn super_users_can_assign_companies() {
        let user = User {
            id: None,
            name: "Root".into(),
            user_id: "root".into(),
            role: Role::Super,
            company_code: String::new(),
        };
        assert!(user.capabilities().can_assign_company);
    }
}
