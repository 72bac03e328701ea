use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Serialize, Deserialize)]
pub struct JwtClaims {
    pub sub: String,
    pub exp: Option<u64>,
    pub email: Option<String>,
    pub role: Option<String>,
    pub app_metadata: Option<serde_json::Value>,
    pub user_metadata: Option<serde_json::Value>,
    pub aud: Option<String>,
    pub iat: Option<u64>,
}

/// Roles recognised by the engine. Anything the identity layer sends that
/// is not listed here is treated as a patient.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    Admin,
    Doctor,
    Staff,
    Patient,
}

impl Role {
    pub fn from_claim(role: Option<&str>) -> Self {
        match role.map(|r| r.trim().to_ascii_lowercase()).as_deref() {
            Some("admin") => Role::Admin,
            Some("doctor") => Role::Doctor,
            Some("staff") => Role::Staff,
            _ => Role::Patient,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    pub id: String,
    pub email: Option<String>,
    pub role: Option<String>,
    pub metadata: Option<serde_json::Value>,
    pub created_at: Option<DateTime<Utc>>,
}

impl User {
    pub fn role(&self) -> Role {
        Role::from_claim(self.role.as_deref())
    }

    pub fn is_admin(&self) -> bool {
        self.role() == Role::Admin
    }

    /// True when the user is the given doctor, or an admin acting for them.
    pub fn can_manage_doctor(&self, doctor_id: Uuid) -> bool {
        self.is_admin() || (self.role() == Role::Doctor && self.is(doctor_id))
    }

    /// Clinical staff: anyone allowed to touch inventory and the catalogue.
    pub fn is_clinical_staff(&self) -> bool {
        matches!(self.role(), Role::Admin | Role::Doctor | Role::Staff)
    }

    pub fn is(&self, id: Uuid) -> bool {
        self.id == id.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn user(id: Uuid, role: &str) -> User {
        User {
            id: id.to_string(),
            email: None,
            role: Some(role.to_string()),
            metadata: None,
            created_at: None,
        }
    }

    #[test]
    fn unknown_roles_fall_back_to_patient() {
        assert_eq!(Role::from_claim(Some("authenticated")), Role::Patient);
        assert_eq!(Role::from_claim(None), Role::Patient);
        assert_eq!(Role::from_claim(Some("Doctor")), Role::Doctor);
    }

    #[test]
    fn doctors_manage_only_their_own_calendar() {
        let doctor_id = Uuid::new_v4();
        let doctor = user(doctor_id, "doctor");

        assert!(doctor.can_manage_doctor(doctor_id));
        assert!(!doctor.can_manage_doctor(Uuid::new_v4()));
        assert!(user(Uuid::new_v4(), "admin").can_manage_doctor(doctor_id));
        assert!(!user(doctor_id, "patient").can_manage_doctor(doctor_id));
    }
}
