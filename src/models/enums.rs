use crate::db::DatabaseError;
use serde::{Deserialize, Serialize};

/// Macro to generate enum with as_str + std::str::FromStr pattern
macro_rules! str_enum {
    ($name:ident { $($variant:ident => $s:literal),+ $(,)? }) => {
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
        pub enum $name {
            $($variant),+
        }

        impl $name {
            pub fn as_str(&self) -> &'static str {
                match self {
                    $(Self::$variant => $s),+
                }
            }
        }

        impl std::str::FromStr for $name {
            type Err = DatabaseError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s {
                    $($s => Ok(Self::$variant)),+,
                    _ => Err(DatabaseError::InvalidEnum {
                        field: stringify!($name).into(),
                        value: s.into(),
                    }),
                }
            }
        }
    };
}

str_enum!(Role {
    Patient => "patient",
    Doctor => "doctor",
    Pharmacy => "pharmacy",
    Lab => "lab",
    Agent => "agent",
    Admin => "admin",
});

str_enum!(FacilityKind {
    Doctor => "doctor",
    Pharmacy => "pharmacy",
    Lab => "lab",
});

str_enum!(ApprovalStatus {
    Pending => "pending",
    Approved => "approved",
    Rejected => "rejected",
});

str_enum!(AppointmentStatus {
    Booked => "booked",
    Completed => "completed",
    Cancelled => "cancelled",
});

str_enum!(TransactionKind {
    Earn => "earn",
    Redeem => "redeem",
    ReferralCommission => "referral_commission",
    Refund => "refund",
});

str_enum!(WithdrawalStatus {
    Pending => "pending",
    Approved => "approved",
    Rejected => "rejected",
});

str_enum!(ReminderKind {
    Medication => "medication",
    Appointment => "appointment",
});

impl Role {
    /// Roles that must be approved by an admin before they are visible to
    /// patients. Patients and admins are active immediately.
    pub fn requires_approval(&self) -> bool {
        matches!(self, Role::Doctor | Role::Pharmacy | Role::Lab | Role::Agent)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn role_round_trip() {
        for s in ["patient", "doctor", "pharmacy", "lab", "agent", "admin"] {
            let role = Role::from_str(s).unwrap();
            assert_eq!(role.as_str(), s);
        }
    }

    #[test]
    fn invalid_role_rejected() {
        let err = Role::from_str("superuser").unwrap_err();
        assert!(matches!(err, DatabaseError::InvalidEnum { .. }));
    }

    #[test]
    fn provider_roles_require_approval() {
        assert!(Role::Doctor.requires_approval());
        assert!(Role::Agent.requires_approval());
        assert!(!Role::Patient.requires_approval());
        assert!(!Role::Admin.requires_approval());
    }

    #[test]
    fn transaction_kind_round_trip() {
        for s in ["earn", "redeem", "referral_commission", "refund"] {
            let kind = TransactionKind::from_str(s).unwrap();
            assert_eq!(kind.as_str(), s);
        }
    }
}
