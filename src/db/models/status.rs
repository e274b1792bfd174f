use serde::{Deserialize, Serialize};

/// Role attached to every account; checked by the auth gate on each request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "snake_case")]
#[sqlx(rename_all = "snake_case")]
pub enum Role {
    Admin,
    Staff,
    User,
}

impl Role {
    /// Convert from string (case-insensitive)
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "admin" => Some(Role::Admin),
            "staff" => Some(Role::Staff),
            "user" => Some(Role::User),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Role::Admin => "admin",
            Role::Staff => "staff",
            Role::User => "user",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "snake_case")]
#[sqlx(rename_all = "snake_case")]
pub enum ReservationStatus {
    Pending,
    Confirmed,
    Cancelled,
    Completed,
    Expired,
    NoShow,
}

impl ReservationStatus {
    pub const ALL: [ReservationStatus; 6] = [
        ReservationStatus::Pending,
        ReservationStatus::Confirmed,
        ReservationStatus::Cancelled,
        ReservationStatus::Completed,
        ReservationStatus::Expired,
        ReservationStatus::NoShow,
    ];

    /// Convert from string (case-insensitive). Accepts `no-show` as an alias.
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "pending" => Some(ReservationStatus::Pending),
            "confirmed" => Some(ReservationStatus::Confirmed),
            "cancelled" => Some(ReservationStatus::Cancelled),
            "completed" => Some(ReservationStatus::Completed),
            "expired" => Some(ReservationStatus::Expired),
            "no_show" | "no-show" => Some(ReservationStatus::NoShow),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            ReservationStatus::Pending => "pending",
            ReservationStatus::Confirmed => "confirmed",
            ReservationStatus::Cancelled => "cancelled",
            ReservationStatus::Completed => "completed",
            ReservationStatus::Expired => "expired",
            ReservationStatus::NoShow => "no_show",
        }
    }

    /// States reachable from `self` in one step.
    pub fn allowed_targets(self) -> &'static [ReservationStatus] {
        match self {
            ReservationStatus::Pending => &[
                ReservationStatus::Confirmed,
                ReservationStatus::Cancelled,
                ReservationStatus::Expired,
            ],
            ReservationStatus::Confirmed => {
                &[ReservationStatus::Completed, ReservationStatus::NoShow]
            }
            ReservationStatus::Cancelled
            | ReservationStatus::Completed
            | ReservationStatus::Expired
            | ReservationStatus::NoShow => &[],
        }
    }

    pub fn can_transition_to(self, next: ReservationStatus) -> bool {
        self.allowed_targets().contains(&next)
    }

    pub fn is_terminal(self) -> bool {
        self.allowed_targets().is_empty()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "snake_case")]
#[sqlx(rename_all = "snake_case")]
pub enum PaymentStatus {
    Pending,
    Paid,
    Rejected,
}

impl PaymentStatus {
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "pending" => Some(PaymentStatus::Pending),
            "paid" => Some(PaymentStatus::Paid),
            "rejected" => Some(PaymentStatus::Rejected),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            PaymentStatus::Pending => "pending",
            PaymentStatus::Paid => "paid",
            PaymentStatus::Rejected => "rejected",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "snake_case")]
#[sqlx(rename_all = "snake_case")]
pub enum BookingType {
    Hourly,
    Daily,
}

impl BookingType {
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "hourly" => Some(BookingType::Hourly),
            "daily" => Some(BookingType::Daily),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            BookingType::Hourly => "hourly",
            BookingType::Daily => "daily",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "snake_case")]
#[sqlx(rename_all = "snake_case")]
pub enum UsageStatus {
    Active,
    Completed,
    Verified,
}

impl UsageStatus {
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "active" => Some(UsageStatus::Active),
            "completed" => Some(UsageStatus::Completed),
            "verified" => Some(UsageStatus::Verified),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            UsageStatus::Active => "active",
            UsageStatus::Completed => "completed",
            UsageStatus::Verified => "verified",
        }
    }
}

impl From<ReservationStatus> for String {
    fn from(status: ReservationStatus) -> Self {
        status.as_str().to_string()
    }
}

impl TryFrom<&str> for ReservationStatus {
    type Error = String;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        Self::parse(value).ok_or_else(|| format!("Invalid reservation status: {}", value))
    }
}
