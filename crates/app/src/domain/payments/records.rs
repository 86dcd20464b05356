//! Payment Records

use std::fmt::{Display, Formatter, Result as FmtResult};

use bazaar::{
    ids::{TypedUuid, UserUuid},
    orders::OrderUuid,
};
use jiff::Timestamp;

/// Where a gateway payment stands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PaymentRecordStatus {
    Pending,
    Approved,
    Failed,
}

impl PaymentRecordStatus {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Approved => "approved",
            Self::Failed => "failed",
        }
    }
}

impl Display for PaymentRecordStatus {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        f.write_str(self.as_str())
    }
}

impl TryFrom<&str> for PaymentRecordStatus {
    type Error = String;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        match value {
            "pending" => Ok(Self::Pending),
            "approved" => Ok(Self::Approved),
            "failed" => Ok(Self::Failed),
            other => Err(format!("unknown payment status {other:?}")),
        }
    }
}

/// Payment UUID
pub type PaymentUuid = TypedUuid<PaymentRecord>;

/// Payment Record
#[derive(Debug, Clone, PartialEq)]
pub struct PaymentRecord {
    pub uuid: PaymentUuid,
    pub order: OrderUuid,
    pub user: UserUuid,
    pub provider: String,

    /// The gateway's id for the purchase, absent when it was never created.
    pub provider_order_id: Option<String>,
    pub amount: u64,
    pub currency: String,
    pub status: PaymentRecordStatus,
    pub failure_reason: Option<String>,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stored_statuses_parse_back() {
        for status in [
            PaymentRecordStatus::Pending,
            PaymentRecordStatus::Approved,
            PaymentRecordStatus::Failed,
        ] {
            assert_eq!(PaymentRecordStatus::try_from(status.as_str()), Ok(status));
        }

        assert!(PaymentRecordStatus::try_from("captured").is_err());
    }
}
