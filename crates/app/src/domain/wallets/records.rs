//! Wallet Records

use std::fmt::{Display, Formatter, Result as FmtResult};

use bazaar::{
    ids::{TypedUuid, UserUuid},
    orders::OrderUuid,
};
use jiff::Timestamp;

/// Wallet Record
#[derive(Debug, Clone, PartialEq)]
pub struct WalletRecord {
    pub user: UserUuid,
    pub balance: u64,
    pub transactions: Vec<WalletTransactionRecord>,
    pub created_at: Option<Timestamp>,
    pub updated_at: Option<Timestamp>,
}

impl WalletRecord {
    /// The wallet of a user who has never been credited.
    #[must_use]
    pub fn empty(user: UserUuid) -> Self {
        Self {
            user,
            balance: 0,
            transactions: Vec::new(),
            created_at: None,
            updated_at: None,
        }
    }
}

/// Why a wallet balance changed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WalletTransactionKind {
    Refund,
}

impl WalletTransactionKind {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Refund => "refund",
        }
    }
}

impl Display for WalletTransactionKind {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        f.write_str(self.as_str())
    }
}

impl TryFrom<&str> for WalletTransactionKind {
    type Error = String;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        match value {
            "refund" => Ok(Self::Refund),
            other => Err(format!("unknown wallet transaction kind {other:?}")),
        }
    }
}

/// Wallet Transaction UUID
pub type WalletTransactionUuid = TypedUuid<WalletTransactionRecord>;

/// Wallet Transaction Record
#[derive(Debug, Clone, PartialEq)]
pub struct WalletTransactionRecord {
    pub uuid: WalletTransactionUuid,
    pub user: UserUuid,
    pub kind: WalletTransactionKind,
    pub amount: u64,
    pub order: Option<OrderUuid>,
    pub created_at: Timestamp,
}
