// models/walletmodels.rs
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Serialize, Deserialize, Clone, Copy, sqlx::Type, PartialEq, Eq)]
#[sqlx(type_name = "wallet_trx_type", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum WalletTrxType {
    Credit,
    Debit,
    Refund,
}

impl WalletTrxType {
    pub fn to_str(&self) -> &str {
        match self {
            WalletTrxType::Credit => "credit",
            WalletTrxType::Debit => "debit",
            WalletTrxType::Refund => "refund",
        }
    }

    /// Effect of an entry of this type on the owning balance.
    pub fn signed(&self, amount: i64) -> i64 {
        match self {
            WalletTrxType::Credit | WalletTrxType::Refund => amount,
            WalletTrxType::Debit => -amount,
        }
    }

    /// Earnings land on the freelancer profile; refunds and withdrawals move
    /// the client's platform balance.
    pub fn account(&self) -> AccountKind {
        match self {
            WalletTrxType::Credit => AccountKind::Freelancer,
            WalletTrxType::Debit | WalletTrxType::Refund => AccountKind::Client,
        }
    }
}

/// Which balance column an amount lives in: `freelancer_profiles.balance` or
/// `users.balance`.
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum AccountKind {
    Freelancer,
    Client,
}

impl AccountKind {
    pub fn to_str(&self) -> &str {
        match self {
            AccountKind::Freelancer => "freelancer",
            AccountKind::Client => "client",
        }
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, sqlx::FromRow)]
pub struct WalletTransaction {
    pub id: Uuid,
    pub user_id: Uuid,
    pub amount: i64,
    #[sqlx(rename = "type")]
    #[serde(rename = "type")]
    pub trx_type: WalletTrxType,
    pub description: String,
    pub reference_id: Option<Uuid>,
    pub created_at: DateTime<Utc>,
}

impl WalletTransaction {
    pub fn new(
        user_id: Uuid,
        amount: i64,
        trx_type: WalletTrxType,
        description: String,
        reference_id: Option<Uuid>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            user_id,
            amount,
            trx_type,
            description,
            reference_id,
            created_at: Utc::now(),
        }
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, Default, PartialEq, Eq)]
pub struct WalletSummary {
    pub freelancer_balance: i64,
    pub client_balance: i64,
    pub total_credits: i64,
    pub total_debits: i64,
    pub total_refunds: i64,
}

impl WalletSummary {
    pub fn ledger_total(&self) -> i64 {
        WalletTrxType::Credit.signed(self.total_credits)
            + WalletTrxType::Refund.signed(self.total_refunds)
            + WalletTrxType::Debit.signed(self.total_debits)
    }

    pub fn balance_total(&self) -> i64 {
        self.freelancer_balance + self.client_balance
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_signed_amounts() {
        assert_eq!(WalletTrxType::Credit.signed(500), 500);
        assert_eq!(WalletTrxType::Refund.signed(500), 500);
        assert_eq!(WalletTrxType::Debit.signed(500), -500);
    }

    #[test]
    fn test_ledger_total_nets_debits() {
        let summary = WalletSummary {
            freelancer_balance: 900,
            client_balance: 300,
            total_credits: 900,
            total_debits: 200,
            total_refunds: 500,
        };
        assert_eq!(summary.ledger_total(), 1200);
        assert_eq!(summary.ledger_total(), summary.balance_total());
    }

    #[test]
    fn test_entry_type_maps_to_account() {
        assert_eq!(WalletTrxType::Credit.account(), AccountKind::Freelancer);
        assert_eq!(WalletTrxType::Refund.account(), AccountKind::Client);
        assert_eq!(WalletTrxType::Debit.account(), AccountKind::Client);
    }
}
