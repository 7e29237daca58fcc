// service/wallet_service.rs
use std::sync::Arc;

use serde::Serialize;
use uuid::Uuid;

use super::error::ServiceError;
use crate::{
    db::{MarketStore, StoreTx},
    models::walletmodels::{AccountKind, WalletSummary, WalletTransaction, WalletTrxType},
};

/// Ledger-versus-balance comparison for one user.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct LedgerReconciliation {
    pub user_id: Uuid,
    pub ledger_total: i64,
    pub balance_total: i64,
    pub consistent: bool,
}

/// The only writer of balances. Every mutation runs inside the caller's
/// unit of work so the balance change and its ledger entry commit together.
#[derive(Clone)]
pub struct WalletService {
    store: Arc<dyn MarketStore>,
}

impl WalletService {
    pub fn new(store: Arc<dyn MarketStore>) -> Self {
        Self { store }
    }

    pub async fn credit_freelancer(
        &self,
        tx: &mut dyn StoreTx,
        user_id: Uuid,
        amount: i64,
        reference_id: Option<Uuid>,
        description: &str,
    ) -> Result<WalletTransaction, ServiceError> {
        self.credit(tx, WalletTrxType::Credit, user_id, amount, reference_id, description)
            .await
    }

    /// Refund path: returns money to the client's platform balance.
    pub async fn credit_client(
        &self,
        tx: &mut dyn StoreTx,
        user_id: Uuid,
        amount: i64,
        reference_id: Option<Uuid>,
        description: &str,
    ) -> Result<WalletTransaction, ServiceError> {
        self.credit(tx, WalletTrxType::Refund, user_id, amount, reference_id, description)
            .await
    }

    pub async fn debit_client(
        &self,
        tx: &mut dyn StoreTx,
        user_id: Uuid,
        amount: i64,
        reference_id: Option<Uuid>,
        description: &str,
    ) -> Result<WalletTransaction, ServiceError> {
        ensure_positive(amount)?;
        let account = WalletTrxType::Debit.account();

        let available = tx
            .lock_balance(account, user_id)
            .await?
            .ok_or_else(|| account_not_found(account, user_id))?;
        if available < amount {
            return Err(ServiceError::InsufficientFunds {
                required: amount,
                available,
            });
        }

        if tx.decrement_balance(account, user_id, amount).await? == 0 {
            return Err(ServiceError::InsufficientFunds {
                required: amount,
                available,
            });
        }

        let entry = WalletTransaction::new(
            user_id,
            amount,
            WalletTrxType::Debit,
            description.to_string(),
            reference_id,
        );
        tx.insert_wallet_transaction(&entry).await?;

        tracing::info!(
            "Debited {} from {} balance of user {} ({})",
            amount,
            account.to_str(),
            user_id,
            description
        );
        Ok(entry)
    }

    async fn credit(
        &self,
        tx: &mut dyn StoreTx,
        trx_type: WalletTrxType,
        user_id: Uuid,
        amount: i64,
        reference_id: Option<Uuid>,
        description: &str,
    ) -> Result<WalletTransaction, ServiceError> {
        ensure_positive(amount)?;
        let account = trx_type.account();

        if tx.increment_balance(account, user_id, amount).await? == 0 {
            return Err(account_not_found(account, user_id));
        }

        let entry = WalletTransaction::new(user_id, amount, trx_type, description.to_string(), reference_id);
        tx.insert_wallet_transaction(&entry).await?;

        tracing::info!(
            "Recorded {} of {} to {} balance of user {} ({})",
            trx_type.to_str(),
            amount,
            account.to_str(),
            user_id,
            description
        );
        Ok(entry)
    }

    pub async fn get_balance(&self, user_id: Uuid, account: AccountKind) -> Result<i64, ServiceError> {
        self.store
            .get_balance(account, user_id)
            .await?
            .ok_or_else(|| account_not_found(account, user_id))
    }

    pub async fn list_transactions(
        &self,
        user_id: Uuid,
        page: u32,
        limit: u32,
    ) -> Result<Vec<WalletTransaction>, ServiceError> {
        let limit = i64::from(limit.clamp(1, 100));
        let offset = (i64::from(page.max(1)) - 1) * limit;
        Ok(self.store.list_wallet_transactions(user_id, limit, offset).await?)
    }

    pub async fn summary(&self, user_id: Uuid) -> Result<WalletSummary, ServiceError> {
        Ok(self.store.wallet_summary(user_id).await?)
    }

    pub async fn reconcile(&self, user_id: Uuid) -> Result<LedgerReconciliation, ServiceError> {
        let summary = self.store.wallet_summary(user_id).await?;
        let ledger_total = summary.ledger_total();
        let balance_total = summary.balance_total();

        if ledger_total != balance_total {
            tracing::error!(
                "Ledger mismatch for user {}: ledger {} vs balances {}",
                user_id,
                ledger_total,
                balance_total
            );
        }

        Ok(LedgerReconciliation {
            user_id,
            ledger_total,
            balance_total,
            consistent: ledger_total == balance_total,
        })
    }
}

fn ensure_positive(amount: i64) -> Result<(), ServiceError> {
    if amount <= 0 {
        return Err(ServiceError::validation("Amount must be greater than zero"));
    }
    Ok(())
}

fn account_not_found(account: AccountKind, user_id: Uuid) -> ServiceError {
    ServiceError::not_found(format!("{} account for user {} not found", account.to_str(), user_id))
}
