// db/store.rs
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::Error;
use uuid::Uuid;

use crate::models::{
    chatmodels::{Conversation, Message},
    offermodels::{JobOffer, OfferStatus},
    paymentmodels::{CallbackUpdate, Transaction},
    walletmodels::{AccountKind, WalletSummary, WalletTransaction},
};

/// Reads that need no lock, plus the entry point for a unit of work.
#[async_trait]
pub trait MarketStore: Send + Sync {
    async fn get_conversation(&self, id: Uuid) -> Result<Option<Conversation>, Error>;

    async fn get_offer(&self, id: Uuid) -> Result<Option<JobOffer>, Error>;

    async fn list_offers_by_conversation(&self, conversation_id: Uuid) -> Result<Vec<JobOffer>, Error>;

    /// Newest first. `status` narrows the page when given.
    async fn list_offers_by_freelancer(
        &self,
        freelancer_id: Uuid,
        status: Option<OfferStatus>,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<JobOffer>, Error>;

    async fn count_offers_by_freelancer(
        &self,
        freelancer_id: Uuid,
        status: Option<OfferStatus>,
    ) -> Result<i64, Error>;

    /// Offers of the freelancer that are neither completed nor cancelled.
    async fn count_active_offers(&self, freelancer_id: Uuid) -> Result<i64, Error>;

    async fn order_code_exists(&self, order_code: &str) -> Result<bool, Error>;

    /// Ids of delivered offers last touched at or before `before`.
    async fn list_stale_delivered(&self, before: DateTime<Utc>) -> Result<Vec<Uuid>, Error>;

    async fn list_messages(&self, conversation_id: Uuid) -> Result<Vec<Message>, Error>;

    async fn get_transaction_by_reference(&self, reference: &str) -> Result<Option<Transaction>, Error>;

    async fn get_balance(&self, account: AccountKind, user_id: Uuid) -> Result<Option<i64>, Error>;

    async fn list_wallet_transactions(
        &self,
        user_id: Uuid,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<WalletTransaction>, Error>;

    async fn wallet_summary(&self, user_id: Uuid) -> Result<WalletSummary, Error>;

    async fn begin(&self) -> Result<Box<dyn StoreTx>, Error>;
}

/// One atomic unit of work. Locks taken through it are held until `commit`
/// or until the value is dropped, which rolls every staged write back.
#[async_trait]
pub trait StoreTx: Send {
    /// Exclusive lock on a single offer row.
    async fn lock_offer(&mut self, id: Uuid) -> Result<Option<JobOffer>, Error>;

    async fn lock_offer_by_code(&mut self, order_code: &str) -> Result<Option<JobOffer>, Error>;

    /// Returns `false` when the order code is already taken.
    async fn insert_offer(&mut self, offer: &JobOffer) -> Result<bool, Error>;

    async fn save_offer(&mut self, offer: &JobOffer) -> Result<(), Error>;

    /// Appends a message and bumps the conversation's `last_message_at`.
    async fn insert_message(&mut self, message: &Message) -> Result<(), Error>;

    async fn lock_balance(&mut self, account: AccountKind, user_id: Uuid) -> Result<Option<i64>, Error>;

    /// `balance = balance + amount`; returns rows affected.
    async fn increment_balance(&mut self, account: AccountKind, user_id: Uuid, amount: i64) -> Result<u64, Error>;

    /// `balance = balance - amount` guarded by `balance >= amount`; returns rows affected.
    async fn decrement_balance(&mut self, account: AccountKind, user_id: Uuid, amount: i64) -> Result<u64, Error>;

    async fn insert_wallet_transaction(&mut self, entry: &WalletTransaction) -> Result<(), Error>;

    async fn insert_transaction(&mut self, trx: &Transaction) -> Result<(), Error>;

    /// Overwrites the callback-owned fields; `None` when the reference is unknown.
    async fn update_transaction_from_callback(
        &mut self,
        update: &CallbackUpdate,
    ) -> Result<Option<Transaction>, Error>;

    async fn commit(&mut self) -> Result<(), Error>;
}
