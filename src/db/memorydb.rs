// db/memorydb.rs
use std::{
    collections::HashMap,
    hash::Hash,
    sync::{Arc, Mutex as StdMutex, PoisonError},
};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::Error;
use tokio::sync::{Mutex, OwnedMutexGuard, RwLock};
use uuid::Uuid;

use super::store::{MarketStore, StoreTx};
use crate::models::{
    chatmodels::{Conversation, Message},
    offermodels::{JobOffer, OfferStatus},
    paymentmodels::{CallbackUpdate, Transaction},
    walletmodels::{AccountKind, WalletSummary, WalletTransaction, WalletTrxType},
};

/// Keyed async mutexes standing in for row locks. An entry lives only while
/// someone holds or waits for it.
struct LockMap<K: Eq + Hash> {
    locks: Arc<StdMutex<HashMap<K, Arc<Mutex<()>>>>>,
}

impl<K: Eq + Hash + Clone> LockMap<K> {
    fn new() -> Self {
        Self {
            locks: Arc::new(StdMutex::new(HashMap::new())),
        }
    }

    async fn acquire(&self, key: K) -> RowGuard<K> {
        let lock = {
            let mut locks = self.locks.lock().unwrap_or_else(PoisonError::into_inner);
            locks.entry(key.clone()).or_default().clone()
        };
        let guard = lock.lock_owned().await;
        RowGuard {
            guard: Some(guard),
            key,
            locks: self.locks.clone(),
        }
    }

    #[cfg(test)]
    fn len(&self) -> usize {
        self.locks.lock().unwrap_or_else(PoisonError::into_inner).len()
    }
}

/// Held row lock; releasing the last holder removes the map entry.
struct RowGuard<K: Eq + Hash> {
    guard: Option<OwnedMutexGuard<()>>,
    key: K,
    locks: Arc<StdMutex<HashMap<K, Arc<Mutex<()>>>>>,
}

impl<K: Eq + Hash> Drop for RowGuard<K> {
    fn drop(&mut self) {
        drop(self.guard.take());
        let mut locks = self.locks.lock().unwrap_or_else(PoisonError::into_inner);
        // clones are only taken under this mutex, so a count of 1 means no waiters
        if locks
            .get(&self.key)
            .is_some_and(|lock| Arc::strong_count(lock) == 1)
        {
            locks.remove(&self.key);
        }
    }
}

#[derive(Default)]
struct MemoryState {
    offers: HashMap<Uuid, JobOffer>,
    conversations: HashMap<Uuid, Conversation>,
    messages: Vec<Message>,
    freelancer_balances: HashMap<Uuid, i64>,
    client_balances: HashMap<Uuid, i64>,
    wallet_transactions: Vec<WalletTransaction>,
    transactions: HashMap<String, Transaction>,
}

impl MemoryState {
    fn balances(&self, account: AccountKind) -> &HashMap<Uuid, i64> {
        match account {
            AccountKind::Freelancer => &self.freelancer_balances,
            AccountKind::Client => &self.client_balances,
        }
    }

    fn balances_mut(&mut self, account: AccountKind) -> &mut HashMap<Uuid, i64> {
        match account {
            AccountKind::Freelancer => &mut self.freelancer_balances,
            AccountKind::Client => &mut self.client_balances,
        }
    }
}

struct Locks {
    offers: LockMap<Uuid>,
    accounts: LockMap<(AccountKind, Uuid)>,
    order_codes: LockMap<String>,
}

/// Process-local store used by tests and by runs without `DATABASE_URL`.
/// Same contract as Postgres: locks are held until commit or drop, and
/// nothing a unit of work writes is visible to others before commit.
#[derive(Clone)]
pub struct MemoryStore {
    state: Arc<RwLock<MemoryState>>,
    locks: Arc<Locks>,
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryStore {
    pub fn new() -> Self {
        Self {
            state: Arc::new(RwLock::new(MemoryState::default())),
            locks: Arc::new(Locks {
                offers: LockMap::new(),
                accounts: LockMap::new(),
                order_codes: LockMap::new(),
            }),
        }
    }

    /// Creates the `users` row for a client account.
    pub async fn create_user_account(&self, user_id: Uuid, balance: i64) {
        self.state.write().await.client_balances.insert(user_id, balance);
    }

    /// Creates the freelancer profile row for an account.
    pub async fn create_freelancer_profile(&self, user_id: Uuid, balance: i64) {
        self.state
            .write()
            .await
            .freelancer_balances
            .insert(user_id, balance);
    }

    pub async fn insert_conversation(&self, conversation: Conversation) {
        self.state
            .write()
            .await
            .conversations
            .insert(conversation.id, conversation);
    }

    /// Rewrites an offer's `updated_at`, used to age deliveries.
    pub async fn set_offer_updated_at(&self, offer_id: Uuid, updated_at: DateTime<Utc>) -> bool {
        let _guard = self.locks.offers.acquire(offer_id).await;
        match self.state.write().await.offers.get_mut(&offer_id) {
            Some(offer) => {
                offer.updated_at = updated_at;
                true
            }
            None => false,
        }
    }
}

#[async_trait]
impl MarketStore for MemoryStore {
    async fn get_conversation(&self, id: Uuid) -> Result<Option<Conversation>, Error> {
        Ok(self.state.read().await.conversations.get(&id).cloned())
    }

    async fn get_offer(&self, id: Uuid) -> Result<Option<JobOffer>, Error> {
        Ok(self.state.read().await.offers.get(&id).cloned())
    }

    async fn list_offers_by_conversation(&self, conversation_id: Uuid) -> Result<Vec<JobOffer>, Error> {
        let state = self.state.read().await;
        let mut offers: Vec<JobOffer> = state
            .offers
            .values()
            .filter(|offer| offer.conversation_id == conversation_id)
            .cloned()
            .collect();
        offers.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(offers)
    }

    async fn list_offers_by_freelancer(
        &self,
        freelancer_id: Uuid,
        status: Option<OfferStatus>,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<JobOffer>, Error> {
        let state = self.state.read().await;
        let mut offers: Vec<JobOffer> = state
            .offers
            .values()
            .filter(|offer| offer.freelancer_id == freelancer_id)
            .filter(|offer| status.map_or(true, |status| offer.status == status))
            .cloned()
            .collect();
        offers.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(offers
            .into_iter()
            .skip(offset.max(0) as usize)
            .take(limit.max(0) as usize)
            .collect())
    }

    async fn count_offers_by_freelancer(
        &self,
        freelancer_id: Uuid,
        status: Option<OfferStatus>,
    ) -> Result<i64, Error> {
        let state = self.state.read().await;
        Ok(state
            .offers
            .values()
            .filter(|offer| offer.freelancer_id == freelancer_id)
            .filter(|offer| status.map_or(true, |status| offer.status == status))
            .count() as i64)
    }

    async fn count_active_offers(&self, freelancer_id: Uuid) -> Result<i64, Error> {
        let state = self.state.read().await;
        Ok(state
            .offers
            .values()
            .filter(|offer| offer.freelancer_id == freelancer_id && !offer.status.is_terminal())
            .count() as i64)
    }

    async fn order_code_exists(&self, order_code: &str) -> Result<bool, Error> {
        Ok(self
            .state
            .read()
            .await
            .offers
            .values()
            .any(|offer| offer.order_code == order_code))
    }

    async fn list_stale_delivered(&self, before: DateTime<Utc>) -> Result<Vec<Uuid>, Error> {
        let state = self.state.read().await;
        let mut stale: Vec<&JobOffer> = state
            .offers
            .values()
            .filter(|offer| offer.status == OfferStatus::Delivered && offer.updated_at <= before)
            .collect();
        stale.sort_by_key(|offer| offer.updated_at);
        Ok(stale.into_iter().map(|offer| offer.id).collect())
    }

    async fn list_messages(&self, conversation_id: Uuid) -> Result<Vec<Message>, Error> {
        Ok(self
            .state
            .read()
            .await
            .messages
            .iter()
            .filter(|message| message.conversation_id == conversation_id)
            .cloned()
            .collect())
    }

    async fn get_transaction_by_reference(&self, reference: &str) -> Result<Option<Transaction>, Error> {
        Ok(self.state.read().await.transactions.get(reference).cloned())
    }

    async fn get_balance(&self, account: AccountKind, user_id: Uuid) -> Result<Option<i64>, Error> {
        Ok(self.state.read().await.balances(account).get(&user_id).copied())
    }

    async fn list_wallet_transactions(
        &self,
        user_id: Uuid,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<WalletTransaction>, Error> {
        let state = self.state.read().await;
        Ok(state
            .wallet_transactions
            .iter()
            .rev()
            .filter(|entry| entry.user_id == user_id)
            .skip(offset.max(0) as usize)
            .take(limit.max(0) as usize)
            .cloned()
            .collect())
    }

    async fn wallet_summary(&self, user_id: Uuid) -> Result<WalletSummary, Error> {
        let state = self.state.read().await;
        let mut summary = WalletSummary {
            freelancer_balance: state.freelancer_balances.get(&user_id).copied().unwrap_or(0),
            client_balance: state.client_balances.get(&user_id).copied().unwrap_or(0),
            ..WalletSummary::default()
        };

        for entry in state.wallet_transactions.iter().filter(|e| e.user_id == user_id) {
            match entry.trx_type {
                WalletTrxType::Credit => summary.total_credits += entry.amount,
                WalletTrxType::Debit => summary.total_debits += entry.amount,
                WalletTrxType::Refund => summary.total_refunds += entry.amount,
            }
        }

        Ok(summary)
    }

    async fn begin(&self) -> Result<Box<dyn StoreTx>, Error> {
        Ok(Box::new(MemoryTx {
            state: self.state.clone(),
            locks: self.locks.clone(),
            offer_guards: HashMap::new(),
            account_guards: HashMap::new(),
            code_guards: Vec::new(),
            staged: Vec::new(),
            committed: false,
        }))
    }
}

enum StagedWrite {
    InsertOffer(JobOffer),
    SaveOffer(JobOffer),
    Message(Message),
    Balance {
        account: AccountKind,
        user_id: Uuid,
        delta: i64,
    },
    WalletEntry(WalletTransaction),
    InsertTransaction(Transaction),
    UpdateTransaction(CallbackUpdate),
}

pub struct MemoryTx {
    state: Arc<RwLock<MemoryState>>,
    locks: Arc<Locks>,
    offer_guards: HashMap<Uuid, RowGuard<Uuid>>,
    account_guards: HashMap<(AccountKind, Uuid), RowGuard<(AccountKind, Uuid)>>,
    code_guards: Vec<RowGuard<String>>,
    staged: Vec<StagedWrite>,
    committed: bool,
}

impl MemoryTx {
    fn ensure_open(&self) -> Result<(), Error> {
        if self.committed {
            return Err(Error::Protocol("transaction already committed".to_string()));
        }
        Ok(())
    }

    async fn hold_offer(&mut self, id: Uuid) {
        if !self.offer_guards.contains_key(&id) {
            let guard = self.locks.offers.acquire(id).await;
            self.offer_guards.insert(id, guard);
        }
    }

    async fn hold_account(&mut self, account: AccountKind, user_id: Uuid) {
        let key = (account, user_id);
        if !self.account_guards.contains_key(&key) {
            let guard = self.locks.accounts.acquire(key).await;
            self.account_guards.insert(key, guard);
        }
    }

    /// Committed offer with this unit's own writes laid over it.
    async fn current_offer(&self, id: Uuid) -> Option<JobOffer> {
        let staged = self.staged.iter().rev().find_map(|write| match write {
            StagedWrite::InsertOffer(offer) | StagedWrite::SaveOffer(offer) if offer.id == id => {
                Some(offer.clone())
            }
            _ => None,
        });
        match staged {
            Some(offer) => Some(offer),
            None => self.state.read().await.offers.get(&id).cloned(),
        }
    }

    /// Committed balance plus this unit's staged deltas.
    async fn current_balance(&self, account: AccountKind, user_id: Uuid) -> Option<i64> {
        let committed = self
            .state
            .read()
            .await
            .balances(account)
            .get(&user_id)
            .copied()?;
        let staged: i64 = self
            .staged
            .iter()
            .filter_map(|write| match write {
                StagedWrite::Balance {
                    account: a,
                    user_id: u,
                    delta,
                } if *a == account && *u == user_id => Some(*delta),
                _ => None,
            })
            .sum();
        Some(committed + staged)
    }
}

#[async_trait]
impl StoreTx for MemoryTx {
    async fn lock_offer(&mut self, id: Uuid) -> Result<Option<JobOffer>, Error> {
        self.ensure_open()?;
        self.hold_offer(id).await;
        Ok(self.current_offer(id).await)
    }

    async fn lock_offer_by_code(&mut self, order_code: &str) -> Result<Option<JobOffer>, Error> {
        self.ensure_open()?;
        let id = self
            .state
            .read()
            .await
            .offers
            .values()
            .find(|offer| offer.order_code == order_code)
            .map(|offer| offer.id);

        match id {
            Some(id) => self.lock_offer(id).await,
            None => Ok(None),
        }
    }

    async fn insert_offer(&mut self, offer: &JobOffer) -> Result<bool, Error> {
        self.ensure_open()?;
        // a concurrent insert of the same code waits here until the first commits
        let guard = self.locks.order_codes.acquire(offer.order_code.clone()).await;
        let taken = self
            .state
            .read()
            .await
            .offers
            .values()
            .any(|existing| existing.order_code == offer.order_code);
        if taken {
            return Ok(false);
        }

        self.code_guards.push(guard);
        self.hold_offer(offer.id).await;
        self.staged.push(StagedWrite::InsertOffer(offer.clone()));
        Ok(true)
    }

    async fn save_offer(&mut self, offer: &JobOffer) -> Result<(), Error> {
        self.ensure_open()?;
        self.hold_offer(offer.id).await;
        self.staged.push(StagedWrite::SaveOffer(offer.clone()));
        Ok(())
    }

    async fn insert_message(&mut self, message: &Message) -> Result<(), Error> {
        self.ensure_open()?;
        self.staged.push(StagedWrite::Message(message.clone()));
        Ok(())
    }

    async fn lock_balance(&mut self, account: AccountKind, user_id: Uuid) -> Result<Option<i64>, Error> {
        self.ensure_open()?;
        self.hold_account(account, user_id).await;
        Ok(self.current_balance(account, user_id).await)
    }

    async fn increment_balance(&mut self, account: AccountKind, user_id: Uuid, amount: i64) -> Result<u64, Error> {
        self.ensure_open()?;
        self.hold_account(account, user_id).await;
        if self.current_balance(account, user_id).await.is_none() {
            return Ok(0);
        }

        self.staged.push(StagedWrite::Balance {
            account,
            user_id,
            delta: amount,
        });
        Ok(1)
    }

    async fn decrement_balance(&mut self, account: AccountKind, user_id: Uuid, amount: i64) -> Result<u64, Error> {
        self.ensure_open()?;
        self.hold_account(account, user_id).await;
        match self.current_balance(account, user_id).await {
            Some(balance) if balance >= amount => {
                self.staged.push(StagedWrite::Balance {
                    account,
                    user_id,
                    delta: -amount,
                });
                Ok(1)
            }
            _ => Ok(0),
        }
    }

    async fn insert_wallet_transaction(&mut self, entry: &WalletTransaction) -> Result<(), Error> {
        self.ensure_open()?;
        self.staged.push(StagedWrite::WalletEntry(entry.clone()));
        Ok(())
    }

    async fn insert_transaction(&mut self, trx: &Transaction) -> Result<(), Error> {
        self.ensure_open()?;
        self.staged.push(StagedWrite::InsertTransaction(trx.clone()));
        Ok(())
    }

    async fn update_transaction_from_callback(
        &mut self,
        update: &CallbackUpdate,
    ) -> Result<Option<Transaction>, Error> {
        self.ensure_open()?;
        let existing = self
            .state
            .read()
            .await
            .transactions
            .get(&update.reference)
            .cloned();

        Ok(existing.map(|mut trx| {
            apply_callback(&mut trx, update);
            self.staged.push(StagedWrite::UpdateTransaction(update.clone()));
            trx
        }))
    }

    async fn commit(&mut self) -> Result<(), Error> {
        self.ensure_open()?;
        let mut state = self.state.write().await;

        for write in self.staged.drain(..) {
            match write {
                StagedWrite::InsertOffer(offer) | StagedWrite::SaveOffer(offer) => {
                    state.offers.insert(offer.id, offer);
                }
                StagedWrite::Message(message) => {
                    if let Some(conversation) = state.conversations.get_mut(&message.conversation_id) {
                        conversation.last_message_at = Some(message.created_at);
                    }
                    state.messages.push(message);
                }
                StagedWrite::Balance {
                    account,
                    user_id,
                    delta,
                } => {
                    if let Some(balance) = state.balances_mut(account).get_mut(&user_id) {
                        *balance += delta;
                    }
                }
                StagedWrite::WalletEntry(entry) => state.wallet_transactions.push(entry),
                StagedWrite::InsertTransaction(trx) => {
                    state.transactions.insert(trx.reference.clone(), trx);
                }
                StagedWrite::UpdateTransaction(update) => {
                    if let Some(trx) = state.transactions.get_mut(&update.reference) {
                        apply_callback(trx, &update);
                    }
                }
            }
        }
        drop(state);

        self.committed = true;
        self.offer_guards.clear();
        self.account_guards.clear();
        self.code_guards.clear();
        Ok(())
    }
}

fn apply_callback(trx: &mut Transaction, update: &CallbackUpdate) {
    trx.status = update.status;
    trx.payment_method = update.payment_method.clone();
    trx.payment_method_code = update.payment_method_code.clone();
    trx.total_amount = update.total_amount;
    trx.fee_merchant = update.fee_merchant;
    trx.fee_customer = update.fee_customer;
    trx.total_fee = update.total_fee;
    trx.amount_received = update.amount_received;
    trx.paid_at = update.paid_at;
    trx.note = update.note.clone();
    trx.updated_at = Utc::now();
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::chatmodels::MessageType;
    use chrono::Duration;
    use std::time::Duration as StdDuration;

    fn sample_offer(conversation: &Conversation, code: &str) -> JobOffer {
        let now = Utc::now();
        JobOffer {
            id: Uuid::new_v4(),
            order_code: code.to_string(),
            conversation_id: conversation.id,
            freelancer_id: conversation.freelancer_id,
            client_id: conversation.client_id,
            product_id: None,
            price: 1000,
            platform_fee: 100,
            net_amount: 900,
            title: "Logo".to_string(),
            description: String::new(),
            revision_count: 1,
            used_revision_count: 0,
            start_date: now.date_naive(),
            delivery_date: now.date_naive(),
            delivery_format: String::new(),
            notes: String::new(),
            work_delivery_link: None,
            work_delivery_files: Vec::new(),
            status: OfferStatus::Pending,
            created_at: now,
            updated_at: now,
        }
    }

    #[tokio::test]
    async fn test_uncommitted_writes_are_discarded_on_drop() {
        let store = MemoryStore::new();
        let conversation = Conversation::new(Uuid::new_v4(), Uuid::new_v4(), None);
        store.insert_conversation(conversation.clone()).await;
        let offer = sample_offer(&conversation, "AAAA1111");

        {
            let mut tx = store.begin().await.unwrap();
            assert!(tx.insert_offer(&offer).await.unwrap());
        }

        assert!(store.get_offer(offer.id).await.unwrap().is_none());
        assert!(!store.order_code_exists("AAAA1111").await.unwrap());
    }

    #[tokio::test]
    async fn test_duplicate_order_code_is_rejected() {
        let store = MemoryStore::new();
        let conversation = Conversation::new(Uuid::new_v4(), Uuid::new_v4(), None);
        store.insert_conversation(conversation.clone()).await;

        let mut tx = store.begin().await.unwrap();
        assert!(tx.insert_offer(&sample_offer(&conversation, "DUPL0001")).await.unwrap());
        tx.commit().await.unwrap();

        let mut tx = store.begin().await.unwrap();
        assert!(!tx.insert_offer(&sample_offer(&conversation, "DUPL0001")).await.unwrap());
    }

    #[tokio::test]
    async fn test_offer_lock_blocks_second_unit_until_commit() {
        let store = MemoryStore::new();
        let conversation = Conversation::new(Uuid::new_v4(), Uuid::new_v4(), None);
        store.insert_conversation(conversation.clone()).await;
        let offer = sample_offer(&conversation, "LOCK0001");
        let mut tx = store.begin().await.unwrap();
        tx.insert_offer(&offer).await.unwrap();
        tx.commit().await.unwrap();

        let mut first = store.begin().await.unwrap();
        first.lock_offer(offer.id).await.unwrap();

        let contender = store.clone();
        let offer_id = offer.id;
        let waiter = tokio::spawn(async move {
            let mut second = contender.begin().await.unwrap();
            second.lock_offer(offer_id).await.unwrap().map(|o| o.status)
        });

        tokio::time::sleep(StdDuration::from_millis(50)).await;
        assert!(!waiter.is_finished());

        let mut paid = offer.clone();
        paid.status = OfferStatus::Paid;
        first.save_offer(&paid).await.unwrap();
        first.commit().await.unwrap();

        assert_eq!(waiter.await.unwrap(), Some(OfferStatus::Paid));
    }

    #[tokio::test]
    async fn test_guarded_decrement_and_message_bookkeeping() {
        let store = MemoryStore::new();
        let user = Uuid::new_v4();
        store.create_user_account(user, 500).await;
        let conversation = Conversation::new(user, Uuid::new_v4(), None);
        store.insert_conversation(conversation.clone()).await;

        let mut tx = store.begin().await.unwrap();
        assert_eq!(tx.decrement_balance(AccountKind::Client, user, 600).await.unwrap(), 0);
        assert_eq!(tx.decrement_balance(AccountKind::Client, user, 200).await.unwrap(), 1);
        assert_eq!(tx.lock_balance(AccountKind::Client, user).await.unwrap(), Some(300));
        tx.insert_message(&Message::new(conversation.id, user, MessageType::System, "hi".into()))
            .await
            .unwrap();
        tx.commit().await.unwrap();

        assert_eq!(store.get_balance(AccountKind::Client, user).await.unwrap(), Some(300));
        let conversation = store.get_conversation(conversation.id).await.unwrap().unwrap();
        assert!(conversation.last_message_at.is_some());
    }

    #[tokio::test]
    async fn test_stale_delivered_respects_cutoff() {
        let store = MemoryStore::new();
        let conversation = Conversation::new(Uuid::new_v4(), Uuid::new_v4(), None);
        store.insert_conversation(conversation.clone()).await;
        let mut offer = sample_offer(&conversation, "STALE001");
        offer.status = OfferStatus::Delivered;
        let mut tx = store.begin().await.unwrap();
        tx.insert_offer(&offer).await.unwrap();
        tx.commit().await.unwrap();

        let now = Utc::now();
        store.set_offer_updated_at(offer.id, now - Duration::hours(73)).await;

        assert_eq!(
            store.list_stale_delivered(now - Duration::hours(72)).await.unwrap(),
            vec![offer.id]
        );
        assert!(store
            .list_stale_delivered(now - Duration::hours(74))
            .await
            .unwrap()
            .is_empty());
    }

    #[tokio::test]
    async fn test_released_locks_leave_no_entries() {
        let store = MemoryStore::new();
        let user = Uuid::new_v4();
        store.create_user_account(user, 100).await;
        let conversation = Conversation::new(user, Uuid::new_v4(), None);
        store.insert_conversation(conversation.clone()).await;
        let offer = sample_offer(&conversation, "KEEP0001");

        let mut tx = store.begin().await.unwrap();
        assert!(tx.insert_offer(&offer).await.unwrap());
        tx.lock_balance(AccountKind::Client, user).await.unwrap();
        tx.commit().await.unwrap();

        {
            let mut tx = store.begin().await.unwrap();
            assert!(!tx.insert_offer(&sample_offer(&conversation, "KEEP0001")).await.unwrap());
            assert!(tx.insert_offer(&sample_offer(&conversation, "KEEP0002")).await.unwrap());
        }

        let mut first = store.begin().await.unwrap();
        first.lock_offer(offer.id).await.unwrap();
        let contender = store.clone();
        let offer_id = offer.id;
        let waiter = tokio::spawn(async move {
            let mut second = contender.begin().await.unwrap();
            second.lock_offer(offer_id).await.unwrap();
            second.commit().await.unwrap();
        });
        tokio::time::sleep(StdDuration::from_millis(20)).await;
        first.commit().await.unwrap();
        waiter.await.unwrap();

        assert_eq!(store.locks.offers.len(), 0);
        assert_eq!(store.locks.accounts.len(), 0);
        assert_eq!(store.locks.order_codes.len(), 0);
    }
}
