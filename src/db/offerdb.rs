// db/offerdb.rs
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{Error, PgConnection, Postgres, Row};
use uuid::Uuid;

use super::{
    db::DBClient,
    store::{MarketStore, StoreTx},
};
use crate::models::{
    chatmodels::{Conversation, Message},
    offermodels::{JobOffer, OfferStatus},
    paymentmodels::{CallbackUpdate, Transaction},
    walletmodels::{AccountKind, WalletSummary, WalletTransaction},
};

const OFFER_COLUMNS: &str = r#"
    id, order_code, conversation_id, freelancer_id, client_id, product_id,
    price, platform_fee, net_amount, title, description,
    revision_count, used_revision_count, start_date, delivery_date,
    delivery_format, notes, work_delivery_link, work_delivery_files,
    status, created_at, updated_at
"#;

const TRANSACTION_COLUMNS: &str = r#"
    id, job_offer_id, reference, merchant_ref, payment_method, payment_method_code,
    total_amount, fee_merchant, fee_customer, total_fee, amount_received,
    checkout_url, status, paid_at, note, created_at, updated_at
"#;

/// Table and key column holding the balance of an account kind.
fn balance_location(account: AccountKind) -> (&'static str, &'static str) {
    match account {
        AccountKind::Freelancer => ("freelancer_profiles", "user_id"),
        AccountKind::Client => ("users", "id"),
    }
}

#[async_trait]
impl MarketStore for DBClient {
    async fn get_conversation(&self, id: Uuid) -> Result<Option<Conversation>, Error> {
        sqlx::query_as::<_, Conversation>(
            r#"
            SELECT id, client_id, freelancer_id, product_id, last_message_at, created_at
            FROM conversations
            WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await
    }

    async fn get_offer(&self, id: Uuid) -> Result<Option<JobOffer>, Error> {
        sqlx::query_as::<_, JobOffer>(&format!(
            "SELECT {} FROM job_offers WHERE id = $1",
            OFFER_COLUMNS
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await
    }

    async fn list_offers_by_conversation(&self, conversation_id: Uuid) -> Result<Vec<JobOffer>, Error> {
        sqlx::query_as::<_, JobOffer>(&format!(
            "SELECT {} FROM job_offers WHERE conversation_id = $1 ORDER BY created_at DESC",
            OFFER_COLUMNS
        ))
        .bind(conversation_id)
        .fetch_all(&self.pool)
        .await
    }

    async fn list_offers_by_freelancer(
        &self,
        freelancer_id: Uuid,
        status: Option<OfferStatus>,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<JobOffer>, Error> {
        sqlx::query_as::<_, JobOffer>(&format!(
            r#"
            SELECT {} FROM job_offers
            WHERE freelancer_id = $1 AND ($2::job_offer_status IS NULL OR status = $2)
            ORDER BY created_at DESC
            LIMIT $3 OFFSET $4
            "#,
            OFFER_COLUMNS
        ))
        .bind(freelancer_id)
        .bind(status)
        .bind(limit)
        .bind(offset)
        .fetch_all(&self.pool)
        .await
    }

    async fn count_offers_by_freelancer(
        &self,
        freelancer_id: Uuid,
        status: Option<OfferStatus>,
    ) -> Result<i64, Error> {
        sqlx::query_scalar(
            r#"
            SELECT COUNT(*) FROM job_offers
            WHERE freelancer_id = $1 AND ($2::job_offer_status IS NULL OR status = $2)
            "#,
        )
        .bind(freelancer_id)
        .bind(status)
        .fetch_one(&self.pool)
        .await
    }

    async fn count_active_offers(&self, freelancer_id: Uuid) -> Result<i64, Error> {
        sqlx::query_scalar(
            r#"
            SELECT COUNT(*) FROM job_offers
            WHERE freelancer_id = $1 AND status NOT IN ('completed', 'cancelled')
            "#,
        )
        .bind(freelancer_id)
        .fetch_one(&self.pool)
        .await
    }

    async fn order_code_exists(&self, order_code: &str) -> Result<bool, Error> {
        let exists: bool =
            sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM job_offers WHERE order_code = $1)")
                .bind(order_code)
                .fetch_one(&self.pool)
                .await?;

        Ok(exists)
    }

    async fn list_stale_delivered(&self, before: DateTime<Utc>) -> Result<Vec<Uuid>, Error> {
        sqlx::query_scalar(
            r#"
            SELECT id FROM job_offers
            WHERE status = 'delivered' AND updated_at <= $1
            ORDER BY updated_at ASC
            "#,
        )
        .bind(before)
        .fetch_all(&self.pool)
        .await
    }

    async fn list_messages(&self, conversation_id: Uuid) -> Result<Vec<Message>, Error> {
        sqlx::query_as::<_, Message>(
            r#"
            SELECT id, conversation_id, sender_id, type, text, is_read, created_at
            FROM messages
            WHERE conversation_id = $1
            ORDER BY created_at ASC
            "#,
        )
        .bind(conversation_id)
        .fetch_all(&self.pool)
        .await
    }

    async fn get_transaction_by_reference(&self, reference: &str) -> Result<Option<Transaction>, Error> {
        sqlx::query_as::<_, Transaction>(&format!(
            "SELECT {} FROM transactions WHERE reference = $1",
            TRANSACTION_COLUMNS
        ))
        .bind(reference)
        .fetch_optional(&self.pool)
        .await
    }

    async fn get_balance(&self, account: AccountKind, user_id: Uuid) -> Result<Option<i64>, Error> {
        let (table, key) = balance_location(account);
        sqlx::query_scalar(&format!("SELECT balance FROM {} WHERE {} = $1", table, key))
            .bind(user_id)
            .fetch_optional(&self.pool)
            .await
    }

    async fn list_wallet_transactions(
        &self,
        user_id: Uuid,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<WalletTransaction>, Error> {
        sqlx::query_as::<_, WalletTransaction>(
            r#"
            SELECT id, user_id, amount, type, description, reference_id, created_at
            FROM wallet_transactions
            WHERE user_id = $1
            ORDER BY created_at DESC
            LIMIT $2 OFFSET $3
            "#,
        )
        .bind(user_id)
        .bind(limit)
        .bind(offset)
        .fetch_all(&self.pool)
        .await
    }

    async fn wallet_summary(&self, user_id: Uuid) -> Result<WalletSummary, Error> {
        let totals = sqlx::query(
            r#"
            SELECT
                COALESCE(SUM(amount) FILTER (WHERE type = 'credit'), 0)::BIGINT AS total_credits,
                COALESCE(SUM(amount) FILTER (WHERE type = 'debit'), 0)::BIGINT AS total_debits,
                COALESCE(SUM(amount) FILTER (WHERE type = 'refund'), 0)::BIGINT AS total_refunds
            FROM wallet_transactions
            WHERE user_id = $1
            "#,
        )
        .bind(user_id)
        .fetch_one(&self.pool)
        .await?;

        let freelancer_balance = self
            .get_balance(AccountKind::Freelancer, user_id)
            .await?
            .unwrap_or(0);
        let client_balance = self.get_balance(AccountKind::Client, user_id).await?.unwrap_or(0);

        Ok(WalletSummary {
            freelancer_balance,
            client_balance,
            total_credits: totals.get::<i64, _>("total_credits"),
            total_debits: totals.get::<i64, _>("total_debits"),
            total_refunds: totals.get::<i64, _>("total_refunds"),
        })
    }

    async fn begin(&self) -> Result<Box<dyn StoreTx>, Error> {
        let tx = self.pool.begin().await?;
        Ok(Box::new(PgStoreTx { tx: Some(tx) }))
    }
}

/// Postgres unit of work. Row locks come from `SELECT ... FOR UPDATE` and are
/// released when the underlying transaction ends.
pub struct PgStoreTx {
    tx: Option<sqlx::Transaction<'static, Postgres>>,
}

impl PgStoreTx {
    fn conn(&mut self) -> Result<&mut PgConnection, Error> {
        self.tx
            .as_deref_mut()
            .ok_or_else(|| Error::Protocol("transaction already committed".to_string()))
    }
}

#[async_trait]
impl StoreTx for PgStoreTx {
    async fn lock_offer(&mut self, id: Uuid) -> Result<Option<JobOffer>, Error> {
        let conn = self.conn()?;
        sqlx::query_as::<_, JobOffer>(&format!(
            "SELECT {} FROM job_offers WHERE id = $1 FOR UPDATE",
            OFFER_COLUMNS
        ))
        .bind(id)
        .fetch_optional(conn)
        .await
    }

    async fn lock_offer_by_code(&mut self, order_code: &str) -> Result<Option<JobOffer>, Error> {
        let conn = self.conn()?;
        sqlx::query_as::<_, JobOffer>(&format!(
            "SELECT {} FROM job_offers WHERE order_code = $1 FOR UPDATE",
            OFFER_COLUMNS
        ))
        .bind(order_code)
        .fetch_optional(conn)
        .await
    }

    async fn insert_offer(&mut self, offer: &JobOffer) -> Result<bool, Error> {
        let conn = self.conn()?;
        let result = sqlx::query(
            r#"
            INSERT INTO job_offers (
                id, order_code, conversation_id, freelancer_id, client_id, product_id,
                price, platform_fee, net_amount, title, description,
                revision_count, used_revision_count, start_date, delivery_date,
                delivery_format, notes, work_delivery_link, work_delivery_files,
                status, created_at, updated_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16, $17, $18, $19, $20, $21, $22)
            ON CONFLICT (order_code) DO NOTHING
            "#,
        )
        .bind(offer.id)
        .bind(&offer.order_code)
        .bind(offer.conversation_id)
        .bind(offer.freelancer_id)
        .bind(offer.client_id)
        .bind(offer.product_id)
        .bind(offer.price)
        .bind(offer.platform_fee)
        .bind(offer.net_amount)
        .bind(&offer.title)
        .bind(&offer.description)
        .bind(offer.revision_count)
        .bind(offer.used_revision_count)
        .bind(offer.start_date)
        .bind(offer.delivery_date)
        .bind(&offer.delivery_format)
        .bind(&offer.notes)
        .bind(&offer.work_delivery_link)
        .bind(&offer.work_delivery_files)
        .bind(offer.status)
        .bind(offer.created_at)
        .bind(offer.updated_at)
        .execute(conn)
        .await?;

        Ok(result.rows_affected() == 1)
    }

    async fn save_offer(&mut self, offer: &JobOffer) -> Result<(), Error> {
        let conn = self.conn()?;
        sqlx::query(
            r#"
            UPDATE job_offers
            SET price = $2,
                platform_fee = $3,
                net_amount = $4,
                title = $5,
                description = $6,
                revision_count = $7,
                used_revision_count = $8,
                start_date = $9,
                delivery_date = $10,
                delivery_format = $11,
                notes = $12,
                work_delivery_link = $13,
                work_delivery_files = $14,
                status = $15,
                updated_at = $16
            WHERE id = $1
            "#,
        )
        .bind(offer.id)
        .bind(offer.price)
        .bind(offer.platform_fee)
        .bind(offer.net_amount)
        .bind(&offer.title)
        .bind(&offer.description)
        .bind(offer.revision_count)
        .bind(offer.used_revision_count)
        .bind(offer.start_date)
        .bind(offer.delivery_date)
        .bind(&offer.delivery_format)
        .bind(&offer.notes)
        .bind(&offer.work_delivery_link)
        .bind(&offer.work_delivery_files)
        .bind(offer.status)
        .bind(offer.updated_at)
        .execute(conn)
        .await?;

        Ok(())
    }

    async fn insert_message(&mut self, message: &Message) -> Result<(), Error> {
        let conn = self.conn()?;
        sqlx::query(
            r#"
            INSERT INTO messages (id, conversation_id, sender_id, type, text, is_read, created_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            "#,
        )
        .bind(message.id)
        .bind(message.conversation_id)
        .bind(message.sender_id)
        .bind(message.message_type)
        .bind(&message.text)
        .bind(message.is_read)
        .bind(message.created_at)
        .execute(&mut *conn)
        .await?;

        sqlx::query("UPDATE conversations SET last_message_at = $2 WHERE id = $1")
            .bind(message.conversation_id)
            .bind(message.created_at)
            .execute(&mut *conn)
            .await?;

        Ok(())
    }

    async fn lock_balance(&mut self, account: AccountKind, user_id: Uuid) -> Result<Option<i64>, Error> {
        let (table, key) = balance_location(account);
        let conn = self.conn()?;
        sqlx::query_scalar(&format!(
            "SELECT balance FROM {} WHERE {} = $1 FOR UPDATE",
            table, key
        ))
        .bind(user_id)
        .fetch_optional(conn)
        .await
    }

    async fn increment_balance(&mut self, account: AccountKind, user_id: Uuid, amount: i64) -> Result<u64, Error> {
        let (table, key) = balance_location(account);
        let conn = self.conn()?;
        let result = sqlx::query(&format!(
            "UPDATE {} SET balance = balance + $2 WHERE {} = $1",
            table, key
        ))
        .bind(user_id)
        .bind(amount)
        .execute(conn)
        .await?;

        Ok(result.rows_affected())
    }

    async fn decrement_balance(&mut self, account: AccountKind, user_id: Uuid, amount: i64) -> Result<u64, Error> {
        let (table, key) = balance_location(account);
        let conn = self.conn()?;
        let result = sqlx::query(&format!(
            "UPDATE {} SET balance = balance - $2 WHERE {} = $1 AND balance >= $2",
            table, key
        ))
        .bind(user_id)
        .bind(amount)
        .execute(conn)
        .await?;

        Ok(result.rows_affected())
    }

    async fn insert_wallet_transaction(&mut self, entry: &WalletTransaction) -> Result<(), Error> {
        let conn = self.conn()?;
        sqlx::query(
            r#"
            INSERT INTO wallet_transactions (id, user_id, amount, type, description, reference_id, created_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            "#,
        )
        .bind(entry.id)
        .bind(entry.user_id)
        .bind(entry.amount)
        .bind(entry.trx_type)
        .bind(&entry.description)
        .bind(entry.reference_id)
        .bind(entry.created_at)
        .execute(conn)
        .await?;

        Ok(())
    }

    async fn insert_transaction(&mut self, trx: &Transaction) -> Result<(), Error> {
        let conn = self.conn()?;
        sqlx::query(
            r#"
            INSERT INTO transactions (
                id, job_offer_id, reference, merchant_ref, payment_method, payment_method_code,
                total_amount, fee_merchant, fee_customer, total_fee, amount_received,
                checkout_url, status, paid_at, note, created_at, updated_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16, $17)
            "#,
        )
        .bind(trx.id)
        .bind(trx.job_offer_id)
        .bind(&trx.reference)
        .bind(&trx.merchant_ref)
        .bind(&trx.payment_method)
        .bind(&trx.payment_method_code)
        .bind(trx.total_amount)
        .bind(trx.fee_merchant)
        .bind(trx.fee_customer)
        .bind(trx.total_fee)
        .bind(trx.amount_received)
        .bind(&trx.checkout_url)
        .bind(trx.status)
        .bind(trx.paid_at)
        .bind(&trx.note)
        .bind(trx.created_at)
        .bind(trx.updated_at)
        .execute(conn)
        .await?;

        Ok(())
    }

    async fn update_transaction_from_callback(
        &mut self,
        update: &CallbackUpdate,
    ) -> Result<Option<Transaction>, Error> {
        let conn = self.conn()?;
        sqlx::query_as::<_, Transaction>(&format!(
            r#"
            UPDATE transactions
            SET status = $2,
                payment_method = $3,
                payment_method_code = $4,
                total_amount = $5,
                fee_merchant = $6,
                fee_customer = $7,
                total_fee = $8,
                amount_received = $9,
                paid_at = $10,
                note = $11,
                updated_at = NOW()
            WHERE reference = $1
            RETURNING {}
            "#,
            TRANSACTION_COLUMNS
        ))
        .bind(&update.reference)
        .bind(update.status)
        .bind(&update.payment_method)
        .bind(&update.payment_method_code)
        .bind(update.total_amount)
        .bind(update.fee_merchant)
        .bind(update.fee_customer)
        .bind(update.total_fee)
        .bind(update.amount_received)
        .bind(update.paid_at)
        .bind(&update.note)
        .fetch_optional(conn)
        .await
    }

    async fn commit(&mut self) -> Result<(), Error> {
        match self.tx.take() {
            Some(tx) => tx.commit().await,
            None => Err(Error::Protocol("transaction already committed".to_string())),
        }
    }
}
