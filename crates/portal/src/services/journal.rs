//! Per-user trade journals.

use bookvision_core::{DailyStats, NewTrade, Trade, TradeError, TradeId, TradeJournal, UserId};
use chrono::{DateTime, FixedOffset, Utc};
use thiserror::Error;

use super::locks::StripedLocks;
use crate::storage::{BlobStore, Scope, StorageError, USER_TRADES_KEY};

#[derive(Debug, Error)]
pub enum JournalError {
    #[error(transparent)]
    Invalid(#[from] TradeError),

    #[error(transparent)]
    Storage(#[from] StorageError),
}

/// Trade journals, each private to its owner.
pub struct JournalService {
    store: BlobStore,
    locks: StripedLocks,
    utc_offset: FixedOffset,
}

impl JournalService {
    /// `utc_offset` decides which calendar day counts as "today".
    #[must_use]
    pub fn new(store: BlobStore, utc_offset: FixedOffset) -> Self {
        Self {
            store,
            locks: StripedLocks::default(),
            utc_offset,
        }
    }

    async fn load(&self, scope: &Scope) -> Result<TradeJournal, StorageError> {
        let trades = self
            .store
            .get_json::<Vec<Trade>>(scope, USER_TRADES_KEY)
            .await?;
        Ok(trades.map(TradeJournal::new).unwrap_or_default())
    }

    /// The user's trades, newest first.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the journal cannot be read.
    pub async fn trades(&self, user: &UserId) -> Result<Vec<Trade>, StorageError> {
        let journal = self.load(&Scope::User(user.clone())).await?;
        Ok(journal.trades().to_vec())
    }

    /// Validate and record a trade.
    ///
    /// # Errors
    ///
    /// Returns `JournalError::Invalid` for a blank asset or negative value,
    /// or a storage error.
    pub async fn add(&self, user: &UserId, input: NewTrade) -> Result<Trade, JournalError> {
        let trade = Trade::create(input, Utc::now())?;
        let scope = Scope::User(user.clone());

        let _guard = self.locks.lock(user).await;
        let mut journal = self.load(&scope).await?;
        journal.record(trade.clone());
        self.store.set_json(&scope, USER_TRADES_KEY, &journal).await?;

        tracing::debug!(user_id = %user, trade_id = %trade.id, "Trade recorded");
        Ok(trade)
    }

    /// Delete a trade, returning whether it existed.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the journal cannot be read or written.
    pub async fn remove(&self, user: &UserId, id: &TradeId) -> Result<bool, StorageError> {
        let scope = Scope::User(user.clone());

        let _guard = self.locks.lock(user).await;
        let mut journal = self.load(&scope).await?;
        if journal.remove(id).is_none() {
            return Ok(false);
        }
        self.store.set_json(&scope, USER_TRADES_KEY, &journal).await?;
        Ok(true)
    }

    /// Statistics for the calendar day containing `now`.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the journal cannot be read.
    pub async fn stats(&self, user: &UserId, now: DateTime<Utc>) -> Result<DailyStats, StorageError> {
        let journal = self.load(&Scope::User(user.clone())).await?;
        let today = now.with_timezone(&self.utc_offset).date_naive();
        Ok(journal.stats_for(today, self.utc_offset))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use bookvision_core::{TRADE_JOURNAL_LIMIT, TradeKind, TradeResult};
    use rust_decimal::dec;

    use super::*;

    fn service() -> JournalService {
        JournalService::new(BlobStore::memory(), FixedOffset::west_opt(3 * 3600).unwrap())
    }

    fn input(asset: &str, result: TradeResult, value: rust_decimal::Decimal) -> NewTrade {
        NewTrade {
            asset: asset.into(),
            kind: TradeKind::Buy,
            result,
            value,
            note: String::new(),
        }
    }

    #[tokio::test]
    async fn test_journals_are_private() {
        let journal = service();
        let ana = UserId::new("ana");
        let bia = UserId::new("bia");

        journal
            .add(&ana, input("petr4", TradeResult::Gain, dec!(10)))
            .await
            .unwrap();

        assert_eq!(journal.trades(&ana).await.unwrap().len(), 1);
        assert!(journal.trades(&bia).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_newest_first_and_bounded() {
        let journal = service();
        let ana = UserId::new("ana");
        for i in 0..=TRADE_JOURNAL_LIMIT {
            journal
                .add(&ana, input(&format!("A{i}"), TradeResult::Gain, dec!(1)))
                .await
                .unwrap();
        }

        let trades = journal.trades(&ana).await.unwrap();
        assert_eq!(trades.len(), TRADE_JOURNAL_LIMIT);
        assert_eq!(trades[0].asset, format!("A{TRADE_JOURNAL_LIMIT}"));
    }

    #[tokio::test]
    async fn test_remove_only_own_trade() {
        let journal = service();
        let ana = UserId::new("ana");
        let bia = UserId::new("bia");
        let trade = journal
            .add(&ana, input("VALE3", TradeResult::Loss, dec!(5)))
            .await
            .unwrap();

        assert!(!journal.remove(&bia, &trade.id).await.unwrap());
        assert!(journal.remove(&ana, &trade.id).await.unwrap());
        assert!(!journal.remove(&ana, &trade.id).await.unwrap());
    }

    #[tokio::test]
    async fn test_invalid_trade_rejected() {
        let journal = service();
        let result = journal
            .add(&UserId::new("ana"), input("  ", TradeResult::Gain, dec!(1)))
            .await;
        assert!(matches!(result, Err(JournalError::Invalid(TradeError::EmptyAsset))));
    }

    #[tokio::test]
    async fn test_stats_for_today() {
        let journal = service();
        let ana = UserId::new("ana");
        journal
            .add(&ana, input("WIN", TradeResult::Gain, dec!(150.50)))
            .await
            .unwrap();
        journal
            .add(&ana, input("WIN", TradeResult::Loss, dec!(50.25)))
            .await
            .unwrap();
        journal
            .add(&ana, input("WDO", TradeResult::Breakeven, dec!(0)))
            .await
            .unwrap();

        let stats = journal.stats(&ana, Utc::now()).await.unwrap();
        assert_eq!(stats.count, 3);
        assert_eq!(stats.gains, 1);
        assert_eq!(stats.losses, 1);
        assert_eq!(stats.total, dec!(100.25));
        assert_eq!(stats.win_rate, dec!(33.33));

        let tomorrow = Utc::now() + chrono::Duration::days(1);
        assert_eq!(journal.stats(&ana, tomorrow).await.unwrap().count, 0);
    }
}
