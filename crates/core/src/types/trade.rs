//! Personal trade journal entries and daily statistics.
//!
//! Values are decimal amounts in the account currency (BRL). On the wire
//! they are JSON numbers, as the journal was originally written by the
//! browser.

use chrono::{DateTime, FixedOffset, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::id::TradeId;

/// Number of trades kept per user.
pub const TRADE_JOURNAL_LIMIT: usize = 100;

/// Largest value accepted for a single trade (one trillion).
pub const MAX_TRADE_VALUE: Decimal = Decimal::from_parts(0xD4A5_1000, 0xE8, 0, false, 0);

/// Errors validating a new trade.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TradeError {
    #[error("asset cannot be empty")]
    EmptyAsset,
    #[error("value cannot be negative")]
    NegativeValue,
    #[error("value cannot exceed {MAX_TRADE_VALUE}")]
    ValueTooLarge,
}

/// Trade direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TradeKind {
    Buy,
    Sell,
}

/// How the trade closed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TradeResult {
    Gain,
    Loss,
    Breakeven,
}

/// A journal entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Trade {
    pub id: TradeId,
    pub asset: String,
    #[serde(rename = "type")]
    pub kind: TradeKind,
    pub result: TradeResult,
    #[serde(with = "rust_decimal::serde::float")]
    pub value: Decimal,
    #[serde(default)]
    pub note: String,
    pub timestamp: i64,
}

/// User input for a new journal entry.
#[derive(Debug, Clone, Deserialize)]
pub struct NewTrade {
    pub asset: String,
    #[serde(rename = "type")]
    pub kind: TradeKind,
    pub result: TradeResult,
    #[serde(with = "rust_decimal::serde::float")]
    pub value: Decimal,
    #[serde(default)]
    pub note: String,
}

impl Trade {
    /// Validate input and stamp a new trade.
    ///
    /// The asset ticker is trimmed and upper-cased; the note is trimmed.
    ///
    /// # Errors
    ///
    /// Returns [`TradeError`] if the asset is blank or the value is negative
    /// or above [`MAX_TRADE_VALUE`].
    pub fn create(input: NewTrade, now: DateTime<Utc>) -> Result<Self, TradeError> {
        let asset = input.asset.trim().to_uppercase();
        if asset.is_empty() {
            return Err(TradeError::EmptyAsset);
        }
        if input.value.is_sign_negative() && !input.value.is_zero() {
            return Err(TradeError::NegativeValue);
        }
        if input.value > MAX_TRADE_VALUE {
            return Err(TradeError::ValueTooLarge);
        }
        Ok(Self {
            id: TradeId::generate(),
            asset,
            kind: input.kind,
            result: input.result,
            value: input.value,
            note: input.note.trim().to_owned(),
            timestamp: now.timestamp_millis(),
        })
    }

    /// Signed contribution to the day's total.
    #[must_use]
    pub fn signed_value(&self) -> Decimal {
        match self.result {
            TradeResult::Gain => self.value,
            TradeResult::Loss => -self.value,
            TradeResult::Breakeven => Decimal::ZERO,
        }
    }

    /// Calendar date of the trade in the given offset.
    #[must_use]
    pub fn local_date(&self, offset: FixedOffset) -> Option<NaiveDate> {
        DateTime::from_timestamp_millis(self.timestamp)
            .map(|ts| ts.with_timezone(&offset).date_naive())
    }
}

/// Summary of one day's trades.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DailyStats {
    #[serde(with = "rust_decimal::serde::float")]
    pub total: Decimal,
    pub gains: usize,
    pub losses: usize,
    /// Percentage of trades that were gains, rounded to two places.
    #[serde(with = "rust_decimal::serde::float")]
    pub win_rate: Decimal,
    pub count: usize,
}

/// A user's journal, newest first, bounded to [`TRADE_JOURNAL_LIMIT`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TradeJournal(Vec<Trade>);

impl TradeJournal {
    /// Wrap a stored trade list, trimming it to the limit.
    #[must_use]
    pub fn new(mut trades: Vec<Trade>) -> Self {
        trades.truncate(TRADE_JOURNAL_LIMIT);
        Self(trades)
    }

    /// Record a trade at the front, dropping the oldest past the limit.
    pub fn record(&mut self, trade: Trade) {
        self.0.insert(0, trade);
        self.0.truncate(TRADE_JOURNAL_LIMIT);
    }

    /// Remove a trade by id, returning it if it existed.
    pub fn remove(&mut self, id: &TradeId) -> Option<Trade> {
        let pos = self.0.iter().position(|t| &t.id == id)?;
        Some(self.0.remove(pos))
    }

    /// Statistics over the trades dated `day` in `offset`.
    #[must_use]
    pub fn stats_for(&self, day: NaiveDate, offset: FixedOffset) -> DailyStats {
        let todays: Vec<&Trade> = self
            .0
            .iter()
            .filter(|t| t.local_date(offset) == Some(day))
            .collect();

        // Stored journals are not revalidated, so the total saturates.
        let total = todays
            .iter()
            .fold(Decimal::ZERO, |acc, t| acc.saturating_add(t.signed_value()));
        let gains = todays
            .iter()
            .filter(|t| t.result == TradeResult::Gain)
            .count();
        let losses = todays
            .iter()
            .filter(|t| t.result == TradeResult::Loss)
            .count();
        let count = todays.len();
        let win_rate = if count == 0 {
            Decimal::ZERO
        } else {
            (Decimal::from(gains) * Decimal::ONE_HUNDRED / Decimal::from(count)).round_dp(2)
        };

        DailyStats {
            total,
            gains,
            losses,
            win_rate,
            count,
        }
    }

    /// Trades, newest first.
    #[must_use]
    pub fn trades(&self) -> &[Trade] {
        &self.0
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use rust_decimal::dec;

    use super::*;

    fn brt() -> FixedOffset {
        FixedOffset::west_opt(3 * 3600).unwrap()
    }

    fn input(asset: &str, result: TradeResult, value: Decimal) -> NewTrade {
        NewTrade {
            asset: asset.to_owned(),
            kind: TradeKind::Buy,
            result,
            value,
            note: String::new(),
        }
    }

    fn at(rfc3339: &str) -> DateTime<Utc> {
        DateTime::parse_from_rfc3339(rfc3339)
            .unwrap()
            .with_timezone(&Utc)
    }

    #[test]
    fn test_create_normalizes_asset_and_note() {
        let mut new = input("  petr4 ", TradeResult::Gain, dec!(10));
        new.note = "  rompimento  ".to_owned();
        let trade = Trade::create(new, at("2026-03-02T13:00:00Z")).unwrap();
        assert_eq!(trade.asset, "PETR4");
        assert_eq!(trade.note, "rompimento");
    }

    #[test]
    fn test_create_rejects_invalid_input() {
        let now = at("2026-03-02T13:00:00Z");
        assert_eq!(
            Trade::create(input(" ", TradeResult::Gain, dec!(1)), now),
            Err(TradeError::EmptyAsset)
        );
        assert_eq!(
            Trade::create(input("WIN", TradeResult::Loss, dec!(-1)), now),
            Err(TradeError::NegativeValue)
        );
        assert_eq!(
            Trade::create(input("WIN", TradeResult::Gain, MAX_TRADE_VALUE + dec!(0.01)), now),
            Err(TradeError::ValueTooLarge)
        );
        assert!(Trade::create(input("WIN", TradeResult::Gain, MAX_TRADE_VALUE), now).is_ok());
    }

    #[test]
    fn test_record_keeps_newest_first_and_bounded() {
        let mut journal = TradeJournal::default();
        let now = at("2026-03-02T13:00:00Z");
        for i in 0..102 {
            let trade =
                Trade::create(input(&format!("A{i}"), TradeResult::Gain, dec!(1)), now).unwrap();
            journal.record(trade);
        }
        assert_eq!(journal.len(), TRADE_JOURNAL_LIMIT);
        assert_eq!(journal.trades().first().unwrap().asset, "A101");
        assert_eq!(journal.trades().last().unwrap().asset, "A2");
    }

    #[test]
    fn test_remove_by_id() {
        let mut journal = TradeJournal::default();
        let trade = Trade::create(
            input("WDO", TradeResult::Loss, dec!(50)),
            at("2026-03-02T13:00:00Z"),
        )
        .unwrap();
        let id = trade.id.clone();
        journal.record(trade);

        assert!(journal.remove(&TradeId::new("missing")).is_none());
        assert_eq!(journal.remove(&id).unwrap().asset, "WDO");
        assert!(journal.is_empty());
    }

    #[test]
    fn test_stats_for_day_in_offset() {
        let mut journal = TradeJournal::default();
        // 01:00 UTC on the 3rd is still the 2nd in Brasília time.
        for (when, result, value) in [
            ("2026-03-02T12:00:00Z", TradeResult::Gain, dec!(150.50)),
            ("2026-03-02T15:00:00Z", TradeResult::Loss, dec!(40)),
            ("2026-03-03T01:00:00Z", TradeResult::Breakeven, dec!(0)),
            ("2026-03-03T12:00:00Z", TradeResult::Gain, dec!(999)),
        ] {
            journal.record(Trade::create(input("WIN", result, value), at(when)).unwrap());
        }

        let day = NaiveDate::from_ymd_opt(2026, 3, 2).unwrap();
        let stats = journal.stats_for(day, brt());
        assert_eq!(stats.count, 3);
        assert_eq!(stats.gains, 1);
        assert_eq!(stats.losses, 1);
        assert_eq!(stats.total, dec!(110.50));
        assert_eq!(stats.win_rate, dec!(33.33));
    }

    #[test]
    fn test_stats_empty_day() {
        let stats =
            TradeJournal::default().stats_for(NaiveDate::from_ymd_opt(2026, 1, 1).unwrap(), brt());
        assert_eq!(stats.count, 0);
        assert_eq!(stats.win_rate, Decimal::ZERO);
        assert_eq!(stats.total, Decimal::ZERO);
    }

    #[test]
    fn test_stats_total_does_not_overflow() {
        let json = r#"[
            {"id":"1","asset":"WIN","type":"buy","result":"gain","value":5e28,"timestamp":1772452800000},
            {"id":"2","asset":"WIN","type":"buy","result":"gain","value":5e28,"timestamp":1772452800000}
        ]"#;
        let journal: TradeJournal = serde_json::from_str(json).unwrap();

        let stats = journal.stats_for(NaiveDate::from_ymd_opt(2026, 3, 2).unwrap(), brt());
        assert_eq!(stats.count, 2);
        assert_eq!(stats.total, Decimal::MAX);
    }

    #[test]
    fn test_reads_browser_era_journal() {
        let json = r#"[{"id":"1717171717171","asset":"PETR4","type":"sell","result":"loss","value":12.5,"note":"","timestamp":1717171717171}]"#;
        let journal: TradeJournal = serde_json::from_str(json).unwrap();
        let trade = journal.trades().first().unwrap();
        assert_eq!(trade.kind, TradeKind::Sell);
        assert_eq!(trade.value, dec!(12.5));
    }
}
