use chrono::{Datelike, Timelike};
use journal_core::{BucketStats, CanonicalTrade};
use std::collections::BTreeMap;

#[derive(Default)]
struct Acc {
    trades: usize,
    wins: usize,
    pnl: f64,
}

impl Acc {
    fn add(&mut self, trade: &CanonicalTrade) {
        self.trades += 1;
        self.pnl += trade.pnl;
        if trade.pnl > 0.0 {
            self.wins += 1;
        }
    }

    fn into_stats(self, key: String) -> BucketStats {
        let win_rate = if self.trades > 0 {
            self.wins as f64 / self.trades as f64 * 100.0
        } else {
            0.0
        };
        BucketStats {
            key,
            trades: self.trades,
            wins: self.wins,
            pnl: self.pnl,
            win_rate,
        }
    }
}

/// Group by a sortable key, then label each bucket. Empty buckets are omitted.
fn group<K, F, L>(trades: &[CanonicalTrade], key_of: F, label: L) -> Vec<BucketStats>
where
    K: Ord,
    F: Fn(&CanonicalTrade) -> K,
    L: Fn(&K) -> String,
{
    let mut buckets: BTreeMap<K, Acc> = BTreeMap::new();
    for trade in trades {
        buckets.entry(key_of(trade)).or_default().add(trade);
    }
    buckets
        .into_iter()
        .map(|(k, acc)| acc.into_stats(label(&k)))
        .collect()
}

const DAY_NAMES: [&str; 7] = [
    "Monday",
    "Tuesday",
    "Wednesday",
    "Thursday",
    "Friday",
    "Saturday",
    "Sunday",
];

/// Day-of-week buckets, Monday first.
pub fn by_day_of_week(trades: &[CanonicalTrade]) -> Vec<BucketStats> {
    group(
        trades,
        |t| t.datetime.weekday().num_days_from_monday() as usize,
        |d| DAY_NAMES.get(*d).copied().unwrap_or("Unknown").to_string(),
    )
}

/// Hour-of-day buckets (UTC), keyed `HH:00`.
pub fn by_hour(trades: &[CanonicalTrade]) -> Vec<BucketStats> {
    group(trades, |t| t.datetime.hour(), |h| format!("{:02}:00", h))
}

/// Calendar month buckets, keyed `YYYY-MM`.
pub fn by_month(trades: &[CanonicalTrade]) -> Vec<BucketStats> {
    group(
        trades,
        |t| (t.datetime.year(), t.datetime.month()),
        |(y, m)| format!("{:04}-{:02}", y, m),
    )
}

/// Per-symbol buckets, alphabetical.
pub fn by_symbol(trades: &[CanonicalTrade]) -> Vec<BucketStats> {
    group(trades, |t| t.symbol.to_uppercase(), |s| s.clone())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::trade;

    #[test]
    fn test_day_of_week_order() {
        // 2024-01-15 is a Monday, 2024-01-17 a Wednesday.
        let trades = vec![
            trade("AAPL", 17, 10, 5.0),
            trade("AAPL", 15, 10, -5.0),
            trade("AAPL", 15, 11, 15.0),
        ];
        let days = by_day_of_week(&trades);
        assert_eq!(days.len(), 2);
        assert_eq!(days[0].key, "Monday");
        assert_eq!(days[0].trades, 2);
        assert_eq!(days[0].pnl, 10.0);
        assert_eq!(days[0].win_rate, 50.0);
        assert_eq!(days[1].key, "Wednesday");
    }

    #[test]
    fn test_hour_month_symbol_buckets() {
        let trades = vec![
            trade("msft", 15, 9, 1.0),
            trade("AAPL", 16, 9, 2.0),
            trade("AAPL", 16, 14, -3.0),
        ];

        let hours = by_hour(&trades);
        assert_eq!(hours[0].key, "09:00");
        assert_eq!(hours[0].trades, 2);
        assert_eq!(hours[1].key, "14:00");

        let months = by_month(&trades);
        assert_eq!(months.len(), 1);
        assert_eq!(months[0].key, "2024-01");
        assert_eq!(months[0].pnl, 0.0);

        let symbols = by_symbol(&trades);
        assert_eq!(symbols[0].key, "AAPL");
        assert_eq!(symbols[0].wins, 1);
        assert_eq!(symbols[1].key, "MSFT");
    }
}
