pub mod breakdown;

pub use breakdown::{by_day_of_week, by_hour, by_month, by_symbol};

use journal_core::{CanonicalTrade, EquityPoint, Metrics};

/// Profit factor reported when there are winners but no losing trades.
/// A set of only break-even trades reports 0.
pub const PROFIT_FACTOR_SENTINEL: f64 = 999.99;

/// Compute aggregate statistics for a trade list.
///
/// The list is not re-sorted: equity curve, drawdown and streaks follow
/// input order, so callers sort by datetime first when they want
/// chronological semantics. Every ratio guards its denominator, so the
/// result never holds NaN or infinity.
pub fn calculate_metrics(trades: &[CanonicalTrade]) -> Metrics {
    let total_trades = trades.len();
    if total_trades == 0 {
        return Metrics::default();
    }

    let wins: Vec<f64> = trades.iter().map(|t| t.pnl).filter(|p| *p > 0.0).collect();
    let losses: Vec<f64> = trades.iter().map(|t| t.pnl).filter(|p| *p < 0.0).collect();

    let total_pnl: f64 = trades.iter().map(|t| t.pnl).sum();
    let gross_profit: f64 = wins.iter().sum();
    let gross_loss: f64 = losses.iter().sum::<f64>().abs();

    let win_rate = wins.len() as f64 / total_trades as f64 * 100.0;

    let profit_factor = if gross_loss > 0.0 {
        gross_profit / gross_loss
    } else if gross_profit > 0.0 {
        PROFIT_FACTOR_SENTINEL
    } else {
        0.0
    };

    let avg_win = if !wins.is_empty() {
        gross_profit / wins.len() as f64
    } else {
        0.0
    };

    let avg_loss = if !losses.is_empty() {
        losses.iter().sum::<f64>() / losses.len() as f64
    } else {
        0.0
    };

    // Best and worst trade overall, so an all-losing set has a negative
    // largest_win.
    let largest_win = trades.iter().map(|t| t.pnl).fold(f64::NEG_INFINITY, f64::max);
    let largest_loss = trades.iter().map(|t| t.pnl).fold(f64::INFINITY, f64::min);

    let reward_risk_ratio = if avg_loss != 0.0 {
        avg_win / avg_loss.abs()
    } else {
        0.0
    };

    let (equity_curve, max_drawdown) = equity_and_drawdown(trades);
    let (max_win_streak, max_loss_streak) = streaks(trades);

    Metrics {
        total_trades,
        winning_trades: wins.len(),
        losing_trades: losses.len(),
        total_pnl,
        win_rate,
        profit_factor,
        avg_win,
        avg_loss,
        largest_win,
        largest_loss,
        max_drawdown,
        max_win_streak,
        max_loss_streak,
        expectancy: total_pnl / total_trades as f64,
        reward_risk_ratio,
        equity_curve,
        trades_by_day: by_day_of_week(trades),
        trades_by_symbol: by_symbol(trades),
        hourly_performance: by_hour(trades),
        monthly_performance: by_month(trades),
    }
}

/// Cumulative P&L per trade and the largest decline from a running peak.
/// The peak starts at zero, so an opening loss counts as drawdown.
fn equity_and_drawdown(trades: &[CanonicalTrade]) -> (Vec<EquityPoint>, f64) {
    let mut curve = Vec::with_capacity(trades.len());
    let mut cumulative = 0.0;
    let mut peak = 0.0_f64;
    let mut max_drawdown = 0.0_f64;

    for (index, trade) in trades.iter().enumerate() {
        cumulative += trade.pnl;
        peak = peak.max(cumulative);
        max_drawdown = max_drawdown.max(peak - cumulative);
        curve.push(EquityPoint {
            index,
            cumulative_pnl: cumulative,
        });
    }

    (curve, max_drawdown)
}

/// Longest runs of wins and losses in input order. Break-even trades end
/// both kinds of run.
fn streaks(trades: &[CanonicalTrade]) -> (usize, usize) {
    let (mut max_win, mut max_loss) = (0, 0);
    let (mut win_run, mut loss_run) = (0, 0);

    for trade in trades {
        if trade.pnl > 0.0 {
            win_run += 1;
            loss_run = 0;
        } else if trade.pnl < 0.0 {
            loss_run += 1;
            win_run = 0;
        } else {
            win_run = 0;
            loss_run = 0;
        }
        max_win = max_win.max(win_run);
        max_loss = max_loss.max(loss_run);
    }

    (max_win, max_loss)
}
