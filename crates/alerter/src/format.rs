//! Renders events as Telegram MarkdownV2 text.
//!
//! Free text is escaped with [`escape_markdown`]; numbers are placed in code
//! spans, where only backticks and backslashes are special.

use core_types::OrderSide;
use events::{Failure, SignalAlert, TradeExecuted};
use rust_decimal::Decimal;

/// Error details longer than this are cut before they reach the chat.
pub const MAX_ERROR_DETAIL: usize = 160;

/// Telegram rejects messages longer than this.
pub const MAX_MESSAGE_LEN: usize = 4096;

/// A helper function to escape characters that have special meaning in Telegram's MarkdownV2.
pub fn escape_markdown(text: &str) -> String {
    let special_chars = r"\_*[]()~`>#+-=|{}.!";
    text.chars().fold(String::with_capacity(text.len()), |mut out, c| {
        if special_chars.contains(c) {
            out.push('\\');
        }
        out.push(c);
        out
    })
}

/// Reduces an error to its first line and caps its length.
pub fn summarize_error(message: &str) -> String {
    let first_line = message.lines().next().unwrap_or_default().trim();
    if first_line.chars().count() <= MAX_ERROR_DETAIL {
        return first_line.to_string();
    }
    let mut short: String = first_line.chars().take(MAX_ERROR_DETAIL).collect();
    short.push('…');
    short
}

fn amount(value: Decimal) -> String {
    format!("{:.2}", value.round_dp(2))
}

fn signed(value: Decimal) -> String {
    let text = amount(value);
    if value > Decimal::ZERO { format!("+{text}") } else { text }
}

/// One message per instrument, listing every signal that fired this tick.
pub fn format_signal_alert(alert: &SignalAlert) -> String {
    let icon = alert.signals.first().map(|s| s.kind.icon()).unwrap_or("🔔");
    let mut lines = Vec::with_capacity(alert.signals.len() + 2);

    let mut header = format!(
        "{} *{}* `{}`",
        icon,
        escape_markdown(&alert.instrument.symbol),
        alert.price
    );
    if let Some(change) = alert.change_pct {
        header.push_str(&format!(" \\(`{}%`\\)", signed(change)));
    }
    lines.push(header);

    for signal in &alert.signals {
        lines.push(format!(
            "• *{}*: {}",
            escape_markdown(signal.kind.label()),
            escape_markdown(&signal.reason)
        ));
    }

    let mut indicators = Vec::new();
    if let Some(rsi) = alert.indicators.rsi {
        indicators.push(format!("RSI `{}`", amount(rsi)));
    }
    if let (Some(rs), Some(ema)) = (
        alert.indicators.relative_strength,
        alert.indicators.relative_strength_ema,
    ) {
        indicators.push(format!("RS `{:.4}` EMA `{:.4}`", rs, ema));
    }
    if !indicators.is_empty() {
        lines.push(indicators.join(" \\| "));
    }

    truncate_message(lines.join("\n"))
}

/// Confirmation for a simulated trade; sells include realised profit/loss.
pub fn format_trade_confirmation(trade: &TradeExecuted) -> String {
    let tx = &trade.transaction;
    let (icon, title) = match tx.side {
        OrderSide::Buy => ("🟢", "PAPER BUY"),
        OrderSide::Sell => ("🔴", "PAPER SELL"),
    };
    let mut lines = vec![
        format!("{} *{} {}*", icon, title, escape_markdown(&tx.symbol)),
        format!("`{:.4}` units @ `{}`", tx.quantity, tx.price),
    ];
    if let Some(pnl) = trade.profit_loss {
        lines.push(format!(
            "P/L `{}` \\(`{}%`\\)",
            signed(pnl.amount),
            signed(pnl.percent)
        ));
    }
    lines.push(format!("Cash `{}`", amount(trade.cash_balance)));
    lines.push(format!("_{}_", escape_markdown(&tx.reason)));
    truncate_message(lines.join("\n"))
}

/// A short, escaped summary of an isolated failure.
pub fn format_failure(failure: &Failure) -> String {
    let subject = failure
        .instrument
        .as_ref()
        .map(|i| format!(" {}", escape_markdown(&i.symbol)))
        .unwrap_or_default();
    format!(
        "⚠️ *ERROR*{} \\[{}\\]: {}",
        subject,
        failure.stage,
        escape_markdown(&summarize_error(&failure.message))
    )
}

fn truncate_message(message: String) -> String {
    if message.chars().count() <= MAX_MESSAGE_LEN {
        return message;
    }
    let mut cut: String = message.chars().take(MAX_MESSAGE_LEN - 1).collect();
    // Never leave a dangling escape character at the end.
    while cut.ends_with('\\') {
        cut.pop();
    }
    cut.push('…');
    cut
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use core_types::{Instrument, Transaction};
    use events::{FiredSignal, IndicatorSnapshot, ProfitLoss, SignalKind, Stage};
    use rust_decimal_macros::dec;

    #[test]
    fn escapes_markdown_specials() {
        assert_eq!(escape_markdown("BRK.B (class-b)!"), "BRK\\.B \\(class\\-b\\)\\!");
        assert_eq!(escape_markdown("plain"), "plain");
    }

    #[test]
    fn long_errors_are_cut() {
        let long = "x".repeat(500);
        let summary = summarize_error(&long);
        assert_eq!(summary.chars().count(), MAX_ERROR_DETAIL + 1);
        assert!(summary.ends_with('…'));
        assert_eq!(summarize_error("first line\nstack frame 1\nstack frame 2"), "first line");
    }

    #[test]
    fn signal_alert_lists_every_signal_and_indicator() {
        let alert = SignalAlert {
            timestamp: Utc::now(),
            instrument: Instrument::equity("AAPL"),
            price: dec!(95.5),
            change_pct: Some(dec!(-1.234)),
            signals: vec![
                FiredSignal {
                    kind: SignalKind::TargetBuy,
                    reason: "price 95.5 at or below buy target 100".to_string(),
                },
                FiredSignal {
                    kind: SignalKind::RsiOversold,
                    reason: "RSI 25.00 at or below 30".to_string(),
                },
            ],
            indicators: IndicatorSnapshot {
                rsi: Some(dec!(25)),
                relative_strength: Some(0.95),
                relative_strength_ema: Some(0.97),
            },
        };

        let text = format_signal_alert(&alert);
        assert!(text.starts_with("📈 *AAPL* `95.5` \\(`-1.23%`\\)"));
        assert!(text.contains("• *BUY TARGET*: price 95\\.5 at or below buy target 100"));
        assert!(text.contains("• *RSI OVERSOLD*"));
        assert!(text.contains("RSI `25.00` \\| RS `0.9500` EMA `0.9700`"));
    }

    #[test]
    fn sell_confirmation_includes_profit() {
        let trade = TradeExecuted {
            transaction: Transaction::new(
                &Instrument::equity("AAPL"),
                OrderSide::Sell,
                dec!(1),
                dec!(220),
                Utc::now(),
                "sell target reached",
            ),
            cash_balance: dec!(100020),
            profit_loss: Some(ProfitLoss { amount: dec!(20), percent: dec!(10) }),
        };
        let text = format_trade_confirmation(&trade);
        assert!(text.starts_with("🔴 *PAPER SELL AAPL*"));
        assert!(text.contains("P/L `+20.00` \\(`+10.00%`\\)"));
        assert!(text.contains("Cash `100020.00`"));
    }

    #[test]
    fn failure_is_escaped_and_short() {
        let failure = Failure::new(
            Some(Instrument::crypto("ETH")),
            Stage::Simulation,
            format!("insufficient cash.\n{}", "detail ".repeat(100)),
        );
        assert_eq!(
            format_failure(&failure),
            "⚠️ *ERROR* ETH \\[simulation\\]: insufficient cash\\."
        );
    }
}
