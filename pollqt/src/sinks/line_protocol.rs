use std::fmt::Write as _;

use async_trait::async_trait;
use pollqt_core::{OutputSink, PollError, Snapshot};
use rust_decimal::Decimal;
use tokio::io::{AsyncWrite, AsyncWriteExt};
use tokio::sync::Mutex;

const NAME: &str = "line-protocol";

/// Writes Influx line protocol to any async writer: one `balance` line per snapshot
/// and one `position` line per position, timestamps in nanoseconds.
pub struct LineProtocolSink<W> {
    out: Mutex<W>,
}

impl LineProtocolSink<tokio::io::Stdout> {
    /// Sink writing to standard output.
    #[must_use]
    pub fn stdout() -> Self {
        Self::new(tokio::io::stdout())
    }
}

impl<W> LineProtocolSink<W> {
    /// Sink writing to `out`.
    pub fn new(out: W) -> Self {
        Self {
            out: Mutex::new(out),
        }
    }

    /// Give back the writer.
    pub fn into_inner(self) -> W {
        self.out.into_inner()
    }
}

fn escape_tag(v: &str) -> String {
    let mut out = String::with_capacity(v.len());
    for c in v.chars() {
        if matches!(c, ',' | '=' | ' ') {
            out.push('\\');
        }
        out.push(c);
    }
    out
}

fn push_fields(line: &mut String, fields: &[(&str, Option<Decimal>)]) -> bool {
    let mut first = true;
    for (key, value) in fields {
        let Some(value) = value else { continue };
        line.push(if first { ' ' } else { ',' });
        let _ = write!(line, "{key}={value}");
        first = false;
    }
    !first
}

/// Render the line protocol for one snapshot. Measurements whose fields are all
/// absent are skipped.
#[must_use]
pub fn format_snapshot(snapshot: &Snapshot) -> String {
    let account = escape_tag(&format!(
        "{}-{}",
        snapshot.account.kind, snapshot.account.number
    ));
    let ts = snapshot
        .timestamp
        .timestamp_nanos_opt()
        .unwrap_or_else(|| snapshot.timestamp.timestamp_millis().saturating_mul(1_000_000));

    let mut out = String::new();
    let b = &snapshot.balance;
    let mut line = format!(
        "balance,account={account},currency={}",
        escape_tag(&b.currency)
    );
    if push_fields(
        &mut line,
        &[
            ("value", b.total_equity),
            ("cash", b.cash),
            ("market_value", b.market_value),
        ],
    ) {
        let _ = writeln!(out, "{line} {ts}");
    }

    for p in &snapshot.positions {
        let mut line = format!(
            "position,account={account},symbol={}",
            escape_tag(&p.symbol)
        );
        if push_fields(
            &mut line,
            &[
                ("open_quantity", p.open_quantity),
                ("current_market_value", p.current_market_value),
                ("current_price", p.current_price),
                ("total_cost", p.total_cost),
            ],
        ) {
            let _ = writeln!(out, "{line} {ts}");
        }
    }
    out
}

#[async_trait]
impl<W> OutputSink for LineProtocolSink<W>
where
    W: AsyncWrite + Unpin + Send + 'static,
{
    fn name(&self) -> &'static str {
        NAME
    }

    async fn on_event(&self, snapshots: &[Snapshot]) -> Result<(), PollError> {
        let text: String = snapshots.iter().map(format_snapshot).collect();
        let mut out = self.out.lock().await;
        out.write_all(text.as_bytes())
            .await
            .map_err(|e| PollError::sink(NAME, e.to_string()))?;
        out.flush()
            .await
            .map_err(|e| PollError::sink(NAME, e.to_string()))
    }
}
