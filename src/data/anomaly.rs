use super::model::{AnomalyRecord, Channel, ChannelSpec, RawTable};

// ---------------------------------------------------------------------------
// Anomaly scan: rows where the effect precedes the cause
// ---------------------------------------------------------------------------

/// Lazy scan over a channel yielding one [`AnomalyRecord`] per negative sample.
///
/// A clone taken before consuming replays the same scan from that point, and
/// calling [`detect`] again starts over from row 0.  The whole channel is
/// always walked.
#[derive(Debug, Clone)]
pub struct Anomalies<'a> {
    table: &'a RawTable,
    channel: &'a Channel,
    spec: &'a ChannelSpec,
    next_row: usize,
}

/// Scan `channel` (derived from `table` with `spec`) for causality violations.
///
/// Channels that are not causally ordered (value channels, or specs marked
/// unchecked) yield nothing.
pub fn detect<'a>(
    table: &'a RawTable,
    channel: &'a Channel,
    spec: &'a ChannelSpec,
) -> Anomalies<'a> {
    debug_assert_eq!(table.len(), channel.len());
    Anomalies {
        table,
        channel,
        spec,
        next_row: 0,
    }
}

impl Iterator for Anomalies<'_> {
    type Item = AnomalyRecord;

    fn next(&mut self) -> Option<AnomalyRecord> {
        let cause_col = self.spec.cause.filter(|_| self.spec.causal)?;
        let end = self.channel.len().min(self.table.len());

        while self.next_row < end {
            let row = self.next_row;
            self.next_row += 1;

            if self.channel.values[row] < 0.0 {
                return Some(AnomalyRecord {
                    channel: self.channel.name.clone(),
                    row,
                    cause: self.table.value(row, cause_col),
                    effect: self.table.value(row, self.spec.effect),
                    id: self.spec.id.map(|col| self.table.value(row, col)),
                });
            }
        }
        None
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let remaining = self.channel.len().saturating_sub(self.next_row);
        (0, Some(remaining))
    }
}
