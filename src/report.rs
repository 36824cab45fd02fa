use std::fmt::Write as _;

use serde::Serialize;

use crate::data::anomaly::detect;
use crate::data::extract::extract_all;
use crate::data::model::{AnomalyRecord, ChannelSpec, RawTable};
use crate::error::Result;
use crate::stats::{summarize, summarize_values, AnomalyPolicy, StatSummary};

/// Column labels of the summary table, in [`StatSummary::columns`] order.
pub const HEADERS: [&str; 7] = ["Average", "5%", "25%", "50%", "99%", "99.9%", "Max."];

const CELL_WIDTH: usize = 8;

// ---------------------------------------------------------------------------
// Report – the complete result of one pipeline run
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NamedSummary {
    pub channel: String,
    #[serde(flatten)]
    pub stats: StatSummary,
}

/// Anomalies and per-channel statistics for one input table.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Report {
    pub rows: usize,
    pub policy: AnomalyPolicy,
    pub anomalies: Vec<AnomalyRecord>,
    pub summaries: Vec<NamedSummary>,
}

/// Run extraction, anomaly detection and summarising over `table`.
///
/// Every spec is validated before anything is computed, so either all
/// channels are reported or none.
pub fn analyse(table: &RawTable, specs: &[ChannelSpec], policy: AnomalyPolicy) -> Result<Report> {
    let channels = extract_all(table, specs)?;

    let mut anomalies = Vec::new();
    let mut summaries = Vec::with_capacity(channels.len());

    for (channel, spec) in channels.iter().zip(specs) {
        let before = anomalies.len();
        anomalies.extend(detect(table, channel, spec));
        let found = anomalies.len() - before;
        if found > 0 {
            log::warn!(
                "Channel '{}': {found} of {} samples have effect before cause",
                channel.name,
                channel.len()
            );
        }

        let stats = match policy {
            AnomalyPolicy::Exclude if spec.is_checked() => {
                let kept: Vec<f64> = channel.values.iter().copied().filter(|v| *v >= 0.0).collect();
                summarize_values(&channel.name, &kept)?
            }
            _ => summarize(channel)?,
        };
        log::debug!("Channel '{}': {stats:?}", channel.name);

        summaries.push(NamedSummary {
            channel: channel.name.clone(),
            stats,
        });
    }

    // channels were scanned one after another; interleave them by row,
    // keeping channel order within a row
    anomalies.sort_by_key(|a| a.row);

    Ok(Report {
        rows: table.len(),
        policy,
        anomalies,
        summaries,
    })
}

impl Report {
    /// Anomaly lines followed by the summary table.  With `labels`, each
    /// anomaly line is prefixed by its channel name.
    pub fn render_text(&self, labels: bool) -> String {
        let mut out = String::new();
        for anomaly in &self.anomalies {
            if labels {
                let _ = write!(out, "{}: ", anomaly.channel);
            }
            let _ = writeln!(out, "{anomaly}");
        }
        out.push_str(&render(&self.summaries, labels));
        out
    }
}

// ---------------------------------------------------------------------------
// Table rendering
// ---------------------------------------------------------------------------

/// Header line plus one line per channel, cells right-justified to eight
/// characters and tab-separated, values with two decimals.
///
/// With `labels`, a left-justified channel-name column comes first.
pub fn render(summaries: &[NamedSummary], labels: bool) -> String {
    let name_width = summaries
        .iter()
        .map(|s| s.channel.len())
        .chain(["Channel".len()])
        .max()
        .unwrap_or(0);

    let mut out = String::new();

    let mut header: Vec<String> = HEADERS.iter().map(|h| format!("{h:>CELL_WIDTH$}")).collect();
    if labels {
        header.insert(0, format!("{:<name_width$}", "Channel"));
    }
    let _ = writeln!(out, "{}", header.join("\t"));

    for summary in summaries {
        let mut cells: Vec<String> = summary
            .stats
            .columns()
            .iter()
            .map(|v| format!("{v:>CELL_WIDTH$.2}"))
            .collect();
        if labels {
            cells.insert(0, format!("{:<name_width$}", summary.channel));
        }
        let _ = writeln!(out, "{}", cells.join("\t"));
    }

    out
}
