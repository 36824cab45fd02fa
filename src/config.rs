use std::path::Path;
use std::str::FromStr;

use anyhow::{bail, Context, Result};
use clap::ValueEnum;
use serde::Deserialize;

use crate::data::model::ChannelSpec;
use crate::error::AnalysisError;

// ---------------------------------------------------------------------------
// Built-in layouts of the echo benchmark dumps
// ---------------------------------------------------------------------------

/// Column conventions of the tables the echo benchmark writes.
#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Layout {
    /// core, client send, server recv, server send, client recv
    #[default]
    RoundTrip,
    /// core, send, recv
    PerCore,
    /// core, measured latency
    ClientValue,
}

impl Layout {
    pub fn channels(self) -> Vec<ChannelSpec> {
        match self {
            Layout::RoundTrip => vec![
                ChannelSpec::delta("client", 1, 4),
                ChannelSpec::delta("server", 2, 3).unchecked(),
            ],
            Layout::PerCore => vec![ChannelSpec::delta("latency", 1, 2).with_id(0)],
            Layout::ClientValue => vec![ChannelSpec::value("latency", 1)],
        }
    }
}

// ---------------------------------------------------------------------------
// JSON layout file
// ---------------------------------------------------------------------------

/// Layout file schema:
///
/// ```json
/// {
///   "channels": [
///     { "name": "client", "cause": 1, "effect": 4 },
///     { "name": "server", "cause": 2, "effect": 3, "causal": false },
///     { "name": "raw",    "effect": 1, "id": 0 }
///   ]
/// }
/// ```
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LayoutFile {
    pub channels: Vec<ChannelSpec>,
}

pub fn load_layout(path: &Path) -> Result<Vec<ChannelSpec>> {
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("reading layout file {}", path.display()))?;
    let layout: LayoutFile = serde_json::from_str(&text)
        .with_context(|| format!("parsing layout file {}", path.display()))?;
    Ok(layout.channels)
}

/// Pick the channel list: explicit `--channel` flags win over a layout file,
/// which wins over the preset.
pub fn resolve_channels(
    preset: Layout,
    layout_file: Option<&Path>,
    explicit: &[ChannelSpec],
) -> Result<Vec<ChannelSpec>> {
    let specs = if !explicit.is_empty() {
        explicit.to_vec()
    } else if let Some(path) = layout_file {
        load_layout(path)?
    } else {
        preset.channels()
    };

    if specs.is_empty() {
        bail!("no channels configured");
    }
    for (i, spec) in specs.iter().enumerate() {
        if specs[..i].iter().any(|other| other.name == spec.name) {
            bail!("channel '{}' is defined twice", spec.name);
        }
    }

    log::info!(
        "Channels: {}",
        specs.iter().map(|s| s.name.as_str()).collect::<Vec<_>>().join(", ")
    );
    Ok(specs)
}

// ---------------------------------------------------------------------------
// `--channel NAME=CAUSE:EFFECT[@ID]`
// ---------------------------------------------------------------------------

impl FromStr for ChannelSpec {
    type Err = AnalysisError;

    /// `client=1:4`, `core=1:2@0`, or `raw=:1` for a value channel.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || AnalysisError::InvalidChannel(s.to_string());

        let (name, columns) = s.split_once('=').ok_or_else(invalid)?;
        let name = name.trim();
        if name.is_empty() {
            return Err(invalid());
        }

        let (pair, id) = match columns.split_once('@') {
            Some((pair, id)) => (pair, Some(id)),
            None => (columns, None),
        };
        let (cause, effect) = pair.split_once(':').ok_or_else(invalid)?;

        let index = |tok: &str| tok.trim().parse::<usize>().map_err(|_| invalid());
        let effect = index(effect)?;
        let mut spec = match cause.trim() {
            "" => ChannelSpec::value(name, effect),
            cause => ChannelSpec::delta(name, index(cause)?, effect),
        };
        if let Some(id) = id {
            spec = spec.with_id(index(id)?);
        }
        Ok(spec)
    }
}
