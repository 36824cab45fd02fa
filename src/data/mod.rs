/// Data layer: table loading, channel derivation and anomaly scanning.
///
/// Architecture:
/// ```text
///  .txt / .csv / .json / .parquet
///        │
///        ▼
///   ┌──────────┐
///   │  loader   │  parse file → RawTable (shape + number checks)
///   └──────────┘
///        │
///        ▼
///   ┌──────────┐
///   │  extract  │  ChannelSpec × RawTable → Channel (effect − cause)
///   └──────────┘
///        │
///        ├──────────────┐
///        ▼              ▼
///   ┌──────────┐   ┌──────────┐
///   │  anomaly  │   │  stats    │  (crate::stats, crate::report)
///   └──────────┘   └──────────┘
/// ```

pub mod anomaly;
pub mod extract;
pub mod loader;
pub mod model;
