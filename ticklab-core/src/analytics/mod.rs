//! Outcome analytics: bucketed feature statistics over closed positions.

pub mod aggregator;
pub mod bucket;

pub use aggregator::{
    AnalyticsConfig, AnalyticsSummary, Aggregator, DebugRecord, DEFAULT_OUTLIER_CEILING,
};
pub use bucket::{BucketCounter, BucketStat};
