//! Analytical query executors
//!
//! Pure functions of (request, snapshot): filtering, grouped reductions,
//! baseline comparisons, and insight generation, plus an optional
//! memoization side-table. Nothing here performs I/O or mutates shared
//! state, so repeated calls with the same inputs are idempotent.

pub mod aggregation;
pub mod cache;
pub mod comparison;
pub mod filter;
pub mod history;
pub mod insight;

pub use aggregation::{AggregateOp, AggregationExecutor, AggregationRequest, AggregationResult};
pub use cache::QueryCache;
pub use comparison::{ComparisonExecutor, ComparisonRequest, ComparisonResult, ComparisonTarget};
pub use filter::{GroupKey, MerchantFilter, TimeRange};
pub use history::{BaselineWindow, HistoryProvider, SimulatedHistory};
