//! Gateway domain - asynchronous session-scoped query execution contracts

mod query;
mod queue;
mod session;
mod sink;

pub use query::{GatewayQuery, QueryKind};
pub use queue::{ExecutionQueue, RunRequest, MAIN_LANE};
pub use session::{AnalyticsSessionKeyResolver, SessionKeyResolver};
pub use sink::{QueryResultMessage, ResultSink};

#[cfg(test)]
pub use queue::mock as queue_mock;
#[cfg(test)]
pub use sink::mock as sink_mock;
