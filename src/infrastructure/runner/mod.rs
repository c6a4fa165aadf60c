//! Runner infrastructure - builtin query runners and their registry

mod jdbc;
mod registry;
mod xmla;

pub use jdbc::{JdbcDescriptorRunner, JdbcKind, JdbcOptions};
pub use registry::QueryRunnerRegistry;
pub use xmla::{XmlaRunner, XmlaRunnerOptions};
