//! Query runner domain - execution adapters bound to one data source

mod contract;

pub use contract::{QueryRunner, QueryRunnerFactory, RunOptions};

#[cfg(test)]
pub use contract::mock;
