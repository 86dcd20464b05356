//! Service test support: a PostgreSQL container, per-test databases and
//! fixtures.

mod context;
mod db;
pub(crate) mod helpers;

pub(crate) use context::TestContext;
