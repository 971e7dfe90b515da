//! The partitioning-function capability.

use async_trait::async_trait;
use quiver_sql::Value;

use super::cursor::{Cursor, Destination};
use super::error::RouteError;

/// A single-column partitioning function mapping column values to routing
/// destinations. Lookup-backed vindexes may consult the cursor.
#[async_trait]
pub trait Vindex: Send + Sync {
    fn name(&self) -> &str;

    /// Maps each value to a destination, aligned with the input.
    async fn map(
        &self,
        cursor: &dyn Cursor,
        values: &[Value],
    ) -> Result<Vec<Destination>, RouteError>;
}
