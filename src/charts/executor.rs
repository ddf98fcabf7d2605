use std::sync::Arc;
use std::time::Duration;

use crate::aggregate::AggregationPayload;
use crate::charts::program;
use crate::charts::ChartSet;

/// Run a chart program off the async runtime under a wall-clock limit.
///
/// Never fails: errors, panics and timeouts are logged and produce an empty
/// set.
pub async fn execute(source: String, payload: Arc<AggregationPayload>, timeout: Duration) -> ChartSet {
    let task = tokio::task::spawn_blocking(move || program::evaluate(&source, &payload));

    match tokio::time::timeout(timeout, task).await {
        Ok(Ok(Ok(charts))) => {
            log::info!("Chart program produced {} chart(s): {:?}", charts.len(), charts.slots());
            charts
        }
        Ok(Ok(Err(e))) => {
            log::warn!("Chart program failed, continuing without charts: {e}");
            ChartSet::default()
        }
        Ok(Err(e)) => {
            log::error!("Chart program task aborted: {e}");
            ChartSet::default()
        }
        Err(_) => {
            log::warn!("Chart program exceeded {timeout:?}, continuing without charts");
            ChartSet::default()
        }
    }
}
