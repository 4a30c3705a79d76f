//! Git operation metrics.

use std::future::Future;
use std::time::Instant;

use metrics::{counter, histogram};

use tandem_core::Result;

pub const OPERATIONS_TOTAL: &str = "tandem_git_operations_total";
pub const OPERATION_DURATION: &str = "tandem_git_operation_duration_seconds";

/// Registra las metricas de operaciones git.
/// Llamar una vez al inicio, antes de instalar el recorder.
pub fn register_metrics() {
    metrics::describe_counter!(
        OPERATIONS_TOTAL,
        "Total number of git operations by outcome"
    );
    metrics::describe_histogram!(
        OPERATION_DURATION,
        "Git operation duration in seconds"
    );
}

/// Label recorded for a finished operation.
pub fn outcome_label<T>(result: &Result<T>) -> &'static str {
    match result {
        Ok(_) => "success",
        Err(e) => e.kind(),
    }
}

/// Runs `operation`, recording its outcome and duration.
pub async fn observe<T, F>(operation: &'static str, future: F) -> Result<T>
where
    F: Future<Output = Result<T>>,
{
    let start = Instant::now();
    let result = future.await;

    counter!(
        OPERATIONS_TOTAL,
        "operation" => operation,
        "outcome" => outcome_label(&result)
    )
    .increment(1);

    histogram!(OPERATION_DURATION, "operation" => operation)
        .record(start.elapsed().as_secs_f64());

    result
}
