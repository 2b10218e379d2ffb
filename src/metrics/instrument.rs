//! Instrumentation boundary around network-bound operations
//!
//! The transaction path hands each operation to an [`Instrument`] as a
//! zero-argument closure. Implementations observe it but never change what it
//! returns.

use crate::error::ReporterResult;

use async_trait::async_trait;
use std::future::Future;
use std::time::Instant;
use tracing::debug;

/// Wraps a single operation for observation.
///
/// `wrap` must invoke `operation` exactly once and hand back its result
/// unchanged.
#[async_trait]
pub trait Instrument: Send + Sync {
    async fn wrap<T, F, Fut>(&self, label: &'static str, operation: F) -> ReporterResult<T>
    where
        T: Send,
        F: FnOnce() -> Fut + Send,
        Fut: Future<Output = ReporterResult<T>> + Send;
}

/// Runs operations without recording anything
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopInstrument;

#[async_trait]
impl Instrument for NoopInstrument {
    async fn wrap<T, F, Fut>(&self, _label: &'static str, operation: F) -> ReporterResult<T>
    where
        T: Send,
        F: FnOnce() -> Fut + Send,
        Fut: Future<Output = ReporterResult<T>> + Send,
    {
        operation().await
    }
}

/// Records wall-clock duration and outcome per label in the Prometheus registry
#[derive(Debug, Clone, Copy, Default)]
pub struct PrometheusInstrument;

#[async_trait]
impl Instrument for PrometheusInstrument {
    async fn wrap<T, F, Fut>(&self, label: &'static str, operation: F) -> ReporterResult<T>
    where
        T: Send,
        F: FnOnce() -> Fut + Send,
        Fut: Future<Output = ReporterResult<T>> + Send,
    {
        let started = Instant::now();
        let result = operation().await;
        let elapsed = started.elapsed().as_secs_f64();

        debug!(operation = label, elapsed_secs = elapsed, ok = result.is_ok(), "Operation finished");
        super::record_operation(label, result.is_ok(), elapsed);

        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ReporterError;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[test]
    fn test_prometheus_instrument_passes_result_through() {
        let calls = AtomicUsize::new(0);
        let result = tokio_test::block_on(PrometheusInstrument.wrap("test_pass_through", || {
            calls.fetch_add(1, Ordering::SeqCst);
            futures::future::ready(Ok::<_, ReporterError>(42u64))
        }));

        assert_eq!(result, Ok(42));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(
            super::super::OPERATION_OUTCOME
                .with_label_values(&["test_pass_through", "success"])
                .get(),
            1.0
        );
    }

    #[tokio::test]
    async fn test_prometheus_instrument_passes_error_through() {
        let err = ReporterError::Send("nonce too low".to_string());
        let expected = err.clone();
        let result: ReporterResult<()> = PrometheusInstrument
            .wrap("test_error_through", move || async move { Err(err) })
            .await;

        assert_eq!(result, Err(expected));
        assert_eq!(
            super::super::OPERATION_OUTCOME
                .with_label_values(&["test_error_through", "failure"])
                .get(),
            1.0
        );
    }

    #[tokio::test]
    async fn test_noop_instrument() {
        let result = NoopInstrument.wrap("noop", || async { Ok("receipt") }).await;
        assert_eq!(result, Ok("receipt"));
    }
}
