//! Concurrent batch computation with a shared deadline

use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tokio::sync::Semaphore;
use tokio::time::{timeout_at, Instant};
use tracing::{info, warn};

use super::{Cancellation, ChartService};
use crate::error::{ChartError, ErrorDescriptor, ErrorKind};
use crate::models::{AnalyzedChart, BatchRequest, ChartRequest};

/// Outcome of one batch item
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum BatchSlot {
    Ok { chart: Arc<AnalyzedChart> },
    Error { error: ErrorDescriptor },
}

impl BatchSlot {
    pub fn is_ok(&self) -> bool {
        matches!(self, BatchSlot::Ok { .. })
    }

    fn failed(error: ChartError) -> Self {
        BatchSlot::Error {
            error: error.descriptor(),
        }
    }
}

/// Results in input order plus a summary
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BatchReport {
    pub results: Vec<BatchSlot>,
    pub succeeded: usize,
    pub failed: usize,
    pub timed_out: usize,
    pub elapsed_ms: u64,
}

fn batch_timeout(requested: Option<f64>, default: Duration) -> Result<Duration, ChartError> {
    match requested {
        None => Ok(default),
        Some(seconds) if seconds.is_finite() && seconds > 0.0 => {
            Duration::try_from_secs_f64(seconds)
                .map_err(|e| ChartError::invalid(format!("Invalid timeout: {}", e)))
        }
        Some(seconds) => Err(ChartError::invalid(format!(
            "timeout_seconds must be positive, got {}",
            seconds
        ))),
    }
}

/// Compute every chart of a batch on the blocking pool, at most
/// `worker_pool_size` at a time. Item failures stay in their slot; items still
/// running at the deadline are cancelled and reported as timed out.
pub async fn calculate_batch(
    service: Arc<ChartService>,
    batch: BatchRequest,
) -> Result<BatchReport, ChartError> {
    let settings = service.settings();
    let max = settings.max_batch_size;
    if batch.requests.len() > max {
        return Err(ChartError::BatchTooLarge {
            size: batch.requests.len(),
            max,
        });
    }
    let timeout = batch_timeout(batch.timeout_seconds, settings.batch_timeout)?;
    let workers = settings.worker_pool_size.max(1);

    let started = Instant::now();
    let deadline = started + timeout;
    let cancel = Cancellation::with_deadline(deadline.into_std());
    let permits = Arc::new(Semaphore::new(workers));
    let shared = batch.shared_settings.unwrap_or_default();

    info!(
        "Starting batch of {} charts ({} workers, timeout {:?})",
        batch.requests.len(),
        workers,
        timeout
    );

    let handles: Vec<_> = batch
        .requests
        .into_iter()
        .map(|request| {
            let request: ChartRequest = request.with_shared(&shared);
            let service = service.clone();
            let permits = permits.clone();
            let cancel = cancel.clone();
            tokio::spawn(async move {
                let _permit = permits
                    .acquire_owned()
                    .await
                    .map_err(|e| ChartError::Internal(format!("Worker pool closed: {}", e)))?;
                cancel.check()?;
                tokio::task::spawn_blocking(move || service.calculate_chart(&request, &cancel))
                    .await
                    .map_err(|e| ChartError::Internal(format!("Batch worker failed: {}", e)))?
            })
        })
        .collect();

    let mut results = Vec::with_capacity(handles.len());
    for mut handle in handles {
        let slot = match timeout_at(deadline, &mut handle).await {
            Ok(Ok(Ok(chart))) => BatchSlot::Ok { chart },
            Ok(Ok(Err(error))) => BatchSlot::failed(error),
            Ok(Err(join_error)) => {
                warn!("Batch item panicked: {}", join_error);
                BatchSlot::failed(ChartError::Internal(format!(
                    "Batch worker failed: {}",
                    join_error
                )))
            }
            Err(_) => {
                cancel.cancel();
                handle.abort();
                BatchSlot::failed(ChartError::TimedOut(format!(
                    "Batch deadline of {:?} reached",
                    timeout
                )))
            }
        };
        results.push(slot);
    }

    let succeeded = results.iter().filter(|slot| slot.is_ok()).count();
    let timed_out = results
        .iter()
        .filter(|slot| {
            matches!(slot, BatchSlot::Error { error } if error.kind == ErrorKind::TimedOut)
        })
        .count();
    let failed = results.len() - succeeded;
    let elapsed_ms = started.elapsed().as_millis() as u64;

    info!(
        "Batch finished: {} ok, {} failed ({} timed out) in {} ms",
        succeeded, failed, timed_out, elapsed_ms
    );

    Ok(BatchReport {
        results,
        succeeded,
        failed,
        timed_out,
        elapsed_ms,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Settings;
    use crate::ephemeris::synthetic::{SyntheticEphemeris, EPOCH};
    use crate::models::{Body, SharedChartSettings};
    use crate::service::tests::natal_request;

    fn request_at(datetime: &str) -> ChartRequest {
        let mut request = natal_request();
        request.datetime = datetime.to_string();
        request
    }

    fn batch(requests: Vec<ChartRequest>) -> BatchRequest {
        BatchRequest {
            requests,
            shared_settings: None,
            timeout_seconds: None,
        }
    }

    #[tokio::test]
    async fn test_invalid_item_is_isolated() {
        let service = Arc::new(ChartService::new(
            Arc::new(SyntheticEphemeris::new()),
            Settings::default(),
        ));
        let requests = vec![
            request_at("2000-01-01T12:00:00Z"),
            request_at("1990-05-15T14:30:00Z"),
            request_at("not a timestamp"),
            request_at("1985-11-02T08:00:00Z"),
        ];

        let report = calculate_batch(service, batch(requests)).await.unwrap();

        assert_eq!(report.results.len(), 4);
        assert_eq!(report.succeeded, 3);
        assert_eq!(report.failed, 1);
        match &report.results[2] {
            BatchSlot::Error { error } => assert_eq!(error.kind, ErrorKind::InputValidation),
            other => panic!("expected an error slot, got {:?}", other),
        }
        match &report.results[1] {
            BatchSlot::Ok { chart } => assert_eq!(
                chart.chart.metadata.datetime.format("%Y").to_string(),
                "1990"
            ),
            other => panic!("expected a chart, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_results_keep_input_order_when_first_finishes_last() {
        // Only the 1985 chart is slow
        let ephemeris = SyntheticEphemeris::new()
            .with_delay_before(EPOCH - 5000.0, Duration::from_millis(20));
        let settings = Settings {
            worker_pool_size: 4,
            ..Settings::default()
        };
        let service = Arc::new(ChartService::new(Arc::new(ephemeris), settings));
        let years = ["1985", "1990", "2000", "2010"];
        let requests = years
            .iter()
            .map(|year| request_at(&format!("{}-11-02T08:00:00Z", year)))
            .collect();

        let report = calculate_batch(service, batch(requests)).await.unwrap();

        assert_eq!(report.succeeded, 4);
        for (slot, year) in report.results.iter().zip(years) {
            let BatchSlot::Ok { chart } = slot else {
                panic!("expected a chart for {}", year);
            };
            assert_eq!(chart.chart.metadata.datetime.format("%Y").to_string(), year);
        }
    }

    #[tokio::test]
    async fn test_oversized_batch_is_rejected_before_work() {
        let ephemeris = Arc::new(SyntheticEphemeris::new());
        let settings = Settings {
            max_batch_size: 2,
            ..Settings::default()
        };
        let service = Arc::new(ChartService::new(ephemeris.clone(), settings));
        let requests = vec![natal_request(), natal_request(), natal_request()];

        let result = calculate_batch(service, batch(requests)).await;

        assert!(matches!(
            result,
            Err(ChartError::BatchTooLarge { size: 3, max: 2 })
        ));
        assert_eq!(ephemeris.calls(), 0);
    }

    #[tokio::test]
    async fn test_shared_settings_apply() {
        let service = Arc::new(ChartService::new(
            Arc::new(SyntheticEphemeris::new()),
            Settings::default(),
        ));
        let mut request = batch(vec![natal_request()]);
        request.shared_settings = Some(SharedChartSettings {
            include_objects: Some(vec!["chiron".to_string()]),
            ..Default::default()
        });

        let report = calculate_batch(service, request).await.unwrap();
        let BatchSlot::Ok { chart } = &report.results[0] else {
            panic!("expected a chart");
        };
        assert!(chart.chart.object(Body::Chiron).is_some());
    }

    #[tokio::test]
    async fn test_timeout_keeps_completed_results() {
        let slow = SyntheticEphemeris::new().with_delay(Duration::from_millis(50));
        let service = Arc::new(ChartService::new(Arc::new(slow), Settings::default()));

        // Warm the cache so the first item needs no ephemeris work
        let warm = service.clone();
        tokio::task::spawn_blocking(move || {
            warm.calculate_chart(&natal_request(), &Cancellation::none())
        })
        .await
        .unwrap()
        .unwrap();

        let mut request = batch(vec![natal_request(), request_at("1990-05-15T14:30:00Z")]);
        request.timeout_seconds = Some(0.2);

        let report = calculate_batch(service, request).await.unwrap();

        assert!(report.results[0].is_ok());
        match &report.results[1] {
            BatchSlot::Error { error } => assert_eq!(error.kind, ErrorKind::TimedOut),
            other => panic!("expected a timeout, got {:?}", other),
        }
        assert_eq!(report.timed_out, 1);
    }

    #[tokio::test]
    async fn test_non_positive_timeout_is_rejected() {
        let service = Arc::new(ChartService::new(
            Arc::new(SyntheticEphemeris::new()),
            Settings::default(),
        ));
        let mut request = batch(vec![natal_request()]);
        request.timeout_seconds = Some(0.0);

        assert!(matches!(
            calculate_batch(service, request).await,
            Err(ChartError::InputValidation(_))
        ));
    }
}
