//! Single-flight automation worker.
//!
//! One dedicated thread owns the sole async runtime and the sole
//! [`AutomationSession`]; the driver's handles are never shared. Callers
//! submit operations through a bounded channel of capacity 1 and block on a
//! per-submission reply channel, which turns arbitrarily concurrent callers
//! into a single FIFO timeline of browser operations.
//!
//! A submission that outlives the ceiling yields `WorkerTimeout` to the
//! caller; the in-flight browser call is abandoned, not aborted — the worker
//! finishes it, finds the caller gone, and moves on.

use std::any::Any;
use std::sync::mpsc;
use std::thread;
use std::time::Duration;

use futures::future::BoxFuture;
use tracing::{debug, info, warn};

use rehearse_protocols::{AutomationError, RunReport, Step};

use crate::session::{AutomationSession, SessionConfig};

/// Ceiling for a single submitted operation.
pub const DEFAULT_OP_TIMEOUT: Duration = Duration::from_secs(600);

type AnyPayload = Box<dyn Any + Send>;
type AnyResult = Result<AnyPayload, AutomationError>;

/// A typed operation against the worker-owned state.
pub type Operation<S, T> =
    Box<dyn for<'a> FnOnce(&'a mut S) -> BoxFuture<'a, Result<T, AutomationError>> + Send>;

type RawOperation<S> = Box<dyn for<'a> FnOnce(&'a mut S) -> BoxFuture<'a, AnyResult> + Send>;

struct Job<S> {
    op: RawOperation<S>,
    reply: mpsc::SyncSender<AnyResult>,
}

/// Generic single-flight worker: owns `state` on a dedicated thread and
/// executes submitted operations strictly one at a time, in submission
/// order.
pub struct Worker<S: Send + 'static> {
    tx: mpsc::SyncSender<Job<S>>,
    op_timeout: Duration,
    _handle: thread::JoinHandle<()>,
}

impl<S: Send + 'static> Worker<S> {
    pub fn spawn(state: S) -> Result<Self, AutomationError> {
        Self::spawn_with_timeout(state, DEFAULT_OP_TIMEOUT)
    }

    pub fn spawn_with_timeout(state: S, op_timeout: Duration) -> Result<Self, AutomationError> {
        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .map_err(|e| {
                AutomationError::BrowserUnavailable(format!("failed to build worker runtime: {}", e))
            })?;

        // Capacity 1: at most one operation queued behind the one executing.
        let (tx, rx) = mpsc::sync_channel::<Job<S>>(1);

        let handle = thread::Builder::new()
            .name("rehearse-worker".to_string())
            .spawn(move || {
                let mut state = state;
                while let Ok(job) = rx.recv() {
                    let result = runtime.block_on((job.op)(&mut state));
                    if job.reply.send(result).is_err() {
                        // The caller timed out and walked away; the work is
                        // done either way.
                        debug!("operation result abandoned by timed-out caller");
                    }
                }
                info!("worker thread shutting down");
            })
            .map_err(|e| {
                AutomationError::BrowserUnavailable(format!("failed to spawn worker thread: {}", e))
            })?;

        Ok(Self {
            tx,
            op_timeout,
            _handle: handle,
        })
    }

    /// Submit an operation and block for its result, up to the worker
    /// ceiling.
    pub fn submit<T: Send + 'static>(&self, op: Operation<S, T>) -> Result<T, AutomationError> {
        self.submit_with_timeout(op, self.op_timeout)
    }

    /// Submit with an explicit ceiling for this call.
    pub fn submit_with_timeout<T: Send + 'static>(
        &self,
        op: Operation<S, T>,
        timeout: Duration,
    ) -> Result<T, AutomationError> {
        let raw: RawOperation<S> = Box::new(move |state| {
            Box::pin(async move {
                op(state)
                    .await
                    .map(|value| Box::new(value) as AnyPayload)
            })
        });

        let (reply_tx, reply_rx) = mpsc::sync_channel::<AnyResult>(1);
        self.tx
            .send(Job {
                op: raw,
                reply: reply_tx,
            })
            .map_err(|_| {
                AutomationError::BrowserUnavailable("worker has stopped".to_string())
            })?;

        match reply_rx.recv_timeout(timeout) {
            Ok(result) => result.and_then(|payload| {
                payload.downcast::<T>().map(|boxed| *boxed).map_err(|_| {
                    AutomationError::BrowserUnavailable(
                        "worker returned an unexpected result type".to_string(),
                    )
                })
            }),
            Err(mpsc::RecvTimeoutError::Timeout) => {
                warn!("operation exceeded the {:?} ceiling, abandoning", timeout);
                Err(AutomationError::WorkerTimeout(timeout))
            }
            Err(mpsc::RecvTimeoutError::Disconnected) => Err(AutomationError::BrowserUnavailable(
                "worker dropped the operation".to_string(),
            )),
        }
    }
}

/// The browser automation worker: a [`Worker`] owning the one
/// [`AutomationSession`], with typed wrappers for every engine operation.
pub struct AutomationWorker {
    inner: Worker<AutomationSession>,
}

impl AutomationWorker {
    /// Start the worker thread owning a fresh session.
    pub fn start(config: SessionConfig) -> Result<Self, AutomationError> {
        Ok(Self {
            inner: Worker::spawn(AutomationSession::new(config))?,
        })
    }

    /// Launch the browser session.
    pub fn launch(&self) -> Result<(), AutomationError> {
        self.inner.submit(Box::new(|session: &mut AutomationSession| {
            Box::pin(async move { session.launch().await })
        }))
    }

    /// Navigate the session's page.
    pub fn navigate(&self, url: &str) -> Result<(), AutomationError> {
        let url = url.to_string();
        self.inner.submit(Box::new(move |session: &mut AutomationSession| {
            Box::pin(async move { session.goto(&url).await })
        }))
    }

    /// Begin recording, optionally seeding with a navigation.
    pub fn start_recording(&self, seed_url: Option<&str>) -> Result<(), AutomationError> {
        let seed = seed_url.map(str::to_string);
        self.inner.submit(Box::new(move |session: &mut AutomationSession| {
            Box::pin(async move { session.start_recording(seed.as_deref()).await })
        }))
    }

    /// Drain the in-page event buffer into the recording.
    pub fn sync_events(&self) -> Result<usize, AutomationError> {
        self.inner.submit(Box::new(|session: &mut AutomationSession| {
            Box::pin(async move { session.sync_events().await })
        }))
    }

    /// Stop recording and collect the canonical step list.
    pub fn stop_recording(&self) -> Result<Vec<Step>, AutomationError> {
        self.inner.submit(Box::new(|session: &mut AutomationSession| {
            Box::pin(async move { session.stop_recording().await })
        }))
    }

    /// Replay a step sequence; always yields a structured report.
    pub fn execute_steps(
        &self,
        steps: Vec<Step>,
        seed_url: Option<&str>,
    ) -> Result<RunReport, AutomationError> {
        let seed = seed_url.map(str::to_string);
        self.inner.submit(Box::new(move |session: &mut AutomationSession| {
            Box::pin(async move { Ok(session.execute_steps(&steps, seed.as_deref()).await) })
        }))
    }

    /// Extract text for a selector on the current page.
    pub fn extract_text(&self, selector: &str) -> Result<String, AutomationError> {
        let selector = selector.to_string();
        self.inner.submit(Box::new(move |session: &mut AutomationSession| {
            Box::pin(async move { session.extract_text(&selector).await })
        }))
    }

    /// Capture a screenshot of the current page.
    pub fn screenshot(&self, path: Option<&str>) -> Result<std::path::PathBuf, AutomationError> {
        let path = path.map(str::to_string);
        self.inner.submit(Box::new(move |session: &mut AutomationSession| {
            Box::pin(async move { session.screenshot(path.as_deref()).await })
        }))
    }

    /// Current page URL.
    pub fn current_url(&self) -> Result<String, AutomationError> {
        self.inner.submit(Box::new(|session: &mut AutomationSession| {
            Box::pin(async move { session.current_url().await })
        }))
    }

    /// Tear the browser session down.
    pub fn close(&self) -> Result<(), AutomationError> {
        self.inner.submit(Box::new(|session: &mut AutomationSession| {
            Box::pin(async move {
                session.close().await;
                Ok(())
            })
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::time::Instant;

    /// Test state: a log of (start, end) execution intervals.
    type IntervalLog = Vec<(Instant, Instant)>;

    fn record_interval(hold: Duration) -> Operation<IntervalLog, ()> {
        Box::new(move |log: &mut IntervalLog| {
            Box::pin(async move {
                let start = Instant::now();
                tokio::time::sleep(hold).await;
                log.push((start, Instant::now()));
                Ok(())
            })
        })
    }

    fn snapshot() -> Operation<IntervalLog, IntervalLog> {
        Box::new(|log: &mut IntervalLog| Box::pin(async move { Ok(log.clone()) }))
    }

    #[test]
    fn operations_never_overlap() {
        let worker = Arc::new(Worker::spawn(IntervalLog::new()).unwrap());

        let mut threads = Vec::new();
        for _ in 0..4 {
            let worker = worker.clone();
            threads.push(thread::spawn(move || {
                worker.submit(record_interval(Duration::from_millis(50))).unwrap();
            }));
        }
        for t in threads {
            t.join().unwrap();
        }

        let mut intervals = worker.submit(snapshot()).unwrap();
        assert_eq!(intervals.len(), 4);
        intervals.sort_by_key(|(start, _)| *start);
        for pair in intervals.windows(2) {
            assert!(
                pair[0].1 <= pair[1].0,
                "execution intervals must not overlap"
            );
        }
    }

    #[test]
    fn results_return_to_the_originating_caller() {
        let worker = Worker::spawn(0u64).unwrap();

        let add: Operation<u64, u64> = Box::new(|state: &mut u64| {
            Box::pin(async move {
                *state += 3;
                Ok(*state)
            })
        });
        assert_eq!(worker.submit(add).unwrap(), 3);

        let read: Operation<u64, u64> = Box::new(|state: &mut u64| Box::pin(async move { Ok(*state) }));
        assert_eq!(worker.submit(read).unwrap(), 3);
    }

    #[test]
    fn errors_propagate_to_the_caller() {
        let worker = Worker::spawn(()).unwrap();
        let fail: Operation<(), ()> = Box::new(|_: &mut ()| {
            Box::pin(async move {
                Err(AutomationError::ElementNotFound("#missing".to_string()))
            })
        });
        let err = worker.submit(fail).unwrap_err();
        assert!(matches!(err, AutomationError::ElementNotFound(_)));
    }

    #[test]
    fn timed_out_operations_are_abandoned_not_fatal() {
        let worker = Worker::spawn_with_timeout((), Duration::from_millis(50)).unwrap();

        let slow: Operation<(), ()> = Box::new(|_: &mut ()| {
            Box::pin(async move {
                tokio::time::sleep(Duration::from_millis(250)).await;
                Ok(())
            })
        });
        let err = worker.submit(slow).unwrap_err();
        assert!(matches!(err, AutomationError::WorkerTimeout(_)));

        // The worker finishes the abandoned call and keeps serving.
        let quick: Operation<(), u8> = Box::new(|_: &mut ()| Box::pin(async move { Ok(7u8) }));
        let value = worker
            .submit_with_timeout(quick, Duration::from_secs(5))
            .unwrap();
        assert_eq!(value, 7);
    }

    #[test]
    fn submissions_execute_in_fifo_order() {
        let worker = Worker::spawn(Vec::<u32>::new()).unwrap();

        for i in 0..8u32 {
            let push: Operation<Vec<u32>, ()> = Box::new(move |log: &mut Vec<u32>| {
                Box::pin(async move {
                    log.push(i);
                    Ok(())
                })
            });
            worker.submit(push).unwrap();
        }

        let read: Operation<Vec<u32>, Vec<u32>> =
            Box::new(|log: &mut Vec<u32>| Box::pin(async move { Ok(log.clone()) }));
        assert_eq!(worker.submit(read).unwrap(), (0..8).collect::<Vec<_>>());
    }
}
