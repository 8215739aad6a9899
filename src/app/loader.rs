//! `DataSeriesLoader`: one fetch per coin, observed through [`LoadState`].
//!
//! The fetch runs on a worker thread and hands its result back over a channel.
//! Only the loader writes its state, and it does so once:
//!
//! `Uninitialized -> Loading -> {Error | Ready}`
//!
//! Cancelling (or dropping) the loader flips a shared token; a result that
//! arrives afterwards is thrown away instead of being applied.

use std::fmt::Display;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{self, Receiver, TryRecvError};
use std::thread;

use chrono::{Local, TimeZone};

use crate::app::pipeline;
use crate::data::MarketChartSource;
use crate::domain::{ChartModel, CoinId, LoadState};
use crate::error::{AppError, LoadError};

/// Shared cancellation flag between a loader and its worker.
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

type LoadResult = Result<ChartModel, LoadError>;

pub struct DataSeriesLoader {
    coin_id: CoinId,
    state: LoadState,
    token: CancelToken,
    pending: Option<Receiver<LoadResult>>,
}

impl DataSeriesLoader {
    /// Start loading `coin_id`, labelling dates in the local time zone.
    ///
    /// The returned loader is already `Loading`.
    pub fn spawn(coin_id: CoinId, source: Arc<dyn MarketChartSource>) -> Result<Self, AppError> {
        Self::spawn_in(coin_id, source, Local)
    }

    /// Start loading `coin_id`, labelling dates in `tz`.
    pub fn spawn_in<Tz>(coin_id: CoinId, source: Arc<dyn MarketChartSource>, tz: Tz) -> Result<Self, AppError>
    where
        Tz: TimeZone + Send + 'static,
        Tz::Offset: Display,
    {
        let token = CancelToken::default();
        let (tx, rx) = mpsc::channel();

        let worker_token = token.clone();
        let worker_coin = coin_id.clone();
        thread::Builder::new()
            .name(format!("market-chart-{coin_id}"))
            .spawn(move || {
                let result = pipeline::fetch_chart(&worker_coin, source.as_ref(), &tz);
                if worker_token.is_cancelled() {
                    tracing::debug!(coin = %worker_coin, "loader cancelled; discarding result");
                    return;
                }
                // The receiver is gone only if the loader was dropped mid-flight.
                let _ = tx.send(result);
            })
            .map_err(|e| AppError::new(4, format!("Failed to start fetch worker: {e}")))?;

        tracing::debug!(coin = %coin_id, "market chart load started");

        Ok(Self {
            coin_id,
            state: LoadState::Loading,
            token,
            pending: Some(rx),
        })
    }

    pub fn coin_id(&self) -> &CoinId {
        &self.coin_id
    }

    pub fn state(&self) -> &LoadState {
        &self.state
    }

    pub fn is_cancelled(&self) -> bool {
        self.token.is_cancelled()
    }

    /// Apply the worker's result if it has arrived. Never blocks.
    pub fn poll(&mut self) -> &LoadState {
        if self.token.is_cancelled() {
            return &self.state;
        }
        let outcome = match &self.pending {
            Some(rx) => match rx.try_recv() {
                Ok(result) => Some(result),
                Err(TryRecvError::Empty) => None,
                Err(TryRecvError::Disconnected) => Some(Err(worker_lost())),
            },
            None => None,
        };
        if let Some(result) = outcome {
            self.finish(result);
        }
        &self.state
    }

    /// Block until the load reaches a terminal state.
    ///
    /// Returns immediately (still `Loading`) if the loader was cancelled.
    pub fn wait(&mut self) -> &LoadState {
        if self.token.is_cancelled() {
            return &self.state;
        }
        if let Some(rx) = &self.pending {
            let result = rx.recv().unwrap_or_else(|_| Err(worker_lost()));
            self.finish(result);
        }
        &self.state
    }

    /// Discard whatever the in-flight fetch produces.
    pub fn cancel(&mut self) {
        if !self.state.is_terminal() {
            tracing::debug!(coin = %self.coin_id, "cancelling market chart load");
        }
        self.token.cancel();
        self.pending = None;
    }

    fn finish(&mut self, result: LoadResult) {
        self.pending = None;
        if self.state.is_terminal() {
            return;
        }
        self.state = result.into();
    }
}

impl Drop for DataSeriesLoader {
    fn drop(&mut self) {
        self.token.cancel();
    }
}

fn worker_lost() -> LoadError {
    LoadError::transport("fetch worker exited without a result")
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;
    use std::sync::mpsc::Sender;
    use std::time::Duration;

    use chrono::Utc;

    use super::*;
    use crate::data::MarketChartQuery;

    /// Blocks inside `fetch_market_chart` until the test opens the gate.
    struct GatedSource {
        gate: Mutex<Receiver<()>>,
        fetched: Mutex<Sender<()>>,
        response: Result<String, LoadError>,
    }

    fn gated(response: Result<String, LoadError>) -> (Arc<GatedSource>, Sender<()>, Receiver<()>) {
        let (gate_tx, gate_rx) = mpsc::channel();
        let (fetched_tx, fetched_rx) = mpsc::channel();
        let source = Arc::new(GatedSource {
            gate: Mutex::new(gate_rx),
            fetched: Mutex::new(fetched_tx),
            response,
        });
        (source, gate_tx, fetched_rx)
    }

    impl MarketChartSource for GatedSource {
        fn fetch_market_chart(&self, _coin_id: &str, _query: &MarketChartQuery) -> Result<String, LoadError> {
            self.gate.lock().unwrap().recv().unwrap();
            self.fetched.lock().unwrap().send(()).unwrap();
            self.response.clone()
        }
    }

    fn coin() -> CoinId {
        CoinId::parse("bitcoin").unwrap()
    }

    const BODY: &str = r#"{"prices":[[1700000000000,10],[1700086400000,20]],"market_caps":[[1700000000000,100],[1700086400000,200]],"total_volumes":[[1700000000000,1000],[1700086400000,2000]]}"#;

    #[test]
    fn starts_loading_then_becomes_ready() {
        let (source, gate, _fetched) = gated(Ok(BODY.to_string()));
        let mut loader = DataSeriesLoader::spawn_in(coin(), source, Utc).unwrap();

        assert_eq!(loader.state(), &LoadState::Loading);
        assert_eq!(loader.poll(), &LoadState::Loading);

        gate.send(()).unwrap();
        let model = loader.wait().model().cloned().unwrap();
        assert_eq!(model.series[0].values, vec![10.0, 20.0]);
        assert_eq!(model.labels, vec!["11/14/2023", "11/15/2023"]);
    }

    #[test]
    fn transport_error_becomes_terminal_error() {
        let (source, gate, _fetched) = gated(Err(LoadError::transport("503")));
        let mut loader = DataSeriesLoader::spawn_in(coin(), source, Utc).unwrap();
        gate.send(()).unwrap();

        let state = loader.wait().clone();
        assert_eq!(
            state.error().map(|e| e.to_string()).as_deref(),
            Some("Error fetching historical data")
        );
    }

    #[test]
    fn terminal_state_is_sticky() {
        let (source, gate, _fetched) = gated(Ok(r#"{"prices":[]}"#.to_string()));
        let mut loader = DataSeriesLoader::spawn_in(coin(), source, Utc).unwrap();
        gate.send(()).unwrap();

        let first = loader.wait().clone();
        assert_eq!(first, LoadState::Error(LoadError::MalformedShape));
        for _ in 0..3 {
            assert_eq!(loader.poll(), &first);
        }
        assert_eq!(loader.wait(), &first);
    }

    #[test]
    fn cancelled_loader_ignores_late_result() {
        let (source, gate, fetched) = gated(Ok(BODY.to_string()));
        let mut loader = DataSeriesLoader::spawn_in(coin(), source, Utc).unwrap();

        loader.cancel();
        gate.send(()).unwrap();
        fetched.recv_timeout(Duration::from_secs(5)).unwrap();

        assert!(loader.is_cancelled());
        assert_eq!(loader.poll(), &LoadState::Loading);
        assert_eq!(loader.wait(), &LoadState::Loading);
    }

    #[test]
    fn polling_eventually_applies_result() {
        let (source, gate, _fetched) = gated(Ok("{}".to_string()));
        let mut loader = DataSeriesLoader::spawn_in(coin(), source, Utc).unwrap();
        gate.send(()).unwrap();

        let mut state = loader.poll().clone();
        for _ in 0..500 {
            if state.is_terminal() {
                break;
            }
            std::thread::sleep(Duration::from_millis(10));
            state = loader.poll().clone();
        }
        assert_eq!(state, LoadState::Error(LoadError::MissingField));
    }

    #[test]
    fn dropping_loader_cancels_in_flight_fetch() {
        let (source, gate, fetched) = gated(Ok(BODY.to_string()));
        let loader = DataSeriesLoader::spawn_in(coin(), source.clone(), Utc).unwrap();
        let token = loader.token.clone();

        drop(loader);
        assert!(token.is_cancelled());

        gate.send(()).unwrap();
        fetched.recv_timeout(Duration::from_secs(5)).unwrap();

        // The worker returns without delivering its result and releases the source.
        for _ in 0..500 {
            if Arc::strong_count(&source) == 1 {
                break;
            }
            std::thread::sleep(Duration::from_millis(10));
        }
        assert_eq!(Arc::strong_count(&source), 1);
    }
}
