//! Dashboard backend: runs lookups and fetches off the state-owning task.
//!
//! Intents mutate the [`ViewController`] right away; network work is spawned
//! on the tokio runtime and its outcome comes back as a
//! [`DashboardMessage`]. Messages are applied on the owner's task through
//! [`Dashboard::process_pending`] or [`Dashboard::next_message`], so the
//! controller is never touched concurrently. Requests are not cancelled;
//! stale completions are dropped by the controller. A task that dies
//! before reporting still sends [`DashboardMessage::Lost`].

use std::future::Future;
use std::sync::Arc;

use chrono::NaiveDate;
use tokio::sync::mpsc;

use crate::controller::{ForecastRequest, SuggestRequest, ViewController};
use crate::error::WeatherError;
use crate::geocode::CityResolver;
use crate::provider::ForecastProvider;
use crate::types::ForecastSeries;

/// Messages sent from async operations back to the owning task
#[derive(Debug)]
pub enum DashboardMessage {
    SuggestionsDone(SuggestRequest, Result<Vec<String>, WeatherError>),
    ForecastDone(ForecastRequest, Result<ForecastSeries, WeatherError>),
    /// A request task ended without reporting (panicked or was aborted)
    Lost,
}

/// Sends [`DashboardMessage::Lost`] if dropped before a result was sent,
/// so every spawned request is accounted for exactly once.
struct Reporter {
    tx: mpsc::UnboundedSender<DashboardMessage>,
    sent: bool,
}

impl Reporter {
    fn send(mut self, msg: DashboardMessage) {
        self.sent = true;
        let _ = self.tx.send(msg);
    }
}

impl Drop for Reporter {
    fn drop(&mut self) {
        if !self.sent {
            let _ = self.tx.send(DashboardMessage::Lost);
        }
    }
}

pub struct Dashboard {
    controller: ViewController,
    resolver: Arc<CityResolver>,
    provider: Arc<ForecastProvider>,
    tx: mpsc::UnboundedSender<DashboardMessage>,
    rx: mpsc::UnboundedReceiver<DashboardMessage>,
    in_flight: usize,
}

impl Dashboard {
    pub fn new(
        controller: ViewController,
        resolver: Arc<CityResolver>,
        provider: Arc<ForecastProvider>,
    ) -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        Self {
            controller,
            resolver,
            provider,
            tx,
            rx,
            in_flight: 0,
        }
    }

    pub fn controller(&self) -> &ViewController {
        &self.controller
    }

    /// Requests started but not yet applied or dropped
    pub fn in_flight(&self) -> usize {
        self.in_flight
    }

    /// Fetch the starting city. Must be called inside a tokio runtime.
    pub fn mount(&mut self) {
        if let Some(request) = self.controller.mount() {
            self.spawn_forecast(request);
        }
    }

    /// Search text changed. Must be called inside a tokio runtime.
    pub fn type_query(&mut self, text: &str) {
        if let Some(request) = self.controller.set_query(text) {
            self.spawn_suggest(request);
        }
    }

    /// City picked. Must be called inside a tokio runtime.
    pub fn select_city(&mut self, name: &str) {
        if let Some(request) = self.controller.select_city(name) {
            self.spawn_forecast(request);
        }
    }

    pub fn select_day(&mut self, day: NaiveDate) -> bool {
        self.controller.select_day(day)
    }

    pub fn dismiss_suggestions(&mut self) {
        self.controller.dismiss_suggestions();
    }

    /// Apply every message already received without waiting.
    /// Returns how many changed state.
    pub fn process_pending(&mut self) -> usize {
        let mut changed = 0;
        while let Ok(msg) = self.rx.try_recv() {
            if self.apply(msg) {
                changed += 1;
            }
        }
        changed
    }

    /// Wait for the next completion and apply it.
    ///
    /// Returns `None` when nothing is in flight, otherwise whether the
    /// message changed state.
    pub async fn next_message(&mut self) -> Option<bool> {
        if self.in_flight == 0 {
            return None;
        }
        let msg = self.rx.recv().await?;
        Some(self.apply(msg))
    }

    /// Wait until every request started so far has completed.
    pub async fn settle(&mut self) {
        while self.next_message().await.is_some() {}
    }

    fn apply(&mut self, msg: DashboardMessage) -> bool {
        self.in_flight = self.in_flight.saturating_sub(1);
        match msg {
            DashboardMessage::SuggestionsDone(request, result) => {
                self.controller.apply_suggestions(&request, result)
            }
            DashboardMessage::ForecastDone(request, result) => {
                self.controller.apply_forecast(&request, result)
            }
            DashboardMessage::Lost => {
                tracing::error!("Request task ended without a result");
                false
            }
        }
    }

    /// Run `work` on the runtime and route its message back to this task.
    fn spawn_reporting<F>(&mut self, work: F)
    where
        F: Future<Output = DashboardMessage> + Send + 'static,
    {
        let reporter = Reporter {
            tx: self.tx.clone(),
            sent: false,
        };
        self.in_flight += 1;

        tokio::spawn(async move {
            let msg = work.await;
            reporter.send(msg);
        });
    }

    fn spawn_suggest(&mut self, request: SuggestRequest) {
        let resolver = self.resolver.clone();
        self.spawn_reporting(async move {
            let result = resolver.suggest(&request.query).await;
            DashboardMessage::SuggestionsDone(request, result)
        });
    }

    fn spawn_forecast(&mut self, request: ForecastRequest) {
        let provider = self.provider.clone();
        self.spawn_reporting(async move {
            tracing::debug!("Fetching forecast for {} (seq {})", request.city, request.seq);
            let result = provider.fetch(&request.city).await;
            DashboardMessage::ForecastDone(request, result)
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryCityStore;
    use skycast_core::{Units, WeatherConfig};

    fn offline_dashboard() -> Dashboard {
        // Nothing listens on port 9; any request fails fast.
        let resolver = CityResolver::new("http://127.0.0.1:9/search/", 3, None).unwrap();
        let provider =
            ForecastProvider::new("http://127.0.0.1:9/forecast", None, Units::Metric, "fr", None)
                .unwrap();
        Dashboard::new(
            ViewController::new(MemoryCityStore::new(), &WeatherConfig::default()),
            Arc::new(resolver),
            Arc::new(provider),
        )
    }

    #[tokio::test]
    async fn test_short_query_spawns_nothing() {
        let mut dashboard = offline_dashboard();
        dashboard.type_query("ly");
        assert_eq!(dashboard.in_flight(), 0);
        assert_eq!(dashboard.next_message().await, None);
    }

    #[tokio::test]
    async fn test_failed_fetch_settles_without_state_change() {
        let mut dashboard = offline_dashboard();
        dashboard.mount();
        assert_eq!(dashboard.in_flight(), 1);

        assert_eq!(dashboard.next_message().await, Some(false));
        assert_eq!(dashboard.in_flight(), 0);
        assert!(dashboard.controller().is_loading());
        assert!(dashboard.controller().series().is_empty());
    }

    #[tokio::test]
    #[allow(unreachable_code)]
    async fn test_panicked_task_still_settles() {
        let mut dashboard = offline_dashboard();
        dashboard.spawn_reporting(async {
            tokio::time::sleep(std::time::Duration::from_millis(5)).await;
            let msg: DashboardMessage = panic!("request task failed");
            msg
        });
        assert_eq!(dashboard.in_flight(), 1);

        let settled =
            tokio::time::timeout(std::time::Duration::from_secs(5), dashboard.settle()).await;
        assert!(settled.is_ok());
        assert_eq!(dashboard.in_flight(), 0);
    }

    #[tokio::test]
    async fn test_process_pending_drains_without_blocking() {
        let mut dashboard = offline_dashboard();
        assert_eq!(dashboard.process_pending(), 0);

        dashboard.mount();
        while dashboard.in_flight() > 0 {
            assert_eq!(dashboard.process_pending(), 0);
            tokio::time::sleep(std::time::Duration::from_millis(10)).await;
        }
        assert!(dashboard.controller().is_loading());
    }
}
