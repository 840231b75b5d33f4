// src/budget/pacer.rs

use std::sync::Arc;

use chrono::Utc;
use reqwest::header::ACCEPT;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::json;
use tokio::time::{self, timeout, Duration};
use tracing::{info, warn};

use crate::config::config_manager::AgentConfig;
use crate::errors::PacerError;
use crate::logging::runtime_logger::RuntimeLogger;
use crate::model::pacer::PacerState;

/// Per-tick deadline for the banker call. Well under the default
/// period; a slow banker must never stack ticks.
const BANKER_TIMEOUT: Duration = Duration::from_secs(10);

/// Balance adjustment posted to the banker each period.
#[derive(Serialize, Debug)]
struct BalanceTopUp {
    #[serde(rename = "USD/1M")]
    amount: f64,
}

/// Banker's view of the account after the adjustment.
#[derive(Deserialize, Debug)]
struct BalanceSnapshot {
    #[serde(rename = "USD/1M")]
    remaining: f64,
}

/// Periodically reports intended spend to the banker and maps the
/// returned remaining budget onto the shared throttle.
///
/// Runs as a single task off the request path. A failed tick is
/// logged, the throttle is left where it was, and the next scheduled
/// tick is the retry. No retry happens within a tick, so a banker
/// outage can never block or crash the bid path.
pub struct BudgetPacer {
    client: Client,
    banker_address: String,
    period: Duration,
    state: Arc<PacerState>,
    logger: Arc<RuntimeLogger>,
}

impl BudgetPacer {
    pub fn new(config: &AgentConfig, state: Arc<PacerState>, logger: Arc<RuntimeLogger>) -> Self {
        Self {
            client: Client::new(),
            banker_address: config.banker_address.clone(),
            period: Duration::from_millis(config.pacer_period_ms),
            state,
            logger,
        }
    }

    fn balance_url(&self) -> String {
        format!(
            "http://{}/v1/accounts/{}/balance",
            self.banker_address,
            self.state.account()
        )
    }

    /// Tick loop. The first report fires immediately, then one per
    /// period.
    pub async fn run(self) {
        let mut ticker = time::interval(self.period);
        loop {
            ticker.tick().await;
            match self.tick().await {
                Ok(throttle) => {
                    info!(throttle, "budget pacer updated throttle");
                    self.logger
                        .log(
                            "INFO",
                            &json!({
                                "agent_log": "pacer_report_success",
                                "account": self.state.account(),
                                "throttle": throttle,
                            })
                            .to_string(),
                        )
                        .await;
                }
                Err(e) => {
                    warn!(error = %e, "budget pacer tick failed, keeping previous throttle");
                    self.logger
                        .log(
                            "ERROR",
                            &json!({
                                "agent_log": "pacer_report_failed",
                                "account": self.state.account(),
                                "reason": e.to_string(),
                            })
                            .to_string(),
                        )
                        .await;
                }
            }
        }
    }

    /// One balance report. On success updates the shared throttle to
    /// the fraction of the target budget the banker says is left.
    pub async fn tick(&self) -> Result<f64, PacerError> {
        let top_up = BalanceTopUp {
            amount: self.state.target_budget(),
        };
        let request = self
            .client
            .post(self.balance_url())
            .header(ACCEPT, "application/json")
            .json(&top_up)
            .send();
        let response = timeout(BANKER_TIMEOUT, request)
            .await
            .map_err(|_| PacerError::Timeout)??;

        let status = response.status();
        if !status.is_success() {
            return Err(PacerError::Status(status));
        }
        let snapshot: BalanceSnapshot = response.json().await?;

        let target = self.state.target_budget();
        let fraction = if target > 0.0 {
            (snapshot.remaining / target).clamp(0.0, 1.0)
        } else {
            0.0
        };
        self.state.set_throttle(fraction);
        self.state.mark_reported(Utc::now());
        Ok(fraction)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mock_banker;
    use crate::model::creative::Creative;

    fn test_config(banker_address: &str) -> AgentConfig {
        AgentConfig {
            bid_probability: 1.0,
            fixed_price: 1.0,
            creatives: vec![Creative {
                id: "0".to_string(),
                format: "300x250".to_string(),
                name: "BigBox".to_string(),
            }],
            account: "hello:world".to_string(),
            banker_address: banker_address.to_string(),
            pacer_period_ms: 300_000,
            budget_per_period: 500_000.0,
            bid_timeout_ms: 100,
            strategy: Default::default(),
        }
    }

    fn test_logger() -> Arc<RuntimeLogger> {
        let dir = std::env::temp_dir().join("bidagent_pacer_test_logs");
        RuntimeLogger::new(dir.to_str().unwrap(), "test", 64, 16, 1000)
    }

    #[tokio::test]
    async fn tick_updates_throttle_from_the_banker() {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, mock_banker::router()).await.unwrap();
        });

        let state = Arc::new(PacerState::new("hello:world", 500_000.0));
        let pacer = BudgetPacer::new(&test_config(&addr.to_string()), state.clone(), test_logger());

        let fraction = pacer.tick().await.unwrap();
        assert!((0.0..=1.0).contains(&fraction));
        assert_eq!(state.throttle(), fraction);
        assert!(state.last_reported_at().is_some());
    }

    #[tokio::test]
    async fn failed_tick_leaves_throttle_untouched() {
        // bind then drop, so the port is closed
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let state = Arc::new(PacerState::new("hello:world", 500_000.0));
        let pacer = BudgetPacer::new(&test_config(&addr.to_string()), state.clone(), test_logger());

        assert!(pacer.tick().await.is_err());
        assert_eq!(state.throttle(), 1.0);
        assert!(state.last_reported_at().is_none());
    }
}
