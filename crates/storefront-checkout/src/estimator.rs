//! # Debounced Estimator
//!
//! Turns a stream of address edits into live delivery estimates.
//!
//! ## Architecture
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                       Debounced Estimator                               │
//! │                                                                         │
//! │  submit(addr) ──┐                                                       │
//! │  submit(addr) ──┼──► ┌────────────────┐  fire  ┌──────────────────┐      │
//! │  submit(addr) ──┘    │ DebounceTimer  │───────►│ seq = seq + 1    │      │
//! │                      │ (800ms, reset  │        │ spawn request    │      │
//! │  clear() ──────────► │  on each edit) │        │ (JoinSet)        │      │
//! │                      └────────────────┘        └────────┬─────────┘      │
//! │                                                         │               │
//! │                                    (seq, result) ◄──────┘               │
//! │                                         │                               │
//! │                         seq == latest? ─┼── no ──► drop (debug log)     │
//! │                                         │ yes                           │
//! │                                         ▼                               │
//! │                          watch::Sender<Option<DeliveryEstimate>>        │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Failures never reach the caller: out-of-zone answers become an
//! out-of-zone estimate, anything else becomes the fallback estimate.

use std::sync::Arc;
use std::time::Duration;

use storefront_core::pricing::DeliveryPolicy;
use storefront_core::types::{Address, DeliveryCostResult, DeliveryEstimate, ServiceArea};
use storefront_core::Money;
use tokio::sync::{mpsc, oneshot, watch};
use tokio::task::JoinSet;
use tracing::{debug, info, warn};

use crate::client::DeliveryCostClient;
use crate::config::CheckoutConfig;
use crate::error::{CheckoutError, CheckoutResult};
use crate::timer::DebounceTimer;

// =============================================================================
// Estimator Configuration
// =============================================================================

/// Configuration for the estimator.
#[derive(Debug, Clone)]
pub struct EstimatorConfig {
    /// Quiet period before a request fires.
    pub window: Duration,
    /// Defaults for unset city/state/country.
    pub service_area: ServiceArea,
    /// Fallback rules for unreachable-service estimates.
    pub policy: DeliveryPolicy,
}

impl Default for EstimatorConfig {
    fn default() -> Self {
        EstimatorConfig {
            window: Duration::from_millis(storefront_core::DEBOUNCE_WINDOW_MS),
            service_area: ServiceArea::default(),
            policy: DeliveryPolicy::default(),
        }
    }
}

impl From<&CheckoutConfig> for EstimatorConfig {
    fn from(config: &CheckoutConfig) -> Self {
        EstimatorConfig {
            window: config.debounce_window(),
            service_area: config.service_area(),
            policy: DeliveryPolicy::default(),
        }
    }
}

// =============================================================================
// Handle & Commands
// =============================================================================

/// Commands for the estimator.
#[derive(Debug)]
enum EstimatorCommand {
    Submit { address: Address, subtotal: Money },
    Clear,
    Dispose(oneshot::Sender<()>),
}

/// Handle for controlling the estimator.
#[derive(Clone)]
pub struct EstimatorHandle {
    cmd_tx: mpsc::Sender<EstimatorCommand>,
    estimate_rx: watch::Receiver<Option<DeliveryEstimate>>,
}

impl EstimatorHandle {
    /// Reports an address edit. Never fails because of the delivery service.
    pub async fn submit(&self, address: Address, subtotal: Money) -> CheckoutResult<()> {
        self.send(EstimatorCommand::Submit { address, subtotal }).await
    }

    /// Empties the estimate and invalidates pending work.
    pub async fn clear(&self) -> CheckoutResult<()> {
        self.send(EstimatorCommand::Clear).await
    }

    /// Stops the estimator. No estimate changes after this returns.
    pub async fn dispose(&self) {
        let (ack_tx, ack_rx) = oneshot::channel();
        if self.cmd_tx.send(EstimatorCommand::Dispose(ack_tx)).await.is_ok() {
            let _ = ack_rx.await;
        }
    }

    /// The estimate currently shown.
    pub fn current(&self) -> Option<DeliveryEstimate> {
        self.estimate_rx.borrow().clone()
    }

    /// Watches estimate changes.
    pub fn subscribe(&self) -> watch::Receiver<Option<DeliveryEstimate>> {
        self.estimate_rx.clone()
    }

    async fn send(&self, cmd: EstimatorCommand) -> CheckoutResult<()> {
        self.cmd_tx
            .send(cmd)
            .await
            .map_err(|_| CheckoutError::ChannelError("Estimator channel closed".into()))
    }
}

// =============================================================================
// Debounced Estimator
// =============================================================================

/// Result of one live request, tagged with its sequence number.
type Tagged = (u64, CheckoutResult<DeliveryCostResult>, Money);

/// Live delivery estimate actor.
pub struct DebouncedEstimator {
    config: EstimatorConfig,
    client: Arc<dyn DeliveryCostClient>,
    timer: DebounceTimer,
    /// Address and subtotal known when the timer fires.
    pending: Option<(Address, Money)>,
    /// Last sequence number handed out.
    issued: u64,
    /// Only responses carrying this sequence number may publish.
    latest: Option<u64>,
    in_flight: JoinSet<Tagged>,
    estimate_tx: watch::Sender<Option<DeliveryEstimate>>,
    disposed: bool,
}

impl DebouncedEstimator {
    pub fn new(config: EstimatorConfig, client: Arc<dyn DeliveryCostClient>) -> Self {
        let (estimate_tx, _) = watch::channel(None);
        DebouncedEstimator {
            timer: DebounceTimer::new(config.window),
            config,
            client,
            pending: None,
            issued: 0,
            latest: None,
            in_flight: JoinSet::new(),
            estimate_tx,
            disposed: false,
        }
    }

    /// Starts the estimator and returns a handle.
    pub fn start(self) -> EstimatorHandle {
        let (cmd_tx, cmd_rx) = mpsc::channel(256);
        let estimate_rx = self.estimate_tx.subscribe();

        tokio::spawn(async move {
            self.run(cmd_rx).await;
        });

        EstimatorHandle {
            cmd_tx,
            estimate_rx,
        }
    }

    /// Main estimator loop.
    async fn run(mut self, mut cmd_rx: mpsc::Receiver<EstimatorCommand>) {
        debug!(window_ms = self.config.window.as_millis() as u64, "Delivery estimator started");

        loop {
            tokio::select! {
                // Commands first: a dispose must win over a timer that is due
                biased;

                cmd = cmd_rx.recv() => {
                    match cmd {
                        Some(EstimatorCommand::Submit { address, subtotal }) => {
                            self.handle_submit(address, subtotal);
                        }
                        Some(EstimatorCommand::Clear) => self.handle_clear(),
                        Some(EstimatorCommand::Dispose(ack)) => {
                            self.dispose();
                            let _ = ack.send(());
                            break;
                        }
                        None => {
                            self.dispose();
                            break;
                        }
                    }
                }
                _ = self.timer.expired(), if self.timer.is_armed() => {
                    self.fire();
                }
                Some(joined) = self.in_flight.join_next(), if !self.in_flight.is_empty() => {
                    match joined {
                        Ok((seq, result, subtotal)) => self.handle_response(seq, result, subtotal),
                        Err(e) if e.is_cancelled() => {}
                        Err(e) => warn!(error = %e, "Estimate request task failed"),
                    }
                }
            }
        }

        debug!("Delivery estimator stopped");
    }

    fn handle_submit(&mut self, address: Address, subtotal: Money) {
        if !address.has_zip() {
            debug!("Address has no zip code, clearing estimate");
            self.handle_clear();
            return;
        }

        self.pending = Some((address, subtotal));
        self.timer.start();
    }

    fn handle_clear(&mut self) {
        self.timer.cancel();
        self.pending = None;
        self.latest = None;
        self.in_flight.abort_all();
        self.publish(None);
    }

    /// Debounce window elapsed: issue exactly one request.
    fn fire(&mut self) {
        let Some((address, subtotal)) = self.pending.take() else {
            return;
        };

        let address = address.with_zone_defaults(&self.config.service_area);
        self.issued += 1;
        let seq = self.issued;
        self.latest = Some(seq);

        let loading = match self.estimate_tx.borrow().as_ref() {
            Some(current) => current.refreshing(),
            None => DeliveryEstimate::pending(),
        };
        self.publish(Some(loading));

        info!(seq, zip = %address.zip_code, "Requesting delivery estimate");

        let client = Arc::clone(&self.client);
        self.in_flight.spawn(async move {
            let result = client.calculate_delivery_cost(&address, subtotal).await;
            (seq, result, subtotal)
        });
    }

    fn handle_response(
        &mut self,
        seq: u64,
        result: CheckoutResult<DeliveryCostResult>,
        subtotal: Money,
    ) {
        if self.latest != Some(seq) {
            debug!(seq, latest = ?self.latest, "Dropping stale estimate response");
            return;
        }

        let estimate = match result {
            Ok(quote) => {
                debug!(seq, cost = %quote.delivery_cost, "Estimate received");
                self.config.policy.quoted_estimate(subtotal, &quote)
            }
            Err(e) if e.is_zone_error() => {
                debug!(seq, "Address outside delivery zone");
                DeliveryEstimate::out_of_zone()
            }
            Err(e) => {
                warn!(seq, error = %e, "Estimate request failed, showing fallback");
                self.config.policy.fallback_estimate(subtotal)
            }
        };

        self.publish(Some(estimate));
    }

    fn dispose(&mut self) {
        self.timer.cancel();
        self.pending = None;
        self.latest = None;
        self.in_flight.abort_all();
        self.disposed = true;
    }

    fn publish(&self, estimate: Option<DeliveryEstimate>) {
        if self.disposed {
            return;
        }
        self.estimate_tx.send_replace(estimate);
    }
}
