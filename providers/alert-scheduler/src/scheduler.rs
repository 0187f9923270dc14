//! Timer-driven evaluation.
//!
//! Two independent loops share one [`AlertScheduler`]:
//! - the poll loop evaluates every `poll_interval` and broadcasts non-empty results;
//! - the daily loop evaluates once a day at `daily_trigger_time` in the reference zone
//!   and hands the result to the reporter.
//!
//! A failed evaluation is logged and the loop waits for its next tick.

use crate::config::ScheduleSettings;
use crate::data_provider::PurchaseDataProvider;
use crate::evaluator::AlertEvaluator;
use crate::publisher::{AlertPublisher, AlertReporter};
use crate::{AlertSchedulerError, Result};
use chrono::{DateTime, NaiveTime, Timelike, Utc};
use chrono_tz::Tz;
use cron::Schedule;
use retention_common::Alert;
use std::str::FromStr;
use std::sync::Arc;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};
use tracing::{debug, error, info, warn};

/// Source of the current instant for evaluations and the daily trigger.
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

pub struct AlertScheduler {
    evaluator: AlertEvaluator,
    clock: Arc<dyn Clock>,
    provider: Arc<dyn PurchaseDataProvider>,
    publisher: Arc<dyn AlertPublisher>,
    reporter: Arc<dyn AlertReporter>,
    settings: ScheduleSettings,
    daily_schedule: Schedule,
}

impl AlertScheduler {
    pub fn new(
        settings: ScheduleSettings,
        provider: Arc<dyn PurchaseDataProvider>,
        publisher: Arc<dyn AlertPublisher>,
        reporter: Arc<dyn AlertReporter>,
    ) -> Result<Self> {
        let daily_schedule = daily_schedule(settings.daily_trigger_time)?;
        Ok(Self {
            evaluator: AlertEvaluator::new(settings.timezone, settings.thresholds),
            clock: Arc::new(SystemClock),
            provider,
            publisher,
            reporter,
            settings,
            daily_schedule,
        })
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// Evaluate against the current store contents as of now.
    pub async fn evaluate_now(&self) -> Result<Vec<Alert>> {
        self.evaluate_at(self.clock.now()).await
    }

    pub async fn evaluate_at(&self, now: DateTime<Utc>) -> Result<Vec<Alert>> {
        self.evaluator.evaluate(self.provider.as_ref(), now).await
    }

    /// Evaluate and broadcast the batch if it is non-empty.
    pub async fn evaluate_and_broadcast(&self) -> Result<Vec<Alert>> {
        let alerts = self.evaluate_now().await?;
        if !alerts.is_empty() {
            let delivered = self.publisher.publish_alerts(&alerts).await;
            debug!(
                "Broadcast {} alerts to {} subscribers",
                alerts.len(),
                delivered
            );
        }
        Ok(alerts)
    }

    /// One poll tick. Errors stop here.
    pub async fn run_poll_cycle(&self) {
        if let Err(e) = self.evaluate_and_broadcast().await {
            warn!("Poll evaluation failed, retrying next interval: {}", e);
        }
    }

    /// One daily tick. Errors stop here.
    pub async fn run_daily_cycle(&self) {
        match self.evaluate_now().await {
            Ok(alerts) => self.reporter.report(&alerts),
            Err(e) => error!("Daily alert evaluation failed: {}", e),
        }
    }

    /// Next daily trigger strictly after `after`, as an instant.
    pub fn next_daily_fire(&self, after: DateTime<Utc>) -> Option<DateTime<Utc>> {
        next_fire_after(&self.daily_schedule, self.settings.timezone, after)
    }

    /// Spawn both loops. They run until [`SchedulerHandle::shutdown`].
    pub fn start(self: Arc<Self>) -> SchedulerHandle {
        let (shutdown_tx, shutdown_rx) = watch::channel(false);

        let poll = tokio::spawn(Arc::clone(&self).poll_loop(shutdown_rx.clone()));
        let daily = tokio::spawn(self.daily_loop(shutdown_rx));

        SchedulerHandle {
            shutdown: shutdown_tx,
            tasks: vec![poll, daily],
        }
    }

    async fn poll_loop(self: Arc<Self>, mut shutdown: watch::Receiver<bool>) {
        let period = self.settings.poll_interval;
        let mut ticker = tokio::time::interval_at(Instant::now() + period, period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        info!("Poll loop started, evaluating every {:?}", period);

        loop {
            tokio::select! {
                _ = ticker.tick() => self.run_poll_cycle().await,
                _ = shutdown.changed() => break,
            }
        }
        info!("Poll loop stopped");
    }

    async fn daily_loop(self: Arc<Self>, mut shutdown: watch::Receiver<bool>) {
        let mut last_fire: Option<DateTime<Utc>> = None;

        loop {
            let now = self.clock.now();
            let after = last_fire.map_or(now, |fired| fired.max(now));
            let Some(next) = self.next_daily_fire(after) else {
                warn!("No upcoming daily trigger, daily loop exiting");
                break;
            };
            info!(
                "Next daily alert report at {}",
                next.with_timezone(&self.settings.timezone)
            );

            let wait = (next - now).to_std().unwrap_or_default();
            tokio::select! {
                _ = tokio::time::sleep(wait) => {
                    self.run_daily_cycle().await;
                    last_fire = Some(next);
                }
                _ = shutdown.changed() => break,
            }
        }
        info!("Daily loop stopped");
    }
}

/// Owns the running loops.
pub struct SchedulerHandle {
    shutdown: watch::Sender<bool>,
    tasks: Vec<JoinHandle<()>>,
}

impl SchedulerHandle {
    /// Signal both loops and wait for them to finish their current cycle.
    pub async fn shutdown(self) {
        let _ = self.shutdown.send(true);
        for task in self.tasks {
            if let Err(e) = task.await {
                error!("Scheduler task ended abnormally: {}", e);
            }
        }
    }
}

fn daily_schedule(time: NaiveTime) -> Result<Schedule> {
    let expr = format!("{} {} {} * * *", time.second(), time.minute(), time.hour());
    Schedule::from_str(&expr).map_err(|e| {
        AlertSchedulerError::Configuration(format!("invalid daily schedule '{}': {}", expr, e))
    })
}

fn next_fire_after(schedule: &Schedule, tz: Tz, after: DateTime<Utc>) -> Option<DateTime<Utc>> {
    schedule
        .after(&after.with_timezone(&tz))
        .next()
        .map(|dt| dt.with_timezone(&Utc))
}
