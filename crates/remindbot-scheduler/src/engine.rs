use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use remindbot_core::{Occurrence, Reminder};
use tokio::sync::{watch, Mutex};
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use crate::error::DeliveryError;
use crate::schedule::next_after;
use crate::store::{Due, ReminderStore};

/// Posts a fired reminder somewhere. Implemented by the platform bridge.
#[async_trait]
pub trait Deliverer: Send + Sync {
    async fn deliver(
        &self,
        reminder: &Reminder,
        occurrence: &Occurrence,
    ) -> std::result::Result<(), DeliveryError>;
}

/// Counters for one dispatcher pass.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct TickReport {
    pub delivered: usize,
    pub failed: usize,
    pub rescheduled: usize,
}

enum DispatcherState {
    Stopped,
    Running {
        shutdown: watch::Sender<bool>,
        handle: JoinHandle<()>,
    },
}

/// Background loop that fires due occurrences.
///
/// `start` and `stop` are the only state mutators. The state lock is held
/// for the whole transition, so at most one loop exists at any time.
pub struct Dispatcher {
    store: Arc<ReminderStore>,
    deliverer: Arc<dyn Deliverer>,
    interval: Duration,
    state: Mutex<DispatcherState>,
}

impl Dispatcher {
    pub fn new(store: Arc<ReminderStore>, deliverer: Arc<dyn Deliverer>, interval: Duration) -> Self {
        Self {
            store,
            deliverer,
            interval,
            state: Mutex::new(DispatcherState::Stopped),
        }
    }

    /// Start polling. Any previous loop is stopped first.
    pub async fn start(&self) {
        let mut state = self.state.lock().await;
        shutdown(&mut state).await;

        match self.store.overdue_count(Utc::now()) {
            Ok(0) => {}
            Ok(n) => info!(count = n, "overdue occurrences will be delivered on first tick"),
            Err(e) => warn!("overdue scan failed: {e}"),
        }

        let (tx, mut rx) = watch::channel(false);
        let store = Arc::clone(&self.store);
        let deliverer = Arc::clone(&self.deliverer);
        let period = self.interval;

        let handle = tokio::spawn(async move {
            info!(interval_ms = period.as_millis() as u64, "dispatcher started");
            let mut interval = tokio::time::interval(period);
            interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
            loop {
                tokio::select! {
                    _ = interval.tick() => {
                        let report = tick(&store, deliverer.as_ref(), Utc::now()).await;
                        if report != TickReport::default() {
                            debug!(?report, "dispatcher tick");
                        }
                    }
                    _ = rx.changed() => {
                        if *rx.borrow() {
                            info!("dispatcher stopping");
                            break;
                        }
                    }
                }
            }
        });

        *state = DispatcherState::Running {
            shutdown: tx,
            handle,
        };
    }

    /// Stop polling. Waits for an in-flight tick to finish; never interrupts it.
    pub async fn stop(&self) {
        let mut state = self.state.lock().await;
        shutdown(&mut state).await;
    }

    pub async fn is_running(&self) -> bool {
        matches!(*self.state.lock().await, DispatcherState::Running { .. })
    }

    /// Run one pass at `now` outside the background loop.
    pub async fn tick_at(&self, now: DateTime<Utc>) -> TickReport {
        tick(&self.store, self.deliverer.as_ref(), now).await
    }
}

async fn shutdown(state: &mut DispatcherState) {
    if let DispatcherState::Running { shutdown, handle } =
        std::mem::replace(state, DispatcherState::Stopped)
    {
        let _ = shutdown.send(true);
        if let Err(e) = handle.await {
            error!("dispatcher task ended abnormally: {e}");
        }
    }
}

/// One pass: deliver every due occurrence oldest first, mark it, and queue
/// the next occurrence of recurring reminders. Failures are per occurrence.
async fn tick(store: &ReminderStore, deliverer: &dyn Deliverer, now: DateTime<Utc>) -> TickReport {
    let mut report = TickReport::default();

    let due = match store.find_due(now) {
        Ok(due) => due,
        Err(e) => {
            error!("due scan failed: {e}");
            return report;
        }
    };

    for Due {
        reminder,
        occurrence,
    } in due
    {
        if let Err(e) = deliverer.deliver(&reminder, &occurrence).await {
            warn!(reminder_id = %reminder.id, occurrence_id = %occurrence.id, "{e}");
            report.failed += 1;
            continue;
        }

        match store.mark_delivered(&occurrence.id) {
            Ok(true) => report.delivered += 1,
            Ok(false) => {
                debug!(occurrence_id = %occurrence.id, "already delivered");
                continue;
            }
            Err(e) => {
                error!(occurrence_id = %occurrence.id, "mark delivered failed: {e}");
                continue;
            }
        }
        info!(reminder_id = %reminder.id, occurrence_id = %occurrence.id, "reminder delivered");

        // Snoozed repeats are one-offs; the cadence continues from its own occurrences.
        if !reminder.is_recurring() || occurrence.snoozed {
            continue;
        }
        let after = occurrence.occurrence_time.max(now);
        let next = match next_after(
            &reminder.recurrence,
            occurrence.occurrence_time,
            after,
            reminder.location(),
        ) {
            Ok(Some(next)) => next,
            Ok(None) => continue,
            Err(e) => {
                warn!(reminder_id = %reminder.id, "cannot derive next occurrence: {e}");
                continue;
            }
        };
        match store.append_occurrence(&Occurrence::new(&reminder.id, next)) {
            Ok(_) => {
                report.rescheduled += 1;
                debug!(reminder_id = %reminder.id, %next, "next occurrence queued");
            }
            Err(e) => error!(reminder_id = %reminder.id, "append occurrence failed: {e}"),
        }
    }

    report
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Datelike, TimeZone, Weekday};
    use remindbot_core::{IntervalUnit, Recurrence, Target, TimeOfDay};
    use std::sync::Mutex as StdMutex;

    #[derive(Default)]
    struct Recorder {
        sent: StdMutex<Vec<String>>,
        fail_for: Option<String>,
    }

    #[async_trait]
    impl Deliverer for Recorder {
        async fn deliver(
            &self,
            reminder: &Reminder,
            occurrence: &Occurrence,
        ) -> std::result::Result<(), DeliveryError> {
            if self.fail_for.as_deref() == Some(reminder.id.as_str()) {
                return Err(DeliveryError("platform down".into()));
            }
            self.sent.lock().unwrap().push(occurrence.id.clone());
            Ok(())
        }
    }

    fn t0() -> DateTime<Utc> {
        // Friday.
        Utc.with_ymd_and_hms(2026, 10, 16, 9, 0, 0).unwrap()
    }

    fn reminder(id: &str, recurrence: Recurrence, at: DateTime<Utc>) -> Reminder {
        Reminder {
            id: id.into(),
            team_id: "team".into(),
            owner: "alice".into(),
            target: Target::Me,
            message: "stand up".into(),
            when_expression: "every weekday at 9am".into(),
            recurrence,
            utc_offset_secs: 0,
            completed: None,
            created_at: t0() - chrono::Duration::days(1),
            occurrences: vec![Occurrence::new(id, at)],
        }
    }

    fn dispatcher(store: Arc<ReminderStore>, recorder: Arc<Recorder>) -> Dispatcher {
        Dispatcher::new(store, recorder, Duration::from_millis(10))
    }

    #[tokio::test]
    async fn recurring_reminder_gets_next_weekday() {
        let store = Arc::new(ReminderStore::open_in_memory().unwrap());
        let rule = Recurrence::Weekdays {
            at: TimeOfDay::DEFAULT,
        };
        store.upsert(&reminder("r1", rule, t0())).unwrap();
        let recorder = Arc::new(Recorder::default());
        let d = dispatcher(Arc::clone(&store), Arc::clone(&recorder));

        let report = d.tick_at(t0() + chrono::Duration::seconds(1)).await;
        assert_eq!(
            report,
            TickReport {
                delivered: 1,
                failed: 0,
                rescheduled: 1
            }
        );

        let stored = store.get("r1").unwrap().unwrap();
        let next = stored.next_pending().unwrap();
        assert_eq!(next.occurrence_time.weekday(), Weekday::Mon);
        assert_eq!(next.occurrence_time, Utc.with_ymd_and_hms(2026, 10, 19, 9, 0, 0).unwrap());

        // Nothing more is due; a second pass is a no-op.
        let again = d.tick_at(t0() + chrono::Duration::seconds(2)).await;
        assert_eq!(again, TickReport::default());
        assert_eq!(recorder.sent.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn one_shot_stays_for_history() {
        let store = Arc::new(ReminderStore::open_in_memory().unwrap());
        store
            .upsert(&reminder("r1", Recurrence::Once { at: t0() }, t0()))
            .unwrap();
        let d = dispatcher(Arc::clone(&store), Arc::new(Recorder::default()));

        let report = d.tick_at(t0()).await;
        assert_eq!(report.delivered, 1);
        assert_eq!(report.rescheduled, 0);
        let stored = store.get("r1").unwrap().unwrap();
        assert_eq!(stored.occurrences.len(), 1);
        assert!(stored.occurrences[0].delivered);
    }

    #[tokio::test]
    async fn failed_delivery_does_not_block_others() {
        let store = Arc::new(ReminderStore::open_in_memory().unwrap());
        let once = |id| reminder(id, Recurrence::Once { at: t0() }, t0());
        store.upsert(&once("bad")).unwrap();
        store.upsert(&once("good")).unwrap();
        let recorder = Arc::new(Recorder {
            fail_for: Some("bad".into()),
            ..Default::default()
        });
        let d = dispatcher(Arc::clone(&store), recorder);

        let report = d.tick_at(t0()).await;
        assert_eq!(report.delivered, 1);
        assert_eq!(report.failed, 1);
        // The failed one is still due for the next scan.
        let due = store.find_due(t0()).unwrap();
        assert_eq!(due.len(), 1);
        assert_eq!(due[0].reminder.id, "bad");
    }

    #[tokio::test]
    async fn start_twice_keeps_one_loop_and_stop_halts() {
        let store = Arc::new(ReminderStore::open_in_memory().unwrap());
        let recorder = Arc::new(Recorder::default());
        let d = dispatcher(Arc::clone(&store), Arc::clone(&recorder));

        d.start().await;
        d.start().await;
        assert!(d.is_running().await);

        let past = Utc::now() - chrono::Duration::seconds(1);
        store
            .upsert(&reminder("r1", Recurrence::Once { at: past }, past))
            .unwrap();
        tokio::time::sleep(Duration::from_millis(100)).await;

        d.stop().await;
        assert!(!d.is_running().await);
        assert_eq!(recorder.sent.lock().unwrap().len(), 1);

        let later = Utc::now() - chrono::Duration::milliseconds(1);
        store
            .upsert(&reminder("r2", Recurrence::Once { at: later }, later))
            .unwrap();
        tokio::time::sleep(Duration::from_millis(50)).await;
        assert_eq!(recorder.sent.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn snoozed_repeat_does_not_start_a_second_series() {
        let store = Arc::new(ReminderStore::open_in_memory().unwrap());
        let rule = Recurrence::Interval {
            every: 2,
            unit: IntervalUnit::Hours,
            at: None,
        };
        store.upsert(&reminder("r1", rule, t0())).unwrap();
        let d = dispatcher(Arc::clone(&store), Arc::new(Recorder::default()));

        assert_eq!(d.tick_at(t0()).await.rescheduled, 1);
        let fired = store.get("r1").unwrap().unwrap().occurrences[0].id.clone();
        let half_past = t0() + chrono::Duration::minutes(30);
        store
            .snooze("a1", "r1", &fired, &Occurrence::snoozed("r1", half_past))
            .unwrap();

        let report = d.tick_at(half_past).await;
        assert_eq!(report.delivered, 1);
        assert_eq!(report.rescheduled, 0);

        let pending: Vec<_> = store
            .get("r1")
            .unwrap()
            .unwrap()
            .occurrences
            .into_iter()
            .filter(|o| !o.delivered)
            .map(|o| o.occurrence_time)
            .collect();
        assert_eq!(pending, vec![t0() + chrono::Duration::hours(2)]);
    }

    #[tokio::test]
    async fn oversized_interval_does_not_stop_the_loop() {
        let store = Arc::new(ReminderStore::open_in_memory().unwrap());
        let recorder = Arc::new(Recorder::default());
        let d = dispatcher(Arc::clone(&store), Arc::clone(&recorder));

        let past = Utc::now() - chrono::Duration::seconds(1);
        let huge = Recurrence::Interval {
            every: u32::MAX,
            unit: IntervalUnit::Days,
            at: Some(TimeOfDay::DEFAULT),
        };
        store.upsert(&reminder("huge", huge, past)).unwrap();
        d.start().await;
        tokio::time::sleep(Duration::from_millis(50)).await;

        let later = Utc::now() - chrono::Duration::milliseconds(1);
        store
            .upsert(&reminder("good", Recurrence::Once { at: later }, later))
            .unwrap();
        tokio::time::sleep(Duration::from_millis(100)).await;
        assert!(d.is_running().await);
        d.stop().await;

        assert_eq!(recorder.sent.lock().unwrap().len(), 2);
        let good = store.get("good").unwrap().unwrap();
        assert!(good.occurrences[0].delivered);
        let huge = store.get("huge").unwrap().unwrap();
        assert_eq!(huge.occurrences.len(), 1);
    }
}
