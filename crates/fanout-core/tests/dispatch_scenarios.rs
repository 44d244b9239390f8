//! End-to-end dispatcher and reporter behaviour on synthetic work.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use fanout_core::config::{IdlePolicy, TimestampFormat};
use fanout_core::reporter::{MemorySink, ReportSink};
use fanout_core::work::{work_fn, SyntheticWork};
use fanout_core::dispatcher::DispatchState;
use fanout_core::{Dispatcher, OutcomeAggregator, Reporter};
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

/// Tracks how many work items run at the same time.
#[derive(Default)]
struct ConcurrencyProbe {
    current: AtomicUsize,
    max: AtomicUsize,
    started: AtomicUsize,
}

impl ConcurrencyProbe {
    fn enter(&self) -> usize {
        let now = self.current.fetch_add(1, Ordering::SeqCst) + 1;
        self.max.fetch_max(now, Ordering::SeqCst);
        self.started.fetch_add(1, Ordering::SeqCst) + 1
    }

    fn exit(&self) {
        self.current.fetch_sub(1, Ordering::SeqCst);
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn scenario_a_instant_success_respects_limit() {
    let probe = Arc::new(ConcurrencyProbe::default());
    let p = Arc::clone(&probe);
    let work = Arc::new(work_fn(move |_: u64| {
        let p = Arc::clone(&p);
        async move {
            p.enter();
            tokio::task::yield_now().await;
            p.exit();
            Ok(())
        }
    }));

    let summary = Dispatcher::new(50, work).run(1..=1000u64).await;

    assert_eq!(summary.successes, 1000);
    assert_eq!(summary.failures, 0);
    assert!(summary.peak_in_flight <= 50);
    assert!(probe.max.load(Ordering::SeqCst) <= 50);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn scenario_b_every_third_item_fails() {
    let work = Arc::new(SyntheticWork::new(Duration::from_millis(1), Some(3)));
    let summary = Dispatcher::new(10, work).run(1..=100u64).await;
    assert_eq!(summary.successes, 67);
    assert_eq!(summary.failures, 33);
    assert_eq!(summary.total(), 100);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrency_never_exceeds_limit_for_any_limit() {
    for limit in [1usize, 2, 7, 32] {
        let probe = Arc::new(ConcurrencyProbe::default());
        let p = Arc::clone(&probe);
        let work = Arc::new(work_fn(move |i: u64| {
            let p = Arc::clone(&p);
            async move {
                p.enter();
                tokio::time::sleep(Duration::from_micros(200)).await;
                p.exit();
                if i % 5 == 0 {
                    anyhow::bail!("item {} rejected", i);
                }
                Ok(())
            }
        }));
        let summary = Dispatcher::new(limit, work).run(1..=200u64).await;
        assert_eq!(summary.total(), 200, "limit {}", limit);
        assert_eq!(summary.failures, 40, "limit {}", limit);
        assert!(probe.max.load(Ordering::SeqCst) <= limit, "limit {}", limit);
        assert!(summary.peak_in_flight <= limit, "limit {}", limit);
    }
}

#[tokio::test(start_paused = true)]
async fn scenario_d_cancellation_drains_in_flight_only() {
    let probe = Arc::new(ConcurrencyProbe::default());
    let cancel = CancellationToken::new();
    let p = Arc::clone(&probe);
    let c = cancel.clone();
    let work = Arc::new(work_fn(move |_: u64| {
        let p = Arc::clone(&p);
        let c = c.clone();
        async move {
            if p.enter() == 40 {
                c.cancel();
            }
            tokio::time::sleep(Duration::from_millis(100)).await;
            p.exit();
            Ok(())
        }
    }));

    let summary = Dispatcher::new(50, work)
        .with_cancel(cancel)
        .run(1..=1000u64)
        .await;

    assert!(summary.cancelled);
    assert!(summary.submitted >= 40 && summary.submitted <= 50);
    assert_eq!(summary.total(), summary.submitted);
    assert_eq!(probe.started.load(Ordering::SeqCst) as u64, summary.submitted);
    assert_eq!(probe.current.load(Ordering::SeqCst), 0);
}

#[tokio::test(start_paused = true)]
async fn streaming_submit_tracks_gate_and_count() {
    let work = Arc::new(SyntheticWork::new(Duration::from_millis(50), None));
    let mut d = Dispatcher::new(3, work);
    for i in 1..=10u64 {
        d.submit(i).await.unwrap();
        assert!(d.gate().in_flight() <= 3);
        assert_eq!(d.submitted(), i);
    }
    assert_eq!(d.state(), DispatchState::Open);

    let summary = d.close().await;
    assert_eq!(d.state(), DispatchState::Closed);
    assert_eq!(d.gate().in_flight(), 0);
    assert_eq!(d.gate().available(), 3);
    assert_eq!(summary.successes, 10);
    assert_eq!(summary.peak_in_flight, 3);
}

/// Sink that records when each line was written.
#[derive(Clone, Default)]
struct TimedSink {
    lines: Arc<Mutex<Vec<(Instant, String)>>>,
}

#[async_trait]
impl ReportSink for TimedSink {
    async fn write_line(&mut self, line: &str) -> std::io::Result<()> {
        self.lines
            .lock()
            .unwrap()
            .push((Instant::now(), line.to_string()));
        Ok(())
    }
}

#[tokio::test(start_paused = true)]
async fn scenario_c_burst_separator_then_silence() {
    let agg = Arc::new(OutcomeAggregator::new());
    let sink = TimedSink::default();
    let start = Instant::now();
    let handle = Reporter::new(Arc::clone(&agg), sink.clone(), Duration::from_secs(1))
        .with_timestamp_format(TimestampFormat::EpochMillis)
        .spawn(CancellationToken::new());

    tokio::time::sleep(Duration::from_millis(300)).await;
    for _ in 0..5 {
        agg.record_success();
    }
    tokio::time::sleep_until(start + Duration::from_millis(4500)).await;
    let ticks = handle.shutdown().await;

    assert_eq!(ticks, 4);
    let lines = sink.lines.lock().unwrap().clone();
    assert_eq!(lines.len(), 2);
    assert_eq!(lines[0].0 - start, Duration::from_secs(1));
    assert!(lines[0].1.ends_with(" 5 0"));
    assert_eq!(lines[1].0 - start, Duration::from_secs(2));
    assert_eq!(lines[1].1, "");
}

#[tokio::test(start_paused = true)]
async fn reporter_ticks_stay_on_schedule() {
    let agg = Arc::new(OutcomeAggregator::new());
    let sink = TimedSink::default();
    let start = Instant::now();
    let handle = Reporter::new(Arc::clone(&agg), sink.clone(), Duration::from_millis(250))
        .with_idle_policy(IdlePolicy::EveryTick)
        .spawn(CancellationToken::new());

    // A busy neighbour that keeps waking between ticks.
    let noise = tokio::spawn(async move {
        for _ in 0..40 {
            tokio::time::sleep(Duration::from_millis(37)).await;
        }
    });
    tokio::time::sleep_until(start + Duration::from_millis(2600)).await;
    noise.await.unwrap();
    handle.shutdown().await;

    let lines = sink.lines.lock().unwrap().clone();
    assert_eq!(lines.len(), 10);
    for (i, (at, _)) in lines.iter().enumerate() {
        assert_eq!(*at - start, Duration::from_millis(250) * (i as u32 + 1));
    }
}

#[tokio::test(start_paused = true)]
async fn dispatcher_and_reporter_share_counts() {
    let agg = Arc::new(OutcomeAggregator::new());
    let sink = MemorySink::new();
    let handle = Reporter::new(Arc::clone(&agg), sink.clone(), Duration::from_secs(1))
        .with_timestamp_format(TimestampFormat::EpochMillis)
        .spawn(CancellationToken::new());

    let work = Arc::new(SyntheticWork::new(Duration::from_millis(300), Some(4)));
    let summary = Dispatcher::new(4, work)
        .with_aggregator(Arc::clone(&agg))
        .run(1..=40u64)
        .await;
    tokio::time::sleep(Duration::from_secs(3)).await;
    handle.shutdown().await;

    assert_eq!(summary.successes, 30);
    assert_eq!(summary.failures, 10);

    let mut reported = (0u64, 0u64);
    for line in sink.lines().iter().filter(|l| !l.is_empty()) {
        let parts: Vec<&str> = line.split(' ').collect();
        assert_eq!(parts.len(), 3);
        reported.0 += parts[1].parse::<u64>().unwrap();
        reported.1 += parts[2].parse::<u64>().unwrap();
    }
    assert_eq!(reported, (30, 10));
    assert_eq!(sink.lines().last().map(String::as_str), Some(""));
}
