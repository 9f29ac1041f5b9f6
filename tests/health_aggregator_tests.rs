// tests/health_aggregator_tests.rs
mod common;

use common::{StubProbe, Stubs};
use exam_health::config::Config;
use exam_health::health::{DependencyStatus, HealthAggregator, OverallStatus, ProbeSet};
use std::sync::Arc;
use std::time::Duration;

const TTL: Duration = Duration::from_secs(60);

#[tokio::test]
async fn unconfigured_dependencies_are_skipped_and_overall_ok() {
    let health = HealthAggregator::from_config(&Config::default(), None).unwrap();

    let snapshot = health.get_status(false).await;

    assert_eq!(snapshot.overall_status, OverallStatus::Ok);
    for (dependency, result) in snapshot.dependencies.iter() {
        assert_eq!(result.status, DependencyStatus::Skipped, "{}", dependency);
        assert!(result.latency_ms.is_none(), "{}", dependency);
        assert!(result
            .detail
            .as_deref()
            .unwrap()
            .ends_with("is not configured"));
    }
}

#[tokio::test]
async fn all_probes_ok_is_overall_ok() {
    let stubs = Stubs::ok();
    let snapshot = stubs.aggregator(TTL).get_status(false).await;

    assert_eq!(snapshot.overall_status, OverallStatus::Ok);
    assert_eq!(stubs.calls(), [1, 1, 1]);
}

#[tokio::test]
async fn any_single_error_is_overall_error() {
    for failing in 0..3 {
        let stubs = Stubs::ok();
        let probe = match failing {
            0 => &stubs.mail_gateway,
            1 => &stubs.object_storage,
            _ => &stubs.identity_provider,
        };
        probe.set_failing(true);

        let snapshot = stubs.aggregator(TTL).get_status(false).await;
        assert_eq!(snapshot.overall_status, OverallStatus::Error, "slot {}", failing);
    }
}

#[tokio::test]
async fn error_wins_over_skipped_and_degraded() {
    let probes = ProbeSet::new(
        StubProbe::fixed("mail", DependencyStatus::Skipped),
        StubProbe::fixed("storage", DependencyStatus::Degraded),
        StubProbe::fixed("idp", DependencyStatus::Error),
    );
    let snapshot = HealthAggregator::new(probes, TTL, None).get_status(false).await;
    assert_eq!(snapshot.overall_status, OverallStatus::Error);
}

#[tokio::test]
async fn reserved_degraded_status_is_honored() {
    let probes = ProbeSet::new(
        StubProbe::ok("mail"),
        StubProbe::fixed("storage", DependencyStatus::Degraded),
        StubProbe::fixed("idp", DependencyStatus::Skipped),
    );
    let snapshot = HealthAggregator::new(probes, TTL, None).get_status(false).await;
    assert_eq!(snapshot.overall_status, OverallStatus::Degraded);
}

#[tokio::test]
async fn mail_gateway_error_scenario_keeps_other_details() {
    let stubs = Stubs::ok();
    stubs.mail_gateway.set_failing(true);

    let snapshot = stubs.aggregator(TTL).get_status(false).await;
    let deps = &snapshot.dependencies;

    assert_eq!(snapshot.overall_status, OverallStatus::Error);
    assert_eq!(deps.mail_gateway.status, DependencyStatus::Error);
    assert_eq!(
        deps.mail_gateway.detail.as_deref(),
        Some("500 Internal Server Error")
    );
    assert_eq!(deps.object_storage.status, DependencyStatus::Ok);
    assert!(deps.object_storage.latency_ms.is_some());
    assert_eq!(deps.identity_provider.status, DependencyStatus::Ok);
    assert!(deps.identity_provider.latency_ms.is_some());
}

#[tokio::test]
async fn second_call_within_ttl_is_served_from_cache() {
    let stubs = Stubs::ok();
    let health = stubs.aggregator(TTL);

    let first = health.get_status(false).await;
    let second = health.get_status(false).await;

    assert!(Arc::ptr_eq(&first, &second));
    assert_eq!(stubs.calls(), [1, 1, 1]);
}

#[tokio::test]
async fn forced_refresh_reruns_probes_and_sees_new_failures() {
    let stubs = Stubs::ok();
    let health = stubs.aggregator(TTL);

    let first = health.get_status(false).await;
    assert_eq!(first.overall_status, OverallStatus::Ok);

    stubs.object_storage.set_failing(true);
    let second = health.get_status(true).await;

    assert_eq!(stubs.calls(), [2, 2, 2]);
    assert_eq!(second.overall_status, OverallStatus::Error);
    assert_eq!(
        second.dependencies.object_storage.status,
        DependencyStatus::Error
    );
    assert!(second.checked_at >= first.checked_at);
}

#[tokio::test(start_paused = true)]
async fn concurrent_forced_refreshes_share_one_run() {
    let stubs = Stubs::with_delay(Duration::from_millis(200));
    let health = stubs.aggregator(TTL);

    let results = futures::future::join_all((0..16).map(|_| {
        let health = health.clone();
        async move { health.get_status(true).await }
    }))
    .await;

    assert_eq!(stubs.calls(), [1, 1, 1]);
    for snapshot in &results[1..] {
        assert!(Arc::ptr_eq(&results[0], snapshot));
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_callers_across_threads_share_one_run() {
    let stubs = Stubs::with_delay(Duration::from_millis(300));
    let health = stubs.aggregator(TTL);

    let handles: Vec<_> = (0..32)
        .map(|i| {
            let health = health.clone();
            tokio::spawn(async move { health.get_status(i % 2 == 0).await })
        })
        .collect();

    let mut snapshots = Vec::new();
    for handle in handles {
        snapshots.push(handle.await.unwrap());
    }

    assert_eq!(stubs.calls(), [1, 1, 1]);
    assert!(snapshots.iter().all(|s| Arc::ptr_eq(s, &snapshots[0])));
}

#[tokio::test(start_paused = true)]
async fn stale_snapshot_is_served_until_forced() {
    let stubs = Stubs::ok();
    let health = stubs.aggregator(TTL);

    // T0
    let first = health.get_status(false).await;
    assert_eq!(first.overall_status, OverallStatus::Ok);

    // T0+30s: a dependency starts failing.
    tokio::time::advance(Duration::from_secs(30)).await;
    stubs.identity_provider.set_failing(true);

    // T0+45s: still inside the TTL.
    tokio::time::advance(Duration::from_secs(15)).await;
    let cached = health.get_status(false).await;
    assert!(Arc::ptr_eq(&first, &cached));
    assert_eq!(cached.overall_status, OverallStatus::Ok);
    assert_eq!(stubs.calls(), [1, 1, 1]);

    let forced = health.get_status(true).await;
    assert_eq!(forced.overall_status, OverallStatus::Error);
    assert_eq!(stubs.calls(), [2, 2, 2]);
}

#[tokio::test(start_paused = true)]
async fn expired_cache_triggers_single_refresh() {
    let stubs = Stubs::with_delay(Duration::from_millis(50));
    let health = stubs.aggregator(TTL);

    health.get_status(false).await;
    tokio::time::advance(Duration::from_secs(61)).await;

    futures::future::join_all((0..8).map(|_| health.get_status(false))).await;

    assert_eq!(stubs.calls(), [2, 2, 2]);
}

#[tokio::test(start_paused = true)]
async fn run_completes_when_caller_gives_up() {
    let stubs = Stubs::with_delay(Duration::from_millis(500));
    let health = stubs.aggregator(TTL);

    let gave_up = tokio::time::timeout(Duration::from_millis(10), health.get_status(true)).await;
    assert!(gave_up.is_err());
    assert!(health.current().is_none());

    tokio::time::sleep(Duration::from_secs(1)).await;

    assert!(health.current().is_some());
    let snapshot = health.get_status(false).await;
    assert_eq!(snapshot.overall_status, OverallStatus::Ok);
    assert_eq!(stubs.calls(), [1, 1, 1]);
}

#[tokio::test(start_paused = true)]
async fn caller_arriving_mid_run_joins_it() {
    let stubs = Stubs::with_delay(Duration::from_millis(500));
    let health = stubs.aggregator(TTL);

    let first = tokio::spawn({
        let health = health.clone();
        async move { health.get_status(true).await }
    });
    tokio::time::sleep(Duration::from_millis(100)).await;
    let second = health.get_status(false).await;

    assert!(Arc::ptr_eq(&first.await.unwrap(), &second));
    assert_eq!(stubs.calls(), [1, 1, 1]);
}
