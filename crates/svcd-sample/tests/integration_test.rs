use std::time::Duration;
use svcd::ServiceId;
use svcd_sample::example_service::SOURCE_EVENTS;
use svcd_sample::{run_example_with, ExampleSystem};

/// Full run of the example system with a fast event source.
#[tokio::test]
async fn test_every_service_receives_every_event() {
    let run = run_example_with(Duration::from_millis(5), Duration::from_millis(500))
        .await
        .expect("example system runs");

    let ids: Vec<ServiceId> = (0..4).map(ServiceId).collect();
    assert_eq!(run.report.order, ids);
    assert!(run.report.failures.is_empty(), "{:?}", run.report.failures);
    assert_eq!(run.report.routed, u64::from(SOURCE_EVENTS));
    assert_eq!(run.report.unrouted, 0);

    for id in ids {
        assert_eq!(run.received[&id], SOURCE_EVENTS as usize, "service {id}");
    }
}

#[tokio::test]
async fn test_shutdown_stops_the_event_source() {
    let system = ExampleSystem::start(Duration::from_secs(60))
        .await
        .expect("example system starts");
    assert!(system.received().values().all(|&n| n == 0));

    let run = tokio::time::timeout(Duration::from_secs(5), system.shutdown())
        .await
        .expect("shutdown does not wait for the source")
        .expect("clean shutdown");
    assert_eq!(run.report.routed, 0);
    assert!(run.report.failures.is_empty());
}
