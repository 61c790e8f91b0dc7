use super::{
    CounterStore, Decision, DropReason, EvaluationMode, LimitConfig, Metric, OverflowPolicy,
    ShutdownReason, ThresholdEvaluator,
};

fn record_pages(store: &CounterStore, host: &str, n: usize) {
    for _ in 0..n {
        store.record_page(host);
    }
}

fn record_items(store: &CounterStore, host: &str, n: usize) {
    for _ in 0..n {
        store.record_item(host);
    }
}

#[test]
fn test_missing_limits_allow() {
    let store = CounterStore::new();
    record_pages(&store, "example.com", 1000);

    let evaluator = ThresholdEvaluator::per_request();
    assert_eq!(evaluator.evaluate(&store, None, "example.com"), Decision::Allow);
    assert_eq!(
        evaluator.evaluate(&store, Some(&LimitConfig::new()), "example.com"),
        Decision::Allow
    );
}

#[test]
fn test_zero_limits_never_overflow() {
    let store = CounterStore::new();
    record_pages(&store, "example.com", 50);
    record_items(&store, "example.com", 50);

    let limits = LimitConfig::new()
        .with_page_count(0)
        .with_item_count(0)
        .with_page_host_count(0)
        .with_item_host_count(0);

    for evaluator in [
        ThresholdEvaluator::per_request(),
        ThresholdEvaluator::whole_job(),
        ThresholdEvaluator::new(
            EvaluationMode::PerRequest { shutdown: true },
            OverflowPolicy::AllConfigured,
        ),
    ] {
        let overflow = evaluator.overflow(&store, &limits, "example.com");
        assert!(!overflow.any());
        assert_eq!(evaluator.evaluate(&store, Some(&limits), "example.com"), Decision::Allow);
    }
}

#[test]
fn test_limit_reached_exactly_overflows() {
    let store = CounterStore::new();
    let evaluator = ThresholdEvaluator::per_request();
    let limits = LimitConfig::new().with_page_count(3);

    record_pages(&store, "example.com", 2);
    assert!(!evaluator.overflow(&store, &limits, "example.com").page_count);
    assert_eq!(evaluator.evaluate(&store, Some(&limits), "example.com"), Decision::Allow);

    record_pages(&store, "example.com", 1);
    assert!(evaluator.overflow(&store, &limits, "example.com").page_count);
    assert_eq!(
        evaluator.evaluate(&store, Some(&limits), "example.com"),
        Decision::Drop(DropReason::PageCount)
    );

    record_pages(&store, "example.com", 1);
    assert!(evaluator.overflow(&store, &limits, "example.com").page_count);
}

#[test]
fn test_drop_priority_order() {
    let store = CounterStore::new();
    let evaluator = ThresholdEvaluator::per_request();
    record_pages(&store, "example.com", 2);
    record_items(&store, "example.com", 2);

    let all = LimitConfig::new()
        .with_page_count(1)
        .with_item_count(1)
        .with_page_host_count(1)
        .with_item_host_count(1);
    assert_eq!(
        evaluator.evaluate(&store, Some(&all), "example.com"),
        Decision::Drop(DropReason::PageCount)
    );

    let without_page = LimitConfig { page_count: None, ..all };
    assert_eq!(
        evaluator.evaluate(&store, Some(&without_page), "example.com"),
        Decision::Drop(DropReason::ItemCount)
    );

    let host_only = LimitConfig::new().with_page_host_count(1).with_item_host_count(1);
    assert_eq!(
        evaluator.evaluate(&store, Some(&host_only), "example.com"),
        Decision::Drop(DropReason::PageHostCount)
    );

    let item_host_only = LimitConfig::new().with_item_host_count(2);
    assert_eq!(
        evaluator.evaluate(&store, Some(&item_host_only), "example.com"),
        Decision::Drop(DropReason::ItemHostCount)
    );
}

#[test]
fn test_per_host_limits_only_affect_that_host() {
    let store = CounterStore::new();
    let evaluator = ThresholdEvaluator::per_request();
    let limits = LimitConfig::new().with_page_host_count(2);

    record_pages(&store, "a.com", 2);
    record_pages(&store, "b.com", 1);

    assert_eq!(
        evaluator.evaluate(&store, Some(&limits), "a.com"),
        Decision::Drop(DropReason::PageHostCount)
    );
    assert_eq!(evaluator.evaluate(&store, Some(&limits), "b.com"), Decision::Allow);
    assert_eq!(evaluator.evaluate(&store, Some(&limits), "c.com"), Decision::Allow);
}

#[test]
fn test_shutdown_takes_priority_over_drop() {
    let store = CounterStore::new();
    let evaluator = ThresholdEvaluator::new(
        EvaluationMode::PerRequest { shutdown: true },
        OverflowPolicy::AllConfigured,
    );
    let limits = LimitConfig::new().with_page_count(1).with_item_count(1);

    record_pages(&store, "example.com", 1);
    assert_eq!(
        evaluator.evaluate(&store, Some(&limits), "example.com"),
        Decision::Drop(DropReason::PageCount)
    );

    record_items(&store, "example.com", 1);
    assert_eq!(
        evaluator.evaluate(&store, Some(&limits), "example.com"),
        Decision::ShutDown(ShutdownReason::CountersOverflow)
    );
}

#[test]
fn test_per_request_without_shutdown_never_shuts_down() {
    let store = CounterStore::new();
    let evaluator = ThresholdEvaluator::per_request();
    let limits = LimitConfig::new().with_page_count(1).with_item_count(1);

    record_pages(&store, "example.com", 5);
    record_items(&store, "example.com", 5);

    assert_eq!(
        evaluator.evaluate(&store, Some(&limits), "example.com"),
        Decision::Drop(DropReason::PageCount)
    );
}

#[test]
fn test_all_configured_policy_skips_disabled_metrics() {
    let store = CounterStore::new();
    let evaluator = ThresholdEvaluator::new(
        EvaluationMode::PerRequest { shutdown: true },
        OverflowPolicy::AllConfigured,
    );
    let limits = LimitConfig::new().with_page_host_count(1);

    record_pages(&store, "example.com", 1);
    assert_eq!(
        evaluator.evaluate(&store, Some(&limits), "example.com"),
        Decision::ShutDown(ShutdownReason::CountersOverflow)
    );
    // The same counts seen from another host are not a total overflow
    assert_eq!(evaluator.evaluate(&store, Some(&limits), "other.com"), Decision::Allow);
}

#[test]
fn test_require_all_configured_policy() {
    let store = CounterStore::new();
    let evaluator = ThresholdEvaluator::new(
        EvaluationMode::PerRequest { shutdown: true },
        OverflowPolicy::RequireAllConfigured,
    );
    let partial = LimitConfig::new().with_page_count(1).with_item_count(1);

    record_pages(&store, "example.com", 1);
    record_items(&store, "example.com", 1);

    // Two metrics unset: only drops, never a shutdown
    assert_eq!(
        evaluator.evaluate(&store, Some(&partial), "example.com"),
        Decision::Drop(DropReason::PageCount)
    );

    let full = partial.with_page_host_count(1).with_item_host_count(1);
    assert_eq!(
        evaluator.evaluate(&store, Some(&full), "example.com"),
        Decision::ShutDown(ShutdownReason::CountersOverflow)
    );
}

#[test]
fn test_any_policy_per_request() {
    let store = CounterStore::new();
    let evaluator = ThresholdEvaluator::new(
        EvaluationMode::PerRequest { shutdown: true },
        OverflowPolicy::Any,
    );
    let limits = LimitConfig::new().with_page_count(10).with_item_host_count(1);

    record_items(&store, "example.com", 1);
    assert_eq!(
        evaluator.evaluate(&store, Some(&limits), "example.com"),
        Decision::ShutDown(ShutdownReason::CountersOverflow)
    );
}

#[test]
fn test_whole_job_ignores_host_limits() {
    let store = CounterStore::new();
    let evaluator = ThresholdEvaluator::whole_job();
    let limits = LimitConfig::new().with_page_host_count(1).with_item_host_count(1);

    record_pages(&store, "example.com", 10);
    record_items(&store, "example.com", 10);

    assert_eq!(evaluator.evaluate(&store, Some(&limits), "example.com"), Decision::Allow);
}

#[test]
fn test_whole_job_only_allows_or_shuts_down() {
    let store = CounterStore::new();
    let evaluator = ThresholdEvaluator::whole_job();
    let limits = LimitConfig::new().with_page_count(2).with_item_count(5);

    record_pages(&store, "example.com", 1);
    assert_eq!(evaluator.evaluate(&store, Some(&limits), "example.com"), Decision::Allow);

    record_pages(&store, "example.com", 1);
    assert_eq!(
        evaluator.evaluate(&store, Some(&limits), ""),
        Decision::ShutDown(ShutdownReason::GlobalCountersOverflow)
    );
}

#[test]
fn test_whole_job_policy_variants() {
    // One page against {page_count: 1, item_count: 1}
    let store = CounterStore::new();
    let limits = LimitConfig::new().with_page_count(1).with_item_count(1);
    record_pages(&store, "example.com", 1);

    let any = ThresholdEvaluator::new(EvaluationMode::WholeJob, OverflowPolicy::Any);
    let all = ThresholdEvaluator::new(EvaluationMode::WholeJob, OverflowPolicy::AllConfigured);
    let required =
        ThresholdEvaluator::new(EvaluationMode::WholeJob, OverflowPolicy::RequireAllConfigured);

    assert_eq!(
        any.evaluate(&store, Some(&limits), "example.com"),
        Decision::ShutDown(ShutdownReason::GlobalCountersOverflow)
    );
    assert_eq!(all.evaluate(&store, Some(&limits), "example.com"), Decision::Allow);
    assert_eq!(required.evaluate(&store, Some(&limits), "example.com"), Decision::Allow);

    record_items(&store, "example.com", 1);
    assert!(!all.evaluate(&store, Some(&limits), "example.com").is_allowed());
    assert!(!required.evaluate(&store, Some(&limits), "example.com").is_allowed());
}

#[test]
fn test_total_overflow_with_nothing_enabled() {
    let evaluator = ThresholdEvaluator::new(
        EvaluationMode::PerRequest { shutdown: true },
        OverflowPolicy::AllConfigured,
    );
    let overflow = Default::default();

    assert!(!evaluator.total_overflow(&LimitConfig::new(), &overflow));
}

#[test]
fn test_reason_strings_are_stable() {
    assert_eq!(DropReason::PageCount.as_str(), "page_count_filter");
    assert_eq!(DropReason::ItemCount.as_str(), "item_count_filter");
    assert_eq!(DropReason::PageHostCount.as_str(), "page_host_count_filter");
    assert_eq!(DropReason::ItemHostCount.as_str(), "item_host_count_filter");
    assert_eq!(
        DropReason::PageCount.stats_key(),
        "dropped_requests/page_count_filtering"
    );
    assert_eq!(DropReason::ItemHostCount.metric(), Metric::ItemHostCount);

    assert_eq!(ShutdownReason::CountersOverflow.as_str(), "counters_overflow");
    assert_eq!(
        ShutdownReason::CountersOverflow.close_reason(),
        "closespider_counters_overflow"
    );
    assert_eq!(
        ShutdownReason::GlobalCountersOverflow.close_reason(),
        "closespider_global_counters_overflow"
    );

    assert_eq!(Decision::Allow.reason(), None);
    assert_eq!(
        Decision::Drop(DropReason::ItemCount).reason(),
        Some("item_count_filter")
    );
}
