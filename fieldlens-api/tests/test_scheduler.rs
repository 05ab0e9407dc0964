//! Scheduler sleep/wake behavior through the public policy API.

use fieldlens::schedule::{PollPolicy, PollState, effective_interval};
use std::time::Duration;

#[test]
fn test_sleeps_after_ten_untriggered_ticks() {
    let mut policy = PollPolicy::new(true);
    for tick in 1..=10 {
        assert!(policy.tick_begin(), "tick {tick} should run");
        policy.tick_end();
        if tick < 10 {
            assert_eq!(policy.state(), PollState::Polling, "still polling at {tick}");
        }
    }
    assert_eq!(policy.state(), PollState::Sleeping);
    assert!(!policy.tick_begin());
}

#[test]
fn test_single_trigger_prevents_sleep_for_a_full_span() {
    let mut policy = PollPolicy::new(true);
    for _ in 0..9 {
        policy.tick_begin();
        policy.tick_end();
    }
    policy.external_trigger();

    // nine more ticks: counter restarted, still awake
    for _ in 0..9 {
        policy.tick_begin();
        policy.tick_end();
    }
    assert_eq!(policy.state(), PollState::Polling);

    // the tenth untriggered tick finally sleeps
    policy.tick_begin();
    policy.tick_end();
    assert_eq!(policy.state(), PollState::Sleeping);
}

#[test]
fn test_trigger_wakes_and_resets() {
    let mut policy = PollPolicy::new(true);
    for _ in 0..10 {
        policy.tick_begin();
        policy.tick_end();
    }
    assert_eq!(policy.state(), PollState::Sleeping);

    assert!(policy.external_trigger(), "waking returns true");
    assert_eq!(policy.state(), PollState::Polling);
    assert_eq!(policy.runs(), 0);
}

#[test]
fn test_interval_configuration() {
    // 0 disables polling permanently until reconfigured
    assert_eq!(effective_interval(0), None);
    // 1-4 clamp to the 5 second minimum
    for secs in 1..=4 {
        assert_eq!(effective_interval(secs), Some(Duration::from_secs(5)));
    }
    assert_eq!(effective_interval(60), Some(Duration::from_secs(60)));
}
