use super::*;
use std::thread;

#[test]
fn test_time_limit_budget() {
    let limit = TimeLimit::from_millis(100);
    assert_eq!(limit.budget(), Duration::from_millis(100));
    assert_eq!(limit.budget_ms(), 100);
    assert_eq!(TimeLimit::new(Duration::ZERO).budget_ms(), 1);
    assert!(!limit.is_stopped());
}

#[test]
fn test_stop_is_shared_between_clones() {
    let limit = TimeLimit::from_millis(1000);
    let handle = limit.clone();
    let t = thread::spawn(move || handle.stop());
    t.join().unwrap();
    assert!(limit.is_stopped());
}

#[test]
fn test_with_budget_shares_stop_flag() {
    let eval = TimeLimit::from_millis(100);
    let top = eval.with_budget(Duration::from_secs(1));
    assert_eq!(top.budget_ms(), 1000);
    eval.stop();
    assert!(top.is_stopped());
}

#[test]
fn test_deadline_expiry() {
    let limit = TimeLimit::from_millis(10);
    let deadline = limit.start(Duration::ZERO);
    assert!(!deadline.expired());

    // Wait for time to expire
    thread::sleep(Duration::from_millis(20));
    assert!(deadline.expired());
    assert_eq!(deadline.remaining(), Duration::ZERO);
}

#[test]
fn test_capped_never_exceeds_deadline() {
    let deadline = Deadline::after(Duration::from_millis(5));
    assert!(deadline.capped(Duration::from_secs(10)) <= deadline.instant());
    let far = Deadline::after(Duration::from_secs(10));
    assert!(far.capped(Duration::from_millis(5)) < far.instant());
}
