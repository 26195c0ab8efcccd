//! Event loop turn semantics, clocks, and configuration.

#![allow(missing_docs)]

mod common;

use common::*;
use pacer::runtime::{EventLoop, LoopConfig, Scheduler};
use pacer::time::{sleep, timeout, VirtualClock, WallClock};
use pacer::{ErrorKind, PacerConfig, Time};
use std::cell::RefCell;
use std::rc::Rc;
use std::sync::Arc;
use std::time::{Duration, Instant};

fn init_test(test_name: &str) {
    init_test_logging();
    test_phase!(test_name);
}

#[test]
fn tasks_drain_before_each_timer() {
    init_test("tasks_drain_before_each_timer");
    let lp = virtual_loop();
    let handle = lp.handle();
    let order = Rc::new(RefCell::new(Vec::new()));

    for (label, ms) in [("timer-b", 20_u64), ("timer-a", 10)] {
        let order = Rc::clone(&order);
        let spawner = handle.clone();
        handle.schedule(
            Duration::from_millis(ms),
            Box::new(move || {
                order.borrow_mut().push(label);
                let order = Rc::clone(&order);
                drop(spawner.spawn(async move {
                    order.borrow_mut().push("task");
                }));
            }),
        );
    }

    let stats = lp.run_until_idle().unwrap();
    assert_with_log!(
        *order.borrow() == vec!["timer-a", "task", "timer-b", "task"],
        "microtasks run between timers",
        vec!["timer-a", "task", "timer-b", "task"],
        order.borrow()
    );
    assert_with_log!(stats.timers_fired == 2, "two timers", 2, stats.timers_fired);
    assert_with_log!(stats.tasks_completed == 2, "two tasks", 2, stats.tasks_completed);
    test_complete!("tasks_drain_before_each_timer");
}

#[test]
fn free_sleep_and_timeout_work_with_any_scheduler() {
    init_test("free_sleep_and_timeout_work_with_any_scheduler");
    let lp = virtual_loop();
    let handle = lp.handle();
    let out = lp
        .block_on(async {
            sleep(&handle, Duration::from_millis(30)).await;
            timeout(&handle, Duration::from_millis(50), async { 7 }).await
        })
        .unwrap();
    assert_with_log!(out == Ok(7), "operation beat the deadline", Ok::<i32, ()>(7), out);
    assert_with_log!(now_ms(&lp) == 30, "only the sleep advanced time", 30, now_ms(&lp));
    test_complete!("free_sleep_and_timeout_work_with_any_scheduler");
}

#[test]
fn stalled_future_is_reported() {
    init_test("stalled_future_is_reported");
    let lp = virtual_loop();
    let err = lp.block_on(std::future::pending::<()>()).unwrap_err();
    assert_with_log!(err.kind() == ErrorKind::Stalled, "stalled", ErrorKind::Stalled, err.kind());
    test_complete!("stalled_future_is_reported");
}

#[test]
fn configured_step_limit_stops_livelock() {
    init_test("configured_step_limit_stops_livelock");
    let mut config = PacerConfig::default();
    config
        .apply_overrides_from(|name| (name == "PACER_MAX_STEPS").then(|| "50".to_string()))
        .unwrap();
    config.validate().unwrap();
    let lp = EventLoop::with_config(config.event_loop, Arc::new(VirtualClock::new()));
    let handle = lp.handle();

    fn rearm(handle: pacer::Handle) {
        let next = handle.clone();
        handle.schedule(Duration::ZERO, Box::new(move || rearm(next)));
    }
    rearm(handle);

    let err = lp.run_until_idle().unwrap_err();
    assert_with_log!(
        err.kind() == ErrorKind::StepLimitExceeded,
        "livelock cut off",
        ErrorKind::StepLimitExceeded,
        err.kind()
    );
    test_complete!("configured_step_limit_stops_livelock");
}

#[test]
fn no_step_limit_runs_long_timer_chains() {
    init_test("no_step_limit_runs_long_timer_chains");
    let lp = EventLoop::with_config(LoopConfig::new().no_step_limit(), Arc::new(VirtualClock::new()));
    let handle = lp.handle();
    let count = Rc::new(RefCell::new(0_u32));

    fn chain(handle: pacer::Handle, count: Rc<RefCell<u32>>, left: u32) {
        if left == 0 {
            return;
        }
        let next = handle.clone();
        handle.schedule(
            Duration::from_millis(1),
            Box::new(move || {
                *count.borrow_mut() += 1;
                chain(next, count, left - 1);
            }),
        );
    }
    chain(handle, Rc::clone(&count), 5_000);

    lp.run_until_idle().unwrap();
    assert_with_log!(*count.borrow() == 5_000, "every link ran", 5_000, *count.borrow());
    assert_with_log!(lp.now() == Time::from_millis(5_000), "clock followed", 5_000, now_ms(&lp));
    test_complete!("no_step_limit_runs_long_timer_chains");
}

#[test]
fn wall_clock_loop_really_waits() {
    init_test("wall_clock_loop_really_waits");
    let lp = EventLoop::with_clock(Arc::new(WallClock::new()));
    let handle = lp.handle();
    let started = Instant::now();
    lp.block_on(handle.sleep(Duration::from_millis(15))).unwrap();
    let waited = started.elapsed();
    assert_with_log!(
        waited >= Duration::from_millis(15),
        "blocked for the sleep",
        Duration::from_millis(15),
        waited
    );
    test_complete!("wall_clock_loop_really_waits");
}

#[test]
fn advance_leaves_clock_at_target() {
    init_test("advance_leaves_clock_at_target");
    let lp = virtual_loop();
    let handle = lp.handle();
    let fired = Rc::new(RefCell::new(Vec::new()));
    for ms in [5_u64, 25, 40] {
        let fired = Rc::clone(&fired);
        handle.schedule(Duration::from_millis(ms), Box::new(move || fired.borrow_mut().push(ms)));
    }
    lp.advance(Duration::from_millis(25)).unwrap();
    assert_with_log!(*fired.borrow() == vec![5, 25], "due timers ran", vec![5, 25], fired.borrow());
    assert_with_log!(now_ms(&lp) == 25, "clock at target", 25, now_ms(&lp));
    assert_with_log!(handle.pending_timers() == 1, "later timer kept", 1, handle.pending_timers());
    test_complete!("advance_leaves_clock_at_target");
}
