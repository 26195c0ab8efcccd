//! Promise-style combinators over virtual-time futures.
//!
//! # Properties Tested
//!
//! - `all` fails fast and preserves input order
//! - `all_settled` never rejects and serializes as status-tagged records
//! - `race` settles with the earliest input
//! - `any` takes the first success or aggregates every failure
//! - Randomized delays never reorder `all` results

#![allow(missing_docs)]

mod common;

use common::*;
use futures_lite::future::FutureExt;
use pacer::combinator::{all, all_settled, any, race, reject, resolve, Settled};
use pacer::runtime::Handle;
use pacer::{ErrorKind, Time};
use proptest::prelude::*;
use std::future::Future;
use std::pin::Pin;

fn init_test(test_name: &str) {
    init_test_logging();
    test_phase!(test_name);
}

type Input<T> = Pin<Box<dyn Future<Output = Result<T, String>>>>;

fn ok_after<T: 'static>(handle: &Handle, ms: u64, value: T) -> Input<T> {
    resolve_after(handle, ms, value).boxed_local()
}

fn err_after<T: 'static>(handle: &Handle, ms: u64, reason: &str) -> Input<T> {
    reject_after(handle, ms, reason).boxed_local()
}

#[test]
fn all_rejects_with_first_failure_without_waiting() {
    init_test("all_rejects_with_first_failure_without_waiting");
    let lp = virtual_loop();
    let handle = lp.handle();
    let inputs: Vec<Input<i32>> = vec![
        resolve(1).boxed_local(),
        reject("x".to_string()).boxed_local(),
        ok_after(&handle, 1_000, 3),
    ];
    let out = lp.block_on(all(inputs)).unwrap();
    assert_with_log!(out == Err("x".to_string()), "rejects with x", "Err(x)", out);
    assert_with_log!(lp.now() == Time::ZERO, "did not wait for slow input", Time::ZERO, lp.now());
    test_complete!("all_rejects_with_first_failure_without_waiting");
}

#[test]
fn all_preserves_input_order() {
    init_test("all_preserves_input_order");
    let lp = virtual_loop();
    let handle = lp.handle();
    let out = lp
        .block_on(all(vec![ok_after(&handle, 300, "A"), ok_after(&handle, 20, "B")]))
        .unwrap();
    assert_with_log!(out == Ok(vec!["A", "B"]), "input order", "Ok([A, B])", out);
    assert_with_log!(now_ms(&lp) == 300, "waited for slowest", 300, now_ms(&lp));
    test_complete!("all_preserves_input_order");
}

#[test]
fn all_settled_reports_every_outcome() {
    init_test("all_settled_reports_every_outcome");
    let lp = virtual_loop();
    let out = lp
        .block_on(all_settled(vec![resolve(1).boxed_local(), reject("e").boxed_local()]))
        .unwrap();
    assert_with_log!(
        out == vec![Settled::Fulfilled { value: 1 }, Settled::Rejected { reason: "e" }],
        "settled records",
        "[fulfilled 1, rejected e]",
        out
    );
    let json = serde_json::to_string(&out).unwrap();
    assert_with_log!(
        json == r#"[{"status":"fulfilled","value":1},{"status":"rejected","reason":"e"}]"#,
        "status-tagged json",
        r#"[{"status":"fulfilled","value":1},{"status":"rejected","reason":"e"}]"#,
        json
    );
    test_complete!("all_settled_reports_every_outcome");
}

#[test]
fn all_settled_waits_for_slow_failures() {
    init_test("all_settled_waits_for_slow_failures");
    let lp = virtual_loop();
    let handle = lp.handle();
    let out = lp
        .block_on(all_settled(vec![
            err_after::<u8>(&handle, 80, "late"),
            ok_after(&handle, 10, 2),
        ]))
        .unwrap();
    let rejected = out[0].is_rejected();
    assert_with_log!(rejected, "slow failure captured", true, rejected);
    assert_eq!(out[1].value(), Some(&2));
    assert_with_log!(now_ms(&lp) == 80, "waited for every input", 80, now_ms(&lp));
    test_complete!("all_settled_waits_for_slow_failures");
}

#[test]
fn race_resolves_with_fastest() {
    init_test("race_resolves_with_fastest");
    let lp = virtual_loop();
    let handle = lp.handle();
    let out = lp
        .block_on(race(vec![ok_after(&handle, 500, "slow"), ok_after(&handle, 100, "fast")]))
        .unwrap();
    assert_with_log!(out == Ok("fast"), "fast wins", "Ok(fast)", out);
    assert_with_log!(now_ms(&lp) == 100, "settled at the fast deadline", 100, now_ms(&lp));
    assert_with_log!(handle.pending_timers() == 0, "loser dropped", 0, handle.pending_timers());
    test_complete!("race_resolves_with_fastest");
}

#[test]
fn race_settles_with_first_rejection_too() {
    init_test("race_settles_with_first_rejection_too");
    let lp = virtual_loop();
    let handle = lp.handle();
    let out = lp
        .block_on(race(vec![ok_after(&handle, 50, 1), err_after(&handle, 10, "first")]))
        .unwrap();
    assert_with_log!(out == Err("first".to_string()), "rejection wins", "Err(first)", out);
    test_complete!("race_settles_with_first_rejection_too");
}

#[test]
fn race_of_nothing_never_settles() {
    init_test("race_of_nothing_never_settles");
    let lp = virtual_loop();
    let err = lp.block_on(race(Vec::<Input<u8>>::new())).unwrap_err();
    assert_with_log!(err.kind() == ErrorKind::Stalled, "stalls", ErrorKind::Stalled, err.kind());
    test_complete!("race_of_nothing_never_settles");
}

#[test]
fn any_takes_first_success_or_aggregates() {
    init_test("any_takes_first_success_or_aggregates");
    let lp = virtual_loop();
    let handle = lp.handle();

    test_section!("one success among failures");
    let out = lp
        .block_on(any(vec![
            err_after::<&str>(&handle, 5, "primary down"),
            ok_after(&handle, 30, "mirror"),
        ]))
        .unwrap();
    assert_with_log!(out.as_ref().ok() == Some(&"mirror"), "mirror wins", "mirror", out);

    test_section!("every input fails");
    let out = lp
        .block_on(any(vec![
            err_after::<u8>(&handle, 30, "a"),
            err_after(&handle, 5, "b"),
        ]))
        .unwrap();
    let errors = out.unwrap_err().into_errors();
    assert_with_log!(errors == vec!["a", "b"], "index aligned errors", vec!["a", "b"], errors);
    test_complete!("any_takes_first_success_or_aggregates");
}

#[test]
fn combinators_compose_with_timeout() {
    init_test("combinators_compose_with_timeout");
    let lp = virtual_loop();
    let handle = lp.handle();
    let slow_all = all(vec![ok_after(&handle, 50, 1), ok_after(&handle, 500, 2)]);
    let out = lp.block_on(handle.timeout(std::time::Duration::from_millis(100), slow_all)).unwrap();
    let elapsed = out.unwrap_err();
    assert_with_log!(
        elapsed.deadline() == Time::from_millis(100),
        "timed out at deadline",
        Time::from_millis(100),
        elapsed.deadline()
    );
    assert_with_log!(handle.pending_timers() == 0, "inputs dropped", 0, handle.pending_timers());
    test_complete!("combinators_compose_with_timeout");
}

proptest! {
    #![proptest_config(test_proptest_config(64))]

    /// `all` returns values in input order whatever the completion order.
    #[test]
    fn all_preserves_order_for_any_delays(
        delays in proptest::collection::vec(0_u64..500, 0..20),
    ) {
        init_test_logging();
        let lp = virtual_loop();
        let handle = lp.handle();
        let inputs: Vec<Input<usize>> = delays
            .iter()
            .enumerate()
            .map(|(index, ms)| ok_after(&handle, *ms, index))
            .collect();
        let out = lp.block_on(all(inputs)).unwrap();
        prop_assert_eq!(out, Ok((0..delays.len()).collect::<Vec<_>>()));
        prop_assert_eq!(now_ms(&lp), delays.iter().copied().max().unwrap_or(0));
    }

    /// `race` settles at the minimum delay with the lowest index among ties.
    #[test]
    fn race_picks_earliest_lowest_index(
        delays in proptest::collection::vec(0_u64..500, 1..20),
    ) {
        init_test_logging();
        let lp = virtual_loop();
        let handle = lp.handle();
        let inputs: Vec<Input<usize>> = delays
            .iter()
            .enumerate()
            .map(|(index, ms)| ok_after(&handle, *ms, index))
            .collect();
        let min = delays.iter().copied().min().unwrap_or(0);
        let expected = delays.iter().position(|d| *d == min).unwrap();
        let out = lp.block_on(race(inputs)).unwrap();
        prop_assert_eq!(out, Ok(expected));
    }
}
