//! End-to-end runner sequencing (spec.md §4.6, §8 scenario 8), using the
//! crate's own capture facility to check the stable console line format.

#![cfg(all(target_arch = "x86_64", unix))]

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use tapi::capture::{Capture, StdStream};
use tapi::sink::Sink;
use tapi::{Runner, Test};

#[inline(never)]
extern "C" fn target() -> i32 {
    1
}

#[inline(never)]
extern "C" fn replacement() -> i32 {
    99
}

#[inline(never)]
extern "C" fn caller() -> i32 {
    target()
}

#[test]
fn run_tests_sequences_mocks_and_prints_the_stable_format() {
    let order = Arc::new(AtomicUsize::new(0));
    let setup_seen = order.clone();
    let teardown_seen = order.clone();

    let mut test = Test::new("mocked_caller", || caller() == 99)
        .with_setup(move || {
            setup_seen.fetch_add(1, Ordering::SeqCst);
        })
        .with_teardown(move || {
            teardown_seen.fetch_add(1, Ordering::SeqCst);
        });

    unsafe {
        test.add_mock(
            caller as usize as *const u8,
            target as usize as *const u8,
            replacement as usize as *const u8,
        );
    }

    let mut runner = Runner::new();
    runner.add_test(test);

    let mut sink = Sink::new();
    sink.set_buffer(256);
    let capture = Capture::make(StdStream::Stdout).expect("capture begins");
    let passed = runner.run_tests();
    capture.end(&mut sink);

    assert_eq!(passed, 1);
    assert_eq!(order.load(Ordering::SeqCst), 2);
    assert_eq!(caller(), 1, "the mock must have been restored after the test ran");

    let output = String::from_utf8(sink.buffer().unwrap().to_vec()).unwrap();
    assert_eq!(
        output,
        "[1/1] tapi: mocked_caller, passed.\ntapi; total tests passed: [1/1].\n"
    );
}
