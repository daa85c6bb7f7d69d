//! End-to-end mock scenarios (spec.md §8, scenarios E1/E3/E5).

#![cfg(target_arch = "x86_64")]

use tapi::error::TapiError;
use tapi::mock::Mock;

#[inline(never)]
extern "C" fn target(x: i32) -> i32 {
    !x + 1
}

#[inline(never)]
extern "C" fn stub_zero() -> i32 {
    0
}

#[inline(never)]
extern "C" fn caller_e1() -> i32 {
    let r: i32 = 0x10;
    let s: i32 = -1;
    target(r + s) + 1
}

/// E1: mocking `target` to always return 0 makes the caller return 1;
/// restoring it returns the real computed value.
#[test]
fn e1_mock_returns_constant_then_restores() {
    let mut mock = unsafe {
        Mock::create(
            caller_e1 as usize as *const u8,
            target as usize as *const u8,
            stub_zero as usize as *const u8,
        )
    };

    mock.apply().expect("target is called directly from caller_e1");
    assert_eq!(caller_e1(), 1);

    mock.restore().expect("an applied mock restores cleanly");
    assert_eq!(caller_e1(), target(0x0F) + 1);
    assert_eq!(caller_e1(), -14);
}

#[inline(never)]
extern "C" fn unrelated_callee() -> i32 {
    5
}

#[inline(never)]
extern "C" fn caller_e3(f: extern "C" fn() -> i32) -> i32 {
    // An indirect call through a function-pointer parameter: no direct
    // call instruction in this body targets `unrelated_callee` even when
    // `f` happens to equal it at runtime.
    f()
}

/// E3: the callee is never reached through a direct call in the body, so
/// locating/applying a mock against it fails, and restoring an
/// unapplied mock is a logged no-op rather than a panic.
#[test]
fn e3_unpatchable_indirect_target_fails_cleanly() {
    let mut mock = unsafe {
        Mock::create(
            caller_e3 as usize as *const u8,
            unrelated_callee as usize as *const u8,
            stub_zero as usize as *const u8,
        )
    };

    assert!(matches!(mock.apply(), Err(TapiError::CallNotFound)));
    assert!(matches!(mock.restore(), Err(TapiError::RestoreUnapplied)));
}

#[inline(never)]
extern "C" fn callee_a() -> i32 {
    1
}

#[inline(never)]
extern "C" fn callee_b() -> i32 {
    2
}

#[inline(never)]
extern "C" fn stub_a() -> i32 {
    10
}

#[inline(never)]
extern "C" fn stub_b() -> i32 {
    20
}

#[inline(never)]
extern "C" fn caller_e5() -> i32 {
    callee_a() + callee_b()
}

/// E5: two mocks on the same caller, targeting two distinct callees.
/// Both applies succeed and both restores return the exact original
/// bytes at their respective call sites.
#[test]
fn e5_multi_mock_on_same_caller() {
    let mut mock_a = unsafe {
        Mock::create(
            caller_e5 as usize as *const u8,
            callee_a as usize as *const u8,
            stub_a as usize as *const u8,
        )
    };
    let mut mock_b = unsafe {
        Mock::create(
            caller_e5 as usize as *const u8,
            callee_b as usize as *const u8,
            stub_b as usize as *const u8,
        )
    };

    mock_a.apply().expect("callee_a is locatable");
    mock_b.apply().expect("callee_b is locatable");
    assert_eq!(caller_e5(), 30);

    // Restore in reverse application order, matching the runner's LIFO
    // policy.
    mock_b.restore().expect("mock_b restores");
    mock_a.restore().expect("mock_a restores");
    assert_eq!(caller_e5(), 3);
}
