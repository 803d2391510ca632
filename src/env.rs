use std::{cell::RefCell, ffi::OsStr};

#[derive(Clone, Copy, Debug, Default)]
struct Env {
    minimal: bool,
    step_limit: Option<u64>,
}

thread_local! {
    /// Must only be mutated within `set_env`
    static ENV: RefCell<Option<Env>> = const { RefCell::new(None) };
}

/// Read `LC3VM_*` variables from the process environment.
pub fn init() {
    let value = Env {
        minimal: var_is("LC3VM_MINIMAL", "1"),
        step_limit: var_parse("LC3VM_STEP_LIMIT"),
    };
    set_env(value);
}

pub fn is_minimal() -> bool {
    with_env(|env| env.minimal)
}

/// Instruction budget to use when none is given on the command line.
pub fn step_limit() -> Option<u64> {
    with_env(|env| env.step_limit)
}

fn set_env(value: Env) {
    ENV.with(|env| {
        let mut env = env.borrow_mut();
        assert!(
            env.is_none(),
            "tried to initialize environment state multiple times"
        );
        *env = Some(value);
    });
}

fn with_env<F, R>(callback: F) -> R
where
    F: Fn(&Env) -> R,
{
    ENV.with(|env| {
        let env = env.borrow();
        let env = env.unwrap_or_else(|| {
            panic!("tried to access environment state before initialization");
        });
        callback(&env)
    })
}

fn var_is(name: impl AsRef<OsStr>, value: impl AsRef<str>) -> bool {
    std::env::var(name.as_ref()).is_ok_and(|v| v == value.as_ref())
}

fn var_parse(name: impl AsRef<OsStr>) -> Option<u64> {
    std::env::var(name.as_ref()).ok()?.trim().parse().ok()
}
