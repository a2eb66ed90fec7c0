//! Debug-only tracing verbosity, shared by the interpreter, the axe engine
//! and the grammar compiler.
//!
//! Mirrors the teacher's `Log<T>` (`util/logger.rs`): a cheap level enum that
//! carries an optional label, compared by [Log::order] so call sites can
//! write `if level.order() >= Log::Verbose(()).order() { ... }` and have the
//! whole check compile away outside `#[cfg(debug_assertions)]` builds.
use std::fmt::{Display, Formatter};

#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub enum Log<T> {
    None,
    Default(T),
    Success(T),
    Result(T),
    Verbose(T),
}

impl<T> Log<T> {
    pub fn order(&self) -> u8 {
        match self {
            Log::None => 0,
            Log::Default(_) => 1,
            Log::Success(_) => 2,
            Log::Result(_) => 3,
            Log::Verbose(_) => 4,
        }
    }
}

impl<T: Display> Display for Log<T> {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Log::None => Ok(()),
            Log::Default(s) | Log::Success(s) | Log::Result(s) | Log::Verbose(s) => {
                write!(f, "{}", s)
            }
        }
    }
}
