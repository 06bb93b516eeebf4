pub mod variables;

pub use variables::{evaluate, resolve, resolve_with, EvalError, ResolveError, ResolveOptions};

pub fn version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
