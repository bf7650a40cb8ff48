//! Interception of compilation and execution, scoped by subject type.
//!
//! The subject type is the type a statement is materialized into (or the
//! entity it writes). For each subject, registered interceptors run in
//! registration order at two points:
//!
//! - `before_compile` sees the mutable container and may add parts
//! - `before_execute` sees the compiled query and may veto it
//!
//! An execution override replaces only the transport step: hooks still run.
//!
//! # Example
//!
//! ```rust,ignore
//! ctx.interceptor::<Warrior>()
//!     .before_execute(|q| println!("{}", q.sql()))
//!     .as_execute(|_| vec![Warrior { id: 1, name: "Olaf".into() }]);
//!
//! let warriors = ctx.from::<Warrior>().select()?; // no database round trip
//! ```

mod registry;
mod tracing_hook;

#[cfg(test)]
mod tests;

use crate::compiler::CompiledQuery;
use crate::parts::QueryPartsContainer;

pub use registry::{ExecuteSupplier, InterceptorBuilder, InterceptorRegistry};
pub use tracing_hook::TracingInterceptor;

/// Outcome of a `before_execute` hook.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InterceptAction {
    /// Proceed with execution.
    Continue,
    /// Cancel the statement with a reason.
    Abort(String),
}

/// Hooks around compilation and execution of one statement.
pub trait Interceptor: Send + Sync {
    /// Called with the container right before it is compiled.
    fn before_compile(&self, container: &mut QueryPartsContainer) {
        let _ = container;
    }

    /// Called with the compiled query right before it is executed.
    ///
    /// Return `InterceptAction::Abort` to cancel the statement.
    fn before_execute(&self, query: &CompiledQuery) -> InterceptAction {
        let _ = query;
        InterceptAction::Continue
    }
}

/// Interceptor from a `before_compile` closure.
pub struct BeforeCompile<F>(pub F);

impl<F> Interceptor for BeforeCompile<F>
where
    F: Fn(&mut QueryPartsContainer) + Send + Sync,
{
    fn before_compile(&self, container: &mut QueryPartsContainer) {
        (self.0)(container)
    }
}

/// Interceptor from an observing `before_execute` closure.
pub struct BeforeExecute<F>(pub F);

impl<F> Interceptor for BeforeExecute<F>
where
    F: Fn(&CompiledQuery) + Send + Sync,
{
    fn before_execute(&self, query: &CompiledQuery) -> InterceptAction {
        (self.0)(query);
        InterceptAction::Continue
    }
}
