use std::any::{Any, TypeId};
use std::collections::HashMap;
use std::fmt;
use std::marker::PhantomData;
use std::sync::{Arc, OnceLock, PoisonError, RwLock};

use crate::compiler::CompiledQuery;
use crate::parts::QueryPartsContainer;

use super::{BeforeCompile, BeforeExecute, InterceptAction, Interceptor};

/// Typed result supplier standing in for the database.
pub type ExecuteSupplier<T> = Arc<dyn Fn(&CompiledQuery) -> Vec<T> + Send + Sync>;

#[derive(Clone)]
struct ExecuteOverride {
    /// `ExecuteSupplier<T>` for the subject type.
    typed: Arc<dyn Any + Send + Sync>,
    /// The same supplier with its rows discarded, for enqueued statements.
    erased: Arc<dyn Fn(&CompiledQuery) -> usize + Send + Sync>,
}

#[derive(Clone, Default)]
struct SubjectEntry {
    interceptors: Vec<Arc<dyn Interceptor>>,
    execute: Option<ExecuteOverride>,
}

/// Interceptors and execution overrides per subject type.
///
/// Owned by a [`DatabaseContext`](crate::context::DatabaseContext).
/// [`InterceptorRegistry::global`] is an optional process-wide instance that
/// contexts copy in explicitly.
#[derive(Clone, Default)]
pub struct InterceptorRegistry {
    subjects: HashMap<TypeId, SubjectEntry>,
    /// Interceptors that apply to every statement, e.g. loggers.
    common: Vec<Arc<dyn Interceptor>>,
}

impl InterceptorRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Process-wide registry.
    ///
    /// Register at startup, before contexts copy it in with
    /// [`DatabaseContext::with_global_interceptors`](crate::context::DatabaseContext::with_global_interceptors).
    pub fn global() -> &'static RwLock<InterceptorRegistry> {
        static GLOBAL: OnceLock<RwLock<InterceptorRegistry>> = OnceLock::new();
        GLOBAL.get_or_init(|| RwLock::new(InterceptorRegistry::new()))
    }

    /// Snapshot of the global registry.
    pub fn global_snapshot() -> InterceptorRegistry {
        Self::global()
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Fluent registration for subject `T`.
    pub fn interceptor<T: 'static>(&mut self) -> InterceptorBuilder<'_, T> {
        InterceptorBuilder {
            registry: self,
            _subject: PhantomData,
        }
    }

    /// Add an interceptor for subject `T`.
    pub fn add<T: 'static>(&mut self, interceptor: impl Interceptor + 'static) {
        self.add_arc(TypeId::of::<T>(), Arc::new(interceptor));
    }

    pub fn add_arc(&mut self, subject: TypeId, interceptor: Arc<dyn Interceptor>) {
        self.subjects
            .entry(subject)
            .or_default()
            .interceptors
            .push(interceptor);
    }

    /// Add an interceptor that runs for every subject, after the subject's own ones.
    pub fn add_common(&mut self, interceptor: impl Interceptor + 'static) {
        self.common.push(Arc::new(interceptor));
    }

    /// Replace the transport for subject `T` with `supplier`.
    pub fn set_execute<T: 'static>(
        &mut self,
        supplier: impl Fn(&CompiledQuery) -> Vec<T> + Send + Sync + 'static,
    ) {
        let typed: ExecuteSupplier<T> = Arc::new(supplier);
        let erased_supplier = Arc::clone(&typed);
        let erased = Arc::new(move |query: &CompiledQuery| erased_supplier(query).len());
        self.subjects.entry(TypeId::of::<T>()).or_default().execute = Some(ExecuteOverride {
            typed: Arc::new(typed),
            erased,
        });
    }

    /// Copy everything registered in `other` after this registry's own entries.
    pub fn merge(&mut self, other: &InterceptorRegistry) {
        for (subject, entry) in &other.subjects {
            let own = self.subjects.entry(*subject).or_default();
            own.interceptors.extend(entry.interceptors.iter().cloned());
            if own.execute.is_none() {
                own.execute = entry.execute.clone();
            }
        }
        self.common.extend(other.common.iter().cloned());
    }

    fn chain(&self, subject: Option<TypeId>) -> impl Iterator<Item = &Arc<dyn Interceptor>> {
        subject
            .and_then(|s| self.subjects.get(&s))
            .into_iter()
            .flat_map(|entry| entry.interceptors.iter())
            .chain(self.common.iter())
    }

    /// Run every `before_compile` hook for `subject`, in registration order.
    pub fn before_compile(&self, subject: Option<TypeId>, container: &mut QueryPartsContainer) {
        for interceptor in self.chain(subject) {
            interceptor.before_compile(container);
        }
    }

    /// Run every `before_execute` hook for `subject`; the first abort wins.
    pub fn before_execute(&self, subject: Option<TypeId>, query: &CompiledQuery) -> InterceptAction {
        for interceptor in self.chain(subject) {
            if let action @ InterceptAction::Abort(_) = interceptor.before_execute(query) {
                return action;
            }
        }
        InterceptAction::Continue
    }

    /// Typed execution override for `T`, if one is registered.
    pub fn execute_override<T: 'static>(&self) -> Option<ExecuteSupplier<T>> {
        self.subjects
            .get(&TypeId::of::<T>())
            .and_then(|entry| entry.execute.as_ref())
            .and_then(|o| o.typed.downcast_ref::<ExecuteSupplier<T>>())
            .cloned()
    }

    /// Run the override for `subject` discarding its rows; `None` when there is none.
    pub fn run_override(&self, subject: Option<TypeId>, query: &CompiledQuery) -> Option<usize> {
        let entry = self.subjects.get(&subject?)?;
        entry.execute.as_ref().map(|o| (o.erased)(query))
    }

    pub fn is_empty(&self) -> bool {
        self.common.is_empty() && self.subjects.is_empty()
    }
}

impl fmt::Debug for InterceptorRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("InterceptorRegistry")
            .field("subjects", &self.subjects.len())
            .field("common", &self.common.len())
            .finish()
    }
}

/// Fluent registration for one subject type.
pub struct InterceptorBuilder<'r, T> {
    registry: &'r mut InterceptorRegistry,
    _subject: PhantomData<fn() -> T>,
}

impl<T: 'static> InterceptorBuilder<'_, T> {
    pub fn before_compile(
        self,
        f: impl Fn(&mut QueryPartsContainer) + Send + Sync + 'static,
    ) -> Self {
        self.registry.add::<T>(BeforeCompile(f));
        self
    }

    pub fn before_execute(self, f: impl Fn(&CompiledQuery) + Send + Sync + 'static) -> Self {
        self.registry.add::<T>(BeforeExecute(f));
        self
    }

    /// Serve results for `T` from `supplier` instead of the connection.
    pub fn as_execute(
        self,
        supplier: impl Fn(&CompiledQuery) -> Vec<T> + Send + Sync + 'static,
    ) -> Self {
        self.registry.set_execute::<T>(supplier);
        self
    }

    #[allow(clippy::should_implement_trait)]
    pub fn add(self, interceptor: impl Interceptor + 'static) -> Self {
        self.registry.add::<T>(interceptor);
        self
    }
}
