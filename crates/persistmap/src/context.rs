//! The database context: builder entry points, the pending command queue and
//! the execution pipeline.
//!
//! Selects (and typed procedure calls) run immediately. Every other terminal
//! call compiles its statement and enqueues exactly one [`Command`]; queued
//! commands run in order on [`DatabaseContext::commit`], failing fast.

use std::any::TypeId;
use std::fmt;
use std::sync::Arc;

use crate::builder::{
    DatabaseBuilder, DeleteBuilder, InsertBuilder, ProcedureBuilder, SelectBuilder, UpdateBuilder,
};
use crate::compiler::{CompiledQuery, Compiler};
use crate::connection::Connection;
use crate::dialect::Dialect;
use crate::entity::Entity;
use crate::error::{OrmError, OrmResult};
use crate::expr::Expr;
use crate::interceptor::{InterceptAction, InterceptorBuilder, InterceptorRegistry};
use crate::parts::QueryPartsContainer;
use crate::row::{FromRow, Row};
use crate::script::{has_batches, split_batches};
use crate::settings::ContextSettings;
use crate::translate::{FunctionRegistry, Translator};

/// Callback receiving the rows of an executed statement.
pub(crate) type RowsCallback = Box<dyn FnOnce(&[Row]) -> OrmResult<()>>;

/// A compiled statement waiting in the commit queue.
///
/// Catalog switches are explicit steps around the statement, never a side
/// effect of rendering it.
pub struct Command {
    query: CompiledQuery,
    subject: Option<TypeId>,
    /// Catalog to switch to before running the statement.
    prepare: Option<String>,
    /// Catalog to switch to afterwards.
    restore: Option<String>,
    on_complete: Option<RowsCallback>,
}

impl Command {
    pub(crate) fn new(query: CompiledQuery, subject: Option<TypeId>) -> Self {
        Self {
            query,
            subject,
            prepare: None,
            restore: None,
            on_complete: None,
        }
    }

    pub(crate) fn switching(mut self, prepare: Option<String>, restore: Option<String>) -> Self {
        self.prepare = prepare;
        self.restore = restore;
        self
    }

    pub(crate) fn on_complete(mut self, callback: RowsCallback) -> Self {
        self.on_complete = Some(callback);
        self
    }

    pub fn query(&self) -> &CompiledQuery {
        &self.query
    }
}

impl fmt::Debug for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Command")
            .field("sql", &self.query.sql())
            .field("prepare", &self.prepare)
            .field("restore", &self.restore)
            .field("has_callback", &self.on_complete.is_some())
            .finish()
    }
}

/// Owns a connection, a dialect and the interceptors; hands out builders.
pub struct DatabaseContext<C> {
    connection: C,
    dialect: Arc<dyn Dialect>,
    functions: FunctionRegistry,
    interceptors: InterceptorRegistry,
    settings: ContextSettings,
    pending: Vec<Command>,
}

impl<C: Connection> DatabaseContext<C> {
    /// Context for `dialect` with default settings.
    pub fn new(connection: C, dialect: Arc<dyn Dialect>) -> Self {
        let settings = ContextSettings::new().with_dialect(dialect.kind());
        Self {
            connection,
            dialect,
            functions: FunctionRegistry::builtin(),
            interceptors: InterceptorRegistry::new(),
            settings,
            pending: Vec::new(),
        }
    }

    /// Context configured from settings: dialect and loggers.
    pub fn with_settings(connection: C, settings: ContextSettings) -> Self {
        let mut interceptors = InterceptorRegistry::new();
        settings.attach_loggers(&mut interceptors);
        Self {
            connection,
            dialect: settings.dialect.dialect(),
            functions: FunctionRegistry::builtin(),
            interceptors,
            settings,
            pending: Vec::new(),
        }
    }

    /// Copy in everything registered on [`InterceptorRegistry::global`].
    pub fn with_global_interceptors(mut self) -> Self {
        self.interceptors
            .merge(&InterceptorRegistry::global_snapshot());
        self
    }

    pub fn dialect(&self) -> &dyn Dialect {
        self.dialect.as_ref()
    }

    pub fn settings(&self) -> &ContextSettings {
        &self.settings
    }

    pub fn connection(&self) -> &C {
        &self.connection
    }

    pub fn connection_mut(&mut self) -> &mut C {
        &mut self.connection
    }

    pub fn into_connection(self) -> C {
        self.connection
    }

    pub fn interceptors(&self) -> &InterceptorRegistry {
        &self.interceptors
    }

    pub fn interceptors_mut(&mut self) -> &mut InterceptorRegistry {
        &mut self.interceptors
    }

    /// Fluent interceptor registration for subject type `T`.
    pub fn interceptor<T: 'static>(&mut self) -> InterceptorBuilder<'_, T> {
        self.interceptors.interceptor::<T>()
    }

    /// Add or replace a method-call translation used in predicates.
    pub fn register_function<F>(&mut self, name: impl Into<String>, handler: F)
    where
        F: Fn(&Translator<'_>, &Expr, &[Expr]) -> OrmResult<String> + Send + Sync + 'static,
    {
        self.functions.register(name, handler);
    }

    // ── builders ──

    /// `SELECT ... FROM T`
    pub fn from<T: Entity>(&mut self) -> SelectBuilder<'_, C, T> {
        SelectBuilder::new(self, None)
    }

    /// `SELECT ... FROM T alias`
    pub fn from_as<T: Entity>(&mut self, alias: impl Into<String>) -> SelectBuilder<'_, C, T> {
        SelectBuilder::new(self, Some(alias.into()))
    }

    /// `INSERT INTO T ...` from an entity instance.
    pub fn insert<T: Entity>(&mut self, entity: &T) -> InsertBuilder<'_, C, T> {
        InsertBuilder::new(self, entity.values())
    }

    /// `UPDATE T SET ...` from an entity; the predicate defaults to its key.
    pub fn update<T: Entity>(&mut self, entity: &T) -> UpdateBuilder<'_, C, T> {
        UpdateBuilder::from_entity(self, entity)
    }

    /// `UPDATE T SET ...` with explicit assignments.
    pub fn update_fields<T: Entity>(&mut self) -> UpdateBuilder<'_, C, T> {
        UpdateBuilder::new(self)
    }

    /// `DELETE FROM T ...`
    pub fn delete<T: Entity>(&mut self) -> DeleteBuilder<'_, C, T> {
        DeleteBuilder::new(self)
    }

    /// `DELETE FROM T WHERE <key of entity>`
    pub fn delete_entity<T: Entity>(&mut self, entity: &T) -> DeleteBuilder<'_, C, T> {
        DeleteBuilder::from_entity(self, entity)
    }

    /// `EXEC name ...`
    pub fn procedure(&mut self, name: impl Into<String>) -> ProcedureBuilder<'_, C> {
        ProcedureBuilder::new(self, name.into())
    }

    /// Database and table DDL.
    pub fn database(&mut self) -> DatabaseBuilder<'_, C> {
        DatabaseBuilder::new(self)
    }

    // ── pipeline ──

    /// Compile a container with this context's dialect and functions.
    pub fn compile(&self, container: &QueryPartsContainer) -> OrmResult<CompiledQuery> {
        Compiler::new(self.dialect.as_ref())
            .with_functions(&self.functions)
            .compile(container)
    }

    /// Run `before_compile` hooks, then compile.
    pub(crate) fn prepare(
        &self,
        subject: Option<TypeId>,
        container: &mut QueryPartsContainer,
    ) -> OrmResult<CompiledQuery> {
        self.interceptors.before_compile(subject, container);
        self.compile(container)
    }

    /// Run `before_execute` hooks; an abort becomes an error.
    pub(crate) fn check_execute(
        &self,
        subject: Option<TypeId>,
        query: &CompiledQuery,
    ) -> OrmResult<()> {
        match self.interceptors.before_execute(subject, query) {
            InterceptAction::Continue => Ok(()),
            InterceptAction::Abort(reason) => {
                tracing::debug!(target: "persistmap.sql", reason = %reason, "statement aborted");
                Err(OrmError::Aborted(reason))
            }
        }
    }

    /// Compile and run a row-returning statement now, mapping rows into `O`.
    pub(crate) fn run_query<O: FromRow + 'static>(
        &mut self,
        mut container: QueryPartsContainer,
    ) -> OrmResult<Vec<O>> {
        let subject = Some(TypeId::of::<O>());
        let query = self.prepare(subject, &mut container)?;
        self.check_execute(subject, &query)?;
        match self.fetch::<O>(&query)? {
            Fetched::Supplied(items) => Ok(items),
            Fetched::Rows(rows) => rows.iter().map(O::from_row).collect(),
        }
    }

    /// Transport step of an immediate statement: the registered override for
    /// `O` if any, else the connection.
    pub(crate) fn fetch<O: 'static>(&mut self, query: &CompiledQuery) -> OrmResult<Fetched<O>> {
        if let Some(supplier) = self.interceptors.execute_override::<O>() {
            tracing::trace!(target: "persistmap.sql", "execution served by override");
            return Ok(Fetched::Supplied(supplier(query)));
        }
        Ok(Fetched::Rows(self.connection.query(query.sql())?))
    }

    /// Compile a container and enqueue it as one command.
    pub(crate) fn enqueue(
        &mut self,
        subject: Option<TypeId>,
        mut container: QueryPartsContainer,
    ) -> OrmResult<()> {
        let query = self.prepare(subject, &mut container)?;
        self.push(Command::new(query, subject));
        Ok(())
    }

    pub(crate) fn push(&mut self, command: Command) {
        tracing::trace!(target: "persistmap.commit", sql = %command.query.sql(), "enqueued");
        self.pending.push(command);
    }

    /// Commands waiting for [`commit`](Self::commit).
    pub fn pending(&self) -> &[Command] {
        &self.pending
    }

    /// Drop every pending command without running it.
    pub fn discard(&mut self) {
        self.pending.clear();
    }

    /// Run pending commands in order.
    ///
    /// Stops at the first failure and returns its error; the rest of the
    /// queue is discarded.
    pub fn commit(&mut self) -> OrmResult<()> {
        let pending = std::mem::take(&mut self.pending);
        let total = pending.len();
        tracing::debug!(target: "persistmap.commit", statements = total, "flushing");

        for (index, command) in pending.into_iter().enumerate() {
            if let Err(error) = self.run_command(command) {
                tracing::warn!(
                    target: "persistmap.commit",
                    index,
                    total,
                    error = %error,
                    "command failed, discarding the rest of the queue"
                );
                return Err(error);
            }
        }
        Ok(())
    }

    fn run_command(&mut self, command: Command) -> OrmResult<()> {
        let Command {
            query,
            subject,
            prepare,
            restore,
            on_complete,
        } = command;

        let mut previous = None;
        if let Some(catalog) = &prepare {
            previous = Some(self.connection.database());
            self.connection.set_database(catalog)?;
        }
        let outcome = self.run_statement(subject, &query, on_complete);

        // a failed statement always leaves the system catalog again
        let back = match &outcome {
            Ok(()) => restore,
            Err(_) => restore.or(previous),
        };
        if let Some(catalog) = &back {
            if let Err(restore_err) = self.connection.set_database(catalog) {
                return match outcome {
                    Ok(()) => Err(restore_err),
                    Err(error) => Err(OrmError::Other(format!(
                        "{error} (switching back to {catalog} failed: {restore_err})"
                    ))),
                };
            }
        }
        outcome
    }

    fn run_statement(
        &mut self,
        subject: Option<TypeId>,
        query: &CompiledQuery,
        on_complete: Option<RowsCallback>,
    ) -> OrmResult<()> {
        self.check_execute(subject, query)?;
        if self.interceptors.run_override(subject, query).is_some() {
            return Ok(());
        }
        match on_complete {
            Some(callback) => {
                let rows = self.connection.query(query.sql())?;
                callback(&rows)
            }
            None => {
                self.connection.execute(query.sql())?;
                Ok(())
            }
        }
    }

    /// Run a script now.
    ///
    /// On dialects with batch support a script containing `GO` lines runs
    /// batch by batch inside one transaction, rolled back on the first
    /// failure. Otherwise the script is sent as a single statement.
    pub fn execute_script(&mut self, script: &str) -> OrmResult<()> {
        if !self.dialect.supports_batches() || !has_batches(script) {
            self.connection.execute(script)?;
            return Ok(());
        }

        let batches = split_batches(script);
        tracing::debug!(target: "persistmap.script", batches = batches.len(), "running script");

        self.connection.begin()?;
        for (index, batch) in batches.iter().enumerate() {
            if let Err(error) = self.connection.execute(batch) {
                tracing::warn!(
                    target: "persistmap.script",
                    batch = index,
                    error = %error,
                    "batch failed, rolling back"
                );
                return match self.connection.rollback() {
                    Ok(()) => Err(error),
                    Err(rollback_err) => Err(OrmError::Other(format!(
                        "{error} (rollback failed: {rollback_err})"
                    ))),
                };
            }
        }
        self.connection.commit()
    }
}

impl<C> fmt::Debug for DatabaseContext<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DatabaseContext")
            .field("dialect", &self.dialect)
            .field("interceptors", &self.interceptors)
            .field("pending", &self.pending.len())
            .finish()
    }
}

/// Result of the transport step of an immediate statement.
pub(crate) enum Fetched<O> {
    Supplied(Vec<O>),
    Rows(Vec<Row>),
}
