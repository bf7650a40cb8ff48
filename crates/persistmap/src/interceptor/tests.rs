use super::*;
use crate::parts::{OperationType, QueryPart};
use std::any::TypeId;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

struct Warrior;
struct Armour;

struct Veto;

impl Interceptor for Veto {
    fn before_execute(&self, _query: &CompiledQuery) -> InterceptAction {
        InterceptAction::Abort("read only".into())
    }
}

#[test]
fn test_hooks_run_in_registration_order() {
    let log = Arc::new(Mutex::new(Vec::new()));
    let mut registry = InterceptorRegistry::new();
    let first = Arc::clone(&log);
    let second = Arc::clone(&log);
    registry
        .interceptor::<Warrior>()
        .before_execute(move |_| first.lock().unwrap().push("first"))
        .before_execute(move |_| second.lock().unwrap().push("second"));

    let query = CompiledQuery::new("SELECT 1");
    let action = registry.before_execute(Some(TypeId::of::<Warrior>()), &query);
    assert_eq!(action, InterceptAction::Continue);
    assert_eq!(*log.lock().unwrap(), ["first", "second"]);
}

#[test]
fn test_hooks_are_scoped_to_subject() {
    let calls = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&calls);
    let mut registry = InterceptorRegistry::new();
    registry
        .interceptor::<Warrior>()
        .before_compile(move |_| {
            counter.fetch_add(1, Ordering::SeqCst);
        });

    let mut container = QueryPartsContainer::new();
    registry.before_compile(Some(TypeId::of::<Armour>()), &mut container);
    registry.before_compile(None, &mut container);
    assert_eq!(calls.load(Ordering::SeqCst), 0);

    registry.before_compile(Some(TypeId::of::<Warrior>()), &mut container);
    assert_eq!(calls.load(Ordering::SeqCst), 1);
}

#[test]
fn test_before_compile_can_add_parts() {
    let mut registry = InterceptorRegistry::new();
    registry.interceptor::<Warrior>().before_compile(|c| {
        c.add(QueryPart::text(OperationType::Raw, "-- audited"));
    });
    let mut container = QueryPartsContainer::new();
    registry.before_compile(Some(TypeId::of::<Warrior>()), &mut container);
    assert!(container.contains(OperationType::Raw));
}

#[test]
fn test_abort_stops_chain() {
    let calls = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&calls);
    let mut registry = InterceptorRegistry::new();
    registry
        .interceptor::<Warrior>()
        .add(Veto)
        .before_execute(move |_| {
            counter.fetch_add(1, Ordering::SeqCst);
        });

    let action = registry.before_execute(
        Some(TypeId::of::<Warrior>()),
        &CompiledQuery::new("DELETE FROM Warrior"),
    );
    assert_eq!(action, InterceptAction::Abort("read only".into()));
    assert_eq!(calls.load(Ordering::SeqCst), 0);
}

#[test]
fn test_common_interceptors_apply_to_all_subjects() {
    let mut registry = InterceptorRegistry::new();
    registry.add_common(Veto);
    let query = CompiledQuery::new("SELECT 1");
    assert!(matches!(
        registry.before_execute(None, &query),
        InterceptAction::Abort(_)
    ));
    assert!(matches!(
        registry.before_execute(Some(TypeId::of::<Armour>()), &query),
        InterceptAction::Abort(_)
    ));
}

#[test]
fn test_execute_override_is_typed() {
    let mut registry = InterceptorRegistry::new();
    registry
        .interceptor::<String>()
        .as_execute(|q| vec![q.sql().to_string()]);

    let query = CompiledQuery::new("SELECT 1");
    let supplier = registry.execute_override::<String>().unwrap();
    assert_eq!(supplier(&query), ["SELECT 1"]);
    assert!(registry.execute_override::<i32>().is_none());
    assert_eq!(registry.run_override(Some(TypeId::of::<String>()), &query), Some(1));
    assert_eq!(registry.run_override(None, &query), None);
}

#[test]
fn test_merge_appends_after_own_entries() {
    let log = Arc::new(Mutex::new(Vec::new()));
    let (a, b) = (Arc::clone(&log), Arc::clone(&log));

    let mut global = InterceptorRegistry::new();
    global
        .interceptor::<Warrior>()
        .before_execute(move |_| a.lock().unwrap().push("global"));
    let mut local = InterceptorRegistry::new();
    local
        .interceptor::<Warrior>()
        .before_execute(move |_| b.lock().unwrap().push("local"));
    local.merge(&global);

    local.before_execute(Some(TypeId::of::<Warrior>()), &CompiledQuery::new("x"));
    assert_eq!(*log.lock().unwrap(), ["local", "global"]);
}

#[test]
fn test_tracing_interceptor_truncation() {
    let hook = TracingInterceptor::new(tracing::Level::INFO, Some(10));
    assert_eq!(hook.shorten("SELECT * FROM Warrior"), "SELECT * F...");
    assert_eq!(hook.shorten("SELECT 1"), "SELECT 1");
    assert_eq!(
        TracingInterceptor::new(tracing::Level::INFO, None).shorten("SELECT * FROM Warrior"),
        "SELECT * FROM Warrior"
    );
    assert_eq!(
        hook.before_execute(&CompiledQuery::new("SELECT 1")),
        InterceptAction::Continue
    );
}

#[test]
fn test_truncate_on_char_boundary() {
    assert_eq!(tracing_hook::truncate_sql_bytes("héllo", 2), "h");
    assert_eq!(tracing_hook::truncate_sql_bytes("abc", 10), "abc");
}
