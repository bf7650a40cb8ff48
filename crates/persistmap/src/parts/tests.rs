use super::*;

fn col(name: &str) -> QueryPart {
    QueryPart::text(OperationType::Column, name).with_id(name)
}

fn ids(container: &QueryPartsContainer) -> Vec<String> {
    container
        .iter()
        .map(|p| p.id().unwrap_or("-").to_string())
        .collect()
}

#[test]
fn add_preserves_append_order() {
    let mut c = QueryPartsContainer::new();
    c.add(QueryPart::text(OperationType::Select, "").with_id("select"));
    c.add(QueryPart::text(OperationType::From, "Warrior").with_id("from"));
    c.add(QueryPart::items(OperationType::Where, None).with_id("where"));
    assert_eq!(ids(&c), ["select", "from", "where"]);
}

#[test]
fn add_after_create_table_then_column() {
    let mut c = QueryPartsContainer::new();
    c.add(QueryPart::text(OperationType::CreateTable, "Warrior").with_id("table"));
    c.add_after(col("first"), OperationType::CreateTable);
    c.add_after(col("second"), OperationType::Column);
    assert_eq!(ids(&c), ["table", "first", "second"]);
}

#[test]
fn add_after_into_empty_container_appends() {
    let mut c = QueryPartsContainer::new();
    c.add_after(col("first"), OperationType::CreateTable);
    c.add_after(col("second"), OperationType::Column);
    assert_eq!(ids(&c), ["first", "second"]);
}

#[test]
fn add_after_uses_last_marker_at_call_time() {
    let mut c = QueryPartsContainer::new();
    c.add(QueryPart::text(OperationType::CreateTable, "T").with_id("table"));
    c.add(QueryPart::text(OperationType::PrimaryKey, "pk").with_id("pk"));
    c.add_after(col("a"), OperationType::Column);
    c.add_after(col("b"), OperationType::Column);
    c.add_after(col("c"), OperationType::Column);
    assert_eq!(ids(&c), ["table", "pk", "a", "b", "c"]);

    let mut c = QueryPartsContainer::new();
    c.add(QueryPart::text(OperationType::CreateTable, "T").with_id("table"));
    c.add_after(col("a"), OperationType::CreateTable);
    c.add(QueryPart::text(OperationType::PrimaryKey, "pk").with_id("pk"));
    c.add_after(col("b"), OperationType::Column);
    assert_eq!(ids(&c), ["table", "a", "b", "pk"]);
}

#[test]
fn add_before_first_marker() {
    let mut c = QueryPartsContainer::new();
    c.add(QueryPart::text(OperationType::From, "W").with_id("from"));
    c.add(QueryPart::text(OperationType::OrderBy, "a").with_id("o1"));
    c.add(QueryPart::text(OperationType::OrderBy, "b").with_id("o2"));
    c.add_before(
        QueryPart::items(OperationType::Where, None).with_id("where"),
        OperationType::OrderBy,
    );
    assert_eq!(ids(&c), ["from", "where", "o1", "o2"]);

    c.add_before(col("tail"), OperationType::GroupBy);
    assert_eq!(ids(&c).last().map(String::as_str), Some("tail"));
}

#[test]
fn add_to_last_targets_most_recent_clause() {
    let mut c = QueryPartsContainer::new();
    c.add(QueryPart::items(OperationType::Join, Some("A".into())).with_id("j1"));
    c.add(QueryPart::items(OperationType::Join, Some("B".into())).with_id("j2"));
    c.add_to_last(
        QueryPart::text(OperationType::And, "x").with_id("and"),
        OperationType::is_predicate_clause,
    )
    .unwrap();

    let first = c.iter().next().unwrap();
    let last = c.last(OperationType::Join).unwrap();
    assert!(first.children().unwrap().is_empty());
    assert_eq!(last.children().unwrap().len(), 1);
    assert_eq!(last.id(), Some("j2"));
}

#[test]
fn add_to_last_without_target_is_error() {
    let mut c = QueryPartsContainer::new();
    c.add(QueryPart::text(OperationType::From, "W"));
    let err = c
        .add_to_last(
            QueryPart::text(OperationType::And, "x"),
            OperationType::is_predicate_clause,
        )
        .unwrap_err();
    assert!(matches!(err, crate::OrmError::Validation(_)));
}

#[test]
fn value_collection_slots() {
    let values = ValueCollection::new()
        .with_text(Slot::MemberName, "ID")
        .with_flag(Slot::Key, true)
        .with_text(Slot::MemberName, "Id");
    assert_eq!(values.text(Slot::MemberName), Some("Id"));
    assert!(values.flag(Slot::Key));
    assert!(!values.flag(Slot::Nullable));
    assert_eq!(values.iter().count(), 2);
}

#[test]
fn delegate_renders_each_time() {
    let part = QueryPart::delegate(OperationType::CreateDatabase, || "Sample".to_string());
    let PartContent::Delegate(d) = part.content() else {
        panic!("expected delegate");
    };
    assert_eq!(d.render(), "Sample");
    assert_eq!(d.render(), "Sample");
}
