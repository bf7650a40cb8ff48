use std::sync::Arc;

use criterion::{BenchmarkId, Criterion, black_box, criterion_group, criterion_main};
use persistmap::{
    DatabaseContext, Entity, MockConnection, OperationType, QueryPart, QueryPartsContainer,
    SqlServerDialect, Value,
};

#[derive(Entity)]
struct Warrior {
    #[orm(key, auto, column = "ID")]
    id: i32,
    #[orm(column = "Name")]
    name: Option<String>,
    #[orm(column = "Race")]
    race: Option<String>,
}

#[derive(Entity)]
struct Armour {
    #[orm(key, auto, column = "ID")]
    id: i32,
    #[orm(column = "WarriorID")]
    warrior_id: i32,
}

fn context() -> DatabaseContext<MockConnection> {
    DatabaseContext::new(MockConnection::new("Warriors"), Arc::new(SqlServerDialect))
}

fn bench_select(c: &mut Criterion) {
    let mut group = c.benchmark_group("compile/select");

    for n in [1, 5, 10, 50] {
        group.bench_with_input(BenchmarkId::from_parameter(n), &n, |b, &n| {
            let mut ctx = context();
            b.iter(|| {
                let mut select = ctx
                    .from::<Warrior>()
                    .join::<Armour>(Armour::COL_WARRIOR_ID.eq(Warrior::COL_ID))
                    .where_(Warrior::COL_ID.gt(0));
                for i in 0..n {
                    select = select.and(Warrior::COL_NAME.ne(format!("name{i}")));
                }
                black_box(select.compile())
            });
        });
    }

    group.finish();
}

fn bench_values(c: &mut Criterion) {
    let mut group = c.benchmark_group("compile/in_list");

    for n in [1, 10, 100, 1000] {
        let values: Vec<Value> = (0..n).map(Value::Int).collect();
        group.bench_with_input(BenchmarkId::from_parameter(n), &values, |b, values| {
            let mut ctx = context();
            b.iter(|| {
                black_box(
                    ctx.from::<Warrior>()
                        .where_(Warrior::COL_ID.in_list(values.iter().cloned()))
                        .compile(),
                )
            });
        });
    }

    group.finish();
}

fn bench_raw_container(c: &mut Criterion) {
    let ctx = context();
    let mut container = QueryPartsContainer::new();
    container.add(QueryPart::text(OperationType::Select, "Warrior.ID"));
    container.add(QueryPart::text(OperationType::From, "Warrior"));

    c.bench_function("compile/container", |b| {
        b.iter(|| black_box(ctx.compile(&container)));
    });
}

criterion_group!(benches, bench_select, bench_values, bench_raw_container);
criterion_main!(benches);
