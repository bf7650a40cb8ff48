use std::any::TypeId;

use super::remember;
use crate::connection::Connection;
use crate::context::{Command, DatabaseContext, Fetched};
use crate::error::{OrmError, OrmResult};
use crate::parts::{OperationType as Op, QueryPart, QueryPartsContainer, Slot, SlotValue, ValueCollection};
use crate::row::{FromRow, Row};
use crate::value::{FieldType, FromValue, SqlField, ToValue, Value};

type OutputCallback = Box<dyn FnOnce(&Value) -> OrmResult<()>>;

/// An output parameter and the callback receiving its final value.
struct OutputParameter {
    name: String,
    field_type: FieldType,
    initial: Value,
    callback: OutputCallback,
}

/// Stored procedure call builder.
///
/// Output parameters are declared and initialised before the call and
/// selected after it; their values are read from the last result row.
///
/// # Example
/// ```ignore
/// ctx.procedure("GetWarriorCount")
///     .add_parameter("Elf")
///     .add_output_parameter("total", 0i32, |total| println!("{total}"))
///     .execute()?;
/// ctx.commit()?;
/// ```
pub struct ProcedureBuilder<'a, C> {
    ctx: &'a mut DatabaseContext<C>,
    name: String,
    arguments: Vec<QueryPart>,
    outputs: Vec<OutputParameter>,
    error: Option<OrmError>,
}

/// `@name`, prefixed when the caller left the `@` out.
fn parameter_name(name: &str) -> String {
    if name.starts_with('@') {
        name.to_string()
    } else {
        format!("@{name}")
    }
}

impl<'a, C: Connection> ProcedureBuilder<'a, C> {
    pub(crate) fn new(ctx: &'a mut DatabaseContext<C>, name: String) -> Self {
        Self {
            ctx,
            name,
            arguments: Vec::new(),
            outputs: Vec::new(),
            error: None,
        }
    }

    /// Positional parameter.
    pub fn add_parameter(mut self, value: impl ToValue) -> Self {
        self.arguments.push(QueryPart::values(
            Op::Parameter,
            ValueCollection::new().with(Slot::Value, SlotValue::Literal(value.to_value())),
        ));
        self
    }

    /// `@name=value`
    pub fn add_named_parameter(mut self, name: &str, value: impl ToValue) -> Self {
        let name = parameter_name(name);
        if let Err(e) = self.check_unique(&name) {
            remember(&mut self.error, Err(e));
            return self;
        }
        self.arguments.push(
            QueryPart::values(
                Op::Parameter,
                ValueCollection::new()
                    .with_text(Slot::MemberName, name.clone())
                    .with(Slot::Value, SlotValue::Literal(value.to_value())),
            )
            .with_id(name),
        );
        self
    }

    /// `@name=@name OUTPUT`; `callback` receives the value after execution.
    pub fn add_output_parameter<V>(
        mut self,
        name: &str,
        initial: V,
        callback: impl FnOnce(V) + 'static,
    ) -> Self
    where
        V: ToValue + FromValue + SqlField + 'static,
    {
        let name = parameter_name(name);
        if let Err(e) = self.check_unique(&name) {
            remember(&mut self.error, Err(e));
            return self;
        }

        let column = name.trim_start_matches('@').to_string();
        let initial = initial.to_value();
        self.arguments.push(
            QueryPart::values(
                Op::OutputParameter,
                ValueCollection::new()
                    .with_text(Slot::MemberName, name.clone())
                    .with(Slot::MemberType, SlotValue::Type(V::FIELD_TYPE))
                    .with(Slot::Value, SlotValue::Literal(initial.clone())),
            )
            .with_id(name.clone()),
        );
        self.outputs.push(OutputParameter {
            name,
            field_type: V::FIELD_TYPE,
            initial,
            callback: Box::new(move |value| {
                let value =
                    V::from_value(value).map_err(|e| OrmError::decode(&column, e.to_string()))?;
                callback(value);
                Ok(())
            }),
        });
        self
    }

    fn check_unique(&self, name: &str) -> OrmResult<()> {
        let taken = self
            .arguments
            .iter()
            .any(|part| part.id().is_some_and(|id| id.eq_ignore_ascii_case(name)));
        if taken {
            return Err(OrmError::validation(format!(
                "parameter {name} declared twice for {}",
                self.name
            )));
        }
        Ok(())
    }

    fn build(&mut self) -> OrmResult<QueryPartsContainer> {
        if let Some(error) = self.error.take() {
            return Err(error);
        }

        let mut container = QueryPartsContainer::new();
        for output in &self.outputs {
            container.add(QueryPart::values(
                Op::OutputParameterDeclare,
                ValueCollection::new()
                    .with_text(Slot::MemberName, output.name.clone())
                    .with(Slot::MemberType, SlotValue::Type(output.field_type)),
            ));
            container.add(QueryPart::values(
                Op::OutputParameterSet,
                ValueCollection::new()
                    .with_text(Slot::MemberName, output.name.clone())
                    .with(Slot::Value, SlotValue::Literal(output.initial.clone())),
            ));
        }

        container.add(QueryPart::text(Op::Procedure, self.name.clone()));
        for argument in self.arguments.drain(..) {
            container.add(argument);
        }

        for output in &self.outputs {
            container.add(QueryPart::values(
                Op::OutputParameterSelect,
                ValueCollection::new().with_text(Slot::MemberName, output.name.clone()),
            ));
        }
        Ok(container)
    }

    /// Compile and enqueue the call. Output callbacks run on commit.
    pub fn execute(mut self) -> OrmResult<()> {
        let mut container = self.build()?;
        if self.outputs.is_empty() {
            return self.ctx.enqueue(None, container);
        }

        let query = self.ctx.prepare(None, &mut container)?;
        let outputs = std::mem::take(&mut self.outputs);
        self.ctx.push(
            Command::new(query, None).on_complete(Box::new(move |rows| read_outputs(outputs, rows))),
        );
        Ok(())
    }

    /// Run the call now and map its rows into `T`.
    ///
    /// With output parameters the last row carries their values and is not
    /// mapped. An execution override for `T` bypasses the database, so output
    /// callbacks do not run.
    pub fn execute_as<T: FromRow + 'static>(mut self) -> OrmResult<Vec<T>> {
        let mut container = self.build()?;
        let subject = Some(TypeId::of::<T>());
        let query = self.ctx.prepare(subject, &mut container)?;
        self.ctx.check_execute(subject, &query)?;

        let mut rows = match self.ctx.fetch::<T>(&query)? {
            Fetched::Supplied(items) => return Ok(items),
            Fetched::Rows(rows) => rows,
        };
        if !self.outputs.is_empty() {
            let outputs = std::mem::take(&mut self.outputs);
            read_outputs(outputs, &rows)?;
            rows.pop();
        }
        rows.iter().map(T::from_row).collect()
    }
}

fn read_outputs(outputs: Vec<OutputParameter>, rows: &[Row]) -> OrmResult<()> {
    let row = rows
        .last()
        .ok_or_else(|| OrmError::execution("procedure returned no output parameter row"))?;
    for output in outputs {
        let column = output.name.trim_start_matches('@');
        let value = row
            .get(column)
            .ok_or_else(|| OrmError::decode(column, "output parameter missing from result"))?;
        (output.callback)(value)?;
    }
    Ok(())
}
