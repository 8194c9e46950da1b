//! Query execution: validate arguments, resolve the ISS path, fetch and
//! shape rows.

use crate::client::{IssClient, Row};
use crate::error::{GatewayError, GatewayResult};
use crate::schema::{QueryField, QuerySchema, RowType};
use iss_reference::{normalize, resolve, IssError, ScalarKind};
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use tracing::debug;

/// Execute one query field and return its shaped rows.
pub async fn execute(
    schema: &QuerySchema,
    client: &IssClient,
    field_name: &str,
    args: &Map<String, Value>,
) -> GatewayResult<Vec<Value>> {
    let field = schema
        .field(field_name)
        .ok_or_else(|| GatewayError::UnknownField(field_name.to_string()))?;

    let supplied = prepare_args(field, args)?;
    let resolved = resolve(
        &field.path,
        &field.required_names(),
        &supplied,
        &field.defaults(),
    )?;

    debug!(
        field = field_name,
        path = %resolved.path,
        params = resolved.query.len(),
        "executing query field"
    );

    let rows = client
        .fetch_rows(&resolved.path, &field.block, &resolved.query)
        .await?;
    Ok(rows
        .into_iter()
        .map(|row| shape_row(&field.row_type, row))
        .collect())
}

/// Check supplied arguments against the field and stringify them.
///
/// `null` counts as absent. Path arguments without a default must be
/// present.
pub fn prepare_args(
    field: &QueryField,
    args: &Map<String, Value>,
) -> GatewayResult<BTreeMap<String, String>> {
    let mut supplied = BTreeMap::new();

    for (name, value) in args {
        if value.is_null() {
            continue;
        }
        let kind = if field.path_arg(name).is_some() {
            ScalarKind::String
        } else if let Some(arg) = field.arg(name) {
            arg.kind
        } else {
            return Err(GatewayError::UnknownArgument {
                field: field.name.clone(),
                argument: name.clone(),
            });
        };
        supplied.insert(name.clone(), stringify(name, kind, value)?);
    }

    for arg in &field.path_args {
        if arg.is_required() && !supplied.contains_key(&arg.name) {
            return Err(IssError::MissingRequiredParameter(arg.name.clone()).into());
        }
    }

    Ok(supplied)
}

fn stringify(name: &str, kind: ScalarKind, value: &Value) -> GatewayResult<String> {
    let invalid = || GatewayError::InvalidArgument {
        argument: name.to_string(),
        expected: kind.graphql_name(),
    };

    match kind {
        ScalarKind::Integer if value.is_i64() || value.is_u64() => Ok(value.to_string()),
        ScalarKind::Float if value.is_number() => Ok(value.to_string()),
        ScalarKind::String | ScalarKind::Date | ScalarKind::DateTime => value
            .as_str()
            .map(str::to_string)
            .ok_or_else(invalid),
        _ => Err(invalid()),
    }
}

/// Rename columns to schema names and normalize values by declared type.
/// Columns the row lacks come out as `null`.
pub fn shape_row(row_type: &RowType, mut row: Row) -> Value {
    let mut shaped = Map::with_capacity(row_type.fields.len());
    for field in &row_type.fields {
        let raw = row.remove(&field.column).unwrap_or(Value::Null);
        shaped.insert(field.name.clone(), normalize(field.primitive, raw));
    }
    Value::Object(shaped)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::{FieldArgument, PathArgument, RowField};
    use iss_reference::PrimitiveType;
    use serde_json::json;

    fn field() -> QueryField {
        QueryField {
            name: "engineTurnovers".to_string(),
            description: String::new(),
            reference_id: 95,
            block: "turnovers".to_string(),
            path: "engines/[engine]/turnovers".to_string(),
            path_args: vec![PathArgument {
                name: "engine".to_string(),
                default: None,
            }],
            args: vec![
                FieldArgument {
                    name: "date".to_string(),
                    description: String::new(),
                    primitive: PrimitiveType::Date,
                    kind: ScalarKind::Date,
                },
                FieldArgument {
                    name: "start".to_string(),
                    description: String::new(),
                    primitive: PrimitiveType::Int32,
                    kind: ScalarKind::Integer,
                },
            ],
            row_type: RowType {
                name: "EngineTurnover".to_string(),
                fields: vec![
                    RowField {
                        name: "valtoday".to_string(),
                        column: "VALTODAY".to_string(),
                        primitive: PrimitiveType::Double,
                        kind: ScalarKind::Float,
                    },
                    RowField {
                        name: "updatetime".to_string(),
                        column: "UPDATETIME".to_string(),
                        primitive: PrimitiveType::DateTime,
                        kind: ScalarKind::DateTime,
                    },
                ],
            },
        }
    }

    fn args(v: Value) -> Map<String, Value> {
        v.as_object().cloned().unwrap()
    }

    #[test]
    fn test_prepare_args() {
        let supplied = prepare_args(
            &field(),
            &args(json!({ "engine": "stock", "date": "2021-05-03", "start": 100 })),
        )
        .unwrap();
        assert_eq!(supplied["engine"], "stock");
        assert_eq!(supplied["date"], "2021-05-03");
        assert_eq!(supplied["start"], "100");
    }

    #[test]
    fn test_prepare_args_null_is_absent() {
        let supplied =
            prepare_args(&field(), &args(json!({ "engine": "stock", "date": null }))).unwrap();
        assert!(!supplied.contains_key("date"));
    }

    #[test]
    fn test_prepare_args_missing_required() {
        let err = prepare_args(&field(), &args(json!({ "date": "2021-05-03" }))).unwrap_err();
        assert!(matches!(
            err,
            GatewayError::Reference(IssError::MissingRequiredParameter(ref n)) if n == "engine"
        ));
    }

    #[test]
    fn test_prepare_args_default_satisfies_required() {
        let mut f = field();
        f.path_args[0].default = Some("stock".to_string());
        assert!(prepare_args(&f, &Map::new()).unwrap().is_empty());
    }

    #[test]
    fn test_prepare_args_rejects_unknown_and_mistyped() {
        assert!(matches!(
            prepare_args(&field(), &args(json!({ "engine": "stock", "limit": 5 }))),
            Err(GatewayError::UnknownArgument { .. })
        ));
        assert!(matches!(
            prepare_args(&field(), &args(json!({ "engine": "stock", "start": "ten" }))),
            Err(GatewayError::InvalidArgument { expected: "Int", .. })
        ));
        assert!(matches!(
            prepare_args(&field(), &args(json!({ "engine": 1 }))),
            Err(GatewayError::InvalidArgument { expected: "String", .. })
        ));
    }

    #[test]
    fn test_shape_row() {
        let row = args(json!({
            "NAME": "Stock market",
            "VALTODAY": 1234.5,
            "UPDATETIME": "2021-05-03 18:45:00"
        }));
        let shaped = shape_row(&field().row_type, row);
        assert_eq!(
            shaped,
            json!({ "valtoday": 1234.5, "updatetime": "2021-05-03T18:45:00+03:00" })
        );
    }

    #[test]
    fn test_shape_row_missing_column() {
        let shaped = shape_row(&field().row_type, Map::new());
        assert_eq!(shaped, json!({ "valtoday": null, "updatetime": null }));
    }
}
