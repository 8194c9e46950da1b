//! GraphQL SDL rendering of the composed schema.

use super::{QueryField, QuerySchema, RowType, QUERY_TYPE_NAME};

/// Render the schema as GraphQL SDL.
pub fn render_sdl(schema: &QuerySchema) -> String {
    let mut out = String::new();

    out.push_str("# Auto-generated MOEX ISS query schema\n");
    out.push_str(&format!(
        "# {} fields, {} skipped references, generated {}\n\n",
        schema.fields.len(),
        schema.skipped.len(),
        schema.generated_at.to_rfc3339()
    ));

    out.push_str("scalar Date\n");
    out.push_str("scalar DateTime\n\n");

    for field in &schema.fields {
        render_row_type(&mut out, &field.row_type);
    }

    out.push_str(&format!("type {QUERY_TYPE_NAME} {{\n"));
    for field in &schema.fields {
        render_query_field(&mut out, field);
    }
    out.push_str("}\n\n");

    out.push_str(&format!("schema {{\n  query: {QUERY_TYPE_NAME}\n}}\n"));
    out
}

fn render_row_type(out: &mut String, row_type: &RowType) {
    out.push_str(&format!("type {} {{\n", row_type.name));
    for field in &row_type.fields {
        out.push_str(&format!(
            "  {}: {}\n",
            field.name,
            field.kind.graphql_name()
        ));
    }
    out.push_str("}\n\n");
}

fn render_query_field(out: &mut String, field: &QueryField) {
    push_description(out, "  ", &field.description);

    let mut params: Vec<String> = Vec::new();
    for arg in &field.path_args {
        match &arg.default {
            Some(default) => params.push(format!("{}: String = {}", arg.name, string_literal(default))),
            None => params.push(format!("{}: String!", arg.name)),
        }
    }

    let has_docs = field.args.iter().any(|a| !a.description.is_empty());
    for arg in &field.args {
        let mut param = String::new();
        if has_docs && !arg.description.is_empty() {
            param.push_str(&string_literal(&arg.description));
            param.push(' ');
        }
        param.push_str(&format!("{}: {}", arg.name, arg.kind.graphql_name()));
        params.push(param);
    }

    let params_str = if params.is_empty() {
        String::new()
    } else if has_docs {
        format!("(\n    {}\n  )", params.join("\n    "))
    } else {
        format!("({})", params.join(", "))
    };

    out.push_str(&format!(
        "  {}{params_str}: [{}]\n",
        field.name, field.row_type.name
    ));
}

fn push_description(out: &mut String, indent: &str, text: &str) {
    if text.is_empty() {
        return;
    }
    out.push_str(indent);
    out.push_str("\"\"\"\n");
    for line in text.replace("\"\"\"", "\\\"\"\"").lines() {
        out.push_str(indent);
        out.push_str(line.trim_end());
        out.push('\n');
    }
    out.push_str(indent);
    out.push_str("\"\"\"\n");
}

/// A single-line GraphQL string literal.
fn string_literal(value: &str) -> String {
    let mut s = String::with_capacity(value.len() + 2);
    s.push('"');
    for c in value.chars() {
        match c {
            '"' => s.push_str("\\\""),
            '\\' => s.push_str("\\\\"),
            '\n' => s.push_str("\\n"),
            '\r' => s.push_str("\\r"),
            '\t' => s.push_str("\\t"),
            c => s.push(c),
        }
    }
    s.push('"');
    s
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::{FieldArgument, PathArgument, RowField};
    use iss_reference::{PrimitiveType, ScalarKind};

    fn schema() -> QuerySchema {
        QuerySchema {
            fields: vec![QueryField {
                name: "securityBoards".to_string(),
                description: "Boards the security \"trades\" on".to_string(),
                reference_id: 13,
                block: "boards".to_string(),
                path: "securities/[security]".to_string(),
                path_args: vec![PathArgument {
                    name: "security".to_string(),
                    default: None,
                }],
                args: vec![FieldArgument {
                    name: "lang".to_string(),
                    description: "Language: ru or en".to_string(),
                    primitive: PrimitiveType::String,
                    kind: ScalarKind::String,
                }],
                row_type: RowType {
                    name: "SecurityBoard".to_string(),
                    fields: vec![
                        RowField {
                            name: "secid".to_string(),
                            column: "secid".to_string(),
                            primitive: PrimitiveType::String,
                            kind: ScalarKind::String,
                        },
                        RowField {
                            name: "listed_from".to_string(),
                            column: "listed_from".to_string(),
                            primitive: PrimitiveType::Date,
                            kind: ScalarKind::Date,
                        },
                    ],
                },
            }],
            skipped: vec![],
            generated_at: chrono::Utc::now(),
        }
    }

    #[test]
    fn test_sdl_row_type() {
        let sdl = render_sdl(&schema());
        assert!(sdl.contains("type SecurityBoard {\n  secid: String\n  listed_from: Date\n}"));
        assert!(sdl.contains("scalar DateTime"));
    }

    #[test]
    fn test_sdl_query_field() {
        let sdl = render_sdl(&schema());
        assert!(sdl.contains("type MoexIssQueries {"));
        assert!(sdl.contains("security: String!"));
        assert!(sdl.contains("\"Language: ru or en\" lang: String"));
        assert!(sdl.contains("): [SecurityBoard]"));
        assert!(sdl.contains("Boards the security \"trades\" on"));
        assert!(sdl.ends_with("schema {\n  query: MoexIssQueries\n}\n"));
    }

    #[test]
    fn test_sdl_default_path_arg() {
        let mut s = schema();
        s.fields[0].path_args[0].default = Some("SBER".to_string());
        s.fields[0].args.clear();
        let sdl = render_sdl(&s);
        assert!(sdl.contains("  securityBoards(security: String = \"SBER\"): [SecurityBoard]\n"));
    }

    #[test]
    fn test_string_literal_escapes() {
        assert_eq!(string_literal("a\"b\\c\nd"), "\"a\\\"b\\\\c\\nd\"");
    }
}
