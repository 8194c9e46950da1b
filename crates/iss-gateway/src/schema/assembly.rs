//! Schema assembly: reference pages + live metadata → query fields.

use super::{FieldArgument, PathArgument, QueryField, QuerySchema, RowField, RowType, SkippedReference};
use crate::client::{BlockMetadata, IssClient};
use crate::config::{GatewayConfig, OnReferenceError, ReferenceSource};
use crate::error::{GatewayError, GatewayResult};
use crate::naming::{query_field_name, row_type_name, snake_case};
use futures::stream::{self, StreamExt};
use iss_reference::{substitute, PrimitiveType, Reference};
use std::collections::{BTreeMap, HashMap};
use tracing::{debug, info, warn};

/// Fetch and parse every configured reference, then compose the schema.
///
/// References are fetched concurrently (bounded by `concurrency`) and
/// joined in configuration order, so field order is reproducible.
pub async fn assemble(client: &IssClient, config: &GatewayConfig) -> GatewayResult<QuerySchema> {
    info!(
        references = config.references.len(),
        base_url = client.base_url(),
        "assembling query schema"
    );

    let results: Vec<(u32, GatewayResult<Vec<QueryField>>)> = stream::iter(config.references.iter())
        .map(|source| async move { (source.id, load_reference(client, source).await) })
        .buffered(config.concurrency)
        .collect()
        .await;

    let schema = compose(results, config.on_reference_error)?;
    info!(
        fields = schema.fields.len(),
        skipped = schema.skipped.len(),
        "query schema ready"
    );
    Ok(schema)
}

/// Fields for one reference page.
pub async fn load_reference(client: &IssClient, source: &ReferenceSource) -> GatewayResult<Vec<QueryField>> {
    let markup = client.fetch_reference(source.id).await?;
    let reference = iss_reference::parse(&markup)?;

    let metadata_path = substitute(&reference.path, &source.default_args);
    let metadata = client.fetch_metadata(&metadata_path).await?;

    build_fields(source, &reference, &metadata)
}

/// One query field per block, in block order.
///
/// Every type name is checked here, so a reference either yields all of
/// its fields or fails as a whole.
pub fn build_fields(
    source: &ReferenceSource,
    reference: &Reference,
    metadata: &BTreeMap<String, BlockMetadata>,
) -> GatewayResult<Vec<QueryField>> {
    let path_args: Vec<PathArgument> = reference
        .required_args
        .iter()
        .map(|name| PathArgument {
            name: name.clone(),
            default: source.default_args.get(name).cloned(),
        })
        .collect();

    let mut fields = Vec::with_capacity(reference.blocks.len());
    for block in &reference.blocks {
        let name = query_field_name(source, &block.name);

        let block_meta = metadata.get(&block.name).ok_or_else(|| GatewayError::MissingMetadata {
            path: reference.path.clone(),
            block: block.name.clone(),
        })?;
        if block_meta.fields.is_empty() {
            return Err(GatewayError::EmptyBlock {
                path: reference.path.clone(),
                block: block.name.clone(),
            });
        }
        let row_type = build_row_type(&name, block_meta)?;

        let mut args = Vec::with_capacity(block.args.len());
        for arg in &block.args {
            if reference.required_args.contains(&arg.name) {
                debug!(field = %name, arg = %arg.name, "argument shadowed by path parameter");
                continue;
            }
            args.push(FieldArgument {
                name: arg.name.clone(),
                description: arg.description.clone(),
                primitive: arg.ty,
                kind: arg.ty.scalar_kind(),
            });
        }

        debug!(field = %name, block = %block.name, args = args.len(), "built query field");
        fields.push(QueryField {
            name,
            description: block.description.clone(),
            reference_id: source.id,
            block: block.name.clone(),
            path: reference.path.clone(),
            path_args: path_args.clone(),
            args,
            row_type,
        });
    }
    Ok(fields)
}

fn build_row_type(field_name: &str, metadata: &BlockMetadata) -> GatewayResult<RowType> {
    let fields = metadata
        .fields
        .iter()
        .map(|column| -> GatewayResult<RowField> {
            let primitive = column.type_name.parse::<PrimitiveType>()?;
            Ok(RowField {
                name: snake_case(&column.name),
                column: column.name.clone(),
                primitive,
                kind: primitive.scalar_kind(),
            })
        })
        .collect::<GatewayResult<Vec<_>>>()?;
    let name = row_type_name(field_name);

    let mut columns: HashMap<&str, &str> = HashMap::new();
    for field in &fields {
        if let Some(first) = columns.insert(field.name.as_str(), field.column.as_str()) {
            return Err(GatewayError::NameCollision {
                kind: "row field",
                name: format!("{name}.{}", field.name),
                first: format!("column {first}"),
                second: format!("column {}", field.column),
            });
        }
    }

    Ok(RowType { name, fields })
}

/// Merge per-reference results into one schema.
///
/// Failed references are skipped or abort assembly per `policy`. Name
/// collisions always abort.
pub fn compose(
    results: Vec<(u32, GatewayResult<Vec<QueryField>>)>,
    policy: OnReferenceError,
) -> GatewayResult<QuerySchema> {
    let mut fields: Vec<QueryField> = Vec::new();
    let mut skipped = Vec::new();

    for (id, result) in results {
        match result {
            Ok(mut part) => fields.append(&mut part),
            Err(e) if policy == OnReferenceError::Skip => {
                warn!("skipping reference {id}: {e}");
                skipped.push(SkippedReference {
                    id,
                    reason: e.to_string(),
                });
            }
            Err(e) => return Err(e),
        }
    }

    check_unique("query field", fields.iter().map(|f| (f.name.as_str(), f)))?;
    check_unique("row type", fields.iter().map(|f| (f.row_type.name.as_str(), f)))?;

    Ok(QuerySchema {
        fields,
        skipped,
        generated_at: chrono::Utc::now(),
    })
}

fn check_unique<'a>(
    kind: &'static str,
    names: impl Iterator<Item = (&'a str, &'a QueryField)>,
) -> GatewayResult<()> {
    let mut owners: HashMap<&str, &QueryField> = HashMap::new();
    for (name, field) in names {
        if let Some(first) = owners.insert(name, field) {
            return Err(GatewayError::NameCollision {
                kind,
                name: name.to_string(),
                first: origin(first),
                second: origin(field),
            });
        }
    }
    Ok(())
}

fn origin(field: &QueryField) -> String {
    format!("reference {} block {}", field.reference_id, field.block)
}
