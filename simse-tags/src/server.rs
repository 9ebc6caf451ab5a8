// ---------------------------------------------------------------------------
// TagServer: JSON-RPC dispatcher
// ---------------------------------------------------------------------------
//
// Routes incoming JSON-RPC 2.0 requests (NDJSON over stdin) to a single
// TagIndex owned by the server. Item metadata is a flat string map, and
// query filters are lists of key/value equality conditions.
// ---------------------------------------------------------------------------

use std::collections::HashMap;
use std::io::{self, BufRead};

use serde::{Deserialize, Serialize};

use crate::codec::ExportedData;
use crate::config::IndexConfig;
use crate::error::TagIndexError;
use crate::index::TagIndex;
use crate::protocol::*;
use crate::query_cache::{Filter, QueryOptions};
use crate::transport::NdjsonTransport;
use crate::types::{CategoryWeight, IndexTag, Item, Tag};

/// Metadata attached to items served over JSON-RPC.
pub type Metadata = HashMap<String, String>;

// ---------------------------------------------------------------------------
// Server
// ---------------------------------------------------------------------------

pub struct TagServer {
	transport: NdjsonTransport,
	index: TagIndex<Metadata>,
}

impl TagServer {
	pub fn new(transport: NdjsonTransport, config: IndexConfig) -> Self {
		Self {
			transport,
			index: TagIndex::with_config(config),
		}
	}

	/// Main loop: read JSON-RPC messages from stdin, dispatch to handlers.
	pub fn run(&mut self) -> Result<(), TagIndexError> {
		let stdin = io::stdin();
		let reader = stdin.lock();

		for line_result in reader.lines() {
			let line = line_result?;
			if line.trim().is_empty() {
				continue;
			}

			let request: JsonRpcRequest = match serde_json::from_str(&line) {
				Ok(r) => r,
				Err(e) => {
					tracing::error!("Failed to parse request: {}", e);
					continue;
				}
			};

			self.dispatch(request);
		}

		Ok(())
	}

	// ── Dispatch ──────────────────────────────────────────────────────────

	fn dispatch(&mut self, req: JsonRpcRequest) {
		let id = req.id;
		let index = &mut self.index;
		let result = match req.method.as_str() {
			// -- Category index ------------------------------------------
			"index/build" => handle_build(index, req.params),
			"index/stats" => handle_stats(index, req.params),
			"index/export" => handle_export(index, req.params),
			"index/import" => handle_import(index, req.params),

			// -- Weights -------------------------------------------------
			"weights/set" => handle_set_weight(index, req.params),
			"weights/setMany" => handle_set_weights(index, req.params),
			"weights/get" => handle_get_weight(index, req.params),
			"weights/getAll" => Ok(serde_json::json!({
				"weights": index.get_all_category_weights(),
			})),

			// -- Items ---------------------------------------------------
			"items/add" => handle_add(index, req.params),
			"items/addBatch" => handle_add_batch(index, req.params),
			"items/remove" => handle_remove(index, req.params),

			// -- Query ---------------------------------------------------
			"query/run" => handle_query(index, req.params),
			"query/first" => handle_query_first(index, req.params),
			"query/clearCache" => {
				index.clear_query_cache();
				Ok(serde_json::json!({}))
			}

			// -- Unknown -------------------------------------------------
			_ => {
				self.transport.write_error(
					id,
					METHOD_NOT_FOUND,
					format!("Unknown method: {}", req.method),
					None,
				);
				return;
			}
		};

		match result {
			Ok(value) => self.transport.write_response(id, value),
			Err(e) => {
				let code = match e {
					TagIndexError::InvalidParams(_) => INVALID_PARAMS,
					_ => TAGS_ERROR,
				};
				self.transport
					.write_error(id, code, e.to_string(), Some(e.to_json_rpc_error()));
			}
		}
	}
}

// ---------------------------------------------------------------------------
// Param types
// ---------------------------------------------------------------------------

fn parse_params<T: serde::de::DeserializeOwned>(
	params: serde_json::Value,
) -> Result<T, TagIndexError> {
	serde_json::from_value(params).map_err(|e| TagIndexError::InvalidParams(e.to_string()))
}

/// One equality condition on item metadata.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct MetadataCondition {
	pub key: String,
	pub value: String,
}

/// Build a filter from equality conditions. All conditions must hold; items
/// without metadata never match. The filter token is derived from the sorted
/// conditions, so repeating the same conditions reuses the cached ranking.
/// An empty list means no filter.
pub fn metadata_filter(conditions: &[MetadataCondition]) -> Option<Filter<Metadata>> {
	if conditions.is_empty() {
		return None;
	}

	let mut conditions = conditions.to_vec();
	conditions.sort();
	conditions.dedup();

	let token = condition_token(&conditions);
	Some(Filter::keyed(token, move |meta: Option<&Metadata>| {
		meta.is_some_and(|m| {
			conditions
				.iter()
				.all(|c| m.get(&c.key).is_some_and(|v| *v == c.value))
		})
	}))
}

/// Cache token for sorted, deduplicated conditions. Keys and values are
/// Debug-quoted so separators inside them cannot collide.
fn condition_token(conditions: &[MetadataCondition]) -> String {
	let parts: Vec<String> = conditions
		.iter()
		.map(|c| format!("{:?}={:?}", c.key, c.value))
		.collect();
	format!("meta:{}", parts.join(","))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct BuildParams {
	tags: Vec<IndexTag>,
}

#[derive(Deserialize, Default)]
#[serde(rename_all = "camelCase")]
struct FilterParams {
	#[serde(default)]
	filter: Vec<MetadataCondition>,
}

#[derive(Deserialize, Default)]
#[serde(rename_all = "camelCase")]
struct ExportParams {
	#[serde(default)]
	include_items: bool,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct SetWeightParams {
	category: String,
	weight: f64,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct SetWeightsParams {
	weights: Vec<CategoryWeight>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct CategoryParams {
	category: String,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct AddBatchParams {
	items: Vec<Item<Metadata>>,
	batch_size: Option<usize>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct RemoveParams {
	ids: Vec<String>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct QueryParams {
	tags: Vec<Tag>,
	page: Option<usize>,
	size: Option<usize>,
	#[serde(default)]
	filter: Vec<MetadataCondition>,
}

/// Missing or null params deserialize as the type's default.
fn parse_optional_params<T>(params: serde_json::Value) -> Result<T, TagIndexError>
where
	T: serde::de::DeserializeOwned + Default,
{
	if params.is_null() {
		return Ok(T::default());
	}
	parse_params(params)
}

// ---------------------------------------------------------------------------
// Handlers
// ---------------------------------------------------------------------------

type Index = TagIndex<Metadata>;

fn handle_build(
	index: &mut Index,
	params: serde_json::Value,
) -> Result<serde_json::Value, TagIndexError> {
	let p: BuildParams = parse_params(params)?;
	index.build_index(&p.tags);
	Ok(serde_json::json!({ "vectorSize": index.vector_size() }))
}

fn handle_stats(
	index: &Index,
	params: serde_json::Value,
) -> Result<serde_json::Value, TagIndexError> {
	let p: FilterParams = parse_optional_params(params)?;
	let filter = metadata_filter(&p.filter);
	let stats = index.get_stats(filter.as_ref());
	Ok(serde_json::to_value(stats)?)
}

fn handle_export(
	index: &Index,
	params: serde_json::Value,
) -> Result<serde_json::Value, TagIndexError> {
	let p: ExportParams = parse_optional_params(params)?;
	Ok(serde_json::to_value(index.export_index(p.include_items))?)
}

fn handle_import(
	index: &mut Index,
	params: serde_json::Value,
) -> Result<serde_json::Value, TagIndexError> {
	let data: ExportedData = parse_params(params)?;
	index.import_index(data)?;
	Ok(serde_json::json!({
		"vectorSize": index.vector_size(),
		"totalItems": index.item_count(),
	}))
}

fn handle_set_weight(
	index: &mut Index,
	params: serde_json::Value,
) -> Result<serde_json::Value, TagIndexError> {
	let p: SetWeightParams = parse_params(params)?;
	index.set_category_weight(&p.category, p.weight);
	Ok(serde_json::json!({}))
}

fn handle_set_weights(
	index: &mut Index,
	params: serde_json::Value,
) -> Result<serde_json::Value, TagIndexError> {
	let p: SetWeightsParams = parse_params(params)?;
	index.set_category_weights(&p.weights);
	Ok(serde_json::json!({}))
}

fn handle_get_weight(
	index: &Index,
	params: serde_json::Value,
) -> Result<serde_json::Value, TagIndexError> {
	let p: CategoryParams = parse_params(params)?;
	Ok(serde_json::json!({ "weight": index.get_category_weight(&p.category) }))
}

fn handle_add(
	index: &mut Index,
	params: serde_json::Value,
) -> Result<serde_json::Value, TagIndexError> {
	let item: Item<Metadata> = parse_params(params)?;
	index.add_item(item);
	Ok(serde_json::json!({}))
}

fn handle_add_batch(
	index: &mut Index,
	params: serde_json::Value,
) -> Result<serde_json::Value, TagIndexError> {
	let p: AddBatchParams = parse_params(params)?;
	let count = index.add_item_batch(p.items, p.batch_size);
	Ok(serde_json::json!({ "count": count }))
}

fn handle_remove(
	index: &mut Index,
	params: serde_json::Value,
) -> Result<serde_json::Value, TagIndexError> {
	let p: RemoveParams = parse_params(params)?;
	let removed = index.remove_items(&p.ids);
	Ok(serde_json::json!({ "removed": removed }))
}

fn handle_query(
	index: &mut Index,
	params: serde_json::Value,
) -> Result<serde_json::Value, TagIndexError> {
	let p: QueryParams = parse_params(params)?;
	let filter = metadata_filter(&p.filter);

	let mut options = QueryOptions::new().page(p.page.unwrap_or(1));
	if let Some(size) = p.size {
		options = options.size(size);
	}
	if let Some(f) = filter.as_ref() {
		options = options.filter(f);
	}

	let results = index.query(&p.tags, options);
	Ok(serde_json::json!({ "results": results }))
}

fn handle_query_first(
	index: &mut Index,
	params: serde_json::Value,
) -> Result<serde_json::Value, TagIndexError> {
	let p: QueryParams = parse_params(params)?;
	let filter = metadata_filter(&p.filter);
	let result = index.query_first(&p.tags, filter.as_ref());
	Ok(serde_json::json!({ "result": result }))
}
