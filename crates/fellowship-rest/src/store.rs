//! HTTP-backed document store.

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{Map, Value, json};
use tracing::{debug, instrument};

use fellowship_core::document::{Fields, RemoteDocument, is_server_timestamp};
use fellowship_core::error::{Error, ProtocolError};
use fellowship_core::query::{Direction, Filter, Operator, QuerySpec};
use fellowship_core::traits::RemoteStore;
use fellowship_core::types::{CollectionName, DocumentId};
use fellowship_core::{AccessToken, Result, StoreConfig};

use crate::client::RestClient;
use crate::value::{decode_fields, encode_fields, encode_value, field_path, quote_segment};

const DATABASE: &str = "(default)";

/// A document as it appears on the wire.
#[derive(Debug, Deserialize)]
struct WireDocument {
    name: String,
    #[serde(default)]
    fields: Map<String, Value>,
}

/// One element of a `runQuery` response stream.
#[derive(Debug, Deserialize)]
struct RunQueryItem {
    #[serde(default)]
    document: Option<WireDocument>,
}

/// A document store reached over its REST interface.
#[derive(Debug, Clone)]
pub struct RestRemoteStore {
    client: RestClient,
    project_id: String,
}

impl RestRemoteStore {
    /// Create a store client for the project in `config`.
    pub fn new(config: &StoreConfig) -> Result<Self> {
        let client = RestClient::new(config.endpoint.clone(), config.api_key.clone())?;
        Ok(Self {
            client,
            project_id: config.project_id.clone(),
        })
    }

    pub fn project_id(&self) -> &str {
        &self.project_id
    }

    /// Resource name of the database's document root.
    fn root_name(&self) -> String {
        format!("projects/{}/databases/{}/documents", self.project_id, DATABASE)
    }

    fn document_name(&self, collection: &CollectionName, id: &DocumentId) -> String {
        format!("{}/{}/{}", self.root_name(), collection, id)
    }

    /// URL path segments for the root, with an optional `:method` suffix.
    fn root_segments(&self, method: Option<&str>) -> Vec<String> {
        let last = match method {
            Some(method) => format!("documents:{}", method),
            None => "documents".to_string(),
        };
        vec![
            "v1".to_string(),
            "projects".to_string(),
            self.project_id.clone(),
            "databases".to_string(),
            DATABASE.to_string(),
            last,
        ]
    }

    fn into_document(wire: WireDocument) -> Result<RemoteDocument> {
        let raw_id = wire.name.rsplit('/').next().unwrap_or_default();
        let id = DocumentId::new(raw_id)?;
        Ok(RemoteDocument::new(id, decode_fields(wire.fields)?))
    }

    async fn commit(&self, writes: Vec<Value>, token: Option<&AccessToken>) -> Result<()> {
        let segments = self.root_segments(Some("commit"));
        let segments: Vec<&str> = segments.iter().map(String::as_str).collect();
        let _: Value = self
            .client
            .post(&segments, &json!({ "writes": writes }), token)
            .await?;
        Ok(())
    }

    /// Build an update write. `exists` sets a precondition; `merge` limits
    /// the write to the given top-level fields.
    fn update_write(
        &self,
        collection: &CollectionName,
        id: &DocumentId,
        fields: &Fields,
        merge: bool,
        exists: Option<bool>,
    ) -> Result<Value> {
        let encoded = encode_fields(fields)?;

        let mut write = Map::new();
        write.insert(
            "update".to_string(),
            json!({
                "name": self.document_name(collection, id),
                "fields": encoded.fields,
            }),
        );

        if merge {
            let mask: Vec<String> = fields
                .iter()
                .filter(|(_, v)| !is_server_timestamp(v))
                .map(|(k, _)| quote_segment(k))
                .collect();
            write.insert("updateMask".to_string(), json!({ "fieldPaths": mask }));
        }

        if let Some(exists) = exists {
            write.insert("currentDocument".to_string(), json!({ "exists": exists }));
        }

        if !encoded.server_timestamps.is_empty() {
            let transforms: Vec<Value> = encoded
                .server_timestamps
                .iter()
                .map(|path| json!({ "fieldPath": path, "setToServerValue": "REQUEST_TIME" }))
                .collect();
            write.insert("updateTransforms".to_string(), Value::Array(transforms));
        }

        Ok(Value::Object(write))
    }
}

fn operator_name(op: Operator) -> &'static str {
    match op {
        Operator::Eq => "EQUAL",
        Operator::Ne => "NOT_EQUAL",
        Operator::Lt => "LESS_THAN",
        Operator::Le => "LESS_THAN_OR_EQUAL",
        Operator::Gt => "GREATER_THAN",
        Operator::Ge => "GREATER_THAN_OR_EQUAL",
        Operator::ArrayContains => "ARRAY_CONTAINS",
        Operator::In => "IN",
    }
}

fn encode_filter(filter: &Filter) -> Result<Value> {
    let field = json!({ "fieldPath": field_path(&filter.field) });

    // Equality with null is a unary test on the wire.
    if filter.value.is_null() {
        match filter.op {
            Operator::Eq => {
                return Ok(json!({ "unaryFilter": { "field": field, "op": "IS_NULL" } }));
            }
            Operator::Ne => {
                return Ok(json!({ "unaryFilter": { "field": field, "op": "IS_NOT_NULL" } }));
            }
            _ => {}
        }
    }

    Ok(json!({
        "fieldFilter": {
            "field": field,
            "op": operator_name(filter.op),
            "value": encode_value(&filter.value)?,
        }
    }))
}

/// Encode a query as a `structuredQuery` over one collection.
pub(crate) fn structured_query(collection: &CollectionName, query: &QuerySpec) -> Result<Value> {
    let mut structured = Map::new();
    structured.insert("from".to_string(), json!([{ "collectionId": collection.as_str() }]));

    let mut filters = query
        .filters()
        .iter()
        .map(encode_filter)
        .collect::<Result<Vec<_>>>()?;

    if filters.len() == 1 {
        structured.insert("where".to_string(), filters.remove(0));
    } else if !filters.is_empty() {
        structured.insert(
            "where".to_string(),
            json!({ "compositeFilter": { "op": "AND", "filters": filters } }),
        );
    }

    if let Some(order) = query.ordering() {
        let direction = match order.direction {
            Direction::Asc => "ASCENDING",
            Direction::Desc => "DESCENDING",
        };
        structured.insert(
            "orderBy".to_string(),
            json!([{ "field": { "fieldPath": field_path(&order.field) }, "direction": direction }]),
        );
    }

    if let Some(limit) = query.limit_value() {
        structured.insert("limit".to_string(), json!(limit));
    }

    Ok(json!({ "structuredQuery": structured }))
}

/// Map a wire 404 for a single document onto [`Error::NotFound`].
fn not_found_for(err: Error, collection: &CollectionName, id: &DocumentId) -> Error {
    match err {
        Error::Protocol(ProtocolError { status: 404, .. }) => Error::not_found(collection, id),
        other => other,
    }
}

#[async_trait]
impl RemoteStore for RestRemoteStore {
    #[instrument(skip(self, token), fields(%collection))]
    async fn run_query(
        &self,
        collection: &CollectionName,
        query: &QuerySpec,
        token: Option<&AccessToken>,
    ) -> Result<Vec<RemoteDocument>> {
        query.validate()?;
        let body = structured_query(collection, query)?;

        let segments = self.root_segments(Some("runQuery"));
        let segments: Vec<&str> = segments.iter().map(String::as_str).collect();
        let items: Vec<RunQueryItem> = self.client.post(&segments, &body, token).await?;

        let documents = items
            .into_iter()
            .filter_map(|item| item.document)
            .map(Self::into_document)
            .collect::<Result<Vec<_>>>()?;

        debug!(count = documents.len(), "Query returned");
        Ok(documents)
    }

    #[instrument(skip(self, token), fields(%collection, %id))]
    async fn get_document(
        &self,
        collection: &CollectionName,
        id: &DocumentId,
        token: Option<&AccessToken>,
    ) -> Result<RemoteDocument> {
        let mut segments = self.root_segments(None);
        segments.push(collection.to_string());
        segments.push(id.to_string());
        let segments: Vec<&str> = segments.iter().map(String::as_str).collect();

        let wire: WireDocument = self
            .client
            .get(&segments, token)
            .await
            .map_err(|e| not_found_for(e, collection, id))?;

        Self::into_document(wire)
    }

    #[instrument(skip(self, fields, token), fields(%collection))]
    async fn create_document(
        &self,
        collection: &CollectionName,
        id: Option<&DocumentId>,
        fields: &Fields,
        token: Option<&AccessToken>,
    ) -> Result<DocumentId> {
        let id = id.cloned().unwrap_or_else(DocumentId::generate);
        let write = self.update_write(collection, &id, fields, false, Some(false))?;
        self.commit(vec![write], token).await?;
        debug!(%id, "Created document");
        Ok(id)
    }

    #[instrument(skip(self, fields, token), fields(%collection, %id))]
    async fn update_document(
        &self,
        collection: &CollectionName,
        id: &DocumentId,
        fields: &Fields,
        merge: bool,
        token: Option<&AccessToken>,
    ) -> Result<()> {
        let write = self.update_write(collection, id, fields, merge, Some(true))?;
        self.commit(vec![write], token)
            .await
            .map_err(|e| not_found_for(e, collection, id))
    }

    #[instrument(skip(self, fields, token), fields(%collection, %id))]
    async fn set_document(
        &self,
        collection: &CollectionName,
        id: &DocumentId,
        fields: &Fields,
        merge: bool,
        token: Option<&AccessToken>,
    ) -> Result<()> {
        let write = self.update_write(collection, id, fields, merge, None)?;
        self.commit(vec![write], token).await
    }

    #[instrument(skip(self, token), fields(%collection, %id))]
    async fn delete_document(
        &self,
        collection: &CollectionName,
        id: &DocumentId,
        token: Option<&AccessToken>,
    ) -> Result<()> {
        let write = json!({ "delete": self.document_name(collection, id) });
        self.commit(vec![write], token).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use fellowship_core::StoreUrl;

    fn store() -> RestRemoteStore {
        let config = StoreConfig::new("key", "demo", StoreUrl::new("https://firestore.googleapis.com").unwrap());
        RestRemoteStore::new(&config).unwrap()
    }

    fn events() -> CollectionName {
        CollectionName::new("events").unwrap()
    }

    #[test]
    fn encodes_order_and_limit() {
        let query = QuerySpec::new().order_by("date", Direction::Asc).limit(20);
        let body = structured_query(&events(), &query).unwrap();

        assert_eq!(
            body,
            json!({
                "structuredQuery": {
                    "from": [{ "collectionId": "events" }],
                    "orderBy": [{ "field": { "fieldPath": "date" }, "direction": "ASCENDING" }],
                    "limit": 20
                }
            })
        );
    }

    #[test]
    fn multiple_filters_become_a_composite() {
        let query = QuerySpec::new()
            .filter("important", Operator::Eq, json!(true))
            .filter("author", Operator::Eq, Value::Null);
        let body = structured_query(&events(), &query).unwrap();

        let filters = &body["structuredQuery"]["where"]["compositeFilter"]["filters"];
        assert_eq!(
            filters[0]["fieldFilter"]["value"],
            json!({ "booleanValue": true })
        );
        assert_eq!(filters[1]["unaryFilter"]["op"], json!("IS_NULL"));
    }

    #[test]
    fn merge_write_masks_fields_and_transforms_sentinels() {
        let fields = Fields::new(json!({
            "location": "Fellowship Hall",
            "updatedAt": fellowship_core::document::server_timestamp()
        }))
        .unwrap();
        let id = DocumentId::new("abc").unwrap();

        let write = store().update_write(&events(), &id, &fields, true, Some(true)).unwrap();

        assert_eq!(
            write["update"]["name"],
            json!("projects/demo/databases/(default)/documents/events/abc")
        );
        assert_eq!(write["updateMask"]["fieldPaths"], json!(["location"]));
        assert_eq!(write["currentDocument"], json!({ "exists": true }));
        assert_eq!(
            write["updateTransforms"],
            json!([{ "fieldPath": "updatedAt", "setToServerValue": "REQUEST_TIME" }])
        );
        assert!(write["update"]["fields"].get("updatedAt").is_none());
    }

    #[test]
    fn replace_write_has_no_mask() {
        let fields = Fields::new(json!({ "title": "Vespers" })).unwrap();
        let id = DocumentId::new("abc").unwrap();
        let write = store().update_write(&events(), &id, &fields, false, None).unwrap();
        assert!(write.get("updateMask").is_none());
        assert!(write.get("currentDocument").is_none());
    }
}
