//! Query parameter codecs for keychain requests.
//!
//! - `calls`: repeated, one JSON-serialized `Call` each, order preserved
//! - `typedData`: single JSON-serialized `TypedData`

use url::form_urlencoded;

use keychain_types::{Call, QueryBuilder, Result, TypedData};

pub const CALLS_PARAM: &str = "calls";
pub const TYPED_DATA_PARAM: &str = "typedData";

/// Encode calls as `calls=<json>&calls=<json>...`.
pub fn encode_calls(calls: &[Call]) -> Result<String> {
    let mut query = QueryBuilder::new();
    for call in calls {
        query.append(CALLS_PARAM, &serde_json::to_string(call)?);
    }
    Ok(query.finish())
}

/// Decode every `calls` param of `query`, in order.
pub fn decode_calls(query: &str) -> Result<Vec<Call>> {
    form_urlencoded::parse(query.as_bytes())
        .filter(|(k, _)| k == CALLS_PARAM)
        .map(|(_, v)| serde_json::from_str(&v).map_err(Into::into))
        .collect()
}

/// Encode `typed_data` as a single `typedData` param.
pub fn encode_typed_data(typed_data: &TypedData) -> Result<String> {
    let json = serde_json::to_string(typed_data)?;
    Ok(QueryBuilder::new().append(TYPED_DATA_PARAM, &json).finish())
}

/// Decode the first `typedData` param of `query`.
pub fn decode_typed_data(query: &str) -> Result<Option<TypedData>> {
    form_urlencoded::parse(query.as_bytes())
        .find(|(k, _)| k == TYPED_DATA_PARAM)
        .map(|(_, v)| serde_json::from_str(&v).map_err(Into::into))
        .transpose()
}
