use serde::de::{DeserializeOwned, Error as _};
use serde_json::{Map, Value};

use crate::error::{ApiError, Error};
use crate::transport::TransportResponse;

/// A successful (2xx) response: the decoded JSON body plus its status.
///
/// Serializes as the body object with an extra `statusCode` field.
#[derive(Debug, Clone, PartialEq, serde::Serialize)]
pub struct ApiResponse {
    #[serde(rename = "statusCode")]
    pub status_code: u16,
    #[serde(flatten)]
    pub body: Map<String, Value>,
}

impl ApiResponse {
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.body.get(key)
    }

    /// Deserializes the body into a typed struct.
    pub fn json<T: DeserializeOwned>(&self) -> Result<T, serde_json::Error> {
        serde_json::from_value(Value::Object(self.body.clone()))
    }

    /// The body as a JSON object with `statusCode` set.
    pub fn into_value(self) -> Value {
        let mut body = self.body;
        body.insert("statusCode".to_string(), Value::from(self.status_code));
        Value::Object(body)
    }
}

/// Maps a raw transport response onto the result or error the caller sees.
pub(crate) fn parse_response(response: TransportResponse) -> Result<ApiResponse, Error> {
    let status = response.status;
    if !(200..=299).contains(&status) {
        return Err(ApiError::from_response(status, &response.body).into());
    }

    if response.body.trim().is_empty() {
        return Ok(ApiResponse {
            status_code: status,
            body: Map::new(),
        });
    }

    let value: Value = serde_json::from_str(&response.body)
        .map_err(|source| Error::Decode { status, source })?;

    let body = match value {
        Value::Object(map) => map,
        Value::Null => Map::new(),
        other => {
            return Err(Error::Decode {
                status,
                source: serde_json::Error::custom(format!(
                    "expected a JSON object, got {}",
                    kind_of(&other)
                )),
            });
        }
    };

    Ok(ApiResponse {
        status_code: status,
        body,
    })
}

fn kind_of(v: &Value) -> &'static str {
    match v {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}
