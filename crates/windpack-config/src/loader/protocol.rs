//! Messages exchanged with the Node.js bridge, one JSON object per line.

use serde::{Deserialize, Serialize};
use serde_json::Value;

#[derive(Debug, Serialize)]
#[serde(tag = "op", rename_all = "lowercase")]
pub(crate) enum Request<'a> {
    /// Import a module by URL and return its default export. Handles in the
    /// result belong to `scope`.
    Load {
        id: u64,
        url: &'a str,
        scope: &'a str,
    },
    /// Call a function handle. Handles in the result share the function's
    /// scope.
    Call {
        id: u64,
        #[serde(rename = "fn")]
        function: u64,
        args: &'a [Value],
    },
    /// Drop every handle belonging to `scope`.
    Release { id: u64, scope: &'a str },
}

impl Request<'_> {
    pub(crate) fn id(&self) -> u64 {
        match self {
            Request::Load { id, .. } | Request::Call { id, .. } | Request::Release { id, .. } => *id,
        }
    }
}

#[derive(Debug, Deserialize)]
pub(crate) struct Response {
    pub(crate) id: u64,
    pub(crate) ok: bool,
    /// Absent when the result was `undefined`.
    #[serde(default)]
    pub(crate) value: Option<Value>,
    #[serde(default)]
    pub(crate) error: Option<RemoteError>,
}

/// An exception thrown on the JavaScript side.
#[derive(Debug, Clone, Deserialize)]
pub(crate) struct RemoteError {
    pub(crate) message: String,
    #[serde(default)]
    pub(crate) stack: Option<String>,
}

impl Response {
    pub(crate) fn into_result(self) -> Result<Value, RemoteError> {
        if self.ok {
            Ok(self.value.unwrap_or(Value::Null))
        } else {
            Err(self.error.unwrap_or_else(|| RemoteError {
                message: "unknown error".into(),
                stack: None,
            }))
        }
    }
}
