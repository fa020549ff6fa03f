use serde::{Deserialize, Serialize};

/// Uniform JSON envelope for every API response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiResponse<T> {
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub code: Option<String>,
}

impl<T> ApiResponse<T> {
    pub fn ok(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            error: None,
            code: None,
        }
    }
}

impl ApiResponse<()> {
    pub fn failure(error: impl Into<String>, code: &str) -> Self {
        Self {
            success: false,
            data: None,
            error: Some(error.into()),
            code: Some(code.to_string()),
        }
    }
}
