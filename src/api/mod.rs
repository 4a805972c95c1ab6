pub mod books;
pub mod replace_rules;
pub mod search;

use axum::Json;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use yuedu_backend::Error;

#[derive(Serialize)]
pub struct ApiResponse<T> {
    pub code: i32,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
}

impl<T> ApiResponse<T> {
    pub fn success(data: T) -> Self {
        Self {
            code: 200,
            message: "success".to_string(),
            data: Some(data),
        }
    }

    pub fn error(message: &str) -> Self {
        Self {
            code: 400,
            message: message.to_string(),
            data: None,
        }
    }

    /// Map a library error to a response code / 错误转换
    pub fn from_error(err: &Error) -> Self {
        let code = match err {
            Error::NotFound(_) => 404,
            Error::InvalidInput(_) => 400,
            _ => 500,
        };
        if code == 500 {
            tracing::error!("Request failed: {}", err);
        }
        Self {
            code,
            message: err.to_string(),
            data: None,
        }
    }
}

pub type ApiResult<T> = Json<ApiResponse<T>>;

pub fn respond<T>(result: yuedu_backend::Result<T>) -> ApiResult<T> {
    match result {
        Ok(data) => Json(ApiResponse::success(data)),
        Err(e) => Json(ApiResponse::from_error(&e)),
    }
}

/// Selected rule ids / 选中的id列表
#[derive(Debug, Deserialize)]
pub struct IdsRequest {
    #[serde(default)]
    pub ids: Vec<i64>,
}

pub async fn health() -> Json<Value> {
    Json(json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION"),
        "build_time": env!("BUILD_TIME"),
    }))
}
