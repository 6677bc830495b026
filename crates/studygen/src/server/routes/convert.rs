//! Conversion endpoints: start a background conversion, fetch its results

use axum::{
    extract::{Query, State},
    Json,
};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

use crate::error::{Error, Result};
use crate::processing::{ConversionJob, ExtractionJob, TaskStatus};
use crate::server::state::AppState;
use crate::types::{ConversionOptions, ConversionType};

/// Extension assumed when a request does not name one
const DEFAULT_EXTENSION: &str = "pdf";

/// Body of POST /api/convert
#[derive(Debug, Deserialize)]
pub struct ConvertRequest {
    pub md5_name: String,
    pub conversion_type: String,
    #[serde(default)]
    pub conversion_options: ConversionOptions,
    /// Upload extension; only read for `text` conversions
    #[serde(default)]
    pub extension: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct ConvertResponse {
    pub task_id: String,
}

/// Query of GET /api/convert
#[derive(Debug, Deserialize)]
pub struct ConversionQuery {
    pub md5_name: String,
    pub conversion_type: String,
}

#[derive(Debug, Serialize)]
pub struct ConversionData {
    pub data: Value,
    pub data_length: usize,
}

/// Names become file names on disk: plain ASCII alphanumerics only
fn validate_file_component(field: &str, value: &str) -> Result<()> {
    if value.is_empty() || !value.chars().all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-') {
        return Err(Error::validation(format!("Invalid {}: {:?}", field, value)));
    }
    Ok(())
}

/// POST /api/convert - Start a conversion task and return its id
///
/// An unknown conversion type still yields a task id; the task is put
/// straight into `error` so the polling client sees why.
pub async fn start_conversion(
    State(state): State<AppState>,
    Json(request): Json<ConvertRequest>,
) -> Result<Json<ConvertResponse>> {
    validate_file_component("md5_name", &request.md5_name)?;
    let extension = request
        .extension
        .unwrap_or_else(|| DEFAULT_EXTENSION.to_string());
    validate_file_component("extension", &extension)?;

    let task_id = Uuid::new_v4().to_string();
    let registry = state.registry();

    registry.set_status(&task_id, TaskStatus::Processing);
    registry.set_attribute(&task_id, "md5_name", request.md5_name.clone())?;
    registry.set_attribute(&task_id, "convert_type", request.conversion_type.clone())?;

    match request.conversion_type.parse::<ConversionType>() {
        Ok(ConversionType::Text) => {
            state.driver().spawn_extraction(ExtractionJob {
                task_id: task_id.clone(),
                md5_name: request.md5_name,
                extension,
            });
        }
        Ok(ConversionType::Generate(flavor)) => {
            state.driver().spawn_conversion(ConversionJob {
                task_id: task_id.clone(),
                md5_name: request.md5_name,
                flavor,
                options: request.conversion_options,
            });
        }
        Err(e) => {
            tracing::warn!("Task {} rejected: {}", task_id, e);
            registry.set_attribute(&task_id, "error_msg", e.to_string())?;
            registry.set_attribute(&task_id, "error_type", e.error_type())?;
            registry.set_status(&task_id, TaskStatus::Error);
        }
    }

    tracing::info!("Task {} created ({})", task_id, request.conversion_type);
    Ok(Json(ConvertResponse { task_id }))
}

/// GET /api/convert - Stored results of a finished conversion
pub async fn get_conversion(
    State(state): State<AppState>,
    Query(query): Query<ConversionQuery>,
) -> Result<Json<ConversionData>> {
    let db = state.db();

    match query.conversion_type.parse::<ConversionType>()? {
        ConversionType::Text => {
            let elements = db.load_elements(&query.md5_name)?.ok_or_else(|| {
                Error::DocumentNotFound(format!("No extracted text for {}", query.md5_name))
            })?;
            Ok(Json(ConversionData {
                data_length: elements.len(),
                data: serde_json::to_value(elements)?,
            }))
        }
        ConversionType::Generate(flavor) => match db.load_records(&query.md5_name, flavor)? {
            Some(stored) => Ok(Json(ConversionData {
                data_length: stored.data_length,
                data: serde_json::to_value(stored.records)?,
            })),
            None if !db.has_elements(&query.md5_name)? => Err(Error::DocumentNotFound(format!(
                "No document {}",
                query.md5_name
            ))),
            None => Err(Error::ConversionNotFound {
                md5_name: query.md5_name,
                flavor: flavor.to_string(),
            }),
        },
    }
}
