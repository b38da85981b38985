use crate::config::AppConfig;
use crate::error::ImportError;
use crate::services::import::error_response;
use crate::writer::{self, SaveReport};
use actix_web::{web, HttpResponse, Responder};
use common::requests::SaveTableRequest;
use log::{info, warn};
use serde_json::json;

pub async fn process(
    config: web::Data<AppConfig>,
    payload: web::Json<SaveTableRequest>,
) -> impl Responder {
    match save_request(&config, payload.into_inner()).await {
        Ok(report) => {
            info!(
                "Saved {} rows into '{}'",
                report.rows_inserted, report.table_name
            );
            HttpResponse::Ok().json(json!({
                "message": report.message(),
                "table_name": report.table_name,
                "rows_inserted": report.rows_inserted,
                "database_created": report.database_created,
            }))
        }
        Err(e) => {
            warn!("Save failed: {}", e);
            error_response(&e)
        }
    }
}

/// Runs the database writer on the blocking pool with the configured database path.
pub async fn save_request(
    config: &AppConfig,
    request: SaveTableRequest,
) -> Result<SaveReport, ImportError> {
    let db_path = config.db_path.clone();
    tokio::task::spawn_blocking(move || {
        writer::save_table(&db_path, &request.table_name, &request.buffer)
    })
    .await?
}
