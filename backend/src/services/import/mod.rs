//! HTTP endpoints for the two user actions of the importer.
//!
//! - `POST /api/import/load`: multipart/form-data upload with a `file` field. The file is
//!   stored in a temporary file with the same extension and parsed by the file loader. The
//!   response is the resulting `TableBuffer` as JSON; the page replaces its grid with it.
//!
//! - `POST /api/import/save`: JSON `SaveTableRequest` with the table name and the grid
//!   currently shown. The database writer persists it into the configured SQLite file.
//!
//! Errors are answered as `{"error": <message>, "field": <input to focus or null>}` with
//! `400` for input errors and `500` for database and server-side errors. A JSON payload that
//! cannot be decoded (for example a row with the wrong number of cells) is answered the same
//! way with `400`.

use crate::error::{ErrorKind, ImportError};
use actix_web::error::{InternalError, JsonPayloadError};
use actix_web::web::{post, scope, JsonConfig};
use actix_web::{HttpRequest, HttpResponse, Scope};
use serde_json::json;

mod load;
mod save;

const API_PATH: &str = "/api/import";
const JSON_LIMIT: usize = 10 * 1024 * 1024; // 10 MB

/// Configures and returns the Actix scope for the import routes.
pub fn configure_routes() -> Scope {
    scope(API_PATH)
        .app_data(
            JsonConfig::default()
                .limit(JSON_LIMIT)
                .error_handler(json_error),
        )
        // Parse an uploaded file into a grid.
        .route("/load", post().to(load::process))
        // Persist the grid into a table.
        .route("/save", post().to(save::process))
}

/// Builds the error response for `err`, choosing the status from its kind.
pub(crate) fn error_response(err: &ImportError) -> HttpResponse {
    let field = match err {
        ImportError::TableNameRequired | ImportError::InvalidTableName(_) => Some("table_name"),
        _ => None,
    };
    let body = json!({ "error": err.to_string(), "field": field });

    match err.kind() {
        ErrorKind::Input => HttpResponse::BadRequest().json(body),
        ErrorKind::Database | ErrorKind::Internal => {
            HttpResponse::InternalServerError().json(body)
        }
    }
}

/// Rejected JSON payloads get the same `{"error", "field"}` body as every other error.
fn json_error(err: JsonPayloadError, _req: &HttpRequest) -> actix_web::Error {
    let response = HttpResponse::BadRequest().json(json!({
        "error": format!("Datos inválidos: {}", err),
        "field": null,
    }));
    InternalError::from_response(err, response).into()
}
