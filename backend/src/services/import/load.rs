use crate::error::ImportError;
use crate::loader::{self, SourceFormat};
use crate::services::import::error_response;
use actix_multipart::{Multipart, MultipartError};
use actix_web::{HttpResponse, Responder};
use common::model::table::TableBuffer;
use futures_util::StreamExt;
use log::{info, warn};
use std::io::Write;
use std::path::Path;
use tempfile::{Builder, NamedTempFile};

/// HTTP handler wrapper that converts the loaded buffer or the error into a response.
pub async fn process(payload: Multipart) -> impl Responder {
    match load_upload(payload).await {
        Ok(buffer) => HttpResponse::Ok().json(buffer),
        Err(e) => {
            warn!("Load failed: {}", e);
            error_response(&e)
        }
    }
}

fn upload_error(e: MultipartError) -> ImportError {
    ImportError::Upload(e.to_string())
}

/// Stores the `file` part of the upload in a temporary file and loads it.
/// The format is checked from the uploaded filename before anything is written.
pub async fn load_upload(mut payload: Multipart) -> Result<TableBuffer, ImportError> {
    let mut upload: Option<NamedTempFile> = None;

    while let Some(item) = payload.next().await {
        let mut field = item.map_err(upload_error)?;
        let name = field
            .content_disposition()
            .and_then(|cd| cd.get_name().map(|n| n.to_string()));
        if name.as_deref() != Some("file") {
            continue;
        }

        let filename = field
            .content_disposition()
            .and_then(|cd| cd.get_filename().map(|f| f.to_string()))
            .unwrap_or_default();
        let filename_path = Path::new(&filename);
        SourceFormat::from_path(filename_path)?;
        let extension = filename_path
            .extension()
            .map(|ext| ext.to_string_lossy().into_owned())
            .unwrap_or_default();

        info!("Receiving {}", filename);
        let mut file = Builder::new()
            .prefix("importador-")
            .suffix(&format!(".{}", extension))
            .tempfile()?;
        while let Some(chunk) = field.next().await {
            file.write_all(&chunk.map_err(upload_error)?)?;
        }
        file.flush()?;
        upload = Some(file);
    }

    let file = upload.ok_or(ImportError::MissingFile)?;
    // The temporary file is removed when `file` is dropped at the end of the task.
    tokio::task::spawn_blocking(move || loader::load_file(file.path())).await?
}
