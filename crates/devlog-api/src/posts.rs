use axum::{
    Extension, Json,
    extract::{Multipart, State, multipart::Field},
    response::{Html, Redirect},
};
use tokio::fs::File;
use tokio::io::AsyncWriteExt;
use tracing::info;

use devlog_types::api::{DEFAULT_VERSION, VersionResponse};
use devlog_types::clock;
use devlog_types::events::RealtimeEvent;
use devlog_types::models::Post;

use crate::AppState;
use crate::error::{ApiError, blocking};
use crate::session::{Identity, Session};
use crate::uploads::{UploadStore, download_url};
use crate::views;

/// Multipart field carrying the release archive.
pub const UPLOAD_FIELD: &str = "updateZip";

/// GET / — every release, newest first.
pub async fn home(
    State(state): State<AppState>,
    Session(identity): Session,
) -> Result<Html<String>, ApiError> {
    let db = state.db.clone();
    let rows = blocking(move || db.list_posts()).await?;
    let posts: Vec<Post> = rows.into_iter().map(Post::from).collect();

    Ok(views::home_page(&posts, identity.as_ref()))
}

/// GET /admin
pub async fn admin_page(
    State(state): State<AppState>,
    Extension(identity): Extension<Identity>,
) -> Result<Html<String>, ApiError> {
    let db = state.db.clone();
    let latest = blocking(move || db.latest_post()).await?;
    let version = latest
        .map(|post| post.version)
        .unwrap_or_else(|| DEFAULT_VERSION.to_string());

    Ok(views::admin_page(&identity, &version))
}

/// GET /api/version — what update clients poll to find the newest build.
pub async fn latest_version(State(state): State<AppState>) -> Result<Json<VersionResponse>, ApiError> {
    let db = state.db.clone();
    let latest = blocking(move || db.latest_post()).await?;

    let response = match latest {
        Some(post) => VersionResponse {
            version: post.version,
            title: Some(post.title),
            url: post.download_url,
        },
        None => VersionResponse::default(),
    };

    Ok(Json(response))
}

#[derive(Default)]
struct PublishForm {
    title: Option<String>,
    version: Option<String>,
    text: Option<String>,
    file: Option<StoredUpload>,
}

/// An archive already streamed to the upload dir.
#[derive(Debug, Clone)]
struct StoredUpload {
    name: String,
    size: u64,
}

impl PublishForm {
    /// Title, version and a non-empty archive are required.
    fn validate(self) -> Result<(String, String, String, StoredUpload), ApiError> {
        let title = self
            .title
            .filter(|t| !t.trim().is_empty())
            .ok_or_else(|| ApiError::BadRequest("Missing title".into()))?;
        let version = self
            .version
            .filter(|v| !v.trim().is_empty())
            .ok_or_else(|| ApiError::BadRequest("Missing version".into()))?;
        let file = self
            .file
            .filter(|upload| upload.size > 0)
            .ok_or_else(|| ApiError::BadRequest("Missing update file".into()))?;

        Ok((title, version, self.text.unwrap_or_default(), file))
    }
}

/// POST /add-post — store the archive, record the post, broadcast it.
///
/// The archive is written to disk while the form is read. A rejected form
/// deletes it again. If the insert fails the archive stays on disk
/// unreferenced.
pub async fn add_post(
    State(state): State<AppState>,
    Extension(identity): Extension<Identity>,
    multipart: Multipart,
) -> Result<Redirect, ApiError> {
    let form = read_publish_form(&state.uploads, multipart).await?;
    let upload = form.file.clone();

    let (title, version, text, file) = match form.validate() {
        Ok(fields) => fields,
        Err(e) => {
            if let Some(upload) = upload {
                state.uploads.delete(&upload.name).await?;
            }
            return Err(e);
        }
    };

    info!("Stored upload {} ({} bytes)", file.name, file.size);
    let url = download_url(&state.public_url, &file.name);
    let date = clock::release_date(&clock::now());

    let db = state.db.clone();
    let row = blocking(move || db.insert_post(&title, &version, &text, &date, &url)).await?;
    let post = Post::from(row);

    info!(
        "{} published '{}' v{} ({})",
        identity.username, post.title, post.version, post.download_url
    );
    state.dispatcher.broadcast(RealtimeEvent::NewPost(post));

    Ok(Redirect::to("/"))
}

async fn read_publish_form(uploads: &UploadStore, mut multipart: Multipart) -> Result<PublishForm, ApiError> {
    let mut form = PublishForm::default();

    loop {
        let field = match multipart.next_field().await {
            Ok(Some(field)) => field,
            Ok(None) => break,
            Err(e) => {
                if let Some(upload) = form.file.take() {
                    uploads.delete(&upload.name).await?;
                }
                return Err(ApiError::BadRequest(e.body_text()));
            }
        };

        let name = field.name().unwrap_or_default().to_string();
        let result = match name.as_str() {
            "title" => read_text(field).await.map(|v| form.title = Some(v)),
            "version" => read_text(field).await.map(|v| form.version = Some(v)),
            "text" => read_text(field).await.map(|v| form.text = Some(v)),
            UPLOAD_FIELD => {
                // A repeated file field replaces the earlier one
                if let Some(previous) = form.file.take() {
                    uploads.delete(&previous.name).await?;
                }
                store_upload(uploads, field).await.map(|upload| form.file = Some(upload))
            }
            _ => Ok(()),
        };

        if let Err(e) = result {
            if let Some(upload) = form.file.take() {
                uploads.delete(&upload.name).await?;
            }
            return Err(e);
        }
    }

    Ok(form)
}

async fn read_text(field: Field<'_>) -> Result<String, ApiError> {
    field.text().await.map_err(|e| ApiError::BadRequest(e.body_text()))
}

/// Stream one file field to disk chunk by chunk. A partial file is deleted.
async fn store_upload(uploads: &UploadStore, mut field: Field<'_>) -> Result<StoredUpload, ApiError> {
    let (name, mut file) = uploads.create(field.file_name()).await?;

    match write_chunks(&mut field, &mut file).await {
        Ok(size) => Ok(StoredUpload { name, size }),
        Err(e) => {
            drop(file);
            uploads.delete(&name).await?;
            Err(e)
        }
    }
}

async fn write_chunks(field: &mut Field<'_>, file: &mut File) -> Result<u64, ApiError> {
    let mut size: u64 = 0;

    while let Some(chunk) = field
        .chunk()
        .await
        .map_err(|e| ApiError::BadRequest(e.body_text()))?
    {
        file.write_all(&chunk).await.map_err(anyhow::Error::from)?;
        size += chunk.len() as u64;
    }
    file.flush().await.map_err(anyhow::Error::from)?;

    Ok(size)
}
