use axum::extract::multipart::MultipartRejection;
use axum::extract::rejection::FormRejection;
use axum::extract::{FromRequest, Multipart, Path, Request, State};
use axum::http::{header, HeaderMap, StatusCode};
use axum::response::{Html, IntoResponse, Json};
use axum::Form;
use bytes::Bytes;
use inv_types::{
    InventoryItem, ItemId, ItemPatch, ItemView, NewItem, PhotoUpload, DESCRIPTION_FIELD,
    NAME_FIELD,
};
use serde::Deserialize;
use serde_json::{json, Value};

use crate::error::{ServerError, ServerResult};
use crate::state::AppState;

/// Multipart field carrying the photo file.
pub const PHOTO_FIELD: &str = "photo";

const REGISTER_FORM: &str = include_str!("../assets/RegisterForm.html");
const SEARCH_FORM: &str = include_str!("../assets/SearchForm.html");

pub async fn index_handler() -> Html<&'static str> {
    Html("<h1>Inventory service</h1><p>The server is running.</p>")
}

pub async fn register_form_handler() -> Html<&'static str> {
    Html(REGISTER_FORM)
}

pub async fn search_form_handler() -> Html<&'static str> {
    Html(SEARCH_FORM)
}

/// Health check handler.
pub async fn health_handler() -> Json<Value> {
    Json(json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION"),
    }))
}

/// Path ids that cannot name a record are reported as missing items.
fn parse_id(raw: &str) -> ServerResult<ItemId> {
    ItemId::parse(raw).map_err(|_| ServerError::NotFound(format!("item not found: {raw}")))
}

fn rejected(status: StatusCode, message: String) -> ServerError {
    ServerError::Rejected { status, message }
}

/// Text-only registration as sent by a plain urlencoded form.
#[derive(Debug, Default, Deserialize)]
pub struct RegisterForm {
    pub inventory_name: Option<String>,
    pub description: Option<String>,
}

fn is_multipart(headers: &HeaderMap) -> bool {
    headers
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .is_some_and(|v| v.trim_start().to_ascii_lowercase().starts_with("multipart/form-data"))
}

/// `POST /register`
///
/// Accepts `multipart/form-data` with an optional photo part, or a text-only
/// urlencoded form.
pub async fn register_handler(
    State(state): State<AppState>,
    request: Request,
) -> ServerResult<(StatusCode, Json<InventoryItem>)> {
    let (fields, photo) = if is_multipart(request.headers()) {
        let multipart = Multipart::from_request(request, &state)
            .await
            .map_err(|e: MultipartRejection| rejected(e.status(), e.body_text()))?;
        read_registration(multipart).await?
    } else {
        let Form(form) = Form::<RegisterForm>::from_request(request, &state)
            .await
            .map_err(|e: FormRejection| rejected(e.status(), e.body_text()))?;
        let fields = NewItem {
            name: form.inventory_name,
            description: form.description,
        };
        (fields, None)
    };

    let item = state.store.create(fields, photo).await?;
    Ok((StatusCode::CREATED, Json(item)))
}

async fn read_registration(
    mut multipart: Multipart,
) -> ServerResult<(NewItem, Option<PhotoUpload>)> {
    let mut fields = NewItem::default();
    let mut photo = None;

    while let Some(field) = multipart.next_field().await? {
        let Some(name) = field.name().map(str::to_owned) else {
            continue;
        };
        match name.as_str() {
            NAME_FIELD => fields.name = Some(field.text().await?),
            DESCRIPTION_FIELD => fields.description = Some(field.text().await?),
            PHOTO_FIELD => {
                let file_name = field.file_name().unwrap_or_default().to_owned();
                let bytes = field.bytes().await?;
                // Browsers send an empty part when no file was chosen.
                if !bytes.is_empty() {
                    photo = Some(PhotoUpload::new(bytes, file_name, PHOTO_FIELD));
                }
            }
            other => tracing::debug!(field = other, "ignoring unknown form field"),
        }
    }
    Ok((fields, photo))
}

/// `GET /inventory`
pub async fn list_handler(
    State(state): State<AppState>,
) -> ServerResult<Json<Vec<InventoryItem>>> {
    Ok(Json(state.store.list().await?))
}

/// `GET /inventory/{id}`
pub async fn get_handler(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ServerResult<Json<ItemView>> {
    let id = parse_id(&id)?;
    Ok(Json(state.query.get_projected(&id, true).await?))
}

/// `PUT /inventory/{id}`: partial update from a JSON object.
pub async fn update_handler(
    State(state): State<AppState>,
    Path(id): Path<String>,
    body: Bytes,
) -> ServerResult<Json<InventoryItem>> {
    let id = parse_id(&id)?;
    if body.iter().all(u8::is_ascii_whitespace) {
        return Err(ServerError::BadRequest("request body is empty".into()));
    }
    let value: Value = serde_json::from_slice(&body)
        .map_err(|e| ServerError::BadRequest(format!("invalid JSON body: {e}")))?;
    let Value::Object(object) = value else {
        return Err(ServerError::BadRequest("request body must be a JSON object".into()));
    };

    let patch = ItemPatch::from_json_object(&object)?;
    Ok(Json(state.store.update(&id, &patch).await?))
}

/// `PUT /inventory/{id}/photo`
pub async fn replace_photo_handler(
    State(state): State<AppState>,
    Path(id): Path<String>,
    multipart: Result<Multipart, MultipartRejection>,
) -> ServerResult<Json<InventoryItem>> {
    let id = parse_id(&id)?;
    let mut multipart = multipart.map_err(|e| rejected(e.status(), e.body_text()))?;

    let mut photo = None;
    while let Some(field) = multipart.next_field().await? {
        if field.name() != Some(PHOTO_FIELD) {
            continue;
        }
        let file_name = field.file_name().unwrap_or_default().to_owned();
        let bytes = field.bytes().await?;
        if !bytes.is_empty() {
            photo = Some(PhotoUpload::new(bytes, file_name, PHOTO_FIELD));
        }
    }

    let photo = photo.ok_or_else(|| ServerError::BadRequest("photo file is required".into()))?;
    Ok(Json(state.store.replace_photo(&id, &photo).await?))
}

/// `DELETE /inventory/{id}`
pub async fn delete_handler(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ServerResult<Json<Value>> {
    let id = parse_id(&id)?;
    state.store.delete(&id).await?;
    Ok(Json(json!({ "message": format!("item {id} deleted") })))
}

/// `GET /inventory/{id}/photo`
pub async fn photo_handler(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ServerResult<impl IntoResponse> {
    let id = parse_id(&id)?;
    let (photo, _) = state.store.photo_path(&id).await?;
    let bytes = state.store.photos().read(&photo).await?;
    Ok(([(header::CONTENT_TYPE, photo.content_type())], bytes))
}

#[derive(Debug, Default, Deserialize)]
pub struct SearchForm {
    pub id: Option<String>,
    pub has_photo: Option<String>,
}

impl SearchForm {
    /// Checkbox-style truthiness of `has_photo`.
    pub fn wants_photo(&self) -> bool {
        self.has_photo.as_deref().is_some_and(|v| {
            matches!(
                v.trim().to_ascii_lowercase().as_str(),
                "on" | "true" | "1" | "yes"
            )
        })
    }
}

/// `POST /search`
pub async fn search_handler(
    State(state): State<AppState>,
    form: Result<Form<SearchForm>, FormRejection>,
) -> ServerResult<Json<ItemView>> {
    let Form(form) = form.map_err(|e| rejected(e.status(), e.body_text()))?;
    let raw = form
        .id
        .as_deref()
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .ok_or_else(|| ServerError::BadRequest("id is required".into()))?;
    let id = parse_id(raw)?;
    Ok(Json(state.query.get_projected(&id, form.wants_photo()).await?))
}
