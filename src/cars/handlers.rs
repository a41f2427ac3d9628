use axum::{
    extract::{DefaultBodyLimit, Multipart, Path, Query, State},
    http::StatusCode,
    routing::{get, post, put},
    Json, Router,
};
use tracing::{info, instrument, warn};
use uuid::Uuid;

use crate::{
    auth::extractors::AuthUser,
    cars::{
        dto::{SearchParams, StatusMessage},
        repo::Car,
        services::{delete_images, like_pattern, split_tags, store_images, ImageUpload},
    },
    error::ApiError,
    state::AppState,
};

const MAX_IMAGES: usize = 10;

pub fn read_routes() -> Router<AppState> {
    Router::new()
        .route("/cars", get(list_cars))
        .route("/cars/all", get(list_all_cars))
        .route("/cars/search", get(search_cars))
        .route("/cars/:id", get(get_car))
}

pub fn write_routes() -> Router<AppState> {
    Router::new()
        .route("/cars", post(create_car))
        .route("/cars/:id", put(update_car).delete(delete_car))
        .layer(DefaultBodyLimit::max(20 * 1024 * 1024))
}

/// Multipart body shared by create and update: text fields `title`,
/// `description`, `tags` plus up to [`MAX_IMAGES`] files under `images`.
/// A part named `images` without a filename is not a file and is ignored.
/// Create enforces presence; update treats every field as optional.
#[derive(Debug, Default)]
pub struct CarForm {
    pub title: Option<String>,
    pub description: Option<String>,
    pub tags: Option<String>,
    pub images: Vec<ImageUpload>,
}

async fn collect_car_form(mut form: Multipart) -> Result<CarForm, ApiError> {
    let mut out = CarForm::default();
    while let Some(field) = form
        .next_field()
        .await
        .map_err(|_| ApiError::Validation("Malformed multipart body"))?
    {
        let name = field.name().map(|s| s.to_string());
        match name.as_deref() {
            Some("title") => {
                out.title = Some(
                    field
                        .text()
                        .await
                        .map_err(|_| ApiError::Validation("Malformed multipart body"))?,
                )
            }
            Some("description") => {
                out.description = Some(
                    field
                        .text()
                        .await
                        .map_err(|_| ApiError::Validation("Malformed multipart body"))?,
                )
            }
            Some("tags") => {
                out.tags = Some(
                    field
                        .text()
                        .await
                        .map_err(|_| ApiError::Validation("Malformed multipart body"))?,
                )
            }
            Some("images") | Some("images[]") if field.file_name().is_some() => {
                if out.images.len() >= MAX_IMAGES {
                    return Err(ApiError::Validation("Too many images"));
                }
                let content_type = field
                    .content_type()
                    .map(|s| s.to_string())
                    .unwrap_or_else(|| "application/octet-stream".into());
                let body = field
                    .bytes()
                    .await
                    .map_err(|_| ApiError::Validation("Malformed multipart body"))?;
                out.images.push(ImageUpload { body, content_type });
            }
            _ => {}
        }
    }
    Ok(out)
}

/// POST /cars (multipart): upload the images first, then persist the
/// record carrying their URLs. A failed upload aborts the create and
/// leaves any already-stored images behind.
#[instrument(skip(state, form))]
pub async fn create_car(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    form: Multipart,
) -> Result<(StatusCode, Json<Car>), ApiError> {
    let form = collect_car_form(form).await?;

    let title = form
        .title
        .filter(|t| !t.trim().is_empty())
        .ok_or(ApiError::Validation("title is required"))?;
    let description = form
        .description
        .filter(|d| !d.trim().is_empty())
        .ok_or(ApiError::Validation("description is required"))?;
    let tags_raw = form.tags.ok_or(ApiError::Validation("tags is required"))?;
    let tags = split_tags(&tags_raw);

    let images = store_images(state.media.as_ref(), form.images)
        .await
        .map_err(|e| ApiError::media("Error creating car", e))?;

    let car = Car::insert(&state.db, user_id, &title, &description, &tags, &images)
        .await
        .map_err(|e| ApiError::internal("Error creating car", e))?;

    info!(car_id = %car.id, owner_id = %user_id, images = car.images.len(), "car created");
    Ok((StatusCode::CREATED, Json(car)))
}

#[instrument(skip(state))]
pub async fn list_cars(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
) -> Result<Json<Vec<Car>>, ApiError> {
    let cars = Car::list_by_owner(&state.db, user_id)
        .await
        .map_err(|e| ApiError::internal("Error fetching cars", e))?;
    Ok(Json(cars))
}

/// Public listing across all owners.
#[instrument(skip(state))]
pub async fn list_all_cars(State(state): State<AppState>) -> Result<Json<Vec<Car>>, ApiError> {
    let cars = Car::list_all(&state.db)
        .await
        .map_err(|e| ApiError::internal("Error fetching cars", e))?;
    Ok(Json(cars))
}

/// Public single-listing read; 404 only, no ownership involved.
#[instrument(skip(state))]
pub async fn get_car(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<Car>, ApiError> {
    let car = Car::find_by_id(&state.db, id)
        .await
        .map_err(|e| ApiError::internal("Error fetching car", e))?
        .ok_or(ApiError::NotFound("Car"))?;
    Ok(Json(car))
}

#[instrument(skip(state))]
pub async fn search_cars(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Query(params): Query<SearchParams>,
) -> Result<Json<Vec<Car>>, ApiError> {
    let pattern = like_pattern(&params.query);
    let cars = Car::search_owned(&state.db, user_id, &pattern)
        .await
        .map_err(|e| ApiError::internal("Error searching cars", e))?;
    Ok(Json(cars))
}

/// PUT /cars/:id (multipart): only supplied fields change. Supplying new
/// images replaces the whole set, deleting the old ones from the media
/// store first. The read/delete/upload/write sequence is not
/// transactional; the second `(id, owner)` filter on the UPDATE is what
/// keeps the write itself atomic.
#[instrument(skip(state, form))]
pub async fn update_car(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Path(id): Path<Uuid>,
    form: Multipart,
) -> Result<Json<Car>, ApiError> {
    let form = collect_car_form(form).await?;

    let current = Car::find_owned(&state.db, id, user_id)
        .await
        .map_err(|e| ApiError::internal("Error updating car", e))?
        .ok_or(ApiError::NotFoundOrUnauthorized)?;

    let new_images = if form.images.is_empty() {
        None
    } else {
        if !current.images.is_empty() {
            delete_images(state.media.as_ref(), &current.images)
                .await
                .map_err(|e| ApiError::media("Error updating car", e))?;
        }
        let stored = store_images(state.media.as_ref(), form.images)
            .await
            .map_err(|e| ApiError::media("Error updating car", e))?;
        Some(stored)
    };

    let tags = form.tags.as_deref().map(split_tags);

    let car = Car::update_owned(
        &state.db,
        id,
        user_id,
        form.title.as_deref(),
        form.description.as_deref(),
        tags.as_deref(),
        new_images.as_deref(),
    )
    .await
    .map_err(|e| ApiError::internal("Error updating car", e))?
    .ok_or(ApiError::NotFoundOrUnauthorized)?;

    info!(car_id = %car.id, owner_id = %user_id, "car updated");
    Ok(Json(car))
}

/// DELETE /cars/:id: the row goes first, then its images. An image-store
/// failure after the row is gone still answers 500 even though the
/// listing no longer exists.
#[instrument(skip(state))]
pub async fn delete_car(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Path(id): Path<Uuid>,
) -> Result<Json<StatusMessage>, ApiError> {
    let car = Car::delete_owned(&state.db, id, user_id)
        .await
        .map_err(|e| ApiError::internal("Error deleting car", e))?
        .ok_or_else(|| {
            warn!(car_id = %id, caller = %user_id, "delete refused");
            ApiError::NotFoundOrUnauthorized
        })?;

    if !car.images.is_empty() {
        delete_images(state.media.as_ref(), &car.images)
            .await
            .map_err(|e| ApiError::media("Error deleting car", e))?;
    }

    info!(car_id = %car.id, owner_id = %user_id, "car deleted");
    Ok(Json(StatusMessage {
        message: "Car and associated images deleted successfully".into(),
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::extract::FromRequest;
    use axum::http::Request;

    const BOUNDARY: &str = "car-form-test";

    fn text_part(name: &str, value: &str) -> String {
        format!(
            "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"{name}\"\r\n\r\n{value}\r\n"
        )
    }

    fn file_part(name: &str, filename: &str, content_type: &str, data: &str) -> String {
        format!(
            "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"{name}\"; filename=\"{filename}\"\r\nContent-Type: {content_type}\r\n\r\n{data}\r\n"
        )
    }

    async fn parse(body: String) -> Result<CarForm, ApiError> {
        let request = Request::builder()
            .method("POST")
            .uri("/api/cars")
            .header(
                "content-type",
                format!("multipart/form-data; boundary={BOUNDARY}"),
            )
            .body(axum::body::Body::from(body))
            .unwrap();
        let multipart = Multipart::from_request(request, &()).await.unwrap();
        collect_car_form(multipart).await
    }

    #[tokio::test]
    async fn collects_fields_and_files() {
        let mut body = String::new();
        body.push_str(&text_part("title", "Civic"));
        body.push_str(&text_part("description", "clean"));
        body.push_str(&text_part("tags", "sedan, compact"));
        body.push_str(&file_part("images", "a.jpg", "image/jpeg", "aaa"));
        body.push_str(&file_part("images", "b.png", "image/png", "bbb"));
        body.push_str(&format!("--{BOUNDARY}--\r\n"));

        let form = parse(body).await.unwrap();
        assert_eq!(form.title.as_deref(), Some("Civic"));
        assert_eq!(form.description.as_deref(), Some("clean"));
        assert_eq!(form.tags.as_deref(), Some("sedan, compact"));
        assert_eq!(form.images.len(), 2);
        assert_eq!(form.images[0].content_type, "image/jpeg");
        assert_eq!(form.images[1].body.as_ref(), b"bbb");
    }

    #[tokio::test]
    async fn accepts_bracketed_image_field_name() {
        let mut body = String::new();
        body.push_str(&file_part("images[]", "a.jpg", "image/jpeg", "aaa"));
        body.push_str(&format!("--{BOUNDARY}--\r\n"));

        let form = parse(body).await.unwrap();
        assert_eq!(form.images.len(), 1);
    }

    #[tokio::test]
    async fn ignores_unknown_fields() {
        let mut body = String::new();
        body.push_str(&text_part("owner_id", "not-yours-to-set"));
        body.push_str(&text_part("title", "Civic"));
        body.push_str(&format!("--{BOUNDARY}--\r\n"));

        let form = parse(body).await.unwrap();
        assert_eq!(form.title.as_deref(), Some("Civic"));
        assert!(form.tags.is_none());
        assert!(form.images.is_empty());
    }

    #[tokio::test]
    async fn text_part_named_images_is_not_a_file() {
        let mut body = String::new();
        body.push_str(&text_part("images", "https://elsewhere.example/x.jpg"));
        body.push_str(&file_part("images", "a.jpg", "image/jpeg", "aaa"));
        body.push_str(&format!("--{BOUNDARY}--\r\n"));

        let form = parse(body).await.unwrap();
        assert_eq!(form.images.len(), 1);
        assert_eq!(form.images[0].body.as_ref(), b"aaa");
    }

    #[tokio::test]
    async fn rejects_more_than_ten_images() {
        let mut body = String::new();
        for i in 0..=MAX_IMAGES {
            body.push_str(&file_part("images", &format!("{i}.jpg"), "image/jpeg", "x"));
        }
        body.push_str(&format!("--{BOUNDARY}--\r\n"));

        let err = parse(body).await.unwrap_err();
        assert!(matches!(err, ApiError::Validation("Too many images")));
    }

    #[tokio::test]
    async fn file_without_content_type_defaults_to_octet_stream() {
        let mut body = String::new();
        body.push_str(&format!(
            "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"images\"; filename=\"raw\"\r\n\r\ndata\r\n"
        ));
        body.push_str(&format!("--{BOUNDARY}--\r\n"));

        let form = parse(body).await.unwrap();
        assert_eq!(form.images[0].content_type, "application/octet-stream");
    }
}
