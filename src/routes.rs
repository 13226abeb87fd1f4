use std::sync::Arc;

use axum::{
    Form, Json, Router,
    body::Bytes,
    extract::{FromRequest, Path, Request, State, rejection::PathRejection},
    http::{StatusCode, Uri, header},
    response::{IntoResponse, Response},
    routing::get,
};
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};
use tracing::debug;

use crate::{
    AppState,
    entities::movie,
    error::{AppError, AppResult},
    docs,
    models::{CreatedMovie, ErrorBody, MessageResponse, MoviePayload, NewMovie},
};

pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/movies", get(list_movies).post(create_movie))
        .route("/movies/", get(list_movies).post(create_movie))
        .route("/movies/{id}", get(get_movie).put(update_movie).delete(delete_movie))
        .route("/movies/filter/{text}", get(filter_movies))
        .route("/swagger.json", get(docs::openapi_json))
        .fallback(unknown_route)
        .with_state(state)
        .layer(CorsLayer::new().allow_origin(Any).allow_methods(Any).allow_headers(Any))
        .layer(TraceLayer::new_for_http())
}

#[utoipa::path(
    get,
    path = "/movies/",
    tag = "movies",
    responses(
        (status = 200, description = "Every movie, by id", body = Vec<movie::Model>),
        (status = 500, description = "Datastore failure", body = ErrorBody),
    )
)]
pub async fn list_movies(State(state): State<Arc<AppState>>) -> AppResult<Json<Vec<movie::Model>>> {
    Ok(Json(state.store.list_all().await?))
}

#[utoipa::path(
    post,
    path = "/movies/",
    tag = "movies",
    request_body(
        content = MoviePayload,
        description = "JSON or application/x-www-form-urlencoded"
    ),
    responses(
        (status = 201, description = "Created movie with its assigned id", body = CreatedMovie),
        (status = 400, description = "Missing or invalid field", body = ErrorBody),
        (status = 500, description = "Datastore failure", body = ErrorBody),
    )
)]
pub async fn create_movie(
    State(state): State<Arc<AppState>>,
    payload: MoviePayload,
) -> AppResult<(StatusCode, Json<CreatedMovie>)> {
    let fields = validate(payload)?;
    let movie = state.store.insert(fields).await?;
    tracing::info!(id = movie.id, title = %movie.title, "movie created");
    Ok((StatusCode::CREATED, Json(CreatedMovie { message: "successfully".to_string(), movie })))
}

#[utoipa::path(
    get,
    path = "/movies/{id}",
    tag = "movies",
    params(("id" = i32, Path, description = "Movie id")),
    responses(
        (status = 200, description = "The movie", body = movie::Model),
        (status = 404, description = "No movie with this id", body = ErrorBody),
        (status = 500, description = "Datastore failure", body = ErrorBody),
    )
)]
pub async fn get_movie(
    State(state): State<Arc<AppState>>,
    id: Result<Path<i32>, PathRejection>,
) -> AppResult<Json<movie::Model>> {
    let id = movie_id(id)?;
    Ok(Json(state.store.get(id).await?))
}

#[utoipa::path(
    put,
    path = "/movies/{id}",
    tag = "movies",
    params(("id" = i32, Path, description = "Movie id")),
    request_body(
        content = MoviePayload,
        description = "JSON or application/x-www-form-urlencoded"
    ),
    responses(
        (status = 200, description = "The updated movie", body = movie::Model),
        (status = 400, description = "Missing or invalid field", body = ErrorBody),
        (status = 404, description = "No movie with this id", body = ErrorBody),
        (status = 500, description = "Datastore failure", body = ErrorBody),
    )
)]
pub async fn update_movie(
    State(state): State<Arc<AppState>>,
    id: Result<Path<i32>, PathRejection>,
    payload: MoviePayload,
) -> AppResult<Json<movie::Model>> {
    let id = movie_id(id)?;
    // an unknown id wins over a bad body
    state.store.get(id).await?;
    let fields = validate(payload)?;
    let movie = state.store.update(id, fields).await?;
    tracing::info!(id, "movie updated");
    Ok(Json(movie))
}

#[utoipa::path(
    delete,
    path = "/movies/{id}",
    tag = "movies",
    params(("id" = i32, Path, description = "Movie id")),
    responses(
        (status = 200, description = "Deletion confirmation", body = MessageResponse),
        (status = 404, description = "No movie with this id", body = ErrorBody),
        (status = 500, description = "Datastore failure", body = ErrorBody),
    )
)]
pub async fn delete_movie(
    State(state): State<Arc<AppState>>,
    id: Result<Path<i32>, PathRejection>,
) -> AppResult<Json<MessageResponse>> {
    let id = movie_id(id)?;
    state.store.delete(id).await?;
    tracing::info!(id, "movie deleted");
    Ok(Json(MessageResponse { message: "Movie deleted successfully".to_string() }))
}

/// An empty result is still a 200, carrying a message instead of a list.
#[utoipa::path(
    get,
    path = "/movies/filter/{text}",
    tag = "movies",
    params(("text" = String, Path, description = "Case-insensitive title substring")),
    responses(
        (status = 200, description = "Matching movies, or a not-found message when none match",
            body = Vec<movie::Model>),
        (status = 500, description = "Datastore failure", body = ErrorBody),
    )
)]
pub async fn filter_movies(
    State(state): State<Arc<AppState>>,
    Path(text): Path<String>,
) -> AppResult<Response> {
    let movies = state.store.find_by_title(&text).await?;
    if movies.is_empty() {
        let message = format!("Movie with title \"{text}\" not found");
        return Ok(Json(MessageResponse { message }).into_response());
    }
    Ok(Json(movies).into_response())
}

async fn unknown_route(uri: Uri) -> AppError {
    AppError::UnknownResource(format!("no route for {}", uri.path()))
}

fn movie_id(path: Result<Path<i32>, PathRejection>) -> AppResult<i32> {
    path.map(|Path(id)| id).map_err(|rejection| {
        debug!(error = %rejection.body_text(), "movie id is not an integer");
        AppError::UnknownResource("movie id must be an integer".to_string())
    })
}

fn validate(payload: MoviePayload) -> AppResult<NewMovie> {
    payload.validate().map_err(|errors| {
        let fields: Vec<_> = errors.fields().iter().map(|e| e.field).collect();
        debug!(?fields, "movie payload rejected");
        errors.into()
    })
}

/// Reads the body as JSON or as an urlencoded form depending on `Content-Type`.
/// A missing content type is read as JSON; an empty body yields an empty payload
/// so that validation can name the missing fields.
impl<S> FromRequest<S> for MoviePayload
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let content_type = req
            .headers()
            .get(header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .unwrap_or("application/json")
            .to_ascii_lowercase();

        if content_type.starts_with("application/x-www-form-urlencoded") {
            let Form(payload) = Form::<MoviePayload>::from_request(req, state)
                .await
                .map_err(|e| AppError::BadRequest(e.body_text()))?;
            return Ok(payload);
        }

        if !content_type.starts_with("application/json") {
            return Err(AppError::UnsupportedMediaType(format!(
                "unsupported content type: {content_type}"
            )));
        }

        let body = Bytes::from_request(req, state)
            .await
            .map_err(|e| AppError::BadRequest(e.body_text()))?;
        if body.iter().all(u8::is_ascii_whitespace) {
            return Ok(MoviePayload::default());
        }

        serde_json::from_slice(&body)
            .map_err(|e| AppError::BadRequest(format!("invalid JSON body: {e}")))
    }
}
