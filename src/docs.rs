use axum::Json;
use utoipa::OpenApi;

use crate::{
    entities::movie,
    models::{CreatedMovie, ErrorBody, MessageResponse, MoviePayload},
    routes,
};

#[derive(OpenApi)]
#[openapi(
    info(
        title = "Movie Database System",
        version = "1.0",
        description = "API for managing movies"
    ),
    paths(
        routes::list_movies,
        routes::create_movie,
        routes::get_movie,
        routes::update_movie,
        routes::delete_movie,
        routes::filter_movies,
    ),
    components(schemas(movie::Model, MoviePayload, CreatedMovie, MessageResponse, ErrorBody)),
    tags((name = "movies", description = "Operations related to movies"))
)]
pub struct ApiDoc;

pub async fn openapi_json() -> Json<utoipa::openapi::OpenApi> {
    Json(ApiDoc::openapi())
}
