use axum::Router;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use crate::models;
use crate::routes;

#[derive(OpenApi)]
#[openapi(
    paths(
        routes::health::health,
        routes::auth::login,
        routes::manage::dashboard,
        routes::manage::list_roles,
        routes::manage::compose_role,
        routes::manage::save_role,
        routes::manage::delete_role
    ),
    components(
        schemas(
            models::user::LoginRequest,
            models::user::Profile,
            models::role::Role,
            models::role::ActionValue,
            models::role::RoleMutation,
            models::role::RoleComposeView,
            routes::manage::ManageSummary,
            routes::health::HealthResponse
        )
    ),
    tags(
        (name = "Auth", description = "Session login"),
        (name = "Manage", description = "Role and permission administration"),
        (name = "Health", description = "Liveness")
    )
)]
pub struct ApiDoc;

/// Swagger UI at `/docs`, backed by `/api-docs/openapi.json`.
pub fn router() -> Router {
    SwaggerUi::new("/docs")
        .url("/api-docs/openapi.json", ApiDoc::openapi())
        .into()
}
