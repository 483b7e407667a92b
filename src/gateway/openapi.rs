//! OpenAPI documentation.
//!
//! The generated document is served at `/api-doc/openapi.json`.

use utoipa::openapi::security::{Http, HttpAuthScheme, SecurityScheme};
use utoipa::{Modify, OpenApi};

struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "bearer_auth",
                SecurityScheme::Http(Http::new(HttpAuthScheme::Bearer)),
            );
        }
    }
}

#[derive(OpenApi)]
#[openapi(
    info(
        title = "Ichtaka API",
        version = "1.0.0",
        description = "Secure, anonymous reporting platform. Passwordless Ed25519 challenge-response authentication."
    ),
    servers(
        (url = "http://localhost:8080", description = "Development"),
    ),
    paths(
        crate::auth::handlers::check_username,
        crate::auth::handlers::signup,
        crate::auth::handlers::login,
        crate::auth::handlers::verify,
        crate::auth::handlers::refresh,
        crate::auth::handlers::logout,
        crate::auth::handlers::me,
        crate::notifications::handlers::list_notifications,
        crate::notifications::handlers::mark_read,
        crate::notifications::handlers::mark_all_read,
    ),
    modifiers(&SecurityAddon),
    tags(
        (name = "Auth", description = "Challenge-response authentication"),
        (name = "Notifications", description = "Per-identity notifications")
    )
)]
pub struct ApiDoc;
