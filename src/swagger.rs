use utoipa::openapi::{
    InfoBuilder, OpenApi,
    security::{ApiKey, ApiKeyValue, SecurityScheme},
};
use utoipa_swagger_ui::SwaggerUi;

/// Name the routes reference in their `security(...)` clauses.
pub const SESSION_SECURITY: &str = "sessionCookie";

/// Stamps title and version and registers the session cookie as the auth scheme.
pub fn finalize_openapi(mut openapi: OpenApi, title: &str, cookie_name: &str) -> OpenApi {
    openapi.info = InfoBuilder::new()
        .title(title)
        .version(env!("CARGO_PKG_VERSION"))
        .build();

    openapi
        .components
        .get_or_insert_with(Default::default)
        .add_security_scheme(
            SESSION_SECURITY,
            SecurityScheme::ApiKey(ApiKey::Cookie(ApiKeyValue::new(cookie_name))),
        );

    openapi
}

pub fn create_swagger_ui(openapi: OpenApi) -> SwaggerUi {
    SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", openapi)
}
