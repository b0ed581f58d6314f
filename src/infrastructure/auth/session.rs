use axum::{
    extract::{Request, State},
    middleware::Next,
    response::{IntoResponse, Response},
};
use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};
use std::sync::Arc;

use crate::error::AppError;
use crate::infrastructure::session::{SessionRegistry, UserSession};

pub const SESSION_COOKIE: &str = "ae_dashboard_session";

/// Browser session injected into request extensions
#[derive(Clone)]
pub struct CurrentSession(pub Arc<UserSession>);

/// Resolves the session cookie, creating a session when it is missing or
/// unknown (e.g. after a restart).
pub async fn session_middleware(
    State(registry): State<Arc<SessionRegistry>>,
    jar: CookieJar,
    mut request: Request,
    next: Next,
) -> Result<Response, AppError> {
    let existing = match jar.get(SESSION_COOKIE) {
        Some(cookie) => registry.get(cookie.value()).await,
        None => None,
    };

    let (session, jar) = match existing {
        Some(session) => (session, None),
        None => {
            let session = registry.create().await?;
            let cookie = Cookie::build((SESSION_COOKIE, session.id().to_string()))
                .path("/")
                .http_only(true)
                .same_site(SameSite::Lax)
                .build();
            (session, Some(jar.add(cookie)))
        }
    };

    request.extensions_mut().insert(CurrentSession(session));
    let response = next.run(request).await;

    Ok(match jar {
        Some(jar) => (jar, response).into_response(),
        None => response,
    })
}
