use rocket::Request;
use rocket::http::Status;
use rocket::request::{FromRequest, Outcome};

use super::{Session, SessionStore};

#[rocket::async_trait]
impl<'r> FromRequest<'r> for Session {
    type Error = ();

    async fn from_request(request: &'r Request<'_>) -> Outcome<Self, Self::Error> {
        let auth_span = tracing::info_span!("bearer_auth_guard");
        let _guard = auth_span.enter();

        let token = request
            .headers()
            .get_one("Authorization")
            .and_then(|value| value.strip_prefix("Bearer "))
            .map(str::trim)
            .filter(|token| !token.is_empty());

        if let Some(token) = token {
            let store = match request.rocket().state::<SessionStore>() {
                Some(store) => store,
                _ => {
                    tracing::error!("Session store not found in managed state");
                    return Outcome::Error((Status::InternalServerError, ()));
                }
            };

            match store.resolve(token) {
                Some(session) => {
                    tracing::info!(
                        employee_id = %session.employee_id,
                        "Authenticated via bearer token"
                    );
                    return Outcome::Success(session);
                }
                None => {
                    tracing::warn!(token = %token, "Missing or expired session token");
                    return Outcome::Error((Status::Unauthorized, ()));
                }
            }
        }

        Outcome::Error((Status::Unauthorized, ()))
    }
}
