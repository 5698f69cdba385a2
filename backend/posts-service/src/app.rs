/// Application factory shared by the server binary and the tests
use actix_web::body::MessageBody;
use actix_web::dev::{ServiceFactory, ServiceRequest, ServiceResponse};
use actix_web::{web, App, Error};

use crate::handlers;
use crate::middleware::{MetricsMiddleware, SessionAuth};
use crate::state::AppState;

/// Form bodies without files are small; uploads go through multipart.
pub const FORM_LIMIT_BYTES: usize = 256 * 1024;

pub fn build_app(
    state: AppState,
) -> App<
    impl ServiceFactory<
        ServiceRequest,
        Config = (),
        Response = ServiceResponse<impl MessageBody>,
        Error = Error,
        InitError = (),
    >,
> {
    let session_auth = SessionAuth::new(state.tokens.clone(), state.store.clone());

    App::new()
        .app_data(web::Data::new(state))
        .app_data(web::FormConfig::default().limit(FORM_LIMIT_BYTES))
        .wrap(MetricsMiddleware)
        .wrap(session_auth)
        .wrap(tracing_actix_web::TracingLogger::default())
        .configure(handlers::configure)
}
