use actix_web::dev::Server;
use actix_web::{web, App, HttpServer};
use std::net::TcpListener;
use std::sync::Arc;

use crate::auth::SessionAuthorizer;
use crate::error::AppError;
use crate::logger::RequestLogger;
use crate::middleware::{Authorize, Cors};
use crate::routes::{
    change_password, get_profile, health_check, login, not_found, refresh, register, update_info,
};
use crate::store::{CredentialRepository, ProfileRepository};

pub fn run(
    listener: TcpListener,
    credentials: Arc<dyn CredentialRepository>,
    profiles: Arc<dyn ProfileRepository>,
    authorizer: SessionAuthorizer,
) -> Result<Server, std::io::Error> {
    let credentials = web::Data::from(credentials);
    let profiles = web::Data::from(profiles);
    let authorizer_data = web::Data::new(authorizer.clone());

    let server = HttpServer::new(move || {
        // Malformed or missing JSON bodies answer with INVALID_BODY
        let json_config = web::JsonConfig::default()
            .error_handler(|err, _req| AppError::InvalidBody(err.to_string()).into());

        App::new()
            // Global middleware
            .wrap(Cors)
            .wrap(RequestLogger)

            // Shared state
            .app_data(json_config)
            .app_data(credentials.clone())
            .app_data(profiles.clone())
            .app_data(authorizer_data.clone())

            .route("/health_check", web::get().to(health_check))
            .service(
                web::scope("/api/v1")
                    // Public routes
                    .route("/login", web::post().to(login))
                    .route("/refresh", web::post().to(refresh))
                    .route("/change-password", web::patch().to(change_password))

                    // Protected routes (live session check)
                    .service(
                        web::resource("/registration")
                            .wrap(Authorize::new(authorizer.clone()))
                            .route(web::post().to(register)),
                    )
                    .service(
                        web::scope("/user")
                            .wrap(Authorize::new(authorizer.clone()))
                            .route("/update-info", web::patch().to(update_info))
                            .route("/", web::get().to(get_profile))
                            .route("", web::get().to(get_profile)),
                    ),
            )
            .default_service(web::route().to(not_found))
    })
    .listen(listener)?
    .run();

    Ok(server)
}
