use actix_web::{middleware::Logger, web, App, HttpServer};
use actix_web::dev::Server;
use sqlx::PgPool;
use std::net::TcpListener;

use crate::configuration::{AuthSettings, MediaSettings};
use crate::media_client::MediaClient;
use crate::middleware::AuthMiddleware;
use crate::routes::{
    change_password, current_user, health_check, login, logout, refresh, register, update_account,
    update_avatar, update_cover_image,
};
use crate::users::PgUserStore;

pub fn run(
    listener: TcpListener,
    connection: PgPool,
    auth: AuthSettings,
    media: MediaSettings,
) -> Result<Server, std::io::Error> {
    let store = PgUserStore::new(connection);
    let store_data = web::Data::new(store.clone());
    let auth_data = web::Data::new(auth.clone());
    let media_data = web::Data::new(MediaClient::new(media.base_url, reqwest::Client::new()));

    let server = HttpServer::new(move || {
        App::new()
            .wrap(Logger::default())
            .app_data(store_data.clone())
            .app_data(auth_data.clone())
            .app_data(media_data.clone())
            // Public routes (no authentication required)
            .route("/health_check", web::get().to(health_check))
            .route("/auth/register", web::post().to(register))
            .route("/auth/login", web::post().to(login))
            .route("/auth/refresh", web::post().to(refresh))
            // Protected routes (verified identity required)
            .service(
                web::scope("/auth")
                    .wrap(AuthMiddleware::new(auth.clone(), store.clone()))
                    .route("/logout", web::post().to(logout))
                    .route("/me", web::get().to(current_user))
                    .route("/change-password", web::post().to(change_password))
                    .route("/account", web::patch().to(update_account))
                    .route("/avatar", web::patch().to(update_avatar))
                    .route("/cover-image", web::patch().to(update_cover_image)),
            )
    })
    .listen(listener)?
    .run();

    Ok(server)
}
