// HTTP server setup using actix-web

use actix_web::dev::Server;
use actix_web::{web, App, HttpServer};

use crate::api;
use crate::state::SharedState;

/// Create the HTTP server (does not start it - caller must await)
pub fn run_server(state: SharedState, port: u16) -> std::io::Result<Server> {
    let server = HttpServer::new(move || {
        App::new()
            .app_data(web::Data::new(state.clone()))
            .route("/status", web::get().to(api::get_status))
            .route("/resources", web::get().to(api::get_resources))
            .route("/diagnostics", web::get().to(api::get_diagnostics))
            .route("/orphans", web::get().to(api::get_orphans))
            .route("/compile", web::post().to(api::compile))
            .route("/cursor", web::get().to(api::get_cursor))
            .route("/notify", web::post().to(api::notify))
            .route("/source/{path:.*}", web::get().to(api::get_source))
            .route("/events", web::get().to(api::get_events))
    })
    .disable_signals() // We handle signals manually
    .bind(("0.0.0.0", port))?
    .run();

    Ok(server)
}
