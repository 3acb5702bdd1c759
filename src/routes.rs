// src/routes.rs
use actix_web::web;
use actix_web_httpauth::middleware::HttpAuthentication;

use crate::auth::jwt_middleware;
use crate::{
    auth_handlers, chat_handlers, community_handlers, guide_handlers, monitoring, note_handlers,
    scholarship_handlers, translation_handlers,
};

pub fn configure(cfg: &mut web::ServiceConfig) {
    let auth_middleware = HttpAuthentication::bearer(jwt_middleware);

    cfg
        // Health check and metrics (no auth)
        .service(
            web::scope("/health")
                .route("", web::get().to(monitoring::health_check))
                .route("/metrics", web::get().to(monitoring::metrics_endpoint))
        )

        .service(
            web::scope("/auth")
                .route("/login", web::post().to(auth_handlers::login))
                .route("/register", web::post().to(auth_handlers::register))
        )

        // Must precede the protected /api/v1 scope
        .service(
            web::scope("/api/v1/public")
                .route("/scholarships", web::get().to(scholarship_handlers::get_all_scholarships))
                .route("/scholarships/search", web::get().to(scholarship_handlers::search_scholarships))
                .route("/scholarships/facets", web::get().to(scholarship_handlers::get_scholarship_facets))
                .route("/scholarships/{id}", web::get().to(scholarship_handlers::get_scholarship))
                .route("/guides", web::get().to(guide_handlers::get_all_guides))
                .route("/guides/search", web::get().to(guide_handlers::search_guides))
                .route("/guides/facets", web::get().to(guide_handlers::get_guide_facets))
                .route("/guides/{id}", web::get().to(guide_handlers::get_guide))
                .route("/guide-categories", web::get().to(guide_handlers::get_guide_categories))
                .route("/translations/{locale}", web::get().to(translation_handlers::get_dictionary))
                .route("/translations/{locale}/{key}", web::get().to(translation_handlers::get_translation))
        )

        .service(
            web::scope("/api/v1")
                .wrap(auth_middleware)

                .service(
                    web::scope("/auth")
                        .route("/logout", web::post().to(auth_handlers::logout))
                        .route("/session", web::get().to(auth_handlers::get_session))
                        .route("/profile", web::put().to(auth_handlers::update_profile))
                        .route("/users", web::get().to(auth_handlers::get_users))
                )

                .service(
                    web::scope("/scholarships")
                        .route("", web::post().to(scholarship_handlers::create_scholarship))
                        .route("/{id}", web::put().to(scholarship_handlers::update_scholarship))
                        .route("/{id}", web::delete().to(scholarship_handlers::delete_scholarship))
                        .route("/{id}/save", web::post().to(scholarship_handlers::save_scholarship))
                        .route("/{id}/save", web::delete().to(scholarship_handlers::unsave_scholarship))
                )

                .service(
                    web::scope("/guides")
                        .route("", web::post().to(guide_handlers::create_guide))
                        .route("/{id}", web::put().to(guide_handlers::update_guide))
                        .route("/{id}", web::delete().to(guide_handlers::delete_guide))
                )

                .service(
                    web::scope("/me")
                        .route("/saved", web::get().to(scholarship_handlers::get_saved_scholarships))
                )

                .service(
                    web::scope("/posts")
                        .route("", web::get().to(community_handlers::get_posts))
                        .route("", web::post().to(community_handlers::create_post))
                        .route("/{id}", web::get().to(community_handlers::get_post))
                        .route("/{id}", web::put().to(community_handlers::update_post))
                        .route("/{id}", web::delete().to(community_handlers::delete_post))
                        .route("/{id}/like", web::post().to(community_handlers::toggle_post_like))
                        .route("/{id}/comments", web::get().to(community_handlers::get_comments))
                        .route("/{id}/comments", web::post().to(community_handlers::create_comment))
                )

                .service(
                    web::scope("/comments")
                        .route("/{id}", web::delete().to(community_handlers::delete_comment))
                        .route("/{id}/like", web::post().to(community_handlers::toggle_comment_like))
                )

                .service(
                    web::scope("/notes")
                        .route("", web::get().to(note_handlers::get_notes))
                        .route("", web::post().to(note_handlers::create_note))
                        .route("/{id}", web::get().to(note_handlers::get_note))
                        .route("/{id}", web::put().to(note_handlers::update_note))
                        .route("/{id}", web::delete().to(note_handlers::delete_note))
                )

                .service(
                    web::scope("/chat")
                        .route("", web::post().to(chat_handlers::send_message))
                        .route("/history", web::get().to(chat_handlers::get_history))
                        .route("/history", web::delete().to(chat_handlers::clear_history))
                )

                .service(
                    web::scope("/translations")
                        .route("/{locale}/{key}", web::put().to(translation_handlers::upsert_translation))
                        .route("/{locale}/{key}", web::delete().to(translation_handlers::delete_translation))
                )
        );
}
