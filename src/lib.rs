pub mod app;
pub mod auth;
pub mod config;
pub mod error;
pub mod api {
    pub mod auth;
    pub mod connections;
    pub mod errors;
    pub mod media;
    pub mod notifications;
    pub mod posts;
    pub mod users;
    pub mod views;
}
pub mod db {
    pub mod connection_repository;
    pub mod models;
    pub mod notification_repository;
    pub mod post_repository;
    pub mod user_repository;
}
pub mod mail {
    pub mod mailer;
    pub mod templates;
}
pub mod storage {
    pub mod client;
    pub mod media;
}

#[cfg(test)]
mod testing;
