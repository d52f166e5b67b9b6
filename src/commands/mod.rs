pub mod auth;
pub mod batch;
pub mod config;
pub mod download;
pub mod draft;
pub mod label;
pub mod list;
pub mod mailbox;
pub mod read;
pub mod schema;
pub mod search;
pub mod send;
pub mod watch;
