pub mod client;
pub mod models;

pub use client::{FlagChanges, Folders, ListOptions, MailClient, Selection};
