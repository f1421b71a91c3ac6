pub mod api;
pub mod config;
pub mod domain;
pub mod driver;
pub mod listener;
pub mod mailbox;
pub mod reducer;
pub mod stream;
