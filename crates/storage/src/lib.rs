#![warn(clippy::pedantic)]
#![allow(clippy::missing_errors_doc)]

pub mod rest;
pub mod sqlite;

pub use rest::{REST, ReqwestSendRequest, Resolution, RestSettings, SendRequest};
pub use sqlite::SQLite;
