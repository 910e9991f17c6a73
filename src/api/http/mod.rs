// src/api/http/mod.rs

pub mod bargain;
pub mod common;
pub mod handlers;
pub mod payments;
pub mod portfolio;
pub mod router;
pub mod site;
pub mod streams;

pub use common::{UserId, USER_ID_HEADER};
pub use router::http_router;
