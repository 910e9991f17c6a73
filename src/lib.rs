// src/lib.rs

pub mod api;
pub mod bargain;
pub mod config;
pub mod extract;
pub mod llm;
pub mod payments;
pub mod portfolio;
pub mod relay;
pub mod site;
pub mod state;
pub mod store;
pub mod validation;
