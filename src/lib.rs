pub mod cli;
pub mod config;
pub mod document;
pub mod event;
pub mod index;
pub mod observe;
pub mod pipeline;
