pub mod alert;
pub mod auth;
pub mod cache;
pub mod chat;
pub mod clock;
pub mod connectivity;
pub mod context;
pub mod entity;
pub mod error;
pub mod friend;
pub mod group;
pub mod integration;
pub mod listener;
pub mod notification;
pub mod optimistic;
pub mod post;
pub mod screen;
pub mod session;
pub mod state;
pub mod storage;
pub mod store;
pub mod user;

pub use error::{Error, Result};
