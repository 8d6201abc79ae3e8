pub mod chat;
pub mod comment;
pub mod event;
pub mod notification;
pub mod profile;
pub mod restaurant;
pub mod review;
pub mod session;
