//! Data model.
//!
//! [`db`] types are stored in MongoDB, [`api`] types cross the HTTP boundary,
//! and [`common`] types are shared by both.

pub mod api;
pub mod common;
pub mod db;
pub mod mongodb;
