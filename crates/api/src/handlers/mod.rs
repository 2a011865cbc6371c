//! Request handlers.
//!
//! Handlers validate input, hand work to the pipeline and map errors via
//! [`AppError`](crate::error::AppError).

pub mod home;
pub mod jobs;
pub mod results;
