//! Middleware modules.

pub mod admission;
pub mod error;

pub use admission::AdmissionMiddleware;
