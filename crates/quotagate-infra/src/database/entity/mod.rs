//! SeaORM entities.

pub mod api_call;
