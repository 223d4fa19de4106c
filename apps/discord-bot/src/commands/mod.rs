pub mod database;
pub mod general;
