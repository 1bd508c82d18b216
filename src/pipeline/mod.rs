pub mod in_flight;
pub mod summary;
