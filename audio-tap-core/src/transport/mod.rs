pub mod bridge;
pub(crate) mod capture_source;
