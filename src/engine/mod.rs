pub mod refresh;
pub mod types;
