pub mod climate_data;

pub use climate_data::*;
