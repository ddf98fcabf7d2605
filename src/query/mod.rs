pub mod catalog;
pub mod period;
