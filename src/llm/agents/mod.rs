pub mod chart_code;
pub mod narrative;
