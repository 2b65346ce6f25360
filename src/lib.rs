// Consumption prohibition controller
pub mod prohibition;
