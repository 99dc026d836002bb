//! Fixed demo workflows, one per pattern

pub mod contract;
pub mod faq;
pub mod product_plan;
pub mod recipe;
pub mod refinery;
pub mod retail;
