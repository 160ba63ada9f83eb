pub mod catalog;
pub mod descriptor;
pub mod order;
pub mod task;
