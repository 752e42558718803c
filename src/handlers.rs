pub mod dashboard;
pub mod expense_groups;
pub mod robot;
pub mod uploads;
