pub mod table_repo;
pub use table_repo::{TableRepository, TableStore};
pub mod expense_group_repo;
pub use expense_group_repo::{ExpenseGroupRepository, ExpenseGroupStore};
pub mod robot_repo;
pub use robot_repo::{RobotRepository, RobotStore};

#[cfg(test)]
pub mod memory;
#[cfg(test)]
pub use memory::MemoryStore;
