pub mod catalog;
pub mod customer;
pub mod inventory;
pub mod invoice;
pub mod payroll;
pub mod user;
