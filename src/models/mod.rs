pub mod customer;
pub mod product;
pub mod staff;
