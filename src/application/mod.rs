pub mod blog;
pub mod catalog;
pub mod contact;
pub mod error;
pub mod overview;
pub mod repos;
pub mod views;
