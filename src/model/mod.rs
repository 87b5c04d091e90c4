pub mod auth;
pub mod cart;
pub mod catalog;
pub mod checkout;
pub mod notification;
pub mod order;
pub mod payment;
