pub mod booking;
pub mod health;
pub mod payment;
pub mod pricing;
pub mod quote;
