pub mod booking;
pub mod charity;
pub mod quote;
