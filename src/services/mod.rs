pub mod distance_service;
pub mod pricing_service;
pub mod quote_service;
