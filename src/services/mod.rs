// Wave lifecycle and picking
pub mod picking;
pub mod waves;

// Stock rules and maintenance
pub mod placement;
pub mod reservations;

// Goods-in addressing
pub mod preallocation;

// Service factory for dependency injection
pub mod factory;
