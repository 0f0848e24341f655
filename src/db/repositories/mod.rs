pub mod assignment_repository;
pub mod driver_repository;
pub mod preference_repository;
pub mod slot_repository;
