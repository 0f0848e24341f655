pub mod history_aggregator;
pub mod preference_service;
pub mod schedule_service;
pub mod slot_engine;
