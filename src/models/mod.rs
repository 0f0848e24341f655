pub mod assignment;
pub mod driver;
pub mod history;
pub mod preference;
pub mod slot;
