pub mod crons;
pub mod fan;
pub mod health;
pub mod readings;
pub mod settings;
