pub mod apps;
pub mod manager;
pub mod state;
