pub mod config;
pub mod mission_types;
pub mod vehicle_types;
pub mod waypoint_list;

pub use config::*;
pub use mission_types::*;
pub use vehicle_types::*;
pub use waypoint_list::*;
