mod mesh_command;
mod mesh_config;
mod mesh_observer;
mod mesh_room;
mod orchestrator;

pub use mesh_command::*;
pub use mesh_config::*;
pub use mesh_observer::*;
pub use mesh_room::*;
pub use orchestrator::*;
