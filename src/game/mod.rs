pub mod bot;
pub mod collision;
pub mod constants;
pub mod food;
pub mod math;
pub mod remote;
pub mod simulation;
pub mod snake;
pub mod types;
pub mod view;
pub mod world;
