pub mod agent;
pub mod cluster;
pub mod tags;
