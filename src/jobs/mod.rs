pub mod maintenance;
pub mod reaper;
