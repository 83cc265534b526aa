pub mod job;
pub mod posting;
pub mod skills;
