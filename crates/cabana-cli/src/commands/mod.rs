pub mod common;
pub mod complain;
pub mod completions;
pub mod dare;
pub mod join;
pub mod status;
pub mod vote;
pub mod wall;
pub mod watch;
