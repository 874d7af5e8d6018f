pub mod problem;
pub mod submission;
pub mod task;
pub mod test_pair;
pub mod test_pair_assignment;
pub mod user;
