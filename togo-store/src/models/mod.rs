/// Database models for togo
///
/// # Models
///
/// - `user`: Users and their daily task quota
/// - `task`: Tasks, counted and listed per calendar day

pub mod task;
pub mod user;
