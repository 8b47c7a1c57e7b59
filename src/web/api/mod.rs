pub mod error;
pub mod measurements;
pub mod solar;
pub mod verdict;
