pub mod candidate;
pub mod judgment;
pub mod offer;
