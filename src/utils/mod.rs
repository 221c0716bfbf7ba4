pub mod credits;
pub mod token;
pub mod upload;
