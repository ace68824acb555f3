pub mod check;
pub mod ping;
pub mod seed;
pub mod token;
