pub mod config;
pub mod domain;
pub mod inbound;

pub use domain::principal;
