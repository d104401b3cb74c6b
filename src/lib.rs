pub mod errors;

pub mod modules;
