pub mod generate;
pub mod resolve;
pub mod version;
