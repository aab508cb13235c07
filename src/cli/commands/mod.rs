pub mod envelope;
pub mod request;
pub mod serve;
