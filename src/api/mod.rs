pub mod access;
pub mod request;
pub mod service;
