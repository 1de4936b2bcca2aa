pub mod crypto;
pub mod fetch;
pub mod net;
pub mod paths;
pub mod progress;
