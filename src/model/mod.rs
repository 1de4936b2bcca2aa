pub mod manifest;
pub mod model_manager;
