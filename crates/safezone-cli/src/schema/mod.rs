pub mod policy_model;
pub mod session_config;
