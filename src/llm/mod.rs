pub mod client;
pub mod client_impl;
pub mod collaborator;
pub mod factory;
pub mod prompts;
