pub mod config;
pub mod credentials;
pub mod k8s;
pub mod masking;
pub mod observability;
pub mod service;
pub mod store;
