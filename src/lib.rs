pub mod bus;
pub mod cache;
pub mod config;
pub mod egress;
pub mod error;
pub mod ingress;
pub mod jsonrpc;
pub mod stub;
pub mod upstream;
