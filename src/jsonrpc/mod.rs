pub mod fingerprint;
pub mod request;
pub mod response;

pub use fingerprint::fingerprint;
pub use request::RpcRequest;
pub use response::{ErrorCode, RpcErrorResponse, RpcResponse};
