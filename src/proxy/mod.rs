//! HTTP forwarding to the selected backend server.

mod http_proxy;

pub use http_proxy::{HttpProxyError, ProxyBody, ProxyContext, error_response, forward_request};
