//! The transport's remote-call primitive.
//!
//! # Responsibilities
//! - Send one buffered request and return the buffered response
//! - Bind all calls to a single endpoint (`HyperRemote`)
//!
//! # Design Decisions
//! - Requests arrive in origin form; the endpoint supplies scheme and authority
//! - Bodies are collected fully before the response is handed back

use std::future::Future;
use std::time::Duration;

use bytes::Bytes;
use futures_util::future::BoxFuture;
use http::uri::{Authority, PathAndQuery, Scheme};
use http::{Request, Response, Uri};
use http_body_util::{BodyExt, Full};
use hyper_util::{
    client::legacy::{connect::HttpConnector, Client},
    rt::TokioExecutor,
};

use crate::config::ClientConfig;
use crate::BoxError;

/// Future returned by [`RemoteCall::call`].
pub type RemoteFuture = BoxFuture<'static, Result<Response<Bytes>, BoxError>>;

/// Sends a request somewhere and resolves with the response.
pub trait RemoteCall: Send + Sync {
    fn call(&self, request: Request<Bytes>) -> RemoteFuture;
}

impl<F, Fut> RemoteCall for F
where
    F: Fn(Request<Bytes>) -> Fut + Send + Sync,
    Fut: Future<Output = Result<Response<Bytes>, BoxError>> + Send + 'static,
{
    fn call(&self, request: Request<Bytes>) -> RemoteFuture {
        Box::pin(self(request))
    }
}

/// HTTP/1.1 client bound to one `host:port`.
#[derive(Clone)]
pub struct HyperRemote {
    client: Client<HttpConnector, Full<Bytes>>,
    authority: Authority,
}

impl HyperRemote {
    /// Client for `endpoint` with default settings.
    pub fn new(endpoint: &str) -> Result<Self, BoxError> {
        Self::from_config(&ClientConfig {
            endpoint: endpoint.to_string(),
            ..ClientConfig::default()
        })
    }

    pub fn from_config(config: &ClientConfig) -> Result<Self, BoxError> {
        let authority: Authority = config.endpoint.parse()?;

        let mut connector = HttpConnector::new();
        connector.set_connect_timeout(Some(Duration::from_secs(config.connect_timeout_secs)));
        connector.set_nodelay(true);

        let client = Client::builder(TokioExecutor::new())
            .pool_max_idle_per_host(config.max_idle_per_host)
            .build(connector);

        tracing::debug!(endpoint = %authority, "Remote client created");
        Ok(Self { client, authority })
    }

    pub fn endpoint(&self) -> &Authority {
        &self.authority
    }
}

impl RemoteCall for HyperRemote {
    fn call(&self, request: Request<Bytes>) -> RemoteFuture {
        let client = self.client.clone();
        let authority = self.authority.clone();

        Box::pin(async move {
            let (mut parts, body) = request.into_parts();

            let mut uri_parts = parts.uri.into_parts();
            uri_parts.scheme = Some(Scheme::HTTP);
            uri_parts.authority = Some(authority);
            if uri_parts.path_and_query.is_none() {
                uri_parts.path_and_query = Some(PathAndQuery::from_static("/"));
            }
            parts.uri = Uri::from_parts(uri_parts)?;

            let response = client.request(Request::from_parts(parts, Full::new(body))).await?;
            let (parts, body) = response.into_parts();
            let body = body.collect().await?.to_bytes();

            Ok(Response::from_parts(parts, body))
        })
    }
}

impl std::fmt::Debug for HyperRemote {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HyperRemote")
            .field("authority", &self.authority)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_endpoint_parsed() {
        let remote = HyperRemote::new("localhost:10000").unwrap();
        assert_eq!(remote.endpoint().host(), "localhost");
        assert_eq!(remote.endpoint().port_u16(), Some(10000));
    }

    #[test]
    fn test_bad_endpoint() {
        assert!(HyperRemote::new("not a host").is_err());
    }
}
