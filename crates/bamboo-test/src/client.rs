//! Test client for in-memory dispatch.

use std::net::IpAddr;
use std::sync::Arc;

use bamboo_realtime::{MockConnection, SharedConnection};
use bamboo_server::Engine;
use bytes::Bytes;
use http::Method;
use serde::Serialize;

use crate::error::TestError;
use crate::request::TestRequestBuilder;
use crate::response::TestResponse;
use crate::socket::TestSocket;

/// Drives an [`Engine`] without a network.
///
/// HTTP requests go through [`Engine::handle_http`] with every global pipe,
/// action pipe and handler. WebSocket connections are [`MockConnection`]s
/// fed through the engine's open, message and close entrypoints.
///
/// ```
/// use bamboo_server::{Action, EngineBuilder, RequestContext};
/// use bamboo_test::TestClient;
/// use http::StatusCode;
///
/// # #[tokio::main(flavor = "current_thread")]
/// # async fn main() -> Result<(), Box<dyn std::error::Error>> {
/// let engine = EngineBuilder::new()
///     .action(Action::get("/ping", |mut ctx: RequestContext| async move {
///         ctx.text("pong", StatusCode::OK);
///         Ok(ctx)
///     })?)
///     .build()?;
///
/// let client = TestClient::new(engine);
/// client.get("/ping").send().await.assert_status(StatusCode::OK).assert_body_eq("pong");
/// # Ok(())
/// # }
/// ```
#[must_use]
#[derive(Debug, Clone)]
pub struct TestClient {
    engine: Arc<Engine>,
    default_headers: Vec<(String, String)>,
}

impl TestClient {
    /// Wraps an engine.
    pub fn new(engine: Arc<Engine>) -> Self {
        Self {
            engine,
            default_headers: Vec::new(),
        }
    }

    /// Adds a header sent with every request.
    pub fn with_default_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.default_headers.push((name.into(), value.into()));
        self
    }

    /// The wrapped engine.
    #[must_use]
    pub fn engine(&self) -> &Arc<Engine> {
        &self.engine
    }

    /// Starts a GET request.
    pub fn get(&self, uri: impl AsRef<str>) -> TestClientRequest<'_> {
        self.request(Method::GET, uri)
    }

    /// Starts a POST request.
    pub fn post(&self, uri: impl AsRef<str>) -> TestClientRequest<'_> {
        self.request(Method::POST, uri)
    }

    /// Starts a PUT request.
    pub fn put(&self, uri: impl AsRef<str>) -> TestClientRequest<'_> {
        self.request(Method::PUT, uri)
    }

    /// Starts a PATCH request.
    pub fn patch(&self, uri: impl AsRef<str>) -> TestClientRequest<'_> {
        self.request(Method::PATCH, uri)
    }

    /// Starts a DELETE request.
    pub fn delete(&self, uri: impl AsRef<str>) -> TestClientRequest<'_> {
        self.request(Method::DELETE, uri)
    }

    /// Starts a HEAD request.
    pub fn head(&self, uri: impl AsRef<str>) -> TestClientRequest<'_> {
        self.request(Method::HEAD, uri)
    }

    /// Starts a request with any method.
    pub fn request(&self, method: Method, uri: impl AsRef<str>) -> TestClientRequest<'_> {
        let mut builder = TestRequestBuilder::new(method, uri);
        for (name, value) in &self.default_headers {
            builder = builder.header(name, value);
        }
        TestClientRequest { client: self, builder }
    }

    /// Opens a WebSocket connection, optionally carrying `token`.
    ///
    /// The returned socket reports whether the engine accepted it.
    pub async fn connect(&self, token: Option<&str>) -> Result<TestSocket, TestError> {
        let mock = Arc::new(match token {
            Some(token) => MockConnection::with_token(token),
            None => MockConnection::new(),
        });
        self.open(mock).await
    }

    /// Opens a WebSocket connection from `ip`.
    pub async fn connect_from(&self, token: &str, ip: IpAddr) -> Result<TestSocket, TestError> {
        self.open(Arc::new(MockConnection::with_token(token).with_remote_addr(ip)))
            .await
    }

    async fn open(&self, mock: Arc<MockConnection>) -> Result<TestSocket, TestError> {
        let conn: SharedConnection = mock.clone();
        let accepted = self.engine.handle_ws_open(conn.clone()).await?;
        Ok(TestSocket::new(Arc::clone(&self.engine), mock, conn, accepted))
    }
}

/// A request bound to a [`TestClient`].
#[must_use]
#[derive(Debug)]
pub struct TestClientRequest<'a> {
    client: &'a TestClient,
    builder: TestRequestBuilder,
}

impl TestClientRequest<'_> {
    /// Sets a header.
    pub fn header(mut self, name: impl AsRef<str>, value: impl AsRef<str>) -> Self {
        self.builder = self.builder.header(name, value);
        self
    }

    /// Sets `Authorization: Bearer <token>`.
    pub fn bearer_token(mut self, token: impl AsRef<str>) -> Self {
        self.builder = self.builder.bearer_token(token);
        self
    }

    /// Sets the client address seen by the engine.
    pub fn remote_addr(mut self, ip: IpAddr) -> Self {
        self.builder = self.builder.remote_addr(ip);
        self
    }

    /// Sets the raw body.
    pub fn body(mut self, body: impl Into<Bytes>) -> Self {
        self.builder = self.builder.body(body);
        self
    }

    /// Sets a JSON body.
    pub fn json<T: Serialize>(mut self, value: &T) -> Self {
        self.builder = self.builder.json(value);
        self
    }

    /// Appends query parameters.
    pub fn query<T: Serialize>(mut self, value: &T) -> Self {
        self.builder = self.builder.query(value);
        self
    }

    /// Sends the request, panicking if it cannot be built or the engine
    /// returns an error.
    pub async fn send(self) -> TestResponse {
        match self.try_send().await {
            Ok(response) => response,
            Err(e) => panic!("test request failed: {e}"),
        }
    }

    /// Sends the request.
    pub async fn try_send(self) -> Result<TestResponse, TestError> {
        let request = self.builder.build()?;
        let response = self.client.engine.handle_http(request).await?;
        Ok(TestResponse::from_response(response).await)
    }
}
