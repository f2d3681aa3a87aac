use crate::error::{Error, Result};
use base64::{engine::general_purpose::STANDARD, Engine as _};
use reqwest::blocking::{Client, Request};
use reqwest::header::{ACCEPT, AUTHORIZATION, CONTENT_TYPE};
use reqwest::{Method, StatusCode};
use std::time::Duration;
use tracing::debug;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Credentials {
    pub token: Option<String>,
    pub username: Option<String>,
    pub password: Option<String>,
}

/// Bearer token wins over basic auth; with neither configured no header is sent.
pub fn authorization_header(credentials: &Credentials) -> Option<String> {
    if let Some(token) = credentials.token.as_deref().filter(|t| !t.is_empty()) {
        return Some(format!("Bearer {}", token));
    }
    let username = credentials.username.as_deref().filter(|u| !u.is_empty())?;
    let password = credentials.password.as_deref().unwrap_or("");
    let encoded = STANDARD.encode(format!("{}:{}", username, password));
    Some(format!("Basic {}", encoded))
}

/// A fully-read response. The body is drained before `call` returns, so no
/// connection is left half-read on any path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiResponse {
    pub status: u16,
    pub body: String,
}

impl ApiResponse {
    pub fn status_line(&self) -> String {
        match StatusCode::from_u16(self.status) {
            Ok(code) => code.to_string(),
            Err(_) => self.status.to_string(),
        }
    }
}

#[cfg_attr(test, mockall::automock)]
pub trait Transport {
    fn call(&self, method: Method, url: &str, body: Option<String>) -> Result<ApiResponse>;
}

pub struct HttpTransport {
    client: Client,
    credentials: Credentials,
}

impl HttpTransport {
    pub fn new(credentials: Credentials, request_timeout: Duration) -> Result<Self> {
        let client = Client::builder()
            .timeout(request_timeout)
            .build()
            .map_err(Error::Client)?;
        Ok(HttpTransport {
            client,
            credentials,
        })
    }

    fn build_request(
        &self,
        method: Method,
        url: &str,
        body: Option<String>,
    ) -> reqwest::Result<Request> {
        let mut request = self
            .client
            .request(method.clone(), url)
            .header(ACCEPT, "application/json");
        if method == Method::POST {
            request = request.header(CONTENT_TYPE, "application/x-www-form-urlencoded");
        }
        if let Some(value) = authorization_header(&self.credentials) {
            request = request.header(AUTHORIZATION, value);
        }
        if let Some(body) = body {
            request = request.body(body);
        }
        request.build()
    }
}

impl Transport for HttpTransport {
    fn call(&self, method: Method, url: &str, body: Option<String>) -> Result<ApiResponse> {
        let transport_error = |source| Error::Transport {
            method: method.to_string(),
            url: url.to_string(),
            source,
        };

        debug!(%method, url, body = body.as_deref().unwrap_or(""), "request");
        let request = self
            .build_request(method.clone(), url, body)
            .map_err(transport_error)?;
        let response = self.client.execute(request).map_err(transport_error)?;
        let status = response.status().as_u16();
        let body = response.text().map_err(transport_error)?;
        debug!(%method, url, status, body = %body, "response");

        Ok(ApiResponse { status, body })
    }
}

#[cfg(test)]
pub mod testing {
    use super::*;
    use std::cell::RefCell;
    use std::collections::{HashMap, VecDeque};
    use std::rc::Rc;

    pub const BASE: &str = "http://pipeline.test/api";

    #[derive(Debug, Clone, PartialEq, Eq)]
    pub struct RecordedCall {
        pub method: Method,
        pub path: String,
        pub body: Option<String>,
    }

    #[derive(Default)]
    struct State {
        routes: HashMap<(Method, String), VecDeque<ApiResponse>>,
        calls: Vec<RecordedCall>,
    }

    /// Scripted transport: each route replays its queued responses in order and
    /// keeps repeating the last one. Unscripted routes panic.
    #[derive(Clone, Default)]
    pub struct FakeTransport {
        state: Rc<RefCell<State>>,
    }

    impl FakeTransport {
        pub fn new() -> Self {
            Self::default()
        }

        pub fn on(self, method: Method, path: &str, statuses: &[u16]) -> Self {
            for status in statuses {
                self.push(method.clone(), path, *status, "");
            }
            self
        }

        pub fn on_body(self, method: Method, path: &str, status: u16, body: &str) -> Self {
            self.push(method, path, status, body);
            self
        }

        fn push(&self, method: Method, path: &str, status: u16, body: &str) {
            self.state
                .borrow_mut()
                .routes
                .entry((method, path.to_string()))
                .or_default()
                .push_back(ApiResponse {
                    status,
                    body: body.to_string(),
                });
        }

        pub fn calls(&self) -> Vec<RecordedCall> {
            self.state.borrow().calls.clone()
        }

        pub fn count(&self, method: Method, path: &str) -> usize {
            self.state
                .borrow()
                .calls
                .iter()
                .filter(|c| c.method == method && c.path == path)
                .count()
        }
    }

    impl Transport for FakeTransport {
        fn call(&self, method: Method, url: &str, body: Option<String>) -> Result<ApiResponse> {
            let path = url
                .strip_prefix(BASE)
                .unwrap_or_else(|| panic!("unexpected base in {}", url))
                .to_string();
            let mut state = self.state.borrow_mut();
            state.calls.push(RecordedCall {
                method: method.clone(),
                path: path.clone(),
                body,
            });
            let queue = state
                .routes
                .get_mut(&(method.clone(), path.clone()))
                .unwrap_or_else(|| panic!("unscripted call {} {}", method, path));
            let response = if queue.len() > 1 {
                queue.pop_front()
            } else {
                queue.front().cloned()
            };
            Ok(response.unwrap_or_else(|| panic!("no response left for {} {}", method, path)))
        }
    }
}
