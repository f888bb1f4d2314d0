//! Consul HTTP API client.
//!
//! Sessions, KV acquire, agent info and member listing over `/v1`.
//! No retries and no client-side timeout: a failed call is reported to the
//! caller as a store error and the run ends there.

use async_trait::async_trait;
use recorder_common::constants::{CONSUL_MEMBER_ALIVE, headers::X_CONSUL_TOKEN};
use recorder_common::{Lease, Member, RecorderError, Result};
use reqwest::{Client, RequestBuilder, StatusCode};
use serde::Deserialize;
use serde::de::DeserializeOwned;
use serde_json::json;

use super::LeaseStore;
use crate::cluster::MemberSource;

/// Percent-encode each `/`-separated segment, keeping the separators
fn encode_path(path: &str) -> String {
    path.split('/')
        .map(|segment| urlencoding::encode(segment).into_owned())
        .collect::<Vec<_>>()
        .join("/")
}

#[derive(Debug, Deserialize)]
struct SessionCreated {
    #[serde(rename = "ID")]
    id: String,
}

#[derive(Debug, Deserialize)]
struct KvPair {
    #[serde(rename = "Session", default)]
    session: Option<String>,
}

#[derive(Debug, Deserialize)]
struct AgentMember {
    #[serde(rename = "Name")]
    name: String,
    #[serde(rename = "Addr")]
    addr: String,
    #[serde(rename = "Status")]
    status: u8,
}

/// Consul agent client
pub struct ConsulClient {
    http: Client,
    base_url: String,
    token: Option<String>,
}

impl ConsulClient {
    /// Create a client for the agent at `address` (e.g. `http://127.0.0.1:8500`)
    pub fn new(address: &str, token: Option<String>) -> Result<Self> {
        let http = Client::builder()
            .user_agent(concat!("srv-recorder/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| RecorderError::Store(format!("failed to build HTTP client: {}", e)))?;

        Ok(Self {
            http,
            base_url: address.trim_end_matches('/').to_string(),
            token,
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}/v1/{}", self.base_url, path)
    }

    fn authorize(&self, request: RequestBuilder) -> RequestBuilder {
        match &self.token {
            Some(token) => request.header(X_CONSUL_TOKEN, token),
            None => request,
        }
    }

    /// Send a request and decode a 2xx JSON body
    async fn call<T: DeserializeOwned>(&self, request: RequestBuilder, what: &str) -> Result<T> {
        let response = self
            .authorize(request)
            .send()
            .await
            .map_err(|e| RecorderError::Store(format!("{}: {}", what, e)))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(RecorderError::Store(format!(
                "{}: {} {}",
                what,
                status,
                body.trim()
            )));
        }

        response
            .json()
            .await
            .map_err(|e| RecorderError::Store(format!("{}: invalid response: {}", what, e)))
    }

    /// Datacenter the local agent belongs to
    pub async fn datacenter(&self) -> Result<String> {
        let info: serde_json::Value = self
            .call(self.http.get(self.url("agent/self")), "can't get agent info")
            .await?;

        info["Config"]["Datacenter"]
            .as_str()
            .map(str::to_string)
            .ok_or_else(|| RecorderError::Store("agent info has no datacenter".to_string()))
    }
}

#[async_trait]
impl LeaseStore for ConsulClient {
    async fn create_session(&self, name: &str) -> Result<String> {
        let created: SessionCreated = self
            .call(
                self.http
                    .put(self.url("session/create"))
                    .json(&json!({ "Name": name })),
                "unable to create session",
            )
            .await?;

        tracing::debug!(session = %created.id, "Session created");
        Ok(created.id)
    }

    async fn session_info(&self, id: &str) -> Result<Option<Lease>> {
        // Older agents answer `null` instead of `[]` for unknown sessions
        let sessions: Option<Vec<Lease>> = self
            .call(
                self.http.get(self.url(&format!("session/info/{}", encode_path(id)))),
                "unable to retrieve session",
            )
            .await?;

        Ok(sessions.and_then(|s| s.into_iter().next()))
    }

    async fn destroy_session(&self, id: &str) -> Result<()> {
        let _: bool = self
            .call(
                self.http.put(self.url(&format!("session/destroy/{}", encode_path(id)))),
                "unable to destroy session",
            )
            .await?;
        Ok(())
    }

    async fn kv_get(&self, key: &str) -> Result<Option<String>> {
        let request = self.authorize(self.http.get(self.url(&format!("kv/{}", encode_path(key)))));
        let response = request
            .send()
            .await
            .map_err(|e| RecorderError::Store(format!("unable to get key {}: {}", key, e)))?;

        if response.status() == StatusCode::NOT_FOUND {
            return Ok(None);
        }

        let status = response.status();
        if !status.is_success() {
            return Err(RecorderError::Store(format!(
                "unable to get key {}: {}",
                key, status
            )));
        }

        let pairs: Vec<KvPair> = response
            .json()
            .await
            .map_err(|e| RecorderError::Store(format!("unable to get key {}: {}", key, e)))?;

        Ok(pairs
            .into_iter()
            .next()
            .and_then(|kv| kv.session)
            .filter(|s| !s.is_empty()))
    }

    async fn kv_acquire(&self, key: &str, session: &str) -> Result<bool> {
        self.call(
            self.http.put(self.url(&format!(
                "kv/{}?acquire={}",
                encode_path(key),
                urlencoding::encode(session)
            ))),
            "unable to acquire lock",
        )
        .await
    }
}

#[async_trait]
impl MemberSource for ConsulClient {
    async fn members(&self) -> Result<Vec<Member>> {
        let members: Vec<AgentMember> = self
            .call(self.http.get(self.url("agent/members")), "unable to list members")
            .await
            .map_err(|e| RecorderError::Membership(e.to_string()))?;

        Ok(members
            .into_iter()
            .filter(|m| m.status == CONSUL_MEMBER_ALIVE)
            .map(|m| Member {
                name: m.name,
                address: m.addr,
            })
            .collect())
    }
}
