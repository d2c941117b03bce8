use http::{Method, StatusCode};
use log::{debug, warn};
use serde::{de::DeserializeOwned, Deserialize, Serialize};

use crate::{Credentials, Error, NewPoll, Poll, Result};

/// Header carrying the anonymous user identifier.
pub const USER_ID_HEADER: &str = "X-User-ID";

/// A request to the poll service, relative to the API base.
///
/// `segments` are raw path segments; the transport escapes them.
#[derive(Debug, Clone, PartialEq)]
pub struct ApiRequest {
    pub method: Method,
    pub segments: Vec<String>,
    pub user_id: String,
    pub basic_auth: Option<Credentials>,
    pub body: Option<serde_json::Value>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiResponse {
    pub status: StatusCode,
    pub body: String,
}

/// Moves requests over the wire.
///
/// Only failures to get *any* response belong in the error path; every HTTP
/// status comes back as an `ApiResponse`.
#[allow(async_fn_in_trait)]
pub trait Transport {
    async fn send(&self, request: ApiRequest) -> Result<ApiResponse>;
}

/// `reqwest` transport. Uses `fetch` when compiled to wasm.
#[derive(Clone)]
pub struct ReqwestTransport {
    client: reqwest::Client,
    base_url: String,
}

impl ReqwestTransport {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }

    /// Appends `segments` to the base, percent-encoding each one.
    pub fn url(&self, segments: &[String]) -> Result<reqwest::Url> {
        let invalid = || Error::InvalidApiBase(self.base_url.clone());
        let mut url = reqwest::Url::parse(&self.base_url).map_err(|e| {
            warn!("Cannot parse API base {}: {e}", self.base_url);
            invalid()
        })?;
        url.path_segments_mut()
            .map_err(|()| invalid())?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }
}

impl Transport for ReqwestTransport {
    async fn send(&self, request: ApiRequest) -> Result<ApiResponse> {
        let url = self.url(&request.segments)?;
        let mut builder = self
            .client
            .request(request.method.clone(), url.clone())
            .header(USER_ID_HEADER, &request.user_id);
        if let Some(creds) = &request.basic_auth {
            builder = builder.basic_auth(&creds.username, Some(&creds.password));
        }
        if let Some(body) = &request.body {
            builder = builder.json(body);
        }

        let resp = builder.send().await.map_err(|e| {
            warn!("{} {url} failed: {e}", request.method);
            Error::NetworkUnavailable
        })?;
        let status = resp.status();
        let body = resp.text().await.map_err(|e| {
            warn!("Failed to read response body of {} {url}: {e}", request.method);
            Error::NetworkUnavailable
        })?;
        debug!("{} {url} -> {status}", request.method);

        Ok(ApiResponse { status, body })
    }
}

/// Envelope returned by vote, delete and login.
#[derive(Debug, Deserialize)]
struct Outcome {
    #[serde(default)]
    success: bool,
    message: Option<String>,
    error: Option<String>,
}

impl Outcome {
    fn reason(self) -> Option<String> {
        self.error.or(self.message)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct VoteReceipt {
    pub message: Option<String>,
    pub total_votes: Option<u64>,
}

#[derive(Serialize)]
struct VoteBody {
    option_index: usize,
}

#[derive(Serialize)]
struct LoginBody<'a> {
    username: &'a str,
    password: &'a str,
}

/// Client for the poll service under `/api`.
pub struct PollApi<T> {
    transport: T,
    user_id: String,
}

impl<T: Transport> PollApi<T> {
    pub fn new(transport: T, user_id: String) -> Self {
        Self { transport, user_id }
    }

    pub fn user_id(&self) -> &str {
        &self.user_id
    }

    pub async fn list_polls(&self) -> Result<Vec<Poll>> {
        let resp = self.send(Method::GET, path(&["polls"]), None, None).await?;
        decode(&check(resp)?)
    }

    pub async fn get_poll(&self, id: &str) -> Result<Poll> {
        let resp = self
            .send(Method::GET, path(&["polls", id]), None, None)
            .await?;
        if resp.status == StatusCode::NOT_FOUND {
            return Err(Error::NotFound);
        }
        decode(&check(resp)?)
    }

    pub async fn create_poll(&self, poll: &NewPoll, credentials: &Credentials) -> Result<Poll> {
        let body = to_body(poll)?;
        let resp = self
            .send(
                Method::POST,
                path(&["polls"]),
                Some(credentials.clone()),
                Some(body),
            )
            .await?;
        let created: Poll = decode(&check(resp)?)
            .map_err(|_| Error::InvalidResponse("created poll is missing its id".into()))?;
        if created.id.is_empty() {
            return Err(Error::InvalidResponse("created poll is missing its id".into()));
        }
        Ok(created)
    }

    pub async fn vote(&self, poll_id: &str, option_index: usize) -> Result<VoteReceipt> {
        let body = to_body(&VoteBody { option_index })?;
        let resp = self
            .send(Method::POST, path(&["polls", poll_id, "vote"]), None, Some(body))
            .await?;
        let resp = check(resp)?;
        let outcome: Outcome = decode(&resp)?;
        if !outcome.success {
            return Err(Error::RequestFailed {
                status: resp.status.as_u16(),
                message: outcome.reason().or_else(|| Some("Failed to record vote".into())),
            });
        }
        decode(&resp)
    }

    pub async fn delete_poll(&self, poll_id: &str) -> Result<Option<String>> {
        let resp = self
            .send(Method::DELETE, path(&["polls", poll_id]), None, None)
            .await?;
        let resp = check(resp)?;
        let outcome: Outcome = decode(&resp)?;
        if !outcome.success {
            return Err(Error::RequestFailed {
                status: resp.status.as_u16(),
                message: outcome.reason().or_else(|| Some("Failed to delete poll".into())),
            });
        }
        Ok(outcome.message)
    }

    /// A 2xx whose body reports `success: false` is still a failure.
    pub async fn admin_login(&self, username: &str, password: &str) -> Result<()> {
        let body = to_body(&LoginBody { username, password })?;
        let resp = self
            .send(Method::POST, path(&["admin", "login"]), None, Some(body))
            .await?;
        let outcome: Outcome = decode(&check(resp)?)?;
        if !outcome.success {
            return Err(Error::AuthFailed(outcome.error));
        }
        Ok(())
    }

    async fn send(
        &self,
        method: Method,
        segments: Vec<String>,
        basic_auth: Option<Credentials>,
        body: Option<serde_json::Value>,
    ) -> Result<ApiResponse> {
        self.transport
            .send(ApiRequest {
                method,
                segments,
                user_id: self.user_id.clone(),
                basic_auth,
                body,
            })
            .await
    }
}

fn path(segments: &[&str]) -> Vec<String> {
    segments.iter().map(|s| s.to_string()).collect()
}

fn to_body(value: &impl Serialize) -> Result<serde_json::Value> {
    serde_json::to_value(value).map_err(|e| Error::InvalidResponse(e.to_string()))
}

/// Maps a non-2xx status to `RequestFailed`, picking up the server's message.
fn check(resp: ApiResponse) -> Result<ApiResponse> {
    if resp.status.is_success() {
        return Ok(resp);
    }
    let message = serde_json::from_str::<Outcome>(&resp.body)
        .ok()
        .and_then(Outcome::reason);
    Err(Error::RequestFailed {
        status: resp.status.as_u16(),
        message,
    })
}

fn decode<D: DeserializeOwned>(resp: &ApiResponse) -> Result<D> {
    serde_json::from_str(&resp.body).map_err(|e| Error::InvalidResponse(e.to_string()))
}


#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::testing::ScriptedTransport;
    use super::*;

    fn api() -> (PollApi<ScriptedTransport>, ScriptedTransport) {
        let transport = ScriptedTransport::default();
        (PollApi::new(transport.clone(), "user-1".into()), transport)
    }

    fn poll_json() -> serde_json::Value {
        json!({
            "id": "p1",
            "question": "Tea or coffee?",
            "options": ["Tea", "Coffee"],
            "votes": [3, 7],
            "total_votes": 10,
            "created_at": "2024-05-01T12:00:00"
        })
    }

    #[tokio::test]
    async fn every_request_carries_user_id() {
        let (api, transport) = api();
        transport
            .reply(200, json!([]))
            .reply(200, json!({"success": true, "message": "Login successful"}));

        api.list_polls().await.unwrap();
        api.admin_login("admin", "admin").await.unwrap();

        for req in transport.sent.borrow().iter() {
            assert_eq!(req.user_id, "user-1");
        }
        let login = transport.last();
        assert_eq!(login.segments, ["admin", "login"]);
        assert_eq!(login.basic_auth, None);
        assert_eq!(
            login.body,
            Some(json!({"username": "admin", "password": "admin"}))
        );
    }

    #[tokio::test]
    async fn not_found_is_distinct_from_server_error() {
        let (api, transport) = api();
        transport
            .reply(404, json!({"error": "Poll not found"}))
            .reply(500, json!({"error": "disk full"}))
            .reply_raw(502, "<html>bad gateway</html>");

        assert_eq!(api.get_poll("p1").await, Err(Error::NotFound));
        assert_eq!(
            api.get_poll("p1").await,
            Err(Error::RequestFailed {
                status: 500,
                message: Some("disk full".into())
            })
        );
        assert_eq!(
            api.get_poll("p1").await,
            Err(Error::RequestFailed {
                status: 502,
                message: None
            })
        );
    }

    #[tokio::test]
    async fn get_poll_decodes_and_keeps_id_as_one_segment() {
        let (api, transport) = api();
        transport.reply(200, poll_json());

        let poll = api.get_poll("a b/c").await.unwrap();
        assert_eq!(poll.votes, vec![3, 7]);
        assert_eq!(transport.last().segments, ["polls", "a b/c"]);
        assert_eq!(transport.last().method, Method::GET);
    }

    #[test]
    fn transport_escapes_path_segments() {
        let transport = ReqwestTransport::new("http://127.0.0.1:3000/api/");
        let url = transport
            .url(&path(&["polls", "a b/c?#", "vote"]))
            .unwrap();
        assert_eq!(
            url.as_str(),
            "http://127.0.0.1:3000/api/polls/a%20b%2Fc%3F%23/vote"
        );

        let bare = ReqwestTransport::new("http://127.0.0.1:3000");
        assert_eq!(
            bare.url(&path(&["polls"])).unwrap().as_str(),
            "http://127.0.0.1:3000/polls"
        );

        assert_eq!(
            ReqwestTransport::new("not a url").url(&path(&["polls"])),
            Err(Error::InvalidApiBase("not a url".into()))
        );
    }

    #[tokio::test]
    async fn network_failure_propagates() {
        let (api, transport) = api();
        transport.fail(Error::NetworkUnavailable);
        assert_eq!(api.list_polls().await, Err(Error::NetworkUnavailable));
    }

    #[tokio::test]
    async fn create_sends_basic_credentials() {
        let (api, transport) = api();
        transport
            .reply(
                200,
                json!({"id": "p9", "question": "Q?", "options": ["A", "B"],
                       "created_at": "2024-05-01T12:00:00", "success": true}),
            )
            .reply(401, json!({"error": "Admin privileges required"}));

        let creds = Credentials {
            username: "admin".into(),
            password: "secret".into(),
        };
        let new_poll = NewPoll {
            question: "Q?".into(),
            options: vec!["A".into(), "B".into()],
        };
        let created = api.create_poll(&new_poll, &creds).await.unwrap();
        assert_eq!(created.id, "p9");
        assert_eq!(created.total_votes, 0);

        let req = transport.last();
        assert_eq!(req.method, Method::POST);
        assert_eq!(req.basic_auth, Some(creds.clone()));
        assert_eq!(
            req.body,
            Some(json!({"question": "Q?", "options": ["A", "B"]}))
        );

        assert_eq!(
            api.create_poll(&new_poll, &creds).await,
            Err(Error::RequestFailed {
                status: 401,
                message: Some("Admin privileges required".into())
            })
        );
    }

    #[tokio::test]
    async fn create_without_id_is_invalid() {
        let (api, transport) = api();
        transport.reply(200, json!({"success": true}));
        let creds = Credentials {
            username: "admin".into(),
            password: "admin".into(),
        };
        let new_poll = NewPoll {
            question: "Q?".into(),
            options: vec!["A".into(), "B".into()],
        };
        assert!(matches!(
            api.create_poll(&new_poll, &creds).await,
            Err(Error::InvalidResponse(_))
        ));
    }

    #[tokio::test]
    async fn vote_envelope() {
        let (api, transport) = api();
        transport
            .reply(
                200,
                json!({"success": true, "message": "Vote recorded successfully", "total_votes": 11}),
            )
            .reply(400, json!({"error": "You have already voted on this poll"}))
            .reply(200, json!({"success": false}));

        let receipt = api.vote("p1", 1).await.unwrap();
        assert_eq!(receipt.total_votes, Some(11));
        assert_eq!(transport.last().segments, ["polls", "p1", "vote"]);
        assert_eq!(transport.last().body, Some(json!({"option_index": 1})));

        assert_eq!(
            api.vote("p1", 1).await.unwrap_err().to_string(),
            "You have already voted on this poll"
        );
        assert_eq!(
            api.vote("p1", 1).await,
            Err(Error::RequestFailed {
                status: 200,
                message: Some("Failed to record vote".into())
            })
        );
    }

    #[tokio::test]
    async fn delete_poll_reports_message() {
        let (api, transport) = api();
        transport
            .reply(200, json!({"success": true, "message": "Poll deleted successfully"}))
            .reply(404, json!({"error": "Poll not found"}));

        assert_eq!(
            api.delete_poll("p1").await,
            Ok(Some("Poll deleted successfully".into()))
        );
        assert_eq!(transport.last().method, Method::DELETE);
        assert_eq!(
            api.delete_poll("p1").await.unwrap_err().to_string(),
            "Poll not found"
        );
    }

    #[tokio::test]
    async fn login_failure_inside_success_status() {
        let (api, transport) = api();
        transport
            .reply(200, json!({"success": false, "error": "Invalid credentials"}))
            .reply(401, json!({"success": false, "error": "Invalid credentials"}));

        assert_eq!(
            api.admin_login("admin", "nope").await,
            Err(Error::AuthFailed(Some("Invalid credentials".into())))
        );
        assert_eq!(
            api.admin_login("admin", "nope").await,
            Err(Error::RequestFailed {
                status: 401,
                message: Some("Invalid credentials".into())
            })
        );
    }
}
