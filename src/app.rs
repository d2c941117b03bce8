//! The application object: every user action the UI can trigger.

use std::cell::RefCell;

use log::{info, warn};

use crate::{
    api::{PollApi, ReqwestTransport, Transport},
    config::ClientConfig,
    export,
    poll::{filter_polls, sort_polls, PollDraft, SearchTicket, SortKey},
    storage::{BrowserStore, IdentityStore, KeyValueStore, StorageKind},
    Credentials, Poll, Result, ValidationError,
};

/// A poll together with this browser's voting state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PollDetail {
    pub poll: Poll,
    pub has_voted: bool,
}

/// Owns the API client, the identity store and the admin credentials.
///
/// Built once at startup; the UI only ever talks to the service through it.
pub struct PollApp<T, D, S> {
    api: PollApi<T>,
    identity: IdentityStore<D, S>,
    credentials: RefCell<Option<Credentials>>,
    config: ClientConfig,
}

pub type BrowserApp = PollApp<ReqwestTransport, BrowserStore, BrowserStore>;

impl BrowserApp {
    pub fn browser() -> Self {
        let config = ClientConfig::from_location();
        let identity = IdentityStore::new(
            BrowserStore::new(StorageKind::Local),
            BrowserStore::new(StorageKind::Session),
        );
        let transport = ReqwestTransport::new(config.api_base.clone());
        Self::new(transport, identity, config)
    }
}

impl<T: Transport, D: KeyValueStore, S: KeyValueStore> PollApp<T, D, S> {
    pub fn new(transport: T, identity: IdentityStore<D, S>, config: ClientConfig) -> Self {
        let user_id = identity.get_or_create_user_id();
        Self {
            api: PollApi::new(transport, user_id),
            identity,
            credentials: RefCell::new(None),
            config,
        }
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    pub fn has_voted(&self, poll_id: &str) -> bool {
        self.identity.has_voted(poll_id)
    }

    /// Fetches the whole list and returns it in `sort` order.
    pub async fn polls(&self, sort: SortKey) -> Result<Vec<Poll>> {
        let polls = self.api.list_polls().await?;
        Ok(sort_polls(&polls, sort))
    }

    /// Like [`Self::polls`] filtered by the ticket's term. The ticket is
    /// handed back so the caller can drop results for a stale input.
    pub async fn search(
        &self,
        ticket: SearchTicket,
        sort: SortKey,
    ) -> (SearchTicket, Result<Vec<Poll>>) {
        let result = self
            .api
            .list_polls()
            .await
            .map(|polls| sort_polls(&filter_polls(polls, ticket.term()), sort));
        (ticket, result)
    }

    pub async fn poll_detail(&self, poll_id: &str) -> Result<PollDetail> {
        let poll = self.api.get_poll(poll_id).await?;
        let has_voted = self.identity.has_voted(&poll.id);
        Ok(PollDetail { poll, has_voted })
    }

    /// Votes for `selected` on `poll` and returns the refreshed poll.
    ///
    /// Already-voted polls and missing or out-of-range selections are
    /// rejected without a request. Once the vote is recorded the call
    /// succeeds; `None` means the refreshed poll could not be fetched and the
    /// caller has to reload it.
    pub async fn vote(
        &self,
        poll: &Poll,
        selected: Option<usize>,
    ) -> Result<Option<PollDetail>> {
        if self.identity.has_voted(&poll.id) {
            return Err(ValidationError::AlreadyVoted.into());
        }
        let index = selected.ok_or(ValidationError::NoOptionSelected)?;
        if index >= poll.options.len() {
            return Err(ValidationError::InvalidOption {
                index,
                len: poll.options.len(),
            }
            .into());
        }

        self.api.vote(&poll.id, index).await?;
        self.identity.mark_voted(&poll.id);
        info!("Recorded vote on poll {}", poll.id);

        match self.poll_detail(&poll.id).await {
            Ok(detail) => Ok(Some(detail)),
            Err(e) => {
                warn!("Vote on {} recorded but refresh failed: {e}", poll.id);
                Ok(None)
            }
        }
    }

    pub async fn login(&self, username: &str, password: &str) -> Result<()> {
        let (username, password) = (username.trim(), password.trim());
        if username.is_empty() || password.is_empty() {
            return Err(ValidationError::MissingCredentials.into());
        }

        self.api.admin_login(username, password).await?;
        self.identity.set_admin_session(true);
        *self.credentials.borrow_mut() = Some(Credentials {
            username: username.to_string(),
            password: password.to_string(),
        });
        info!("Admin session started for {username}");
        Ok(())
    }

    pub fn logout(&self) {
        self.identity.set_admin_session(false);
        self.credentials.borrow_mut().take();
    }

    pub fn is_admin(&self) -> bool {
        self.identity.is_admin_session()
    }

    /// Creating requires an admin session with credentials from this page
    /// load; a flag left over from before a reload is not enough.
    pub async fn create_poll(&self, draft: &PollDraft) -> Result<Poll> {
        let new_poll = draft.validate()?;
        let credentials = self
            .credentials
            .borrow()
            .clone()
            .filter(|_| self.identity.is_admin_session())
            .ok_or(ValidationError::MissingCredentials)?;

        let created = self.api.create_poll(&new_poll, &credentials).await?;
        info!("Created poll {}", created.id);
        Ok(created)
    }

    pub async fn delete_poll(&self, poll_id: &str) -> Result<Option<String>> {
        let message = self.api.delete_poll(poll_id).await?;
        info!("Deleted poll {poll_id}");
        Ok(message)
    }

    /// CSV for every poll, `None` when there are none.
    pub async fn export_csv(&self) -> Result<Option<String>> {
        let polls = self.api.list_polls().await?;
        let csv = export::polls_to_csv(&polls);
        if csv.is_none() {
            warn!("Export requested with no polls");
        }
        Ok(csv)
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::{
        api::testing::ScriptedTransport,
        router::Route,
        storage::MemoryStore,
        Error,
    };

    type TestApp = PollApp<ScriptedTransport, MemoryStore, MemoryStore>;

    fn app() -> (TestApp, ScriptedTransport, MemoryStore) {
        let transport = ScriptedTransport::default();
        let durable = MemoryStore::default();
        let identity = IdentityStore::new(durable.clone(), MemoryStore::default());
        (
            PollApp::new(transport.clone(), identity, ClientConfig::default()),
            transport,
            durable,
        )
    }

    fn poll_json(votes: [u64; 2]) -> serde_json::Value {
        json!({
            "id": "p1",
            "question": "Tea or coffee?",
            "options": ["Tea", "Coffee"],
            "votes": votes,
            "total_votes": votes[0] + votes[1],
            "created_at": "2024-05-01T12:00:00"
        })
    }

    fn poll() -> Poll {
        serde_json::from_value(poll_json([0, 0])).unwrap()
    }

    fn filled_draft() -> PollDraft {
        let mut draft = PollDraft::default();
        draft.question = "Lunch?".into();
        draft.set_option(0, "Pizza".into());
        draft.set_option(1, "Salad".into());
        draft
    }

    #[tokio::test]
    async fn vote_marks_poll_and_refreshes() {
        let (app, transport, durable) = app();
        transport
            .reply(200, json!({"success": true, "message": "Vote recorded successfully"}))
            .reply(200, poll_json([0, 1]));

        assert!(!app.has_voted("p1"));
        let detail = app.vote(&poll(), Some(1)).await.unwrap().unwrap();
        assert!(detail.has_voted);
        assert_eq!(detail.poll.votes, vec![0, 1]);
        assert!(app.has_voted("p1"));
        assert_eq!(transport.request_count(), 2);

        // a fresh page over the same storage still remembers the vote
        let reloaded: TestApp = PollApp::new(
            ScriptedTransport::default(),
            IdentityStore::new(durable, MemoryStore::default()),
            ClientConfig::default(),
        );
        assert!(reloaded.has_voted("p1"));
    }

    #[tokio::test]
    async fn recorded_vote_survives_failed_refresh() {
        let (app, transport, _) = app();
        transport
            .reply(200, json!({"success": true}))
            .fail(Error::NetworkUnavailable);

        assert_eq!(app.vote(&poll(), Some(0)).await, Ok(None));
        assert!(app.has_voted("p1"));
        assert_eq!(transport.request_count(), 2);
    }

    #[tokio::test]
    async fn second_vote_never_hits_the_network() {
        let (app, transport, _) = app();
        transport
            .reply(200, json!({"success": true}))
            .reply(200, poll_json([1, 0]));
        app.vote(&poll(), Some(0)).await.unwrap();
        let sent = transport.request_count();

        assert_eq!(
            app.vote(&poll(), Some(1)).await,
            Err(Error::Validation(ValidationError::AlreadyVoted))
        );
        assert_eq!(transport.request_count(), sent);
    }

    #[tokio::test]
    async fn vote_requires_a_valid_selection() {
        let (app, transport, _) = app();
        assert_eq!(
            app.vote(&poll(), None).await,
            Err(Error::Validation(ValidationError::NoOptionSelected))
        );
        assert_eq!(
            app.vote(&poll(), Some(2)).await,
            Err(Error::Validation(ValidationError::InvalidOption { index: 2, len: 2 }))
        );
        assert_eq!(transport.request_count(), 0);
    }

    #[tokio::test]
    async fn failed_vote_is_not_remembered() {
        let (app, transport, _) = app();
        transport.reply(400, json!({"error": "You have already voted on this poll"}));
        assert!(app.vote(&poll(), Some(0)).await.is_err());
        assert!(!app.has_voted("p1"));
    }

    #[tokio::test]
    async fn invalid_drafts_are_rejected_locally() {
        let (app, transport, _) = app();
        transport.reply(200, json!({"success": true}));
        app.login("admin", "admin").await.unwrap();
        let sent = transport.request_count();

        let mut draft = filled_draft();
        draft.question = "  ".into();
        assert_eq!(
            app.create_poll(&draft).await,
            Err(Error::Validation(ValidationError::EmptyQuestion))
        );

        let mut draft = filled_draft();
        draft.set_option(1, String::new());
        assert_eq!(
            app.create_poll(&draft).await,
            Err(Error::Validation(ValidationError::OptionCount(1)))
        );
        assert_eq!(transport.request_count(), sent);
    }

    #[tokio::test]
    async fn create_needs_login() {
        let (app, transport, _) = app();
        assert_eq!(
            app.create_poll(&filled_draft()).await,
            Err(Error::Validation(ValidationError::MissingCredentials))
        );
        assert_eq!(transport.request_count(), 0);

        transport
            .reply(200, json!({"success": true, "message": "Login successful"}))
            .reply(
                200,
                json!({"id": "p2", "question": "Lunch?", "options": ["Pizza", "Salad"],
                       "created_at": "2024-05-02T09:00:00", "success": true}),
            );
        app.login(" admin ", "admin").await.unwrap();
        assert!(app.is_admin());

        let created = app.create_poll(&filled_draft()).await.unwrap();
        assert_eq!(created.id, "p2");
        assert_eq!(
            transport.last().basic_auth,
            Some(Credentials {
                username: "admin".into(),
                password: "admin".into()
            })
        );

        app.logout();
        assert!(!app.is_admin());
        assert_eq!(
            app.create_poll(&filled_draft()).await,
            Err(Error::Validation(ValidationError::MissingCredentials))
        );
    }

    #[tokio::test]
    async fn login_validation_and_failure() {
        let (app, transport, _) = app();
        assert_eq!(
            app.login("admin", "   ").await,
            Err(Error::Validation(ValidationError::MissingCredentials))
        );
        assert_eq!(transport.request_count(), 0);

        transport.reply(200, json!({"success": false, "error": "Invalid credentials"}));
        assert_eq!(
            app.login("admin", "wrong").await,
            Err(Error::AuthFailed(Some("Invalid credentials".into())))
        );
        assert!(!app.is_admin());
    }

    #[tokio::test]
    async fn missing_poll_is_not_found() {
        let (app, transport, _) = app();
        transport
            .reply(404, json!({"error": "Poll not found"}))
            .reply(500, json!({"error": "boom"}));

        let Route::Detail(id) = Route::from_fragment("#/polls/p1") else {
            panic!("expected a detail route");
        };
        assert_eq!(app.poll_detail(&id).await, Err(Error::NotFound));
        assert!(matches!(
            app.poll_detail(&id).await,
            Err(Error::RequestFailed { status: 500, .. })
        ));
    }

    #[tokio::test]
    async fn export_outcomes() {
        let (app, transport, _) = app();
        transport.reply(200, json!([])).reply(
            200,
            json!([{"id": "p1", "question": "Say \"hi\"?", "options": ["A", "B"],
                    "total_votes": 2, "created_at": "2024-05-01T12:00:00"}]),
        );

        assert_eq!(app.export_csv().await, Ok(None));

        let csv = app.export_csv().await.unwrap().unwrap();
        assert!(csv.contains(r#""Say ""hi""?""#));
    }

    #[tokio::test]
    async fn search_filters_and_returns_ticket() {
        let (app, transport, _) = app();
        transport.reply(
            200,
            json!([
                {"id": "a", "question": "Cats?", "options": ["Yes", "No"], "total_votes": 1,
                 "created_at": "2024-05-01T12:00:00"},
                {"id": "b", "question": "Dogs?", "options": ["Good", "Very good"], "total_votes": 3,
                 "created_at": "2024-05-02T12:00:00"},
            ]),
        );

        let (ticket, result) = app
            .search(SearchTicket::new("GOOD"), SortKey::Newest)
            .await;
        assert_eq!(ticket.term(), "GOOD");
        let polls = result.unwrap();
        assert_eq!(polls.len(), 1);
        assert_eq!(polls[0].id, "b");
    }

    #[tokio::test]
    async fn list_is_sorted() {
        let (app, transport, _) = app();
        transport.reply(
            200,
            json!([
                {"id": "a", "question": "A?", "options": ["1", "2"], "total_votes": 1,
                 "created_at": "2024-05-01T12:00:00"},
                {"id": "b", "question": "B?", "options": ["1", "2"], "total_votes": 3,
                 "created_at": "2024-05-02T12:00:00"},
            ]),
        );
        let polls = app.polls(SortKey::MostVotes).await.unwrap();
        assert_eq!(polls[0].id, "b");
    }

    #[tokio::test]
    async fn delete_reports_failures() {
        let (app, transport, _) = app();
        transport
            .reply(200, json!({"success": true, "message": "Poll deleted successfully"}))
            .fail(Error::NetworkUnavailable);

        assert!(app.delete_poll("p1").await.is_ok());
        assert_eq!(app.delete_poll("p1").await, Err(Error::NetworkUnavailable));
    }
}
