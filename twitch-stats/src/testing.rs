//! In-memory Helix fake shared by unit tests.

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicBool, AtomicU32, AtomicUsize, Ordering};

use async_trait::async_trait;
use chrono::{DateTime, TimeZone, Utc};
use helix_client::{
    AppToken, HelixApi, HelixError, MAX_BATCH_SIZE, StreamRecord, StreamsPage, UserRecord,
};
use parking_lot::Mutex;

pub(crate) fn user_id(login: &str) -> String {
    format!("{login}-id")
}

pub(crate) fn started_at() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 1, 1, 18, 0, 0).unwrap()
}

/// Fake platform: every login in `users` exists with id `<login>-id` and
/// display name `<LOGIN>`.
pub(crate) struct FakeHelix {
    users: Vec<UserRecord>,
    live: Mutex<HashMap<String, u64>>,
    followers: Mutex<HashMap<String, u64>>,
    failing_followers: Mutex<HashSet<String>>,
    failing_user_logins: Mutex<HashSet<String>>,
    failing_stream_logins: Mutex<HashSet<String>>,
    quota: AtomicU32,
    token_lifetime: u64,
    fail_token: AtomicBool,
    fail_streams: AtomicBool,
    unauthorized: AtomicBool,
    users_unauthorized: AtomicBool,
    token_requests: AtomicUsize,
    stream_calls: AtomicUsize,
    user_calls: AtomicUsize,
    follower_calls: Mutex<Vec<String>>,
}

impl FakeHelix {
    pub fn new(logins: &[&str]) -> Self {
        let users = logins
            .iter()
            .map(|login| UserRecord {
                id: user_id(login),
                login: login.to_string(),
                display_name: login.to_uppercase(),
                view_count: 100,
            })
            .collect();

        Self {
            users,
            live: Mutex::new(HashMap::new()),
            followers: Mutex::new(HashMap::new()),
            failing_followers: Mutex::new(HashSet::new()),
            failing_user_logins: Mutex::new(HashSet::new()),
            failing_stream_logins: Mutex::new(HashSet::new()),
            quota: AtomicU32::new(800),
            token_lifetime: 3600,
            fail_token: AtomicBool::new(false),
            fail_streams: AtomicBool::new(false),
            unauthorized: AtomicBool::new(false),
            users_unauthorized: AtomicBool::new(false),
            token_requests: AtomicUsize::new(0),
            stream_calls: AtomicUsize::new(0),
            user_calls: AtomicUsize::new(0),
            follower_calls: Mutex::new(Vec::new()),
        }
    }

    pub fn with_token_lifetime(mut self, secs: u64) -> Self {
        self.token_lifetime = secs;
        self
    }

    pub fn set_live(&self, login: &str, viewers: u64) {
        self.live.lock().insert(login.to_string(), viewers);
    }

    pub fn set_offline(&self, login: &str) {
        self.live.lock().remove(login);
    }

    pub fn set_quota(&self, quota: u32) {
        self.quota.store(quota, Ordering::SeqCst);
    }

    pub fn set_followers(&self, login: &str, total: u64) {
        self.followers.lock().insert(user_id(login), total);
    }

    pub fn fail_followers_for(&self, login: &str) {
        self.failing_followers.lock().insert(user_id(login));
    }

    pub fn fail_users_containing(&self, login: &str) {
        self.failing_user_logins.lock().insert(login.to_string());
    }

    /// Fail only the streams requests whose batch includes `login`.
    pub fn fail_streams_containing(&self, login: &str) {
        self.failing_stream_logins.lock().insert(login.to_string());
    }

    pub fn set_token_failure(&self, fail: bool) {
        self.fail_token.store(fail, Ordering::SeqCst);
    }

    pub fn set_streams_failure(&self, fail: bool) {
        self.fail_streams.store(fail, Ordering::SeqCst);
    }

    pub fn set_unauthorized(&self, value: bool) {
        self.unauthorized.store(value, Ordering::SeqCst);
    }

    /// Reject the credential on the users endpoint only.
    pub fn set_users_unauthorized(&self, value: bool) {
        self.users_unauthorized.store(value, Ordering::SeqCst);
    }

    pub fn token_requests(&self) -> usize {
        self.token_requests.load(Ordering::SeqCst)
    }

    pub fn stream_calls(&self) -> usize {
        self.stream_calls.load(Ordering::SeqCst)
    }

    pub fn user_calls(&self) -> usize {
        self.user_calls.load(Ordering::SeqCst)
    }

    /// User ids passed to the follower endpoint, in call order.
    pub fn follower_calls(&self) -> Vec<String> {
        self.follower_calls.lock().clone()
    }

    fn check_auth(&self) -> Result<(), HelixError> {
        if self.unauthorized.load(Ordering::SeqCst) {
            return Err(HelixError::Unauthorized("invalid oauth token".to_string()));
        }
        Ok(())
    }

    fn check_batch(ids: &[String]) -> Result<(), HelixError> {
        if ids.len() > MAX_BATCH_SIZE {
            return Err(HelixError::BatchTooLarge {
                len: ids.len(),
                max: MAX_BATCH_SIZE,
            });
        }
        Ok(())
    }
}

#[async_trait]
impl HelixApi for FakeHelix {
    async fn request_app_token(&self) -> Result<AppToken, HelixError> {
        let n = self.token_requests.fetch_add(1, Ordering::SeqCst) + 1;
        if self.fail_token.load(Ordering::SeqCst) {
            return Err(HelixError::Status {
                status: 503,
                body: "unavailable".to_string(),
            });
        }
        Ok(AppToken {
            access_token: format!("token-{n}"),
            expires_in: self.token_lifetime,
            token_type: "bearer".to_string(),
        })
    }

    async fn fetch_streams(
        &self,
        _token: &str,
        logins: &[String],
    ) -> Result<StreamsPage, HelixError> {
        Self::check_batch(logins)?;
        self.check_auth()?;
        self.stream_calls.fetch_add(1, Ordering::SeqCst);
        let batch_fails = {
            let failing = self.failing_stream_logins.lock();
            logins.iter().any(|login| failing.contains(login))
        };
        if batch_fails || self.fail_streams.load(Ordering::SeqCst) {
            return Err(HelixError::Status {
                status: 500,
                body: "internal".to_string(),
            });
        }

        let live = self.live.lock();
        let streams = logins
            .iter()
            .filter_map(|login| {
                live.get(login).map(|viewers| StreamRecord {
                    id: format!("stream-{login}"),
                    user_id: user_id(login),
                    user_login: login.clone(),
                    user_name: login.to_uppercase(),
                    game_name: "Just Chatting".to_string(),
                    title: format!("{login} live"),
                    viewer_count: *viewers,
                    started_at: started_at(),
                })
            })
            .collect();

        Ok(StreamsPage {
            streams,
            remaining_quota: self.quota.load(Ordering::SeqCst),
        })
    }

    async fn fetch_users(
        &self,
        _token: &str,
        logins: &[String],
    ) -> Result<Vec<UserRecord>, HelixError> {
        Self::check_batch(logins)?;
        self.check_auth()?;
        self.user_calls.fetch_add(1, Ordering::SeqCst);
        if self.users_unauthorized.load(Ordering::SeqCst) {
            return Err(HelixError::Unauthorized("invalid oauth token".to_string()));
        }
        {
            let failing = self.failing_user_logins.lock();
            if logins.iter().any(|login| failing.contains(login)) {
                return Err(HelixError::Status {
                    status: 502,
                    body: "bad gateway".to_string(),
                });
            }
        }

        Ok(self
            .users
            .iter()
            .filter(|user| logins.iter().any(|login| login.eq_ignore_ascii_case(&user.login)))
            .cloned()
            .collect())
    }

    async fn fetch_follower_count(&self, _token: &str, user_id: &str) -> Result<u64, HelixError> {
        self.check_auth()?;
        self.follower_calls.lock().push(user_id.to_string());
        if self.failing_followers.lock().contains(user_id) {
            return Err(HelixError::Status {
                status: 500,
                body: "internal".to_string(),
            });
        }
        Ok(self.followers.lock().get(user_id).copied().unwrap_or(0))
    }
}
