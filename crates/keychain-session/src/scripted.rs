//! Scripted auth session backend (for testing and headless hosts).

use std::collections::VecDeque;
use std::sync::{Mutex, PoisonError};

use async_trait::async_trait;
use url::Url;

use crate::{AuthSessionBackend, OpenOptions};
use keychain_types::{KeychainError, Result, SessionResult};

/// Outcome replayed for the next opened session.
#[derive(Debug, Clone)]
pub enum ScriptedReply {
    /// Redirect to the callback URI with these query params appended.
    Success(Vec<(String, String)>),
    /// Redirect to this exact URL, ignoring the callback URI.
    Redirect(String),
    Cancel,
    Dismiss,
    /// The backend fails to start a session.
    Fail(String),
}

impl ScriptedReply {
    /// Success reply carrying `params` on the callback.
    pub fn success<'a>(params: impl IntoIterator<Item = (&'a str, &'a str)>) -> Self {
        Self::Success(
            params
                .into_iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect(),
        )
    }
}

/// A session the backend was asked to open.
#[derive(Debug, Clone)]
pub struct OpenedSession {
    pub url: String,
    pub callback_uri: String,
    pub options: OpenOptions,
}

/// Backend replaying queued replies in order. An empty queue answers
/// `Dismiss`, as if the user closed the sheet.
#[derive(Default)]
pub struct ScriptedBackend {
    replies: Mutex<VecDeque<ScriptedReply>>,
    opened: Mutex<Vec<OpenedSession>>,
}

impl ScriptedBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue the outcome of the next opened session.
    pub fn push(&self, reply: ScriptedReply) {
        self.replies
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push_back(reply);
    }

    /// Every session opened so far, oldest first.
    pub fn opened(&self) -> Vec<OpenedSession> {
        self.opened
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Replies not consumed yet.
    pub fn pending(&self) -> usize {
        self.replies
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }
}

#[async_trait]
impl AuthSessionBackend for ScriptedBackend {
    async fn open_auth_session(
        &self,
        url: &Url,
        callback_uri: &str,
        options: OpenOptions,
    ) -> Result<SessionResult> {
        self.opened
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(OpenedSession {
                url: url.to_string(),
                callback_uri: callback_uri.to_string(),
                options,
            });

        let reply = self
            .replies
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .pop_front();

        match reply {
            Some(ScriptedReply::Success(params)) => {
                let mut redirect = Url::parse(callback_uri)
                    .map_err(|e| KeychainError::InvalidUrl(e.to_string()))?;
                if !params.is_empty() {
                    redirect.query_pairs_mut().extend_pairs(params);
                }
                Ok(SessionResult::Success { url: redirect.into() })
            }
            Some(ScriptedReply::Redirect(url)) => Ok(SessionResult::Success { url }),
            Some(ScriptedReply::Cancel) => Ok(SessionResult::Cancel),
            Some(ScriptedReply::Dismiss) | None => Ok(SessionResult::Dismiss),
            Some(ScriptedReply::Fail(reason)) => Err(KeychainError::Session(reason)),
        }
    }
}
