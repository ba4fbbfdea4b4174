//! Who is signed in, and notification when that changes.

use async_trait::async_trait;
use tokio::sync::watch;

use crate::remote::RemoteError;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Session {
    pub user_id: String,
    pub access_token: Option<String>,
}

#[async_trait]
pub trait SessionProvider: Send + Sync {
    fn current_session(&self) -> Option<Session>;

    fn subscribe(&self) -> watch::Receiver<Option<Session>>;

    async fn sign_out(&self) -> Result<(), RemoteError>;
}

/// Session state held in process: from the environment, or set by callers.
#[derive(Debug)]
pub struct StaticSessionProvider {
    tx: watch::Sender<Option<Session>>,
}

impl StaticSessionProvider {
    pub fn new(session: Option<Session>) -> Self {
        let (tx, _rx) = watch::channel(session);
        Self { tx }
    }

    pub fn from_env() -> Self {
        let session = std::env::var("NLGD_USER_ID")
            .ok()
            .filter(|v| !v.trim().is_empty())
            .map(|user_id| Session {
                user_id,
                access_token: std::env::var("NLGD_ACCESS_TOKEN").ok(),
            });
        Self::new(session)
    }

    pub fn sign_in(&self, session: Session) {
        self.tx.send_replace(Some(session));
    }
}

#[async_trait]
impl SessionProvider for StaticSessionProvider {
    fn current_session(&self) -> Option<Session> {
        self.tx.borrow().clone()
    }

    fn subscribe(&self) -> watch::Receiver<Option<Session>> {
        self.tx.subscribe()
    }

    async fn sign_out(&self) -> Result<(), RemoteError> {
        self.tx.send_replace(None);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn subscribers_see_sign_in_and_sign_out() {
        let provider = StaticSessionProvider::new(None);
        let mut rx = provider.subscribe();
        provider.sign_in(Session {
            user_id: "u1".into(),
            access_token: None,
        });
        rx.changed().await.expect("sender alive");
        assert_eq!(
            rx.borrow_and_update().as_ref().map(|s| s.user_id.as_str()),
            Some("u1")
        );

        provider.sign_out().await.expect("sign out");
        rx.changed().await.expect("sender alive");
        assert!(rx.borrow().is_none());
        assert!(provider.current_session().is_none());
    }
}
