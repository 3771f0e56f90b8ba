//! OAuth device-code authorization and refresh-token exchange.

use crate::error::{ApiError, AuthError};
use crate::trakt::client::TraktClient;
use async_trait::async_trait;
use chrono::{DateTime, TimeZone, Utc};
use serde::Deserialize;
use std::time::Duration;
use tokio::time::{sleep, Instant};
use tracing::{debug, info};

const REDIRECT_URI: &str = "urn:ietf:wg:oauth:2.0:oob";
const DEFAULT_POLL_INTERVAL_SECS: u64 = 5;
const DEFAULT_DEVICE_EXPIRY_SECS: u64 = 600;
const SLOW_DOWN_INCREMENT: Duration = Duration::from_secs(5);

/// Codes returned by `POST /oauth/device/code`.
#[derive(Debug, Clone, Deserialize)]
pub struct DeviceCode {
    pub device_code: String,
    pub user_code: String,
    pub verification_url: String,
    #[serde(default)]
    pub expires_in: i64,
    #[serde(default)]
    pub interval: i64,
}

impl DeviceCode {
    pub fn poll_interval(&self) -> Duration {
        positive_secs(self.interval).unwrap_or(Duration::from_secs(DEFAULT_POLL_INTERVAL_SECS))
    }

    pub fn expires_after(&self) -> Duration {
        positive_secs(self.expires_in).unwrap_or(Duration::from_secs(DEFAULT_DEVICE_EXPIRY_SECS))
    }
}

fn positive_secs(secs: i64) -> Option<Duration> {
    u64::try_from(secs).ok().filter(|s| *s > 0).map(Duration::from_secs)
}

/// Tokens handed back to the caller for persistence.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TokenSet {
    pub access_token: String,
    pub refresh_token: String,
    pub expires_at: DateTime<Utc>,
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    refresh_token: String,
    expires_in: i64,
    #[serde(default)]
    created_at: Option<i64>,
}

impl TokenResponse {
    fn into_token_set(self, now: DateTime<Utc>) -> TokenSet {
        let issued_at = self
            .created_at
            .and_then(|ts| Utc.timestamp_opt(ts, 0).single())
            .unwrap_or(now);
        // an unrepresentable lifetime is treated as already expired
        let expires_at = chrono::Duration::try_seconds(self.expires_in)
            .and_then(|lifetime| issued_at.checked_add_signed(lifetime))
            .unwrap_or(issued_at);
        TokenSet {
            access_token: self.access_token,
            refresh_token: self.refresh_token,
            expires_at,
        }
    }
}

/// Result of one device-token poll.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PollOutcome {
    Authorized(TokenSet),
    Pending,
    SlowDown,
    Denied,
    Expired,
}

impl PollOutcome {
    /// Map a failed poll onto the device flow contract. Errors that are not
    /// part of it are handed back.
    pub fn from_error(err: ApiError) -> Result<Self, ApiError> {
        match err.code() {
            Some("authorization_pending") => return Ok(PollOutcome::Pending),
            Some("slow_down") => return Ok(PollOutcome::SlowDown),
            Some("access_denied") => return Ok(PollOutcome::Denied),
            Some("expired_token") => return Ok(PollOutcome::Expired),
            _ => {}
        }

        match err.status() {
            Some(400) if err.code().is_none() => Ok(PollOutcome::Pending),
            Some(429) => Ok(PollOutcome::SlowDown),
            Some(418) => Ok(PollOutcome::Denied),
            Some(410) => Ok(PollOutcome::Expired),
            _ => Err(err),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeviceFlowState {
    Polling { interval: Duration },
    Authorized(TokenSet),
    Denied,
    Expired,
    TimedOut,
}

/// Device authorization state machine. Time is passed in, so the
/// transitions can be checked without a clock.
#[derive(Debug, Clone)]
pub struct DeviceFlow {
    state: DeviceFlowState,
    expires_after: Duration,
}

impl DeviceFlow {
    pub fn new(interval: Duration, expires_after: Duration) -> Self {
        Self {
            state: DeviceFlowState::Polling { interval },
            expires_after,
        }
    }

    pub fn for_code(code: &DeviceCode) -> Self {
        Self::new(code.poll_interval(), code.expires_after())
    }

    pub fn state(&self) -> &DeviceFlowState {
        &self.state
    }

    /// Delay before the next poll, `None` once the flow has finished.
    pub fn next_delay(&self) -> Option<Duration> {
        match self.state {
            DeviceFlowState::Polling { interval } => Some(interval),
            _ => None,
        }
    }

    /// Move to `TimedOut` if still polling past the expiry window.
    pub fn expire_if_due(&mut self, elapsed: Duration) -> bool {
        if matches!(self.state, DeviceFlowState::Polling { .. }) && elapsed >= self.expires_after {
            self.state = DeviceFlowState::TimedOut;
            return true;
        }
        false
    }

    pub fn advance(&mut self, elapsed: Duration, outcome: PollOutcome) {
        let DeviceFlowState::Polling { interval } = self.state else {
            return;
        };

        self.state = match outcome {
            PollOutcome::Authorized(tokens) => DeviceFlowState::Authorized(tokens),
            PollOutcome::Denied => DeviceFlowState::Denied,
            PollOutcome::Expired => DeviceFlowState::Expired,
            PollOutcome::Pending => DeviceFlowState::Polling { interval },
            PollOutcome::SlowDown => DeviceFlowState::Polling {
                interval: interval + SLOW_DOWN_INCREMENT,
            },
        };
        self.expire_if_due(elapsed);
    }

    /// Terminal result. A flow still polling is reported as timed out.
    pub fn finish(self) -> Result<TokenSet, AuthError> {
        match self.state {
            DeviceFlowState::Authorized(tokens) => Ok(tokens),
            DeviceFlowState::Denied => Err(AuthError::Denied),
            DeviceFlowState::Expired => Err(AuthError::Expired),
            DeviceFlowState::TimedOut | DeviceFlowState::Polling { .. } => {
                Err(AuthError::TimedOut(self.expires_after))
            }
        }
    }
}

/// One attempt at exchanging a device code for tokens.
#[async_trait]
pub trait DevicePoller: Send + Sync {
    async fn poll_device_token(&self, device_code: &str) -> Result<PollOutcome, ApiError>;
}

/// Drive the device flow until it reaches a terminal state.
pub async fn poll_for_token<P>(poller: &P, code: &DeviceCode) -> Result<TokenSet, AuthError>
where
    P: DevicePoller + ?Sized,
{
    let started = Instant::now();
    let mut flow = DeviceFlow::for_code(code);

    while let Some(delay) = flow.next_delay() {
        sleep(delay).await;
        if flow.expire_if_due(started.elapsed()) {
            break;
        }

        let outcome = poller.poll_device_token(&code.device_code).await?;
        match &outcome {
            PollOutcome::Pending => debug!("Still waiting for user authorization"),
            PollOutcome::SlowDown => debug!(
                interval_secs = (delay + SLOW_DOWN_INCREMENT).as_secs(),
                "Slowing down device code polling"
            ),
            _ => {}
        }
        flow.advance(started.elapsed(), outcome);
    }

    flow.finish()
}

impl TraktClient {
    pub async fn request_device_code(&self) -> Result<DeviceCode, ApiError> {
        let payload = serde_json::json!({ "client_id": self.client_id() });
        self.post("/oauth/device/code", &payload).await?.json()
    }

    /// Run the full device flow and start using the new tokens.
    pub async fn authorize_device(&self, code: &DeviceCode) -> Result<TokenSet, AuthError> {
        let tokens = poll_for_token(self, code).await?;
        self.set_tokens(tokens.access_token.clone(), tokens.refresh_token.clone());
        info!("Authorized with Trakt");
        Ok(tokens)
    }

    /// Exchange the refresh token for a new pair. The client switches to the
    /// new access token and returns the set for the caller to persist.
    pub async fn refresh_access_token(&self) -> Result<TokenSet, AuthError> {
        let refresh_token = self
            .refresh_token()
            .filter(|token| !token.is_empty())
            .ok_or(AuthError::NoRefreshToken)?;

        let payload = serde_json::json!({
            "refresh_token": refresh_token,
            "client_id": self.client_id(),
            "client_secret": self.client_secret(),
            "redirect_uri": REDIRECT_URI,
            "grant_type": "refresh_token"
        });

        let response: TokenResponse = self.post("/oauth/token", &payload).await?.json()?;
        let tokens = response.into_token_set(Utc::now());
        self.set_tokens(tokens.access_token.clone(), tokens.refresh_token.clone());

        info!(expires_at = %tokens.expires_at, "Access token refreshed");
        Ok(tokens)
    }
}

#[async_trait]
impl DevicePoller for TraktClient {
    async fn poll_device_token(&self, device_code: &str) -> Result<PollOutcome, ApiError> {
        let payload = serde_json::json!({
            "code": device_code,
            "client_id": self.client_id(),
            "client_secret": self.client_secret(),
        });

        match self.post_once("/oauth/device/token", &payload).await {
            Ok(response) => {
                let tokens: TokenResponse = response.json()?;
                Ok(PollOutcome::Authorized(tokens.into_token_set(Utc::now())))
            }
            Err(e) => PollOutcome::from_error(e),
        }
    }
}
