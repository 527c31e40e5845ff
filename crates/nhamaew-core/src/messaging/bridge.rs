use std::collections::BTreeSet;
use std::fmt;
use std::sync::Arc;

use futures::future::BoxFuture;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, warn};

use super::share::ShareMessage;
use crate::models::LineProfile;

/// Platform features a host may or may not provide.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Capability {
    Profile,
    ShareTargetPicker,
    SendMessages,
    OpenWindow,
    CloseWindow,
    Friendship,
    AccessToken,
    IdToken,
}

impl Capability {
    pub const ALL: [Capability; 8] = [
        Capability::Profile,
        Capability::ShareTargetPicker,
        Capability::SendMessages,
        Capability::OpenWindow,
        Capability::CloseWindow,
        Capability::Friendship,
        Capability::AccessToken,
        Capability::IdToken,
    ];

    /// Name of the API as the LIFF SDK reports it.
    pub fn api_name(&self) -> &'static str {
        match self {
            Capability::Profile => "getProfile",
            Capability::ShareTargetPicker => "shareTargetPicker",
            Capability::SendMessages => "sendMessages",
            Capability::OpenWindow => "openWindow",
            Capability::CloseWindow => "closeWindow",
            Capability::Friendship => "getFriendship",
            Capability::AccessToken => "getAccessToken",
            Capability::IdToken => "getIDToken",
        }
    }

    pub fn from_api_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|c| c.api_name() == name)
    }
}

impl fmt::Display for Capability {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.api_name())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Friendship {
    pub friend_flag: bool,
}

#[derive(Error, Debug)]
pub enum BridgeError {
    #[error("Messaging platform is not available")]
    Unavailable,

    #[error("Messaging platform does not support {0}")]
    Unsupported(Capability),

    #[error("Not signed in to the messaging platform")]
    NotSignedIn,

    #[error(transparent)]
    Platform(#[from] anyhow::Error),
}

/// Operations of the host messaging platform. Every call is fallible and
/// async, even ones the LIFF SDK exposes synchronously.
pub trait MessagingPlatform: Send + Sync {
    /// Capabilities this host provides. Read once by `Bridge::init`.
    fn capabilities(&self) -> Vec<Capability>;

    fn get_profile(&self) -> BoxFuture<'_, Result<LineProfile, BridgeError>>;

    /// Let the user pick chats to share into. `Ok(false)` when the picker
    /// was dismissed.
    fn share_target_picker(&self, messages: Vec<ShareMessage>) -> BoxFuture<'_, Result<bool, BridgeError>>;

    /// Send into the chat the storefront was opened from.
    fn send_messages(&self, messages: Vec<ShareMessage>) -> BoxFuture<'_, Result<(), BridgeError>>;

    fn open_window(&self, url: String, external: bool) -> BoxFuture<'_, Result<(), BridgeError>>;

    fn close_window(&self) -> BoxFuture<'_, Result<(), BridgeError>>;

    fn get_friendship(&self) -> BoxFuture<'_, Result<Friendship, BridgeError>>;

    fn access_token(&self) -> BoxFuture<'_, Result<Option<String>, BridgeError>>;

    fn id_token(&self) -> BoxFuture<'_, Result<Option<String>, BridgeError>>;
}

/// The messaging platform as seen by the storefront: either a host with a
/// fixed capability set, or nothing at all (e.g. an external browser).
#[derive(Clone)]
pub enum Bridge {
    Available {
        platform: Arc<dyn MessagingPlatform>,
        capabilities: BTreeSet<Capability>,
    },
    Unavailable,
}

impl fmt::Debug for Bridge {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Bridge::Available { capabilities, .. } => f
                .debug_struct("Available")
                .field("capabilities", capabilities)
                .finish_non_exhaustive(),
            Bridge::Unavailable => f.write_str("Unavailable"),
        }
    }
}

impl Bridge {
    /// Resolve the capability set of `platform`. No platform gives
    /// `Bridge::Unavailable`.
    pub fn init(platform: Option<Arc<dyn MessagingPlatform>>) -> Self {
        match platform {
            Some(platform) => {
                let capabilities: BTreeSet<Capability> = platform.capabilities().into_iter().collect();
                debug!(?capabilities, "Messaging bridge initialized");
                Bridge::Available { platform, capabilities }
            }
            None => {
                debug!("No messaging platform, bridge unavailable");
                Bridge::Unavailable
            }
        }
    }

    pub fn is_available(&self) -> bool {
        matches!(self, Bridge::Available { .. })
    }

    pub fn supports(&self, capability: Capability) -> bool {
        match self {
            Bridge::Available { capabilities, .. } => capabilities.contains(&capability),
            Bridge::Unavailable => false,
        }
    }

    /// Whether the share button should be offered at all.
    pub fn can_share(&self) -> bool {
        self.supports(Capability::ShareTargetPicker)
    }

    fn platform_for(&self, capability: Capability) -> Result<&dyn MessagingPlatform, BridgeError> {
        match self {
            Bridge::Available { platform, capabilities } if capabilities.contains(&capability) => {
                Ok(platform.as_ref())
            }
            Bridge::Available { .. } => {
                warn!(%capability, "Messaging capability not supported");
                Err(BridgeError::Unsupported(capability))
            }
            Bridge::Unavailable => Err(BridgeError::Unavailable),
        }
    }

    pub async fn get_profile(&self) -> Result<LineProfile, BridgeError> {
        self.platform_for(Capability::Profile)?.get_profile().await
    }

    pub async fn share_target_picker(&self, messages: Vec<ShareMessage>) -> Result<bool, BridgeError> {
        self.platform_for(Capability::ShareTargetPicker)?
            .share_target_picker(messages)
            .await
    }

    pub async fn send_messages(&self, messages: Vec<ShareMessage>) -> Result<(), BridgeError> {
        self.platform_for(Capability::SendMessages)?
            .send_messages(messages)
            .await
    }

    pub async fn open_window(&self, url: &str, external: bool) -> Result<(), BridgeError> {
        self.platform_for(Capability::OpenWindow)?
            .open_window(url.to_string(), external)
            .await
    }

    pub async fn close_window(&self) -> Result<(), BridgeError> {
        self.platform_for(Capability::CloseWindow)?.close_window().await
    }

    pub async fn get_friendship(&self) -> Result<Friendship, BridgeError> {
        self.platform_for(Capability::Friendship)?.get_friendship().await
    }

    pub async fn access_token(&self) -> Result<Option<String>, BridgeError> {
        self.platform_for(Capability::AccessToken)?.access_token().await
    }

    pub async fn id_token(&self) -> Result<Option<String>, BridgeError> {
        self.platform_for(Capability::IdToken)?.id_token().await
    }
}
