//! Payment-provider webhook events.
//!
//! The provider signs each delivery with HMAC-SHA256 over the raw body and
//! sends the lowercase hex digest in [`SIGNATURE_HEADER`]. Only events that
//! change a user's subscription state are acted on; everything else is
//! acknowledged and ignored.

use std::collections::HashMap;

use hmac::{Hmac, Mac};
use serde::Deserialize;
use sha2::Sha256;

use crate::types::UserId;

type HmacSha256 = Hmac<Sha256>;

/// Request header carrying the hex-encoded body signature.
pub const SIGNATURE_HEADER: &str = "x-signature";

#[derive(Debug, thiserror::Error)]
pub enum WebhookError {
    #[error("Invalid webhook payload: {0}")]
    Payload(#[from] serde_json::Error),

    #[error("Webhook event carries no user_id")]
    MissingUserId,

    #[error("Webhook user_id is not a valid id: {0}")]
    InvalidUserId(String),

    #[error("Webhook event carries no subscription status")]
    MissingStatus,
}

/// Hex-encoded HMAC-SHA256 of `payload` under `secret`.
pub fn compute_signature(secret: &[u8], payload: &[u8]) -> String {
    let mut mac = HmacSha256::new_from_slice(secret).expect("HMAC accepts any key length");
    mac.update(payload);
    hex::encode(&mac.finalize().into_bytes())
}

/// Check a delivery signature in constant time.
///
/// Signatures that are not valid hex are rejected without computing a MAC.
pub fn verify_signature(secret: &[u8], payload: &[u8], signature: &str) -> bool {
    let Some(expected) = hex::decode(signature.trim()) else {
        return false;
    };
    let mut mac = HmacSha256::new_from_slice(secret).expect("HMAC accepts any key length");
    mac.update(payload);
    mac.verify_slice(&expected).is_ok()
}

/// Event names the provider sends. Unrecognized names deserialize to
/// [`EventName::Other`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventName {
    OrderCreated,
    OrderRefunded,
    SubscriptionCreated,
    SubscriptionUpdated,
    SubscriptionPaymentSuccess,
    SubscriptionPaymentRecovered,
    SubscriptionPlanChanged,
    SubscriptionPaused,
    SubscriptionCancelled,
    SubscriptionExpired,
    SubscriptionUnpaused,
    SubscriptionResumed,
    SubscriptionPaymentFailed,
    SubscriptionPaymentRefunded,
    #[serde(other)]
    Other,
}

impl EventName {
    /// Status the event implies regardless of the attributes it carries.
    fn forced_status(self) -> Option<&'static str> {
        match self {
            EventName::SubscriptionUnpaused | EventName::SubscriptionResumed => Some("active"),
            EventName::SubscriptionPaymentFailed => Some("failed"),
            EventName::SubscriptionPaymentRefunded => Some("refunded"),
            EventName::SubscriptionPaused => Some("paused"),
            _ => None,
        }
    }

    fn is_subscription(self) -> bool {
        !matches!(
            self,
            EventName::OrderCreated | EventName::OrderRefunded | EventName::Other
        )
    }
}

/// A webhook delivery body.
#[derive(Debug, Deserialize)]
pub struct PaymentEvent {
    pub meta: EventMeta,
    #[serde(default)]
    pub data: EventData,
}

#[derive(Debug, Deserialize)]
pub struct EventMeta {
    pub event_name: EventName,
    /// Checkout passthrough data. `user_id` is set when the checkout was
    /// started by a signed-in user.
    #[serde(default)]
    pub custom_data: HashMap<String, serde_json::Value>,
}

#[derive(Debug, Default, Deserialize)]
pub struct EventData {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub attributes: EventAttributes,
}

/// The subset of subscription and order attributes this service reads.
#[derive(Debug, Default, Deserialize)]
pub struct EventAttributes {
    pub status: Option<String>,
    pub product_id: Option<i64>,
    pub variant_id: Option<i64>,
}

/// New values for a user's latest subscription fields.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubscriptionChange {
    pub status: String,
    pub product_id: Option<i64>,
    pub variant_id: Option<i64>,
}

/// What the receiver should do with a verified event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WebhookAction {
    /// Overwrite the user's subscription fields and drop their cached status.
    UpdateSubscription {
        user_id: UserId,
        change: SubscriptionChange,
    },
    /// Drop the user's cached status only.
    InvalidateCache { user_id: UserId },
    Ignore,
}

impl PaymentEvent {
    pub fn parse(body: &[u8]) -> Result<Self, WebhookError> {
        Ok(serde_json::from_slice(body)?)
    }

    /// The `user_id` from the checkout custom data, as a string or a number.
    pub fn user_id(&self) -> Result<Option<UserId>, WebhookError> {
        let raw = match self.meta.custom_data.get("user_id") {
            None | Some(serde_json::Value::Null) => return Ok(None),
            Some(serde_json::Value::Number(n)) => n.to_string(),
            Some(serde_json::Value::String(s)) => s.trim().to_string(),
            Some(other) => return Err(WebhookError::InvalidUserId(other.to_string())),
        };
        raw.parse::<UserId>()
            .map(Some)
            .map_err(|_| WebhookError::InvalidUserId(raw))
    }

    /// Decide how to apply this event.
    ///
    /// `subscription_created` must name a user. Later subscription events
    /// without one are ignored, since the subscription may predate the
    /// account link.
    pub fn action(&self) -> Result<WebhookAction, WebhookError> {
        let event = self.meta.event_name;
        let user_id = self.user_id()?;

        if event.is_subscription() {
            let Some(user_id) = user_id else {
                return match event {
                    EventName::SubscriptionCreated => Err(WebhookError::MissingUserId),
                    _ => Ok(WebhookAction::Ignore),
                };
            };
            let attributes = &self.data.attributes;
            let status = match event.forced_status() {
                Some(status) => status.to_string(),
                None => attributes
                    .status
                    .clone()
                    .filter(|s| !s.is_empty())
                    .ok_or(WebhookError::MissingStatus)?,
            };
            return Ok(WebhookAction::UpdateSubscription {
                user_id,
                change: SubscriptionChange {
                    status,
                    product_id: attributes.product_id,
                    variant_id: attributes.variant_id,
                },
            });
        }

        match (event, user_id) {
            (EventName::OrderRefunded, Some(user_id)) => {
                Ok(WebhookAction::InvalidateCache { user_id })
            }
            _ => Ok(WebhookAction::Ignore),
        }
    }
}

mod hex {
    pub fn encode(bytes: &[u8]) -> String {
        bytes.iter().map(|b| format!("{b:02x}")).collect()
    }

    pub fn decode(s: &str) -> Option<Vec<u8>> {
        if s.len() % 2 != 0 || !s.is_ascii() {
            return None;
        }
        (0..s.len())
            .step_by(2)
            .map(|i| u8::from_str_radix(&s[i..i + 2], 16).ok())
            .collect()
    }
}
