//! Inbound notification payloads and the outbound bus signal built from them.

use std::fmt;

use serde::de::{Deserialize, Deserializer, IgnoredAny, MapAccess, Visitor};
use zbus::zvariant::Type;

use crate::config::BusAddress;

/// JSON body of `POST /{windowID}`. Both fields default to the empty string.
///
/// Keys match case-insensitively (`"Label"`, `"COLOR"`); when a field appears
/// more than once the last occurrence wins. A `null` value leaves the field
/// empty and unknown keys are ignored.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NotificationRequest {
    pub label: String,
    pub color: String,
}

impl<'de> Deserialize<'de> for NotificationRequest {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct RequestVisitor;

        impl<'de> Visitor<'de> for RequestVisitor {
            type Value = NotificationRequest;

            fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str("a notification object")
            }

            fn visit_map<A: MapAccess<'de>>(self, mut map: A) -> Result<Self::Value, A::Error> {
                let mut request = NotificationRequest::default();
                while let Some(key) = map.next_key::<String>()? {
                    let field = if key.eq_ignore_ascii_case("label") {
                        &mut request.label
                    } else if key.eq_ignore_ascii_case("color") {
                        &mut request.color
                    } else {
                        map.next_value::<IgnoredAny>()?;
                        continue;
                    };
                    if let Some(value) = map.next_value::<Option<String>>()? {
                        *field = value;
                    }
                }
                Ok(request)
            }
        }

        deserializer.deserialize_map(RequestVisitor)
    }
}

impl NotificationRequest {
    /// Decode a request body. A literal `null` is treated like `{}`.
    pub fn from_json(body: &[u8]) -> serde_json::Result<Self> {
        serde_json::from_slice::<Option<Self>>(body).map(Option::unwrap_or_default)
    }
}

/// Argument tuple carried by every signal: `(windowID, label, color)`.
pub type SignalBody<'a> = (&'a str, &'a str, &'a str);

/// A signal addressed to the configured destination, path, interface and member.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BusSignal<'a> {
    address: &'a BusAddress,
    window_id: &'a str,
    label: &'a str,
    color: &'a str,
}

impl<'a> BusSignal<'a> {
    pub fn new(
        address: &'a BusAddress,
        window_id: &'a str,
        request: &'a NotificationRequest,
    ) -> Self {
        Self {
            address,
            window_id,
            label: request.label.as_str(),
            color: request.color.as_str(),
        }
    }

    pub fn destination(&self) -> &'a str {
        self.address.destination()
    }

    pub fn path(&self) -> &'a str {
        self.address.path()
    }

    pub fn interface(&self) -> &'a str {
        self.address.interface()
    }

    pub fn member(&self) -> &'a str {
        self.address.member()
    }

    pub const fn body(&self) -> SignalBody<'a> {
        (self.window_id, self.label, self.color)
    }

    /// Body signature derived from [`SignalBody`]'s type, without the
    /// enclosing struct parentheses (the form used in the message header).
    ///
    /// Informational only: `emit_signal` derives the header signature from
    /// the same body type on its own, so this mirrors what goes on the wire.
    pub fn signature() -> String {
        let signature = <SignalBody<'_> as Type>::signature();
        let full = signature.as_str();
        full.strip_prefix('(')
            .and_then(|s| s.strip_suffix(')'))
            .unwrap_or(full)
            .to_string()
    }
}
