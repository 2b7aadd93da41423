//
// Copyright 2026 Hans W. Uhlig. All Rights Reserved.
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//      http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.
//


//! The immutable message value.

use crate::message::{
    validate_charset, validate_mimetype, validate_subject, MessageType, PayloadMetaData,
    ResponseStatus, ValidationError,
};
use crate::serialization::{JsonSerializer, Serializer};
use serde::{Deserialize, Serialize};
use std::time::{Duration, SystemTime, UNIX_EPOCH};
use uuid::Uuid;

/// Mimetype of plain text payloads.
pub const MIMETYPE_TEXT: &str = "text/plain";
/// Mimetype of JSON payloads.
pub const MIMETYPE_JSON: &str = "application/json";
/// Mimetype of opaque binary payloads.
pub const MIMETYPE_BINARY: &str = "application/octet-stream";
/// Charset used for all text this crate produces.
pub const CHARSET_UTF8: &str = "UTF-8";

/// Returns the current time in epoch millis.
pub(crate) fn now_millis() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| i64::try_from(d.as_millis()).unwrap_or(i64::MAX))
        .unwrap_or(0)
}

/// One unit of IPC traffic.
///
/// Messages are immutable. Every `with_*` method consumes the message and
/// returns a new one with a fresh id, except [`Message::with_response_status`]
/// and [`Message::as_subscription_reply`], which keep the id so the result
/// still correlates with the original.
///
/// A message is textual iff it has a charset.
///
/// # Examples
///
/// ```rust
/// use venice_ipc::message::{Message, MessageType};
///
/// # fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let msg = Message::new_text("ping", "text/plain", "hello")?.with_destination("echo");
/// assert_eq!(msg.message_type(), MessageType::Request);
/// assert_eq!(msg.text()?, "hello");
/// assert_eq!(msg.destination_name(), Some("echo"));
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    id: Uuid,
    request_id: Option<String>,
    message_type: MessageType,
    response_status: ResponseStatus,
    oneway: bool,
    durable: bool,
    subscription_reply: bool,
    destination_name: Option<String>,
    reply_to_queue_name: Option<String>,
    timestamp: i64,
    expires_at: i64,
    timeout: i64,
    subject: String,
    mimetype: String,
    charset: Option<String>,
    data: Vec<u8>,
}

impl Message {
    /// Creates a textual request encoded as UTF-8.
    pub fn new_text(
        subject: impl Into<String>,
        mimetype: impl Into<String>,
        text: impl Into<String>,
    ) -> Result<Self, ValidationError> {
        Self::build(
            subject.into(),
            mimetype.into(),
            Some(CHARSET_UTF8.to_string()),
            text.into().into_bytes(),
        )
    }

    /// Creates a binary request.
    pub fn new_binary(
        subject: impl Into<String>,
        mimetype: impl Into<String>,
        data: impl Into<Vec<u8>>,
    ) -> Result<Self, ValidationError> {
        Self::build(subject.into(), mimetype.into(), None, data.into())
    }

    /// Creates a textual `application/json` request from a serializable value.
    pub fn new_json<T>(subject: impl Into<String>, value: &T) -> Result<Self, ValidationError>
    where
        T: Serialize + ?Sized,
    {
        let json = JsonSerializer::new()
            .serialize(value)
            .map_err(|e| ValidationError::InvalidPayload {
                reason: e.to_string(),
            })?;
        Self::build(
            subject.into(),
            MIMETYPE_JSON.to_string(),
            Some(CHARSET_UTF8.to_string()),
            json,
        )
    }

    /// Creates a control message of `message_type` under its reserved subject.
    pub(crate) fn control(message_type: MessageType, mimetype: &str, charset: Option<&str>, data: Vec<u8>) -> Self {
        let subject = message_type.control_subject().unwrap_or("$control");
        Self {
            message_type,
            ..Self::unchecked(
                subject.to_string(),
                mimetype.to_string(),
                charset.map(str::to_string),
                data,
            )
        }
    }

    /// Creates a response to `request` carrying the body of `reply`.
    ///
    /// The response shares the request's `id` and `request_id`.
    pub fn response_to(request: &Message, status: ResponseStatus, reply: Message) -> Self {
        Self {
            id: request.id,
            request_id: request.request_id.clone(),
            message_type: MessageType::Response,
            response_status: status,
            destination_name: request.destination_name.clone(),
            ..Self::unchecked(reply.subject, reply.mimetype, reply.charset, reply.data)
        }
    }

    /// Creates a response to `request` whose body is a plain text reason.
    pub fn status_response(request: &Message, status: ResponseStatus, reason: impl Into<String>) -> Self {
        let reply = Self::unchecked(
            request.subject.clone(),
            MIMETYPE_TEXT.to_string(),
            Some(CHARSET_UTF8.to_string()),
            reason.into().into_bytes(),
        );
        Self::response_to(request, status, reply)
    }

    /// Rebuilds a message from its wire pieces.
    pub fn from_wire(meta: PayloadMetaData, timestamp: i64, data: Vec<u8>) -> Result<Self, ValidationError> {
        let message_type =
            MessageType::from_code(meta.message_type).ok_or(ValidationError::UnknownCode {
                kind: "message type",
                code: meta.message_type,
            })?;
        let response_status =
            ResponseStatus::from_code(meta.response_status).ok_or(ValidationError::UnknownCode {
                kind: "response status",
                code: meta.response_status,
            })?;
        validate_subject(&meta.subject)?;
        validate_mimetype(&meta.mimetype)?;
        if let Some(charset) = &meta.charset {
            validate_charset(charset)?;
        }

        Ok(Self {
            id: meta.id,
            request_id: meta.request_id,
            message_type,
            response_status,
            oneway: meta.oneway,
            durable: meta.durable,
            subscription_reply: meta.subscription_reply,
            destination_name: meta.destination_name,
            reply_to_queue_name: meta.reply_to_queue_name,
            timestamp,
            expires_at: meta.expires_at,
            timeout: meta.timeout,
            subject: meta.subject,
            mimetype: meta.mimetype,
            charset: meta.charset,
            data,
        })
    }

    /// Returns the wire metadata record for this message.
    pub fn to_metadata(&self) -> PayloadMetaData {
        PayloadMetaData {
            id: self.id,
            request_id: self.request_id.clone(),
            message_type: self.message_type.code(),
            response_status: self.response_status.code(),
            oneway: self.oneway,
            durable: self.durable,
            subscription_reply: self.subscription_reply,
            destination_name: self.destination_name.clone(),
            reply_to_queue_name: self.reply_to_queue_name.clone(),
            expires_at: self.expires_at,
            timeout: self.timeout,
            subject: self.subject.clone(),
            mimetype: self.mimetype.clone(),
            charset: self.charset.clone(),
        }
    }

    fn build(
        subject: String,
        mimetype: String,
        charset: Option<String>,
        data: Vec<u8>,
    ) -> Result<Self, ValidationError> {
        validate_subject(&subject)?;
        validate_mimetype(&mimetype)?;
        if let Some(charset) = &charset {
            validate_charset(charset)?;
        }
        Ok(Self::unchecked(subject, mimetype, charset, data))
    }

    fn unchecked(subject: String, mimetype: String, charset: Option<String>, data: Vec<u8>) -> Self {
        Self {
            id: Uuid::new_v4(),
            request_id: None,
            message_type: MessageType::Request,
            response_status: ResponseStatus::Null,
            oneway: false,
            durable: false,
            subscription_reply: false,
            destination_name: None,
            reply_to_queue_name: None,
            timestamp: now_millis(),
            expires_at: -1,
            timeout: -1,
            subject,
            mimetype,
            charset,
            data,
        }
    }

    fn derived(mut self) -> Self {
        self.id = Uuid::new_v4();
        self
    }

    /// Changes the message type.
    pub fn with_type(mut self, message_type: MessageType) -> Self {
        self.message_type = message_type;
        self.derived()
    }

    /// Changes the response status, keeping the id.
    pub fn with_response_status(mut self, status: ResponseStatus) -> Self {
        self.response_status = status;
        self
    }

    /// Marks the message for out-of-band subscription delivery, keeping the id.
    pub fn as_subscription_reply(mut self) -> Self {
        self.subscription_reply = true;
        self
    }

    /// Addresses the message to a queue, topic or function.
    pub fn with_destination(mut self, name: impl Into<String>) -> Self {
        self.destination_name = Some(name.into());
        self.derived()
    }

    /// Sets the correlation id.
    pub fn with_request_id(mut self, request_id: impl Into<String>) -> Self {
        self.request_id = Some(request_id.into());
        self.derived()
    }

    /// Marks the message as fire-and-forget.
    ///
    /// A plain request becomes [`MessageType::OneWay`].
    pub fn with_oneway(mut self, oneway: bool) -> Self {
        self.oneway = oneway;
        if oneway && self.message_type == MessageType::Request {
            self.message_type = MessageType::OneWay;
        }
        self.derived()
    }

    /// Requests persistence when routed to a durable queue.
    pub fn with_durable(mut self, durable: bool) -> Self {
        self.durable = durable;
        self.derived()
    }

    /// Sets the queue for asynchronous replies.
    pub fn with_reply_to(mut self, queue: impl Into<String>) -> Self {
        self.reply_to_queue_name = Some(queue.into());
        self.derived()
    }

    /// Sets the absolute expiry in epoch millis, -1 for never.
    pub fn with_expires_at(mut self, expires_at: i64) -> Self {
        self.expires_at = expires_at;
        self.derived()
    }

    /// Sets the expiry relative to now.
    pub fn with_time_to_live(self, ttl: Duration) -> Self {
        let ttl = i64::try_from(ttl.as_millis()).unwrap_or(i64::MAX);
        self.with_expires_at(now_millis().saturating_add(ttl))
    }

    /// Sets the client wait budget in millis, -1 for none.
    pub fn with_timeout(mut self, timeout: i64) -> Self {
        self.timeout = timeout;
        self.derived()
    }

    /// Message id.
    pub fn id(&self) -> Uuid {
        self.id
    }

    /// Correlation id.
    pub fn request_id(&self) -> Option<&str> {
        self.request_id.as_deref()
    }

    /// Message type.
    pub fn message_type(&self) -> MessageType {
        self.message_type
    }

    /// Response status, [`ResponseStatus::Null`] for requests.
    pub fn response_status(&self) -> ResponseStatus {
        self.response_status
    }

    /// Returns `true` if no response is expected.
    pub fn is_oneway(&self) -> bool {
        self.oneway
    }

    /// Returns `true` if the message asks to be persisted.
    pub fn is_durable(&self) -> bool {
        self.durable
    }

    /// Returns `true` for out-of-band subscription deliveries.
    pub fn is_subscription_reply(&self) -> bool {
        self.subscription_reply
    }

    /// Target queue, topic or function.
    pub fn destination_name(&self) -> Option<&str> {
        self.destination_name.as_deref()
    }

    /// Queue for asynchronous replies.
    pub fn reply_to_queue_name(&self) -> Option<&str> {
        self.reply_to_queue_name.as_deref()
    }

    /// Creation time in epoch millis.
    pub fn timestamp(&self) -> i64 {
        self.timestamp
    }

    /// Expiry in epoch millis, -1 for never.
    pub fn expires_at(&self) -> i64 {
        self.expires_at
    }

    /// Client wait budget in millis, -1 for none.
    pub fn timeout(&self) -> i64 {
        self.timeout
    }

    /// Routing subject.
    pub fn subject(&self) -> &str {
        &self.subject
    }

    /// Payload mimetype.
    pub fn mimetype(&self) -> &str {
        &self.mimetype
    }

    /// Payload charset.
    pub fn charset(&self) -> Option<&str> {
        self.charset.as_deref()
    }

    /// Raw payload.
    pub fn data(&self) -> &[u8] {
        &self.data
    }

    /// Consumes the message, returning its payload.
    pub fn into_data(self) -> Vec<u8> {
        self.data
    }

    /// Returns `true` if the payload is text.
    pub fn is_text(&self) -> bool {
        self.charset.is_some()
    }

    /// Returns `true` if the message has expired at `now` (epoch millis).
    pub fn is_expired_at(&self, now: i64) -> bool {
        self.expires_at >= 0 && now >= self.expires_at
    }

    /// Returns `true` if the message has expired.
    pub fn is_expired(&self) -> bool {
        self.is_expired_at(now_millis())
    }

    /// Decodes the payload as text.
    ///
    /// Only UTF-8 and US-ASCII are supported.
    pub fn text(&self) -> Result<&str, ValidationError> {
        let charset = self.charset.as_deref().ok_or(ValidationError::NotText)?;
        let ascii = charset.eq_ignore_ascii_case("us-ascii") || charset.eq_ignore_ascii_case("ascii");
        let utf8 = charset.eq_ignore_ascii_case("utf-8") || charset.eq_ignore_ascii_case("utf8");
        if !ascii && !utf8 {
            return Err(ValidationError::UnsupportedCharset {
                charset: charset.to_string(),
            });
        }
        if ascii && !self.data.is_ascii() {
            return Err(ValidationError::InvalidPayload {
                reason: "non-ASCII byte in US-ASCII payload".to_string(),
            });
        }
        std::str::from_utf8(&self.data).map_err(|e| ValidationError::InvalidPayload {
            reason: e.to_string(),
        })
    }

    /// Decodes a textual `application/json` payload.
    pub fn json<T>(&self) -> Result<T, ValidationError>
    where
        T: serde::de::DeserializeOwned,
    {
        let essence = self.mimetype.split(';').next().unwrap_or_default().trim();
        if !essence.eq_ignore_ascii_case(MIMETYPE_JSON) {
            return Err(ValidationError::NotJson {
                mimetype: self.mimetype.clone(),
            });
        }
        JsonSerializer::new()
            .deserialize(self.text()?.as_bytes())
            .map_err(|e| ValidationError::InvalidPayload {
                reason: e.to_string(),
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_text_message() {
        let msg = Message::new_text("greeting", MIMETYPE_TEXT, "hello").unwrap();
        assert!(msg.is_text());
        assert_eq!(msg.text().unwrap(), "hello");
        assert_eq!(msg.charset(), Some(CHARSET_UTF8));
        assert_eq!(msg.message_type(), MessageType::Request);
        assert_eq!(msg.response_status(), ResponseStatus::Null);
        assert_eq!(msg.expires_at(), -1);
        assert_eq!(msg.timeout(), -1);
    }

    #[test]
    fn test_binary_message() {
        let msg = Message::new_binary("blob", MIMETYPE_BINARY, vec![0xff, 0x00]).unwrap();
        assert!(!msg.is_text());
        assert_eq!(msg.text(), Err(ValidationError::NotText));
        assert!(matches!(msg.json::<u8>(), Err(ValidationError::NotJson { .. })));
    }

    #[test]
    fn test_json_message() {
        let msg = Message::new_json("numbers", &vec![1, 2, 3]).unwrap();
        assert_eq!(msg.mimetype(), MIMETYPE_JSON);
        assert_eq!(msg.json::<Vec<u32>>().unwrap(), vec![1, 2, 3]);

        let text = Message::new_text("numbers", "text/plain", "[1]").unwrap();
        assert!(matches!(text.json::<Vec<u32>>(), Err(ValidationError::NotJson { .. })));
    }

    #[test]
    fn test_unsupported_charset() {
        let meta = PayloadMetaData {
            charset: Some("ISO-8859-1".to_string()),
            ..Message::new_text("s", "text/plain", "x").unwrap().to_metadata()
        };
        let msg = Message::from_wire(meta, 0, b"x".to_vec()).unwrap();
        assert!(matches!(msg.text(), Err(ValidationError::UnsupportedCharset { .. })));
    }

    #[test]
    fn test_construction_validates() {
        assert!(Message::new_text("a b", "text/plain", "x").is_err());
        assert!(Message::new_text("a,b", "text/plain", "x").is_err());
        assert!(Message::new_binary("s", "m".repeat(101), vec![]).is_err());
    }

    #[test]
    fn test_modification_identity() {
        let msg = Message::new_text("s", "text/plain", "x").unwrap();
        let id = msg.id();

        let status = msg.clone().with_response_status(ResponseStatus::Ok);
        assert_eq!(status.id(), id);
        let sub = msg.clone().as_subscription_reply();
        assert_eq!(sub.id(), id);
        assert!(sub.is_subscription_reply());

        assert_ne!(msg.clone().with_type(MessageType::Test).id(), id);
        assert_ne!(msg.clone().with_destination("q").id(), id);
    }

    #[test]
    fn test_response_correlates() {
        let request = Message::new_text("ping", "text/plain", "ping")
            .unwrap()
            .with_request_id("r-1")
            .with_destination("echo");
        let reply = Message::new_text("pong", "text/plain", "pong").unwrap();
        let response = Message::response_to(&request, ResponseStatus::Ok, reply);

        assert_eq!(response.id(), request.id());
        assert_eq!(response.request_id(), Some("r-1"));
        assert_eq!(response.message_type(), MessageType::Response);
        assert_eq!(response.text().unwrap(), "pong");

        let err = Message::status_response(&request, ResponseStatus::QueueFull, "full");
        assert_eq!(err.id(), request.id());
        assert_eq!(err.text().unwrap(), "full");
    }

    #[test]
    fn test_oneway_switches_type() {
        let msg = Message::new_text("s", "text/plain", "x").unwrap().with_oneway(true);
        assert!(msg.is_oneway());
        assert_eq!(msg.message_type(), MessageType::OneWay);
    }

    #[test]
    fn test_expiry() {
        let msg = Message::new_text("s", "text/plain", "x").unwrap();
        assert!(!msg.is_expired_at(i64::MAX));
        let msg = msg.with_expires_at(1_000);
        assert!(!msg.is_expired_at(999));
        assert!(msg.is_expired_at(1_000));
        let msg = msg.with_time_to_live(Duration::from_secs(60));
        assert!(!msg.is_expired());
    }

    #[test]
    fn test_metadata_rebuild() {
        let msg = Message::new_text("s", "text/plain", "x")
            .unwrap()
            .with_destination("q")
            .with_durable(true)
            .with_reply_to("temp-1");
        let bytes = msg.to_metadata().encode().unwrap();
        let meta = PayloadMetaData::decode(&bytes).unwrap();
        let rebuilt = Message::from_wire(meta, msg.timestamp(), msg.data().to_vec()).unwrap();
        assert_eq!(rebuilt, msg);
    }

    #[test]
    fn test_unknown_code_rejected() {
        let mut meta = Message::new_text("s", "text/plain", "x").unwrap().to_metadata();
        meta.message_type = 999;
        assert!(matches!(
            Message::from_wire(meta, 0, vec![]),
            Err(ValidationError::UnknownCode { .. })
        ));
    }
}
