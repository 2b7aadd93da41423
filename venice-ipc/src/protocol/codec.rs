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


//! Message codec.
//!
//! One transmission is the 18-byte [`Header`] followed by two length-prefixed
//! frames: the postcard metadata record, then the payload.
//!
//! With encryption active each frame is sealed with additional authenticated
//! data made of:
//!
//! - the raw header bytes, so a tampered header fails the very next frame
//! - a frame role byte, so metadata and payload frames cannot trade places
//! - the transmission's sequence number in its direction, so a replayed or
//!   reordered transmission fails
//! - for the payload only, the sealed metadata frame, so a payload cannot be
//!   spliced under another message's metadata

use crate::crypto::{Encryptor, SecureChannel};
use crate::error::IpcError;
use crate::message::{Message, PayloadMetaData};
use crate::protocol::{Header, ProtocolError, HEADER_SIZE};
use crate::serialization::framing::{encode_frame, read_frame};
use crate::serialization::DeserializationError;
use crate::transport::{Compressor, TransportError};
use std::sync::Arc;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};

/// Room for AEAD overhead and gzip expansion on top of the message limit.
const FRAME_SLACK: usize = 64 * 1024;

const FRAME_METADATA: u8 = 1;
const FRAME_PAYLOAD: u8 = 2;

/// Encodes and decodes messages for one side of a connection.
///
/// The codec is cheap to clone; the reading and writing halves of a
/// connection each hold their own copy and activate encryption
/// independently once the key exchange completes. Both copies share one
/// [`SecureChannel`]: the writer advances its outbound counter, the reader
/// its inbound counter. Transmissions must hit the wire in the order they
/// were encoded.
///
/// # Examples
///
/// ```rust
/// use venice_ipc::message::Message;
/// use venice_ipc::protocol::Codec;
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let codec = Codec::new(1024 * 1024);
/// let msg = Message::new_text("ping", "text/plain", "hello")?;
///
/// let bytes = codec.encode(&msg).await?;
/// let decoded = codec.read(&mut &bytes[..]).await?.unwrap();
/// assert_eq!(decoded, msg);
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone)]
pub struct Codec {
    compressor: Compressor,
    channel: Option<Arc<SecureChannel>>,
    max_message_size: usize,
}

impl Codec {
    /// Creates a plaintext, uncompressed codec.
    pub fn new(max_message_size: usize) -> Self {
        Self {
            compressor: Compressor::disabled(),
            channel: None,
            max_message_size,
        }
    }

    /// Sets the payload compressor.
    pub fn with_compressor(mut self, compressor: Compressor) -> Self {
        self.compressor = compressor;
        self
    }

    /// Starts with encryption active.
    pub fn with_channel(mut self, channel: Arc<SecureChannel>) -> Self {
        self.channel = Some(channel);
        self
    }

    /// Activates encryption for every following message.
    pub fn activate_encryption(&mut self, channel: Arc<SecureChannel>) {
        self.channel = Some(channel);
    }

    /// Returns `true` if encryption is active.
    pub fn is_encrypted(&self) -> bool {
        self.channel.is_some()
    }

    /// Maximum payload size in bytes.
    pub fn max_message_size(&self) -> usize {
        self.max_message_size
    }

    fn frame_limit(&self) -> usize {
        self.max_message_size.saturating_add(FRAME_SLACK)
    }

    /// Encodes a message into one contiguous transmission.
    ///
    /// On an encrypted channel this claims the next outbound sequence
    /// number, so the transmission must be written before any other.
    ///
    /// # Errors
    ///
    /// Returns [`IpcError::MessageTooLarge`] if the payload exceeds the
    /// maximum message size.
    pub async fn encode(&self, message: &Message) -> Result<Vec<u8>, IpcError> {
        let data = message.data();
        if data.len() > self.max_message_size {
            return Err(IpcError::MessageTooLarge {
                size: data.len(),
                max: self.max_message_size,
            });
        }

        let compressed = self.compressor.should_compress(data.len());
        let header = Header {
            compressed,
            encrypted: self.is_encrypted(),
            timestamp: message.timestamp(),
        }
        .encode();

        let metadata = message.to_metadata().encode()?;
        let payload = if compressed {
            self.compressor
                .compress(data)
                .await
                .map_err(|e| TransportError::Io { source: e })?
        } else {
            data.to_vec()
        };

        let limit = self.frame_limit();
        if payload.len() + Encryptor::overhead() > limit {
            return Err(IpcError::MessageTooLarge {
                size: payload.len(),
                max: self.max_message_size,
            });
        }

        let (metadata, payload) = match &self.channel {
            Some(channel) => {
                let sequence = channel.next_outbound_sequence();
                let metadata = channel.seal(&metadata, &frame_aad(&header, FRAME_METADATA, sequence, &[]))?;
                let payload = channel.seal(&payload, &frame_aad(&header, FRAME_PAYLOAD, sequence, &metadata))?;
                (metadata, payload)
            }
            None => (metadata, payload),
        };

        let mut buf = Vec::with_capacity(HEADER_SIZE + 8 + metadata.len() + payload.len());
        buf.extend_from_slice(&header);
        encode_frame(&mut buf, &metadata, limit)?;
        encode_frame(&mut buf, &payload, limit)?;
        Ok(buf)
    }

    /// Encodes a message and writes it with a single `write_all`.
    pub async fn write<W>(&self, writer: &mut W, message: &Message) -> Result<(), IpcError>
    where
        W: AsyncWrite + Unpin,
    {
        let bytes = self.encode(message).await?;
        writer
            .write_all(&bytes)
            .await
            .map_err(|e| TransportError::from_io(e, "writing message"))?;
        writer
            .flush()
            .await
            .map_err(|e| TransportError::from_io(e, "flushing message"))?;
        Ok(())
    }

    /// Reads the next message.
    ///
    /// Returns `Ok(None)` if the stream ends cleanly before the first header
    /// byte. A stream that ends anywhere later is a lost connection.
    ///
    /// # Errors
    ///
    /// Any [`ProtocolError`] is fatal to the connection.
    pub async fn read<R>(&self, reader: &mut R) -> Result<Option<Message>, IpcError>
    where
        R: AsyncRead + Unpin,
    {
        let mut raw_header = [0u8; HEADER_SIZE];
        if !read_header(reader, &mut raw_header).await? {
            return Ok(None);
        }
        let header = Header::decode(&raw_header)?;
        if header.encrypted != self.is_encrypted() {
            return Err(ProtocolError::EncryptionMismatch {
                channel_encrypted: self.is_encrypted(),
            }
            .into());
        }

        let limit = self.frame_limit();
        let metadata = read_frame(reader, limit).await.map_err(frame_error)?;
        let payload = read_frame(reader, limit).await.map_err(frame_error)?;

        let (metadata, payload) = match &self.channel {
            Some(channel) => {
                let sequence = channel.expected_inbound_sequence();
                let opened = channel
                    .open(&metadata, &frame_aad(&raw_header, FRAME_METADATA, sequence, &[]))
                    .map_err(|_| ProtocolError::Authentication { frame: "metadata" })?;
                let payload = channel
                    .open(&payload, &frame_aad(&raw_header, FRAME_PAYLOAD, sequence, &metadata))
                    .map_err(|_| ProtocolError::Authentication { frame: "payload" })?;
                channel.advance_inbound();
                (opened, payload)
            }
            None => (metadata, payload),
        };

        let payload = if header.compressed {
            self.compressor
                .decompress(&payload, self.max_message_size)
                .await
                .map_err(|e| ProtocolError::Decompression {
                    reason: e.to_string(),
                })?
        } else {
            payload
        };
        if payload.len() > self.max_message_size {
            return Err(ProtocolError::InvalidFrame {
                reason: format!(
                    "payload of {} bytes exceeds maximum message size {}",
                    payload.len(),
                    self.max_message_size
                ),
            }
            .into());
        }

        let metadata = PayloadMetaData::decode(&metadata).map_err(|e| {
            ProtocolError::InvalidMetadata {
                reason: e.to_string(),
            }
        })?;
        let message =
            Message::from_wire(metadata, header.timestamp, payload).map_err(ProtocolError::from)?;
        Ok(Some(message))
    }
}

/// Additional authenticated data of one sealed frame.
fn frame_aad(header: &[u8; HEADER_SIZE], role: u8, sequence: u64, bound: &[u8]) -> Vec<u8> {
    let mut aad = Vec::with_capacity(HEADER_SIZE + 9 + bound.len());
    aad.extend_from_slice(header);
    aad.push(role);
    aad.extend_from_slice(&sequence.to_be_bytes());
    aad.extend_from_slice(bound);
    aad
}

/// Fills `buf`, returning `false` on a clean end of stream before any byte.
async fn read_header<R>(reader: &mut R, buf: &mut [u8; HEADER_SIZE]) -> Result<bool, TransportError>
where
    R: AsyncRead + Unpin,
{
    let mut filled = 0;
    while filled < HEADER_SIZE {
        let n = reader
            .read(&mut buf[filled..])
            .await
            .map_err(|e| TransportError::from_io(e, "reading header"))?;
        if n == 0 {
            if filled == 0 {
                return Ok(false);
            }
            return Err(TransportError::ConnectionLost {
                reason: format!("stream ended after {} of {} header bytes", filled, HEADER_SIZE),
                source: None,
            });
        }
        filled += n;
    }
    Ok(true)
}

fn frame_error(error: DeserializationError) -> IpcError {
    if error.is_end_of_stream() {
        TransportError::ConnectionLost {
            reason: error.to_string(),
            source: None,
        }
        .into()
    } else if let Some(kind) = error.io_kind() {
        TransportError::from_io(std::io::Error::new(kind, error.to_string()), "reading frame").into()
    } else {
        ProtocolError::InvalidFrame {
            reason: error.to_string(),
        }
        .into()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crypto::Side;
    use crate::message::{MessageType, ResponseStatus};

    fn sample() -> Message {
        Message::new_text("ping", "text/plain", "x".repeat(2048))
            .unwrap()
            .with_destination("echo")
            .with_request_id("req-7")
            .with_expires_at(1_900_000_000_000)
    }

    /// A client codec and the server codec that reads it.
    fn encrypted(max: usize) -> (Codec, Codec) {
        let channel = |side| Arc::new(SecureChannel::derive(&[9u8; 32], b"test", side).unwrap());
        (
            Codec::new(max).with_channel(channel(Side::Client)),
            Codec::new(max).with_channel(channel(Side::Server)),
        )
    }

    /// Splits a transmission into header, metadata frame and payload frame.
    fn pieces(bytes: &[u8]) -> (&[u8], &[u8], &[u8]) {
        let meta_len = u32::from_be_bytes(bytes[HEADER_SIZE..HEADER_SIZE + 4].try_into().unwrap()) as usize;
        let meta_end = HEADER_SIZE + 4 + meta_len;
        (&bytes[..HEADER_SIZE], &bytes[HEADER_SIZE..meta_end], &bytes[meta_end..])
    }

    async fn roundtrip(codec: &Codec, msg: &Message) -> Message {
        let bytes = codec.encode(msg).await.unwrap();
        codec.read(&mut &bytes[..]).await.unwrap().unwrap()
    }

    #[tokio::test]
    async fn test_plain_roundtrip() {
        let codec = Codec::new(1 << 20);
        let msg = sample();
        assert_eq!(roundtrip(&codec, &msg).await, msg);
    }

    #[tokio::test]
    #[cfg(feature = "compression")]
    async fn test_compressed_roundtrip() {
        let codec = Codec::new(1 << 20).with_compressor(Compressor::new(Some(100)));
        let msg = sample();
        let bytes = codec.encode(&msg).await.unwrap();
        assert_eq!(&bytes[6..8], &[0, 1]);
        assert!(bytes.len() < 2048);
        assert_eq!(codec.read(&mut &bytes[..]).await.unwrap().unwrap(), msg);
    }

    #[tokio::test]
    async fn test_small_payload_not_compressed() {
        let codec = Codec::new(1 << 20).with_compressor(Compressor::new(Some(100)));
        let msg = Message::new_text("s", "text/plain", "tiny").unwrap();
        let bytes = codec.encode(&msg).await.unwrap();
        assert_eq!(&bytes[6..8], &[0, 0]);
    }

    #[tokio::test]
    async fn test_encrypted_roundtrip() {
        let (client, server) = encrypted(1 << 20);
        let client = client.with_compressor(Compressor::new(Some(100)));
        let server = server.with_compressor(Compressor::new(Some(100)));
        let msg = sample()
            .with_type(MessageType::Response)
            .with_response_status(ResponseStatus::Ok);
        let bytes = client.encode(&msg).await.unwrap();
        assert_eq!(&bytes[8..10], &[0, 1]);
        assert_eq!(server.read(&mut &bytes[..]).await.unwrap().unwrap(), msg);

        let reply = server.encode(&msg).await.unwrap();
        assert_eq!(client.read(&mut &reply[..]).await.unwrap().unwrap(), msg);
    }

    #[tokio::test]
    async fn test_header_bit_flip_fails_authentication() {
        let (client, codec) = encrypted(1 << 20);
        let bytes = client.encode(&sample()).await.unwrap();

        // Every bit outside magic, version and flags is only protected by AAD.
        for byte in 10..HEADER_SIZE {
            for bit in 0..8 {
                let mut tampered = bytes.clone();
                tampered[byte] ^= 1 << bit;
                let err = codec.read(&mut &tampered[..]).await.unwrap_err();
                assert!(
                    matches!(
                        err,
                        IpcError::Protocol(ProtocolError::Authentication { frame: "metadata" })
                    ),
                    "byte {byte} bit {bit}: {err}"
                );
            }
        }
    }

    #[tokio::test]
    async fn test_compressed_flag_flip_fails_authentication() {
        let (client, server) = encrypted(1 << 20);
        let mut bytes = client.encode(&sample()).await.unwrap();
        bytes[7] ^= 1;
        assert!(matches!(
            server.read(&mut &bytes[..]).await,
            Err(IpcError::Protocol(ProtocolError::Authentication { .. }))
        ));
    }

    #[tokio::test]
    async fn test_encryption_mismatch() {
        let plain = Codec::new(1 << 20);
        let (client, server) = encrypted(1 << 20);

        let bytes = plain.encode(&sample()).await.unwrap();
        assert!(matches!(
            server.read(&mut &bytes[..]).await,
            Err(IpcError::Protocol(ProtocolError::EncryptionMismatch {
                channel_encrypted: true
            }))
        ));

        let bytes = client.encode(&sample()).await.unwrap();
        assert!(matches!(
            plain.read(&mut &bytes[..]).await,
            Err(IpcError::Protocol(ProtocolError::EncryptionMismatch {
                channel_encrypted: false
            }))
        ));
    }

    #[tokio::test]
    async fn test_spliced_payload_fails_authentication() {
        let (client, server) = encrypted(1 << 20);
        let a = Message::new_text("transfer", "text/plain", "amount=10").unwrap();
        let b = Message::new_text("transfer", "text/plain", "amount=99999").unwrap();
        let first = client.encode(&a).await.unwrap();
        let second = client.encode(&b).await.unwrap();

        let (header, metadata, _) = pieces(&first);
        let (_, _, payload) = pieces(&second);
        let spliced = [header, metadata, payload].concat();
        assert!(matches!(
            server.read(&mut &spliced[..]).await,
            Err(IpcError::Protocol(ProtocolError::Authentication { frame: "payload" }))
        ));
    }

    #[tokio::test]
    async fn test_swapped_frames_fail_authentication() {
        let (client, server) = encrypted(1 << 20);
        let bytes = client.encode(&sample()).await.unwrap();
        let (header, metadata, payload) = pieces(&bytes);
        let swapped = [header, payload, metadata].concat();
        assert!(matches!(
            server.read(&mut &swapped[..]).await,
            Err(IpcError::Protocol(ProtocolError::Authentication { frame: "metadata" }))
        ));
    }

    #[tokio::test]
    async fn test_replayed_transmission_fails_authentication() {
        let (client, server) = encrypted(1 << 20);
        let offer = Message::new_text("orders", "text/plain", "amount=10")
            .unwrap()
            .with_type(MessageType::Offer);
        let bytes = client.encode(&offer).await.unwrap();

        assert_eq!(server.read(&mut &bytes[..]).await.unwrap().unwrap(), offer);
        assert!(matches!(
            server.read(&mut &bytes[..]).await,
            Err(IpcError::Protocol(ProtocolError::Authentication { frame: "metadata" }))
        ));
    }

    #[tokio::test]
    async fn test_reordered_transmissions_fail_authentication() {
        let (client, server) = encrypted(1 << 20);
        let _first = client.encode(&sample()).await.unwrap();
        let second = client.encode(&sample()).await.unwrap();
        assert!(matches!(
            server.read(&mut &second[..]).await,
            Err(IpcError::Protocol(ProtocolError::Authentication { .. }))
        ));
    }

    #[tokio::test]
    async fn test_reflected_transmission_fails_authentication() {
        let (client, _) = encrypted(1 << 20);
        let bytes = client.encode(&sample()).await.unwrap();
        assert!(matches!(
            client.read(&mut &bytes[..]).await,
            Err(IpcError::Protocol(ProtocolError::Authentication { .. }))
        ));
    }

    #[tokio::test]
    async fn test_clean_eof_is_none() {
        let codec = Codec::new(1 << 20);
        assert!(codec.read(&mut &b""[..]).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_truncated_stream_is_connection_lost() {
        let codec = Codec::new(1 << 20);
        let bytes = codec.encode(&sample()).await.unwrap();

        for cut in [5, HEADER_SIZE + 2, bytes.len() - 1] {
            let err = codec.read(&mut &bytes[..cut]).await.unwrap_err();
            assert!(
                matches!(err, IpcError::Transport(ref e) if e.is_connection_lost()),
                "cut at {cut}: {err}"
            );
        }
    }

    #[tokio::test]
    async fn test_message_too_large() {
        let codec = Codec::new(1024);
        let err = codec.encode(&sample()).await.unwrap_err();
        assert!(matches!(err, IpcError::MessageTooLarge { size: 2048, max: 1024 }));
    }

    #[tokio::test]
    async fn test_oversized_frame_rejected_on_read() {
        let big = Codec::new(1 << 20);
        let small = Codec::new(16);
        let msg = Message::new_binary("s", "application/octet-stream", vec![0u8; 200_000]).unwrap();
        let bytes = big.encode(&msg).await.unwrap();
        assert!(matches!(
            small.read(&mut &bytes[..]).await,
            Err(IpcError::Protocol(ProtocolError::InvalidFrame { .. }))
        ));
    }

    #[tokio::test]
    async fn test_bad_magic_is_fatal() {
        let codec = Codec::new(1 << 20);
        let mut bytes = codec.encode(&sample()).await.unwrap();
        bytes[0] = 0;
        let err = codec.read(&mut &bytes[..]).await.unwrap_err();
        assert!(err.is_connection_fatal());
    }

    #[tokio::test]
    async fn test_sequential_messages_on_one_stream() {
        let codec = Codec::new(1 << 20);
        let a = Message::new_text("a", "text/plain", "1").unwrap();
        let b = Message::new_binary("b", "application/octet-stream", vec![1, 2, 3]).unwrap();

        let mut stream = codec.encode(&a).await.unwrap();
        stream.extend(codec.encode(&b).await.unwrap());

        let mut reader = &stream[..];
        assert_eq!(codec.read(&mut reader).await.unwrap().unwrap(), a);
        assert_eq!(codec.read(&mut reader).await.unwrap().unwrap(), b);
        assert!(codec.read(&mut reader).await.unwrap().is_none());
    }
}
