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


//! Record framing (magic + length + crc32c).

use std::io::Read;

use crc32c::crc32c;

use crate::wal::{WalError, WalRecord};

const FRAME_MAGIC: u32 = 0x5649_5051; // "VIPQ"

/// Size of the frame header preceding every record body.
pub const FRAME_HEADER_LEN: usize = 12;

/// Default upper bound for one record body.
pub const DEFAULT_MAX_RECORD_BYTES: usize = 32 * 1024 * 1024;

/// Reads framed records, tracking the offset of the last complete one.
pub struct FrameReader<R> {
    reader: R,
    max_record_bytes: usize,
    offset: u64,
    torn: bool,
}

impl<R: Read> FrameReader<R> {
    /// Wraps `reader`.
    pub fn new(reader: R, max_record_bytes: usize) -> Self {
        Self {
            reader,
            max_record_bytes,
            offset: 0,
            torn: false,
        }
    }

    /// Returns the next record, or `None` at end of input.
    ///
    /// Input that ends inside a record also yields `None`, with
    /// [`FrameReader::is_torn`] set.
    pub fn read_next(&mut self) -> Result<Option<WalRecord>, WalError> {
        let mut header = [0u8; FRAME_HEADER_LEN];
        match self.fill(&mut header)? {
            0 => return Ok(None),
            n if n < FRAME_HEADER_LEN => {
                self.torn = true;
                return Ok(None);
            }
            _ => {}
        }

        let magic = u32::from_le_bytes([header[0], header[1], header[2], header[3]]);
        if magic != FRAME_MAGIC {
            return Err(WalError::MagicMismatch { got: magic });
        }

        let length = u32::from_le_bytes([header[4], header[5], header[6], header[7]]) as usize;
        if length == 0 {
            return Err(WalError::LengthInvalid {
                reason: "record length cannot be zero".to_string(),
            });
        }
        if length > self.max_record_bytes {
            return Err(WalError::RecordTooLarge {
                max_bytes: self.max_record_bytes,
                got_bytes: length,
            });
        }

        let expected_crc = u32::from_le_bytes([header[8], header[9], header[10], header[11]]);
        let mut body = vec![0u8; length];
        if self.fill(&mut body)? < length {
            self.torn = true;
            return Ok(None);
        }

        let actual_crc = crc32c(&body);
        if actual_crc != expected_crc {
            return Err(WalError::CrcMismatch {
                expected: expected_crc,
                got: actual_crc,
            });
        }

        let record = WalRecord::decode_body(&body)?;
        self.offset += (FRAME_HEADER_LEN + length) as u64;
        Ok(Some(record))
    }

    /// Byte offset just past the last complete record.
    pub fn offset(&self) -> u64 {
        self.offset
    }

    /// Returns `true` if the input ended inside a record.
    pub fn is_torn(&self) -> bool {
        self.torn
    }

    fn fill(&mut self, buf: &mut [u8]) -> Result<usize, WalError> {
        let mut read = 0usize;
        while read < buf.len() {
            let n = self
                .reader
                .read(&mut buf[read..])
                .map_err(|source| WalError::Io { path: None, source })?;
            if n == 0 {
                break;
            }
            read += n;
        }
        Ok(read)
    }
}

/// Encodes one record as a frame.
pub fn encode_frame(record: &WalRecord, max_record_bytes: usize) -> Result<Vec<u8>, WalError> {
    let body = record.encode_body()?;
    if body.len() > max_record_bytes {
        return Err(WalError::RecordTooLarge {
            max_bytes: max_record_bytes,
            got_bytes: body.len(),
        });
    }

    let length = u32::try_from(body.len()).map_err(|_| WalError::LengthInvalid {
        reason: "record length exceeds u32".to_string(),
    })?;
    let crc = crc32c(&body);

    let mut buf = Vec::with_capacity(FRAME_HEADER_LEN + body.len());
    buf.extend_from_slice(&FRAME_MAGIC.to_le_bytes());
    buf.extend_from_slice(&length.to_le_bytes());
    buf.extend_from_slice(&crc.to_le_bytes());
    buf.extend_from_slice(&body);
    Ok(buf)
}
