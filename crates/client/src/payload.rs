//! Payload items and normalization of the send input shapes.
//!
//! Every way of attaching content to a message is one [`SendInput`] variant, and
//! [`normalize`] is the single place that turns any of them into the ordered
//! `Vec<PayloadItem>` the send collaborator consumes.

use std::fmt;
use std::io::{self, Cursor, ErrorKind};
use std::path::{Path, PathBuf};

use bytes::Bytes;
use tokio::io::{AsyncRead, AsyncReadExt};
use tracing::debug;

use crate::error::{FiksIoError, FiksIoResult};

/// A read-once byte stream owned by a payload item
pub type PayloadStream = Box<dyn AsyncRead + Send + Unpin>;

/// Upper bound on what a declared length may preallocate.
const MAX_PREALLOCATION: u64 = 8 * 1024 * 1024;

/// One named unit of content attached to a send.
///
/// The stream is dropped, and with it any file handle it wraps, when the item is
/// consumed or discarded by the send path.
pub struct PayloadItem {
    filename: String,
    content: PayloadStream,
    length: Option<u64>,
}

impl PayloadItem {
    pub fn new(filename: impl Into<String>, content: impl AsyncRead + Send + Unpin + 'static) -> Self {
        Self {
            filename: filename.into(),
            content: Box::new(content),
            length: None,
        }
    }

    /// An in-memory item; its length is known up front.
    pub fn from_bytes(filename: impl Into<String>, bytes: impl Into<Bytes>) -> Self {
        let bytes = bytes.into();
        let length = bytes.len() as u64;
        Self {
            filename: filename.into(),
            content: Box::new(Cursor::new(bytes)),
            length: Some(length),
        }
    }

    pub fn with_length(mut self, length: u64) -> Self {
        self.length = Some(length);
        self
    }

    pub fn filename(&self) -> &str {
        &self.filename
    }

    /// Byte length when known without reading the stream
    pub fn length(&self) -> Option<u64> {
        self.length
    }

    pub fn into_parts(self) -> (String, PayloadStream) {
        (self.filename, self.content)
    }

    /// Drain the stream into memory. The declared length is only a sizing hint.
    pub async fn read_to_end(self) -> FiksIoResult<Vec<u8>> {
        let hint = self.length.unwrap_or(0).min(MAX_PREALLOCATION) as usize;
        let (_, mut content) = self.into_parts();

        let mut buffer = Vec::new();
        if buffer.try_reserve(hint).is_err() {
            debug!(hint, "skipping preallocation for payload");
        }
        content.read_to_end(&mut buffer).await?;
        Ok(buffer)
    }
}

impl fmt::Debug for PayloadItem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PayloadItem")
            .field("filename", &self.filename)
            .field("length", &self.length)
            .finish_non_exhaustive()
    }
}

/// The shapes a caller can hand to `send`.
pub enum SendInput {
    /// A pre-built list, passed through in caller order. May be empty.
    Payloads(Vec<PayloadItem>),
    /// A caller-owned stream wrapped verbatim.
    Stream {
        content: PayloadStream,
        filename: String,
    },
    /// Text sent as UTF-8 bytes.
    Text { text: String, filename: String },
    /// A file opened by the normalizer; the filename is the last path segment.
    File(PathBuf),
}

impl SendInput {
    /// A send without any payload
    pub fn none() -> Self {
        Self::Payloads(Vec::new())
    }

    pub fn stream(
        content: impl AsyncRead + Send + Unpin + 'static,
        filename: impl Into<String>,
    ) -> Self {
        Self::Stream {
            content: Box::new(content),
            filename: filename.into(),
        }
    }

    pub fn text(text: impl Into<String>, filename: impl Into<String>) -> Self {
        Self::Text {
            text: text.into(),
            filename: filename.into(),
        }
    }

    pub fn file(path: impl Into<PathBuf>) -> Self {
        Self::File(path.into())
    }
}

impl Default for SendInput {
    fn default() -> Self {
        Self::none()
    }
}

impl From<Vec<PayloadItem>> for SendInput {
    fn from(payloads: Vec<PayloadItem>) -> Self {
        Self::Payloads(payloads)
    }
}

impl From<PayloadItem> for SendInput {
    fn from(payload: PayloadItem) -> Self {
        Self::Payloads(vec![payload])
    }
}

impl fmt::Debug for SendInput {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Payloads(payloads) => f.debug_tuple("Payloads").field(payloads).finish(),
            Self::Stream { filename, .. } => f
                .debug_struct("Stream")
                .field("filename", filename)
                .finish_non_exhaustive(),
            Self::Text { text, filename } => f
                .debug_struct("Text")
                .field("filename", filename)
                .field("bytes", &text.len())
                .finish(),
            Self::File(path) => f.debug_tuple("File").field(path).finish(),
        }
    }
}

/// Turn any [`SendInput`] into the ordered payload sequence for one send.
pub async fn normalize(input: SendInput) -> FiksIoResult<Vec<PayloadItem>> {
    let payloads = match input {
        SendInput::Payloads(payloads) => payloads,
        SendInput::Stream { content, filename } => vec![PayloadItem {
            filename,
            content,
            length: None,
        }],
        SendInput::Text { text, filename } => {
            vec![PayloadItem::from_bytes(filename, Bytes::from(text.into_bytes()))]
        }
        SendInput::File(path) => vec![open_file(&path).await?],
    };

    if let Some(unnamed) = payloads.iter().position(|item| item.filename.is_empty()) {
        return Err(FiksIoError::invalid_request(format!(
            "payload at position {unnamed} has an empty filename"
        )));
    }

    debug!(count = payloads.len(), "normalized payloads");
    Ok(payloads)
}

async fn open_file(path: &Path) -> FiksIoResult<PayloadItem> {
    let filename = path
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .ok_or_else(|| {
            FiksIoError::invalid_request(format!("path {} has no file name", path.display()))
        })?;

    let file = tokio::fs::File::open(path).await?;
    let metadata = file.metadata().await?;
    if !metadata.is_file() {
        return Err(FiksIoError::Io(io::Error::new(
            ErrorKind::InvalidInput,
            format!("{} is not a regular file", path.display()),
        )));
    }
    let length = metadata.len();
    debug!(path = %path.display(), length, "opened payload file");

    Ok(PayloadItem::new(filename, file).with_length(length))
}
