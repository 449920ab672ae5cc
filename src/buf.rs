//! Growable byte buffer backing an input frame.
//!
//! Growth is bounded: once a limit is set, appending past it is an error
//! rather than an allocation, which is what keeps pathological push input
//! from ballooning memory before the parser ever looks at it.

use anyhow::{Context, Result, bail, ensure};

/// A bounded growable byte buffer.
#[doc(alias = "xmlBuf")]
#[derive(Debug, Clone, Default)]
pub struct XmlBuf {
    data: Vec<u8>,
    /// Maximum number of stored bytes, 0 means unlimited.
    max_size: usize,
}

impl XmlBuf {
    pub fn new() -> Self {
        Self {
            data: Vec::new(),
            max_size: 0,
        }
    }

    pub fn with_limit(max_size: usize) -> Self {
        Self {
            data: Vec::new(),
            max_size,
        }
    }

    /// Remove the stored-size limit. Used when huge-document mode is set.
    pub fn remove_limit(&mut self) {
        self.max_size = 0;
    }

    /// The current stored-size limit, 0 when unlimited.
    pub fn limit(&self) -> usize {
        self.max_size
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    pub fn as_slice(&self) -> &[u8] {
        &self.data
    }

    /// Append `bytes`, failing without a partial write when the limit would
    /// be exceeded.
    #[doc(alias = "xmlBufAdd")]
    pub fn push_bytes(&mut self, bytes: &[u8]) -> Result<()> {
        if bytes.is_empty() {
            return Ok(());
        }
        if self.max_size != 0 {
            let Some(new_len) = self.data.len().checked_add(bytes.len()) else {
                bail!("buffer length overflow");
            };
            ensure!(
                new_len <= self.max_size,
                "buffer limit exceeded: {} + {} > {}",
                self.data.len(),
                bytes.len(),
                self.max_size
            );
        }
        self.data
            .try_reserve(bytes.len())
            .context("buffer allocation failed")?;
        self.data.extend_from_slice(bytes);
        Ok(())
    }

    /// Discard the first `n` bytes. Returns the number actually removed.
    #[doc(alias = "xmlBufShrink")]
    pub fn trim_head(&mut self, n: usize) -> usize {
        let n = n.min(self.data.len());
        if n > 0 {
            self.data.drain(..n);
        }
        n
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn push_and_trim() {
        let mut buf = XmlBuf::new();
        buf.push_bytes(b"<root>").unwrap();
        buf.push_bytes(b"</root>").unwrap();
        assert_eq!(buf.as_slice(), b"<root></root>");
        assert_eq!(buf.trim_head(6), 6);
        assert_eq!(buf.as_slice(), b"</root>");
        assert_eq!(buf.trim_head(100), 7);
        assert!(buf.is_empty());
    }

    #[test]
    fn limit_is_enforced() {
        let mut buf = XmlBuf::with_limit(8);
        buf.push_bytes(b"12345678").unwrap();
        assert!(buf.push_bytes(b"9").is_err());
        // a failed append must not partially write
        assert_eq!(buf.len(), 8);
        buf.remove_limit();
        buf.push_bytes(b"9").unwrap();
        assert_eq!(buf.len(), 9);
    }
}
