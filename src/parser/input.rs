use std::rc::Rc;

use crate::{buf::XmlBuf, entity::XmlEntity, parser::LINE_LEN};
#[cfg(feature = "libxml_push")]
use crate::parser::XML_MAX_HUGE_LENGTH;

/// An input frame of the parser: either the document itself or the
/// replacement text of an entity being expanded.
///
/// The frame owns its bytes; `cur` is the index of the current parse
/// position within them. The frames live in the context's input stack and
/// the top frame is the one the cursor primitives operate on.
#[doc(alias = "xmlParserInput")]
pub struct XmlParserInput {
    /// The stored bytes of this frame.
    pub(crate) buf: XmlBuf,
    /// Current position, as an index into `buf`.
    pub(crate) cur: usize,
    /// Bytes already discarded from the head of `buf`.
    pub(crate) consumed: u64,
    /// An identifier unique among the inputs of one parse. Two positions
    /// belong to the same physical entity iff their frame ids match.
    pub(crate) id: i32,
    /// Current line, 1-based.
    pub(crate) line: i32,
    /// Current column, 1-based.
    pub(crate) col: i32,
    /// The entity this frame expands, `None` for the document frame.
    pub(crate) entity: Option<Rc<XmlEntity>>,
    /// `consumed` of the whole stack below this frame when it was pushed,
    /// used to attribute expansion cost when the frame is popped.
    pub(crate) parent_consumed: u64,
}

impl XmlParserInput {
    /// Create the document frame over an in-memory buffer.
    #[doc(alias = "xmlNewInputFromMemory")]
    pub(crate) fn from_memory(buffer: Vec<u8>, id: i32) -> Self {
        let mut buf = XmlBuf::new();
        // infallible: the buffer carries no limit yet
        let _ = buf.push_bytes(&buffer);
        Self {
            buf,
            cur: 0,
            consumed: 0,
            id,
            line: 1,
            col: 1,
            entity: None,
            parent_consumed: 0,
        }
    }

    /// Create an empty frame to be fed progressively. Unconsumed chunks
    /// accumulate here, so growth is capped until huge mode lifts it.
    #[cfg(feature = "libxml_push")]
    pub(crate) fn new_push(id: i32) -> Self {
        Self {
            buf: XmlBuf::with_limit(XML_MAX_HUGE_LENGTH),
            cur: 0,
            consumed: 0,
            id,
            line: 1,
            col: 1,
            entity: None,
            parent_consumed: 0,
        }
    }

    /// Create a frame over the replacement text of `entity`.
    #[doc(alias = "xmlNewEntityInputStream")]
    pub(crate) fn from_entity(entity: Rc<XmlEntity>, id: i32) -> Self {
        let mut buf = XmlBuf::new();
        if let Some(content) = entity.content.as_deref() {
            let _ = buf.push_bytes(content.as_bytes());
        }
        Self {
            buf,
            cur: 0,
            consumed: 0,
            id,
            line: 1,
            col: 1,
            entity: Some(entity),
            parent_consumed: 0,
        }
    }

    /// The not-yet-consumed bytes of this frame.
    pub(crate) fn content_bytes(&self) -> &[u8] {
        &self.buf.as_slice()[self.cur..]
    }

    pub(crate) fn remaining_len(&self) -> usize {
        self.buf.len() - self.cur
    }

    /// Total bytes consumed from this frame since it was created.
    pub(crate) fn offset_from_base(&self) -> u64 {
        self.consumed + self.cur as u64
    }

    /// Discard the consumed head of the buffer, keeping a short tail before
    /// the current position for error context. Returns the number of bytes
    /// removed, so the caller can re-base any saved buffer offsets.
    #[doc(alias = "xmlParserShrink")]
    pub(crate) fn shrink(&mut self) -> usize {
        if self.cur <= LINE_LEN {
            return 0;
        }
        let n = self.buf.trim_head(self.cur - LINE_LEN);
        self.cur -= n;
        self.consumed += n as u64;
        n
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn shrink_keeps_context_tail() {
        let mut input = XmlParserInput::from_memory(vec![b'x'; 1000], 1);
        input.cur = 500;
        let removed = input.shrink();
        assert_eq!(removed, 500 - LINE_LEN);
        assert_eq!(input.cur, LINE_LEN);
        assert_eq!(input.consumed, removed as u64);
        assert_eq!(input.offset_from_base(), 500);
        assert_eq!(input.remaining_len(), 500);
    }

    #[test]
    fn shrink_is_noop_near_base() {
        let mut input = XmlParserInput::from_memory(b"<doc/>".to_vec(), 1);
        input.cur = 3;
        assert_eq!(input.shrink(), 0);
        assert_eq!(input.cur, 3);
    }

    #[cfg(feature = "libxml_push")]
    #[test]
    fn push_frame_caps_its_growth() {
        let input = XmlParserInput::new_push(1);
        assert_eq!(input.buf.limit(), XML_MAX_HUGE_LENGTH);
    }
}
