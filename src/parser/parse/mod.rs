//! The pull-mode parsers, one module per family of productions.
//!
//! As much as possible the functions are associated with their relative
//! production in the XML specification.

mod attribute;
pub(crate) mod cdata;
mod comment;
pub mod dtd;
mod element;
mod entity;
mod literal;
mod names;
mod pi;
mod reference;
mod xmldecl;

use std::str::from_utf8;

pub(crate) use attribute::*;
pub use dtd::*;
pub(crate) use element::*;
pub(crate) use entity::*;
pub(crate) use names::*;
pub(crate) use reference::*;

use crate::{
    error::XmlParserErrors,
    parser::{
        XML_DEFAULT_VERSION, XmlParserCtxt, XmlParserInputState, xml_fatal_err, xml_fatal_err_msg,
        xml_fatal_err_msg_str_int_str, xml_is_blank_char, xml_is_char,
    },
};

/// Character data is flushed to the handler in slices of roughly this size,
/// so unbounded text never accumulates in memory.
const CHARDATA_CHUNK_LENGTH: usize = 4096;

impl XmlParserCtxt<'_> {
    /// Parse an XML document and deliver it to the SAX handler.
    ///
    /// ```text
    /// [1] document ::= prolog element Misc*
    /// [22] prolog ::= XMLDecl? Misc* (doctypedecl Misc*)?
    /// ```
    ///
    /// Returns 0, -1 in case of error. The parser context is augmented
    /// as a result of the parsing.
    #[doc(alias = "xmlParseDocument")]
    pub fn parse_document(&mut self) -> i32 {
        if self.input().is_none() {
            return -1;
        }

        self.grow();
        if matches!(self.instate, XmlParserInputState::XmlParserEOF) {
            return -1;
        }

        // A leading UTF-8 byte-order mark carries no content.
        if self.content_bytes().starts_with(b"\xEF\xBB\xBF") {
            self.advance(3);
        }

        self.grow();
        if self.content_bytes().starts_with(b"<?xml") && xml_is_blank_char(self.nth_byte(5) as u32)
        {
            self.parse_xmldecl();
            if matches!(self.instate, XmlParserInputState::XmlParserEOF) {
                return -1;
            }
            self.skip_blanks();
        } else {
            self.version = Some(XML_DEFAULT_VERSION.to_owned());
        }
        if self.disable_sax == 0 {
            if let Some(sax) = self.sax.as_deref_mut() {
                sax.start_document();
            }
        }
        if matches!(self.instate, XmlParserInputState::XmlParserEOF) {
            return -1;
        }

        // The Misc part of the Prolog
        self.parse_misc();

        // Then possibly doc type declaration(s) and more Misc
        // (doctypedecl Misc*)?
        self.grow();
        if self.content_bytes().starts_with(b"<!DOCTYPE") {
            self.in_subset = 1;
            self.parse_doctypedecl();
            if self.current_byte() == b'[' {
                self.instate = XmlParserInputState::XmlParserDTD;
                self.parse_internal_subset();
                if matches!(self.instate, XmlParserInputState::XmlParserEOF) {
                    return -1;
                }
            }
            self.in_subset = 0;
            self.clean_special_attr();
            self.instate = XmlParserInputState::XmlParserProlog;
            self.parse_misc();
        }

        // Time to start parsing the tree itself
        self.grow();
        if self.current_byte() != b'<' {
            xml_fatal_err_msg(
                self,
                XmlParserErrors::XmlErrDocumentEmpty,
                "Start tag expected, '<' not found\n",
            );
        } else {
            self.instate = XmlParserInputState::XmlParserContent;
            self.parse_element();
            self.instate = XmlParserInputState::XmlParserEpilog;

            // The Misc part at the end
            self.parse_misc();

            if self.current_byte() != 0 {
                xml_fatal_err(self, XmlParserErrors::XmlErrDocumentEnd, None);
            }
            self.instate = XmlParserInputState::XmlParserEOF;
        }

        // SAX: end of the document processing.
        if let Some(sax) = self.sax.as_deref_mut() {
            sax.end_document();
        }

        if !self.well_formed {
            return -1;
        }
        0
    }

    /// Parse an XML Misc* optional field.
    ///
    /// ```text
    /// [27] Misc ::= Comment | PI |  S
    /// ```
    #[doc(alias = "xmlParseMisc")]
    pub(crate) fn parse_misc(&mut self) {
        while !matches!(self.instate, XmlParserInputState::XmlParserEOF) {
            self.skip_blanks();
            self.grow();
            if self.content_bytes().starts_with(b"<?") {
                self.parse_pi();
            } else if self.content_bytes().starts_with(b"<!--") {
                self.parse_comment();
            } else {
                break;
            }
        }
    }

    /// Parse an XML element: the start tag, its content and the end tag.
    ///
    /// ```text
    /// [39] element ::= EmptyElemTag | STag content ETag
    ///
    /// [ WFC: Element Type Match ]
    /// The Name in an element's end-tag must match the element type in the start-tag.
    /// ```
    #[doc(alias = "xmlParseElement")]
    pub(crate) fn parse_element(&mut self) {
        if parse_element_start(self) != 0 {
            return;
        }

        self.parse_content_internal();
        if matches!(self.instate, XmlParserInputState::XmlParserEOF) {
            return;
        }

        if self.current_byte() == 0 {
            if let Some(tag) = self.name_tab.last() {
                let name = tag.name.clone();
                let line = tag.line;
                xml_fatal_err_msg_str_int_str!(
                    self,
                    XmlParserErrors::XmlErrTagNotFinished,
                    "Premature end of data in tag {} line {}\n",
                    &*name,
                    line
                );
            }
            return;
        }

        parse_element_end(self);
    }

    /// Parse a content sequence. Stops at EOF or '</'. Leaves checking of
    /// unexpected EOF to the caller.
    #[doc(alias = "xmlParseContentInternal")]
    pub(crate) fn parse_content_internal(&mut self) {
        let name_nr = self.name_tab.len();

        self.grow();
        while !matches!(self.instate, XmlParserInputState::XmlParserEOF) {
            // Pop-up of finished entities.
            while self.current_byte() == 0 && self.input_tab.len() > 1 {
                self.pop_finished_entity();
            }
            if self.current_byte() == 0 {
                break;
            }

            let mark = self
                .input()
                .map(|input| (input.id, input.offset_from_base(), self.input_tab.len()));

            let content = self.content_bytes();
            // First case : a Processing Instruction.
            if content.starts_with(b"<?") {
                self.parse_pi();
            }
            // Second case : a CDSection
            else if content.starts_with(b"<![CDATA[") {
                self.parse_cdsect();
            }
            // Third case :  a comment
            else if content.starts_with(b"<!--") {
                self.parse_comment();
                self.instate = XmlParserInputState::XmlParserContent;
            }
            // Fourth case :  a sub-element.
            else if content.starts_with(b"</") {
                if self.name_tab.len() <= name_nr {
                    break;
                }
                parse_element_end(self);
            } else if content.starts_with(b"<") {
                parse_element_start(self);
            }
            // Fifth case : a reference. If if has not been resolved,
            //    parsing returns it's Name, create the node
            else if content.starts_with(b"&") {
                self.parse_reference();
            }
            // Last case, text. Note that References are handled directly.
            else {
                self.parse_char_data_internal(false);
            }

            self.shrink();
            self.grow();

            // A dispatch that consumed nothing would loop forever, stop
            // right away instead.
            if !matches!(self.instate, XmlParserInputState::XmlParserEOF)
                && mark
                    == self
                        .input()
                        .map(|input| (input.id, input.offset_from_base(), self.input_tab.len()))
            {
                xml_fatal_err_msg(
                    self,
                    XmlParserErrors::XmlErrInternalError,
                    "detected an error in element content\n",
                );
                self.halt();
                break;
            }
        }
    }

    /// Parse a content sequence. Stops at EOF or '</'.
    ///
    /// ```text
    /// [43] content ::= (element | CharData | Reference | CDSect | PI | Comment)*
    /// ```
    #[doc(alias = "xmlParseContent")]
    pub fn parse_content(&mut self) {
        let name_nr = self.name_tab.len();

        self.parse_content_internal();

        if !matches!(self.instate, XmlParserInputState::XmlParserEOF)
            && self.name_tab.len() > name_nr
        {
            let tag = &self.name_tab[self.name_tab.len() - 1];
            let name = tag.name.clone();
            let line = tag.line;
            xml_fatal_err_msg_str_int_str!(
                self,
                XmlParserErrors::XmlErrTagNotFinished,
                "Premature end of data in tag {} line {}\n",
                &*name,
                line
            );
        }
    }

    /// Whether `s` can be reported as ignorable whitespace rather than
    /// character data. `blank_chars` tells whether the caller already knows
    /// the string is all blanks.
    #[doc(alias = "areBlanks")]
    fn are_blanks(&self, s: &str, blank_chars: bool) -> bool {
        // Check for xml:space handling first
        if self.space() == 1 {
            return false;
        }
        if self.space() == -2 {
            return true;
        }

        if !blank_chars && !s.chars().all(|c| xml_is_blank_char(c as u32)) {
            return false;
        }

        // Outside the root element all blanks are handled by parse_misc
        if self.name_tab.is_empty() {
            return false;
        }
        // Blanks directly followed by markup separate structure, blanks
        // followed by text are part of mixed content.
        self.current_byte() == b'<'
    }

    /// Deliver accumulated character data through the right callback.
    fn flush_char_data(&mut self, buf: &str) {
        if buf.is_empty() || self.disable_sax != 0 {
            return;
        }
        let blank = buf.chars().all(|c| xml_is_blank_char(c as u32));
        let ignorable = blank && !self.keep_blanks && self.are_blanks(buf, true);
        if let Some(sax) = self.sax.as_deref_mut() {
            if ignorable {
                sax.ignorable_whitespace(buf);
            } else {
                sax.characters(buf);
            }
        }
    }

    /// Parse character data. Always makes progress if the first char isn't
    /// '<' or '&'.
    ///
    /// ```text
    /// [14] CharData ::= [^<&]* - ([^<&]* ']]>' [^<&]*)
    /// ```
    ///
    /// The right angle bracket (>) may be represented using the string
    /// "&gt;", and must, for compatibility, be escaped using "&gt;" or a
    /// character reference when it appears in the string "]]>" in content,
    /// when that string is not marking the end of a CDATA section.
    ///
    /// In `partial` mode (progressive parsing) the function stops in front
    /// of an incomplete construct instead of reporting it.
    #[doc(alias = "xmlParseCharDataInternal")]
    pub(crate) fn parse_char_data_internal(&mut self, partial: bool) {
        let mut buf = String::new();
        loop {
            // Accelerated path for the printable ASCII run.
            let content = self.content_bytes();
            let run = content
                .iter()
                .take_while(|&&b| {
                    b != b'<'
                        && b != b'&'
                        && b != b']'
                        && b != b'\r'
                        && (b == b'\t' || b == b'\n' || (0x20..0x80).contains(&b))
                })
                .count();
            if run > 0 {
                if let Ok(scanned) = from_utf8(&content[..run]) {
                    buf.push_str(scanned);
                }
                self.advance_with_line_handling(run);
            }

            match self.current_byte() {
                0 | b'<' | b'&' => break,
                b']' => {
                    let rem = self.content_bytes();
                    if rem.starts_with(b"]]>") {
                        xml_fatal_err(self, XmlParserErrors::XmlErrMisplacedCDATAEnd, None);
                        self.advance(1);
                        break;
                    }
                    if partial && rem.len() < 3 {
                        // Maybe a truncated "]]>", wait for the next chunk.
                        break;
                    }
                    buf.push(']');
                    self.advance(1);
                }
                b'\r' => {
                    if partial && self.content_bytes().len() < 2 {
                        break;
                    }
                    // 2.11 End-of-Line Handling
                    buf.push('\n');
                    self.skip_char();
                }
                _ => {
                    if partial {
                        let rem = self.content_bytes();
                        if rem.len() < 4
                            && from_utf8(rem).is_err_and(|e| e.error_len().is_none())
                        {
                            // A multi-byte sequence cut by the chunk boundary,
                            // wait for the continuation bytes.
                            break;
                        }
                    }
                    // Multi-byte or invalid characters go through the
                    // checked reader.
                    let Some((c, _)) = self.current_char() else {
                        break;
                    };
                    if matches!(self.instate, XmlParserInputState::XmlParserEOF) {
                        break;
                    }
                    if xml_is_char(c as u32) {
                        buf.push(c);
                    }
                    self.skip_char();
                }
            }

            if buf.len() >= CHARDATA_CHUNK_LENGTH {
                let chunk = std::mem::take(&mut buf);
                self.flush_char_data(&chunk);
            }
        }
        let rest = std::mem::take(&mut buf);
        self.flush_char_data(&rest);
    }
}

#[cfg(test)]
mod tests {
    use std::cell::RefCell;

    use crate::{
        error::XmlParserErrors,
        parser::{XmlParserOption, xml_read_memory},
        sax::{SaxAttribute, SaxNamespace, XmlSaxHandler},
    };

    /// Records the stream of callbacks as readable strings.
    #[derive(Default)]
    struct EventSink {
        events: RefCell<Vec<String>>,
    }

    impl EventSink {
        fn push(&self, ev: String) {
            self.events.borrow_mut().push(ev);
        }
    }

    impl XmlSaxHandler for EventSink {
        fn start_element_ns(
            &mut self,
            local_name: &str,
            prefix: Option<&str>,
            _uri: Option<&str>,
            _namespaces: &[SaxNamespace],
            attributes: &[SaxAttribute],
        ) {
            let mut s = format!("start {}", local_name);
            if let Some(prefix) = prefix {
                s = format!("start {}:{}", prefix, local_name);
            }
            for attr in attributes {
                s.push_str(&format!(" @{}={}", attr.local_name, attr.value));
            }
            self.push(s);
        }

        fn end_element_ns(&mut self, local_name: &str, _prefix: Option<&str>, _uri: Option<&str>) {
            self.push(format!("end {}", local_name));
        }

        fn characters(&mut self, data: &str) {
            self.push(format!("chars {:?}", data));
        }

        fn ignorable_whitespace(&mut self, _data: &str) {
            self.push("ws".to_owned());
        }

        fn cdata_block(&mut self, data: &str) {
            self.push(format!("cdata {:?}", data));
        }

        fn comment(&mut self, content: &str) {
            self.push(format!("comment {:?}", content));
        }

        fn processing_instruction(&mut self, target: &str, _data: Option<&str>) {
            self.push(format!("pi {}", target));
        }

        fn reference(&mut self, name: &str) {
            self.push(format!("ref {}", name));
        }
    }

    fn parse(doc: &str, options: i32) -> (XmlParserErrors, Vec<String>) {
        let mut sink = EventSink::default();
        let code = xml_read_memory(doc.as_bytes().to_vec(), options, &mut sink);
        (code, sink.events.into_inner())
    }

    #[test]
    fn minimal_document() {
        let (code, events) = parse("<doc>text</doc>", 0);
        assert_eq!(code, XmlParserErrors::XmlErrOK);
        assert_eq!(events, ["start doc", "chars \"text\"", "end doc"]);
    }

    #[test]
    fn document_with_declaration_and_misc() {
        let (code, events) = parse(
            "<?xml version=\"1.0\"?>\n<!-- head --><?app data?><doc/><!-- tail -->",
            0,
        );
        assert_eq!(code, XmlParserErrors::XmlErrOK);
        assert_eq!(
            events,
            [
                "comment \" head \"",
                "pi app",
                "start doc",
                "end doc",
                "comment \" tail \""
            ]
        );
    }

    #[test]
    fn nested_elements_and_cdata() {
        let (code, events) = parse("<a><b><![CDATA[<raw>&amp;]]></b></a>", 0);
        assert_eq!(code, XmlParserErrors::XmlErrOK);
        assert_eq!(
            events,
            [
                "start a",
                "start b",
                "cdata \"<raw>&amp;\"",
                "end b",
                "end a"
            ]
        );
    }

    #[test]
    fn char_and_entity_references_in_content() {
        let (code, events) = parse("<d>a&#x26;b&amp;c</d>", 0);
        assert_eq!(code, XmlParserErrors::XmlErrOK);
        assert_eq!(
            events,
            [
                "start d",
                "chars \"a\"",
                "chars \"&\"",
                "chars \"b\"",
                "chars \"&\"",
                "chars \"c\"",
                "end d"
            ]
        );
    }

    #[test]
    fn misplaced_cdata_end_is_fatal() {
        let (code, _) = parse("<d>a]]>b</d>", 0);
        assert_ne!(code, XmlParserErrors::XmlErrOK);
    }

    #[test]
    fn crlf_in_text_folds_to_newline() {
        let (code, events) = parse("<d>a\r\nb</d>", 0);
        assert_eq!(code, XmlParserErrors::XmlErrOK);
        assert_eq!(events, ["start d", "chars \"a\\nb\"", "end d"]);
    }

    #[test]
    fn empty_document_is_rejected() {
        let (code, _) = parse("   ", 0);
        assert_eq!(code, XmlParserErrors::XmlErrDocumentEmpty);
    }

    #[test]
    fn trailing_garbage_is_rejected() {
        let (code, _) = parse("<d/>trailing", 0);
        assert_eq!(code, XmlParserErrors::XmlErrDocumentEnd);
    }

    #[test]
    fn blanks_between_elements_are_ignorable_without_keep_blanks() {
        let (code, events) = parse(
            "<a>\n  <b/>\n</a>",
            XmlParserOption::XmlParseNoBlanks as i32,
        );
        assert_eq!(code, XmlParserErrors::XmlErrOK);
        assert_eq!(events, ["start a", "ws", "start b", "end b", "ws", "end a"]);
    }

    #[test]
    fn internal_entities_expand_in_content() {
        let doc = "<!DOCTYPE d [<!ENTITY greet \"hi &amp; bye\">]><d>&greet;</d>";
        let (code, events) = parse(doc, XmlParserOption::XmlParseNoEnt as i32);
        assert_eq!(code, XmlParserErrors::XmlErrOK);
        assert!(events.contains(&"chars \"hi \"".to_owned()) || events.iter().any(|e| e.contains("hi ")));
        assert_eq!(events.last().unwrap(), "end d");
    }

    #[test]
    fn unreplaced_entities_surface_as_references() {
        let doc = "<!DOCTYPE d [<!ENTITY e \"v\">]><d>&e;</d>";
        let (code, events) = parse(doc, 0);
        assert_eq!(code, XmlParserErrors::XmlErrOK);
        assert_eq!(events, ["start d", "ref e", "end d"]);
    }
}
