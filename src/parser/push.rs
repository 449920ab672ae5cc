//! The progressive (push) driver.
//!
//! Feeding arbitrary chunks means any construct can be cut at any byte, so
//! each state first checks that its construct is complete in the buffered
//! input (the `lookup_*` helpers, memoized through `check_index`) and only
//! then hands over to the pull-mode parsers.

use crate::{
    error::XmlParserErrors,
    parser::{
        XML_DEFAULT_VERSION, XML_MAX_LOOKUP_LIMIT, XML_PARSER_BIG_BUFFER_SIZE, XmlParserCtxt,
        XmlParserInput, XmlParserInputState, XmlParserOption,
        parse::{cdata::check_cdata_push, parse_element_end, parse_element_start},
        xml_fatal_err, xml_fatal_err_msg, xml_fatal_err_msg_str, xml_is_blank_char,
    },
    sax::XmlSaxHandler,
};

impl<'sax> XmlParserCtxt<'sax> {
    /// Create a context for using the XML parser in push mode.
    /// The data is fed afterwards through `xml_parse_chunk`.
    #[doc(alias = "xmlCreatePushParserCtxt")]
    pub fn new_push_parser(sax: Option<&'sax mut dyn XmlSaxHandler>) -> Self {
        let mut ctxt = Self::new_sax_parser(sax);
        let id = ctxt.next_input_id();
        ctxt.input_push(XmlParserInput::new_push(id));
        ctxt.progressive = true;
        ctxt
    }
}

impl XmlParserCtxt<'_> {
    /// Check whether the input buffer contains a character.
    #[doc(alias = "xmlParseLookupChar")]
    fn lookup_char(&mut self, c: u8) -> bool {
        let content = self.content_bytes();
        let start = (self.check_index as usize).max(1).min(content.len());

        if content[start..].contains(&c) {
            self.check_index = 0;
            true
        } else {
            self.check_index = content.len() as i64;
            false
        }
    }

    /// Check whether the input buffer contains terminated char data.
    #[doc(alias = "xmlParseLookupCharData")]
    fn lookup_char_data(&mut self) -> bool {
        let content = self.content_bytes();
        let start = (self.check_index as usize).min(content.len());

        if content[start..]
            .iter()
            .any(|&b| b == b'<' || b == b'&')
        {
            self.check_index = 0;
            true
        } else {
            self.check_index = content.len() as i64;
            false
        }
    }

    /// Check whether the input buffer contains a string.
    ///
    /// If found, returns the offset of the match within the current content.
    #[doc(alias = "xmlParseLookupString")]
    fn lookup_string(&mut self, start_delta: usize, s: &str) -> Option<usize> {
        let content = self.content_bytes();
        let start = if self.check_index == 0 {
            start_delta.min(content.len())
        } else {
            (self.check_index as usize).min(content.len())
        };
        let cur = &content[start..];

        if let Some(term) = cur.windows(s.len()).position(|chunk| chunk == s.as_bytes()) {
            self.check_index = 0;
            Some(start + term)
        } else {
            // Rescan (strLen - 1) characters next time, the terminator may
            // be cut by the chunk boundary.
            self.check_index = (content.len() - cur.len().min(s.len() - 1)) as i64;
            None
        }
    }

    /// Check whether there's enough data in the input buffer to finish parsing
    /// a start tag. This has to take quotes into account.
    #[doc(alias = "xmlParseLookupGt")]
    fn lookup_gt(&mut self) -> bool {
        let content = self.content_bytes();
        let start = if self.check_index == 0 {
            1.min(content.len())
        } else {
            (self.check_index as usize).min(content.len())
        };

        let mut state = self.end_check_state as u8;
        for &b in &content[start..] {
            if state != 0 {
                if b == state {
                    state = 0;
                }
            } else if matches!(b, b'\'' | b'"') {
                state = b;
            } else if b == b'>' {
                self.check_index = 0;
                self.end_check_state = 0;
                return true;
            }
        }

        self.check_index = content.len() as i64;
        self.end_check_state = state as i32;
        false
    }

    /// Check whether there's enough data in the input buffer to finish parsing
    /// the internal subset.
    #[doc(alias = "xmlParseLookupInternalSubset")]
    fn lookup_internal_subset(&mut self) -> bool {
        // Sorry, but progressive parsing of the internal subset is not
        // supported. We first check that the full content of the internal
        // subset is available and parsing is launched only at that point.
        // Internal subset ends with "']' S? '>'" in an unescaped section and
        // not in a ']]>' sequence which are conditional sections.
        let content = self.content_bytes();
        let mut cur = if self.check_index == 0 {
            &content[1.min(content.len())..]
        } else {
            &content[(self.check_index as usize).min(content.len())..]
        };

        let mut start = cur;
        let mut state = self.end_check_state as u8;
        while !cur.is_empty() {
            if state == b'-' {
                if let Some(rem) = cur.strip_prefix(b"-->") {
                    state = 0;
                    cur = rem;
                    start = rem;
                    continue;
                }
            } else if state == b']' {
                if cur[0] == b'>' {
                    self.check_index = 0;
                    self.end_check_state = 0;
                    return true;
                }
                if xml_is_blank_char(cur[0] as u32) {
                    state = b' ';
                } else if cur[0] != b']' {
                    state = 0;
                    start = cur;
                    continue;
                }
            } else if state == b' ' {
                if cur[0] == b'>' {
                    self.check_index = 0;
                    self.end_check_state = 0;
                    return true;
                }
                if !xml_is_blank_char(cur[0] as u32) {
                    state = 0;
                    start = cur;
                    continue;
                }
            } else if state != 0 {
                if cur[0] == state {
                    state = 0;
                    start = &cur[1..];
                }
            } else if let Some(rem) = cur.strip_prefix(b"<!--") {
                state = b'-';
                cur = rem;
                // Don't treat <!--> as comment
                start = rem;
                continue;
            } else if matches!(cur[0], b'"' | b'\'' | b']') {
                state = cur[0];
            }

            cur = &cur[1..];
        }

        // Rescan the last three characters to detect "<!--" and "-->"
        // split across chunks.
        if state == 0 || state == b'-' {
            let diff = start.len() - cur.len();
            if diff < 3 {
                cur = start;
            } else {
                cur = &start[diff - 3..];
            }
        }
        self.check_index = (content.len() - cur.len()) as i64;
        self.end_check_state = state as i32;
        false
    }

    /// The buffered bytes are not proper UTF-8; report the offending bytes.
    fn push_encoding_error(&mut self) {
        let content = self.content_bytes();
        let buffer = format!(
            "Bytes: 0x{:02X} 0x{:02X} 0x{:02X} 0x{:02X}\n",
            content.first().copied().unwrap_or(0),
            content.get(1).copied().unwrap_or(0),
            content.get(2).copied().unwrap_or(0),
            content.get(3).copied().unwrap_or(0),
        );
        xml_fatal_err_msg_str!(
            self,
            XmlParserErrors::XmlErrInvalidChar,
            "Input is not proper UTF-8, indicate encoding !\n{}",
            buffer
        );
    }

    fn end_document_sax(&mut self) {
        if let Some(sax) = self.sax.as_deref_mut() {
            sax.end_document();
        }
    }

    /// Try to progress on parsing
    ///
    /// Returns zero if no parsing was possible
    #[doc(alias = "xmlParseTryOrFinish")]
    fn parse_try_or_finish(&mut self, terminate: bool) -> i32 {
        let mut ret: i32 = 0;

        if self.input().is_none() {
            return 0;
        }

        if self.input().is_some_and(|input| input.cur > 4096) {
            if let Some(input) = self.input_mut() {
                // trims only consumed bytes, content and check_index survive
                input.shrink();
            }
        }

        while !matches!(self.instate, XmlParserInputState::XmlParserEOF) {
            if self.err_no != XmlParserErrors::XmlErrOK as i32 && self.disable_sax == 1 {
                return 0;
            }

            // An entity frame finished on a previous pass is popped here so
            // parsing resumes in the document input, where new chunks land.
            while self.current_byte() == 0 && self.input_tab.len() > 1 {
                self.pop_finished_entity();
            }

            let Some(input) = self.input() else {
                break;
            };
            let mut avail = input.remaining_len();
            if avail < 1 {
                return ret;
            }
            match self.instate {
                XmlParserInputState::XmlParserEOF => {
                    // Document parsing is done !
                    return ret;
                }
                XmlParserInputState::XmlParserStart => {
                    // Very first chars read from the document flow.
                    if avail < 4 && !terminate {
                        return ret;
                    }
                    if self.content_bytes().starts_with(b"\xEF\xBB\xBF") {
                        self.advance(3);
                        continue;
                    }
                    if avail < 2 {
                        return ret;
                    }
                    if self.content_bytes().starts_with(b"<?") {
                        // PI or XML decl
                        if avail < 5 {
                            return ret;
                        }
                        if !terminate && self.lookup_string(2, "?>").is_none() {
                            return ret;
                        }
                        if self.content_bytes()[2..].starts_with(b"xml")
                            && xml_is_blank_char(self.nth_byte(5) as u32)
                        {
                            ret += 5;
                            self.parse_xmldecl();
                            if self.err_no == XmlParserErrors::XmlErrUnsupportedEncoding as i32 {
                                // The XML REC instructs us to stop parsing right here
                                self.halt();
                                return 0;
                            }
                        } else {
                            self.version = Some(XML_DEFAULT_VERSION.to_owned());
                        }
                    } else {
                        self.version = Some(XML_DEFAULT_VERSION.to_owned());
                    }
                    if self.disable_sax == 0 {
                        if let Some(sax) = self.sax.as_deref_mut() {
                            sax.start_document();
                        }
                    }
                    self.instate = XmlParserInputState::XmlParserMisc;
                }
                XmlParserInputState::XmlParserStartTag => {
                    if avail < 2 && self.input_tab.len() == 1 {
                        return ret;
                    }

                    if self.current_byte() != b'<' {
                        xml_fatal_err(self, XmlParserErrors::XmlErrDocumentEmpty, None);
                        self.halt();
                        self.end_document_sax();
                        return ret;
                    }
                    if !terminate && !self.lookup_gt() {
                        return ret;
                    }
                    let res = parse_element_start(self);
                    if matches!(self.instate, XmlParserInputState::XmlParserEOF) {
                        return ret;
                    }
                    if res < 0 {
                        self.halt();
                        self.end_document_sax();
                        return ret;
                    }
                    if self.name_tab.is_empty() {
                        self.instate = XmlParserInputState::XmlParserEpilog;
                    } else {
                        self.instate = XmlParserInputState::XmlParserContent;
                    }
                }
                XmlParserInputState::XmlParserContent => {
                    if avail < 2 && self.input_tab.len() == 1 {
                        return ret;
                    }

                    match self.content_bytes() {
                        [b'<', b'/', ..] => {
                            self.instate = XmlParserInputState::XmlParserEndTag;
                        }
                        [b'<', b'?', ..] => {
                            if !terminate && self.lookup_string(2, "?>").is_none() {
                                return ret;
                            }
                            self.parse_pi();
                            self.instate = XmlParserInputState::XmlParserContent;
                        }
                        [b'<', b, ..] if *b != b'!' => {
                            self.instate = XmlParserInputState::XmlParserStartTag;
                        }
                        [b'<', b'!', b'-', b'-', ..] => {
                            if !terminate && self.lookup_string(4, "-->").is_none() {
                                return ret;
                            }
                            self.parse_comment();
                            self.instate = XmlParserInputState::XmlParserContent;
                        }
                        [b'<', b'!', b'[', b'C', b'D', b'A', b'T', b'A', b'[', ..] => {
                            self.advance(9);
                            self.instate = XmlParserInputState::XmlParserCDATASection;
                        }
                        [b'<', b'!', ..] if avail < 9 => {
                            return ret;
                        }
                        [b'<', ..] => {
                            xml_fatal_err_msg(
                                self,
                                XmlParserErrors::XmlErrInternalError,
                                "detected an error in element content\n",
                            );
                            self.advance(1);
                        }
                        [b'&', ..] => {
                            if !terminate && !self.lookup_char(b';') {
                                return ret;
                            }
                            self.parse_reference();
                        }
                        _ => {
                            // Goal of the following test is:
                            //  - minimize calls to the SAX 'characters' callback
                            //    when they are mergeable
                            //  - handle a problem for isBlank when we only parse
                            //    a sequence of blank chars and the next one is
                            //    not available to check against '<' presence.
                            if self.input_tab.len() == 1
                                && avail < XML_PARSER_BIG_BUFFER_SIZE
                                && !terminate
                                && !self.lookup_char_data()
                            {
                                return ret;
                            }
                            self.check_index = 0;
                            // An entity frame is fully buffered, only the
                            // document frame can be truncated mid-text.
                            self.parse_char_data_internal(!terminate && self.input_tab.len() == 1);
                        }
                    }
                }
                XmlParserInputState::XmlParserEndTag => {
                    if avail < 2 {
                        return ret;
                    }
                    if !terminate && !self.lookup_char(b'>') {
                        return ret;
                    }
                    parse_element_end(self);
                    if matches!(self.instate, XmlParserInputState::XmlParserEOF) {
                        // Nothing
                    } else if self.name_tab.is_empty() {
                        self.instate = XmlParserInputState::XmlParserEpilog;
                    } else {
                        self.instate = XmlParserInputState::XmlParserContent;
                    }
                }
                XmlParserInputState::XmlParserCDATASection => {
                    // The terminator may not be buffered yet; deliver checked
                    // partial blocks so huge sections don't pile up.
                    let term = if terminate {
                        // Don't call lookup_string. If 'terminate' is set,
                        // check_index is invalid.
                        self.content_bytes()
                            .windows(3)
                            .position(|s| s == b"]]>")
                    } else {
                        self.lookup_string(0, "]]>")
                    };

                    if let Some(base) = term {
                        match check_cdata_push(&self.content_bytes()[..base], true) {
                            Ok(tmp) if tmp == base => {}
                            Ok(tmp) | Err(tmp) => {
                                if let Some(input) = self.input_mut() {
                                    input.cur += tmp;
                                }
                                self.push_encoding_error();
                                return 0;
                            }
                        }
                        if self.disable_sax == 0 {
                            if base > 0 {
                                let block =
                                    String::from_utf8(self.content_bytes()[..base].to_vec())
                                        .unwrap_or_default();
                                if let Some(sax) = self.sax.as_deref_mut() {
                                    sax.cdata_block(&block);
                                }
                            } else if self.input().is_some_and(|input| {
                                input.cur >= 9
                                    && &input.buf.as_slice()[input.cur - 9..input.cur]
                                        == b"<![CDATA["
                            }) {
                                // Special case to provide identical behaviour
                                // between pull and push parsers on empty CDATA sections
                                if let Some(sax) = self.sax.as_deref_mut() {
                                    sax.cdata_block("");
                                }
                            }
                        }
                        if matches!(self.instate, XmlParserInputState::XmlParserEOF) {
                            return ret;
                        }
                        self.advance_with_line_handling(base + 3);
                        self.instate = XmlParserInputState::XmlParserContent;
                    } else {
                        let size = if terminate {
                            // Unfinished CDATA section
                            avail
                        } else {
                            if avail < XML_PARSER_BIG_BUFFER_SIZE + 2 {
                                return ret;
                            }
                            self.check_index = 0;
                            XML_PARSER_BIG_BUFFER_SIZE
                        };
                        let tmp = match check_cdata_push(&self.content_bytes()[..size], false) {
                            Ok(tmp) => tmp,
                            Err(tmp) => {
                                if let Some(input) = self.input_mut() {
                                    input.cur += tmp;
                                }
                                self.push_encoding_error();
                                return 0;
                            }
                        };
                        if tmp == 0 && terminate {
                            // A truncated multi-byte sequence would never make
                            // progress again.
                            xml_fatal_err(self, XmlParserErrors::XmlErrCDATANotFinished, None);
                            return ret;
                        }
                        if self.disable_sax == 0 && tmp > 0 {
                            let block = String::from_utf8(self.content_bytes()[..tmp].to_vec())
                                .unwrap_or_default();
                            if let Some(sax) = self.sax.as_deref_mut() {
                                sax.cdata_block(&block);
                            }
                        }
                        if matches!(self.instate, XmlParserInputState::XmlParserEOF) {
                            return ret;
                        }
                        self.advance_with_line_handling(tmp);
                    }
                }
                XmlParserInputState::XmlParserMisc
                | XmlParserInputState::XmlParserProlog
                | XmlParserInputState::XmlParserEpilog => {
                    self.skip_blanks();
                    avail = self.input().map_or(0, |input| input.remaining_len());
                    if avail < 2 {
                        return ret;
                    }

                    match self.content_bytes() {
                        [b'<', b'?', ..] => {
                            if !terminate && self.lookup_string(2, "?>").is_none() {
                                return ret;
                            }
                            self.parse_pi();
                            if matches!(self.instate, XmlParserInputState::XmlParserEOF) {
                                return ret;
                            }
                        }
                        [b'<', b'!', b'-', b'-', ..] => {
                            if !terminate && self.lookup_string(4, "-->").is_none() {
                                return ret;
                            }
                            self.parse_comment();
                            if matches!(self.instate, XmlParserInputState::XmlParserEOF) {
                                return ret;
                            }
                        }
                        [b'<', b'!', b'D', b'O', b'C', b'T', b'Y', b'P', b'E', ..]
                            if matches!(self.instate, XmlParserInputState::XmlParserMisc) =>
                        {
                            if !terminate && !self.lookup_gt() {
                                return ret;
                            }
                            self.in_subset = 1;
                            self.parse_doctypedecl();
                            if matches!(self.instate, XmlParserInputState::XmlParserEOF) {
                                return ret;
                            }
                            if self.current_byte() == b'[' {
                                self.instate = XmlParserInputState::XmlParserDTD;
                            } else {
                                self.in_subset = 0;
                                self.clean_special_attr();
                                self.instate = XmlParserInputState::XmlParserProlog;
                            }
                        }
                        [b'<', b'!', ..]
                            if avail
                                < if matches!(
                                    self.instate,
                                    XmlParserInputState::XmlParserMisc
                                ) {
                                    9
                                } else {
                                    4
                                } =>
                        {
                            return ret;
                        }
                        _ => {
                            if matches!(self.instate, XmlParserInputState::XmlParserEpilog) {
                                xml_fatal_err(self, XmlParserErrors::XmlErrDocumentEnd, None);
                                self.halt();
                                self.end_document_sax();
                                return ret;
                            } else {
                                self.instate = XmlParserInputState::XmlParserStartTag;
                            }
                        }
                    }
                }
                XmlParserInputState::XmlParserDTD => {
                    if !terminate && !self.lookup_internal_subset() {
                        return ret;
                    }
                    self.parse_internal_subset();
                    if matches!(self.instate, XmlParserInputState::XmlParserEOF) {
                        return ret;
                    }
                    self.in_subset = 0;
                    self.clean_special_attr();
                    self.instate = XmlParserInputState::XmlParserProlog;
                }
                // The remaining states are lexical and never survive a return
                // to the driver; recover to the state that contains them.
                XmlParserInputState::XmlParserComment
                | XmlParserInputState::XmlParserPI
                | XmlParserInputState::XmlParserEntityValue => {
                    self.instate = XmlParserInputState::XmlParserContent;
                }
                XmlParserInputState::XmlParserEntityDecl => {
                    self.instate = XmlParserInputState::XmlParserDTD;
                }
                XmlParserInputState::XmlParserAttributeValue
                | XmlParserInputState::XmlParserSystemLiteral
                | XmlParserInputState::XmlParserPublicLiteral => {
                    self.instate = XmlParserInputState::XmlParserStartTag;
                }
            }
        }
        ret
    }
}

/// Parse a Chunk of memory
///
/// Returns zero if no error, the xmlParserErrors otherwise.
#[doc(alias = "xmlParseChunk")]
pub fn xml_parse_chunk(ctxt: &mut XmlParserCtxt, mut chunk: &[u8], terminate: bool) -> i32 {
    let mut end_in_lf = false;

    if ctxt.err_no != XmlParserErrors::XmlErrOK as i32 && ctxt.disable_sax == 1 {
        return ctxt.err_no;
    }
    if matches!(ctxt.instate, XmlParserInputState::XmlParserEOF) {
        return -1;
    }
    if ctxt.input().is_none() {
        return -1;
    }

    ctxt.progressive = true;

    // Hold back a trailing '\r': end-of-line handling needs to know
    // whether a '\n' follows.
    if !terminate && chunk.last() == Some(&b'\r') {
        end_in_lf = true;
        chunk = &chunk[..chunk.len() - 1];
    }

    if !chunk.is_empty() {
        // Chunks always extend the document frame; the top of the input
        // stack may be an entity expansion in progress.
        if let Some(input) = ctxt.input_tab.first_mut() {
            if input.buf.push_bytes(chunk).is_err() {
                ctxt.err_no = XmlParserErrors::XmlErrNoMemory as i32;
                ctxt.halt();
                return XmlParserErrors::XmlErrNoMemory as i32;
            }
        }
    }

    ctxt.parse_try_or_finish(terminate);
    if matches!(ctxt.instate, XmlParserInputState::XmlParserEOF) {
        return ctxt.err_no;
    }

    if ctxt.input().is_some_and(|input| {
        input.remaining_len() > XML_MAX_LOOKUP_LIMIT
            || input.offset_from_base() > XML_MAX_LOOKUP_LIMIT as u64
    }) && ctxt.options & XmlParserOption::XmlParseHuge as i32 == 0
    {
        xml_fatal_err(
            ctxt,
            XmlParserErrors::XmlErrInternalError,
            Some("Huge input lookup"),
        );
        ctxt.halt();
    }
    if ctxt.err_no != XmlParserErrors::XmlErrOK as i32 && ctxt.disable_sax == 1 {
        return ctxt.err_no;
    }

    if end_in_lf {
        if let Some(input) = ctxt.input_tab.first_mut() {
            let _ = input.buf.push_bytes(b"\r");
        }
    }
    if terminate {
        // Check for termination
        if !matches!(
            ctxt.instate,
            XmlParserInputState::XmlParserEOF | XmlParserInputState::XmlParserEpilog
        ) {
            xml_fatal_err(ctxt, XmlParserErrors::XmlErrDocumentEnd, None);
        }
        if matches!(ctxt.instate, XmlParserInputState::XmlParserEpilog)
            && !ctxt.content_bytes().is_empty()
        {
            xml_fatal_err(ctxt, XmlParserErrors::XmlErrDocumentEnd, None);
        }
        if !matches!(ctxt.instate, XmlParserInputState::XmlParserEOF) {
            ctxt.end_document_sax();
        }
        ctxt.instate = XmlParserInputState::XmlParserEOF;
    }
    if ctxt.well_formed { 0 } else { ctxt.err_no }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sax::XmlSaxHandler;

    #[derive(Default)]
    struct EventSink {
        events: Vec<String>,
    }

    impl XmlSaxHandler for EventSink {
        fn start_document(&mut self) {
            self.events.push("startdoc".to_owned());
        }

        fn end_document(&mut self) {
            self.events.push("enddoc".to_owned());
        }

        fn start_element_ns(
            &mut self,
            local_name: &str,
            _prefix: Option<&str>,
            _uri: Option<&str>,
            _namespaces: &[crate::sax::SaxNamespace],
            _attributes: &[crate::sax::SaxAttribute],
        ) {
            self.events.push(format!("start {local_name}"));
        }

        fn end_element_ns(&mut self, local_name: &str, _prefix: Option<&str>, _uri: Option<&str>) {
            self.events.push(format!("end {local_name}"));
        }

        fn characters(&mut self, data: &str) {
            self.events.push(format!("chars {data}"));
        }

        fn cdata_block(&mut self, data: &str) {
            self.events.push(format!("cdata {data}"));
        }
    }

    fn push_all(doc: &str, chunk_size: usize) -> (Vec<String>, i32) {
        let mut sink = EventSink::default();
        let mut last = 0;
        {
            let mut ctxt = XmlParserCtxt::new_push_parser(Some(&mut sink));
            for chunk in doc.as_bytes().chunks(chunk_size) {
                last = xml_parse_chunk(&mut ctxt, chunk, false);
            }
            last = xml_parse_chunk(&mut ctxt, b"", true).max(last);
        }
        (sink.events, last)
    }

    #[test]
    fn single_chunk_document() {
        let (events, code) = push_all("<doc><a>text</a></doc>", 1024);
        assert_eq!(code, 0);
        assert_eq!(
            events,
            [
                "startdoc", "start doc", "start a", "chars text", "end a", "end doc", "enddoc"
            ]
        );
    }

    #[test]
    fn byte_at_a_time_matches_whole_buffer() {
        let doc = "<?xml version=\"1.0\"?><doc attr=\"v\"><child/>tail</doc>";
        let (whole, code_whole) = push_all(doc, doc.len());
        let (bytewise, code_bytes) = push_all(doc, 1);
        assert_eq!(code_whole, 0);
        assert_eq!(code_bytes, 0);
        assert_eq!(whole, bytewise);
    }

    #[test]
    fn cdata_split_across_chunks() {
        let doc = "<d><![CDATA[hello ]] world]]></d>";
        let (events, code) = push_all(doc, 3);
        assert_eq!(code, 0);
        assert!(events.contains(&"cdata hello ]] world".to_owned()));
    }

    #[test]
    fn crlf_split_across_chunks_folds_to_newline() {
        let mut sink = EventSink::default();
        {
            let mut ctxt = XmlParserCtxt::new_push_parser(Some(&mut sink));
            xml_parse_chunk(&mut ctxt, b"<d>a\r", false);
            xml_parse_chunk(&mut ctxt, b"\nb</d>", false);
            xml_parse_chunk(&mut ctxt, b"", true);
        }
        assert!(sink.events.contains(&"chars a\nb".to_owned()));
    }

    #[test]
    fn truncated_document_is_an_error() {
        let mut sink = EventSink::default();
        let code = {
            let mut ctxt = XmlParserCtxt::new_push_parser(Some(&mut sink));
            xml_parse_chunk(&mut ctxt, b"<doc><open>", false);
            xml_parse_chunk(&mut ctxt, b"", true)
        };
        assert_ne!(code, 0);
    }

    #[test]
    fn doctype_with_internal_subset_in_push_mode() {
        let doc = "<!DOCTYPE d [<!ENTITY e \"xyz\">]><d>&e;</d>";
        let mut sink = EventSink::default();
        {
            let mut ctxt = XmlParserCtxt::new_push_parser(Some(&mut sink));
            ctxt.use_options(XmlParserOption::XmlParseNoEnt as i32);
            for chunk in doc.as_bytes().chunks(5) {
                xml_parse_chunk(&mut ctxt, chunk, false);
            }
            xml_parse_chunk(&mut ctxt, b"", true);
        }
        assert!(sink.events.contains(&"chars xyz".to_owned()));
    }

    #[test]
    fn huge_option_lifts_the_push_buffer_cap() {
        let mut ctxt = XmlParserCtxt::new_push_parser(None);
        assert_ne!(ctxt.input().unwrap().buf.limit(), 0);
        ctxt.use_options(XmlParserOption::XmlParseHuge as i32);
        assert_eq!(ctxt.input().unwrap().buf.limit(), 0);
    }

    #[test]
    fn entity_expansion_resumes_in_document_across_chunks() {
        // Chunks arriving while an expanded entity is still the top input
        // frame must land in the document frame, byte-at-a-time feeding
        // leaves the exhausted entity on the stack between chunks.
        let doc = "<!DOCTYPE d [<!ENTITY greet \"hello\">]><d>&greet; world</d>";
        let mut sink = EventSink::default();
        let code = {
            let mut ctxt = XmlParserCtxt::new_push_parser(Some(&mut sink));
            ctxt.use_options(XmlParserOption::XmlParseNoEnt as i32);
            let mut last = 0;
            for chunk in doc.as_bytes().chunks(1) {
                last = xml_parse_chunk(&mut ctxt, chunk, false);
            }
            xml_parse_chunk(&mut ctxt, b"", true).max(last)
        };
        assert_eq!(code, 0);
        let text: String = sink
            .events
            .iter()
            .filter_map(|ev| ev.strip_prefix("chars "))
            .collect();
        assert_eq!(text, "hello world");
    }

    #[test]
    fn garbage_after_root_is_rejected() {
        let (_, code) = push_all("<d/>trailing", 4);
        assert_ne!(code, 0);
    }
}
