use std::str::from_utf8;

use crate::{
    error::XmlParserErrors,
    parser::{
        XML_MAX_HUGE_LENGTH, XML_MAX_TEXT_LENGTH, XmlParserCtxt, XmlParserInputState,
        XmlParserOption, xml_fatal_err, xml_fatal_err_msg, xml_is_char,
    },
};

/// Check that the block of characters is okay as CData content [20]
///
/// Returns the number of bytes to pass if okay, the index where an
/// UTF-8 or character error occurred otherwise
#[doc(alias = "xmlCheckCdataPush")]
#[cfg(feature = "libxml_push")]
pub(crate) fn check_cdata_push(utf: &[u8], complete: bool) -> Result<usize, usize> {
    if utf.is_empty() {
        return Ok(0);
    }

    let s = match from_utf8(utf) {
        Ok(s) => s,
        Err(e) => {
            // The prefix up to `valid_up_to` is known good.
            let s = from_utf8(&utf[..e.valid_up_to()]).unwrap();
            // If `complete` is `true`, it is invalid not to reach the end.
            // If `e.error_len().is_some()` is `true`,
            // it is still invalid because it contains an invalid byte sequence.
            if complete || e.error_len().is_some() {
                return Err(s.find(|c: char| !xml_is_char(c as u32)).unwrap_or(s.len()));
            }
            s
        }
    };

    // Even a valid UTF-8 sequence may contain characters
    // that do not conform to the XML specification.
    s.find(|c: char| !xml_is_char(c as u32))
        .map_or(Ok(s.len()), Err)
}

impl XmlParserCtxt<'_> {
    /// Parse escaped pure raw content. Always consumes '<![CDATA['.
    ///
    /// ```text
    /// [18] CDSect ::= CDStart CData CDEnd
    /// [19] CDStart ::= '<![CDATA['
    /// [20] CData ::= (Char* - (Char* ']]>' Char*))
    /// [21] CDEnd ::= ']]>'
    /// ```
    #[doc(alias = "xmlParseCDSect")]
    pub(crate) fn parse_cdsect(&mut self) {
        if !self.content_bytes().starts_with(b"<![CDATA[") {
            return;
        }
        self.advance(9);

        let max_length = if self.options & XmlParserOption::XmlParseHuge as i32 != 0 {
            XML_MAX_HUGE_LENGTH
        } else {
            XML_MAX_TEXT_LENGTH
        };

        self.instate = XmlParserInputState::XmlParserCDATASection;
        let mut buf = String::new();
        loop {
            // Accelerated path, stops on ']' and anything needing care.
            let content = self.content_bytes();
            let run = content
                .iter()
                .take_while(|&&b| {
                    b != b']'
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
            if buf.len() > max_length {
                xml_fatal_err_msg(
                    self,
                    XmlParserErrors::XmlErrCDATANotFinished,
                    "CData section too big found\n",
                );
                return;
            }
            self.grow();

            if self.content_bytes().starts_with(b"]]>") {
                self.advance(3);
                break;
            }
            match self.current_byte() {
                0 => {
                    xml_fatal_err(self, XmlParserErrors::XmlErrCDATANotFinished, None);
                    return;
                }
                b']' => {
                    buf.push(']');
                    self.advance(1);
                }
                b'\r' => {
                    // 2.11 End-of-Line Handling
                    buf.push('\n');
                    self.skip_char();
                }
                _ => {
                    let Some((c, _)) = self.current_char() else {
                        xml_fatal_err(self, XmlParserErrors::XmlErrCDATANotFinished, None);
                        return;
                    };
                    if matches!(self.instate, XmlParserInputState::XmlParserEOF) {
                        return;
                    }
                    if xml_is_char(c as u32) {
                        buf.push(c);
                    }
                    self.skip_char();
                }
            }
        }

        if !matches!(self.instate, XmlParserInputState::XmlParserEOF) {
            self.instate = XmlParserInputState::XmlParserContent;
        }
        if self.disable_sax == 0 {
            if let Some(sax) = self.sax.as_deref_mut() {
                sax.cdata_block(&buf);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use crate::{
        parser::{XmlParserCtxt, XmlParserInput},
        sax::XmlSaxHandler,
    };

    #[derive(Default)]
    struct CdataSink {
        blocks: Vec<String>,
    }

    impl XmlSaxHandler for CdataSink {
        fn cdata_block(&mut self, data: &str) {
            self.blocks.push(data.to_owned());
        }
    }

    fn parse_cdsect_from(content: &str, sax: &mut CdataSink) -> bool {
        let mut ctxt = XmlParserCtxt::new_sax_parser(Some(sax));
        let id = ctxt.next_input_id();
        ctxt.input_push(XmlParserInput::from_memory(content.as_bytes().to_vec(), id));
        ctxt.parse_cdsect();
        ctxt.well_formed
    }

    #[test]
    fn markup_is_not_recognized_inside_cdata() {
        let mut sax = CdataSink::default();
        assert!(parse_cdsect_from("<![CDATA[<a>&amp;</a>]]>", &mut sax));
        assert_eq!(sax.blocks, ["<a>&amp;</a>"]);
    }

    #[test]
    fn lone_brackets_are_kept() {
        let mut sax = CdataSink::default();
        assert!(parse_cdsect_from("<![CDATA[a]b]]c]]>", &mut sax));
        assert_eq!(sax.blocks, ["a]b]]c"]);
    }

    #[test]
    fn unterminated_section_is_an_error() {
        let mut sax = CdataSink::default();
        assert!(!parse_cdsect_from("<![CDATA[never closed", &mut sax));
        assert!(sax.blocks.is_empty());
    }

    #[test]
    fn crlf_folds_to_newline() {
        let mut sax = CdataSink::default();
        assert!(parse_cdsect_from("<![CDATA[a\r\nb]]>", &mut sax));
        assert_eq!(sax.blocks, ["a\nb"]);
    }

    #[cfg(feature = "libxml_push")]
    mod push {
        use super::super::check_cdata_push;

        #[test]
        fn accepts_complete_ascii() {
            assert_eq!(check_cdata_push(b"hello world", true), Ok(11));
        }

        #[test]
        fn truncated_multibyte_is_fine_when_incomplete() {
            // "é" is 0xC3 0xA9; feed only the first byte
            assert_eq!(check_cdata_push(b"ab\xC3", false), Ok(2));
            assert_eq!(check_cdata_push(b"ab\xC3", true), Err(2));
        }

        #[test]
        fn invalid_byte_is_always_an_error() {
            assert_eq!(check_cdata_push(b"ab\xFFcd", false), Err(2));
        }

        #[test]
        fn control_characters_are_rejected() {
            assert_eq!(check_cdata_push(b"ab\x01cd", true), Err(2));
        }
    }
}
