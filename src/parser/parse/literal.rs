use crate::{
    chvalid::xml_is_pubid_char,
    error::XmlParserErrors,
    parser::{
        XML_MAX_NAME_LENGTH, XML_MAX_TEXT_LENGTH, XmlParserCtxt, XmlParserInputState,
        XmlParserOption, xml_fatal_err, xml_fatal_err_msg, xml_is_char,
    },
};

impl XmlParserCtxt<'_> {
    /// Parse an XML Literal
    ///
    /// ```text
    /// [11] SystemLiteral ::= ('"' [^"]* '"') | ("'" [^']* "'")
    /// ```
    ///
    /// Returns the SystemLiteral parsed or None
    #[doc(alias = "xmlParseSystemLiteral")]
    pub(crate) fn parse_system_literal(&mut self) -> Option<String> {
        let max_length = if self.options & XmlParserOption::XmlParseHuge as i32 != 0 {
            XML_MAX_TEXT_LENGTH
        } else {
            XML_MAX_NAME_LENGTH
        };
        let state = self.instate;

        if !matches!(self.current_byte(), b'"' | b'\'') {
            xml_fatal_err(self, XmlParserErrors::XmlErrLiteralNotStarted, None);
            return None;
        }
        let stop = self.current_byte() as char;
        self.skip_char();

        let mut buf = String::new();
        self.instate = XmlParserInputState::XmlParserSystemLiteral;
        let mut cur = self.current_char().map(|(c, _)| c);
        while let Some(c) = cur.filter(|&c| xml_is_char(c as u32) && c != stop) {
            buf.push(c);
            if buf.len() > max_length {
                xml_fatal_err(
                    self,
                    XmlParserErrors::XmlErrNameTooLong,
                    Some("SystemLiteral"),
                );
                self.instate = state;
                return None;
            }
            self.skip_char();
            self.grow();
            cur = self.current_char().map(|(c, _)| c);
        }
        if matches!(self.instate, XmlParserInputState::XmlParserEOF) {
            return None;
        }
        self.instate = state;
        if cur != Some(stop) {
            xml_fatal_err(self, XmlParserErrors::XmlErrLiteralNotFinished, None);
        } else {
            self.skip_char();
        }
        Some(buf)
    }

    /// Parse an XML public literal
    ///
    /// ```text
    /// [12] PubidLiteral ::= '"' PubidChar* '"' | "'" (PubidChar - "'")* "'"
    /// ```
    ///
    /// Returns the PubidLiteral parsed or None.
    #[doc(alias = "xmlParsePubidLiteral")]
    pub(crate) fn parse_pubid_literal(&mut self) -> Option<String> {
        let max_length = if self.options & XmlParserOption::XmlParseHuge as i32 != 0 {
            XML_MAX_TEXT_LENGTH
        } else {
            XML_MAX_NAME_LENGTH
        };

        let oldstate = self.instate;

        if !matches!(self.current_byte(), b'"' | b'\'') {
            xml_fatal_err(self, XmlParserErrors::XmlErrLiteralNotStarted, None);
            return None;
        }
        let stop = self.current_byte();
        self.skip_char();

        let mut buf = String::new();
        self.instate = XmlParserInputState::XmlParserPublicLiteral;
        let mut cur = self.current_byte();
        while xml_is_pubid_char(cur as u32) && cur != stop {
            // PubidChar is a subset of ASCII, casting to `char` is fine.
            buf.push(cur as char);
            if buf.len() > max_length {
                xml_fatal_err(self, XmlParserErrors::XmlErrNameTooLong, Some("Public ID"));
                return None;
            }
            self.skip_char();
            self.grow();
            cur = self.current_byte();
        }
        if matches!(self.instate, XmlParserInputState::XmlParserEOF) {
            return None;
        }
        if cur != stop {
            xml_fatal_err(self, XmlParserErrors::XmlErrLiteralNotFinished, None);
        } else {
            self.advance(1);
        }
        self.instate = oldstate;
        Some(buf)
    }

    /// Parse an External ID or a Public ID
    ///
    /// # Note
    /// Productions [75] and [83] interact badly since [75] can generate
    /// 'PUBLIC' S PubidLiteral S SystemLiteral
    ///
    /// ```text
    /// [75] ExternalID ::= 'SYSTEM' S SystemLiteral | 'PUBLIC' S PubidLiteral S SystemLiteral
    /// [83] PublicID ::= 'PUBLIC' S PubidLiteral
    /// ```
    ///
    /// If ExternalID is parsed and PubidLiteral is found, return `(PubidLiteral, SystemLiteral)`,
    /// if ExternalID is parsed and PubidLiteral is not found, return `(None, SystemLiteral)`,
    /// if PublicID is parsed, return `(PubidLiteral, None)`,
    /// otherwise, return `(None, None)`.
    #[doc(alias = "xmlParseExternalID")]
    pub(crate) fn parse_external_id(&mut self, strict: bool) -> (Option<String>, Option<String>) {
        let mut uri = None;
        let mut public_id = None;

        if self.content_bytes().starts_with(b"SYSTEM") {
            self.advance(6);
            if self.skip_blanks() == 0 {
                xml_fatal_err_msg(
                    self,
                    XmlParserErrors::XmlErrSpaceRequired,
                    "Space required after 'SYSTEM'\n",
                );
            }
            uri = self.parse_system_literal();
            if uri.is_none() {
                xml_fatal_err(self, XmlParserErrors::XmlErrURIRequired, None);
            }
        } else if self.content_bytes().starts_with(b"PUBLIC") {
            self.advance(6);
            if self.skip_blanks() == 0 {
                xml_fatal_err_msg(
                    self,
                    XmlParserErrors::XmlErrSpaceRequired,
                    "Space required after 'PUBLIC'\n",
                );
            }
            public_id = self.parse_pubid_literal();
            if public_id.is_none() {
                xml_fatal_err(self, XmlParserErrors::XmlErrPubidRequired, None);
            }
            if strict {
                // We don't handle [83] so "S SystemLiteral" is required.
                if self.skip_blanks() == 0 {
                    xml_fatal_err_msg(
                        self,
                        XmlParserErrors::XmlErrSpaceRequired,
                        "Space required after the Public Identifier\n",
                    );
                }
            } else {
                // We handle [83] so we return immediately, if
                // "S SystemLiteral" is not detected. We skip blanks if no
                // system literal was found, but this is harmless since we must
                // be at the end of a NotationDecl.
                if self.skip_blanks() == 0 {
                    return (public_id, None);
                }
                if self.current_byte() != b'\'' && self.current_byte() != b'"' {
                    return (public_id, None);
                }
            }
            uri = self.parse_system_literal();
            if uri.is_none() {
                xml_fatal_err(self, XmlParserErrors::XmlErrURIRequired, None);
            }
        }
        (public_id, uri)
    }
}

#[cfg(test)]
mod tests {
    use crate::parser::{XmlParserCtxt, XmlParserInput};

    fn ctxt_with_input(content: &str) -> XmlParserCtxt<'static> {
        let mut ctxt = XmlParserCtxt::new_sax_parser(None);
        let id = ctxt.next_input_id();
        ctxt.input_push(XmlParserInput::from_memory(content.as_bytes().to_vec(), id));
        ctxt
    }

    #[test]
    fn system_literal_accepts_both_quotes() {
        let mut ctxt = ctxt_with_input("\"http://example.com/a.dtd\"");
        assert_eq!(
            ctxt.parse_system_literal().as_deref(),
            Some("http://example.com/a.dtd")
        );
        let mut ctxt = ctxt_with_input("'it''s'");
        assert_eq!(ctxt.parse_system_literal().as_deref(), Some("it"));
    }

    #[test]
    fn pubid_literal_rejects_non_pubid_chars() {
        let mut ctxt = ctxt_with_input("\"-//W3C//DTD XHTML 1.0//EN\"");
        assert_eq!(
            ctxt.parse_pubid_literal().as_deref(),
            Some("-//W3C//DTD XHTML 1.0//EN")
        );
        // '{' is not a PubidChar, the literal never reaches its delimiter
        let mut ctxt = ctxt_with_input("\"oops{\"");
        ctxt.parse_pubid_literal();
        assert!(!ctxt.well_formed);
    }

    #[test]
    fn external_id_system() {
        let mut ctxt = ctxt_with_input("SYSTEM 'sub.dtd'");
        assert_eq!(ctxt.parse_external_id(true), (None, Some("sub.dtd".to_owned())));
    }

    #[test]
    fn external_id_public_requires_system_when_strict() {
        let mut ctxt = ctxt_with_input("PUBLIC '-//X//EN' 'x.dtd'");
        assert_eq!(
            ctxt.parse_external_id(true),
            (Some("-//X//EN".to_owned()), Some("x.dtd".to_owned()))
        );

        let mut ctxt = ctxt_with_input("PUBLIC '-//X//EN'>");
        let (public_id, uri) = ctxt.parse_external_id(true);
        assert_eq!(public_id.as_deref(), Some("-//X//EN"));
        assert!(uri.is_none());
        assert!(!ctxt.well_formed);
    }

    #[test]
    fn public_id_alone_is_fine_when_lax() {
        let mut ctxt = ctxt_with_input("PUBLIC '-//X//EN'>");
        assert_eq!(
            ctxt.parse_external_id(false),
            (Some("-//X//EN".to_owned()), None)
        );
        assert!(ctxt.well_formed);
    }
}
