use crate::{
    error::XmlParserErrors,
    parser::{
        XML_DEFAULT_VERSION, XML_MAX_NAME_LENGTH, XML_MAX_TEXT_LENGTH, XmlParserCtxt,
        XmlParserOption, xml_fatal_err, xml_fatal_err_msg, xml_fatal_err_msg_str,
        xml_is_blank_char, xml_warning_msg,
    },
};

/// Parse the XML version value.
///
/// ```text
/// [26] VersionNum ::= '1.' [0-9]+
/// ```
///
/// In practice allow [0-9].[0-9]+ at that level
///
/// Returns the string giving the XML version number, or None
#[doc(alias = "xmlParseVersionNum")]
fn parse_version_num(ctxt: &mut XmlParserCtxt) -> Option<String> {
    let mut buf = String::with_capacity(10);
    buf.push(ctxt.consume_char_if(|_, c| c.is_ascii_digit())?);
    ctxt.consume_char_if(|_, c| c == '.')?;
    buf.push('.');
    while let Some(c) = ctxt.consume_char_if(|_, c| c.is_ascii_digit()) {
        buf.push(c);
    }
    Some(buf)
}

/// Parse the XML version.
///
/// ```text
/// [24] VersionInfo ::= S 'version' Eq (' VersionNum ' | " VersionNum ")
///
/// [25] Eq ::= S? '=' S?
/// ```
///
/// Returns the version string, e.g. "1.0"
#[doc(alias = "xmlParseVersionInfo")]
fn parse_version_info(ctxt: &mut XmlParserCtxt) -> Option<String> {
    if !ctxt.content_bytes().starts_with(b"version") {
        return None;
    }
    ctxt.advance(7);
    ctxt.skip_blanks();
    if ctxt.consume_char_if(|_, c| c == '=').is_none() {
        xml_fatal_err(ctxt, XmlParserErrors::XmlErrEqualRequired, None);
        return None;
    }
    ctxt.skip_blanks();
    let Some(quote) = ctxt.consume_char_if(|_, c| c == '"' || c == '\'') else {
        xml_fatal_err(ctxt, XmlParserErrors::XmlErrStringNotStarted, None);
        return None;
    };
    let version = parse_version_num(ctxt);
    if ctxt.consume_char_if(|_, c| c == quote).is_none() {
        xml_fatal_err(ctxt, XmlParserErrors::XmlErrStringNotClosed, None);
        return None;
    }
    version
}

/// parse the XML encoding name
///
/// ```text
/// [81] EncName ::= [A-Za-z] ([A-Za-z0-9._] | '-')*
/// ```
///
/// Returns the encoding name value or None
#[doc(alias = "xmlParseEncName")]
fn parse_enc_name(ctxt: &mut XmlParserCtxt) -> Option<String> {
    let max_length = if ctxt.options & XmlParserOption::XmlParseHuge as i32 != 0 {
        XML_MAX_TEXT_LENGTH
    } else {
        XML_MAX_NAME_LENGTH
    };
    let Some(first) = ctxt.consume_char_if(|_, c| c.is_ascii_alphabetic()) else {
        xml_fatal_err(ctxt, XmlParserErrors::XmlErrEncodingName, None);
        return None;
    };
    let mut buf = String::with_capacity(10);
    buf.push(first);
    while let Some(c) =
        ctxt.consume_char_if(|_, c| c.is_ascii_alphanumeric() || c == '.' || c == '_' || c == '-')
    {
        buf.push(c);
        if buf.len() > max_length {
            xml_fatal_err(ctxt, XmlParserErrors::XmlErrNameTooLong, Some("EncName"));
            return None;
        }
    }
    Some(buf)
}

impl XmlParserCtxt<'_> {
    /// Parse the XML encoding declaration
    ///
    /// ```text
    /// [80] EncodingDecl ::= S 'encoding' Eq ('"' EncName '"' |  "'" EncName "'")
    /// ```
    ///
    /// The input bytes are always handled as UTF-8, so the declared name is
    /// only recorded and checked for plausibility; no conversion filter is
    /// installed.
    ///
    /// Returns the encoding value or None
    #[doc(alias = "xmlParseEncodingDecl")]
    fn parse_encoding_decl(&mut self) -> Option<String> {
        self.skip_blanks();
        if !self.content_bytes().starts_with(b"encoding") {
            return None;
        }
        self.advance(8);
        self.skip_blanks();
        if self.consume_char_if(|_, c| c == '=').is_none() {
            xml_fatal_err(self, XmlParserErrors::XmlErrEqualRequired, None);
            return None;
        }
        self.skip_blanks();
        let encoding = if let Some(quote) = self.consume_char_if(|_, c| c == '"' || c == '\'') {
            let encoding = parse_enc_name(self);
            if self.consume_char_if(|_, c| c == quote).is_none() {
                xml_fatal_err(self, XmlParserErrors::XmlErrStringNotClosed, None);
                return None;
            }
            encoding
        } else {
            xml_fatal_err(self, XmlParserErrors::XmlErrStringNotStarted, None);
            None
        };

        if let Some(encoding) = encoding.as_deref() {
            // A document labelled UTF-16 cannot reach this point as UTF-8
            // compatible bytes, so the label is necessarily wrong.
            if encoding.eq_ignore_ascii_case("UTF-16") || encoding.eq_ignore_ascii_case("UTF16") {
                xml_fatal_err_msg(
                    self,
                    XmlParserErrors::XmlErrInvalidEncoding,
                    "Document labelled UTF-16 but has UTF-8 content\n",
                );
            }
            self.encoding = Some(encoding.to_owned());
        }
        encoding
    }

    /// Parse the XML standalone declaration
    ///
    /// ```text
    /// [32] SDDecl ::= S 'standalone' Eq (("'" ('yes' | 'no') "'") | ('"' ('yes' | 'no')'"'))
    /// ```
    ///
    /// Returns:
    /// - 1 if standalone="yes"
    /// - 0 if standalone="no"
    /// - -2 if standalone attribute is missing or invalid
    ///      (A standalone value of -2 means that the XML declaration was found,
    ///       but no value was specified for the standalone attribute).
    #[doc(alias = "xmlParseSDDecl")]
    fn parse_sddecl(&mut self) -> i32 {
        self.skip_blanks();
        if !self.content_bytes().starts_with(b"standalone") {
            return -2;
        }
        self.advance(10);
        self.skip_blanks();
        if self.consume_char_if(|_, c| c == '=').is_none() {
            xml_fatal_err(self, XmlParserErrors::XmlErrEqualRequired, None);
            return -2;
        }
        self.skip_blanks();
        let Some(quote) = self.consume_char_if(|_, c| c == '"' || c == '\'') else {
            xml_fatal_err(self, XmlParserErrors::XmlErrStringNotStarted, None);
            return -2;
        };
        let standalone = if self.content_bytes().starts_with(b"no") {
            self.advance(2);
            0
        } else if self.content_bytes().starts_with(b"yes") {
            self.advance(3);
            1
        } else {
            xml_fatal_err(self, XmlParserErrors::XmlErrStandaloneValue, None);
            -2
        };
        if self.consume_char_if(|_, c| c == quote).is_none() {
            xml_fatal_err(self, XmlParserErrors::XmlErrStringNotClosed, None);
        }
        standalone
    }

    /// parse an XML declaration header
    ///
    /// ```text
    /// [23] XMLDecl ::= '<?xml' VersionInfo EncodingDecl? SDDecl? S? '?>'
    /// ```
    #[doc(alias = "xmlParseXMLDecl")]
    pub(crate) fn parse_xmldecl(&mut self) {
        // This value for standalone indicates that the document has an
        // XML declaration but it does not have a standalone attribute.
        // It will be overwritten later if a standalone attribute is found.
        self.standalone = -2;

        // We know that '<?xml' is here.
        self.advance(5);

        if !xml_is_blank_char(self.current_byte() as u32) {
            xml_fatal_err_msg(
                self,
                XmlParserErrors::XmlErrSpaceRequired,
                "Blank needed after '<?xml'\n",
            );
        }
        self.skip_blanks();

        // We must have the VersionInfo here.
        if let Some(version) = parse_version_info(self) {
            if version != XML_DEFAULT_VERSION {
                // Changed here for XML-1.0 5th edition
                if self.options & XmlParserOption::XmlParseOld10 as i32 != 0
                    || !version.starts_with("1.")
                {
                    xml_fatal_err_msg_str!(
                        self,
                        XmlParserErrors::XmlErrUnknownVersion,
                        "Unsupported version '{}'\n",
                        version
                    );
                } else {
                    xml_warning_msg!(
                        self,
                        XmlParserErrors::XmlWarUnknownVersion,
                        "Unsupported version '{}'\n",
                        version
                    );
                }
            }
            self.version = Some(version);
        } else {
            xml_fatal_err(self, XmlParserErrors::XmlErrVersionMissing, None);
        }

        // We may have the encoding declaration
        if !xml_is_blank_char(self.current_byte() as u32) {
            if self.content_bytes().starts_with(b"?>") {
                self.advance(2);
                return;
            }
            xml_fatal_err_msg(
                self,
                XmlParserErrors::XmlErrSpaceRequired,
                "Blank needed here\n",
            );
        }
        self.parse_encoding_decl();

        // We may have the standalone status.
        if self.encoding.is_some() && !xml_is_blank_char(self.current_byte() as u32) {
            if self.content_bytes().starts_with(b"?>") {
                self.advance(2);
                return;
            }
            xml_fatal_err_msg(
                self,
                XmlParserErrors::XmlErrSpaceRequired,
                "Blank needed here\n",
            );
        }

        self.grow();

        self.skip_blanks();
        self.standalone = self.parse_sddecl();
        self.skip_blanks();
        if self.content_bytes().starts_with(b"?>") {
            self.advance(2);
        } else if self.current_byte() == b'>' {
            // Deprecated old WD ...
            xml_fatal_err(self, XmlParserErrors::XmlErrXMLDeclNotFinished, None);
            self.skip_char();
        } else {
            xml_fatal_err(self, XmlParserErrors::XmlErrXMLDeclNotFinished, None);
            self.grow();
            while !self.content_bytes().is_empty() {
                match self.content_bytes().iter().position(|&c| c == b'>') {
                    Some(pos) => {
                        self.advance_with_line_handling(pos + 1);
                        break;
                    }
                    None => {
                        let len = self.content_bytes().len();
                        self.advance_with_line_handling(len);
                        self.grow();
                    }
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use crate::parser::{XmlParserCtxt, XmlParserInput};

    fn decl_ctxt(content: &str) -> XmlParserCtxt<'static> {
        let mut ctxt = XmlParserCtxt::new_sax_parser(None);
        let id = ctxt.next_input_id();
        ctxt.input_push(XmlParserInput::from_memory(content.as_bytes().to_vec(), id));
        ctxt
    }

    #[test]
    fn minimal_declaration() {
        let mut ctxt = decl_ctxt("<?xml version=\"1.0\"?>");
        ctxt.parse_xmldecl();
        assert!(ctxt.well_formed);
        assert_eq!(ctxt.version.as_deref(), Some("1.0"));
        assert_eq!(ctxt.standalone, -2);
        assert!(ctxt.encoding.is_none());
    }

    #[test]
    fn full_declaration() {
        let mut ctxt = decl_ctxt("<?xml version='1.0' encoding='UTF-8' standalone='yes'?>");
        ctxt.parse_xmldecl();
        assert!(ctxt.well_formed);
        assert_eq!(ctxt.encoding.as_deref(), Some("UTF-8"));
        assert_eq!(ctxt.standalone, 1);
    }

    #[test]
    fn future_minor_version_is_only_a_warning() {
        let mut ctxt = decl_ctxt("<?xml version=\"1.1\"?>");
        ctxt.parse_xmldecl();
        assert!(ctxt.well_formed);
        assert_eq!(ctxt.version.as_deref(), Some("1.1"));
    }

    #[test]
    fn non_1x_version_is_fatal() {
        let mut ctxt = decl_ctxt("<?xml version=\"2.0\"?>");
        ctxt.parse_xmldecl();
        assert!(!ctxt.well_formed);
    }

    #[test]
    fn missing_version_is_fatal() {
        let mut ctxt = decl_ctxt("<?xml encoding='UTF-8'?>");
        ctxt.parse_xmldecl();
        assert!(!ctxt.well_formed);
    }

    #[test]
    fn utf16_label_on_utf8_content_is_fatal() {
        let mut ctxt = decl_ctxt("<?xml version=\"1.0\" encoding=\"UTF-16\"?>");
        ctxt.parse_xmldecl();
        assert!(!ctxt.well_formed);
    }

    #[test]
    fn standalone_no() {
        let mut ctxt = decl_ctxt("<?xml version=\"1.0\" standalone=\"no\"?>");
        ctxt.parse_xmldecl();
        assert!(ctxt.well_formed);
        assert_eq!(ctxt.standalone, 0);
    }
}
