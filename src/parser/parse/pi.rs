use std::rc::Rc;

use crate::{
    error::XmlParserErrors,
    parser::{
        XML_MAX_HUGE_LENGTH, XML_MAX_TEXT_LENGTH, XmlParserCtxt, XmlParserInputState,
        XmlParserOption, xml_fatal_err, xml_fatal_err_msg, xml_fatal_err_msg_str, xml_is_char,
        xml_ns_err, xml_warning_msg,
    },
};

use super::parse_name;

/// PI targets carrying the reserved "xml" prefix that the W3C itself defined,
/// and which are therefore not rejected.
const XML_W3_CPIS: &[&str] = &["xml-stylesheet", "xml-model"];

impl XmlParserCtxt<'_> {
    /// Parse the name of a PI.
    ///
    /// ```text
    /// [17] PITarget ::= Name - (('X' | 'x') ('M' | 'm') ('L' | 'l'))
    /// ```
    ///
    /// Returns the PITarget name or None.
    #[doc(alias = "xmlParsePITarget")]
    fn parse_pi_target(&mut self) -> Option<Rc<str>> {
        let name = parse_name(self)?;
        if name.as_bytes()[..3.min(name.len())].eq_ignore_ascii_case(b"xml") {
            if &*name == "xml" {
                xml_fatal_err_msg(
                    self,
                    XmlParserErrors::XmlErrReservedXmlName,
                    "XML declaration allowed only at the start of the document\n",
                );
                return Some(name);
            } else if name.len() == 3 {
                xml_fatal_err(self, XmlParserErrors::XmlErrReservedXmlName, None);
                return Some(name);
            }
            if XML_W3_CPIS.contains(&&*name) {
                return Some(name);
            }
            xml_warning_msg!(
                self,
                XmlParserErrors::XmlErrReservedXmlName,
                "xmlParsePITarget: invalid name prefix 'xml'\n"
            );
        }
        if name.contains(':') {
            xml_ns_err!(
                self,
                XmlParserErrors::XmlNsErrColon,
                "colons are forbidden from PI names '{}'\n",
                &*name
            );
        }
        Some(name)
    }

    /// Parse an XML Processing Instruction.
    ///
    /// ```text
    /// [16] PI ::= '<?' PITarget (S (Char* - (Char* '?>' Char*)))? '?>'
    /// ```
    ///
    /// The processing is transferred to SAX once parsed (and not the current one).
    #[doc(alias = "xmlParsePI")]
    pub(crate) fn parse_pi(&mut self) {
        if !self.content_bytes().starts_with(b"<?") {
            return;
        }

        let max_length = if self.options & XmlParserOption::XmlParseHuge as i32 != 0 {
            XML_MAX_HUGE_LENGTH
        } else {
            XML_MAX_TEXT_LENGTH
        };

        let inputid = self.input().map(|input| input.id);
        let state = self.instate;
        self.instate = XmlParserInputState::XmlParserPI;
        // this is a Processing Instruction.
        self.advance(2);

        // Parse the target name and check for special support like namespace.
        let Some(target) = self.parse_pi_target() else {
            xml_fatal_err_msg(
                self,
                XmlParserErrors::XmlErrPINotStarted,
                "xmlParsePI : no target name\n",
            );
            if !matches!(self.instate, XmlParserInputState::XmlParserEOF) {
                self.instate = state;
            }
            return;
        };

        if self.content_bytes().starts_with(b"?>") {
            if self.input().map(|input| input.id) != inputid {
                xml_fatal_err_msg(
                    self,
                    XmlParserErrors::XmlErrEntityBoundary,
                    "PI declaration doesn't start and stop in the same entity\n",
                );
            }
            self.advance(2);

            // SAX: PI detected.
            if self.disable_sax == 0 {
                if let Some(sax) = self.sax.as_deref_mut() {
                    sax.processing_instruction(&target, None);
                }
            }
            if !matches!(self.instate, XmlParserInputState::XmlParserEOF) {
                self.instate = state;
            }
            return;
        }

        if self.skip_blanks() == 0 {
            xml_fatal_err_msg_str!(
                self,
                XmlParserErrors::XmlErrSpaceRequired,
                "ParsePI: PI {} space expected\n",
                &*target
            );
        }

        let mut buf = String::new();
        while let Some(c) = self.consume_char_if(|ctxt, c| {
            xml_is_char(c as u32) && (c != '?' || ctxt.nth_byte(1) != b'>')
        }) {
            buf.push(c);
            if buf.len() > max_length {
                xml_fatal_err_msg_str!(
                    self,
                    XmlParserErrors::XmlErrPINotFinished,
                    "PI {} too big found\n",
                    &*target
                );
                if !matches!(self.instate, XmlParserInputState::XmlParserEOF) {
                    self.instate = state;
                }
                return;
            }
            self.grow();
        }
        if matches!(self.instate, XmlParserInputState::XmlParserEOF) {
            return;
        }

        if self.current_byte() != b'?' {
            xml_fatal_err_msg_str!(
                self,
                XmlParserErrors::XmlErrPINotFinished,
                "ParsePI: PI {} never end ...\n",
                &*target
            );
        } else {
            if self.input().map(|input| input.id) != inputid {
                xml_fatal_err_msg(
                    self,
                    XmlParserErrors::XmlErrEntityBoundary,
                    "PI declaration doesn't start and stop in the same entity\n",
                );
            }
            self.advance(2);

            // SAX: PI detected.
            if self.disable_sax == 0 {
                if let Some(sax) = self.sax.as_deref_mut() {
                    sax.processing_instruction(&target, Some(&buf));
                }
            }
        }
        if !matches!(self.instate, XmlParserInputState::XmlParserEOF) {
            self.instate = state;
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
    struct PiSink {
        pis: Vec<(String, Option<String>)>,
    }

    impl XmlSaxHandler for PiSink {
        fn processing_instruction(&mut self, target: &str, data: Option<&str>) {
            self.pis
                .push((target.to_owned(), data.map(|d| d.to_owned())));
        }
    }

    fn parse_pi_from(content: &str, sax: &mut PiSink) -> bool {
        let mut ctxt = XmlParserCtxt::new_sax_parser(Some(sax));
        let id = ctxt.next_input_id();
        ctxt.input_push(XmlParserInput::from_memory(content.as_bytes().to_vec(), id));
        ctxt.parse_pi();
        ctxt.well_formed
    }

    #[test]
    fn pi_with_data() {
        let mut sax = PiSink::default();
        assert!(parse_pi_from("<?target some data here?>", &mut sax));
        assert_eq!(
            sax.pis,
            [("target".to_owned(), Some("some data here".to_owned()))]
        );
    }

    #[test]
    fn pi_without_data() {
        let mut sax = PiSink::default();
        assert!(parse_pi_from("<?target?>", &mut sax));
        assert_eq!(sax.pis, [("target".to_owned(), None)]);
    }

    #[test]
    fn question_marks_inside_data_are_kept() {
        let mut sax = PiSink::default();
        assert!(parse_pi_from("<?t a?b??c?>", &mut sax));
        assert_eq!(sax.pis, [("t".to_owned(), Some("a?b??c".to_owned()))]);
    }

    #[test]
    fn reserved_xml_target_is_rejected() {
        let mut sax = PiSink::default();
        assert!(!parse_pi_from("<?xml version=\"1.0\"?>", &mut sax));
        let mut sax = PiSink::default();
        assert!(!parse_pi_from("<?XmL data?>", &mut sax));
    }

    #[test]
    fn w3c_targets_with_xml_prefix_are_accepted() {
        let mut sax = PiSink::default();
        assert!(parse_pi_from("<?xml-stylesheet href=\"a.xsl\"?>", &mut sax));
        assert_eq!(sax.pis.len(), 1);
        assert_eq!(sax.pis[0].0, "xml-stylesheet");
    }

    #[test]
    fn unterminated_pi_is_an_error() {
        let mut sax = PiSink::default();
        assert!(!parse_pi_from("<?target no end", &mut sax));
    }

    #[test]
    fn colon_in_target_is_a_namespace_error() {
        let mut sax = PiSink::default();
        let mut ctxt = XmlParserCtxt::new_sax_parser(Some(&mut sax));
        let id = ctxt.next_input_id();
        ctxt.input_push(XmlParserInput::from_memory(
            b"<?a:b data?>".to_vec(),
            id,
        ));
        ctxt.parse_pi();
        assert!(ctxt.well_formed);
        assert!(!ctxt.ns_well_formed);
    }
}
