use std::str::from_utf8;

use crate::{
    error::XmlParserErrors,
    parser::{
        XML_MAX_HUGE_LENGTH, XML_MAX_TEXT_LENGTH, XmlParserCtxt, XmlParserInputState,
        XmlParserOption, xml_fatal_err, xml_fatal_err_msg, xml_fatal_err_msg_int,
        xml_fatal_err_msg_str, xml_is_char,
    },
};

impl XmlParserCtxt<'_> {
    /// Parse an XML comment. Always consumes '<!'.
    ///
    /// The spec says that "For compatibility, the string "--" (double-hyphen)
    /// must not occur within comments. "
    ///
    /// ```text
    /// [15] Comment ::= '<!--' ((Char - '-') | ('-' (Char - '-')))* '-->'
    /// ```
    #[doc(alias = "xmlParseComment")]
    pub(crate) fn parse_comment(&mut self) {
        // Check that there is a comment right here.
        if !self.content_bytes().starts_with(b"<!--") {
            return;
        }

        let max_length = if self.options & XmlParserOption::XmlParseHuge as i32 != 0 {
            XML_MAX_HUGE_LENGTH
        } else {
            XML_MAX_TEXT_LENGTH
        };

        let state = self.instate;
        self.instate = XmlParserInputState::XmlParserComment;
        let inputid = self.input().map(|input| input.id);
        self.advance(4);

        // Accelerated common case where input don't need to be
        // modified before passing it to the handler.
        let mut buf = String::new();
        loop {
            let content = self.content_bytes();
            let mut len = content
                .iter()
                .take_while(|&&b| {
                    b != b'-' && b != b'\r' && (b == b'\t' || b == b'\n' || (0x20..0x80).contains(&b))
                })
                .count();
            if let Ok(scanned) = from_utf8(&content[..len]) {
                buf.push_str(scanned);
            }
            // "\r\n" is folded by keeping only the '\n' for the next round.
            if content[len..].starts_with(b"\r\n") {
                len += 1;
            }
            self.advance_with_line_handling(len);
            if buf.len() > max_length {
                xml_fatal_err_msg(
                    self,
                    XmlParserErrors::XmlErrCommentNotFinished,
                    "Comment too big found\n",
                );
                return;
            }
            self.shrink();
            self.grow();
            if matches!(self.instate, XmlParserInputState::XmlParserEOF) {
                return;
            }

            if self.current_byte() != b'-' {
                break;
            }
            if self.nth_byte(1) == b'-' {
                if self.nth_byte(2) == b'>' {
                    if self.input().map(|input| input.id) != inputid {
                        xml_fatal_err_msg(
                            self,
                            XmlParserErrors::XmlErrEntityBoundary,
                            "comment doesn't start and stop in the same entity\n",
                        );
                    }
                    self.advance(3);
                    if !matches!(self.instate, XmlParserInputState::XmlParserEOF) {
                        self.instate = state;
                    }
                    if self.disable_sax == 0 {
                        if let Some(sax) = self.sax.as_deref_mut() {
                            sax.comment(&buf);
                        }
                    }
                    return;
                }
                xml_fatal_err_msg_str!(
                    self,
                    XmlParserErrors::XmlErrHyphenInComment,
                    "Double hyphen within comment: <!--{}\n",
                    buf
                );
                buf.push_str("--");
                self.advance(2);
            } else {
                buf.push('-');
                self.advance(1);
            }
        }

        self.parse_comment_complex(buf, state, inputid);
    }

    /// Slow path handling non-ASCII data, lone carriage returns and
    /// malformed endings with a three-character sliding window.
    #[doc(alias = "xmlParseCommentComplex")]
    fn parse_comment_complex(&mut self, mut buf: String, state: XmlParserInputState, inputid: Option<i32>) {
        let max_length = if self.options & XmlParserOption::XmlParseHuge as i32 != 0 {
            XML_MAX_HUGE_LENGTH
        } else {
            XML_MAX_TEXT_LENGTH
        };

        let Some((q, _)) = self.current_char() else {
            xml_fatal_err_msg_str!(
                self,
                XmlParserErrors::XmlErrCommentNotFinished,
                "Comment not terminated \n<!--{}\n",
                buf
            );
            return;
        };
        if !xml_is_char(q as u32) {
            xml_fatal_err_msg_int!(
                self,
                XmlParserErrors::XmlErrInvalidChar,
                "xmlParseComment: invalid xmlChar value {}\n",
                q as i32
            );
            return;
        }
        if q == '>' {
            // "<!-->"
            xml_fatal_err_msg(
                self,
                XmlParserErrors::XmlErrCommentAbruptlyEnded,
                "Comment abruptly ended",
            );
            return;
        }
        self.skip_char();
        let mut q = q;

        let Some((r, _)) = self.current_char() else {
            xml_fatal_err_msg_str!(
                self,
                XmlParserErrors::XmlErrCommentNotFinished,
                "Comment not terminated \n<!--{}\n",
                buf
            );
            return;
        };
        if !xml_is_char(r as u32) {
            xml_fatal_err_msg_int!(
                self,
                XmlParserErrors::XmlErrInvalidChar,
                "xmlParseComment: invalid xmlChar value {}\n",
                r as i32
            );
            return;
        }
        if q == '-' && r == '>' {
            // "<!--->"
            xml_fatal_err_msg(
                self,
                XmlParserErrors::XmlErrCommentAbruptlyEnded,
                "Comment abruptly ended",
            );
            return;
        }
        self.skip_char();
        let mut r = r;

        let mut cur = self.current_char().map(|(c, _)| c);
        while let Some(c) = cur {
            if !xml_is_char(c as u32) {
                break;
            }
            if c == '>' && r == '-' && q == '-' {
                break;
            }
            if r == '-' && q == '-' {
                xml_fatal_err(self, XmlParserErrors::XmlErrHyphenInComment, None);
            }
            buf.push(q);
            if buf.len() > max_length {
                xml_fatal_err_msg(
                    self,
                    XmlParserErrors::XmlErrCommentNotFinished,
                    "Comment too big found\n",
                );
                return;
            }
            q = r;
            r = c;
            self.skip_char();
            self.grow();
            cur = self.current_char().map(|(c, _)| c);
        }

        if matches!(self.instate, XmlParserInputState::XmlParserEOF) {
            return;
        }
        match cur {
            None => {
                xml_fatal_err_msg_str!(
                    self,
                    XmlParserErrors::XmlErrCommentNotFinished,
                    "Comment not terminated \n<!--{}\n",
                    buf
                );
            }
            Some(c) if c != '>' => {
                xml_fatal_err_msg_int!(
                    self,
                    XmlParserErrors::XmlErrInvalidChar,
                    "xmlParseComment: invalid xmlChar value {}\n",
                    c as i32
                );
            }
            Some(_) => {
                if self.input().map(|input| input.id) != inputid {
                    xml_fatal_err_msg(
                        self,
                        XmlParserErrors::XmlErrEntityBoundary,
                        "comment doesn't start and stop in the same entity\n",
                    );
                }
                self.skip_char();
                if !matches!(self.instate, XmlParserInputState::XmlParserEOF) {
                    self.instate = state;
                }
                if self.disable_sax == 0 {
                    if let Some(sax) = self.sax.as_deref_mut() {
                        sax.comment(&buf);
                    }
                }
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
    struct CommentSink {
        comments: Vec<String>,
    }

    impl XmlSaxHandler for CommentSink {
        fn comment(&mut self, content: &str) {
            self.comments.push(content.to_owned());
        }
    }

    fn parse_comment_from(content: &str, sax: &mut CommentSink) -> bool {
        let mut ctxt = XmlParserCtxt::new_sax_parser(Some(sax));
        let id = ctxt.next_input_id();
        ctxt.input_push(XmlParserInput::from_memory(content.as_bytes().to_vec(), id));
        ctxt.parse_comment();
        ctxt.well_formed
    }

    #[test]
    fn plain_comment_is_delivered() {
        let mut sax = CommentSink::default();
        assert!(parse_comment_from("<!-- hello, world -->", &mut sax));
        assert_eq!(sax.comments, [" hello, world "]);
    }

    #[test]
    fn single_hyphens_are_allowed() {
        let mut sax = CommentSink::default();
        assert!(parse_comment_from("<!-- a - b - c -->", &mut sax));
        assert_eq!(sax.comments, [" a - b - c "]);
    }

    #[test]
    fn double_hyphen_is_an_error() {
        let mut sax = CommentSink::default();
        assert!(!parse_comment_from("<!-- a -- b -->", &mut sax));
    }

    #[test]
    fn unterminated_comment_is_an_error() {
        let mut sax = CommentSink::default();
        assert!(!parse_comment_from("<!-- never ends", &mut sax));
        assert!(sax.comments.is_empty());
    }

    #[test]
    fn abruptly_ended_comment_is_an_error() {
        let mut sax = CommentSink::default();
        assert!(!parse_comment_from("<!-->", &mut sax));
        let mut sax = CommentSink::default();
        assert!(!parse_comment_from("<!--->", &mut sax));
    }

    #[test]
    fn crlf_folds_to_newline() {
        let mut sax = CommentSink::default();
        assert!(parse_comment_from("<!--a\r\nb-->", &mut sax));
        assert_eq!(sax.comments, ["a\nb"]);
    }

    #[test]
    fn non_ascii_content_takes_the_slow_path() {
        let mut sax = CommentSink::default();
        assert!(parse_comment_from("<!--caf\u{e9} \u{1f600}-->", &mut sax));
        assert_eq!(sax.comments, ["caf\u{e9} \u{1f600}"]);
    }
}
