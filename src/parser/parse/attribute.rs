use std::{borrow::Cow, rc::Rc};

use crate::{
    entity::XML_ENT_CHECKED,
    error::XmlParserErrors,
    parser::{
        XML_MAX_HUGE_LENGTH, XML_MAX_TEXT_LENGTH, XML_SUBSTITUTE_REF, XmlParserCtxt,
        XmlParserInputState, XmlParserOption, build_qname, xml_fatal_err, xml_fatal_err_msg,
        xml_fatal_err_msg_str, xml_is_char, xml_warning_msg,
    },
};

use super::{
    entity::string_decode_entities_int,
    parse_qname,
    reference::{parse_char_ref, parse_entity_ref},
};

/// Normalize the space in non CDATA attribute values:
/// If the attribute type is not CDATA, then the XML processor MUST further
/// process the normalized attribute value by discarding any leading and
/// trailing space (#x20) characters, and by replacing sequences of space
/// (#x20) characters by a single space (#x20) character.
///
/// If no compaction is needed, return the trimmed input as `Cow::Borrowed`.
/// Otherwise, return the compacted string as `Cow::Owned`.
#[doc(alias = "xmlAttrNormalizeSpace")]
pub(crate) fn attr_normalize_space(mut src: &str) -> Cow<'_, str> {
    src = src.trim_matches(' ');
    if !src.contains("  ") {
        return Cow::Borrowed(src);
    }
    let mut dst = String::with_capacity(src.len());
    let mut src = src.chars().peekable();
    while let Some(b) = src.next() {
        if b == ' ' {
            // reduce single spaces
            while src.next_if(|&b| b == ' ').is_some() {}
            if src.peek().is_some() {
                dst.push(' ');
            }
        } else {
            dst.push(b);
        }
    }
    Cow::Owned(dst)
}

/// A loose syntactic check for xml:lang values, kept as a warning only
/// since XML second edition deprecated the strict production.
#[doc(alias = "xmlCheckLanguageID")]
fn check_language_id(lang: &str) -> bool {
    !lang.is_empty()
        && lang.split('-').enumerate().all(|(i, sub)| {
            !sub.is_empty()
                && sub.len() <= 8
                && sub
                    .bytes()
                    .all(|b| b.is_ascii_alphabetic() || (i > 0 && b.is_ascii_digit()))
        })
}

impl XmlParserCtxt<'_> {
    /// Parse a value for an attribute.
    ///
    /// 3.3.3 Attribute-Value Normalization:
    /// Before the value of an attribute is passed to the application or
    /// checked for validity, the XML processor must normalize it as follows:
    /// - a character reference is processed by appending the referenced
    ///   character to the attribute value
    /// - an entity reference is processed by recursively processing the
    ///   replacement text of the entity
    /// - a whitespace character (#x20, #xD, #xA, #x9) is processed by
    ///   appending #x20 to the normalized value, except that only a single
    ///   #x20 is appended for a "#xD#xA" sequence that is part of an external
    ///   parsed entity or the literal entity value of an internal parsed entity
    /// - other characters are processed by appending them to the normalized value
    ///   If the declared value is not CDATA, then the XML processor must further
    ///   process the normalized attribute value by discarding any leading and
    ///   trailing space (#x20) characters, and by replacing sequences of space
    ///   (#x20) characters by a single space (#x20) character.
    ///   All attributes for which no declaration has been read should be treated
    ///   by a non-validating parser as if declared CDATA.
    #[doc(alias = "xmlParseAttValueInternal")]
    pub(crate) fn parse_att_value_internal(&mut self, normalize: bool) -> Option<String> {
        let max_length = if self.options & XmlParserOption::XmlParseHuge as i32 != 0 {
            XML_MAX_HUGE_LENGTH
        } else {
            XML_MAX_TEXT_LENGTH
        };

        self.grow();
        if !matches!(self.content_bytes().first(), Some(b'"' | b'\'')) {
            xml_fatal_err(self, XmlParserErrors::XmlErrAttributeNotStarted, None);
            return None;
        }
        self.instate = XmlParserInputState::XmlParserAttributeValue;
        let content = self.content_bytes();

        // try to handle in this routine the most common case where no
        // allocation of a new string is required and where content is pure ASCII.
        let limit = content[0];
        let input = &content[1..];
        let mut pos = 0usize;
        let (start, len, consumed) = if normalize {
            // Skip any leading spaces
            while matches!(input.get(pos), Some(b'\x20' | b'\t' | b'\n' | b'\r')) {
                pos += 1;
            }
            let start = pos;
            while let Some(&b) = input.get(pos) {
                if b == limit || b == b'&' || b == b'<' || !(0x20..0x80).contains(&b) {
                    break;
                }
                if b == b'\x20' && input.get(pos + 1) == Some(&b'\x20') {
                    // space compaction needed, take the slow path
                    return self.parse_att_value_complex(normalize);
                }
                pos += 1;
            }
            // measure without the trailing spaces
            let mut len = pos - start;
            while len > 0 && input[start + len - 1] == b'\x20' {
                len -= 1;
            }
            // skip the trailing blanks
            while matches!(input.get(pos), Some(b'\x20' | b'\t' | b'\n' | b'\r')) {
                pos += 1;
            }
            if input.get(pos) != Some(&limit) {
                return self.parse_att_value_complex(normalize);
            }
            (start, len, pos)
        } else {
            while let Some(&b) = input.get(pos) {
                if b == limit || b == b'&' || b == b'<' || !(0x20..0x80).contains(&b) {
                    break;
                }
                pos += 1;
            }
            if input.get(pos) != Some(&limit) {
                return self.parse_att_value_complex(normalize);
            }
            (0, pos, pos)
        };
        if consumed > max_length {
            xml_fatal_err_msg(
                self,
                XmlParserErrors::XmlErrAttributeNotFinished,
                "AttValue length too long\n",
            );
            return None;
        }
        // the run is pure ASCII, so the UTF-8 view cannot fail
        let ret = std::str::from_utf8(&input[start..start + len])
            .ok()?
            .to_owned();
        // consumed : the length of parsed value (and trimmed spaces if `normalize`)
        // 2        : both `limit` quotes
        self.advance_with_line_handling(consumed + 2);
        Some(ret)
    }

    /// Parse a value for an attribute, this is the fallback function
    /// of xmlParseAttValue() when the attribute parsing requires handling
    /// of non-ASCII characters, entity substitution or normalization
    /// compaction.
    #[doc(alias = "xmlParseAttValueComplex")]
    fn parse_att_value_complex(&mut self, normalize: bool) -> Option<String> {
        let max_length = if self.options & XmlParserOption::XmlParseHuge as i32 != 0 {
            XML_MAX_HUGE_LENGTH
        } else {
            XML_MAX_TEXT_LENGTH
        };
        let mut in_space = false;

        let limit = match self.current_byte() {
            b @ (b'"' | b'\'') => {
                self.instate = XmlParserInputState::XmlParserAttributeValue;
                self.skip_char();
                b
            }
            _ => {
                xml_fatal_err(self, XmlParserErrors::XmlErrAttributeNotStarted, None);
                return None;
            }
        };

        // allocate a translation buffer.
        let mut buf = String::with_capacity(100);
        // OK loop until we reach one of the ending chars or a size limit.
        let mut last_char = '\0';
        loop {
            if matches!(self.instate, XmlParserInputState::XmlParserEOF) {
                return None;
            }
            if self.current_byte() == limit {
                break;
            }
            let Some((c, l)) = self.current_char() else {
                break;
            };
            last_char = c;
            if !xml_is_char(c as u32) || c == '<' {
                break;
            }
            if c == '&' {
                in_space = false;
                if self.nth_byte(1) == b'#' {
                    let val = parse_char_ref(self);
                    if val == Some('&') {
                        if self.replace_entities {
                            buf.push('&');
                        } else {
                            // The reparsing will be done later when the
                            // attribute value is decoded by the consumer
                            buf.push_str("&#38;");
                        }
                    } else if let Some(val) = val {
                        buf.push(val);
                    }
                } else {
                    let ent = parse_entity_ref(self);
                    if let Some(ent) = ent.as_deref().filter(|ent| ent.is_predefined()) {
                        let content = ent.content.as_deref().unwrap_or("");
                        if !self.replace_entities && content.starts_with('&') {
                            buf.push_str("&#38;");
                        } else {
                            buf.push_str(content);
                        }
                    } else if let Some(ent) = ent.as_deref().filter(|_| self.replace_entities) {
                        if let Some(content) = ent.content.clone() {
                            if !self.parser_entity_check(content.len() as u64) {
                                return None;
                            }

                            self.depth += 1;
                            let rep = string_decode_entities_int(
                                self,
                                &content,
                                XML_SUBSTITUTE_REF,
                                '\0',
                                '\0',
                                '\0',
                                true,
                            );
                            self.depth -= 1;
                            if let Some(rep) = rep {
                                for c in rep.chars() {
                                    if c == '\r' || c == '\n' || c == '\t' {
                                        buf.push('\x20');
                                    } else {
                                        buf.push(c);
                                    }
                                }
                            }
                        }
                    } else if let Some(ent) = ent {
                        // We also check for recursion and amplification
                        // when entities are not substituted. They're
                        // often expanded later.
                        if !ent.is_predefined() {
                            if let Some(content) = ent.content.clone() {
                                if !ent.has_flag(XML_ENT_CHECKED) {
                                    let old_copy = self.sizeentcopy;
                                    self.sizeentcopy = content.len() as u64;

                                    self.depth += 1;
                                    let rep = string_decode_entities_int(
                                        self,
                                        &content,
                                        XML_SUBSTITUTE_REF,
                                        '\0',
                                        '\0',
                                        '\0',
                                        true,
                                    );
                                    self.depth -= 1;

                                    // If we're parsing DTD content, the entity
                                    // might reference other entities which
                                    // weren't defined yet, so the check isn't
                                    // reliable.
                                    if self.in_subset == 0 && rep.is_some() {
                                        ent.set_flag(XML_ENT_CHECKED);
                                        ent.expanded_size.set(self.sizeentcopy);
                                    }

                                    if !self.parser_entity_check(old_copy) {
                                        return None;
                                    }
                                } else if !self.parser_entity_check(ent.expanded_size.get()) {
                                    return None;
                                }
                            }
                        }

                        // Just output the reference
                        buf.push('&');
                        buf.push_str(&ent.name);
                        buf.push(';');
                    }
                }
            } else {
                if c == '\u{20}' || c == '\u{D}' || c == '\u{A}' || c == '\u{9}' {
                    if !buf.is_empty() || !normalize {
                        if !normalize || !in_space {
                            buf.push('\x20');
                        }
                        in_space = true;
                    }
                } else {
                    in_space = false;
                    buf.push(c);
                }
                self.advance_with_line_handling(l);
            }
            if buf.len() > max_length {
                xml_fatal_err_msg(
                    self,
                    XmlParserErrors::XmlErrAttributeNotFinished,
                    "AttValue length too long\n",
                );
                return None;
            }
        }
        if matches!(self.instate, XmlParserInputState::XmlParserEOF) {
            return None;
        }

        if in_space && normalize {
            while buf.ends_with('\x20') {
                buf.pop();
            }
        }
        if self.current_byte() == b'<' {
            xml_fatal_err(self, XmlParserErrors::XmlErrLtInAttribute, None);
        } else if self.current_byte() != limit {
            if last_char != '\0' && !xml_is_char(last_char as u32) {
                xml_fatal_err_msg(
                    self,
                    XmlParserErrors::XmlErrInvalidChar,
                    "invalid character in attribute value\n",
                );
            } else {
                xml_fatal_err_msg(
                    self,
                    XmlParserErrors::XmlErrAttributeNotFinished,
                    "AttValue: ' expected\n",
                );
            }
        } else {
            self.skip_char();
        }

        Some(buf)
    }

    /// Parse a value for an attribute.
    /// Note: the parser won't do substitution of entities here, this
    /// will be handled later when the consumer decodes the value
    ///
    /// ```text
    /// [10] AttValue ::= '"' ([^<&"] | Reference)* '"' | "'" ([^<&'] | Reference)* "'"
    /// ```
    #[doc(alias = "xmlParseAttValue")]
    pub(crate) fn parse_att_value(&mut self) -> Option<String> {
        self.input()?;
        self.parse_att_value_internal(false)
    }

    /// Parse one attribute of a start tag.
    ///
    /// `pref` and `elem` identify the enclosing element so the declared
    /// attribute type can be looked up; non-CDATA attributes get the extra
    /// space normalization pass.
    ///
    /// Returns (Prefix, LocalPart, AttValue).
    #[doc(alias = "xmlParseAttribute2")]
    pub(crate) fn parse_attribute2(
        &mut self,
        pref: Option<&str>,
        elem: &str,
    ) -> Option<(Option<Rc<str>>, Rc<str>, Option<String>)> {
        self.grow();

        let (prefix, Some(name)) = parse_qname(self) else {
            xml_fatal_err_msg(
                self,
                XmlParserErrors::XmlErrNameRequired,
                "error parsing attribute name\n",
            );
            return None;
        };

        // get the type if needed
        let elem_full: Rc<str> = Rc::from(build_qname(elem, pref).as_ref());
        let att_full: Rc<str> = Rc::from(build_qname(&name, prefix.as_deref()).as_ref());
        let normalize = self.atts_special.contains_key(&(elem_full, att_full));

        // read the value
        self.skip_blanks();

        if self.current_byte() != b'=' {
            xml_fatal_err_msg_str!(
                self,
                XmlParserErrors::XmlErrAttributeWithoutValue,
                "Specification mandates value for attribute {}\n",
                &*name
            );
            return Some((None, name, None));
        }
        self.skip_char();
        self.skip_blanks();
        let mut val = self.parse_att_value_internal(normalize)?;
        if normalize {
            // Sometimes a second normalisation pass for spaces is needed
            // but that only happens if charrefs or entities references
            // have been used in the attribute value, i.e. the attribute
            // value have been extracted in an allocated string already.
            let val2 = attr_normalize_space(&val);
            if val != val2 {
                val = val2.into_owned();
            }
        }
        self.instate = XmlParserInputState::XmlParserContent;

        if prefix.as_deref() == Some("xml") {
            // Check that xml:lang conforms to the specification
            // No more registered as an error, just generate a warning now
            // since this was deprecated in XML second edition
            if self.pedantic && name.as_ref() == "lang" && !check_language_id(&val) {
                xml_warning_msg!(
                    self,
                    XmlParserErrors::XmlWarLangValue,
                    "Malformed value for xml:lang : {}\n",
                    val
                );
            }

            // Check that xml:space conforms to the specification
            if name.as_ref() == "space" {
                if val == "default" {
                    if let Some(space) = self.space_mut() {
                        *space = 0;
                    }
                } else if val == "preserve" {
                    if let Some(space) = self.space_mut() {
                        *space = 1;
                    }
                } else {
                    xml_warning_msg!(
                        self,
                        XmlParserErrors::XmlWarSpaceValue,
                        "Invalid value \"{}\" for xml:space : \"default\" or \"preserve\" expected\n",
                        val
                    );
                }
            }
        }

        Some((prefix, name, Some(val)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::XmlParserInput;

    fn ctxt_with_input(content: &str) -> XmlParserCtxt<'static> {
        let mut ctxt = XmlParserCtxt::new_sax_parser(None);
        let id = ctxt.next_input_id();
        ctxt.input_push(XmlParserInput::from_memory(content.as_bytes().to_vec(), id));
        ctxt
    }

    #[test]
    fn normalize_space_compacts_runs() {
        assert!(matches!(attr_normalize_space("a b"), Cow::Borrowed("a b")));
        assert!(matches!(
            attr_normalize_space("  a b  "),
            Cow::Borrowed("a b")
        ));
        assert_eq!(attr_normalize_space("  a   b  ").as_ref(), "a b");
        assert_eq!(attr_normalize_space("    ").as_ref(), "");
    }

    #[test]
    fn plain_value_takes_the_ascii_path() {
        let mut ctxt = ctxt_with_input("\"hello world\" rest");
        assert_eq!(ctxt.parse_att_value().as_deref(), Some("hello world"));
        assert_eq!(ctxt.current_byte(), b' ');
    }

    #[test]
    fn cdata_value_keeps_inner_spaces() {
        let mut ctxt = ctxt_with_input("'  a   b  '");
        assert_eq!(ctxt.parse_att_value().as_deref(), Some("  a   b  "));
    }

    #[test]
    fn non_cdata_value_is_trimmed_and_compacted() {
        let mut ctxt = ctxt_with_input("'  a   b  '");
        let val = ctxt.parse_att_value_internal(true).unwrap();
        let val = attr_normalize_space(&val).into_owned();
        assert_eq!(val, "a b");
    }

    #[test]
    fn whitespace_chars_map_to_space() {
        let mut ctxt = ctxt_with_input("'a\tb\nc'");
        assert_eq!(ctxt.parse_att_value().as_deref(), Some("a b c"));
    }

    #[test]
    fn amp_char_ref_is_reserialized() {
        // An unsubstituted '&' must stay escaped so a later decode of the
        // value cannot misread it as starting a reference.
        let mut ctxt = ctxt_with_input("'a&#38;b'");
        assert_eq!(ctxt.parse_att_value().as_deref(), Some("a&#38;b"));

        let mut ctxt = ctxt_with_input("'a&amp;b'");
        assert_eq!(ctxt.parse_att_value().as_deref(), Some("a&#38;b"));

        let mut ctxt = ctxt_with_input("'a&#38;b'");
        ctxt.replace_entities = true;
        assert_eq!(ctxt.parse_att_value().as_deref(), Some("a&b"));
    }

    #[test]
    fn unescaped_lt_is_rejected() {
        let mut ctxt = ctxt_with_input("'a < b'");
        ctxt.parse_att_value();
        assert_eq!(ctxt.err_no, XmlParserErrors::XmlErrLtInAttribute as i32);
    }

    #[test]
    fn language_id_syntax() {
        assert!(check_language_id("en"));
        assert!(check_language_id("en-US"));
        assert!(check_language_id("x-klingon1"));
        assert!(!check_language_id(""));
        assert!(!check_language_id("toolongsubtag1"));
        assert!(!check_language_id("en--us"));
    }
}
