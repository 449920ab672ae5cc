use std::rc::Rc;

use crate::{
    error::XmlParserErrors,
    parser::{
        XML_MAX_NAME_LENGTH, XML_MAX_TEXT_LENGTH, XmlParserCharValid, XmlParserCtxt,
        XmlParserInputState, XmlParserOption, build_qname, xml_fatal_err, xml_ns_err,
    },
};

/// Parse an XML Nmtoken.
///
/// ```text
/// [7] Nmtoken ::= (NameChar)+
///
/// [8] Nmtokens ::= Nmtoken (#x20 Nmtoken)*
/// ```
///
/// Returns the Nmtoken parsed or None
#[doc(alias = "xmlParseNmtoken")]
pub(crate) fn parse_nmtoken(ctxt: &mut XmlParserCtxt) -> Option<String> {
    let max_length = if ctxt.options & XmlParserOption::XmlParseHuge as i32 != 0 {
        XML_MAX_TEXT_LENGTH
    } else {
        XML_MAX_NAME_LENGTH
    };
    let mut res = String::new();

    while let Some(c) = ctxt.consume_char_if(|ctxt, c| c.is_name_char(ctxt)) {
        res.push(c);
        if res.len() > max_length {
            xml_fatal_err(ctxt, XmlParserErrors::XmlErrNameTooLong, Some("NmToken"));
            return None;
        }
    }
    if matches!(ctxt.instate, XmlParserInputState::XmlParserEOF) {
        return None;
    }
    if res.is_empty() {
        return None;
    }
    Some(res)
}

fn parse_ncname_complex(ctxt: &mut XmlParserCtxt) -> Option<Rc<str>> {
    let max_length = if ctxt.options & XmlParserOption::XmlParseHuge as i32 != 0 {
        XML_MAX_TEXT_LENGTH
    } else {
        XML_MAX_NAME_LENGTH
    };

    // Handler for more complex cases
    let c = ctxt.consume_char_if(|ctxt, c| {
        c != ' ' && c != '>' && c != '/' && c.is_name_start_char(ctxt) && c != ':'
    })?;
    let mut buf = String::with_capacity(c.len_utf8());
    buf.push(c);

    while let Some(c) = ctxt.consume_char_if(|ctxt, c| {
        c != ' ' && c != '>' && c != '/' && c.is_name_char(ctxt) && c != ':'
    }) {
        buf.push(c);
        if buf.len() > max_length {
            xml_fatal_err(ctxt, XmlParserErrors::XmlErrNameTooLong, Some("NCName"));
            return None;
        }
    }
    if matches!(ctxt.instate, XmlParserInputState::XmlParserEOF) {
        return None;
    }
    (!buf.is_empty()).then(|| ctxt.dict.intern(&buf))
}

/// Parse an XML name.
///
/// ```text
/// [4NS] NCNameChar ::= Letter | Digit | '.' | '-' | '_' | CombiningChar | Extender
///
/// [5NS] NCName ::= (Letter | '_') (NCNameChar)*
/// ```
///
/// Returns the Name parsed or None
#[doc(alias = "xmlParseNCName")]
pub(crate) fn parse_ncname(ctxt: &mut XmlParserCtxt) -> Option<Rc<str>> {
    let max_length = if ctxt.options & XmlParserOption::XmlParseHuge as i32 != 0 {
        XML_MAX_TEXT_LENGTH
    } else {
        XML_MAX_NAME_LENGTH
    };

    // Accelerator for simple ASCII names
    let content = ctxt.content_bytes();
    let mut end = None;
    if !content.is_empty() && (content[0].is_ascii_alphabetic() || content[0] == b'_') {
        for (i, &b) in content.iter().enumerate().skip(1) {
            if !b.is_ascii_alphanumeric() && b != b'_' && b != b'-' && b != b'.' {
                if (1..0x80).contains(&b) {
                    end = Some(i);
                }
                break;
            }
        }
    }
    if let Some(i) = end {
        if i > max_length {
            xml_fatal_err(ctxt, XmlParserErrors::XmlErrNameTooLong, Some("NCName"));
            return None;
        }
        let XmlParserCtxt {
            dict, input_tab, ..
        } = ctxt;
        // the run is pure ASCII, so the UTF-8 view cannot fail
        let name = input_tab
            .last()
            .map(|input| &input.content_bytes()[..i])
            .and_then(|bytes| std::str::from_utf8(bytes).ok())?;
        let res = dict.intern(name);
        // `content[..i]` contains no line delimiters,
        // so we need not use `ctxt.advance_with_line_handling(i)`.
        ctxt.advance(i);
        return Some(res);
    }
    parse_ncname_complex(ctxt)
}

fn parse_name_complex(ctxt: &mut XmlParserCtxt) -> Option<Rc<str>> {
    let max_length = if ctxt.options & XmlParserOption::XmlParseHuge as i32 != 0 {
        XML_MAX_TEXT_LENGTH
    } else {
        XML_MAX_NAME_LENGTH
    };
    let mut buf = String::new();

    // Handler for more complex cases
    if ctxt.options & XmlParserOption::XmlParseOld10 as i32 == 0 {
        // Use the new checks of production [4] [4a] amd [5] of the
        // Update 5 of XML-1.0
        let c = ctxt.consume_char_if(|_, c| {
            c != ' '
                && c != '>'
                && c != '/'
                && (c.is_ascii_alphabetic()
                    || c == '_'
                    || c == ':'
                    || ('\u{C0}'..='\u{D6}').contains(&c)
                    || ('\u{D8}'..='\u{F6}').contains(&c)
                    || ('\u{F8}'..='\u{2FF}').contains(&c)
                    || ('\u{370}'..='\u{37D}').contains(&c)
                    || ('\u{37F}'..='\u{1FFF}').contains(&c)
                    || ('\u{200C}'..='\u{200D}').contains(&c)
                    || ('\u{2070}'..='\u{218F}').contains(&c)
                    || ('\u{2C00}'..='\u{2FEF}').contains(&c)
                    || ('\u{3001}'..='\u{D7FF}').contains(&c)
                    || ('\u{F900}'..='\u{FDCF}').contains(&c)
                    || ('\u{FDF0}'..='\u{FFFD}').contains(&c)
                    || ('\u{10000}'..='\u{EFFFF}').contains(&c))
        })?;
        buf.push(c);
        while let Some(c) = ctxt.consume_char_if(|_, c| {
            c != ' '
                && c != '>'
                && c != '/'
                && (c.is_ascii_alphanumeric()
                    || c == '_'
                    || c == ':'
                    || c == '-'
                    || c == '.'
                    || c == '\u{B7}'
                    || ('\u{C0}'..='\u{D6}').contains(&c)
                    || ('\u{D8}'..='\u{F6}').contains(&c)
                    || ('\u{F8}'..='\u{2FF}').contains(&c)
                    || ('\u{300}'..='\u{36F}').contains(&c)
                    || ('\u{370}'..='\u{37D}').contains(&c)
                    || ('\u{37F}'..='\u{1FFF}').contains(&c)
                    || ('\u{200C}'..='\u{200D}').contains(&c)
                    || ('\u{203F}'..='\u{2040}').contains(&c)
                    || ('\u{2070}'..='\u{218F}').contains(&c)
                    || ('\u{2C00}'..='\u{2FEF}').contains(&c)
                    || ('\u{3001}'..='\u{D7FF}').contains(&c)
                    || ('\u{F900}'..='\u{FDCF}').contains(&c)
                    || ('\u{FDF0}'..='\u{FFFD}').contains(&c)
                    || ('\u{10000}'..='\u{EFFFF}').contains(&c))
        }) {
            buf.push(c);
            if buf.len() > max_length {
                xml_fatal_err(ctxt, XmlParserErrors::XmlErrNameTooLong, Some("Name"));
                return None;
            }
        }
    } else {
        let c = ctxt.consume_char_if(|ctxt, c| {
            c != ' ' && c != '>' && c != '/' && c.is_name_start_char(ctxt)
        })?;
        buf.push(c);

        while let Some(c) =
            ctxt.consume_char_if(|ctxt, c| c != ' ' && c != '>' && c != '/' && c.is_name_char(ctxt))
        {
            buf.push(c);
            if buf.len() > max_length {
                xml_fatal_err(ctxt, XmlParserErrors::XmlErrNameTooLong, Some("Name"));
                return None;
            }
        }
    }
    if matches!(ctxt.instate, XmlParserInputState::XmlParserEOF) {
        return None;
    }
    Some(ctxt.dict.intern(&buf))
}

/// Parse an XML name.
///
/// ```text
/// [4] NameChar ::= Letter | Digit | '.' | '-' | '_' | ':' | CombiningChar | Extender
///
/// [5] Name ::= (Letter | '_' | ':') (NameChar)*
///
/// [6] Names ::= Name (#x20 Name)*
/// ```
///
/// Returns the Name parsed or None
#[doc(alias = "xmlParseName")]
pub(crate) fn parse_name(ctxt: &mut XmlParserCtxt) -> Option<Rc<str>> {
    let max_length = if ctxt.options & XmlParserOption::XmlParseHuge as i32 != 0 {
        XML_MAX_TEXT_LENGTH
    } else {
        XML_MAX_NAME_LENGTH
    };

    if matches!(ctxt.instate, XmlParserInputState::XmlParserEOF) {
        return None;
    }

    // Accelerator for simple ASCII names
    let content = ctxt.content_bytes();
    let mut end = None;
    if !content.is_empty()
        && (content[0].is_ascii_alphabetic() || content[0] == b'_' || content[0] == b':')
    {
        for (i, &b) in content.iter().enumerate().skip(1) {
            if !b.is_ascii_alphanumeric() && b != b'_' && b != b'-' && b != b':' && b != b'.' {
                if (1..0x80).contains(&b) {
                    end = Some(i);
                }
                break;
            }
        }
    }
    if let Some(i) = end {
        if i > max_length {
            xml_fatal_err(ctxt, XmlParserErrors::XmlErrNameTooLong, Some("Name"));
            return None;
        }
        let XmlParserCtxt {
            dict, input_tab, ..
        } = ctxt;
        // the run is pure ASCII, so the UTF-8 view cannot fail
        let name = input_tab
            .last()
            .map(|input| &input.content_bytes()[..i])
            .and_then(|bytes| std::str::from_utf8(bytes).ok())?;
        let res = dict.intern(name);
        // `content[..i]` contains no line delimiters,
        // so we need not use `ctxt.advance_with_line_handling(i)`.
        ctxt.advance(i);
        return Some(res);
    }
    // accelerator for special cases
    parse_name_complex(ctxt)
}

/// Parse an XML name, but from a decoded string rather than the input flow.
///
/// Returns the parsed name and the remainder of the string.
#[doc(alias = "xmlParseStringName")]
pub(super) fn parse_string_name<'a>(
    ctxt: &mut XmlParserCtxt,
    s: &'a str,
) -> (Option<String>, &'a str) {
    let max_length = if ctxt.options & XmlParserOption::XmlParseHuge as i32 != 0 {
        XML_MAX_TEXT_LENGTH
    } else {
        XML_MAX_NAME_LENGTH
    };

    let mut end = 0;
    for (i, c) in s.char_indices() {
        let valid = if i == 0 {
            c.is_name_start_char(ctxt)
        } else {
            c.is_name_char(ctxt)
        };
        if !valid {
            break;
        }
        end = i + c.len_utf8();
        if end > max_length {
            xml_fatal_err(ctxt, XmlParserErrors::XmlErrNameTooLong, Some("NCName"));
            return (None, s);
        }
    }
    if end == 0 {
        return (None, s);
    }
    (Some(s[..end].to_owned()), &s[end..])
}

/// Parse an XML Namespace QName
///
/// ```text
/// [6]  QName  ::= (Prefix ':')? LocalPart
/// [7]  Prefix  ::= NCName
/// [8]  LocalPart  ::= NCName
/// ```
///
/// Returns `(Prefix, LocalPart)`. On a malformed QName such as a dangling
/// colon, the whole badly formed token is degraded into the local part so
/// parsing can continue.
#[doc(alias = "xmlParseQName")]
pub(crate) fn parse_qname(ctxt: &mut XmlParserCtxt) -> (Option<Rc<str>>, Option<Rc<str>>) {
    if matches!(ctxt.instate, XmlParserInputState::XmlParserEOF) {
        return (None, None);
    }

    let Some(l) = parse_ncname(ctxt) else {
        if ctxt.current_byte() == b':' {
            if let Some(l) = parse_name(ctxt) {
                xml_ns_err!(
                    ctxt,
                    XmlParserErrors::XmlNsErrQname,
                    "Failed to parse QName '{}'\n",
                    &*l
                );
                return (None, Some(l));
            }
        }
        return (None, None);
    };
    if ctxt.current_byte() == b':' {
        ctxt.skip_char();
        let p = l;
        let Some(l) = parse_ncname(ctxt) else {
            if matches!(ctxt.instate, XmlParserInputState::XmlParserEOF) {
                return (None, None);
            }
            xml_ns_err!(
                ctxt,
                XmlParserErrors::XmlNsErrQname,
                "Failed to parse QName '{}:'\n",
                &*p
            );
            let l = parse_nmtoken(ctxt);
            let qname = if let Some(l) = l.as_deref() {
                build_qname(l, Some(&p))
            } else {
                if matches!(ctxt.instate, XmlParserInputState::XmlParserEOF) {
                    return (None, None);
                }
                build_qname("", Some(&p))
            };
            let qname = ctxt.dict.intern(&qname);
            return (None, Some(qname));
        };
        if ctxt.current_byte() == b':' {
            xml_ns_err!(
                ctxt,
                XmlParserErrors::XmlNsErrQname,
                "Failed to parse QName '{}:{}:'\n",
                &*p,
                &*l
            );
            ctxt.skip_char();
            if let Some(tmp) = parse_name(ctxt) {
                let l = build_qname(&tmp, Some(&l));
                let l = ctxt.dict.intern(&l);
                return (Some(p), Some(l));
            }
            if matches!(ctxt.instate, XmlParserInputState::XmlParserEOF) {
                return (None, None);
            }
            let l = build_qname("", Some(&l));
            let l = ctxt.dict.intern(&l);
            return (Some(p), Some(l));
        }
        (Some(p), Some(l))
    } else {
        (None, Some(l))
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
    fn ascii_fast_path_matches_complex_path() {
        // Names that stay on the accelerated path and names that leave it
        // must tokenize identically.
        for (doc, expected) in [
            ("simple rest", "simple"),
            ("with-dash.dot_under:colon rest", "with-dash.dot_under:colon"),
            ("caf\u{e9}>", "caf\u{e9}"),
            ("\u{e9}l\u{e9}ment ", "\u{e9}l\u{e9}ment"),
        ] {
            let mut ctxt = ctxt_with_input(doc);
            let name = parse_name(&mut ctxt).expect(expected);
            assert_eq!(name.as_ref(), expected);
        }
    }

    #[test]
    fn name_is_interned() {
        let mut ctxt = ctxt_with_input("alpha alpha");
        let first = parse_name(&mut ctxt).unwrap();
        ctxt.skip_blanks();
        let second = parse_name(&mut ctxt).unwrap();
        assert!(Rc::ptr_eq(&first, &second));
    }

    #[test]
    fn qname_splits_prefix() {
        let mut ctxt = ctxt_with_input("a:b ");
        let (prefix, local) = parse_qname(&mut ctxt);
        assert_eq!(prefix.as_deref(), Some("a"));
        assert_eq!(local.as_deref(), Some("b"));
    }

    #[test]
    fn dangling_colon_degrades_into_local_part() {
        let mut ctxt = ctxt_with_input("a: ");
        let (prefix, local) = parse_qname(&mut ctxt);
        assert_eq!(prefix, None);
        assert_eq!(local.as_deref(), Some("a:"));
        assert!(!ctxt.ns_well_formed);
    }

    #[test]
    fn nmtoken_accepts_leading_digit() {
        let mut ctxt = ctxt_with_input("123abc ");
        assert_eq!(parse_nmtoken(&mut ctxt).as_deref(), Some("123abc"));
        let mut ctxt = ctxt_with_input(" x");
        assert_eq!(parse_nmtoken(&mut ctxt), None);
    }
}
