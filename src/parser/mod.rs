//! The core parser module.
//!
//! As much as possible the functions are associated with their relative
//! production in the XML specification. The character-range productions
//! live in `crate::chvalid`; everything structural is here, split between
//! the pull-mode parsers under `parse`, the context/cursor machinery, and
//! the progressive (push) driver.

mod context;
mod error;
mod input;
pub mod parse;
#[cfg(feature = "libxml_push")]
mod push;
mod qname;

pub use context::*;
pub(crate) use error::*;
pub use input::*;
#[cfg(feature = "libxml_push")]
pub use push::*;
pub use qname::*;

use crate::{
    chvalid::{xml_is_combining, xml_is_digit, xml_is_extender, xml_is_letter},
    error::XmlParserErrors,
    sax::XmlSaxHandler,
};

pub(crate) use crate::chvalid::{xml_is_blank_char, xml_is_char};

/// Maximum size allowed for a single text node.
/// This is not a limitation of the parser but a safety boundary feature;
/// use the huge option to override it.
pub const XML_MAX_TEXT_LENGTH: usize = 10_000_000;

/// Maximum size allowed when the huge option is set.
pub const XML_MAX_HUGE_LENGTH: usize = 1_000_000_000;

/// Maximum size allowed for a markup identifier.
/// This is not a limitation of the parser but a safety boundary feature;
/// use the huge option to override it.
pub const XML_MAX_NAME_LENGTH: usize = 50_000;

/// Maximum size allowed by the parser for ahead lookup.
/// This is an upper boundary enforced by the parser to avoid bad behaviour
/// on "unfriendly" content; use the huge option to override it.
pub const XML_MAX_LOOKUP_LIMIT: usize = 10_000_000;

/// Identifiers can be longer, but this will be more costly at runtime.
pub const XML_MAX_NAMELEN: usize = 100;

/// The parser tries to always have that amount of input ready.
/// One of the points is providing context when reporting errors.
pub(crate) const INPUT_CHUNK: usize = 250;

/// Tail kept in the buffer when the consumed prefix is discarded, so error
/// context around the current position survives a shrink.
pub(crate) const LINE_LEN: usize = 80;

/// Largest amount of character data the push driver delivers in one
/// callback when the terminator of the section is not buffered yet.
#[cfg(feature = "libxml_push")]
pub(crate) const XML_PARSER_BIG_BUFFER_SIZE: usize = 300;

// Maximum amount of (expanded) entity text an input of a given size may
// produce before the expansion is considered an attack.
// XML_PARSER_NON_LINEAR is roughly the maximum allowed amplification factor
// relative to the genuinely consumed input bytes, applied only once the
// expansion also exceeds the fixed floor XML_PARSER_ALLOWED_EXPANSION.
pub(crate) const XML_PARSER_NON_LINEAR: usize = 10;
pub(crate) const XML_PARSER_ALLOWED_EXPANSION: usize = 1_000_000;
// Fixed cost charged for every entity dereference, discouraging attacks
// built from very many references to very small entities.
pub(crate) const XML_ENT_FIXED_COST: usize = 20;

// Whether to substitute entity references and/or parameter-entity
// references while decoding replacement text.
pub(crate) const XML_SUBSTITUTE_REF: i32 = 1;
pub(crate) const XML_SUBSTITUTE_PEREF: i32 = 2;

/// The default version of XML used: 1.0
pub(crate) const XML_DEFAULT_VERSION: &str = "1.0";

/// Arbitrary depth limit for the open-element stack when the huge option
/// is not set. The element stack grows by Vec reallocation, this is only
/// a safety boundary against abusive documents.
pub(crate) const XML_PARSER_MAX_DEPTH: usize = 256;

/// This is the set of XML parser options that can be passed down
/// to the `use_options` routine of the context.
#[doc(alias = "xmlParserOption")]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum XmlParserOption {
    /// recover on errors
    XmlParseRecover = 1 << 0,
    /// substitute entities
    XmlParseNoEnt = 1 << 1,
    /// suppress error reports
    XmlParseNoError = 1 << 5,
    /// suppress warning reports
    XmlParseNoWarning = 1 << 6,
    /// pedantic error reporting
    XmlParsePedantic = 1 << 7,
    /// remove blank nodes
    XmlParseNoBlanks = 1 << 8,
    /// remove redundant namespaces declarations
    XmlParseNsclean = 1 << 13,
    /// parse using XML-1.0 before update 5
    XmlParseOld10 = 1 << 17,
    /// relax any hardcoded limit from the parser
    XmlParseHuge = 1 << 19,
}

/// The parser is progressive (push mode) and keeps a state per construct in
/// progress: this is the set of possible states.
#[doc(alias = "xmlParserInputState")]
#[repr(i32)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum XmlParserInputState {
    XmlParserEOF = -1,
    #[default]
    XmlParserStart = 0,
    XmlParserMisc,
    XmlParserPI,
    XmlParserDTD,
    XmlParserProlog,
    XmlParserComment,
    XmlParserStartTag,
    XmlParserContent,
    XmlParserCDATASection,
    XmlParserEndTag,
    XmlParserEntityDecl,
    XmlParserEntityValue,
    XmlParserAttributeValue,
    XmlParserSystemLiteral,
    XmlParserEpilog,
    XmlParserPublicLiteral,
}

pub(crate) trait XmlParserCharValid {
    fn is_name_char(&self, ctxt: &XmlParserCtxt) -> bool;
    // The two following functions are related to the change of accepted
    // characters for Name and NmToken in the Revision 5 of XML-1.0
    // They correspond to the modified production [4] and the new production
    // [4a] changes in that revision. Also note that the macros used for the
    // productions Letter, Digit, CombiningChar and Extender are not needed
    // anymore.
    // We still keep compatibility to pre-revision5 parsing semantic if the
    // XML_PARSE_OLD10 option is given to the parser.
    fn is_name_start_char(&self, ctxt: &XmlParserCtxt) -> bool;
}

impl XmlParserCharValid for u32 {
    fn is_name_char(&self, ctxt: &XmlParserCtxt) -> bool {
        let c = *self;
        if ctxt.options & XmlParserOption::XmlParseOld10 as i32 == 0 {
            // Use the new checks of production [4] [4a] amd [5] of the
            // Update 5 of XML-1.0
            c != b' ' as u32
                && c != b'>' as u32
                && c != b'/' as u32
                && ((c >= b'a' as u32 && c <= b'z' as u32)
                    || (c >= b'A' as u32 && c <= b'Z' as u32)
                    || (c >= b'0' as u32 && c <= b'9' as u32)
                    || c == b'_' as u32
                    || c == b':' as u32
                    || c == b'-' as u32
                    || c == b'.' as u32
                    || c == 0xB7
                    || (0xC0..=0xD6).contains(&c)
                    || (0xD8..=0xF6).contains(&c)
                    || (0xF8..=0x2FF).contains(&c)
                    || (0x300..=0x36F).contains(&c)
                    || (0x370..=0x37D).contains(&c)
                    || (0x37F..=0x1FFF).contains(&c)
                    || (0x200C..=0x200D).contains(&c)
                    || (0x203F..=0x2040).contains(&c)
                    || (0x2070..=0x218F).contains(&c)
                    || (0x2C00..=0x2FEF).contains(&c)
                    || (0x3001..=0xD7FF).contains(&c)
                    || (0xF900..=0xFDCF).contains(&c)
                    || (0xFDF0..=0xFFFD).contains(&c)
                    || (0x10000..=0xEFFFF).contains(&c))
        } else {
            xml_is_letter(c)
                || xml_is_digit(c)
                || c == b'.' as u32
                || c == b'-' as u32
                || c == b'_' as u32
                || c == b':' as u32
                || xml_is_combining(c)
                || xml_is_extender(c)
        }
    }

    fn is_name_start_char(&self, ctxt: &XmlParserCtxt) -> bool {
        let c = *self;
        if ctxt.options & XmlParserOption::XmlParseOld10 as i32 == 0 {
            // Use the new checks of production [4] [4a] amd [5] of the
            // Update 5 of XML-1.0
            c != b' ' as u32
                && c != b'>' as u32
                && c != b'/' as u32
                && ((c >= b'a' as u32 && c <= b'z' as u32)
                    || (c >= b'A' as u32 && c <= b'Z' as u32)
                    || c == b'_' as u32
                    || c == b':' as u32
                    || (0xC0..=0xD6).contains(&c)
                    || (0xD8..=0xF6).contains(&c)
                    || (0xF8..=0x2FF).contains(&c)
                    || (0x370..=0x37D).contains(&c)
                    || (0x37F..=0x1FFF).contains(&c)
                    || (0x200C..=0x200D).contains(&c)
                    || (0x2070..=0x218F).contains(&c)
                    || (0x2C00..=0x2FEF).contains(&c)
                    || (0x3001..=0xD7FF).contains(&c)
                    || (0xF900..=0xFDCF).contains(&c)
                    || (0xFDF0..=0xFFFD).contains(&c)
                    || (0x10000..=0xEFFFF).contains(&c))
        } else {
            xml_is_letter(c) || c == b'_' as u32 || c == b':' as u32
        }
    }
}

impl XmlParserCharValid for char {
    fn is_name_char(&self, ctxt: &XmlParserCtxt) -> bool {
        (*self as u32).is_name_char(ctxt)
    }

    fn is_name_start_char(&self, ctxt: &XmlParserCtxt) -> bool {
        (*self as u32).is_name_start_char(ctxt)
    }
}

/// Parse an XML in-memory document, delivering structure to `sax`.
///
/// Returns `XmlErrOK` when the document is well-formed (or recovery is
/// enabled), otherwise the first fatal error code.
#[doc(alias = "xmlReadMemory")]
pub fn xml_read_memory(
    buffer: Vec<u8>,
    options: i32,
    sax: &mut dyn XmlSaxHandler,
) -> XmlParserErrors {
    let mut ctxt = XmlParserCtxt::new_sax_parser(Some(sax));
    xml_ctxt_read_memory(&mut ctxt, buffer, options)
}

/// Parse an XML in-memory document, reusing the existing parser context.
#[doc(alias = "xmlCtxtReadMemory")]
pub fn xml_ctxt_read_memory(
    ctxt: &mut XmlParserCtxt,
    buffer: Vec<u8>,
    options: i32,
) -> XmlParserErrors {
    ctxt.reset();
    ctxt.use_options(options);
    let id = ctxt.next_input_id();
    ctxt.input_push(XmlParserInput::from_memory(buffer, id));
    ctxt.parse_document();
    if ctxt.well_formed || ctxt.recovery {
        XmlParserErrors::XmlErrOK
    } else if let Ok(code) = XmlParserErrors::try_from(ctxt.err_no) {
        code
    } else {
        XmlParserErrors::XmlErrInternalError
    }
}
