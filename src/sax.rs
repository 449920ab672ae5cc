//! The structural event consumer interface.
//!
//! This is the only channel by which parsed structure leaves the engine.
//! Implementations override the events they care about; every method has an
//! empty default so a consumer interested only in, say, character data stays
//! small.

use std::rc::Rc;

use crate::{
    entity::XmlEntityType,
    error::XmlError,
    parser::parse::dtd::{
        XmlAttributeDefault, XmlAttributeType, XmlElementContent, XmlElementTypeVal, XmlEnumeration,
    },
};

/// One resolved attribute as delivered with a start-element event.
/// Namespace-declaration pseudo-attributes never appear here; they are
/// reported through the `namespaces` slice instead.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SaxAttribute {
    pub local_name: Rc<str>,
    pub prefix: Option<Rc<str>>,
    /// Resolved namespace URI, `None` for attributes in no namespace.
    pub uri: Option<Rc<str>>,
    pub value: String,
}

/// A namespace declaration carried on a start tag:
/// `(prefix, bound URI)`, `None` prefix for the default namespace.
pub type SaxNamespace = (Option<Rc<str>>, Rc<str>);

/// A SAX handler receives callbacks from the parser while the document is
/// processed, in document order.
#[doc(alias = "xmlSAXHandler")]
#[allow(unused_variables)]
pub trait XmlSaxHandler {
    /// Called when the document starts being processed.
    #[doc(alias = "startDocumentSAXFunc")]
    fn start_document(&mut self) {}

    /// Called when the document end has been detected.
    #[doc(alias = "endDocumentSAXFunc")]
    fn end_document(&mut self) {}

    /// An element start has been detected, with its namespace information
    /// and the declarations appearing on this tag.
    #[doc(alias = "startElementNsSAX2Func")]
    fn start_element_ns(
        &mut self,
        local_name: &str,
        prefix: Option<&str>,
        uri: Option<&str>,
        namespaces: &[SaxNamespace],
        attributes: &[SaxAttribute],
    ) {
    }

    /// An element end has been detected.
    #[doc(alias = "endElementNsSAX2Func")]
    fn end_element_ns(&mut self, local_name: &str, prefix: Option<&str>, uri: Option<&str>) {}

    /// Receiving some characters from the parser.
    #[doc(alias = "charactersSAXFunc")]
    fn characters(&mut self, data: &str) {}

    /// Receiving some ignorable whitespace from the parser.
    #[doc(alias = "ignorableWhitespaceSAXFunc")]
    fn ignorable_whitespace(&mut self, data: &str) {}

    /// A CDATA section has been parsed. Distinguished from `characters` so
    /// consumers can preserve the distinction.
    #[doc(alias = "cdataBlockSAXFunc")]
    fn cdata_block(&mut self, data: &str) {}

    /// A comment has been parsed.
    #[doc(alias = "commentSAXFunc")]
    fn comment(&mut self, content: &str) {}

    /// A processing instruction has been parsed.
    #[doc(alias = "processingInstructionSAXFunc")]
    fn processing_instruction(&mut self, target: &str, data: Option<&str>) {}

    /// An entity reference was left unsubstituted in content (the
    /// substitute-entities option is off).
    #[doc(alias = "referenceSAXFunc")]
    fn reference(&mut self, name: &str) {}

    /// Callback on internal subset declaration.
    #[doc(alias = "internalSubsetSAXFunc")]
    fn internal_subset(&mut self, name: &str, external_id: Option<&str>, system_id: Option<&str>) {}

    /// An entity definition has been parsed.
    #[doc(alias = "entityDeclSAXFunc")]
    fn entity_decl(
        &mut self,
        name: &str,
        etype: XmlEntityType,
        public_id: Option<&str>,
        system_id: Option<&str>,
        content: Option<&str>,
    ) {
    }

    /// An attribute definition has been parsed.
    #[doc(alias = "attributeDeclSAXFunc")]
    fn attribute_decl(
        &mut self,
        elem: &str,
        fullname: &str,
        atype: XmlAttributeType,
        def: XmlAttributeDefault,
        default_value: Option<&str>,
        tree: Option<&XmlEnumeration>,
    ) {
    }

    /// An element definition has been parsed.
    #[doc(alias = "elementDeclSAXFunc")]
    fn element_decl(
        &mut self,
        name: &str,
        etype: XmlElementTypeVal,
        content: Option<&XmlElementContent>,
    ) {
    }

    /// What to do when a notation declaration has been parsed.
    #[doc(alias = "notationDeclSAXFunc")]
    fn notation_decl(&mut self, name: &str, public_id: Option<&str>, system_id: Option<&str>) {}

    /// What to do when an unparsed entity declaration is parsed.
    #[doc(alias = "unparsedEntityDeclSAXFunc")]
    fn unparsed_entity_decl(
        &mut self,
        name: &str,
        public_id: Option<&str>,
        system_id: Option<&str>,
        notation_name: Option<&str>,
    ) {
    }

    /// Display and format a warning message.
    #[doc(alias = "warningSAXFunc")]
    fn warning(&mut self, error: &XmlError) {}

    /// Display and format a recoverable error message.
    #[doc(alias = "errorSAXFunc")]
    fn error(&mut self, error: &XmlError) {}

    /// Display and format a fatal error message.
    #[doc(alias = "fatalErrorSAXFunc")]
    fn fatal_error(&mut self, error: &XmlError) {}
}

/// The do-nothing handler. Used when the caller only wants the
/// well-formedness verdict.
#[derive(Debug, Default)]
pub struct SilentSaxHandler;

impl XmlSaxHandler for SilentSaxHandler {}
