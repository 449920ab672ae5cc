//! A streaming, namespace-aware XML parsing engine.
//!
//! The crate exposes a SAX-style pull parser over in-memory documents and,
//! with the `libxml_push` feature (enabled by default), a progressive push
//! parser fed arbitrary byte chunks. Entity substitution is guarded against
//! exponential-expansion and reference-cycle attacks, and start tags are
//! resolved against the namespaces in scope before delivery.
//!
//! ```
//! use fluxml::{
//!     parser::xml_read_memory,
//!     sax::{SilentSaxHandler, XmlSaxHandler},
//! };
//!
//! let mut sax = SilentSaxHandler;
//! let code = xml_read_memory(b"<doc><a/><b/></doc>".to_vec(), 0, &mut sax);
//! assert!(code.is_ok());
//! ```

pub mod buf;
pub mod chvalid;
pub mod dict;
pub mod entity;
pub mod error;
pub mod parser;
pub mod sax;

use const_format::concatcp;

const MAJOR_VERSION: u32 = 0;
const MINOR_VERSION: u32 = 1;
const MICRO_VERSION: u32 = 0;

/// The version string of this crate, e.g. `"0.1.0"`.
pub const FLUXML_VERSION_STRING: &str =
    concatcp!(MAJOR_VERSION, ".", MINOR_VERSION, ".", MICRO_VERSION);

/// The namespace name bound, per the Namespaces in XML recommendation,
/// to the reserved `xml` prefix.
pub const XML_XML_NAMESPACE: &str = "http://www.w3.org/XML/1998/namespace";

/// The namespace name reserved for the `xmlns` prefix itself. It must never
/// be bound to any prefix by a document.
pub const XML_NS_NAMESPACE: &str = "http://www.w3.org/2000/xmlns/";
