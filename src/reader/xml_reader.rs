use std::borrow::Cow;
use std::collections::HashMap;
use std::fs;
use std::path::Path;

use quick_xml::events::{BytesRef, BytesStart, Event};
use quick_xml::reader::Reader;
use tracing::debug;

use crate::error::ConvertError;

/// One element of a parsed XML document.
///
/// `text` holds the character data between the start tag and the first child
/// element, exactly as written (entities resolved, CDATA included, nothing
/// trimmed). It stays `None` when there is no such character data.
#[derive(Debug, Clone, PartialEq, Eq, Default,)]
pub struct XmlElement {
    pub tag:      String,
    pub text:     Option<String,>,
    pub children: Vec<XmlElement,>,
}

impl XmlElement {
    pub fn new(tag: impl Into<String,>,) -> Self {
        Self {
            tag:      tag.into(),
            text:     None,
            children: Vec::new(),
        }
    }

    pub fn text_or_empty(&self,) -> &str {
        self.text.as_deref().unwrap_or("",)
    }

    /// Every element strictly below `self` whose tag is `name`, in document
    /// order. `self` is never part of the result.
    pub fn descendants_named<'a,>(&'a self, name: &str,) -> Vec<&'a XmlElement,> {
        let mut found = Vec::new();
        for child in &self.children {
            child.collect_named(name, &mut found,);
        }
        found
    }

    fn collect_named<'a,>(&'a self, name: &str, found: &mut Vec<&'a XmlElement,>,) {
        if self.tag == name {
            found.push(self,);
        }
        for child in &self.children {
            child.collect_named(name, found,);
        }
    }
}

struct OpenElement {
    element:    XmlElement,
    seen_child: bool,
}

/// Assembles the owned tree from the flat event stream and enforces the
/// well-formedness rules `quick-xml` leaves to the caller.
struct TreeBuilder<'p,> {
    path:     &'p Path,
    stack:    Vec<OpenElement,>,
    root:     Option<XmlElement,>,
    entities: HashMap<String, String,>,
}

impl<'p,> TreeBuilder<'p,> {
    fn new(path: &'p Path,) -> Self {
        Self {
            path,
            stack: Vec::new(),
            root: None,
            entities: HashMap::new(),
        }
    }

    fn malformed(&self, message: impl Into<String,>,) -> ConvertError {
        ConvertError::malformed(self.path, message,)
    }

    fn open(&mut self, start: &BytesStart<'_,>,) -> Result<(), ConvertError,> {
        if self.stack.is_empty() && self.root.is_some() {
            return Err(self.malformed("junk after document element",),);
        }

        let tag = String::from_utf8_lossy(start.name().into_inner(),).to_string();
        if !is_xml_name(&tag,) {
            return Err(self.malformed(format!("invalid element name <{}>", tag),),);
        }

        for attr_result in start.attributes() {
            let attr = attr_result.map_err(|e| ConvertError::ParseError {
                path:   self.path.to_path_buf(),
                source: Box::new(e,),
            },)?;
            let key = String::from_utf8_lossy(attr.key.into_inner(),);
            if !is_xml_name(&key,) {
                return Err(self.malformed(format!("invalid attribute name {} in <{}>", key, tag),),);
            }
            if attr.value.contains(&b'<',) {
                return Err(self.malformed(format!("'<' in value of attribute {} in <{}>", key, tag),),);
            }
        }

        if let Some(parent,) = self.stack.last_mut() {
            parent.seen_child = true;
        }
        self.stack.push(OpenElement {
            element:    XmlElement::new(tag,),
            seen_child: false,
        },);
        Ok((),)
    }

    fn close(&mut self,) -> Result<(), ConvertError,> {
        let Some(open,) = self.stack.pop() else {
            return Err(self.malformed("unmatched end tag",),);
        };
        match self.stack.last_mut() {
            Some(parent,) => parent.element.children.push(open.element,),
            None => self.root = Some(open.element,),
        }
        Ok((),)
    }

    fn text(&mut self, text: &str,) -> Result<(), ConvertError,> {
        if text.is_empty() {
            return Ok((),);
        }
        match self.stack.last_mut() {
            Some(open,) if !open.seen_child => {
                open.element
                    .text
                    .get_or_insert_with(String::new,)
                    .push_str(text,);
            },
            // Text following a child element belongs to no field.
            Some(_,) => {},
            None => {
                if !text.chars().all(|c| matches!(c, ' ' | '\t' | '\r' | '\n'),) {
                    return Err(self.malformed("text outside the root element",),);
                }
            },
        }
        Ok((),)
    }

    fn doctype(&mut self, declaration: &str,) -> Result<(), ConvertError,> {
        if self.root.is_some() || !self.stack.is_empty() {
            return Err(self.malformed("doctype after the root element",),);
        }
        let mut rest = declaration;
        while let Some(pos,) = rest.find("<!ENTITY",) {
            let decl = rest[pos + "<!ENTITY".len()..].trim_start();
            rest = decl;
            // Parameter entities only matter inside the DTD itself.
            if decl.starts_with('%',) {
                continue;
            }
            let name_end = decl
                .find(|c: char| c.is_whitespace(),)
                .ok_or_else(|| self.malformed("incomplete entity declaration",),)?;
            let name = &decl[..name_end];
            if !is_xml_name(name,) {
                return Err(self.malformed(format!("invalid entity name {}", name),),);
            }
            let value_part = decl[name_end..].trim_start();
            // SYSTEM and PUBLIC entities point outside the document and stay
            // unresolved.
            let Some(quote,) = value_part.chars().next().filter(|c| *c == '"' || *c == '\'',)
            else {
                continue;
            };
            let body = &value_part[1..];
            let close = body
                .find(quote,)
                .ok_or_else(|| self.malformed(format!("unterminated value of entity {}", name),),)?;
            let value = self.expand_entity_value(&body[..close],)?;
            // The first declaration of an entity is binding.
            self.entities.entry(name.to_string(),).or_insert(value,);
            rest = &body[close + 1..];
        }
        Ok((),)
    }

    fn expand_entity_value(&self, raw: &str,) -> Result<String, ConvertError,> {
        let mut value = String::with_capacity(raw.len(),);
        let mut rest = raw;
        while let Some(amp,) = rest.find('&',) {
            value.push_str(&rest[..amp],);
            let after = &rest[amp + 1..];
            let semi = after
                .find(';',)
                .ok_or_else(|| self.malformed("unterminated reference in entity value",),)?;
            value.push_str(&self.resolve_name(&after[..semi],)?,);
            rest = &after[semi + 1..];
        }
        value.push_str(rest,);
        Ok(value,)
    }

    fn resolve_reference(&self, reference: &BytesRef<'_,>,) -> Result<String, ConvertError,> {
        let resolved = reference
            .resolve_char_ref()
            .map_err(|e| ConvertError::ParseError {
                path:   self.path.to_path_buf(),
                source: Box::new(e,),
            },)?;
        if let Some(ch,) = resolved {
            return Ok(ch.to_string(),);
        }
        self.resolve_name(&String::from_utf8_lossy(reference,),)
    }

    /// Resolves the text between `&` and `;`: a character reference, one of
    /// the five predefined entities, or an entity from the internal subset.
    fn resolve_name(&self, name: &str,) -> Result<String, ConvertError,> {
        if let Some(code,) = name.strip_prefix('#',) {
            let parsed = match code.strip_prefix('x',) {
                Some(hex,) => u32::from_str_radix(hex, 16,),
                None => code.parse::<u32>(),
            };
            return parsed
                .ok()
                .and_then(char::from_u32,)
                .map(|c| c.to_string(),)
                .ok_or_else(|| self.malformed(format!("invalid character reference &{};", name),),);
        }
        if let Some(predefined,) = quick_xml::escape::resolve_predefined_entity(name,) {
            return Ok(predefined.to_string(),);
        }
        self.entities
            .get(name,)
            .cloned()
            .ok_or_else(|| self.malformed(format!("undefined entity &{};", name),),)
    }

    fn finish(self,) -> Result<XmlElement, ConvertError,> {
        if let Some(open,) = self.stack.last() {
            return Err(self.malformed(format!("unclosed element <{}>", open.element.tag),),);
        }
        let path = self.path;
        self.root
            .ok_or_else(|| ConvertError::malformed(path, "no element found",),)
    }
}

fn is_name_start_char(c: char,) -> bool {
    matches!(c,
        ':' | 'A'..='Z' | '_' | 'a'..='z'
        | '\u{C0}'..='\u{D6}' | '\u{D8}'..='\u{F6}' | '\u{F8}'..='\u{2FF}'
        | '\u{370}'..='\u{37D}' | '\u{37F}'..='\u{1FFF}' | '\u{200C}'..='\u{200D}'
        | '\u{2070}'..='\u{218F}' | '\u{2C00}'..='\u{2FEF}' | '\u{3001}'..='\u{D7FF}'
        | '\u{F900}'..='\u{FDCF}' | '\u{FDF0}'..='\u{FFFD}' | '\u{10000}'..='\u{EFFFF}'
    )
}

fn is_name_char(c: char,) -> bool {
    is_name_start_char(c,)
        || matches!(c,
            '-' | '.' | '0'..='9' | '\u{B7}' | '\u{300}'..='\u{36F}' | '\u{203F}'..='\u{2040}'
        )
}

/// Checks `name` against the `Name` production of XML 1.0.
fn is_xml_name(name: &str,) -> bool {
    let mut chars = name.chars();
    match chars.next() {
        Some(first,) if is_name_start_char(first,) => chars.all(is_name_char,),
        _ => false,
    }
}

// XML processors hand applications `\n` for every `\r\n` and lone `\r`.
fn normalize_line_endings(content: &str,) -> Cow<'_, str,> {
    if content.contains('\r',) {
        Cow::Owned(content.replace("\r\n", "\n",).replace('\r', "\n",),)
    } else {
        Cow::Borrowed(content,)
    }
}

/// Parses a complete XML document held in memory. `path` is only used for
/// error context.
pub fn parse_xml_str(content: &str, path: &Path,) -> Result<XmlElement, ConvertError,> {
    let normalized = normalize_line_endings(content,);
    let mut reader = Reader::from_str(&normalized,);
    reader.config_mut().trim_text(false,);

    let mut builder = TreeBuilder::new(path,);
    let mut first_event = true;
    loop {
        let event = reader.read_event().map_err(|e| ConvertError::ParseError {
            path:   path.to_path_buf(),
            source: Box::new(e,),
        },)?;
        match event {
            Event::Decl(_,) if !first_event => {
                return Err(builder.malformed("XML declaration not at start of document",),);
            },
            Event::Start(e,) => builder.open(&e,)?,
            Event::Empty(e,) => {
                builder.open(&e,)?;
                builder.close()?;
            },
            Event::End(_,) => builder.close()?,
            Event::Text(e,) => {
                let text = String::from_utf8_lossy(&e,);
                if text.contains("]]>",) {
                    return Err(builder.malformed("']]>' in character data",),);
                }
                builder.text(&text,)?;
            },
            Event::CData(e,) => builder.text(&String::from_utf8_lossy(&e,),)?,
            Event::GeneralRef(e,) => {
                let resolved = builder.resolve_reference(&e,)?;
                builder.text(&resolved,)?;
            },
            Event::DocType(e,) => builder.doctype(&String::from_utf8_lossy(&e,),)?,
            Event::Eof => break,
            // Declarations, comments and processing instructions carry no
            // record data.
            _ => {},
        }
        first_event = false;
    }
    builder.finish()
}

/// Reads and parses a UTF-8 XML file into an owned element tree.
pub fn read_xml_document(file_path: &Path,) -> Result<XmlElement, ConvertError,> {
    let bytes = fs::read(file_path,).map_err(|e| ConvertError::FileReadError {
        path:   file_path.to_path_buf(),
        source: e,
    },)?;
    let content = std::str::from_utf8(&bytes,).map_err(|e| ConvertError::ParseError {
        path:   file_path.to_path_buf(),
        source: Box::new(e,),
    },)?;
    let content = content.strip_prefix('\u{feff}',).unwrap_or(content,);

    let root = parse_xml_str(content, file_path,)?;
    debug!(
        "Parsed {} with root <{}> ({} top-level children)",
        file_path.display(),
        root.tag,
        root.children.len()
    );
    Ok(root,)
}
