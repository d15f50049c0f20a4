//! Reading and writing the XML form of the intermediate tree.
use quick_xml::{
    Reader, Writer,
    escape::unescape,
    events::{BytesDecl, BytesEnd, BytesStart, BytesText, Event},
};

use crate::{IrError, NodeId, Tree};

fn xml_error(e: impl std::fmt::Display) -> IrError {
    IrError::Xml(e.to_string())
}

/// Parses a document into a fresh arena, returning the root element.
///
/// Text of leaf elements becomes the node value (trimmed); text mixed with child elements is
/// dropped.
pub fn parse(text: &str) -> Result<(Tree, NodeId), IrError> {
    let mut reader = Reader::from_str(text);
    let mut tree = Tree::new();
    let mut stack: Vec<(NodeId, String)> = Vec::new();
    let mut root = None;

    loop {
        match reader.read_event() {
            Ok(Event::Start(e)) => {
                let id = open_element(&mut tree, &e)?;
                attach(&mut tree, &stack, &mut root, id)?;
                stack.push((id, String::new()));
            }
            Ok(Event::Empty(e)) => {
                let id = open_element(&mut tree, &e)?;
                attach(&mut tree, &stack, &mut root, id)?;
            }
            Ok(Event::End(_)) => {
                let (id, text) = stack
                    .pop()
                    .ok_or_else(|| IrError::Xml("Unbalanced end tag".to_string()))?;
                let value = text.trim();
                if tree.children(id).is_empty() && !value.is_empty() {
                    tree.set_value(id, value);
                }
            }
            Ok(Event::Text(t)) => {
                if let Some((_, buffer)) = stack.last_mut() {
                    let raw = std::str::from_utf8(&t).map_err(xml_error)?;
                    buffer.push_str(&unescape(raw).map_err(xml_error)?);
                }
            }
            Ok(Event::CData(c)) => {
                if let Some((_, buffer)) = stack.last_mut() {
                    buffer.push_str(std::str::from_utf8(&c).map_err(xml_error)?);
                }
            }
            Ok(Event::GeneralRef(r)) => {
                if let Some((_, buffer)) = stack.last_mut() {
                    let name = std::str::from_utf8(&r).map_err(xml_error)?;
                    buffer.push_str(&unescape(&format!("&{name};")).map_err(xml_error)?);
                }
            }
            Ok(Event::Eof) => break,
            Ok(_) => {}
            Err(e) => {
                return Err(IrError::Xml(format!(
                    "{} at position {}",
                    e,
                    reader.buffer_position()
                )));
            }
        }
    }

    if !stack.is_empty() {
        return Err(IrError::Xml("Unexpected end of document".to_string()));
    }

    root.map(|root| (tree, root)).ok_or(IrError::EmptyDocument)
}

fn open_element(tree: &mut Tree, start: &BytesStart<'_>) -> Result<NodeId, IrError> {
    let name = start.name();
    let tag = std::str::from_utf8(name.as_ref()).map_err(xml_error)?;
    let id = tree.new_element(tag);

    for attr in start.attributes() {
        let attr = attr.map_err(xml_error)?;
        let key = std::str::from_utf8(attr.key.as_ref()).map_err(xml_error)?;
        let raw = std::str::from_utf8(attr.value.as_ref()).map_err(xml_error)?;
        tree.set_attr(id, key, &unescape(raw).map_err(xml_error)?);
    }

    Ok(id)
}

fn attach(
    tree: &mut Tree,
    stack: &[(NodeId, String)],
    root: &mut Option<NodeId>,
    id: NodeId,
) -> Result<(), IrError> {
    match (stack.last(), *root) {
        (Some((parent, _)), _) => {
            tree.append(*parent, id);
            Ok(())
        }
        (None, None) => {
            *root = Some(id);
            Ok(())
        }
        (None, Some(_)) => Err(IrError::Xml("Document has more than one root element".to_string())),
    }
}

/// Writes the subtree rooted at `root` as an indented document.
pub fn write(tree: &Tree, root: NodeId) -> Result<String, IrError> {
    let mut writer = Writer::new_with_indent(Vec::new(), b' ', 2);
    writer
        .write_event(Event::Decl(BytesDecl::new("1.0", Some("utf-8"), None)))
        .map_err(xml_error)?;
    write_node(&mut writer, tree, root)?;

    String::from_utf8(writer.into_inner()).map_err(xml_error)
}

fn write_node(writer: &mut Writer<Vec<u8>>, tree: &Tree, id: NodeId) -> Result<(), IrError> {
    let Some(node) = tree.get(id) else {
        return Ok(());
    };

    let mut start = BytesStart::new(node.tag());
    for (key, value) in node.attributes() {
        start.push_attribute((key, value));
    }

    if node.children().is_empty() {
        match node.value().filter(|value| !value.is_empty()) {
            Some(value) => {
                writer.write_event(Event::Start(start)).map_err(xml_error)?;
                writer
                    .write_event(Event::Text(BytesText::new(value)))
                    .map_err(xml_error)?;
                writer
                    .write_event(Event::End(BytesEnd::new(node.tag())))
                    .map_err(xml_error)?;
            }
            None => {
                writer.write_event(Event::Empty(start)).map_err(xml_error)?;
            }
        }
        return Ok(());
    }

    writer.write_event(Event::Start(start)).map_err(xml_error)?;
    for child in node.children() {
        write_node(writer, tree, *child)?;
    }
    writer
        .write_event(Event::End(BytesEnd::new(node.tag())))
        .map_err(xml_error)
}
