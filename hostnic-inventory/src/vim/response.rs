//! Parsing of vim25 SOAP responses and faults.

use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;

use crate::error::{InventoryError, Result};
use crate::types::{ConnectionContext, ManagedObjectRef, PropertyValue};

/// Minimal element tree of a SOAP response.
///
/// Element names are stored without their namespace prefix. Attribute keys
/// keep theirs, so `type` (a managed object reference) and `xsi:type` stay
/// distinct.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct XmlElement {
    pub name: String,
    pub attrs: Vec<(String, String)>,
    pub text: String,
    pub children: Vec<XmlElement>,
}

fn protocol_error(e: impl std::fmt::Display) -> InventoryError {
    InventoryError::Protocol(format!("Malformed response: {}", e))
}

impl XmlElement {
    /// Parse a document into its root element.
    pub fn parse(xml: &str) -> Result<Self> {
        let mut reader = Reader::from_str(xml);
        reader.trim_text(true);

        let mut stack: Vec<XmlElement> = Vec::new();
        let mut root = None;

        loop {
            match reader.read_event().map_err(protocol_error)? {
                Event::Start(start) => stack.push(Self::from_start(&start)?),
                Event::Empty(start) => {
                    let element = Self::from_start(&start)?;
                    Self::attach(&mut stack, &mut root, element);
                }
                Event::End(_) => {
                    let element = stack
                        .pop()
                        .ok_or_else(|| protocol_error("unbalanced end tag"))?;
                    Self::attach(&mut stack, &mut root, element);
                }
                Event::Text(t) => {
                    if let Some(top) = stack.last_mut() {
                        top.text.push_str(&t.unescape().map_err(protocol_error)?);
                    }
                }
                Event::CData(data) => {
                    if let Some(top) = stack.last_mut() {
                        top.text.push_str(&String::from_utf8_lossy(&data.into_inner()));
                    }
                }
                Event::Eof => break,
                _ => {}
            }
        }

        if !stack.is_empty() {
            return Err(protocol_error("unexpected end of document"));
        }
        root.ok_or_else(|| protocol_error("empty document"))
    }

    fn from_start(start: &BytesStart<'_>) -> Result<Self> {
        let name = String::from_utf8_lossy(start.local_name().as_ref()).into_owned();
        let mut attrs = Vec::new();
        for attr in start.attributes() {
            let attr = attr.map_err(protocol_error)?;
            let key = String::from_utf8_lossy(attr.key.as_ref()).into_owned();
            let value = attr.unescape_value().map_err(protocol_error)?.into_owned();
            attrs.push((key, value));
        }
        Ok(Self {
            name,
            attrs,
            ..Default::default()
        })
    }

    fn attach(stack: &mut [XmlElement], root: &mut Option<XmlElement>, element: XmlElement) {
        match stack.last_mut() {
            Some(parent) => parent.children.push(element),
            None => *root = Some(element),
        }
    }

    pub fn child(&self, name: &str) -> Option<&XmlElement> {
        self.children.iter().find(|c| c.name == name)
    }

    pub fn children_named<'a>(&'a self, name: &'a str) -> impl Iterator<Item = &'a XmlElement> {
        self.children.iter().filter(move |c| c.name == name)
    }

    pub fn child_text(&self, name: &str) -> Option<&str> {
        self.child(name).map(|c| c.text.as_str())
    }

    pub fn attr(&self, key: &str) -> Option<&str> {
        self.attrs
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    /// The `xsi:type` attribute, whatever prefix the schema instance namespace uses.
    pub fn xsi_type(&self) -> Option<&str> {
        self.attrs
            .iter()
            .find(|(k, _)| k.ends_with(":type"))
            .map(|(_, v)| v.as_str())
    }

    fn required(&self, name: &str) -> Result<&XmlElement> {
        self.child(name)
            .ok_or_else(|| protocol_error(format!("<{}> has no <{}>", self.name, name)))
    }
}

// =============================================================================
// Envelope and faults
// =============================================================================

/// Extract the operation response element from an envelope, turning a SOAP
/// fault into the matching error.
pub fn into_response(envelope: XmlElement) -> Result<XmlElement> {
    if envelope.name != "Envelope" {
        return Err(protocol_error(format!("expected <Envelope>, got <{}>", envelope.name)));
    }
    let body = envelope
        .children
        .into_iter()
        .find(|c| c.name == "Body")
        .ok_or_else(|| protocol_error("missing <Body>"))?;
    let response = body
        .children
        .into_iter()
        .next()
        .ok_or_else(|| protocol_error("empty <Body>"))?;

    if response.name == "Fault" {
        return Err(fault_to_error(&response));
    }
    Ok(response)
}

/// Map a `<Fault>` element to an error, keyed on the fault detail element.
pub fn fault_to_error(fault: &XmlElement) -> InventoryError {
    let fault_string = fault.child_text("faultstring").unwrap_or_default().to_string();
    let detail = fault.child("detail").and_then(|d| d.children.first());

    let Some(detail) = detail else {
        return InventoryError::Runtime(fault_string);
    };

    let message = match detail.xsi_type() {
        Some(concrete) if !fault_string.is_empty() => format!("{}: {}", concrete, fault_string),
        Some(concrete) => concrete.to_string(),
        None => fault_string,
    };

    match detail.name.as_str() {
        "HostConfigFaultFault" => InventoryError::HostConfig(message),
        "AlreadyExistsFault" => InventoryError::AlreadyExists(message),
        "InvalidStateFault" => InventoryError::InvalidState(message),
        "InvalidPropertyFault" => InventoryError::InvalidProperty(message),
        "InvalidLoginFault" => InventoryError::AuthenticationFailed(message),
        _ => InventoryError::Runtime(message),
    }
}

// =============================================================================
// Typed responses
// =============================================================================

/// Parse a managed object reference element.
pub fn moref(element: &XmlElement) -> Result<ManagedObjectRef> {
    let kind = element.attr("type").ok_or_else(|| {
        protocol_error(format!("<{}> is not a managed object reference", element.name))
    })?;
    Ok(ManagedObjectRef::new(kind, element.text.clone()))
}

/// Parse a property `<val>` element.
pub fn property_value(val: &XmlElement) -> PropertyValue {
    if let Some(kind) = val.attr("type") {
        return PropertyValue::MoRef(ManagedObjectRef::new(kind, val.text.clone()));
    }
    match val.xsi_type() {
        None | Some("xsd:string") | Some("string") => PropertyValue::String(val.text.clone()),
        Some(_) => PropertyValue::Other(val.text.clone()),
    }
}

/// Build the connection context from a `RetrieveServiceContentResponse`.
pub fn service_content(response: &XmlElement) -> Result<ConnectionContext> {
    let content = response.required("returnval")?;
    let about = content.required("about")?;

    Ok(ConnectionContext {
        root_folder: moref(content.required("rootFolder")?)?,
        property_collector: moref(content.required("propertyCollector")?)?,
        view_manager: moref(content.required("viewManager")?)?,
        session_manager: moref(content.required("sessionManager")?)?,
        product_name: about.child_text("fullName").unwrap_or_default().to_string(),
        api_version: about.child_text("apiVersion").unwrap_or_default().to_string(),
    })
}

/// The `returnval` of a response that returns a single managed object reference.
pub fn returned_moref(response: &XmlElement) -> Result<ManagedObjectRef> {
    moref(response.required("returnval")?)
}

/// The `returnval` text of a response that returns a string.
pub fn returned_text(response: &XmlElement) -> Result<String> {
    Ok(response.required("returnval")?.text.clone())
}

/// Properties of one object in a retrieve result.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ObjectContent {
    pub obj: ManagedObjectRef,
    pub props: Vec<(String, PropertyValue)>,
}

/// One page of a `RetrievePropertiesEx`/`ContinueRetrievePropertiesEx` result.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RetrieveResult {
    pub token: Option<String>,
    pub objects: Vec<ObjectContent>,
}

/// Parse a retrieve result. A response without `returnval` is an empty result.
pub fn retrieve_result(response: &XmlElement) -> Result<RetrieveResult> {
    let Some(returnval) = response.child("returnval") else {
        return Ok(RetrieveResult::default());
    };

    let mut objects = Vec::new();
    for content in returnval.children_named("objects") {
        let obj = moref(content.required("obj")?)?;
        let mut props = Vec::new();
        for prop in content.children_named("propSet") {
            let name = prop.required("name")?.text.clone();
            props.push((name, property_value(prop.required("val")?)));
        }
        objects.push(ObjectContent { obj, props });
    }

    Ok(RetrieveResult {
        token: returnval.child_text("token").map(str::to_string),
        objects,
    })
}
