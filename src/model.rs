//! XML resources exchanged with the API.
//!
//! One canonical type per entity, shared by every executor. Attributes map to
//! `@name` fields and element text to `$text`, following quick-xml's serde
//! conventions. Unknown elements are ignored when decoding.

use crate::error::{ApiError, Result};
use quick_xml::DeError;
use quick_xml::events::{BytesStart, Event};
use quick_xml::reader::Reader;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Decode a response body, keeping the body text for diagnostics on failure.
pub(crate) fn decode<T: DeserializeOwned>(what: &'static str, body: &[u8]) -> Result<T> {
    quick_xml::de::from_reader(body).map_err(|source| ApiError::Decode {
        what,
        body: String::from_utf8_lossy(body).into_owned(),
        source,
    })
}

/// Decode a full holding record.
///
/// The serde decoder trims element text, so the MARC record is read again
/// with a plain event reader and subfield values keep their whitespace.
pub(crate) fn decode_holding(body: &[u8]) -> Result<Holding> {
    let mut holding: Holding = decode("holding", body)?;
    holding.record = MarcRecord::from_xml(body).map_err(|source| ApiError::Decode {
        what: "holding record",
        body: String::from_utf8_lossy(body).into_owned(),
        source,
    })?;
    Ok(holding)
}

/// Encode a record for a write call.
pub(crate) fn encode<T: Serialize>(what: &'static str, value: &T) -> Result<String> {
    quick_xml::se::to_string(value).map_err(|source| ApiError::Encode { what, source })
}

/// Element text with a human-readable `desc` attribute, e.g. `<campus desc="Main">MAIN</campus>`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValueDesc {
    #[serde(rename = "@desc", default)]
    pub desc: String,
    #[serde(rename = "$text", default)]
    pub value: String,
}

impl fmt::Display for ValueDesc {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.value, self.desc)
    }
}

// ============================================================================
// Sets
// ============================================================================

/// How a set's membership is defined.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SetKind {
    /// Defined by a saved query
    Logical,
    /// Members enumerated one by one
    Itemized,
    Other,
}

/// What kind of record a set's members point to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SetContent {
    Item,
    BibMms,
    Other,
}

/// `<number_of_members link="...">250</number_of_members>`
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
pub struct MemberCount {
    #[serde(rename = "$text", default)]
    pub value: usize,
}

/// A named, server-managed collection of record references.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct Set {
    #[serde(rename = "@link", default)]
    pub link: String,
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub number_of_members: MemberCount,
    #[serde(rename = "type", default)]
    pub set_type: ValueDesc,
    #[serde(default)]
    pub content: ValueDesc,
}

impl Set {
    /// Member count the server declares for the set.
    pub fn declared_count(&self) -> usize {
        self.number_of_members.value
    }

    pub fn kind(&self) -> SetKind {
        match self.set_type.value.trim() {
            "LOGICAL" => SetKind::Logical,
            "ITEMIZED" => SetKind::Itemized,
            _ => SetKind::Other,
        }
    }

    pub fn content(&self) -> SetContent {
        match self.content.value.trim() {
            "ITEM" => SetContent::Item,
            "BIB_MMS" => SetContent::BibMms,
            _ => SetContent::Other,
        }
    }
}

/// Result of a set search.
#[derive(Debug, Default, Deserialize)]
pub struct Sets {
    #[serde(rename = "@total_record_count", default)]
    pub total_record_count: usize,
    #[serde(rename = "set", default)]
    pub sets: Vec<Set>,
}

/// One element of a set.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Deserialize)]
pub struct Member {
    #[serde(rename = "@link", default)]
    pub link: String,
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub description: String,
}

/// One page of set members.
#[derive(Debug, Default, Deserialize)]
pub struct Members {
    #[serde(rename = "@total_record_count", default)]
    pub total_record_count: usize,
    #[serde(rename = "member", default)]
    pub members: Vec<Member>,
}

// ============================================================================
// Items and requests
// ============================================================================

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct BibData {
    #[serde(default)]
    pub mms_id: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub author: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct HoldingData {
    #[serde(default)]
    pub holding_id: String,
    #[serde(default)]
    pub call_number: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct ItemData {
    #[serde(default)]
    pub pid: String,
    #[serde(default)]
    pub barcode: String,
}

/// A physical item, as returned by the scan-in operation.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct Item {
    #[serde(rename = "@link", default)]
    pub link: String,
    #[serde(default)]
    pub bib_data: BibData,
    #[serde(default)]
    pub holding_data: HoldingData,
    #[serde(default)]
    pub item_data: ItemData,
}

impl Item {
    pub fn mms_id(&self) -> &str {
        &self.bib_data.mms_id
    }

    pub fn title(&self) -> &str {
        &self.bib_data.title
    }

    pub fn author(&self) -> &str {
        &self.bib_data.author
    }

    pub fn call_number(&self) -> &str {
        &self.holding_data.call_number
    }

    pub fn barcode(&self) -> &str {
        &self.item_data.barcode
    }
}

/// An open request on an item.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct UserRequest {
    #[serde(rename = "request_id", default)]
    pub id: String,
    #[serde(rename = "request_type", default)]
    pub request_type: String,
    #[serde(rename = "request_sub_type", default)]
    pub sub_type: ValueDesc,
    /// Item member the request was read from. Not part of the XML.
    #[serde(skip)]
    pub member: Member,
}

impl UserRequest {
    pub fn sub_type(&self) -> &str {
        &self.sub_type.value
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct UserRequests {
    #[serde(rename = "@total_record_count", default)]
    pub total_record_count: usize,
    #[serde(rename = "user_request", default)]
    pub requests: Vec<UserRequest>,
}

// ============================================================================
// Holdings
// ============================================================================

/// Holding summary as listed under a bib record.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct HoldingListMember {
    #[serde(rename = "@link", default)]
    pub link: String,
    #[serde(default)]
    pub holding_id: String,
    #[serde(default)]
    pub library: ValueDesc,
    #[serde(default)]
    pub location: ValueDesc,
    #[serde(default)]
    pub call_number: String,
    #[serde(default)]
    pub suppress_from_publishing: String,
}

#[derive(Debug, Default, Deserialize)]
pub struct Holdings {
    #[serde(rename = "@total_record_count", default)]
    pub total_record_count: usize,
    #[serde(rename = "holding", default)]
    pub holdings: Vec<HoldingListMember>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ControlField {
    #[serde(rename = "@tag")]
    pub tag: String,
    #[serde(rename = "$text", default)]
    pub value: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Subfield {
    #[serde(rename = "@code")]
    pub code: String,
    #[serde(rename = "$text", default)]
    pub value: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DataField {
    #[serde(rename = "@tag")]
    pub tag: String,
    #[serde(rename = "@ind1", default)]
    pub ind1: String,
    #[serde(rename = "@ind2", default)]
    pub ind2: String,
    #[serde(rename = "subfield", default)]
    pub subfields: Vec<Subfield>,
}

/// MARCXML record embedded in a holding.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MarcRecord {
    #[serde(default)]
    pub leader: String,
    #[serde(rename = "controlfield", default)]
    pub control_fields: Vec<ControlField>,
    #[serde(rename = "datafield", default)]
    pub data_fields: Vec<DataField>,
}

impl MarcRecord {
    /// Read the first `<record>` element of a document, text untouched.
    pub fn from_xml(xml: &[u8]) -> std::result::Result<Self, DeError> {
        let mut reader = Reader::from_reader(xml);
        reader.expand_empty_elements(true);

        let mut record = MarcRecord::default();
        let mut in_record = false;
        let mut text: Option<String> = None;
        let mut buf = Vec::new();
        loop {
            match reader.read_event_into(&mut buf)? {
                Event::Start(e) => match e.local_name().as_ref() {
                    b"record" => in_record = true,
                    b"leader" if in_record => text = Some(String::new()),
                    b"controlfield" if in_record => {
                        record.control_fields.push(ControlField {
                            tag: attribute(&e, "tag")?,
                            value: String::new(),
                        });
                        text = Some(String::new());
                    }
                    b"datafield" if in_record => record.data_fields.push(DataField {
                        tag: attribute(&e, "tag")?,
                        ind1: attribute(&e, "ind1")?,
                        ind2: attribute(&e, "ind2")?,
                        subfields: Vec::new(),
                    }),
                    b"subfield" if in_record => {
                        let code = attribute(&e, "code")?;
                        if let Some(field) = record.data_fields.last_mut() {
                            field.subfields.push(Subfield {
                                code,
                                value: String::new(),
                            });
                            text = Some(String::new());
                        }
                    }
                    _ => {}
                },
                Event::Text(t) => {
                    if let Some(text) = text.as_mut() {
                        text.push_str(&t.unescape()?);
                    }
                }
                Event::CData(c) => {
                    if let Some(text) = text.as_mut() {
                        text.push_str(&String::from_utf8_lossy(&c));
                    }
                }
                Event::End(e) => match e.local_name().as_ref() {
                    b"record" if in_record => break,
                    b"leader" => {
                        if let Some(value) = text.take() {
                            record.leader = value;
                        }
                    }
                    b"controlfield" => {
                        if let (Some(value), Some(field)) =
                            (text.take(), record.control_fields.last_mut())
                        {
                            field.value = value;
                        }
                    }
                    b"subfield" => {
                        if let (Some(value), Some(subfield)) = (
                            text.take(),
                            record
                                .data_fields
                                .last_mut()
                                .and_then(|f| f.subfields.last_mut()),
                        ) {
                            subfield.value = value;
                        }
                    }
                    _ => {}
                },
                Event::Eof => break,
                _ => {}
            }
            buf.clear();
        }
        Ok(record)
    }
}

fn attribute(element: &BytesStart, name: &str) -> std::result::Result<String, DeError> {
    match element.try_get_attribute(name)? {
        Some(attr) => Ok(attr.unescape_value()?.into_owned()),
        None => Ok(String::new()),
    }
}

/// A full holding record. Written back whole on update.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename = "holding")]
pub struct Holding {
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub holding_id: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub created_by: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub created_date: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub originating_system: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub originating_system_id: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub suppress_from_publishing: String,
    #[serde(default)]
    pub record: MarcRecord,
    /// Summary this record was fetched through. Not part of the XML.
    #[serde(skip)]
    pub origin: HoldingListMember,
}

impl Holding {
    /// Link the record was read from and is written back to.
    pub fn link(&self) -> &str {
        &self.origin.link
    }

    /// Call number from the 852 field: `$h`, then a space and `$i` when present.
    pub fn call_number(&self) -> String {
        let mut call_number = String::new();
        for field in self.record.data_fields.iter().filter(|f| f.tag == "852") {
            if let Some(h) = field.subfields.iter().rev().find(|s| s.code == "h") {
                call_number = h.value.clone();
            }
            for i in field.subfields.iter().filter(|s| s.code == "i") {
                call_number.push(' ');
                call_number.push_str(&i.value);
            }
        }
        call_number
    }
}

// ============================================================================
// Configuration
// ============================================================================

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct CodeTableScope {
    #[serde(default)]
    pub institution_id: ValueDesc,
    #[serde(default)]
    pub library_id: ValueDesc,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct CodeTableRow {
    #[serde(default)]
    pub code: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub default: String,
    #[serde(default)]
    pub enabled: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct CodeTableRows {
    #[serde(rename = "row", default)]
    pub rows: Vec<CodeTableRow>,
}

/// Codes and their descriptions for one configuration domain.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct CodeTable {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub sub_system: ValueDesc,
    #[serde(default)]
    pub patron_facing: String,
    #[serde(default)]
    pub language: ValueDesc,
    #[serde(default)]
    pub scope: CodeTableScope,
    #[serde(default)]
    pub rows: CodeTableRows,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct Library {
    #[serde(rename = "@link", default)]
    pub link: String,
    #[serde(default)]
    pub code: String,
    #[serde(default)]
    pub path: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub resource_sharing: String,
    #[serde(default)]
    pub campus: ValueDesc,
    #[serde(default)]
    pub proxy: String,
    #[serde(default)]
    pub default_location: ValueDesc,
}

#[derive(Debug, Default, Deserialize)]
pub struct Libraries {
    #[serde(rename = "library", default)]
    pub libraries: Vec<Library>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct ServedLibraries {
    #[serde(rename = "library", default)]
    pub libraries: Vec<ValueDesc>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct Operator {
    #[serde(rename = "@link", default)]
    pub link: String,
    #[serde(default)]
    pub primary_id: String,
    #[serde(default)]
    pub full_name: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct Operators {
    #[serde(rename = "operator", default)]
    pub operators: Vec<Operator>,
}

/// A location where a service is performed.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct Department {
    #[serde(default)]
    pub code: String,
    #[serde(default)]
    pub name: String,
    #[serde(rename = "type", default)]
    pub department_type: ValueDesc,
    #[serde(default)]
    pub work_days: String,
    #[serde(default)]
    pub printer: ValueDesc,
    #[serde(default)]
    pub owner: ValueDesc,
    #[serde(default)]
    pub served_libraries: ServedLibraries,
    #[serde(default)]
    pub operators: Operators,
    #[serde(default)]
    pub description: String,
}

#[derive(Debug, Default, Deserialize)]
pub struct Departments {
    #[serde(rename = "@total_record_count", default)]
    pub total_record_count: usize,
    #[serde(rename = "department", default)]
    pub departments: Vec<Department>,
}
