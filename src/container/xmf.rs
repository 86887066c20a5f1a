//! the XDMF descriptor (`.xmf`) PLUTO writes next to each hdf5 output
//!
//! Only two things are read from it: the `<Time Value=...>` of the output and, for
//! each `<Attribute Name=...>`, the dataset path found in its `DataItem` text
//! (`data.0001.dbl.h5:/Timestep_1/vars/rho`).

use crate::prelude::*;
use crate::parse::{MalformedAttribute, MalformedXml};
use indexmap::IndexMap;
use quick_xml::events::{BytesStart, Event};
use quick_xml::reader::Reader;
use std::io::BufRead;
use std::path::Path;

#[derive(Debug, Clone, Default, PartialEq)]
pub struct XmfDescriptor {
    pub time: Option<f64>,
    /// field name to dataset path inside the container
    pub fields: IndexMap<String, String>,
}

impl XmfDescriptor {
    pub fn read(path: &Path) -> Result<Self, Error> {
        let file = std::fs::File::open(path)?;
        Self::parse(Reader::from_reader(std::io::BufReader::new(file)))
    }

    pub fn parse_str(text: &str) -> Result<Self, Error> {
        Self::parse(Reader::from_reader(text.as_bytes()))
    }

    fn parse<R: BufRead>(mut reader: Reader<R>) -> Result<Self, Error> {
        reader.trim_text(true);

        let mut buffer = Vec::new();
        let mut descriptor = XmfDescriptor::default();
        let mut attribute: Option<String> = None;
        let mut in_data_item = false;

        loop {
            let event = reader
                .read_event_into(&mut buffer)
                .map_err(|e| ParseError::from(MalformedXml::from(e)))?;

            match event {
                Event::Start(start) | Event::Empty(start) if start.name().as_ref() == b"Time" => {
                    if let Some(value) = attribute_value(&start, b"Value")? {
                        descriptor.time = value.trim().parse().ok();
                    }
                }
                Event::Start(start) if start.name().as_ref() == b"Attribute" => {
                    attribute = attribute_value(&start, b"Name")?;
                }
                Event::Start(start) if start.name().as_ref() == b"DataItem" => {
                    in_data_item = true;
                }
                Event::End(end) if end.name().as_ref() == b"DataItem" => {
                    in_data_item = false;
                }
                Event::End(end) if end.name().as_ref() == b"Attribute" => {
                    attribute = None;
                }
                Event::Text(text) if in_data_item => {
                    if let Some(name) = &attribute {
                        let text = text.unescape().map_err(|e| ParseError::from(MalformedXml::from(e)))?;
                        // `<file>:<dataset path>`
                        let path = match text.rfind(':') {
                            Some(idx) => &text[idx + 1..],
                            None => &text[..],
                        };
                        descriptor.fields.insert(name.clone(), path.trim().to_string());
                    }
                }
                Event::Eof => break,
                _ => (),
            }

            buffer.clear();
        }

        log::debug!("xmf descriptor lists {} fields", descriptor.fields.len());

        Ok(descriptor)
    }
}

fn attribute_value(start: &BytesStart<'_>, key: &[u8]) -> Result<Option<String>, Error> {
    for attribute in start.attributes() {
        let attribute = attribute.map_err(|e| ParseError::from(MalformedAttribute::from(e)))?;
        if attribute.key.as_ref() == key {
            return Ok(Some(String::from_utf8_lossy(&attribute.value).into_owned()));
        }
    }
    Ok(None)
}
