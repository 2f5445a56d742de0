//! Reading and writing numbers and booleans as attribute values and
//! element text.

use super::dom::Document;
use super::raw::{AttributeId, NodeId};
use super::{BoolFormat, DomError, QueryError};

/// A value with a textual XML form.
pub trait XmlValue: Sized {
    /// Converts from text, as read from an attribute or text node.
    fn from_xml(text: &str) -> Option<Self>;
    fn to_xml(&self, format: BoolFormat) -> String;
}

macro_rules! integer_value(
    ($($t:ty),*) => ($(
        impl XmlValue for $t {
            fn from_xml(text: &str) -> Option<$t> {
                let text = text.trim();
                match text.strip_prefix("0x").or_else(|| text.strip_prefix("0X")) {
                    Some(hex) => <$t>::from_str_radix(hex, 16).ok(),
                    None => text.parse().ok(),
                }
            }

            fn to_xml(&self, _: BoolFormat) -> String {
                self.to_string()
            }
        }
    )*)
);

integer_value!(i32, u32, i64, u64);

macro_rules! float_value(
    ($($t:ty),*) => ($(
        impl XmlValue for $t {
            fn from_xml(text: &str) -> Option<$t> {
                text.trim().parse().ok()
            }

            fn to_xml(&self, _: BoolFormat) -> String {
                self.to_string()
            }
        }
    )*)
);

float_value!(f32, f64);

impl XmlValue for bool {
    // Any integer counts, with zero false.
    fn from_xml(text: &str) -> Option<bool> {
        if let Some(i) = i64::from_xml(text) {
            return Some(i != 0);
        }

        let text = text.trim();
        if text.eq_ignore_ascii_case("true") {
            Some(true)
        } else if text.eq_ignore_ascii_case("false") {
            Some(false)
        } else {
            None
        }
    }

    fn to_xml(&self, format: BoolFormat) -> String {
        let text = match (format, *self) {
            (BoolFormat::TrueFalse, true) => "true",
            (BoolFormat::TrueFalse, false) => "false",
            (BoolFormat::OneZero, true) => "1",
            (BoolFormat::OneZero, false) => "0",
        };
        text.to_owned()
    }
}

impl Document {
    pub fn query_attribute<T>(&mut self, element: NodeId, name: &str) -> Result<T, QueryError>
        where T: XmlValue
    {
        let value = self.attribute(element, name).ok_or(QueryError::NoAttribute)?;
        T::from_xml(value).ok_or(QueryError::WrongType)
    }

    /// The converted attribute value, or `default` if it is missing or
    /// does not convert.
    pub fn attribute_or<T>(&mut self, element: NodeId, name: &str, default: T) -> T
        where T: XmlValue
    {
        self.query_attribute(element, name).unwrap_or(default)
    }

    pub fn set_typed_attribute<T>(&mut self, element: NodeId, name: &str, value: T) -> Result<AttributeId, DomError>
        where T: XmlValue
    {
        let text = value.to_xml(self.config.bool_format);
        self.set_attribute(element, name, &text)
    }

    /// Converts the text of the element's first child.
    pub fn query_text<T>(&mut self, element: NodeId) -> Result<T, QueryError>
        where T: XmlValue
    {
        let text = self.text(element).ok_or(QueryError::NoText)?;
        T::from_xml(text).ok_or(QueryError::WrongType)
    }

    pub fn set_typed_text<T>(&mut self, element: NodeId, value: T) -> Result<NodeId, DomError>
        where T: XmlValue
    {
        let text = value.to_xml(self.config.bool_format);
        self.set_text(element, &text)
    }
}
