//! Minimal XML-RPC codec.
//!
//! Covers the subset of XML-RPC the bridge speaks: scalar types, arrays,
//! structs, `<nil/>` (both peers run with `allow_none` semantics), method
//! calls, responses, and faults. Hand-written rather than pulled from an
//! XML crate: the grammar is tiny, fully known, and the bridge controls
//! both ends of the wire.

use std::collections::BTreeMap;

use serde_json::json;

use crate::error::{Error, Result};

/// An XML-RPC value.
#[derive(Debug, Clone, PartialEq)]
pub enum XmlValue {
    Nil,
    Bool(bool),
    Int(i32),
    Double(f64),
    Str(String),
    Array(Vec<XmlValue>),
    Struct(BTreeMap<String, XmlValue>),
}

impl XmlValue {
    /// Convert from a JSON value. Integers outside i32 become doubles
    /// (XML-RPC `<int>` is 32-bit).
    pub fn from_json(value: &serde_json::Value) -> Self {
        match value {
            serde_json::Value::Null => Self::Nil,
            serde_json::Value::Bool(b) => Self::Bool(*b),
            serde_json::Value::Number(n) => {
                if let Some(i) = n.as_i64() {
                    if let Ok(i) = i32::try_from(i) {
                        return Self::Int(i);
                    }
                }
                Self::Double(n.as_f64().unwrap_or(0.0))
            }
            serde_json::Value::String(s) => Self::Str(s.clone()),
            serde_json::Value::Array(items) => {
                Self::Array(items.iter().map(Self::from_json).collect())
            }
            serde_json::Value::Object(map) => Self::Struct(
                map.iter()
                    .map(|(k, v)| (k.clone(), Self::from_json(v)))
                    .collect(),
            ),
        }
    }

    /// Convert into a JSON value.
    pub fn to_json(&self) -> serde_json::Value {
        match self {
            Self::Nil => serde_json::Value::Null,
            Self::Bool(b) => json!(b),
            Self::Int(i) => json!(i),
            Self::Double(d) => json!(d),
            Self::Str(s) => json!(s),
            Self::Array(items) => {
                serde_json::Value::Array(items.iter().map(Self::to_json).collect())
            }
            Self::Struct(map) => serde_json::Value::Object(
                map.iter().map(|(k, v)| (k.clone(), v.to_json())).collect(),
            ),
        }
    }
}

/// A parsed `<methodCall>`.
#[derive(Debug, Clone, PartialEq)]
pub struct MethodCall {
    pub name: String,
    pub params: Vec<XmlValue>,
}

// ===== Emitting =====

fn escape(s: &str, out: &mut String) {
    for c in s.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            c => out.push(c),
        }
    }
}

fn write_value(value: &XmlValue, out: &mut String) {
    out.push_str("<value>");
    match value {
        XmlValue::Nil => out.push_str("<nil/>"),
        XmlValue::Bool(b) => {
            out.push_str("<boolean>");
            out.push(if *b { '1' } else { '0' });
            out.push_str("</boolean>");
        }
        XmlValue::Int(i) => {
            out.push_str("<int>");
            out.push_str(&i.to_string());
            out.push_str("</int>");
        }
        XmlValue::Double(d) => {
            out.push_str("<double>");
            out.push_str(&d.to_string());
            out.push_str("</double>");
        }
        XmlValue::Str(s) => {
            out.push_str("<string>");
            escape(s, out);
            out.push_str("</string>");
        }
        XmlValue::Array(items) => {
            out.push_str("<array><data>");
            for item in items {
                write_value(item, out);
            }
            out.push_str("</data></array>");
        }
        XmlValue::Struct(map) => {
            out.push_str("<struct>");
            for (name, v) in map {
                out.push_str("<member><name>");
                escape(name, out);
                out.push_str("</name>");
                write_value(v, out);
                out.push_str("</member>");
            }
            out.push_str("</struct>");
        }
    }
    out.push_str("</value>");
}

/// Serialize a method call request body.
pub fn write_method_call(name: &str, params: &[XmlValue]) -> String {
    let mut out = String::from("<?xml version=\"1.0\"?><methodCall><methodName>");
    escape(name, &mut out);
    out.push_str("</methodName><params>");
    for p in params {
        out.push_str("<param>");
        write_value(p, &mut out);
        out.push_str("</param>");
    }
    out.push_str("</params></methodCall>");
    out
}

/// Serialize a successful method response body.
pub fn write_method_response(value: &XmlValue) -> String {
    let mut out = String::from("<?xml version=\"1.0\"?><methodResponse><params><param>");
    write_value(value, &mut out);
    out.push_str("</param></params></methodResponse>");
    out
}

/// Serialize a fault response body.
pub fn write_fault(code: i32, message: &str) -> String {
    let mut fault = BTreeMap::new();
    fault.insert("faultCode".to_string(), XmlValue::Int(code));
    fault.insert("faultString".to_string(), XmlValue::Str(message.to_string()));

    let mut out = String::from("<?xml version=\"1.0\"?><methodResponse><fault>");
    write_value(&XmlValue::Struct(fault), &mut out);
    out.push_str("</fault></methodResponse>");
    out
}

// ===== Parsing =====

struct Parser<'a> {
    input: &'a str,
    pos: usize,
}

impl<'a> Parser<'a> {
    fn new(input: &'a str) -> Self {
        Self { input, pos: 0 }
    }

    fn rest(&self) -> &'a str {
        &self.input[self.pos..]
    }

    fn skip_ws(&mut self) {
        while self.rest().starts_with(|c: char| c.is_ascii_whitespace()) {
            self.pos += 1;
        }
    }

    fn skip_prolog(&mut self) {
        self.skip_ws();
        if self.rest().starts_with("<?xml") {
            if let Some(end) = self.rest().find("?>") {
                self.pos += end + 2;
            }
        }
        self.skip_ws();
    }

    /// Consume `<tag>` if it is next; also consumes `<tag/>` and reports it.
    fn try_open(&mut self, tag: &str) -> Option<bool> {
        self.skip_ws();
        let rest = self.rest();
        let open = format!("<{tag}>");
        if rest.starts_with(&open) {
            self.pos += open.len();
            return Some(false);
        }
        let self_closing = format!("<{tag}/>");
        if rest.starts_with(&self_closing) {
            self.pos += self_closing.len();
            return Some(true);
        }
        None
    }

    fn expect_open(&mut self, tag: &str) -> Result<()> {
        match self.try_open(tag) {
            Some(false) => Ok(()),
            Some(true) => Err(Error::Protocol(format!("unexpected empty <{tag}/>"))),
            None => Err(Error::Protocol(format!(
                "expected <{tag}> near offset {}",
                self.pos
            ))),
        }
    }

    fn expect_close(&mut self, tag: &str) -> Result<()> {
        self.skip_ws();
        let close = format!("</{tag}>");
        if self.rest().starts_with(&close) {
            self.pos += close.len();
            Ok(())
        } else {
            Err(Error::Protocol(format!(
                "expected </{tag}> near offset {}",
                self.pos
            )))
        }
    }

    /// Read character data up to the next `<`, resolving entities.
    fn read_text(&mut self) -> Result<String> {
        let rest = self.rest();
        let end = rest.find('<').unwrap_or(rest.len());
        let raw = &rest[..end];
        self.pos += end;
        unescape(raw)
    }

    fn parse_value(&mut self) -> Result<XmlValue> {
        match self.try_open("value") {
            Some(false) => {}
            Some(true) => return Ok(XmlValue::Str(String::new())),
            None => {
                return Err(Error::Protocol(format!(
                    "expected <value> near offset {}",
                    self.pos
                )))
            }
        }

        let value = self.parse_typed_value()?;
        self.expect_close("value")?;
        Ok(value)
    }

    fn parse_typed_value(&mut self) -> Result<XmlValue> {
        self.skip_ws_before_tag();

        if let Some(empty) = self.try_open("nil") {
            if !empty {
                self.expect_close("nil")?;
            }
            return Ok(XmlValue::Nil);
        }

        for tag in ["int", "i4"] {
            if let Some(empty) = self.try_open(tag) {
                if empty {
                    return Err(Error::Protocol(format!("empty <{tag}/>")));
                }
                let text = self.read_text()?;
                self.expect_close(tag)?;
                let n: i32 = text
                    .trim()
                    .parse()
                    .map_err(|_| Error::Protocol(format!("bad int: {text:?}")))?;
                return Ok(XmlValue::Int(n));
            }
        }

        if let Some(empty) = self.try_open("boolean") {
            if empty {
                return Err(Error::Protocol("empty <boolean/>".to_string()));
            }
            let text = self.read_text()?;
            self.expect_close("boolean")?;
            return match text.trim() {
                "1" => Ok(XmlValue::Bool(true)),
                "0" => Ok(XmlValue::Bool(false)),
                other => Err(Error::Protocol(format!("bad boolean: {other:?}"))),
            };
        }

        if let Some(empty) = self.try_open("double") {
            if empty {
                return Err(Error::Protocol("empty <double/>".to_string()));
            }
            let text = self.read_text()?;
            self.expect_close("double")?;
            let d: f64 = text
                .trim()
                .parse()
                .map_err(|_| Error::Protocol(format!("bad double: {text:?}")))?;
            return Ok(XmlValue::Double(d));
        }

        if let Some(empty) = self.try_open("string") {
            if empty {
                return Ok(XmlValue::Str(String::new()));
            }
            let text = self.read_text()?;
            self.expect_close("string")?;
            return Ok(XmlValue::Str(text));
        }

        if let Some(empty) = self.try_open("array") {
            if empty {
                return Ok(XmlValue::Array(Vec::new()));
            }
            self.expect_open("data")?;
            let mut items = Vec::new();
            loop {
                self.skip_ws();
                if self.rest().starts_with("</data>") {
                    break;
                }
                items.push(self.parse_value()?);
            }
            self.expect_close("data")?;
            self.expect_close("array")?;
            return Ok(XmlValue::Array(items));
        }

        if let Some(empty) = self.try_open("struct") {
            if empty {
                return Ok(XmlValue::Struct(BTreeMap::new()));
            }
            let mut map = BTreeMap::new();
            loop {
                self.skip_ws();
                if self.rest().starts_with("</struct>") {
                    break;
                }
                self.expect_open("member")?;
                self.expect_open("name")?;
                let name = self.read_text()?;
                self.expect_close("name")?;
                let value = self.parse_value()?;
                self.expect_close("member")?;
                map.insert(name, value);
            }
            self.expect_close("struct")?;
            return Ok(XmlValue::Struct(map));
        }

        // Untagged content inside <value> is a string per the XML-RPC spec.
        let text = self.read_text()?;
        Ok(XmlValue::Str(text))
    }

    /// Skip whitespace only when a tag follows; preserves leading spaces of
    /// untagged string content.
    fn skip_ws_before_tag(&mut self) {
        let saved = self.pos;
        self.skip_ws();
        if !self.rest().starts_with('<') {
            self.pos = saved;
        }
    }
}

fn unescape(raw: &str) -> Result<String> {
    if !raw.contains('&') {
        return Ok(raw.to_string());
    }
    let mut out = String::with_capacity(raw.len());
    let mut rest = raw;
    while let Some(idx) = rest.find('&') {
        out.push_str(&rest[..idx]);
        rest = &rest[idx..];
        let semi = rest
            .find(';')
            .ok_or_else(|| Error::Protocol("unterminated entity".to_string()))?;
        match &rest[..=semi] {
            "&amp;" => out.push('&'),
            "&lt;" => out.push('<'),
            "&gt;" => out.push('>'),
            "&quot;" => out.push('"'),
            "&apos;" => out.push('\''),
            other => return Err(Error::Protocol(format!("unknown entity: {other}"))),
        }
        rest = &rest[semi + 1..];
    }
    out.push_str(rest);
    Ok(out)
}

/// Parse a `<methodCall>` request body.
pub fn parse_method_call(body: &str) -> Result<MethodCall> {
    let mut p = Parser::new(body);
    p.skip_prolog();
    p.expect_open("methodCall")?;
    p.expect_open("methodName")?;
    let name = p.read_text()?;
    p.expect_close("methodName")?;

    let mut params = Vec::new();
    if let Some(empty) = p.try_open("params") {
        if !empty {
            loop {
                p.skip_ws();
                if p.rest().starts_with("</params>") {
                    break;
                }
                p.expect_open("param")?;
                params.push(p.parse_value()?);
                p.expect_close("param")?;
            }
            p.expect_close("params")?;
        }
    }
    p.expect_close("methodCall")?;

    Ok(MethodCall { name, params })
}

/// Parse a `<methodResponse>` body into `Ok(value)` or `Err` carrying the
/// fault string (prefixed with the fault code).
pub fn parse_method_response(body: &str) -> Result<XmlValue> {
    let mut p = Parser::new(body);
    p.skip_prolog();
    p.expect_open("methodResponse")?;

    if p.try_open("fault") == Some(false) {
        let value = p.parse_value()?;
        p.expect_close("fault")?;
        p.expect_close("methodResponse")?;
        let (code, message) = match &value {
            XmlValue::Struct(map) => {
                let code = match map.get("faultCode") {
                    Some(XmlValue::Int(i)) => *i,
                    _ => 0,
                };
                let message = match map.get("faultString") {
                    Some(XmlValue::Str(s)) => s.clone(),
                    _ => "unknown fault".to_string(),
                };
                (code, message)
            }
            _ => (0, "malformed fault".to_string()),
        };
        return Err(Error::Protocol(format!("fault {code}: {message}")));
    }

    p.expect_open("params")?;
    p.expect_open("param")?;
    let value = p.parse_value()?;
    p.expect_close("param")?;
    p.expect_close("params")?;
    p.expect_close("methodResponse")?;
    Ok(value)
}
