//! Wildcard expansion: one template, many pages.
//!
//! A template whose key has a matching `"<key>*"` object in the data document
//! renders once per sub-key instead of once:
//!
//! ```text
//! data.json                           site/shop/product.template.html
//! {
//!   "common": {...},                  dist/shop/product.laptop.html
//!   "product*": {                     dist/shop/product.phone.html
//!     "laptop": {"price": 999},
//!     "phone":  {"price": 599}
//!   }
//! }
//! ```
//!
//! Each unit reads its page data from `document["<key>*"][sub_key]` instead of
//! `document[key]`. Sub-keys become part of a file name, so they are checked
//! before any unit is planned.

use crate::data::DataDocument;
use crate::discover::TemplateDescriptor;
use serde_json::{Map, Value};
use std::path::PathBuf;

/// How a template is rendered.
#[derive(Debug, Clone, Copy)]
pub enum RenderMode<'a> {
    /// Once, from `document[key]`.
    Regular,
    /// Once per sub-key of `document["<key>*"]`.
    Wildcard { bucket: &'a Map<String, Value> },
}

/// Data key holding the wildcard bucket for `key_name`.
pub fn wildcard_key(key_name: &str) -> String {
    format!("{key_name}*")
}

/// Decide between regular and wildcard mode for a template key.
pub fn detect<'a>(key_name: &str, document: &'a DataDocument) -> RenderMode<'a> {
    match document.object(&wildcard_key(key_name)) {
        Some(bucket) => RenderMode::Wildcard { bucket },
        None => RenderMode::Regular,
    }
}

/// Page-scope data for one unit, or `None` if it is missing or not an object.
pub fn page_data<'a>(
    document: &'a DataDocument,
    key_name: &str,
    sub_key: Option<&str>,
) -> Option<&'a Map<String, Value>> {
    match sub_key {
        Some(sub) => document
            .object(&wildcard_key(key_name))?
            .get(sub)
            .and_then(Value::as_object),
        None => document.object(key_name),
    }
}

/// Reasons a sub-key cannot name an output file.
pub fn check_sub_key(sub_key: &str) -> Result<(), &'static str> {
    if sub_key.is_empty() {
        return Err("sub-key is empty");
    }
    if sub_key == "." || sub_key == ".." {
        return Err("sub-key is a relative path component");
    }
    if sub_key.contains(['/', '\\']) {
        return Err("sub-key contains a path separator");
    }
    if sub_key.contains('\0') {
        return Err("sub-key contains a NUL byte");
    }
    Ok(())
}

/// One planned render: a template, an optional sub-key, and where it goes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderUnit<'a> {
    pub template: &'a TemplateDescriptor,
    pub sub_key: Option<String>,
    /// Output path relative to the dist directory.
    pub output_path: PathBuf,
}

impl RenderUnit<'_> {
    /// Human label: `product` or `product[laptop]`.
    pub fn label(&self) -> String {
        match &self.sub_key {
            Some(sub) => format!("{}[{}]", self.template.key_name, sub),
            None => self.template.key_name.clone(),
        }
    }
}

/// A sub-key rejected during planning.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RejectedSubKey {
    pub sub_key: String,
    pub reason: &'static str,
}

/// Expand a template into render units.
///
/// Regular mode yields one unit. Wildcard mode yields one unit per valid
/// sub-key, in document order; invalid sub-keys are returned separately.
pub fn expand<'a>(
    template: &'a TemplateDescriptor,
    document: &DataDocument,
) -> (Vec<RenderUnit<'a>>, Vec<RejectedSubKey>) {
    match detect(&template.key_name, document) {
        RenderMode::Regular => (
            vec![RenderUnit {
                template,
                sub_key: None,
                output_path: template.output_path(),
            }],
            Vec::new(),
        ),
        RenderMode::Wildcard { bucket } => {
            let mut units = Vec::with_capacity(bucket.len());
            let mut rejected = Vec::new();
            for sub_key in bucket.keys() {
                match check_sub_key(sub_key) {
                    Ok(()) => units.push(RenderUnit {
                        template,
                        sub_key: Some(sub_key.clone()),
                        output_path: template.wildcard_output_path(sub_key),
                    }),
                    Err(reason) => rejected.push(RejectedSubKey {
                        sub_key: sub_key.clone(),
                        reason,
                    }),
                }
            }
            (units, rejected)
        }
    }
}
