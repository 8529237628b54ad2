//! Logical `(object, field)` to native field resolution.

use crate::dialect::Dialect;
use once_cell::sync::Lazy;
use serde::Deserialize;
use std::collections::HashMap;

/// Resolves a logical object field to the dialect's native field names, in order.
pub trait FieldMapper {
    fn map_field(&self, object: &str, field: &str) -> Option<Vec<String>>;
}

#[derive(Debug, Clone, Default, Deserialize)]
struct ObjectMapping {
    #[serde(default)]
    fields: HashMap<String, Vec<String>>,
}

/// Mapping table in the `{"<object>": {"fields": {"<field>": ["native", ...]}}}` layout.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(transparent)]
pub struct JsonFieldMapper {
    objects: HashMap<String, ObjectMapping>,
}

static DNS_EVENT: Lazy<JsonFieldMapper> =
    Lazy::new(|| load_bundled(include_str!("../mappings/dns_event.json")));
static TIDE: Lazy<JsonFieldMapper> =
    Lazy::new(|| load_bundled(include_str!("../mappings/tide.json")));
static DOSSIER: Lazy<JsonFieldMapper> =
    Lazy::new(|| load_bundled(include_str!("../mappings/dossier.json")));

fn load_bundled(raw: &str) -> JsonFieldMapper {
    JsonFieldMapper::from_json(raw).expect("bundled mapping tables are valid JSON")
}

impl JsonFieldMapper {
    pub fn from_json(raw: &str) -> serde_json::Result<Self> {
        serde_json::from_str(raw)
    }

    /// The mapping table shipped with the crate for `dialect`.
    pub fn bundled(dialect: Dialect) -> &'static JsonFieldMapper {
        match dialect {
            Dialect::DnsEvent => Lazy::force(&DNS_EVENT),
            Dialect::TideDb => Lazy::force(&TIDE),
            Dialect::Dossier => Lazy::force(&DOSSIER),
        }
    }
}

impl FieldMapper for JsonFieldMapper {
    fn map_field(&self, object: &str, field: &str) -> Option<Vec<String>> {
        self.objects
            .get(object)
            .and_then(|mapping| mapping.fields.get(field))
            .filter(|natives| !natives.is_empty())
            .cloned()
    }
}
