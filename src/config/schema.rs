//! Manual schema validation (§4.1): required properties present and
//! non-null, declared types checked. All violations for one document are
//! aggregated into a single `SchemaViolation` error rather than failing
//! fast on the first one.

use serde_json::Value;

#[derive(Clone, Copy)]
pub enum FieldKind {
    String,
    Array,
    Object,
}

impl FieldKind {
    fn matches(self, value: &Value) -> bool {
        match self {
            FieldKind::String => value.is_string(),
            FieldKind::Array => value.is_array(),
            FieldKind::Object => value.is_object(),
        }
    }

    fn name(self) -> &'static str {
        match self {
            FieldKind::String => "string",
            FieldKind::Array => "array",
            FieldKind::Object => "object",
        }
    }
}

pub struct Schema {
    pub required: &'static [(&'static str, FieldKind)],
}

pub const DEVICE_PROFILE_SCHEMA: Schema = Schema {
    required: &[
        ("deviceId", FieldKind::String),
        ("supportedOS", FieldKind::Array),
        ("driverFamilyIds", FieldKind::Array),
    ],
};

pub const BUILD_CONFIG_SCHEMA: Schema = Schema {
    required: &[
        ("name", FieldKind::String),
        ("mountPoint", FieldKind::String),
        ("exportPath", FieldKind::String),
        ("tempPath", FieldKind::String),
        ("driverRoot", FieldKind::String),
        ("updateRoot", FieldKind::String),
        ("yunonaPath", FieldKind::String),
        ("osWimMap", FieldKind::Object),
    ],
};

/// Validates `value` against `schema`, returning every violation found (not
/// just the first).
pub fn validate(value: &Value, schema: &Schema) -> Vec<String> {
    let mut violations = Vec::new();
    let Some(obj) = value.as_object() else {
        return vec!["document root is not an object".to_string()];
    };

    for (field, kind) in schema.required {
        match obj.get(*field) {
            None => violations.push(format!("missing required property `{field}`")),
            Some(Value::Null) => violations.push(format!("required property `{field}` is null")),
            Some(v) if !kind.matches(v) => {
                violations.push(format!("property `{field}` must be a {}", kind.name()));
            }
            Some(_) => {}
        }
    }

    violations
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn flags_missing_null_and_wrong_type_in_one_pass() {
        let doc = json!({
            "deviceId": null,
            "driverFamilyIds": "not-an-array",
        });
        let violations = validate(&doc, &DEVICE_PROFILE_SCHEMA);
        assert_eq!(violations.len(), 3, "{violations:?}");
        assert!(violations.iter().any(|v| v.contains("deviceId")));
        assert!(violations.iter().any(|v| v.contains("supportedOS")));
        assert!(violations.iter().any(|v| v.contains("driverFamilyIds")));
    }

    #[test]
    fn passes_on_well_formed_document() {
        let doc = json!({
            "deviceId": "RW-528A",
            "supportedOS": [10, 11],
            "driverFamilyIds": ["net"],
        });
        assert!(validate(&doc, &DEVICE_PROFILE_SCHEMA).is_empty());
    }
}
