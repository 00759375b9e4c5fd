//! Structured-output schema for extraction calls

use indexmap::IndexMap;
use serde_json::{json, Map, Value};
use sheetdoc_core::FieldType;

/// Function name the model is forced to call
pub const EXTRACT_FUNCTION: &str = "extract";

/// Schema naming exactly the fields an extraction must return
///
/// Sent as a single function the model is required to call; its parameters
/// are an object whose properties are the declared fields, all required.
#[derive(Debug, Clone, PartialEq)]
pub struct ExtractionSchema {
    fields: IndexMap<String, FieldType>,
}

impl ExtractionSchema {
    /// Build from a declared field map
    #[must_use]
    pub fn new(fields: &IndexMap<String, FieldType>) -> Self {
        Self {
            fields: fields.clone(),
        }
    }

    /// Function name
    #[inline]
    #[must_use]
    pub fn name(&self) -> &'static str {
        EXTRACT_FUNCTION
    }

    /// Declared field names, in order
    pub fn field_names(&self) -> impl Iterator<Item = &str> {
        self.fields.keys().map(String::as_str)
    }

    /// JSON Schema of the function parameters
    #[must_use]
    pub fn parameters(&self) -> Value {
        let properties: Map<String, Value> = self
            .fields
            .iter()
            .map(|(name, ty)| (name.clone(), json_type(ty)))
            .collect();
        json!({
            "type": "object",
            "properties": properties,
            "required": self.fields.keys().collect::<Vec<_>>(),
        })
    }

    /// Function tool definition in chat-completions form
    #[must_use]
    pub fn tool(&self) -> Value {
        json!({
            "type": "function",
            "function": {
                "name": EXTRACT_FUNCTION,
                "description": "Extract the requested fields from the sheet",
                "parameters": self.parameters(),
            }
        })
    }

    /// `tool_choice` forcing the extract function
    #[must_use]
    pub fn tool_choice(&self) -> Value {
        json!({"type": "function", "function": {"name": EXTRACT_FUNCTION}})
    }
}

/// Primitive JSON type for a declared field; unsupported types go as string
fn json_type(ty: &FieldType) -> Value {
    match ty {
        FieldType::Number => json!({"type": "number"}),
        FieldType::StringList => json!({"type": "array", "items": {"type": "string"}}),
        FieldType::String | FieldType::Unsupported(_) => json!({"type": "string"}),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn schema() -> ExtractionSchema {
        let mut fields = IndexMap::new();
        fields.insert("Rate".to_string(), FieldType::Number);
        fields.insert("Tags".to_string(), FieldType::StringList);
        fields.insert("When".to_string(), FieldType::from("date"));
        ExtractionSchema::new(&fields)
    }

    #[test]
    fn parameters_require_every_field() {
        let params = schema().parameters();
        assert_eq!(params["required"], json!(["Rate", "Tags", "When"]));
        assert_eq!(params["properties"]["Rate"]["type"], "number");
        assert_eq!(params["properties"]["Tags"]["items"]["type"], "string");
        assert_eq!(params["properties"]["When"]["type"], "string");
    }

    #[test]
    fn tool_forces_extract() {
        let s = schema();
        assert_eq!(s.tool()["function"]["name"], EXTRACT_FUNCTION);
        assert_eq!(s.tool_choice()["function"]["name"], EXTRACT_FUNCTION);
    }
}
