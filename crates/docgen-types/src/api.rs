use std::collections::BTreeMap;
use std::fmt;

use serde::de::{self, Deserializer, Visitor};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::models::{DocumentRecord, Role, User};
use crate::schema::FieldConfig;

// -- JWT Claims --

/// JWT claims issued at login and checked by the bearer middleware.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub sub: Uuid,
    pub email: String,
    pub role: Role,
    pub exp: usize,
}

// -- Errors --

/// Body of every non-2xx response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorBody {
    pub detail: String,
}

/// Shown for self-registration, which is closed.
pub const REGISTRATION_UNAVAILABLE: &str =
    "Registration is not available yet. Contact the administrator.";

// -- Auth --

#[derive(Debug, Serialize, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct LoginResponse {
    pub access_token: String,
    pub token_type: String,
    pub user: User,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct RegisterRequest {
    pub email: String,
    pub password: String,
    pub username: Option<String>,
}

// -- Templates --

#[derive(Debug, Serialize, Deserialize)]
pub struct TemplatesResponse {
    pub templates: Vec<String>,
    pub count: usize,
}

#[derive(Debug, Serialize)]
pub struct TemplateFieldsResponse {
    pub template: &'static str,
    pub name: &'static str,
    pub fields: Vec<FieldConfig>,
}

// -- Documents --

/// `{template, ...fields}`: field values travel as top-level members next to
/// the template identifier. Numbers and booleans are accepted and kept as
/// their text; `null` reads as an empty value.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(from = "GenerateWire")]
pub struct GenerateRequest {
    pub template: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub additional_data: Option<BTreeMap<String, String>>,
    #[serde(flatten)]
    pub fields: BTreeMap<String, String>,
}

#[derive(Deserialize)]
struct GenerateWire {
    template: String,
    #[serde(default)]
    additional_data: Option<BTreeMap<String, Scalar>>,
    #[serde(flatten)]
    fields: BTreeMap<String, Scalar>,
}

impl From<GenerateWire> for GenerateRequest {
    fn from(wire: GenerateWire) -> Self {
        let text = |map: BTreeMap<String, Scalar>| -> BTreeMap<String, String> {
            map.into_iter().map(|(k, v)| (k, v.0)).collect()
        };
        Self {
            template: wire.template,
            additional_data: wire.additional_data.map(text),
            fields: text(wire.fields),
        }
    }
}

/// A JSON scalar read as text.
struct Scalar(String);

impl<'de> Deserialize<'de> for Scalar {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct ScalarVisitor;

        impl Visitor<'_> for ScalarVisitor {
            type Value = Scalar;

            fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
                f.write_str("a string, number or boolean")
            }

            fn visit_str<E: de::Error>(self, v: &str) -> Result<Scalar, E> {
                Ok(Scalar(v.to_string()))
            }

            fn visit_string<E: de::Error>(self, v: String) -> Result<Scalar, E> {
                Ok(Scalar(v))
            }

            fn visit_bool<E: de::Error>(self, v: bool) -> Result<Scalar, E> {
                Ok(Scalar(v.to_string()))
            }

            fn visit_i64<E: de::Error>(self, v: i64) -> Result<Scalar, E> {
                Ok(Scalar(v.to_string()))
            }

            fn visit_u64<E: de::Error>(self, v: u64) -> Result<Scalar, E> {
                Ok(Scalar(v.to_string()))
            }

            fn visit_f64<E: de::Error>(self, v: f64) -> Result<Scalar, E> {
                Ok(Scalar(v.to_string()))
            }

            fn visit_unit<E: de::Error>(self) -> Result<Scalar, E> {
                Ok(Scalar(String::new()))
            }

            fn visit_none<E: de::Error>(self) -> Result<Scalar, E> {
                Ok(Scalar(String::new()))
            }
        }

        deserializer.deserialize_any(ScalarVisitor)
    }
}

impl GenerateRequest {
    pub fn new(template: impl Into<String>) -> Self {
        Self {
            template: template.into(),
            ..Self::default()
        }
    }

    /// Value of a field, with empty strings treated as absent.
    pub fn field(&self, key: &str) -> Option<&str> {
        self.fields
            .get(key)
            .map(|v| v.trim())
            .filter(|v| !v.is_empty())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenerateResponse {
    pub success: bool,
    pub document_id: Uuid,
    pub message: String,
    pub email_sent: bool,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct DocumentsResponse {
    pub documents: Vec<DocumentRecord>,
    pub count: usize,
}

// -- Admin --

#[derive(Debug, Serialize, Deserialize)]
pub struct UsersResponse {
    pub users: Vec<User>,
    pub count: usize,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct CreateUserRequest {
    pub email: String,
    pub password: String,
    #[serde(default)]
    pub username: Option<String>,
    #[serde(default)]
    pub role: Role,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct CreateUserResponse {
    pub success: bool,
    pub user: User,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ToggleUserRequest {
    pub is_active: bool,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ActionResponse {
    pub success: bool,
    pub message: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn generate_request_flattens_fields() {
        let json = r#"{"template":"nike","recipient_email":"a@b.co","order_number":"NK-1"}"#;
        let req: GenerateRequest = serde_json::from_str(json).unwrap();
        assert_eq!(req.template, "nike");
        assert_eq!(req.field("recipient_email"), Some("a@b.co"));
        assert_eq!(req.fields.len(), 2);
        assert!(req.additional_data.is_none());

        let back = serde_json::to_value(&req).unwrap();
        assert_eq!(back["order_number"], "NK-1");
        assert!(back.get("additional_data").is_none());
    }

    #[test]
    fn scalar_values_are_kept_as_text() {
        let json = r#"{"template":"nike","quantity":2,"price":19.5,"gift":true,"notes":null,
            "additional_data":{"SIZE_LABEL":44,"BANNER":"Sale"}}"#;
        let req: GenerateRequest = serde_json::from_str(json).unwrap();
        assert_eq!(req.field("quantity"), Some("2"));
        assert_eq!(req.field("price"), Some("19.5"));
        assert_eq!(req.field("gift"), Some("true"));
        assert_eq!(req.field("notes"), None);

        let extra = req.additional_data.unwrap();
        assert_eq!(extra["SIZE_LABEL"], "44");
        assert_eq!(extra["BANNER"], "Sale");
    }

    #[test]
    fn nested_values_are_rejected() {
        let json = r#"{"template":"nike","items":[1,2]}"#;
        assert!(serde_json::from_str::<GenerateRequest>(json).is_err());
    }

    #[test]
    fn blank_field_reads_as_absent() {
        let mut req = GenerateRequest::new("dhl");
        req.fields.insert("phone".into(), "   ".into());
        assert_eq!(req.field("phone"), None);
        assert_eq!(req.field("notes"), None);
    }

    #[test]
    fn create_user_defaults_to_user_role() {
        let req: CreateUserRequest =
            serde_json::from_str(r#"{"email":"x@y.io","password":"secret1"}"#).unwrap();
        assert_eq!(req.role, Role::User);
        assert!(req.username.is_none());
    }
}
