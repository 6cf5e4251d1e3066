//! Declarative template/field schema.
//!
//! A template is an ordered list of field keys; every key resolves to a
//! [`FieldConfig`] in the field registry. The tables are static and are
//! checked once, when a [`Catalog`] is built, so lookups never have to deal
//! with dangling keys at render time.

use std::collections::{BTreeMap, HashMap, HashSet};

use serde::Serialize;
use thiserror::Error;

/// Field every template must carry: generated documents are always emailed.
pub const RECIPIENT_FIELD: &str = "recipient_email";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum FieldKind {
    Text,
    Email,
    Url,
    Number,
    Select,
}

#[derive(Debug, Clone, Copy, Serialize)]
pub struct FieldConfig {
    pub key: &'static str,
    pub label: &'static str,
    pub placeholder: &'static str,
    pub kind: FieldKind,
    pub required: bool,
    pub max_length: Option<usize>,
    #[serde(skip_serializing_if = "no_options")]
    pub options: &'static [&'static str],
}

#[derive(Debug, Clone, Copy, Serialize)]
pub struct Template {
    pub id: &'static str,
    pub name: &'static str,
    pub fields: &'static [&'static str],
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SchemaError {
    #[error("field '{0}' is registered twice")]
    DuplicateField(&'static str),
    #[error("select field '{0}' has no options")]
    EmptyOptions(&'static str),
    #[error("template '{0}' is defined twice")]
    DuplicateTemplate(&'static str),
    #[error("template '{template}' references unknown field '{key}'")]
    UnknownField {
        template: &'static str,
        key: &'static str,
    },
    #[error("template '{template}' lists field '{key}' more than once")]
    RepeatedField {
        template: &'static str,
        key: &'static str,
    },
    #[error("template '{0}' has no recipient_email field")]
    MissingRecipient(&'static str),
    #[error("unknown template '{0}'")]
    UnknownTemplate(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum Violation {
    #[error("is required")]
    Missing,
    #[error("must be at most {0} characters")]
    TooLong(usize),
    #[error("must be a valid email address")]
    InvalidEmail,
    #[error("must be an http(s) URL")]
    InvalidUrl,
    #[error("must be a number")]
    NotANumber,
    #[error("is not one of the allowed options")]
    NotAnOption,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("{label} {violation}")]
pub struct FieldViolation {
    pub key: &'static str,
    pub label: &'static str,
    pub violation: Violation,
}

impl FieldConfig {
    /// Check one value against this field's rules. Blank optional fields pass.
    pub fn check(&self, value: Option<&str>) -> Result<(), Violation> {
        let value = value.map(str::trim).unwrap_or("");
        if value.is_empty() {
            return if self.required {
                Err(Violation::Missing)
            } else {
                Ok(())
            };
        }

        if let Some(max) = self.max_length {
            if value.chars().count() > max {
                return Err(Violation::TooLong(max));
            }
        }

        match self.kind {
            FieldKind::Text => Ok(()),
            FieldKind::Email if is_email(value) => Ok(()),
            FieldKind::Email => Err(Violation::InvalidEmail),
            FieldKind::Url if value.starts_with("https://") || value.starts_with("http://") => {
                Ok(())
            }
            FieldKind::Url => Err(Violation::InvalidUrl),
            FieldKind::Number if value.parse::<f64>().is_ok_and(f64::is_finite) => Ok(()),
            FieldKind::Number => Err(Violation::NotANumber),
            FieldKind::Select if self.options.iter().any(|o| *o == value) => Ok(()),
            FieldKind::Select => Err(Violation::NotAnOption),
        }
    }
}

fn no_options(options: &&'static [&'static str]) -> bool {
    options.is_empty()
}

/// Loose shape check: one `@`, something on both sides, a dot in the domain.
pub fn is_email(value: &str) -> bool {
    if value.chars().any(char::is_whitespace) {
        return false;
    }
    match value.split_once('@') {
        Some((local, domain)) => {
            !local.is_empty()
                && !domain.contains('@')
                && domain.contains('.')
                && !domain.starts_with('.')
                && !domain.ends_with('.')
        }
        None => false,
    }
}

/// Validated view over a field registry and a template table.
#[derive(Debug, Clone)]
pub struct Catalog {
    fields: HashMap<&'static str, &'static FieldConfig>,
    templates: Vec<&'static Template>,
}

impl Catalog {
    pub fn new(
        fields: &'static [FieldConfig],
        templates: &'static [Template],
    ) -> Result<Self, SchemaError> {
        let mut by_key = HashMap::with_capacity(fields.len());
        for field in fields {
            if field.kind == FieldKind::Select && field.options.is_empty() {
                return Err(SchemaError::EmptyOptions(field.key));
            }
            if by_key.insert(field.key, field).is_some() {
                return Err(SchemaError::DuplicateField(field.key));
            }
        }

        let mut ids = HashSet::with_capacity(templates.len());
        for template in templates {
            if !ids.insert(template.id) {
                return Err(SchemaError::DuplicateTemplate(template.id));
            }
            let mut seen = HashSet::with_capacity(template.fields.len());
            for &key in template.fields {
                if !by_key.contains_key(key) {
                    return Err(SchemaError::UnknownField {
                        template: template.id,
                        key,
                    });
                }
                if !seen.insert(key) {
                    return Err(SchemaError::RepeatedField {
                        template: template.id,
                        key,
                    });
                }
            }
            if !seen.contains(RECIPIENT_FIELD) {
                return Err(SchemaError::MissingRecipient(template.id));
            }
        }

        Ok(Self {
            fields: by_key,
            templates: templates.iter().collect(),
        })
    }

    /// The built-in catalog.
    pub fn builtin() -> Result<Self, SchemaError> {
        Self::new(FIELD_REGISTRY, TEMPLATES)
    }

    pub fn templates(&self) -> impl Iterator<Item = &'static Template> + '_ {
        self.templates.iter().copied()
    }

    pub fn template(&self, id: &str) -> Option<&'static Template> {
        self.templates.iter().copied().find(|t| t.id == id)
    }

    pub fn field(&self, key: &str) -> Option<&'static FieldConfig> {
        self.fields.get(key).copied()
    }

    /// Fields a template renders, in template order.
    pub fn fields_for(&self, template_id: &str) -> Result<Vec<&'static FieldConfig>, SchemaError> {
        let template = self
            .template(template_id)
            .ok_or_else(|| SchemaError::UnknownTemplate(template_id.to_string()))?;
        Ok(template
            .fields
            .iter()
            .filter_map(|key| self.field(key))
            .collect())
    }

    /// Check every field of `template_id` against `values`.
    pub fn validate(
        &self,
        template_id: &str,
        values: &BTreeMap<String, String>,
    ) -> Result<Vec<FieldViolation>, SchemaError> {
        let violations = self
            .fields_for(template_id)?
            .into_iter()
            .filter_map(|field| {
                field
                    .check(values.get(field.key).map(String::as_str))
                    .err()
                    .map(|violation| FieldViolation {
                        key: field.key,
                        label: field.label,
                        violation,
                    })
            })
            .collect();
        Ok(violations)
    }
}

const fn text(
    key: &'static str,
    label: &'static str,
    placeholder: &'static str,
    max_length: usize,
) -> FieldConfig {
    FieldConfig {
        key,
        label,
        placeholder,
        kind: FieldKind::Text,
        required: false,
        max_length: Some(max_length),
        options: &[],
    }
}

const fn of_kind(mut field: FieldConfig, kind: FieldKind) -> FieldConfig {
    field.kind = kind;
    field
}

const fn required(mut field: FieldConfig) -> FieldConfig {
    field.required = true;
    field
}

pub static FIELD_REGISTRY: &[FieldConfig] = &[
    required(of_kind(
        text("recipient_email", "Recipient email", "client@example.com", 254),
        FieldKind::Email,
    )),
    required(text("full_name", "Full name", "Jan Kowalski", 120)),
    text("first_name", "First name", "Jan", 60),
    text("address1", "Address line 1", "Street 1", 120),
    text("address2", "Address line 2", "Apartment 2", 120),
    text("address3", "City, postal code", "00-001 Warsaw", 120),
    text("delivery_date", "Delivery date", "January 15, 2026", 40),
    required(text("order_number", "Order number", "NK-2026-12345", 40)),
    text("item_name", "Product", "Nike Air Max", 120),
    text("size", "Size", "US 10", 20),
    text("color", "Colour", "Black", 40),
    of_kind(text("price", "Price", "180.00", 16), FieldKind::Number),
    of_kind(text("total", "Total", "190.46", 16), FieldKind::Number),
    of_kind(text("quantity", "Quantity", "1", 6), FieldKind::Number),
    FieldConfig {
        key: "currency",
        label: "Currency",
        placeholder: "$",
        kind: FieldKind::Select,
        required: false,
        max_length: None,
        options: &["$", "€", "£", "zł"],
    },
    text("card_last4", "Card (last 4 digits)", "4242", 4),
    of_kind(
        text("product_image", "Product image URL", "https://example.com/shoe.png", 2048),
        FieldKind::Url,
    ),
    text("shipping", "Shipping", "Free Shipping", 60),
    text("tracking_number", "Tracking number", "JD014600006281234567", 60),
    text("phone", "Phone", "+48 600 000 000", 30),
    text("notes", "Notes", "Leave at the door", 500),
    text("subject", "Email subject", "Your order has shipped", 200),
];

pub static TEMPLATES: &[Template] = &[
    Template {
        id: "nike",
        name: "Nike",
        fields: &[
            "recipient_email",
            "full_name",
            "address1",
            "address2",
            "address3",
            "order_number",
            "delivery_date",
            "item_name",
            "size",
            "price",
            "total",
            "currency",
            "product_image",
            "quantity",
        ],
    },
    Template {
        id: "apple",
        name: "Apple",
        fields: &[
            "recipient_email",
            "full_name",
            "first_name",
            "address1",
            "address2",
            "address3",
            "order_number",
            "item_name",
            "color",
            "price",
            "total",
            "card_last4",
            "currency",
            "subject",
        ],
    },
    Template {
        id: "stockx",
        name: "StockX",
        fields: &[
            "recipient_email",
            "full_name",
            "address1",
            "address2",
            "address3",
            "order_number",
            "item_name",
            "size",
            "price",
            "total",
            "shipping",
            "product_image",
            "currency",
        ],
    },
    Template {
        id: "zalando",
        name: "Zalando",
        fields: &[
            "recipient_email",
            "first_name",
            "full_name",
            "address1",
            "address2",
            "address3",
            "order_number",
            "item_name",
            "size",
            "color",
            "quantity",
            "price",
            "total",
            "product_image",
            "currency",
        ],
    },
    Template {
        id: "dhl",
        name: "DHL",
        fields: &[
            "recipient_email",
            "full_name",
            "address1",
            "address2",
            "address3",
            "tracking_number",
            "delivery_date",
            "phone",
            "notes",
        ],
    },
];
