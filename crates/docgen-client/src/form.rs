use std::collections::BTreeMap;

use tracing::info;

use docgen_types::api::{GenerateRequest, GenerateResponse};
use docgen_types::schema::{Catalog, FieldConfig, FieldViolation, Template};

use crate::client::DocgenClient;
use crate::error::ClientError;
use crate::session::Session;

/// Fields that describe one order and are cleared after a successful send.
/// Everything else (recipient, name, address) stays for the next document.
pub const TRANSIENT_FIELDS: &[&str] = &[
    "order_number",
    "item_name",
    "size",
    "price",
    "total",
    "product_image",
    "quantity",
    "tracking_number",
];

/// The dashboard's document form: the selected template, the inputs it shows
/// and the values typed so far.
#[derive(Debug, Clone)]
pub struct DocumentForm {
    template: &'static Template,
    fields: Vec<&'static FieldConfig>,
    values: BTreeMap<String, String>,
    status: Option<String>,
}

impl DocumentForm {
    pub fn new(catalog: &Catalog, template_id: &str) -> Result<Self, ClientError> {
        let (template, fields) = resolve(catalog, template_id)?;
        Ok(Self {
            template,
            fields,
            values: BTreeMap::new(),
            status: None,
        })
    }

    pub fn template(&self) -> &'static Template {
        self.template
    }

    /// Switch templates. Typed values are kept; only the visible set changes.
    pub fn select_template(&mut self, catalog: &Catalog, template_id: &str) -> Result<(), ClientError> {
        let (template, fields) = resolve(catalog, template_id)?;
        self.template = template;
        self.fields = fields;
        self.status = None;
        Ok(())
    }

    /// Visible inputs, in template order.
    pub fn fields(&self) -> &[&'static FieldConfig] {
        &self.fields
    }

    pub fn is_visible(&self, key: &str) -> bool {
        self.fields.iter().any(|f| f.key == key)
    }

    pub fn set(&mut self, key: &str, value: impl Into<String>) {
        self.values.insert(key.to_string(), value.into());
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.values.get(key).map(String::as_str)
    }

    /// Last outcome shown under the form.
    pub fn status(&self) -> Option<&str> {
        self.status.as_deref()
    }

    /// Violations among the visible fields; hidden values are not checked.
    pub fn validate(&self) -> Vec<FieldViolation> {
        self.fields
            .iter()
            .filter_map(|field| {
                field
                    .check(self.get(field.key))
                    .err()
                    .map(|violation| FieldViolation {
                        key: field.key,
                        label: field.label,
                        violation,
                    })
            })
            .collect()
    }

    /// Payload for the current template: visible, non-blank values only.
    pub fn request(&self) -> GenerateRequest {
        let mut req = GenerateRequest::new(self.template.id);
        for field in &self.fields {
            if let Some(value) = self.get(field.key).map(str::trim).filter(|v| !v.is_empty()) {
                req.fields.insert(field.key.to_string(), value.to_string());
            }
        }
        req
    }

    /// Validate, send, and on success clear the per-order fields.
    ///
    /// Takes `&mut self`, so a form cannot have two submissions in flight.
    pub async fn submit(
        &mut self,
        client: &DocgenClient,
        session: &Session,
    ) -> Result<GenerateResponse, ClientError> {
        let violations = self.validate();
        if !violations.is_empty() {
            let err = ClientError::Validation(violations);
            self.status = Some(err.user_message());
            return Err(err);
        }

        self.status = Some("Generating...".into());
        match client.generate(session, &self.request()).await {
            Ok(resp) => {
                info!("Document {} sent ({})", resp.document_id, self.template.id);
                self.clear_transient();
                self.status = Some(resp.message.clone());
                Ok(resp)
            }
            Err(e) => {
                self.status = Some(e.user_message());
                Err(e)
            }
        }
    }

    fn clear_transient(&mut self) {
        for key in TRANSIENT_FIELDS {
            self.values.remove(*key);
        }
    }
}

fn resolve(
    catalog: &Catalog,
    template_id: &str,
) -> Result<(&'static Template, Vec<&'static FieldConfig>), ClientError> {
    let template = catalog
        .template(template_id)
        .ok_or_else(|| ClientError::UnknownTemplate(template_id.to_string()))?;
    let fields = catalog
        .fields_for(template.id)
        .map_err(|_| ClientError::UnknownTemplate(template_id.to_string()))?;
    Ok((template, fields))
}

#[cfg(test)]
mod tests {
    use super::*;
    use docgen_types::schema::Violation;

    fn catalog() -> Catalog {
        Catalog::builtin().unwrap()
    }

    fn filled_nike() -> DocumentForm {
        let mut form = DocumentForm::new(&catalog(), "nike").unwrap();
        for (key, value) in [
            ("recipient_email", "client@example.com"),
            ("full_name", "Ola Nordmann"),
            ("address1", "Storgata 1"),
            ("address2", "Leil. 2"),
            ("address3", "0155 Oslo"),
            ("order_number", "NK-1"),
            ("item_name", "Air Max"),
            ("size", "44"),
            ("price", "120"),
            ("total", "130"),
            ("product_image", "https://example.com/a.png"),
            ("quantity", "1"),
        ] {
            form.set(key, value);
        }
        form
    }

    #[test]
    fn nike_shows_exactly_its_fields() {
        let form = DocumentForm::new(&catalog(), "nike").unwrap();
        let keys: Vec<_> = form.fields().iter().map(|f| f.key).collect();
        assert_eq!(
            keys,
            [
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
            ]
        );
        assert!(!form.is_visible("tracking_number"));
    }

    #[test]
    fn unknown_template() {
        assert!(matches!(
            DocumentForm::new(&catalog(), "ikea"),
            Err(ClientError::UnknownTemplate(id)) if id == "ikea"
        ));
    }

    #[test]
    fn empty_recipient_is_a_violation() {
        let mut form = filled_nike();
        form.set("recipient_email", "  ");
        let violations = form.validate();
        assert_eq!(violations.len(), 1);
        assert_eq!(violations[0].key, "recipient_email");
        assert_eq!(violations[0].violation, Violation::Missing);
    }

    #[test]
    fn request_carries_only_visible_values() {
        let mut form = filled_nike();
        form.set("tracking_number", "JD0001");
        form.set("delivery_date", "");
        let req = form.request();
        assert_eq!(req.template, "nike");
        assert_eq!(req.field("order_number"), Some("NK-1"));
        assert!(!req.fields.contains_key("tracking_number"));
        assert!(!req.fields.contains_key("delivery_date"));
    }

    #[test]
    fn switching_templates_keeps_values() {
        let mut form = filled_nike();
        form.select_template(&catalog(), "dhl").unwrap();
        assert!(form.is_visible("tracking_number"));
        assert!(!form.is_visible("order_number"));
        assert_eq!(form.get("order_number"), Some("NK-1"));
        assert!(form.request().fields.get("order_number").is_none());
    }

    #[test]
    fn clearing_after_success() {
        let mut form = filled_nike();
        form.set("tracking_number", "JD0001");
        form.clear_transient();
        for key in TRANSIENT_FIELDS {
            assert_eq!(form.get(key), None, "{key}");
        }
        assert_eq!(form.get("recipient_email"), Some("client@example.com"));
        assert_eq!(form.get("full_name"), Some("Ola Nordmann"));
        assert_eq!(form.get("address1"), Some("Storgata 1"));
        assert_eq!(form.get("address2"), Some("Leil. 2"));
        assert_eq!(form.get("address3"), Some("0155 Oslo"));
    }
}
