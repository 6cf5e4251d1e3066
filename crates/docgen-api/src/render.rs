//! Placeholder substitution for HTML document templates.
//!
//! Templates are plain HTML with bare uppercase markers (`WHOLE_NAME`,
//! `ORDER_NUMBER`, ...). Several markers are prefixes of others, so
//! substitution walks the body once and always takes the longest marker that
//! matches at the current position. Substituted text is never re-scanned.

use std::collections::BTreeMap;

use chrono::NaiveDate;

use docgen_types::api::GenerateRequest;

const DEFAULT_PRODUCT_IMAGE: &str = "https://via.placeholder.com/280x280?text=Product";

/// Build the marker → value table for one generation request.
pub fn placeholders(req: &GenerateRequest, today: NaiveDate) -> BTreeMap<String, String> {
    let field = |key: &str| req.field(key).unwrap_or("").to_string();
    let or = |key: &str, default: &str| req.field(key).unwrap_or(default).to_string();

    let full_name = field("full_name");
    let first_name = req
        .field("first_name")
        .map(str::to_string)
        .unwrap_or_else(|| full_name.split_whitespace().next().unwrap_or("").to_string());
    let date = req
        .field("delivery_date")
        .map(str::to_string)
        .unwrap_or_else(|| today.format("%B %d, %Y").to_string());
    let order_number = field("order_number");
    let item_name = or("item_name", "Your Item");
    let currency = or("currency", "$");
    let price = or("price", "0.00");
    let total = req.field("total").unwrap_or(&price).to_string();
    let quantity = or("quantity", "1");
    let address1 = field("address1");
    let address2 = field("address2");

    let mut values = BTreeMap::new();
    let mut put = |marker: &str, value: String| {
        values.insert(marker.to_string(), value);
    };

    put("WHOLE_NAME", full_name);
    put("FIRSTNAME", first_name);

    put("ADDRESS1", address1.clone());
    put("ADDRESS2", address2.clone());
    put("ADDRESS3", field("address3"));
    put("ADDRESS4", address1);
    put("ADDRESS5", address2);

    put("DATE", date.clone());
    put("DELIVERY", date);

    put("ORDER_NUM", order_number.clone());
    put("ORDER_NUMBER", order_number.clone());
    put("ORDERNUMBER", order_number);

    put("ITEM_NAME", item_name.clone());
    put("PRODUCT_NAME", item_name);
    put("SIZE", field("size"));

    let priced = format!("{currency}{price}");
    put("PRICE", priced.clone());
    put("PRODUCT_PRICE", priced.clone());
    put("PRODUCT_SUBTOTAL", priced);
    put("TOTAL", format!("{currency}{total}"));

    put("QUANTITY", quantity.clone());
    put("QTY", quantity.clone());
    put("PRODUCT_QTY", quantity);

    put("CARD_END", or("card_last4", "****"));
    put("CURRENCY", currency);
    put("PRODUCT_IMAGE", or("product_image", DEFAULT_PRODUCT_IMAGE));
    put("SHIPPING", or("shipping", "Free Shipping"));
    put("PRODUCT_COLOUR", field("color"));
    put("TRACKING_NUMBER", field("tracking_number"));
    put("PHONE", field("phone"));
    put("EMAIL", field("recipient_email"));
    put("NOTES", field("notes"));

    if let Some(extra) = &req.additional_data {
        for (marker, value) in extra {
            if !marker.is_empty() {
                values.insert(marker.clone(), value.clone());
            }
        }
    }

    values
}

/// Replace every marker in `body` in a single left-to-right pass.
pub fn substitute(body: &str, values: &BTreeMap<String, String>) -> String {
    let mut markers: Vec<(&str, &str)> = values
        .iter()
        .filter(|(marker, _)| !marker.is_empty())
        .map(|(marker, value)| (marker.as_str(), value.as_str()))
        .collect();
    markers.sort_by(|a, b| b.0.len().cmp(&a.0.len()));

    let mut out = String::with_capacity(body.len());
    let mut rest = body;
    'scan: while let Some(ch) = rest.chars().next() {
        for (marker, value) in &markers {
            if rest.starts_with(marker) {
                out.push_str(value);
                rest = &rest[marker.len()..];
                continue 'scan;
            }
        }
        out.push(ch);
        rest = &rest[ch.len_utf8()..];
    }
    out
}
