//! HTML pages served by the web front end

use crate::types::PriceQuote;

const INDEX_TEMPLATE: &str = include_str!("../templates/index.html");
const RESULT_TEMPLATE: &str = include_str!("../templates/result.html");
const ERROR_TEMPLATE: &str = include_str!("../templates/error.html");

/// Upload form posting `image`, `quantity` and `description` to `/predict`
pub fn index_page() -> &'static str {
    INDEX_TEMPLATE
}

/// Result page with unit price and total, both to two decimals
pub fn result_page(quote: &PriceQuote) -> String {
    fill(
        RESULT_TEMPLATE,
        &[
            ("price_per_unit", format_price(quote.price_per_unit)),
            ("total", format_price(quote.total)),
            ("quantity", quote.quantity.to_string()),
            ("request_id", quote.request_id.to_string()),
            (
                "predicted_at",
                quote.predicted_at.format("%Y-%m-%d %H:%M:%S UTC").to_string(),
            ),
        ],
    )
}

/// Error page; `message` is escaped before it is inserted
pub fn error_page(status: u16, title: &str, message: &str) -> String {
    fill(
        ERROR_TEMPLATE,
        &[
            ("status", status.to_string()),
            ("title", escape_html(title)),
            ("message", escape_html(message)),
        ],
    )
}

/// Two decimal places, as shown on the result page
pub fn format_price(value: f64) -> String {
    format!("{:.2}", value)
}

pub fn escape_html(raw: &str) -> String {
    html_escape::encode_safe(raw).into_owned()
}

fn fill(template: &str, values: &[(&str, String)]) -> String {
    values.iter().fold(template.to_string(), |page, (key, value)| {
        page.replace(&format!("{{{{{}}}}}", key), value)
    })
}
