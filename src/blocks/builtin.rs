//! Built-in domain blocks
//!
//! Each block is a table of weighted, case-insensitive patterns over the
//! endpoint path, operation id, and minified schema, plus a renderer.

use crate::blocks::{ContextBlock, EndpointInfo, GENERIC_BLOCK_ID};
use regex::{Regex, RegexBuilder};
use std::sync::Arc;
use tracing::error;

#[derive(Debug, Clone, Copy)]
enum Field {
    Path,
    Operation,
    Schema,
}

type Renderer = fn(&EndpointInfo) -> String;

/// A pattern-scored block with a fixed renderer
pub struct BuiltinBlock {
    id: &'static str,
    rules: Vec<(Field, Regex, f64)>,
    base_score: f64,
    render: Renderer,
}

impl BuiltinBlock {
    fn new(
        id: &'static str,
        rules: &[(Field, &str, f64)],
        base_score: f64,
        render: Renderer,
    ) -> Result<Self, regex::Error> {
        let rules = rules
            .iter()
            .map(|(field, pattern, weight)| {
                RegexBuilder::new(pattern)
                    .case_insensitive(true)
                    .build()
                    .map(|regex| (*field, regex, *weight))
            })
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self {
            id,
            rules,
            base_score,
            render,
        })
    }
}

impl ContextBlock for BuiltinBlock {
    fn id(&self) -> &str {
        self.id
    }

    fn score(&self, info: &EndpointInfo) -> f64 {
        let operation = info.operation_id.as_deref().unwrap_or_default();
        let total: f64 = self
            .rules
            .iter()
            .filter(|(field, regex, _)| {
                let text = match field {
                    Field::Path => info.path.as_str(),
                    Field::Operation => operation,
                    Field::Schema => info.schema_minified.as_str(),
                };
                regex.is_match(text)
            })
            .map(|(_, _, weight)| weight)
            .sum();
        (self.base_score + total).min(1.0)
    }

    fn render(&self, info: &EndpointInfo) -> String {
        (self.render)(info)
    }
}

/// All built-in blocks, generic fallback last.
pub fn builtin_blocks() -> Vec<Arc<dyn ContextBlock>> {
    use Field::*;

    let definitions: Vec<Result<BuiltinBlock, regex::Error>> = vec![
        BuiltinBlock::new(
            "commerce.products.v1",
            &[
                (Path, r"\b(products?|items?|catalog|inventory)\b", 0.35),
                (Operation, r"(product|catalog|inventory|list)", 0.20),
                (Schema, r"\b(price|currency|sku|upc|isbn|brand|model|category)\b", 0.35),
                (Schema, r#"(?s)"type":"array".*"items"|"items".*"type":"array""#, 0.05),
            ],
            0.0,
            render_products,
        ),
        BuiltinBlock::new(
            "people.users.v1",
            &[
                (Path, r"\b(users?|customers?|people|persons?)\b", 0.35),
                (Operation, r"(user|customer|person|account)", 0.20),
                (Schema, r"\b(email|firstName|lastName|phone|address|dob|profile)\b", 0.35),
                (Schema, r"\b(country|postalCode|zip|city|state|province)\b", 0.10),
            ],
            0.0,
            render_people,
        ),
        BuiltinBlock::new(
            "finance.accounts.v1",
            &[
                (Path, r"\b(accounts?|ledgers?|balances?|bank|finance|payments?)\b", 0.30),
                (Operation, r"(account|balance|ledger|payment|payout|invoice)", 0.20),
                (Schema, r"\b(iban|bic|swift|routing|accountNumber|currency|amount)\b", 0.40),
                (Schema, r"\b(statement|transactionDate)\b", 0.10),
            ],
            0.0,
            render_finance,
        ),
        BuiltinBlock::new(
            "commerce.orders.v1",
            &[
                (Path, r"\b(orders?|transactions?|payments?)\b", 0.35),
                (Operation, r"(order|checkout|payment|transaction)", 0.20),
                (Schema, r"\b(status|total|shipping|billing|paymentMethod|lineItems)\b", 0.35),
                (Schema, r"\b(currency|amount|tax|discount)\b", 0.10),
            ],
            0.0,
            render_orders,
        ),
        BuiltinBlock::new(
            "auth.tokens.v1",
            &[
                (Path, r"\b(auth|oauth|login|token|sessions?)\b", 0.35),
                (Operation, r"(auth|oauth|token|session|signin|login|refresh)", 0.25),
                (
                    Schema,
                    r"\b(access_token|refresh_token|expires_in|scope|claims|aud|iss|sub)\b",
                    0.35,
                ),
                (Schema, r"\b(jwk|kid|alg)\b", 0.05),
            ],
            0.0,
            render_auth,
        ),
        BuiltinBlock::new(GENERIC_BLOCK_ID, &[], 0.1, render_generic),
    ];

    definitions
        .into_iter()
        .filter_map(|block| match block {
            Ok(block) => Some(Arc::new(block) as Arc<dyn ContextBlock>),
            Err(e) => {
                error!(error = %e, "Built-in block pattern failed to compile");
                None
            }
        })
        .collect()
}

/// `/items/{id}`, `/items/:id` and `/items/42` address a single resource.
fn is_single_resource(path: &str) -> bool {
    path.split('/').skip(1).any(|segment| {
        (segment.starts_with('{') && segment.ends_with('}') && segment.len() > 2)
            || (segment.starts_with(':') && segment.len() > 1)
            || segment.chars().next().is_some_and(|c| c.is_ascii_digit())
    })
}

fn with_rules(mut text: String, rules: &[&str]) -> String {
    text.push_str("\nRules for your response:\n");
    for rule in rules {
        text.push_str("- ");
        text.push_str(rule);
        text.push('\n');
    }
    text
}

fn render_products(info: &EndpointInfo) -> String {
    let is_create = info.method.eq_ignore_ascii_case("POST");
    let mut text = String::from("PRODUCTS CONTEXT:\n");
    if is_create {
        text.push_str("Example of product creation response:\n");
        text.push_str(CREATED_PRODUCT_EXAMPLE);
    } else if is_single_resource(&info.path) {
        text.push_str("Example of excellent single product response:\n");
        text.push_str(SINGLE_PRODUCT_EXAMPLE);
    } else {
        text.push_str("Example of excellent product list:\n");
        text.push_str(PRODUCT_LIST_EXAMPLE);
    }
    with_rules(
        text,
        &[
            "Use real product names and specs like the example",
            "Descriptions must be specific (chipset, materials, capacity)",
            "Prices realistic and varied ($9.99 to $1,999.00)",
            "Each product must be unique - no duplicates or placeholders",
        ],
    )
}

fn render_people(info: &EndpointInfo) -> String {
    let mut text = String::from("USERS CONTEXT:\n");
    if is_single_resource(&info.path) {
        text.push_str("Example of excellent user response:\n");
        text.push_str(SINGLE_USER_EXAMPLE);
    } else {
        text.push_str("Example of excellent user list:\n");
        text.push_str(USER_LIST_EXAMPLE);
    }
    with_rules(
        text,
        &[
            "Use realistic names from diverse backgrounds",
            "Emails must be valid (firstname.lastname@domain.com)",
            "Phone numbers in proper format (+1-555-0123)",
            "Dates in ISO-8601 format",
        ],
    )
}

fn render_finance(_: &EndpointInfo) -> String {
    "FINANCE CONTEXT:\n\
     - Use valid ISO 4217 currency codes; amounts with 2 decimals where applicable.\n\
     - Bank fields realistic (IBAN/BIC/SWIFT formats); mask sensitive numbers.\n\
     - Dates and value dates in ISO-8601 with time zones.\n"
        .to_string()
}

fn render_orders(_: &EndpointInfo) -> String {
    let mut text = String::from("ORDERS CONTEXT:\nExample of excellent order response:\n");
    text.push_str(ORDER_EXAMPLE);
    with_rules(
        text,
        &[
            "Order IDs like ORD-2024-xxxxx or uuid format",
            "Include customer reference, items array, shipping, payment",
            "Status: pending/processing/shipped/delivered/cancelled",
            "Dates in ISO-8601 format",
            "Total = sum(items) + shipping + tax",
        ],
    )
}

fn render_auth(_: &EndpointInfo) -> String {
    "AUTH CONTEXT:\n\
     - Use realistic JWTs (header/payload/exp/iat), plausible scopes/claims.\n\
     - Never include real secrets; keys and tokens must be non-sensitive mock values.\n"
        .to_string()
}

fn render_generic(_: &EndpointInfo) -> String {
    "GENERIC CONTEXT:\n\
     - Use realistic, domain-appropriate values; no placeholders.\n\
     - Honor formats/enums (email, uuid, date-time, country codes).\n\
     - Arrays must be diverse; respect min/max constraints in schema when present.\n"
        .to_string()
}

const SINGLE_PRODUCT_EXAMPLE: &str = r#"{
  "id": "prod-789456",
  "name": "Sony WH-1000XM5 Wireless Headphones",
  "description": "Industry-leading noise canceling with Auto NC Optimizer, 30-hour battery life",
  "price": 399.99,
  "category": "Electronics",
  "brand": "Sony",
  "sku": "SNY-WH1000XM5-BLK",
  "inStock": true,
  "stockQuantity": 145,
  "rating": 4.7
}
"#;

const PRODUCT_LIST_EXAMPLE: &str = r#"[
  { "id": "prod-001", "name": "MacBook Air 15-inch M2", "price": 1299.00, "category": "Computers", "brand": "Apple" },
  { "id": "prod-002", "name": "Samsung Galaxy S24 Ultra", "price": 1199.99, "category": "Smartphones", "brand": "Samsung" }
]
"#;

const CREATED_PRODUCT_EXAMPLE: &str = r#"{
  "id": "prod-new-8934",
  "name": "iPad Pro 12.9-inch M2",
  "status": "created",
  "message": "Product created successfully",
  "createdAt": "2024-01-25T09:15:30Z"
}
"#;

const SINGLE_USER_EXAMPLE: &str = r#"{
  "id": "usr-456789",
  "email": "sarah.johnson@techcorp.com",
  "firstName": "Sarah",
  "lastName": "Johnson",
  "phoneNumber": "+1-415-555-0142",
  "accountStatus": "active",
  "createdAt": "2022-01-10T08:00:00Z"
}
"#;

const USER_LIST_EXAMPLE: &str = r#"[
  { "id": "usr-001", "email": "john.smith@example.com", "name": "John Smith", "role": "customer", "status": "active" },
  { "id": "usr-002", "email": "maria.garcia@example.com", "name": "Maria Garcia", "role": "premium", "status": "active" }
]
"#;

const ORDER_EXAMPLE: &str = r#"{
  "orderId": "ORD-2024-78234",
  "customerId": "usr-456789",
  "orderDate": "2024-01-25T14:30:00Z",
  "status": "processing",
  "items": [
    { "productId": "prod-789", "productName": "Sony WH-1000XM5", "quantity": 1, "unitPrice": 399.99, "subtotal": 399.99 }
  ],
  "shipping": { "method": "Express 2-Day", "cost": 12.99 },
  "totals": { "subtotal": 399.99, "shipping": 12.99, "tax": 35.00, "total": 447.98 }
}
"#;

#[cfg(test)]
mod tests {
    use super::*;

    fn block(id: &str) -> Arc<dyn ContextBlock> {
        builtin_blocks()
            .into_iter()
            .find(|b| b.id() == id)
            .unwrap()
    }

    #[test]
    fn test_all_blocks_compile() {
        let ids: Vec<String> = builtin_blocks().iter().map(|b| b.id().to_string()).collect();
        assert_eq!(
            ids,
            vec![
                "commerce.products.v1",
                "people.users.v1",
                "finance.accounts.v1",
                "commerce.orders.v1",
                "auth.tokens.v1",
                GENERIC_BLOCK_ID,
            ]
        );
    }

    #[test]
    fn test_people_scoring() {
        let people = block("people.users.v1");
        let info = EndpointInfo::new("/users/42", "GET")
            .with_operation_id("getUser")
            .with_schema(r#"{"properties":{"firstName":{},"city":{}}}"#);
        assert!((people.score(&info) - 1.0).abs() < 1e-9);

        let unrelated = EndpointInfo::new("/widgets", "GET");
        assert_eq!(people.score(&unrelated), 0.0);
    }

    #[test]
    fn test_products_render_variants() {
        let products = block("commerce.products.v1");
        let single = products.render(&EndpointInfo::new("/products/42", "GET"));
        assert!(single.contains("single product"));
        let list = products.render(&EndpointInfo::new("/products", "GET"));
        assert!(list.contains("product list"));
        let created = products.render(&EndpointInfo::new("/products", "POST"));
        assert!(created.contains("creation"));
        assert!(created.contains("Rules for your response:"));
    }

    #[test]
    fn test_generic_has_constant_score() {
        let generic = block(GENERIC_BLOCK_ID);
        assert!((generic.score(&EndpointInfo::default()) - 0.1).abs() < 1e-9);
        assert!(generic.render(&EndpointInfo::default()).starts_with("GENERIC CONTEXT:"));
    }

    #[test]
    fn test_single_resource_detection() {
        assert!(is_single_resource("/items/{id}"));
        assert!(is_single_resource("/items/:id"));
        assert!(is_single_resource("/items/42/reviews"));
        assert!(!is_single_resource("/items"));
        assert!(!is_single_resource("/v1/items"));
    }
}
