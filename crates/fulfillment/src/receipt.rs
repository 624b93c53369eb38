use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use vexo_core::{DomainError, DomainResult, OrderId};

/// Pointer to the rendered receipt document of an order.
///
/// Receipts have no lifecycle: issuing one for an order that already has one
/// overwrites the pointer and refreshes `created_at`. Rendering the document
/// itself happens elsewhere; the core only stores where it lives.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Receipt {
    pub order_id: OrderId,
    pub pdf_url: String,
    pub created_at: DateTime<Utc>,
}

/// Input for issuing (or re-issuing) a receipt.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewReceipt {
    pub pdf_url: String,
}

impl NewReceipt {
    pub fn validate(&self) -> DomainResult<()> {
        if self.pdf_url.starts_with("http://") || self.pdf_url.starts_with("https://") {
            Ok(())
        } else {
            Err(DomainError::validation("pdf_url must be an http(s) URL"))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_http_and_https_urls() {
        assert!(NewReceipt {
            pdf_url: "https://cdn.example.com/r/1.pdf".to_string()
        }
        .validate()
        .is_ok());
        assert!(NewReceipt {
            pdf_url: "http://cdn.example.com/r/1.pdf".to_string()
        }
        .validate()
        .is_ok());
    }

    #[test]
    fn rejects_other_schemes_and_garbage() {
        for bad in ["file:///tmp/r.pdf", "cdn.example.com/r.pdf", ""] {
            assert!(NewReceipt {
                pdf_url: bad.to_string()
            }
            .validate()
            .is_err());
        }
    }
}
