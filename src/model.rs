use serde::{Deserialize, Serialize};

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct LineItem {
    pub description: String,
    pub unit_cost: f64,
    pub quantity: f64,
    pub amount: f64,
}

impl LineItem {
    /// `amount` is always derived, never set directly.
    pub fn new(description: impl Into<String>, unit_cost: f64, quantity: f64) -> Self {
        LineItem {
            description: description.into(),
            unit_cost,
            quantity,
            amount: unit_cost * quantity,
        }
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, Default, PartialEq)]
pub struct ClientInfo {
    pub name: String,
    pub phone: String,
    pub email: String,
    pub address: String,
}

#[derive(Debug, Serialize, Deserialize, Clone, Default, PartialEq)]
pub struct CompanyInfo {
    pub name: String,
    pub address: String, // may span multiple lines
    pub phone: String,
    pub email: String,
    pub footer_text: String,
    pub theme_color: String,
    // Raw image bytes, loaded from disk at session start. Never part of the
    // JSON record; historical documents regenerate without the logo.
    #[serde(skip)]
    pub logo: Option<Vec<u8>>,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct QuotationRecord {
    pub quote_number: String,
    pub date: String, // DD-MM-YYYY
    pub client_info: ClientInfo,
    pub items: Vec<LineItem>,
    pub total: f64,
    pub company_info: CompanyInfo,
}

impl QuotationRecord {
    /// Every leaf field flattened into one string, for substring search over
    /// the history. Numbers are stringified the same way they were entered.
    pub fn search_text(&self) -> String {
        let mut parts: Vec<String> = vec![self.quote_number.clone(), self.date.clone()];
        for field in [
            &self.client_info.name,
            &self.client_info.phone,
            &self.client_info.email,
            &self.client_info.address,
        ] {
            parts.push(field.clone());
        }
        for item in &self.items {
            parts.push(item.description.clone());
            parts.push(item.unit_cost.to_string());
            parts.push(item.quantity.to_string());
            parts.push(item.amount.to_string());
        }
        parts.push(self.total.to_string());
        for field in [
            &self.company_info.name,
            &self.company_info.address,
            &self.company_info.phone,
            &self.company_info.email,
            &self.company_info.footer_text,
            &self.company_info.theme_color,
        ] {
            parts.push(field.clone());
        }
        parts.join("\n")
    }
}
