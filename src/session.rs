use chrono::Local;

use crate::error::QuoteError;
use crate::model::{ClientInfo, CompanyInfo, LineItem, QuotationRecord};

/// All mutable state of one editing session: the item ledger, the client
/// form, the company snapshot and the quote sequence counter. One session is
/// created per run and passed explicitly to every operation.
pub struct Session {
    pub client: ClientInfo,
    pub company: CompanyInfo,
    items: Vec<LineItem>,
    editing: Option<usize>,
    sequence: u32,
}

impl Session {
    pub fn new(company: CompanyInfo) -> Self {
        Self::with_sequence(company, 1)
    }

    pub fn with_sequence(company: CompanyInfo, sequence: u32) -> Self {
        Session {
            client: ClientInfo::default(),
            company,
            items: Vec::new(),
            editing: None,
            sequence: sequence.max(1),
        }
    }

    pub fn items(&self) -> &[LineItem] {
        &self.items
    }

    pub fn editing(&self) -> Option<usize> {
        self.editing
    }

    pub fn sequence(&self) -> u32 {
        self.sequence
    }

    pub fn total(&self) -> f64 {
        self.items.iter().map(|item| item.amount).sum()
    }

    /// Validates the raw form inputs and either replaces the slot under edit
    /// or appends a new item. On any validation failure the ledger is left
    /// untouched and the edit target stays active.
    pub fn add_or_update(
        &mut self,
        description: &str,
        unit_cost: &str,
        quantity: &str,
    ) -> Result<(), QuoteError> {
        let description = description.trim();
        if description.is_empty() {
            return Err(QuoteError::Validation(
                "description cannot be empty".to_string(),
            ));
        }
        let unit_cost = parse_non_negative(unit_cost, "unit cost")?;
        let quantity = parse_non_negative(quantity, "quantity")?;

        let item = LineItem::new(description, unit_cost, quantity);
        match self.editing.take() {
            Some(index) if index < self.items.len() => self.items[index] = item,
            _ => self.items.push(item),
        }
        Ok(())
    }

    /// Marks `index` as the active edit target and hands back the item so the
    /// surface can prefill its form.
    pub fn begin_edit(&mut self, index: usize) -> Result<&LineItem, QuoteError> {
        if index >= self.items.len() {
            return Err(QuoteError::IndexOutOfRange {
                index,
                len: self.items.len(),
            });
        }
        self.editing = Some(index);
        Ok(&self.items[index])
    }

    pub fn cancel_edit(&mut self) {
        self.editing = None;
    }

    /// Removes the item at `index`, keeping the remaining items in order. An
    /// active edit target is dropped or shifted so it still names the same
    /// item afterwards.
    pub fn delete(&mut self, index: usize) -> Result<(), QuoteError> {
        if index >= self.items.len() {
            return Err(QuoteError::IndexOutOfRange {
                index,
                len: self.items.len(),
            });
        }
        self.items.remove(index);
        self.editing = match self.editing {
            Some(e) if e == index => None,
            Some(e) if e > index => Some(e - 1),
            other => other,
        };
        Ok(())
    }

    /// Empties the ledger and blanks the client form. Company details and the
    /// sequence counter are not touched.
    pub fn clear(&mut self) {
        self.items.clear();
        self.client = ClientInfo::default();
        self.editing = None;
    }

    /// Assembles the immutable record for the current ledger. The sequence
    /// counter is NOT advanced here; callers advance it only once the record
    /// has actually been persisted.
    pub fn build_record(&self) -> Result<QuotationRecord, QuoteError> {
        if self.client.name.trim().is_empty() {
            return Err(QuoteError::Validation(
                "client name is required".to_string(),
            ));
        }
        Ok(QuotationRecord {
            quote_number: format!("{:06}", self.sequence),
            date: Local::now().format("%d-%m-%Y").to_string(),
            client_info: self.client.clone(),
            items: self.items.clone(),
            total: self.total(),
            company_info: self.company.clone(),
        })
    }

    pub fn advance_sequence(&mut self) {
        self.sequence += 1;
    }
}

fn parse_non_negative(raw: &str, field: &str) -> Result<f64, QuoteError> {
    let value: f64 = raw
        .trim()
        .parse()
        .map_err(|_| QuoteError::Validation(format!("{field} is not a valid number: {raw:?}")))?;
    if !value.is_finite() || value < 0.0 {
        return Err(QuoteError::Validation(format!(
            "{field} must be a non-negative number"
        )));
    }
    Ok(value)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn session() -> Session {
        Session::new(CompanyInfo::default())
    }

    #[test]
    fn amount_is_product_of_cost_and_quantity() {
        let mut s = session();
        s.add_or_update("Consulting", "100.0", "2.0").unwrap();
        s.add_or_update("Travel", "12.5", "0").unwrap();
        assert_eq!(s.items()[0].amount, 200.0);
        assert_eq!(s.items()[1].amount, 0.0);
        assert_eq!(s.total(), 200.0);
    }

    #[test]
    fn empty_description_is_rejected_and_ledger_unchanged() {
        let mut s = session();
        s.add_or_update("Keep me", "1", "1").unwrap();
        let err = s.add_or_update("   ", "10", "1").unwrap_err();
        assert!(matches!(err, QuoteError::Validation(_)));
        assert_eq!(s.items().len(), 1);
        assert_eq!(s.items()[0].description, "Keep me");
    }

    #[test]
    fn unparseable_or_negative_numbers_are_rejected() {
        let mut s = session();
        assert!(matches!(
            s.add_or_update("x", "ten", "1"),
            Err(QuoteError::Validation(_))
        ));
        assert!(matches!(
            s.add_or_update("x", "10", "-1"),
            Err(QuoteError::Validation(_))
        ));
        assert!(matches!(
            s.add_or_update("x", "inf", "1"),
            Err(QuoteError::Validation(_))
        ));
        assert!(s.items().is_empty());
    }

    #[test]
    fn description_is_trimmed() {
        let mut s = session();
        s.add_or_update("  Consulting  ", "1", "1").unwrap();
        assert_eq!(s.items()[0].description, "Consulting");
    }

    #[test]
    fn edit_replaces_slot_and_clears_target() {
        let mut s = session();
        s.add_or_update("a", "1", "1").unwrap();
        s.add_or_update("b", "2", "2").unwrap();
        let prefill = s.begin_edit(0).unwrap().clone();
        assert_eq!(prefill.description, "a");
        s.add_or_update("a2", "3", "3").unwrap();
        assert_eq!(s.items().len(), 2);
        assert_eq!(s.items()[0].description, "a2");
        assert_eq!(s.items()[0].amount, 9.0);
        assert_eq!(s.editing(), None);
        // next add appends again
        s.add_or_update("c", "1", "1").unwrap();
        assert_eq!(s.items().len(), 3);
    }

    #[test]
    fn failed_update_keeps_edit_target() {
        let mut s = session();
        s.add_or_update("a", "1", "1").unwrap();
        s.begin_edit(0).unwrap();
        assert!(s.add_or_update("", "1", "1").is_err());
        assert_eq!(s.editing(), Some(0));
    }

    #[test]
    fn delete_preserves_order_of_remaining_items() {
        let mut s = session();
        for name in ["a", "b", "c", "d"] {
            s.add_or_update(name, "1", "1").unwrap();
        }
        s.delete(1).unwrap();
        let names: Vec<&str> = s.items().iter().map(|i| i.description.as_str()).collect();
        assert_eq!(names, vec!["a", "c", "d"]);
    }

    #[test]
    fn delete_out_of_range_reports_and_changes_nothing() {
        let mut s = session();
        s.add_or_update("a", "1", "1").unwrap();
        let err = s.delete(5).unwrap_err();
        assert!(matches!(
            err,
            QuoteError::IndexOutOfRange { index: 5, len: 1 }
        ));
        assert_eq!(s.items().len(), 1);
    }

    #[test]
    fn delete_shifts_active_edit_target() {
        let mut s = session();
        for name in ["a", "b", "c"] {
            s.add_or_update(name, "1", "1").unwrap();
        }
        s.begin_edit(2).unwrap();
        s.delete(0).unwrap();
        assert_eq!(s.editing(), Some(1));
        s.delete(1).unwrap();
        assert_eq!(s.editing(), None);
    }

    #[test]
    fn clear_blanks_ledger_and_client_but_not_company_or_sequence() {
        let mut s = Session::with_sequence(
            CompanyInfo {
                name: "Acme".into(),
                ..CompanyInfo::default()
            },
            7,
        );
        s.client.name = "Jane Doe".into();
        s.add_or_update("a", "1", "1").unwrap();
        s.clear();
        assert!(s.items().is_empty());
        assert_eq!(s.client, ClientInfo::default());
        assert_eq!(s.company.name, "Acme");
        assert_eq!(s.sequence(), 7);
    }

    #[test]
    fn build_requires_client_name() {
        let mut s = session();
        s.add_or_update("a", "1", "1").unwrap();
        assert!(matches!(
            s.build_record(),
            Err(QuoteError::Validation(_))
        ));
        assert_eq!(s.sequence(), 1);
    }

    #[test]
    fn build_sums_item_amounts() {
        let mut s = session();
        s.client.name = "Jane Doe".into();
        let empty = s.build_record().unwrap();
        assert_eq!(empty.total, 0.0);

        s.add_or_update("Consulting", "100.0", "2.0").unwrap();
        s.add_or_update("Hosting", "9.99", "3").unwrap();
        let record = s.build_record().unwrap();
        assert_eq!(record.quote_number, "000001");
        assert_eq!(record.total, 200.0 + 9.99 * 3.0);
        assert_eq!(record.items.len(), 2);
        // day-month-year, zero padded
        assert_eq!(record.date.len(), 10);
        assert_eq!(&record.date[2..3], "-");
        assert_eq!(&record.date[5..6], "-");
    }

    #[test]
    fn sequence_advances_by_one_and_pads_to_six_digits() {
        let mut s = session();
        s.client.name = "Jane Doe".into();
        assert_eq!(s.build_record().unwrap().quote_number, "000001");
        s.advance_sequence();
        assert_eq!(s.build_record().unwrap().quote_number, "000002");
        let mut late = Session::with_sequence(CompanyInfo::default(), 123456);
        late.client.name = "x".into();
        assert_eq!(late.build_record().unwrap().quote_number, "123456");
    }
}
