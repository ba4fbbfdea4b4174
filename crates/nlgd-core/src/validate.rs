//! Checks run before a document is written.

use rust_decimal::Decimal;
use thiserror::Error;

use crate::model::{Contract, Estimate, Invoice, LineItem, Payment, SimpleLineItem};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("estimate is empty: add a client name or at least one priced line item")]
    EmptyDocument,
    #[error("client name is required")]
    MissingClientName,
    #[error("standalone invoice needs at least one item with a description and a positive amount")]
    NoBillableItems,
    #[error("{0} must reference an estimate id")]
    MissingEstimateId(&'static str),
    #[error("payment {id} has non-positive amount {amount}; record a positive amount")]
    NonPositivePayment { id: String, amount: Decimal },
}

fn is_priced(item: &LineItem) -> bool {
    !item.no_price && (!item.description.trim().is_empty() || !item.unit_price.is_zero())
}

fn is_billable(item: &SimpleLineItem) -> bool {
    !item.description.trim().is_empty() && item.amount > Decimal::ZERO
}

pub fn validate_estimate(estimate: &Estimate) -> Result<(), ValidationError> {
    let has_priced = estimate
        .project_sections
        .iter()
        .flat_map(|section| section.items())
        .chain(estimate.design_fee.iter())
        .any(is_priced);
    if estimate.client.name.trim().is_empty() && !has_priced {
        return Err(ValidationError::EmptyDocument);
    }
    Ok(())
}

pub fn validate_contract(contract: &Contract) -> Result<(), ValidationError> {
    if contract.estimate_id.trim().is_empty() {
        return Err(ValidationError::MissingEstimateId("contract"));
    }
    Ok(())
}

pub fn validate_payment(payment: &Payment) -> Result<(), ValidationError> {
    if payment.amount <= Decimal::ZERO {
        return Err(ValidationError::NonPositivePayment {
            id: payment.id.clone(),
            amount: payment.amount,
        });
    }
    Ok(())
}

/// An invoice carrying estimate content must name its estimate. One without
/// estimate content is standalone and must bill someone for something.
pub fn validate_invoice(invoice: &Invoice) -> Result<(), ValidationError> {
    let has_estimate_content =
        !invoice.project_sections.is_empty() || !invoice.design_fee.is_empty();
    if invoice.is_standalone() {
        if has_estimate_content {
            return Err(ValidationError::MissingEstimateId("estimate-linked invoice"));
        }
        if invoice.client.name.trim().is_empty() {
            return Err(ValidationError::MissingClientName);
        }
        if !invoice.standalone_items.iter().any(is_billable) {
            return Err(ValidationError::NoBillableItems);
        }
    }
    invoice.payments.iter().try_for_each(validate_payment)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::{
        create_blank_estimate, derive_contract, derive_invoice, new_line_item,
        new_standalone_invoice, ContractOptions,
    };
    use crate::model::{new_id, ClientInfo, LineItemCategory, PaymentMethod};
    use chrono::NaiveDate;

    fn date() -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 4, 1).unwrap()
    }

    fn client(name: &str) -> ClientInfo {
        ClientInfo {
            name: name.into(),
            ..ClientInfo::default()
        }
    }

    #[test]
    fn blank_estimate_is_rejected_until_it_has_content() {
        let mut estimate = create_blank_estimate("NL-2026-001", None);
        assert_eq!(validate_estimate(&estimate), Err(ValidationError::EmptyDocument));

        let mut row = new_line_item(LineItemCategory::Planting);
        row.description = "Agave".into();
        estimate.project_sections[0].plant_material.push(row);
        assert!(validate_estimate(&estimate).is_ok());

        let mut named = create_blank_estimate("NL-2026-002", None);
        named.client.name = "Rivera".into();
        assert!(validate_estimate(&named).is_ok());
    }

    #[test]
    fn no_price_rows_do_not_count_as_content() {
        let mut estimate = create_blank_estimate("NL-2026-001", None);
        let mut row = new_line_item(LineItemCategory::Other);
        row.description = "Owner supplied boulders".into();
        row.no_price = true;
        estimate.project_sections[0].other_materials.push(row);
        assert_eq!(validate_estimate(&estimate), Err(ValidationError::EmptyDocument));
    }

    #[test]
    fn contract_and_linked_invoice_need_estimate_id() {
        let mut estimate = create_blank_estimate("NL-2026-001", None);
        estimate.client.name = "Rivera".into();

        let mut contract = derive_contract(&estimate, "NL-C-2026-001", &ContractOptions::default());
        assert!(validate_contract(&contract).is_ok());
        contract.estimate_id.clear();
        assert_eq!(
            validate_contract(&contract),
            Err(ValidationError::MissingEstimateId("contract"))
        );

        let mut invoice = derive_invoice(&estimate, "NL-INV-2026-001", date(), "");
        assert!(validate_invoice(&invoice).is_ok());
        invoice.estimate_id = None;
        assert!(matches!(
            validate_invoice(&invoice),
            Err(ValidationError::MissingEstimateId(_))
        ));
    }

    #[test]
    fn standalone_invoice_needs_client_and_items() {
        let item = SimpleLineItem {
            id: new_id(),
            description: "Consultation".into(),
            amount: Decimal::new(150, 0),
            sub_items: Vec::new(),
        };
        let ok = new_standalone_invoice("NL-INV-2026-001", client("Lee"), "", vec![item.clone()], date(), "");
        assert!(validate_invoice(&ok).is_ok());

        let nameless = new_standalone_invoice("NL-INV-2026-002", client(" "), "", vec![item], date(), "");
        assert_eq!(validate_invoice(&nameless), Err(ValidationError::MissingClientName));

        let empty = new_standalone_invoice("NL-INV-2026-003", client("Lee"), "", Vec::new(), date(), "");
        assert_eq!(validate_invoice(&empty), Err(ValidationError::NoBillableItems));
    }

    #[test]
    fn payments_must_be_positive() {
        let payment = Payment {
            id: "p1".into(),
            date: date(),
            amount: Decimal::ZERO,
            method: PaymentMethod::Check,
            note: String::new(),
        };
        assert!(matches!(
            validate_payment(&payment),
            Err(ValidationError::NonPositivePayment { .. })
        ));
        let positive = Payment {
            amount: Decimal::new(1, 2),
            ..payment
        };
        assert!(validate_payment(&positive).is_ok());
    }
}
