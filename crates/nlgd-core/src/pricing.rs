//! Pricing model: pure, total functions over priceable documents.
//!
//! Aggregates are summed from exact `quantity × unit_price` products and
//! rounded once, at the aggregate being returned. Only `line_total` rounds a
//! single row, and that value is for display; no aggregate is built from it.

use rust_decimal::{Decimal, RoundingStrategy};
use serde::Serialize;

use crate::model::{
    Contract, Estimate, Invoice, InvoiceStatus, LineItem, LineItemCategory, ListKey,
    PaymentMilestone, PaymentSchedule, ProjectSection, SimpleLineItem,
};

/// The subset of a document the pricing model reads.
pub trait Priceable {
    fn project_sections(&self) -> &[ProjectSection];
    fn design_fee(&self) -> &[LineItem];
    fn tax_rate(&self) -> Decimal;
    fn taxable_categories(&self) -> &[LineItemCategory];

    fn standalone_items(&self) -> &[SimpleLineItem] {
        &[]
    }
}

impl Priceable for Estimate {
    fn project_sections(&self) -> &[ProjectSection] {
        &self.project_sections
    }
    fn design_fee(&self) -> &[LineItem] {
        &self.design_fee
    }
    fn tax_rate(&self) -> Decimal {
        self.tax_rate
    }
    fn taxable_categories(&self) -> &[LineItemCategory] {
        &self.taxable_categories
    }
}

impl Priceable for Contract {
    fn project_sections(&self) -> &[ProjectSection] {
        &self.project_sections
    }
    fn design_fee(&self) -> &[LineItem] {
        &self.design_fee
    }
    fn tax_rate(&self) -> Decimal {
        self.tax_rate
    }
    fn taxable_categories(&self) -> &[LineItemCategory] {
        &self.taxable_categories
    }
}

impl Priceable for Invoice {
    fn project_sections(&self) -> &[ProjectSection] {
        &self.project_sections
    }
    fn design_fee(&self) -> &[LineItem] {
        &self.design_fee
    }
    fn tax_rate(&self) -> Decimal {
        self.tax_rate
    }
    fn taxable_categories(&self) -> &[LineItemCategory] {
        &self.taxable_categories
    }
    fn standalone_items(&self) -> &[SimpleLineItem] {
        &self.standalone_items
    }
}

const HUNDRED: Decimal = Decimal::ONE_HUNDRED;

/// Round half away from zero at the cent.
pub fn round2(value: Decimal) -> Decimal {
    value.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero)
}

fn exact_line_total(item: &LineItem) -> Decimal {
    if item.no_price {
        Decimal::ZERO
    } else {
        item.quantity.saturating_mul(item.unit_price)
    }
}

fn exact_sum<'a>(items: impl IntoIterator<Item = &'a LineItem>) -> Decimal {
    items
        .into_iter()
        .map(exact_line_total)
        .fold(Decimal::ZERO, Decimal::saturating_add)
}

fn exact_section_subtotal(section: &ProjectSection) -> Decimal {
    exact_sum(section.items())
}

fn exact_subtotal<D: Priceable + ?Sized>(doc: &D) -> Decimal {
    doc.project_sections()
        .iter()
        .map(exact_section_subtotal)
        .fold(exact_sum(doc.design_fee()), Decimal::saturating_add)
}

fn exact_taxable_total<D: Priceable + ?Sized>(doc: &D) -> Decimal {
    let taxable = doc.taxable_categories();
    exact_sum(
        doc.project_sections()
            .iter()
            .flat_map(ProjectSection::items)
            .filter(|item| taxable.contains(&item.category)),
    )
}

pub fn line_total(item: &LineItem) -> Decimal {
    round2(exact_line_total(item))
}

pub fn section_list_subtotal(items: &[LineItem]) -> Decimal {
    round2(exact_sum(items))
}

pub fn section_subtotal(section: &ProjectSection) -> Decimal {
    round2(exact_section_subtotal(section))
}

pub fn category_total<D: Priceable + ?Sized>(doc: &D, key: ListKey) -> Decimal {
    round2(exact_sum(
        doc.project_sections()
            .iter()
            .flat_map(|section| section.list(key).iter()),
    ))
}

pub fn design_fee_total<D: Priceable + ?Sized>(doc: &D) -> Decimal {
    round2(exact_sum(doc.design_fee()))
}

/// Section items whose category is taxable. The design fee never is.
pub fn taxable_total<D: Priceable + ?Sized>(doc: &D) -> Decimal {
    round2(exact_taxable_total(doc))
}

pub fn non_taxable_total<D: Priceable + ?Sized>(doc: &D) -> Decimal {
    round2(exact_subtotal(doc).saturating_sub(exact_taxable_total(doc)))
}

pub fn tax<D: Priceable + ?Sized>(doc: &D) -> Decimal {
    round2(exact_taxable_total(doc).saturating_mul(doc.tax_rate()) / HUNDRED)
}

pub fn subtotal<D: Priceable + ?Sized>(doc: &D) -> Decimal {
    round2(exact_subtotal(doc))
}

pub fn standalone_total(items: &[SimpleLineItem]) -> Decimal {
    round2(
        items
            .iter()
            .map(|item| item.amount)
            .fold(Decimal::ZERO, Decimal::saturating_add),
    )
}

/// Standalone invoices are a plain sum with no tax step.
pub fn grand_total<D: Priceable + ?Sized>(doc: &D) -> Decimal {
    let standalone = doc.standalone_items();
    if !standalone.is_empty() {
        return standalone_total(standalone);
    }
    round2(exact_subtotal(doc).saturating_add(tax(doc)))
}

pub fn amount_paid(invoice: &Invoice) -> Decimal {
    invoice
        .payments
        .iter()
        .map(|p| p.amount)
        .fold(Decimal::ZERO, Decimal::saturating_add)
}

/// Signed; negative when overpaid.
pub fn balance_remaining(invoice: &Invoice) -> Decimal {
    grand_total(invoice).saturating_sub(amount_paid(invoice))
}

/// Remaining balance as shown to a client, never below zero.
pub fn displayed_remaining(invoice: &Invoice) -> Decimal {
    balance_remaining(invoice).max(Decimal::ZERO)
}

pub fn invoice_status(invoice: &Invoice) -> InvoiceStatus {
    let paid = amount_paid(invoice);
    if paid >= grand_total(invoice) {
        InvoiceStatus::Paid
    } else if paid > Decimal::ZERO {
        InvoiceStatus::Partial
    } else {
        InvoiceStatus::Unpaid
    }
}

/// Milestones with `amount` filled in from their percentage of the grand total.
pub fn payment_milestone_amounts<D: Priceable + ?Sized>(
    doc: &D,
    schedule: &PaymentSchedule,
) -> Vec<PaymentMilestone> {
    let total = grand_total(doc);
    schedule
        .milestones
        .iter()
        .map(|m| PaymentMilestone {
            description: m.description.clone(),
            percentage: m.percentage,
            amount: round2(total.saturating_mul(m.percentage) / HUNDRED),
        })
        .collect()
}

/// Summary block the renderers print under every priced document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DocumentTotals {
    pub plant_material: Decimal,
    pub labor_and_services: Decimal,
    pub other_materials: Decimal,
    pub design_fee: Decimal,
    pub taxable: Decimal,
    pub tax: Decimal,
    pub subtotal: Decimal,
    pub grand_total: Decimal,
}

pub fn totals<D: Priceable + ?Sized>(doc: &D) -> DocumentTotals {
    DocumentTotals {
        plant_material: category_total(doc, ListKey::PlantMaterial),
        labor_and_services: category_total(doc, ListKey::LaborAndServices),
        other_materials: category_total(doc, ListKey::OtherMaterials),
        design_fee: design_fee_total(doc),
        taxable: taxable_total(doc),
        tax: tax(doc),
        subtotal: subtotal(doc),
        grand_total: grand_total(doc),
    }
}

/// `$1,234.50`, `-$12.00`.
pub fn format_currency(amount: Decimal) -> String {
    let rounded = round2(amount);
    let digits = format!("{:.2}", rounded.abs());
    let (whole, cents) = digits.split_once('.').unwrap_or((digits.as_str(), "00"));

    let mut grouped = String::with_capacity(whole.len() + whole.len() / 3);
    for (i, ch) in whole.chars().enumerate() {
        if i > 0 && (whole.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(ch);
    }

    let sign = if rounded.is_sign_negative() && !rounded.is_zero() {
        "-"
    } else {
        ""
    };
    format!("{sign}${grouped}.{cents}")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::{create_blank_estimate, derive_invoice, new_line_item};
    use crate::model::{Payment, PaymentMethod};
    use chrono::NaiveDate;

    fn d(s: &str) -> Decimal {
        s.parse().expect("decimal literal")
    }

    fn item(category: LineItemCategory, qty: &str, price: &str) -> LineItem {
        LineItem {
            quantity: d(qty),
            unit_price: d(price),
            ..new_line_item(category)
        }
    }

    /// One section with a taxable plant row and an untaxed labor row, 10% tax.
    fn scenario_one() -> Estimate {
        let mut est = create_blank_estimate("NL-2026-001", None);
        est.tax_rate = d("10");
        est.project_sections[0]
            .plant_material
            .push(item(LineItemCategory::Planting, "2", "25.00"));
        est.project_sections[0]
            .labor_and_services
            .push(item(LineItemCategory::Labor, "1", "100.00"));
        est
    }

    fn payment(amount: &str) -> Payment {
        Payment {
            id: crate::model::new_id(),
            date: NaiveDate::from_ymd_opt(2026, 3, 1).expect("date"),
            amount: d(amount),
            method: PaymentMethod::Check,
            note: String::new(),
        }
    }

    #[test]
    fn scenario_taxable_base_excludes_labor() {
        let est = scenario_one();
        assert_eq!(taxable_total(&est), d("50.00"));
        assert_eq!(tax(&est), d("5.00"));
        assert_eq!(subtotal(&est), d("150.00"));
        assert_eq!(grand_total(&est), d("155.00"));
    }

    #[test]
    fn scenario_design_fee_is_never_taxed() {
        let mut est = scenario_one();
        // Even a design fee row filed under a taxable category stays untaxed.
        est.design_fee.push(item(LineItemCategory::Planting, "1", "500.00"));
        assert_eq!(subtotal(&est), d("650.00"));
        assert_eq!(taxable_total(&est), d("50.00"));
        assert_eq!(design_fee_total(&est), d("500.00"));
        assert_eq!(grand_total(&est), d("655.00"));
        assert_eq!(non_taxable_total(&est), d("600.00"));
    }

    #[test]
    fn scenario_payments_drive_balance_and_status() {
        let est = scenario_one();
        let date = NaiveDate::from_ymd_opt(2026, 3, 1).expect("date");
        let mut inv = derive_invoice(&est, "NL-INV-2026-001", date, "");
        inv.payments.push(payment("60.00"));
        assert_eq!(amount_paid(&inv), d("60.00"));
        assert_eq!(balance_remaining(&inv), d("95.00"));
        assert_eq!(invoice_status(&inv), InvoiceStatus::Partial);

        inv.payments.push(payment("95.00"));
        assert_eq!(amount_paid(&inv), d("155.00"));
        assert_eq!(balance_remaining(&inv), d("0.00"));
        assert_eq!(invoice_status(&inv), InvoiceStatus::Paid);
    }

    #[test]
    fn overpayment_is_signed_but_display_clamps() {
        let est = scenario_one();
        let date = NaiveDate::from_ymd_opt(2026, 3, 1).expect("date");
        let mut inv = derive_invoice(&est, "NL-INV-2026-002", date, "");
        inv.payments.push(payment("200.00"));
        assert_eq!(balance_remaining(&inv), d("-45.00"));
        assert_eq!(displayed_remaining(&inv), Decimal::ZERO);
        assert_eq!(amount_paid(&inv) + balance_remaining(&inv), grand_total(&inv));
    }

    #[test]
    fn differences_saturate_at_decimal_bounds() {
        let mut est = create_blank_estimate("NL-2026-009", None);
        est.project_sections[0]
            .plant_material
            .push(item(LineItemCategory::Planting, "1", &Decimal::MAX.to_string()));
        for _ in 0..2 {
            est.project_sections[0]
                .labor_and_services
                .push(item(LineItemCategory::Labor, "1", &Decimal::MIN.to_string()));
        }
        assert_eq!(non_taxable_total(&est), Decimal::MIN);

        let date = NaiveDate::from_ymd_opt(2026, 3, 1).expect("date");
        let mut inv = derive_invoice(&est, "NL-INV-2026-009", date, "");
        inv.standalone_items = vec![SimpleLineItem {
            id: "neg".into(),
            description: "Credit".into(),
            amount: Decimal::MIN,
            sub_items: vec![],
        }];
        let mut paid = payment("1.00");
        paid.amount = Decimal::MAX;
        inv.payments.push(paid);
        assert_eq!(balance_remaining(&inv), Decimal::MIN);
    }

    #[test]
    fn scenario_standalone_invoice_skips_tax() {
        let est = scenario_one();
        let date = NaiveDate::from_ymd_opt(2026, 3, 1).expect("date");
        let mut inv = derive_invoice(&est, "NL-INV-2026-003", date, "");
        inv.tax_rate = d("50");
        inv.standalone_items = vec![
            SimpleLineItem {
                id: "a".into(),
                description: "Consult".into(),
                amount: d("150"),
                sub_items: vec![],
            },
            SimpleLineItem {
                id: "b".into(),
                description: "Travel".into(),
                amount: d("40"),
                sub_items: vec![],
            },
        ];
        assert_eq!(grand_total(&inv), d("190.00"));
    }

    #[test]
    fn no_price_rows_contribute_nothing() {
        let mut est = scenario_one();
        let mut note = item(LineItemCategory::Planting, "40", "99.99");
        note.no_price = true;
        est.project_sections[0].plant_material.push(note.clone());
        est.design_fee.push(note.clone());
        assert_eq!(line_total(&note), Decimal::ZERO);
        assert_eq!(taxable_total(&est), d("50.00"));
        assert_eq!(subtotal(&est), d("150.00"));
        assert_eq!(category_total(&est, ListKey::PlantMaterial), d("50.00"));
        assert_eq!(grand_total(&est), d("155.00"));
    }

    #[test]
    fn aggregates_round_once_not_per_line() {
        let mut est = create_blank_estimate("NL-2026-009", None);
        est.tax_rate = Decimal::ZERO;
        // 0.333 × 1.5 = 0.4995 per row.
        for _ in 0..3 {
            est.project_sections[0]
                .plant_material
                .push(item(LineItemCategory::Planting, "0.333", "1.5"));
        }
        assert_eq!(line_total(&est.project_sections[0].plant_material[0]), d("0.50"));
        assert_eq!(section_list_subtotal(&est.project_sections[0].plant_material), d("1.50"));
        assert_eq!(grand_total(&est), d("1.50"));

        let mut drift = create_blank_estimate("NL-2026-010", None);
        drift.tax_rate = Decimal::ZERO;
        for _ in 0..10 {
            drift.project_sections[0]
                .other_materials
                .push(item(LineItemCategory::Other, "1", "0.004"));
        }
        // Per-row rounding would give 10 × 0.00 = 0.00.
        assert_eq!(subtotal(&drift), d("0.04"));
        assert_eq!(grand_total(&drift), d("0.04"));
    }

    #[test]
    fn rounding_is_half_up_at_the_cent() {
        assert_eq!(round2(d("2.345")), d("2.35"));
        assert_eq!(round2(d("2.355")), d("2.36"));
        assert_eq!(round2(d("-2.345")), d("-2.35"));
        assert_eq!(round2(d("2.344")), d("2.34"));
    }

    #[test]
    fn taxable_base_ignores_section_placement() {
        let mut est = scenario_one();
        est.project_sections
            .push(crate::document::new_section("Front of House"));
        // A Planting row filed under labor is still taxable.
        est.project_sections[1]
            .labor_and_services
            .push(item(LineItemCategory::Planting, "3", "10"));
        let before = taxable_total(&est);
        let moved = est.project_sections[1].labor_and_services.remove(0);
        est.project_sections[0].other_materials.push(moved);
        assert_eq!(taxable_total(&est), before);
        assert_eq!(before, d("80.00"));
    }

    #[test]
    fn additivity_and_idempotence_hold() {
        let mut est = scenario_one();
        est.tax_rate = d("9.5");
        est.project_sections[0]
            .other_materials
            .push(item(LineItemCategory::Other, "3", "17.33"));
        let first = grand_total(&est);
        assert_eq!(first, grand_total(&est));
        let diff = (subtotal(&est) + tax(&est) - first).abs();
        assert!(diff <= d("0.01"), "diff was {diff}");
    }

    #[test]
    fn negative_rows_are_credits() {
        let mut est = scenario_one();
        est.project_sections[0]
            .labor_and_services
            .push(item(LineItemCategory::Labor, "1", "-20"));
        assert_eq!(subtotal(&est), d("130.00"));
        assert_eq!(grand_total(&est), d("135.00"));
    }

    #[test]
    fn empty_documents_total_zero() {
        let est = create_blank_estimate("NL-2026-011", None);
        let t = totals(&est);
        assert_eq!(t.grand_total, Decimal::ZERO);
        assert_eq!(section_list_subtotal(&[]), Decimal::ZERO);
    }

    #[test]
    fn milestone_amounts_follow_grand_total() {
        let est = scenario_one();
        let schedule = PaymentSchedule {
            template: crate::model::PaymentTemplate::FiftyFifty,
            milestones: vec![
                PaymentMilestone {
                    description: "Deposit".into(),
                    percentage: d("50"),
                    amount: Decimal::ZERO,
                },
                PaymentMilestone {
                    description: "Completion".into(),
                    percentage: d("50"),
                    amount: Decimal::ZERO,
                },
            ],
        };
        let filled = payment_milestone_amounts(&est, &schedule);
        assert_eq!(filled[0].amount, d("77.50"));
        assert_eq!(filled[1].amount, d("77.50"));
    }

    #[test]
    fn currency_formatting_groups_thousands() {
        assert_eq!(format_currency(d("1234.5")), "$1,234.50");
        assert_eq!(format_currency(d("0")), "$0.00");
        assert_eq!(format_currency(d("-12")), "-$12.00");
        assert_eq!(format_currency(d("1000000")), "$1,000,000.00");
        assert_eq!(format_currency(d("999.995")), "$1,000.00");
    }
}
