//! Document construction and derivation.
//!
//! Contracts and invoices are snapshots: the pricing structure is copied
//! into owned values at derivation time, so later edits on either side are
//! never observable on the other.

use chrono::{NaiveDate, Utc};
use rust_decimal::Decimal;

use crate::model::{
    default_taxable_categories, new_id, CatalogItem, ClientInfo, Contract, Estimate,
    EstimateStatus, Invoice, InvoiceStatus, LineItem, LineItemCategory, ListKey,
    PaymentChecklistItem, PaymentMilestone, PaymentSchedule, PaymentTemplate, ProjectSection,
    Settings, SimpleLineItem, DEFAULT_UNIT,
};

pub const DEFAULT_VALID_DAYS: u32 = 30;
pub const DEFAULT_CLIENT_STATE: &str = "CA";
pub const MAIN_SECTION_NAME: &str = "Main";

/// 9.5%, the Los Angeles sales tax rate the tool ships with.
pub fn default_tax_rate() -> Decimal {
    Decimal::new(95, 1)
}

pub const CONTRACT_TERMS: &str = "Thank you for choosing Nancy Lyons Garden Design! Here's how we'll work together:

Scheduling & Timeline
Once this estimate is accepted and the deposit is received, we'll schedule your project based on current availability. We'll do our best to stay on timeline, though weather, material availability, and site conditions can sometimes cause adjustments. We'll keep you informed every step of the way.

Changes & Additions
We know that projects can evolve! If you'd like to make changes or additions once work has begun, we'll provide an updated estimate for your approval before proceeding with any additional work.

What's Included
This estimate covers the materials, plants, and labor described in the referenced estimate. It's based on the current conditions of your property as observed during our site visit.

If we encounter unexpected conditions during the project (like buried concrete or rock), we'll discuss options with you before proceeding.";

pub const CONTRACT_WARRANTY: &str = "We stand behind our work! All plant material is covered by a 30-day warranty from the date of installation, as long as the irrigation system is properly maintained and the recommended watering schedule is followed.

If a plant doesn't make it within that 30-day window and the irrigation has been kept up, we'll replace it. You just cover the cost of the new plant material.

Hardscape work is warranted for one year against defects in workmanship. This doesn't cover settling due to natural causes, damage from tree roots, or modifications made by others.";

pub const CONTRACT_EXCLUSIONS: &str = "A few things that aren't included in this project:
- Utility locates and any underground surprises
- Permit fees (if required)
- Hauling soil beyond what's specified
- Ongoing maintenance after installation
- Pest or disease treatment after planting";

pub const CONTRACT_CHANGE_ORDERS: &str = "Gardens evolve! If you'd like to add or change anything during the project, we'll talk it through and provide a written change order with updated pricing before any additional work begins.";

pub const PAYMENT_METHODS_NOTE: &str =
    "We accept checks, Venmo, and Zelle. Credit card payments are subject to a 3% processing fee.";

pub fn default_payment_checklist() -> Vec<PaymentChecklistItem> {
    [
        ("plant-material", "All plant material costs due at time of ordering"),
        ("design-deposit", "50% of design fee due as deposit upon acceptance"),
        (
            "hardscape-irrigation",
            "Hardscape and irrigation materials due at time of ordering",
        ),
        ("remaining-balance", "Remaining balance due upon project completion"),
    ]
    .into_iter()
    .map(|(id, label)| PaymentChecklistItem {
        id: id.to_string(),
        label: label.to_string(),
        checked: true,
    })
    .collect()
}

pub fn default_payment_schedule() -> PaymentSchedule {
    let milestone = |description: &str| PaymentMilestone {
        description: description.to_string(),
        percentage: Decimal::ZERO,
        amount: Decimal::ZERO,
    };
    PaymentSchedule {
        template: PaymentTemplate::Custom,
        milestones: vec![
            milestone("Plant material due at time of ordering"),
            milestone("50% of design fee as deposit upon acceptance"),
            milestone("Remaining balance due upon project completion"),
        ],
    }
}

pub fn new_line_item(category: LineItemCategory) -> LineItem {
    LineItem {
        id: new_id(),
        category,
        description: String::new(),
        quantity: Decimal::ONE,
        unit: DEFAULT_UNIT.to_string(),
        unit_price: Decimal::ZERO,
        no_price: false,
        sub_items: Vec::new(),
    }
}

/// Design fee rows are labor billed as a lot.
pub fn new_design_fee_item(description: &str, price: Decimal) -> LineItem {
    LineItem {
        description: description.to_string(),
        unit: "lot".to_string(),
        unit_price: price,
        ..new_line_item(LineItemCategory::Labor)
    }
}

pub fn new_section(name: &str) -> ProjectSection {
    ProjectSection {
        id: new_id(),
        name: name.to_string(),
        plant_material: Vec::new(),
        labor_and_services: Vec::new(),
        other_materials: Vec::new(),
    }
}

/// Optional seeds for a new estimate; unset fields fall back to constants.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct EstimateDefaults {
    pub tax_rate: Option<Decimal>,
    pub valid_days: Option<u32>,
    pub terms: Option<String>,
    pub warranty: Option<String>,
    pub exclusions: Option<String>,
}

impl EstimateDefaults {
    pub fn from_settings(settings: &Settings) -> Self {
        Self {
            tax_rate: Some(settings.defaults.tax_rate),
            valid_days: Some(settings.defaults.valid_days),
            terms: Some(settings.defaults.terms.clone()),
            warranty: Some(settings.defaults.warranty.clone()),
            exclusions: Some(settings.defaults.exclusions.clone()),
        }
    }
}

pub fn create_blank_estimate(number: &str, defaults: Option<&EstimateDefaults>) -> Estimate {
    let fallback = EstimateDefaults::default();
    let defaults = defaults.unwrap_or(&fallback);
    let now = Utc::now();
    Estimate {
        id: new_id(),
        estimate_number: number.to_string(),
        status: EstimateStatus::Draft,
        created_at: now,
        updated_at: now,
        valid_days: defaults.valid_days.unwrap_or(DEFAULT_VALID_DAYS),
        client: ClientInfo {
            state: DEFAULT_CLIENT_STATE.to_string(),
            ..ClientInfo::default()
        },
        project_description: String::new(),
        estimated_start_date: String::new(),
        estimated_duration: String::new(),
        project_sections: vec![new_section(MAIN_SECTION_NAME)],
        design_fee: Vec::new(),
        tax_rate: defaults.tax_rate.unwrap_or_else(default_tax_rate),
        taxable_categories: default_taxable_categories(),
        payment_schedule: default_payment_schedule(),
        terms: defaults.terms.clone().unwrap_or_default(),
        warranty: defaults.warranty.clone().unwrap_or_default(),
        exclusions: defaults.exclusions.clone().unwrap_or_default(),
        notes: String::new(),
    }
}

/// Fully owned copy of a section tree. Every nested row is a new value.
pub fn snapshot_sections(sections: &[ProjectSection]) -> Vec<ProjectSection> {
    sections
        .iter()
        .map(|section| ProjectSection {
            id: section.id.clone(),
            name: section.name.clone(),
            plant_material: snapshot_items(&section.plant_material),
            labor_and_services: snapshot_items(&section.labor_and_services),
            other_materials: snapshot_items(&section.other_materials),
        })
        .collect()
}

pub fn snapshot_items(items: &[LineItem]) -> Vec<LineItem> {
    items.iter().map(LineItem::clone).collect()
}

/// Editable contract text, pre-seeded with the standard boilerplate.
#[derive(Debug, Clone, PartialEq)]
pub struct ContractOptions {
    pub payment_checklist: Vec<PaymentChecklistItem>,
    pub payment_methods_note: String,
    pub terms: String,
    pub warranty: String,
    pub exclusions: String,
    pub change_orders: String,
}

impl Default for ContractOptions {
    fn default() -> Self {
        Self {
            payment_checklist: default_payment_checklist(),
            payment_methods_note: PAYMENT_METHODS_NOTE.to_string(),
            terms: CONTRACT_TERMS.to_string(),
            warranty: CONTRACT_WARRANTY.to_string(),
            exclusions: CONTRACT_EXCLUSIONS.to_string(),
            change_orders: CONTRACT_CHANGE_ORDERS.to_string(),
        }
    }
}

pub fn derive_contract(estimate: &Estimate, contract_number: &str, options: &ContractOptions) -> Contract {
    let now = Utc::now();
    let milestones = options
        .payment_checklist
        .iter()
        .filter(|item| item.checked)
        .map(|item| PaymentMilestone {
            description: item.label.clone(),
            percentage: Decimal::ZERO,
            amount: Decimal::ZERO,
        })
        .collect();

    Contract {
        id: new_id(),
        estimate_id: estimate.id.clone(),
        contract_number: contract_number.to_string(),
        created_at: now,
        updated_at: now,
        client: estimate.client.clone(),
        project_description: estimate.project_description.clone(),
        project_sections: snapshot_sections(&estimate.project_sections),
        design_fee: snapshot_items(&estimate.design_fee),
        tax_rate: estimate.tax_rate,
        taxable_categories: estimate.taxable_categories.clone(),
        payment_schedule: PaymentSchedule {
            template: PaymentTemplate::Custom,
            milestones,
        },
        payment_checklist: options.payment_checklist.clone(),
        payment_methods_note: options.payment_methods_note.clone(),
        terms: options.terms.clone(),
        warranty: options.warranty.clone(),
        exclusions: options.exclusions.clone(),
        change_orders: options.change_orders.clone(),
        accepted_date: None,
        client_signature: String::new(),
        contractor_signature: String::new(),
    }
}

pub fn derive_invoice(
    estimate: &Estimate,
    invoice_number: &str,
    invoice_date: NaiveDate,
    payment_instructions: &str,
) -> Invoice {
    let now = Utc::now();
    Invoice {
        id: new_id(),
        estimate_id: Some(estimate.id.clone()),
        invoice_number: invoice_number.to_string(),
        status: InvoiceStatus::Unpaid,
        created_at: now,
        updated_at: now,
        client: estimate.client.clone(),
        project_description: estimate.project_description.clone(),
        project_sections: snapshot_sections(&estimate.project_sections),
        design_fee: snapshot_items(&estimate.design_fee),
        tax_rate: estimate.tax_rate,
        taxable_categories: estimate.taxable_categories.clone(),
        invoice_date,
        payments: Vec::new(),
        payment_instructions: payment_instructions.to_string(),
        notes: String::new(),
        standalone_items: Vec::new(),
    }
}

/// Rows with a blank description or a non-positive amount are dropped.
pub fn new_standalone_invoice(
    invoice_number: &str,
    client: ClientInfo,
    project_description: &str,
    items: Vec<SimpleLineItem>,
    invoice_date: NaiveDate,
    payment_instructions: &str,
) -> Invoice {
    let now = Utc::now();
    let standalone_items = items
        .into_iter()
        .filter(|item| !item.description.trim().is_empty() && item.amount > Decimal::ZERO)
        .collect();
    Invoice {
        id: new_id(),
        estimate_id: None,
        invoice_number: invoice_number.to_string(),
        status: InvoiceStatus::Unpaid,
        created_at: now,
        updated_at: now,
        client,
        project_description: project_description.to_string(),
        project_sections: Vec::new(),
        design_fee: Vec::new(),
        tax_rate: Decimal::ZERO,
        taxable_categories: Vec::new(),
        invoice_date,
        payments: Vec::new(),
        payment_instructions: payment_instructions.to_string(),
        notes: String::new(),
        standalone_items,
    }
}

/// New revision of an estimate: same content, new identity, back to draft.
pub fn duplicate_estimate(estimate: &Estimate, number: &str) -> Estimate {
    let now = Utc::now();
    Estimate {
        id: new_id(),
        estimate_number: number.to_string(),
        status: EstimateStatus::Draft,
        created_at: now,
        updated_at: now,
        project_sections: snapshot_sections(&estimate.project_sections),
        design_fee: snapshot_items(&estimate.design_fee),
        ..estimate.clone()
    }
}

/// Copies catalog values into the row. No link back to the catalog is kept.
pub fn apply_catalog_item(item: &mut LineItem, entry: &CatalogItem) {
    item.category = entry.category;
    item.description = entry.name.clone();
    item.unit = entry.default_unit.clone();
    item.unit_price = entry.default_unit_price;
}

impl Estimate {
    pub fn section(&self, section_id: &str) -> Option<&ProjectSection> {
        self.project_sections.iter().find(|s| s.id == section_id)
    }

    pub fn section_mut(&mut self, section_id: &str) -> Option<&mut ProjectSection> {
        self.project_sections.iter_mut().find(|s| s.id == section_id)
    }

    /// Returns the new section's id.
    pub fn add_section(&mut self, name: &str) -> String {
        let section = new_section(name);
        let id = section.id.clone();
        self.project_sections.push(section);
        id
    }

    pub fn remove_section(&mut self, section_id: &str) -> bool {
        let before = self.project_sections.len();
        self.project_sections.retain(|s| s.id != section_id);
        self.project_sections.len() != before
    }

    pub fn rename_section(&mut self, section_id: &str, name: &str) -> bool {
        match self.section_mut(section_id) {
            Some(section) => {
                section.name = name.to_string();
                true
            }
            None => false,
        }
    }

    /// Appends a fresh row with the list's default category; returns its id.
    pub fn add_line_item(&mut self, section_id: &str, key: ListKey) -> Option<String> {
        let section = self.section_mut(section_id)?;
        let item = new_line_item(key.default_category());
        let id = item.id.clone();
        section.list_mut(key).push(item);
        Some(id)
    }

    pub fn update_line_item(
        &mut self,
        section_id: &str,
        key: ListKey,
        item_id: &str,
        update: impl FnOnce(&mut LineItem),
    ) -> bool {
        let Some(section) = self.section_mut(section_id) else {
            return false;
        };
        match section.list_mut(key).iter_mut().find(|i| i.id == item_id) {
            Some(item) => {
                update(item);
                true
            }
            None => false,
        }
    }

    pub fn remove_line_item(&mut self, section_id: &str, key: ListKey, item_id: &str) -> bool {
        let Some(section) = self.section_mut(section_id) else {
            return false;
        };
        let list = section.list_mut(key);
        let before = list.len();
        list.retain(|i| i.id != item_id);
        list.len() != before
    }

    /// Moves a row to the end of the same list in another section.
    pub fn move_line_item(&mut self, from_section: &str, to_section: &str, key: ListKey, item_id: &str) -> bool {
        if self.section(to_section).is_none() {
            return false;
        }
        let Some(source) = self.section_mut(from_section) else {
            return false;
        };
        let list = source.list_mut(key);
        let Some(pos) = list.iter().position(|i| i.id == item_id) else {
            return false;
        };
        let item = list.remove(pos);
        if let Some(target) = self.section_mut(to_section) {
            target.list_mut(key).push(item);
        }
        true
    }

    pub fn add_design_fee_item(&mut self, description: &str, price: Decimal) -> String {
        let item = new_design_fee_item(description, price);
        let id = item.id.clone();
        self.design_fee.push(item);
        id
    }

    pub fn remove_design_fee_item(&mut self, item_id: &str) -> bool {
        let before = self.design_fee.len();
        self.design_fee.retain(|i| i.id != item_id);
        self.design_fee.len() != before
    }
}
