//! Record shapes persisted by the store and shared with the pricing model.

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Fresh opaque identifier for any record or nested row.
pub fn new_id() -> String {
    Uuid::new_v4().to_string()
}

fn is_false(value: &bool) -> bool {
    !*value
}

fn default_true() -> bool {
    true
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum LineItemCategory {
    Planting,
    Hardscape,
    Irrigation,
    Lighting,
    Labor,
    Equipment,
    Other,
}

impl LineItemCategory {
    pub const ALL: [LineItemCategory; 7] = [
        LineItemCategory::Planting,
        LineItemCategory::Hardscape,
        LineItemCategory::Irrigation,
        LineItemCategory::Lighting,
        LineItemCategory::Labor,
        LineItemCategory::Equipment,
        LineItemCategory::Other,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            LineItemCategory::Planting => "Planting",
            LineItemCategory::Hardscape => "Hardscape",
            LineItemCategory::Irrigation => "Irrigation",
            LineItemCategory::Lighting => "Lighting",
            LineItemCategory::Labor => "Labor",
            LineItemCategory::Equipment => "Equipment",
            LineItemCategory::Other => "Other",
        }
    }

    /// Case-insensitive lookup used when reading loosely-typed payloads.
    pub fn parse(input: &str) -> Option<Self> {
        let needle = input.trim();
        Self::ALL
            .into_iter()
            .find(|c| c.as_str().eq_ignore_ascii_case(needle))
    }
}

/// Materials are taxed, labor and fees are not.
pub fn default_taxable_categories() -> Vec<LineItemCategory> {
    vec![LineItemCategory::Planting, LineItemCategory::Other]
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UnitOption {
    pub value: &'static str,
    pub label: &'static str,
}

pub const UNIT_OPTIONS: [UnitOption; 11] = [
    UnitOption { value: "ea", label: "each" },
    UnitOption { value: "sqft", label: "sq ft" },
    UnitOption { value: "lnft", label: "lin ft" },
    UnitOption { value: "cuyd", label: "cu yd" },
    UnitOption { value: "hr", label: "hour" },
    UnitOption { value: "lot", label: "lot" },
    UnitOption { value: "flat", label: "flat" },
    UnitOption { value: "bag", label: "bag" },
    UnitOption { value: "ton", label: "ton" },
    UnitOption { value: "roll", label: "roll" },
    UnitOption { value: "box", label: "box" },
];

pub const DEFAULT_UNIT: &str = "ea";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EstimateStatus {
    #[default]
    Draft,
    Sent,
    Accepted,
    Declined,
}

impl EstimateStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            EstimateStatus::Draft => "draft",
            EstimateStatus::Sent => "sent",
            EstimateStatus::Accepted => "accepted",
            EstimateStatus::Declined => "declined",
        }
    }

    pub fn parse(input: &str) -> Option<Self> {
        match input.trim().to_ascii_lowercase().as_str() {
            "draft" => Some(Self::Draft),
            "sent" => Some(Self::Sent),
            "accepted" => Some(Self::Accepted),
            "declined" => Some(Self::Declined),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum PaymentTemplate {
    #[serde(rename = "50-50")]
    FiftyFifty,
    #[serde(rename = "thirds")]
    Thirds,
    #[default]
    #[serde(rename = "custom")]
    Custom,
}

/// One priced row. `quantity × unit_price` is derived, never stored.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LineItem {
    pub id: String,
    pub category: LineItemCategory,
    #[serde(default)]
    pub description: String,
    pub quantity: Decimal,
    #[serde(default)]
    pub unit: String,
    pub unit_price: Decimal,
    #[serde(default, skip_serializing_if = "is_false")]
    pub no_price: bool,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub sub_items: Vec<String>,
}

/// Which of a section's three lists an item lives in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ListKey {
    PlantMaterial,
    LaborAndServices,
    OtherMaterials,
}

impl ListKey {
    pub const ALL: [ListKey; 3] = [
        ListKey::PlantMaterial,
        ListKey::LaborAndServices,
        ListKey::OtherMaterials,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ListKey::PlantMaterial => "plantMaterial",
            ListKey::LaborAndServices => "laborAndServices",
            ListKey::OtherMaterials => "otherMaterials",
        }
    }

    /// Category given to a fresh row added to this list.
    pub fn default_category(&self) -> LineItemCategory {
        match self {
            ListKey::PlantMaterial => LineItemCategory::Planting,
            ListKey::LaborAndServices => LineItemCategory::Labor,
            ListKey::OtherMaterials => LineItemCategory::Other,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProjectSection {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub plant_material: Vec<LineItem>,
    #[serde(default)]
    pub labor_and_services: Vec<LineItem>,
    #[serde(default)]
    pub other_materials: Vec<LineItem>,
}

impl ProjectSection {
    pub fn list(&self, key: ListKey) -> &[LineItem] {
        match key {
            ListKey::PlantMaterial => &self.plant_material,
            ListKey::LaborAndServices => &self.labor_and_services,
            ListKey::OtherMaterials => &self.other_materials,
        }
    }

    pub fn list_mut(&mut self, key: ListKey) -> &mut Vec<LineItem> {
        match key {
            ListKey::PlantMaterial => &mut self.plant_material,
            ListKey::LaborAndServices => &mut self.labor_and_services,
            ListKey::OtherMaterials => &mut self.other_materials,
        }
    }

    /// All rows in display order: plants, labor, other materials.
    pub fn items(&self) -> impl Iterator<Item = &LineItem> {
        self.plant_material
            .iter()
            .chain(self.labor_and_services.iter())
            .chain(self.other_materials.iter())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentMilestone {
    pub description: String,
    #[serde(default)]
    pub percentage: Decimal,
    #[serde(default)]
    pub amount: Decimal,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentSchedule {
    #[serde(default)]
    pub template: PaymentTemplate,
    #[serde(default)]
    pub milestones: Vec<PaymentMilestone>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ClientInfo {
    pub name: String,
    pub address: String,
    pub city: String,
    pub state: String,
    pub zip: String,
    pub phone: String,
    pub email: String,
    pub project_address: String,
    #[serde(default = "default_true")]
    pub project_address_same_as_client: bool,
}

impl Default for ClientInfo {
    fn default() -> Self {
        Self {
            name: String::new(),
            address: String::new(),
            city: String::new(),
            state: String::new(),
            zip: String::new(),
            phone: String::new(),
            email: String::new(),
            project_address: String::new(),
            project_address_same_as_client: true,
        }
    }
}

/// The root priced proposal.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Estimate {
    pub id: String,
    pub estimate_number: String,
    #[serde(default)]
    pub status: EstimateStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub valid_days: u32,
    #[serde(default)]
    pub client: ClientInfo,
    #[serde(default)]
    pub project_description: String,
    #[serde(default)]
    pub estimated_start_date: String,
    #[serde(default)]
    pub estimated_duration: String,
    #[serde(default)]
    pub project_sections: Vec<ProjectSection>,
    #[serde(default)]
    pub design_fee: Vec<LineItem>,
    pub tax_rate: Decimal,
    #[serde(default = "default_taxable_categories")]
    pub taxable_categories: Vec<LineItemCategory>,
    #[serde(default)]
    pub payment_schedule: PaymentSchedule,
    #[serde(default)]
    pub terms: String,
    #[serde(default)]
    pub warranty: String,
    #[serde(default)]
    pub exclusions: String,
    #[serde(default)]
    pub notes: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentChecklistItem {
    pub id: String,
    pub label: String,
    pub checked: bool,
}

/// Signable snapshot of an estimate at acceptance time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Contract {
    pub id: String,
    pub estimate_id: String,
    pub contract_number: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,

    #[serde(default)]
    pub client: ClientInfo,
    #[serde(default)]
    pub project_description: String,
    #[serde(default)]
    pub project_sections: Vec<ProjectSection>,
    #[serde(default)]
    pub design_fee: Vec<LineItem>,
    pub tax_rate: Decimal,
    #[serde(default = "default_taxable_categories")]
    pub taxable_categories: Vec<LineItemCategory>,

    #[serde(default)]
    pub payment_schedule: PaymentSchedule,
    #[serde(default)]
    pub payment_checklist: Vec<PaymentChecklistItem>,
    #[serde(default)]
    pub payment_methods_note: String,
    #[serde(default)]
    pub terms: String,
    #[serde(default)]
    pub warranty: String,
    #[serde(default)]
    pub exclusions: String,
    #[serde(default)]
    pub change_orders: String,
    #[serde(default)]
    pub accepted_date: Option<NaiveDate>,
    #[serde(default)]
    pub client_signature: String,
    #[serde(default)]
    pub contractor_signature: String,
}

impl Contract {
    /// Terms followed by the checked payment schedule and the payment methods note.
    pub fn composed_terms(&self) -> String {
        let schedule = self
            .payment_checklist
            .iter()
            .filter(|item| item.checked)
            .map(|item| format!("- {}", item.label))
            .collect::<Vec<_>>()
            .join("\n");
        format!(
            "{}\n\nPayment Schedule\n{}\n\n{}",
            self.terms, schedule, self.payment_methods_note
        )
    }

    pub fn composed_exclusions(&self) -> String {
        if self.change_orders.trim().is_empty() {
            self.exclusions.clone()
        } else {
            format!("{}\n\nChange Orders\n{}", self.exclusions, self.change_orders)
        }
    }
}

/// Flat billable row of a standalone invoice.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SimpleLineItem {
    pub id: String,
    #[serde(default)]
    pub description: String,
    pub amount: Decimal,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub sub_items: Vec<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InvoiceStatus {
    #[default]
    Unpaid,
    Partial,
    Paid,
}

impl InvoiceStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            InvoiceStatus::Unpaid => "unpaid",
            InvoiceStatus::Partial => "partial",
            InvoiceStatus::Paid => "paid",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentMethod {
    #[default]
    Check,
    Venmo,
    Zelle,
    CreditCard,
    Cash,
    Other,
}

impl PaymentMethod {
    pub fn label(&self) -> &'static str {
        match self {
            PaymentMethod::Check => "Check",
            PaymentMethod::Venmo => "Venmo",
            PaymentMethod::Zelle => "Zelle",
            PaymentMethod::CreditCard => "Credit Card",
            PaymentMethod::Cash => "Cash",
            PaymentMethod::Other => "Other",
        }
    }

    pub fn parse(input: &str) -> Option<Self> {
        match input.trim().to_ascii_lowercase().replace('-', "_").as_str() {
            "check" => Some(Self::Check),
            "venmo" => Some(Self::Venmo),
            "zelle" => Some(Self::Zelle),
            "credit_card" | "card" => Some(Self::CreditCard),
            "cash" => Some(Self::Cash),
            "other" => Some(Self::Other),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Payment {
    pub id: String,
    pub date: NaiveDate,
    pub amount: Decimal,
    #[serde(default)]
    pub method: PaymentMethod,
    #[serde(default)]
    pub note: String,
}

/// Billing document. Estimate-linked invoices carry the copied pricing
/// structure; standalone ones carry only `standalone_items`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Invoice {
    pub id: String,
    #[serde(default)]
    pub estimate_id: Option<String>,
    pub invoice_number: String,
    #[serde(default)]
    pub status: InvoiceStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,

    #[serde(default)]
    pub client: ClientInfo,
    #[serde(default)]
    pub project_description: String,
    #[serde(default)]
    pub project_sections: Vec<ProjectSection>,
    #[serde(default)]
    pub design_fee: Vec<LineItem>,
    #[serde(default)]
    pub tax_rate: Decimal,
    #[serde(default)]
    pub taxable_categories: Vec<LineItemCategory>,

    pub invoice_date: NaiveDate,
    #[serde(default)]
    pub payments: Vec<Payment>,
    #[serde(default)]
    pub payment_instructions: String,
    #[serde(default)]
    pub notes: String,

    #[serde(default)]
    pub standalone_items: Vec<SimpleLineItem>,
}

impl Invoice {
    pub fn is_standalone(&self) -> bool {
        self.estimate_id.as_deref().map_or(true, str::is_empty)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CatalogType {
    Plant,
    Service,
    Material,
}

impl CatalogType {
    pub const ALL: [CatalogType; 3] = [CatalogType::Plant, CatalogType::Service, CatalogType::Material];

    pub fn as_str(&self) -> &'static str {
        match self {
            CatalogType::Plant => "plant",
            CatalogType::Service => "service",
            CatalogType::Material => "material",
        }
    }

    pub fn parse(input: &str) -> Option<Self> {
        match input.trim().to_ascii_lowercase().as_str() {
            "plant" | "plants" => Some(Self::Plant),
            "service" | "services" => Some(Self::Service),
            "material" | "materials" => Some(Self::Material),
            _ => None,
        }
    }
}

/// Reusable reference entry. Selecting one copies values into a line item.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CatalogItem {
    pub id: String,
    #[serde(rename = "type")]
    pub catalog_type: CatalogType,
    pub category: LineItemCategory,
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub default_unit: String,
    pub default_unit_price: Decimal,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub is_built_in: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct CompanyInfo {
    pub name: String,
    pub address: String,
    pub city: String,
    pub state: String,
    pub zip: String,
    pub phone: String,
    pub email: String,
    pub website: String,
    pub license_number: String,
    pub logo: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SettingsDefaults {
    pub tax_rate: Decimal,
    pub valid_days: u32,
    #[serde(default)]
    pub payment_template: PaymentTemplate,
    #[serde(default)]
    pub terms: String,
    #[serde(default)]
    pub warranty: String,
    #[serde(default)]
    pub exclusions: String,
    #[serde(default)]
    pub design_fee_description: String,
    #[serde(default)]
    pub design_fee_price: Decimal,
    #[serde(default)]
    pub invoice_payment_instructions: String,
}

/// Process-wide configuration record. The counters only ever grow.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Settings {
    #[serde(default)]
    pub company: CompanyInfo,
    pub defaults: SettingsDefaults,
    pub estimate_number_prefix: String,
    pub next_estimate_number: u32,
    #[serde(default = "default_prefix")]
    pub invoice_number_prefix: String,
    #[serde(default = "default_counter")]
    pub next_invoice_number: u32,
}

fn default_prefix() -> String {
    "NL".to_string()
}

fn default_counter() -> u32 {
    1
}

pub const DEFAULT_TERMS: &str = "All plant material is due at the time of ordering. 50% of the design fee is due as a deposit upon acceptance of this estimate. Hardscape and irrigation materials are due at the time of ordering. The remaining balance is due upon project completion.";

pub const DEFAULT_WARRANTY: &str = "All plants are guaranteed for 30 days from the date of installation, provided that the irrigation system is properly maintained and functioning. Hardscape work is guaranteed for one year against defects in workmanship.";

pub const DEFAULT_EXCLUSIONS: &str = "This estimate does not include permits, engineering, or structural work unless specifically noted. Any unforeseen conditions discovered during construction may result in additional charges, which will be discussed and approved before proceeding.";

pub const DEFAULT_PAYMENT_INSTRUCTIONS: &str = "Please make checks payable to Nancy Lyons Garden Designs. We also accept Venmo and Zelle.";

impl Default for Settings {
    fn default() -> Self {
        Self {
            company: CompanyInfo {
                name: "Nancy Lyons Garden Designs".to_string(),
                city: "Los Angeles".to_string(),
                state: "CA".to_string(),
                phone: "310-630-9711".to_string(),
                email: "nlgardendesign@earthlink.net".to_string(),
                ..CompanyInfo::default()
            },
            defaults: SettingsDefaults {
                tax_rate: Decimal::new(95, 1),
                valid_days: 30,
                payment_template: PaymentTemplate::Custom,
                terms: DEFAULT_TERMS.to_string(),
                warranty: DEFAULT_WARRANTY.to_string(),
                exclusions: DEFAULT_EXCLUSIONS.to_string(),
                design_fee_description: "Landscape design".to_string(),
                design_fee_price: Decimal::ZERO,
                invoice_payment_instructions: DEFAULT_PAYMENT_INSTRUCTIONS.to_string(),
            },
            estimate_number_prefix: default_prefix(),
            next_estimate_number: 1,
            invoice_number_prefix: default_prefix(),
            next_invoice_number: 1,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn records_serialize_with_camel_case_keys() {
        let item = LineItem {
            id: "li-1".into(),
            category: LineItemCategory::Planting,
            description: "5 gal Salvia".into(),
            quantity: Decimal::new(3, 0),
            unit: "ea".into(),
            unit_price: Decimal::new(4000, 2),
            no_price: false,
            sub_items: vec![],
        };
        let value = serde_json::to_value(&item).expect("serialize");
        assert_eq!(value["unitPrice"], serde_json::json!(40.0));
        assert!(value.get("noPrice").is_none());
        assert!(value.get("subItems").is_none());
    }

    #[test]
    fn enums_use_wire_spellings() {
        assert_eq!(
            serde_json::to_value(PaymentMethod::CreditCard).expect("method"),
            serde_json::json!("credit_card")
        );
        assert_eq!(
            serde_json::to_value(PaymentTemplate::FiftyFifty).expect("template"),
            serde_json::json!("50-50")
        );
        assert_eq!(
            serde_json::to_value(ListKey::LaborAndServices).expect("key"),
            serde_json::json!("laborAndServices")
        );
        assert_eq!(LineItemCategory::parse("irrigation"), Some(LineItemCategory::Irrigation));
        assert_eq!(LineItemCategory::parse("Trees"), None);
    }

    #[test]
    fn standalone_detection_treats_empty_link_as_standalone() {
        let settings = Settings::default();
        assert_eq!(settings.next_invoice_number, 1);
        let json = serde_json::json!({
            "id": "inv-1",
            "estimateId": "",
            "invoiceNumber": "NL-INV-2026-001",
            "createdAt": "2026-02-01T00:00:00Z",
            "updatedAt": "2026-02-01T00:00:00Z",
            "invoiceDate": "2026-02-01",
            "standaloneItems": [{"id": "s1", "description": "Consult", "amount": 150}]
        });
        let invoice: Invoice = serde_json::from_value(json).expect("invoice");
        assert!(invoice.is_standalone());
        assert_eq!(invoice.standalone_items[0].amount, Decimal::new(150, 0));
    }
}
