//! Collection catalog: every mirrored record type, its schema, natural key
//! and upstream source. Enumerated once; never changes after load.

use crate::schema::{Field, Schema};

/// Where a collection's records come from in the ERP service layer.
#[derive(Debug, Clone, Copy)]
pub struct UpstreamSource {
    /// Entity path relative to the service root, e.g. `/Items`.
    pub path: &'static str,
    /// Optional `$select` list passed through to the upstream.
    pub select: Option<&'static str>,
    /// Page size override for payload-constrained endpoints.
    pub page_size: Option<u32>,
    /// Nested array on each upstream record whose elements are the records
    /// to mirror (e.g. contact persons inside business partners).
    pub nested: Option<&'static str>,
}

impl UpstreamSource {
    pub const fn new(path: &'static str) -> Self {
        Self {
            path,
            select: None,
            page_size: None,
            nested: None,
        }
    }

    pub const fn select(self, select: &'static str) -> Self {
        Self {
            select: Some(select),
            ..self
        }
    }

    pub const fn page_size(self, page_size: u32) -> Self {
        Self {
            page_size: Some(page_size),
            ..self
        }
    }

    pub const fn nested(self, field: &'static str) -> Self {
        Self {
            nested: Some(field),
            ..self
        }
    }

    /// Paged request path: `<path>?$skip=<n>&$top=<p>[&$select=<fields>]`.
    pub fn page_path(&self, skip: u64, top: u32) -> String {
        let mut path = format!("{}?$skip={skip}&$top={top}", self.path);
        if let Some(select) = self.select {
            path.push_str("&$select=");
            path.push_str(select);
        }
        path
    }
}

#[derive(Debug, Clone, Copy)]
pub struct CollectionDescriptor {
    /// Storage collection name.
    pub name: &'static str,
    /// Human-readable singular label used in logs.
    pub label: &'static str,
    /// REST path segment under `/api`.
    pub route: &'static str,
    pub schema: Schema,
    pub natural_key: &'static str,
    pub upstream: UpstreamSource,
}

impl CollectionDescriptor {
    /// Match a CLI selector against route, storage name or label.
    pub fn matches_selector(&self, selector: &str) -> bool {
        let selector = selector.trim();
        self.route.eq_ignore_ascii_case(selector)
            || self.name.eq_ignore_ascii_case(selector)
            || self.label.eq_ignore_ascii_case(selector)
    }
}

/// Type-level handle for one collection, so handlers and routers can be
/// instantiated per collection without runtime lookups.
pub trait Collection: Send + Sync + 'static {
    fn descriptor() -> &'static CollectionDescriptor;
}

macro_rules! collections {
    ($($ty:ident => $desc:ident),+ $(,)?) => {
        $(
            #[derive(Debug, Clone, Copy, Default)]
            pub struct $ty;

            impl Collection for $ty {
                fn descriptor() -> &'static CollectionDescriptor {
                    &$desc
                }
            }
        )+

        /// All collections in declaration order.
        pub static CATALOG: &[&CollectionDescriptor] = &[$(&$desc),+];
    };
}

collections! {
    Customers => CUSTOMERS,
    ContactPersons => CONTACT_PERSONS,
    Branches => BRANCHES,
    SalesEmployees => SALES_EMPLOYEES,
    Owners => OWNERS,
    Items => ITEMS,
    Taxes => TAXES,
    Warehouses => WAREHOUSES,
    CostCentres => COST_CENTRES,
    ChartOfAccounts => CHART_OF_ACCOUNTS,
    Invoices => INVOICES,
}

/// Resolve `--only` style selectors. Unknown selectors are returned as `Err`.
pub fn select_collections(
    selectors: &[String],
) -> Result<Vec<&'static CollectionDescriptor>, Vec<String>> {
    if selectors.is_empty() {
        return Ok(CATALOG.to_vec());
    }
    let unknown: Vec<String> = selectors
        .iter()
        .filter(|s| !CATALOG.iter().any(|c| c.matches_selector(s)))
        .cloned()
        .collect();
    if !unknown.is_empty() {
        return Err(unknown);
    }
    // Keep declaration order regardless of selector order.
    Ok(CATALOG
        .iter()
        .copied()
        .filter(|c| selectors.iter().any(|s| c.matches_selector(s)))
        .collect())
}

pub fn find_by_route(route: &str) -> Option<&'static CollectionDescriptor> {
    CATALOG.iter().copied().find(|c| c.route == route)
}

// ── Customers ────────────────────────────────────────────────

const BP_ADDRESS_FIELDS: &[Field] = &[
    Field::string("AddressName"),
    Field::string("Street"),
    Field::string("Block"),
    Field::string("ZipCode"),
    Field::string("City"),
    Field::string("County"),
    Field::string("Country"),
    Field::string("State"),
    Field::string("AddressType"),
    Field::number("RowNum"),
    Field::string("BPCode"),
];

const CUSTOMER_FIELDS: &[Field] = &[
    Field::string("CardCode").required(),
    Field::string("CardName").required(),
    Field::string("CardType"),
    Field::number("GroupCode"),
    Field::string("Address"),
    Field::string("ZipCode"),
    Field::string("City"),
    Field::string("County"),
    Field::string("Country"),
    Field::string("Phone1"),
    Field::string("Phone2"),
    Field::string("Cellular"),
    Field::string("Fax"),
    Field::string("EmailAddress"),
    Field::string("ContactPerson"),
    Field::string("Notes"),
    Field::number("PayTermsGrpCode"),
    Field::number("CreditLimit"),
    Field::number("MaxCommitment"),
    Field::number("DiscountPercent"),
    Field::string("VatLiable"),
    Field::string("FederalTaxID"),
    Field::string("Currency"),
    Field::number("SalesPersonCode"),
    Field::string("Valid"),
    Field::string("Frozen"),
    Field::number("CurrentAccountBalance"),
    Field::number("OpenDeliveryNotesBalance"),
    Field::number("OpenOrdersBalance"),
    Field::object_array("BPAddresses", BP_ADDRESS_FIELDS),
];

pub static CUSTOMERS: CollectionDescriptor = CollectionDescriptor {
    name: "customers",
    label: "Customer",
    route: "customers",
    schema: Schema::new(CUSTOMER_FIELDS),
    natural_key: "CardCode",
    upstream: UpstreamSource::new("/BusinessPartners"),
};

// ── Contact persons ──────────────────────────────────────────

const CONTACT_PERSON_FIELDS: &[Field] = &[
    Field::number("InternalCode").required(),
    Field::string("CardCode"),
    Field::string("Name"),
    Field::string("FirstName"),
    Field::string("MiddleName"),
    Field::string("LastName"),
    Field::string("Title"),
    Field::string("Position"),
    Field::string("Address"),
    Field::string("Phone1"),
    Field::string("Phone2"),
    Field::string("MobilePhone"),
    Field::string("Fax"),
    Field::string("E_Mail"),
    Field::string("Remarks1"),
    Field::string("Gender"),
    Field::string("Active"),
];

pub static CONTACT_PERSONS: CollectionDescriptor = CollectionDescriptor {
    name: "contact_persons",
    label: "Contact Person",
    route: "contact-persons",
    schema: Schema::new(CONTACT_PERSON_FIELDS),
    natural_key: "InternalCode",
    upstream: UpstreamSource::new("/BusinessPartners")
        .select("ContactEmployees")
        .nested("ContactEmployees"),
};

// ── Branches ─────────────────────────────────────────────────

const BRANCH_FIELDS: &[Field] = &[
    Field::number("BPLID").required(),
    Field::string("BPLName"),
    Field::string("BPLNameForeign"),
    Field::string("VATRegNum"),
    Field::string("RepName"),
    Field::string("Industry"),
    Field::string("Business"),
    Field::string("Address"),
    Field::string("MainBPL"),
    Field::string("TaxOffice"),
    Field::string("FederalTaxID"),
    Field::string("DefaultCustomerID"),
    Field::string("DefaultVendorID"),
    Field::string("DefaultWarehouseID"),
    Field::string("Disabled"),
    Field::string("Street"),
    Field::string("City"),
    Field::string("State"),
    Field::string("ZipCode"),
    Field::string("Country"),
];

pub static BRANCHES: CollectionDescriptor = CollectionDescriptor {
    name: "branches",
    label: "Branch",
    route: "branches",
    schema: Schema::new(BRANCH_FIELDS),
    natural_key: "BPLID",
    upstream: UpstreamSource::new("/BusinessPlaces"),
};

// ── Sales employees ──────────────────────────────────────────

const SALES_EMPLOYEE_FIELDS: &[Field] = &[
    Field::number("SalesEmployeeCode").required(),
    Field::string("SalesEmployeeName").required(),
    Field::string("Remarks"),
    Field::number("CommissionForSalesEmployee"),
    Field::number("CommissionGroup"),
    Field::string("Locked"),
    Field::string("EmployeeID"),
    Field::string("Active"),
    Field::string("Telephone"),
    Field::string("Mobile"),
    Field::string("Fax"),
    Field::string("Email"),
];

pub static SALES_EMPLOYEES: CollectionDescriptor = CollectionDescriptor {
    name: "sales_employees",
    label: "Sales Employee",
    route: "sales-employees",
    schema: Schema::new(SALES_EMPLOYEE_FIELDS),
    natural_key: "SalesEmployeeCode",
    upstream: UpstreamSource::new("/SalesPersons"),
};

// ── Owners ───────────────────────────────────────────────────

const OWNER_FIELDS: &[Field] = &[
    Field::number("EmployeeID").required(),
    Field::string("FirstName"),
    Field::string("MiddleName"),
    Field::string("LastName"),
    Field::string("JobTitle"),
    Field::number("Department"),
    Field::number("Branch"),
    Field::number("Manager"),
    Field::string("OfficePhone"),
    Field::string("MobilePhone"),
    Field::string("eMail"),
    Field::string("Active"),
    Field::date("StartDate"),
    Field::date("TerminationDate"),
    Field::number("SalesPersonCode"),
];

pub static OWNERS: CollectionDescriptor = CollectionDescriptor {
    name: "owners",
    label: "Owner",
    route: "owners",
    schema: Schema::new(OWNER_FIELDS),
    natural_key: "EmployeeID",
    upstream: UpstreamSource::new("/EmployeesInfo"),
};

// ── Items ────────────────────────────────────────────────────

const ITEM_WAREHOUSE_INFO_FIELDS: &[Field] = &[
    Field::number("MinimalStock"),
    Field::number("MaximalStock"),
    Field::string("WarehouseCode"),
    Field::number("InStock"),
    Field::number("Committed"),
    Field::number("Ordered"),
    Field::string("ItemCode"),
];

const ITEM_FIELDS: &[Field] = &[
    Field::string("ItemCode").required(),
    Field::string("ItemName").required(),
    Field::string("SalesUnit"),
    Field::string("PurchaseUnit"),
    Field::string("InventoryUOM"),
    Field::object_array("ItemWarehouseInfoCollection", ITEM_WAREHOUSE_INFO_FIELDS),
];

pub static ITEMS: CollectionDescriptor = CollectionDescriptor {
    name: "items",
    label: "Item",
    route: "items",
    schema: Schema::new(ITEM_FIELDS),
    natural_key: "ItemCode",
    // Item payloads carry the full warehouse collection; one per page.
    upstream: UpstreamSource::new("/Items")
        .select("ItemCode,ItemName,ItemWarehouseInfoCollection,SalesUnit,PurchaseUnit,InventoryUOM")
        .page_size(1),
};

// ── Taxes ────────────────────────────────────────────────────

const VAT_GROUP_LINE_FIELDS: &[Field] = &[
    Field::date("Effectivefrom"),
    Field::number("Rate"),
    Field::number("EqualizationTax"),
    Field::string("DatevCode"),
];

const TAX_FIELDS: &[Field] = &[
    Field::string("Code").required(),
    Field::string("Name").required(),
    Field::string("Category"),
    Field::string("TaxAccount"),
    Field::string("EU"),
    Field::string("TriangularDeal"),
    Field::string("AcquisitionReverse"),
    Field::number("NonDeduct"),
    Field::string("AcquisitionTax"),
    Field::string("GoodsShipment"),
    Field::string("NonDeductAcc"),
    Field::string("DeferredTaxAcc"),
    Field::string("Correction"),
    Field::string("VatCorrection"),
    Field::string("EqualizationTaxAccount"),
    Field::string("ServiceSupply"),
    Field::string("Inactive"),
    Field::string("TaxTypeBlackList"),
    Field::string("Report349Code"),
    Field::string("VATInRevenueAccount"),
    Field::string("DownPaymentTaxOffsetAccount"),
    Field::string("CashDiscountAccount"),
    Field::string("VATDeductibleAccount"),
    Field::string("TaxRegion"),
    Field::string("AcquisitionReverseCorrespondingTaxCode"),
    Field::string("EBooksVatCategory"),
    Field::object_array("VatGroups_Lines", VAT_GROUP_LINE_FIELDS),
];

pub static TAXES: CollectionDescriptor = CollectionDescriptor {
    name: "taxes",
    label: "Tax",
    route: "tax",
    schema: Schema::new(TAX_FIELDS),
    natural_key: "Code",
    upstream: UpstreamSource::new("/VatGroups"),
};

// ── Warehouses ───────────────────────────────────────────────

const WAREHOUSE_FIELDS: &[Field] = &[
    Field::string("WarehouseCode").required(),
    Field::string("WarehouseName"),
    Field::string("Street"),
    Field::string("Block"),
    Field::string("City"),
    Field::string("County"),
    Field::string("Country"),
    Field::string("State"),
    Field::string("ZipCode"),
    Field::number("Location"),
    Field::number("BusinessPlaceID"),
    Field::string("DropShip"),
    Field::string("Nettable"),
    Field::string("EnableBinLocations"),
    Field::string("Inactive"),
];

pub static WAREHOUSES: CollectionDescriptor = CollectionDescriptor {
    name: "warehouses",
    label: "Warehouse",
    route: "warehouses",
    schema: Schema::new(WAREHOUSE_FIELDS),
    natural_key: "WarehouseCode",
    upstream: UpstreamSource::new("/Warehouses"),
};

// ── Cost centres ─────────────────────────────────────────────

const COST_CENTRE_FIELDS: &[Field] = &[
    Field::string("CenterCode").required(),
    Field::string("CenterName").required(),
    Field::string("GroupCode"),
    Field::number("InWhichDimension"),
    Field::string("CostCenterType"),
    Field::date("EffectiveFrom"),
    Field::date("EffectiveTo"),
    // "tYES" / "tNO"
    Field::string("Active"),
    Field::string("CenterOwner"),
];

pub static COST_CENTRES: CollectionDescriptor = CollectionDescriptor {
    name: "cost_centres",
    label: "Cost Centre",
    route: "cost-centres",
    schema: Schema::new(COST_CENTRE_FIELDS),
    natural_key: "CenterCode",
    upstream: UpstreamSource::new("/ProfitCenters"),
};

// ── Chart of accounts ────────────────────────────────────────

const CHART_OF_ACCOUNT_FIELDS: &[Field] = &[
    Field::string("Code").required(),
    Field::string("Name").required(),
    Field::number("Balance"),
    Field::string("AccountType"),
    Field::string("ActiveAccount"),
    Field::string("FatherAccountKey"),
    Field::string("AcctCurrency"),
    Field::number("AccountLevel"),
    Field::string("Protected"),
    Field::string("ExternalCode"),
    Field::string("CashAccount"),
    Field::string("ReconciledAccount"),
    Field::string("LockManualTransaction"),
    Field::string("FrozenFor"),
];

pub static CHART_OF_ACCOUNTS: CollectionDescriptor = CollectionDescriptor {
    name: "chart_of_accounts",
    label: "Chart Of Account",
    route: "chart-of-accounts",
    schema: Schema::new(CHART_OF_ACCOUNT_FIELDS),
    natural_key: "Code",
    upstream: UpstreamSource::new("/ChartOfAccounts"),
};

// ── Invoices ─────────────────────────────────────────────────

const INVOICE_ITEM_FIELDS: &[Field] = &[
    Field::string("hsCode"),
    Field::string("productDescription"),
    Field::string("rate"),
    Field::string("uoM"),
    Field::number("quantity"),
    Field::number("totalValues"),
    Field::number("valueSalesExcludingST"),
    Field::number("fixedNotifiedValueOrRetailPrice"),
    Field::number("salesTaxApplicable"),
    Field::number("salesTaxWithheldAtSource"),
    Field::number("extraTax"),
    Field::number("furtherTax"),
    Field::string("sroScheduleNo"),
    Field::number("fedPayable"),
    Field::number("discount"),
    Field::string("saleType"),
    Field::string("sroItemSerialNo"),
];

const INVOICE_STATUS_FIELDS: &[Field] = &[
    Field::string("itemSNo"),
    Field::string("statusCode"),
    Field::string("status"),
    Field::string("invoiceNo"),
    Field::string("errorCode"),
    Field::string("error"),
];

const VALIDATION_RESPONSE_FIELDS: &[Field] = &[
    Field::string("statusCode"),
    Field::string("status"),
    Field::string("error"),
    Field::object_array("invoiceStatuses", INVOICE_STATUS_FIELDS),
];

const RESPONSE_BODY_FIELDS: &[Field] = &[
    Field::string("invoiceNumber"),
    Field::date("dated"),
    Field::object("validationResponse", VALIDATION_RESPONSE_FIELDS),
];

const REQUEST_BODY_FIELDS: &[Field] = &[
    Field::string("invoiceType"),
    Field::date("invoiceDate"),
    Field::string("sellerNTNCNIC"),
    Field::string("sellerBusinessName"),
    Field::string("sellerProvince"),
    Field::string("sellerAddress"),
    Field::string("buyerNTNCNIC"),
    Field::string("buyerBusinessName"),
    Field::string("buyerProvince"),
    Field::string("buyerAddress"),
    Field::string("buyerRegistrationType"),
    Field::string("invoiceRefNo"),
    Field::string("scenarioId"),
    Field::object_array("items", INVOICE_ITEM_FIELDS),
];

const INVOICE_FIELDS: &[Field] = &[
    Field::number("DocEntry").required(),
    Field::object("request_body", REQUEST_BODY_FIELDS),
    Field::object("response_body", RESPONSE_BODY_FIELDS),
];

pub static INVOICES: CollectionDescriptor = CollectionDescriptor {
    name: "invoices",
    label: "Invoice",
    route: "invoices",
    schema: Schema::new(INVOICE_FIELDS),
    natural_key: "DocEntry",
    upstream: UpstreamSource::new("/Invoices"),
};
