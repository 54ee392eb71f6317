//! Static per-document-type configuration: classifier keywords, field specs
//! (regex label anchors + structured queries), required fields, core
//! identifiers, and the template library. Built once, never mutated.

use super::enums::{DocumentType, FieldKind};

/// One extractable field of a document type.
#[derive(Debug, Clone, Copy)]
pub struct FieldSpec {
    pub key: &'static str,
    /// Lowercase label phrases that anchor the value on a line.
    pub labels: &'static [&'static str],
    /// Structured query text, when the type has a query configuration.
    pub query: Option<&'static str>,
}

impl FieldSpec {
    /// Value shape, from the key-substring lookup table.
    pub fn kind(&self) -> FieldKind {
        FieldKind::infer_from_key(self.key)
    }
}

/// Everything the core knows about one document type.
#[derive(Debug)]
pub struct DocumentProfile {
    pub document_type: DocumentType,
    /// Lowercase classifier keywords. Longer phrases weigh more.
    pub keywords: &'static [&'static str],
    pub fields: &'static [FieldSpec],
    pub required: &'static [&'static str],
    /// Identifier fields that must parse for the document to be usable.
    pub core_identifiers: &'static [&'static str],
    pub date_ranges: &'static [DateRange],
}

/// Two date fields printed as one labeled `start - end` span.
#[derive(Debug)]
pub struct DateRange {
    pub labels: &'static [&'static str],
    pub start_key: &'static str,
    pub end_key: &'static str,
}

/// Entity keys swept from documents whose type has no field map. Each key's
/// value shape comes from the key-substring lookup table.
pub const GENERIC_ENTITIES: &[&str] = &["SSN", "EIN", "Phone", "Date", "Amount", "ZipCode", "Year"];

impl DocumentProfile {
    pub fn field(&self, key: &str) -> Option<&FieldSpec> {
        self.fields.iter().find(|f| f.key == key)
    }

    /// True when at least one field has a structured query.
    pub fn has_structured_config(&self) -> bool {
        self.fields.iter().any(|f| f.query.is_some())
    }

    pub fn field_keys(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.fields.iter().map(|f| f.key)
    }
}

/// A known document layout for the template matcher.
#[derive(Debug)]
pub struct TemplateSpec {
    pub name: &'static str,
    pub document_type: DocumentType,
    pub keywords: &'static [&'static str],
}

const fn field(
    key: &'static str,
    labels: &'static [&'static str],
    query: Option<&'static str>,
) -> FieldSpec {
    FieldSpec { key, labels, query }
}

// ── W-2 ─────────────────────────────────────────────────────────────────────

const W2_FIELDS: &[FieldSpec] = &[
    field(
        "EmployerEIN",
        &["employer identification number", "employer's identification number", "employer id", "ein"],
        Some("What is the employer identification number (EIN)?"),
    ),
    field(
        "EmployeeSSN",
        &["employee's social security number", "social security number", "ssn"],
        Some("What is the employee's social security number?"),
    ),
    field("EmployerName", &["employer's name"], Some("What is the employer's name?")),
    field("EmployeeName", &["employee's name", "employee's first name"], Some("What is the employee's name?")),
    field(
        "Box1_Wages",
        &["wages, tips, other compensation", "wages, tips and other compensation"],
        Some("What is Box 1 wages, tips, other compensation?"),
    ),
    field(
        "Box2_FederalTaxWithheld",
        &["federal income tax withheld"],
        Some("What is Box 2 federal income tax withheld?"),
    ),
    field(
        "Box3_SocialSecurityWages",
        &["social security wages"],
        Some("What is Box 3 social security wages?"),
    ),
    field(
        "Box4_SocialSecurityTaxWithheld",
        &["social security tax withheld"],
        Some("What is Box 4 social security tax withheld?"),
    ),
    field(
        "Box5_MedicareWages",
        &["medicare wages and tips"],
        Some("What is Box 5 medicare wages and tips?"),
    ),
    field(
        "Box6_MedicareTaxWithheld",
        &["medicare tax withheld"],
        Some("What is Box 6 medicare tax withheld?"),
    ),
    field("TaxYear", &["tax year", "wage and tax statement"], Some("What tax year is this form for?")),
];

// ── Pay statements ──────────────────────────────────────────────────────────

const PAYSTUB_FIELDS: &[FieldSpec] = &[
    field("EmployerName", &["employer", "company"], Some("What is the employer or company name?")),
    field("EmployeeName", &["employee name", "employee"], Some("What is the employee's name?")),
    field(
        "PayPeriodStart",
        &["period start", "period beginning", "start date"],
        Some("What is the pay period start date?"),
    ),
    field(
        "PayPeriodEnd",
        &["period end", "period ending", "end date"],
        Some("What is the pay period end date?"),
    ),
    field("PayDate", &["pay date", "check date", "payment date"], Some("What is the pay date?")),
    field("GrossPay", &["gross pay", "gross earnings", "total gross"], Some("What is the current gross pay?")),
    field("TotalDeductions", &["total deductions"], Some("What are the total deductions for this period?")),
    field("NetPay", &["net pay", "take home pay"], Some("What is the current net pay?")),
    field("YtdGrossPay", &["ytd gross", "year to date gross"], Some("What is the year-to-date gross pay?")),
    field(
        "FederalTaxWithheld",
        &["federal income tax", "federal withholding"],
        Some("What is the federal income tax withheld this period?"),
    ),
];

// ── 1099 family and 1098 ────────────────────────────────────────────────────

const NEC_FIELDS: &[FieldSpec] = &[
    field("PayerName", &["payer's name"], Some("What is the payer's name?")),
    field("PayerTIN", &["payer's tin", "payer's federal identification number"], Some("What is the payer's TIN?")),
    field("RecipientName", &["recipient's name"], Some("What is the recipient's name?")),
    field(
        "RecipientTIN",
        &["recipient's tin", "recipient's identification number"],
        Some("What is the recipient's TIN?"),
    ),
    field(
        "Box1_NonemployeeCompensation",
        &["nonemployee compensation"],
        Some("What is Box 1 nonemployee compensation?"),
    ),
    field(
        "Box4_FederalTaxWithheld",
        &["federal income tax withheld"],
        Some("What is Box 4 federal income tax withheld?"),
    ),
    field("TaxYear", &["for calendar year", "tax year"], Some("What calendar year is this form for?")),
];

const INT_FIELDS: &[FieldSpec] = &[
    field("PayerName", &["payer's name"], None),
    field("PayerTIN", &["payer's tin"], None),
    field("RecipientTIN", &["recipient's tin"], None),
    field("Box1_InterestIncome", &["interest income"], None),
    field("Box4_FederalTaxWithheld", &["federal income tax withheld"], None),
    field("TaxYear", &["for calendar year", "tax year"], None),
];

const MISC_FIELDS: &[FieldSpec] = &[
    field("PayerName", &["payer's name"], None),
    field("PayerTIN", &["payer's tin"], None),
    field("RecipientTIN", &["recipient's tin"], None),
    field("Box1_RentAmount", &["rents"], None),
    field("Box2_RoyaltyAmount", &["royalties"], None),
    field("Box3_OtherIncome", &["other income"], None),
    field("Box4_FederalTaxWithheld", &["federal income tax withheld"], None),
    field("TaxYear", &["for calendar year", "tax year"], None),
];

const DIV_FIELDS: &[FieldSpec] = &[
    field("PayerName", &["payer's name"], None),
    field("PayerTIN", &["payer's tin"], None),
    field("RecipientTIN", &["recipient's tin"], None),
    field("Box1a_TotalOrdinaryDividends", &["total ordinary dividends"], None),
    field("Box1b_QualifiedDividends", &["qualified dividends"], None),
    field("Box4_FederalTaxWithheld", &["federal income tax withheld"], None),
    field("TaxYear", &["for calendar year", "tax year"], None),
];

const MORTGAGE_FIELDS: &[FieldSpec] = &[
    field("RecipientTIN", &["recipient's/lender's tin", "lender's tin"], None),
    field("PayerTIN", &["payer's/borrower's tin", "borrower's tin"], None),
    field("Box1_MortgageInterest", &["mortgage interest received"], None),
    field("Box2_OutstandingPrincipalAmount", &["outstanding mortgage principal"], None),
    field("TaxYear", &["for calendar year", "tax year"], None),
];

static PROFILES: &[DocumentProfile] = &[
    DocumentProfile {
        document_type: DocumentType::W2,
        keywords: &[
            "form w-2",
            "w-2",
            "wage and tax statement",
            "wages, tips, other compensation",
            "federal income tax withheld",
            "social security wages",
            "medicare wages and tips",
            "employer identification number",
        ],
        fields: W2_FIELDS,
        required: &["EmployerEIN", "EmployeeSSN", "Box1_Wages", "Box2_FederalTaxWithheld", "TaxYear"],
        core_identifiers: &["EmployerEIN", "EmployeeSSN"],
        date_ranges: &[],
    },
    DocumentProfile {
        document_type: DocumentType::Paystub,
        keywords: &[
            "earnings statement",
            "pay stub",
            "pay period",
            "pay date",
            "gross pay",
            "net pay",
            "total deductions",
            "year to date",
        ],
        fields: PAYSTUB_FIELDS,
        required: &[
            "EmployerName",
            "PayPeriodStart",
            "PayPeriodEnd",
            "PayDate",
            "GrossPay",
            "TotalDeductions",
            "NetPay",
        ],
        core_identifiers: &[],
        date_ranges: &[DateRange {
            labels: &["pay period", "period covered"],
            start_key: "PayPeriodStart",
            end_key: "PayPeriodEnd",
        }],
    },
    DocumentProfile {
        document_type: DocumentType::Form1099Nec,
        keywords: &[
            "form 1099-nec",
            "1099-nec",
            "nonemployee compensation",
            "payer's tin",
            "recipient's tin",
            "direct sales",
        ],
        fields: NEC_FIELDS,
        required: &["PayerTIN", "RecipientTIN", "Box1_NonemployeeCompensation", "TaxYear"],
        core_identifiers: &["PayerTIN", "RecipientTIN"],
        date_ranges: &[],
    },
    DocumentProfile {
        document_type: DocumentType::Form1099Int,
        keywords: &[
            "form 1099-int",
            "1099-int",
            "interest income",
            "early withdrawal penalty",
            "interest on u.s. savings bonds",
            "payer's tin",
            "recipient's tin",
        ],
        fields: INT_FIELDS,
        required: &["PayerTIN", "RecipientTIN", "Box1_InterestIncome", "TaxYear"],
        core_identifiers: &["PayerTIN", "RecipientTIN"],
        date_ranges: &[],
    },
    DocumentProfile {
        document_type: DocumentType::Form1099Misc,
        keywords: &[
            "form 1099-misc",
            "1099-misc",
            "miscellaneous information",
            "rents",
            "royalties",
            "other income",
            "fishing boat proceeds",
        ],
        fields: MISC_FIELDS,
        required: &["PayerTIN", "RecipientTIN", "TaxYear"],
        core_identifiers: &["PayerTIN", "RecipientTIN"],
        date_ranges: &[],
    },
    DocumentProfile {
        document_type: DocumentType::Form1099Div,
        keywords: &[
            "form 1099-div",
            "1099-div",
            "dividends and distributions",
            "total ordinary dividends",
            "qualified dividends",
            "capital gain distr",
        ],
        fields: DIV_FIELDS,
        required: &["PayerTIN", "RecipientTIN", "Box1a_TotalOrdinaryDividends", "TaxYear"],
        core_identifiers: &["PayerTIN", "RecipientTIN"],
        date_ranges: &[],
    },
    DocumentProfile {
        document_type: DocumentType::Form1098,
        keywords: &[
            "form 1098",
            "mortgage interest statement",
            "mortgage interest received",
            "outstanding mortgage principal",
            "mortgage origination date",
            "recipient's/lender's",
        ],
        fields: MORTGAGE_FIELDS,
        required: &["RecipientTIN", "Box1_MortgageInterest", "TaxYear"],
        core_identifiers: &["RecipientTIN"],
        date_ranges: &[],
    },
    DocumentProfile {
        document_type: DocumentType::Unknown,
        keywords: &[],
        fields: &[],
        required: &[],
        core_identifiers: &[],
        date_ranges: &[],
    },
];

static TEMPLATES: &[TemplateSpec] = &[
    TemplateSpec {
        name: "W2 Standard",
        document_type: DocumentType::W2,
        keywords: &[
            "form w-2",
            "wage and tax statement",
            "wages, tips, other compensation",
            "federal income tax withheld",
            "social security wages",
            "medicare wages and tips",
            "employer identification number",
            "control number",
        ],
    },
    TemplateSpec {
        name: "W2 ADP",
        document_type: DocumentType::W2,
        keywords: &[
            "adp",
            "w-2",
            "wage and tax statement",
            "employee reference copy",
            "federal filing copy",
        ],
    },
    TemplateSpec {
        name: "Paystub Generic",
        document_type: DocumentType::Paystub,
        keywords: &[
            "earnings statement",
            "pay period",
            "pay date",
            "gross pay",
            "net pay",
            "deductions",
            "year to date",
        ],
    },
    TemplateSpec {
        name: "Paystub ADP",
        document_type: DocumentType::Paystub,
        keywords: &[
            "adp",
            "earnings statement",
            "statement of earnings and deductions",
            "gross pay",
            "net pay",
            "period ending",
        ],
    },
    TemplateSpec {
        name: "Paystub Gusto",
        document_type: DocumentType::Paystub,
        keywords: &[
            "gusto",
            "employee pay stub",
            "gross earnings",
            "net pay",
            "pay period",
            "check date",
        ],
    },
    TemplateSpec {
        name: "1099-NEC Standard",
        document_type: DocumentType::Form1099Nec,
        keywords: &[
            "form 1099-nec",
            "nonemployee compensation",
            "payer's tin",
            "recipient's tin",
            "federal income tax withheld",
        ],
    },
    TemplateSpec {
        name: "1099-INT Standard",
        document_type: DocumentType::Form1099Int,
        keywords: &[
            "form 1099-int",
            "interest income",
            "early withdrawal penalty",
            "payer's tin",
            "recipient's tin",
        ],
    },
    TemplateSpec {
        name: "1099-MISC Standard",
        document_type: DocumentType::Form1099Misc,
        keywords: &[
            "form 1099-misc",
            "miscellaneous information",
            "rents",
            "royalties",
            "other income",
        ],
    },
    TemplateSpec {
        name: "1099-DIV Standard",
        document_type: DocumentType::Form1099Div,
        keywords: &[
            "form 1099-div",
            "dividends and distributions",
            "total ordinary dividends",
            "qualified dividends",
        ],
    },
    TemplateSpec {
        name: "1098 Standard",
        document_type: DocumentType::Form1098,
        keywords: &[
            "form 1098",
            "mortgage interest statement",
            "mortgage interest received",
            "outstanding mortgage principal",
        ],
    },
];

/// Profile for a document type. Every type, including `Unknown`, has one.
pub fn profile(document_type: DocumentType) -> &'static DocumentProfile {
    PROFILES
        .iter()
        .find(|p| p.document_type == document_type)
        .unwrap_or(&PROFILES[PROFILES.len() - 1])
}

pub fn profiles() -> &'static [DocumentProfile] {
    PROFILES
}

pub fn templates() -> &'static [TemplateSpec] {
    TEMPLATES
}
