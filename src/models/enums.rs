use serde::{Deserialize, Serialize};

use super::ModelError;

/// Macro to generate a closed enum with as_str + std::str::FromStr + Display.
/// The serde representation is the same string as `as_str`.
macro_rules! str_enum {
    ($(#[$meta:meta])* $name:ident { $($variant:ident => $s:literal),+ $(,)? }) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        pub enum $name {
            $(#[serde(rename = $s)] $variant),+
        }

        impl $name {
            pub const ALL: &'static [$name] = &[$(Self::$variant),+];

            pub fn as_str(&self) -> &'static str {
                match self {
                    $(Self::$variant => $s),+
                }
            }
        }

        impl std::str::FromStr for $name {
            type Err = ModelError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s {
                    $($s => Ok(Self::$variant)),+,
                    _ => Err(ModelError::InvalidEnum {
                        field: stringify!($name).into(),
                        value: s.into(),
                    }),
                }
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.write_str(self.as_str())
            }
        }
    };
}

str_enum!(
    /// Closed set of document labels the classifier may emit.
    DocumentType {
        W2 => "w2",
        Paystub => "paystub",
        Form1099Nec => "1099_nec",
        Form1099Int => "1099_int",
        Form1099Misc => "1099_misc",
        Form1099Div => "1099_div",
        Form1098 => "1098",
        Unknown => "unknown",
    }
);

impl DocumentType {
    /// Human-readable name, used in prompts.
    pub fn display_name(&self) -> &'static str {
        match self {
            Self::W2 => "Form W-2 Wage and Tax Statement",
            Self::Paystub => "Pay stub / earnings statement",
            Self::Form1099Nec => "Form 1099-NEC Nonemployee Compensation",
            Self::Form1099Int => "Form 1099-INT Interest Income",
            Self::Form1099Misc => "Form 1099-MISC Miscellaneous Information",
            Self::Form1099Div => "Form 1099-DIV Dividends and Distributions",
            Self::Form1098 => "Form 1098 Mortgage Interest Statement",
            Self::Unknown => "Unknown document",
        }
    }

    /// Every label except `Unknown`.
    pub fn known() -> impl Iterator<Item = DocumentType> {
        Self::ALL.iter().copied().filter(|t| *t != Self::Unknown)
    }
}

str_enum!(
    /// Declared or sniffed payload category of an ingested document.
    MediaCategory {
        Pdf => "pdf",
        Image => "image",
        PlainText => "plain_text",
    }
);

impl MediaCategory {
    /// Detect the category from magic bytes. Anything unrecognized is treated as text.
    pub fn sniff(bytes: &[u8]) -> Self {
        if bytes.starts_with(b"%PDF") {
            Self::Pdf
        } else if bytes.starts_with(&[0x89, b'P', b'N', b'G'])
            || bytes.starts_with(&[0xFF, 0xD8, 0xFF])
            || bytes.starts_with(b"II*\0")
            || bytes.starts_with(b"MM\0*")
        {
            Self::Image
        } else {
            Self::PlainText
        }
    }
}

str_enum!(
    /// Extraction layer that produced a field proposal.
    SourceLayer {
        Query => "query",
        Llm => "llm",
        Regex => "regex",
    }
);

impl SourceLayer {
    /// Lower rank wins: query > llm > regex.
    pub fn precedence(&self) -> u8 {
        match self {
            Self::Query => 0,
            Self::Llm => 1,
            Self::Regex => 2,
        }
    }
}

str_enum!(
    /// Classifier stage that produced (or scored) a label.
    ClassificationSource {
        Heuristic => "heuristic",
        Ml => "ml",
        Llm => "llm",
    }
);

str_enum!(ConfidenceTier {
    High => "high",
    Medium => "medium",
    Low => "low",
});

str_enum!(
    /// How extraction should lean for a matched template.
    ExtractionStrategy {
        Deterministic => "deterministic",
        LlmPrimary => "llm_primary",
        LlmOnly => "llm_only",
    }
);

str_enum!(
    /// Value shape of a field; drives regex selection, coercion and comparison.
    FieldKind {
        Amount => "amount",
        Ssn => "ssn",
        Ein => "ein",
        Tin => "tin",
        Phone => "phone",
        Date => "date",
        Zip => "zip",
        Year => "year",
        Text => "text",
    }
);

impl FieldKind {
    /// Identifiers compare on alphanumerics only.
    pub fn is_identifier(&self) -> bool {
        matches!(
            self,
            Self::Ssn | Self::Ein | Self::Tin | Self::Phone | Self::Zip
        )
    }

    /// Key-substring lookup: the key is split into words (`Box1_Wages` ->
    /// `box1`, `wages`; `EmployerEIN` -> `employer`, `ein`) and the first table
    /// entry matching any word decides. Short needles must match a whole word.
    pub fn infer_from_key(field_key: &str) -> Self {
        const TABLE: &[(&str, FieldKind)] = &[
            ("ssn", FieldKind::Ssn),
            ("ein", FieldKind::Ein),
            ("tin", FieldKind::Tin),
            ("phone", FieldKind::Phone),
            ("zip", FieldKind::Zip),
            ("year", FieldKind::Year),
            ("date", FieldKind::Date),
            ("period", FieldKind::Date),
            ("wage", FieldKind::Amount),
            ("tax", FieldKind::Amount),
            ("amount", FieldKind::Amount),
            ("pay", FieldKind::Amount),
            ("compensation", FieldKind::Amount),
            ("income", FieldKind::Amount),
            ("interest", FieldKind::Amount),
            ("dividend", FieldKind::Amount),
            ("deduction", FieldKind::Amount),
            ("total", FieldKind::Amount),
            ("gross", FieldKind::Amount),
            ("net", FieldKind::Amount),
        ];

        let words = split_key_words(field_key);
        TABLE
            .iter()
            .find(|(needle, _)| words.iter().any(|w| word_matches(w, needle)))
            .map(|(_, kind)| *kind)
            .unwrap_or(FieldKind::Text)
    }
}

fn word_matches(word: &str, needle: &str) -> bool {
    if needle.len() < 4 {
        word == needle || word.strip_suffix('s') == Some(needle)
    } else {
        word.starts_with(needle)
    }
}

/// Split a field key on `_` and lower->upper case transitions, lowercased.
fn split_key_words(key: &str) -> Vec<String> {
    let mut words = Vec::new();
    let mut current = String::new();
    let mut prev_lower = false;

    for c in key.chars() {
        if c == '_' || c == '-' || c == ' ' {
            if !current.is_empty() {
                words.push(std::mem::take(&mut current));
            }
            prev_lower = false;
            continue;
        }
        if c.is_uppercase() && prev_lower && !current.is_empty() {
            words.push(std::mem::take(&mut current));
        }
        prev_lower = c.is_lowercase() || c.is_ascii_digit();
        current.extend(c.to_lowercase());
    }
    if !current.is_empty() {
        words.push(current);
    }
    words
}

str_enum!(
    /// Coarse lifecycle stage names (the `Extracting` stage carries its layer separately).
    StageName {
        Received => "received",
        Classified => "classified",
        Extracting => "extracting",
        Merged => "merged",
        Validated => "validated",
        Completed => "completed",
        Failed => "failed",
    }
);
