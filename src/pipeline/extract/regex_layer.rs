//! Deterministic last layer: label-anchored patterns per field kind, plus a
//! generic entity sweep for documents whose type has no field map.

use std::collections::BTreeSet;

use crate::models::catalog::{self, DateRange, DocumentProfile, FieldSpec};
use crate::models::{FieldKind, FieldProposal, FieldValue, SourceLayer, TextCorpus};
use crate::pipeline::classify::heuristic::{normalize_text, phrase_positions};

use super::values::{candidates, coerce, looks_like_money, pattern_for, preferred};

/// One field label found on a line.
#[derive(Debug, Clone, Copy, PartialEq)]
struct LabelHit {
    key: &'static str,
    start: usize,
    end: usize,
}

/// Fill fields no earlier layer proposed, and re-check identifier fields
/// regardless. Free-text fields are left to the other layers.
pub fn run_regex_layer(
    corpus: &TextCorpus,
    profile: &DocumentProfile,
    already_proposed: &BTreeSet<String>,
    confidence: f32,
) -> Vec<FieldProposal> {
    let lines = normalized_lines(corpus);
    let hits: Vec<Vec<LabelHit>> = lines.iter().map(|l| label_hits(l, profile)).collect();
    let mut filled: BTreeSet<&str> = BTreeSet::new();
    let mut claimed: BTreeSet<String> = BTreeSet::new();
    let mut proposals = Vec::new();

    for range in profile.date_ranges {
        let Some((start, end)) = find_range(&lines, &hits, range) else {
            continue;
        };
        for (key, value) in [(range.start_key, start), (range.end_key, end)] {
            if !already_proposed.contains(key) {
                filled.insert(key);
                proposals.push(FieldProposal::new(key, value, confidence, SourceLayer::Regex));
            }
        }
    }

    for spec in profile.fields {
        let kind = spec.kind();
        if kind == FieldKind::Text || filled.contains(spec.key) {
            continue;
        }
        if already_proposed.contains(spec.key) && !kind.is_identifier() {
            continue;
        }

        let raw = find_labeled(&lines, &hits, spec, kind).or_else(|| {
            if kind.is_identifier() {
                find_unclaimed(&lines, kind, &claimed)
            } else {
                None
            }
        });

        let Some(raw) = raw else {
            tracing::debug!(field = spec.key, "Regex layer found no value");
            continue;
        };
        if let Some(value) = coerce(kind, &raw) {
            claimed.insert(raw);
            proposals.push(FieldProposal::new(spec.key, value, confidence, SourceLayer::Regex));
        }
    }

    proposals
}

/// Document-wide sweep for high-value entities, keyed by entity name.
/// Amounts must look like money; each matched string is used once.
pub fn run_entity_sweep(corpus: &TextCorpus, confidence: f32) -> Vec<FieldProposal> {
    let lines = normalized_lines(corpus);
    let mut claimed: BTreeSet<String> = BTreeSet::new();
    let mut proposals = Vec::new();

    for key in catalog::GENERIC_ENTITIES {
        let kind = FieldKind::infer_from_key(key);
        let raw = lines
            .iter()
            .flat_map(|line| candidates(kind, line))
            .filter(|c| kind != FieldKind::Amount || looks_like_money(c))
            .find(|c| !claimed.contains(c));

        let Some(raw) = raw else {
            continue;
        };
        if let Some(value) = coerce(kind, &raw) {
            claimed.insert(raw);
            proposals.push(FieldProposal::new(*key, value, confidence, SourceLayer::Regex));
        }
    }

    tracing::debug!(entities = proposals.len(), "Generic entity sweep finished");
    proposals
}

fn normalized_lines(corpus: &TextCorpus) -> Vec<String> {
    corpus.lines().iter().map(|l| normalize_text(&l.text)).collect()
}

/// Every field label of the profile on `line`, left to right. A hit that
/// overlaps another field's label starting earlier (or as early and longer)
/// is dropped, so `gross pay` inside `ytd gross pay` does not count.
fn label_hits(line: &str, profile: &DocumentProfile) -> Vec<LabelHit> {
    let all: Vec<LabelHit> = profile
        .fields
        .iter()
        .flat_map(move |spec| {
            spec.labels.iter().flat_map(move |label| {
                phrase_positions(line, label).map(move |start| LabelHit {
                    key: spec.key,
                    start,
                    end: start + label.len(),
                })
            })
        })
        .collect();

    let mut hits: Vec<LabelHit> = all
        .iter()
        .copied()
        .filter(|h| {
            !all.iter().any(|o| {
                o.key != h.key
                    && o.start < h.end
                    && h.start < o.end
                    && (o.start < h.start || (o.start == h.start && o.end > h.end))
            })
        })
        .collect();
    hits.sort_by_key(|h| (h.start, std::cmp::Reverse(h.end)));
    hits
}

/// Field keys of a label row in column order, one entry per field.
fn column_keys(hits: &[LabelHit]) -> Vec<&'static str> {
    let mut keys: Vec<&'static str> = Vec::new();
    for hit in hits {
        if !keys.contains(&hit.key) {
            keys.push(hit.key);
        }
    }
    keys
}

/// Text before the first label on a line, where a value row's values live.
fn value_row<'a>(line: &'a str, hits: &[LabelHit]) -> &'a str {
    let head = hits.iter().map(|h| h.start).min().unwrap_or(line.len());
    &line[..head]
}

/// Value after the field's label on the same line, stopping at the next
/// field's label. Otherwise the value under the label on the following line,
/// chosen by the label's column when the row holds several labels.
fn find_labeled(
    lines: &[String],
    hits: &[Vec<LabelHit>],
    spec: &FieldSpec,
    kind: FieldKind,
) -> Option<String> {
    for (i, line) in lines.iter().enumerate() {
        let row = &hits[i];
        let Some(own) = row.iter().find(|h| h.key == spec.key) else {
            continue;
        };

        let stop = row
            .iter()
            .filter(|h| h.key != spec.key && h.start >= own.end)
            .map(|h| h.start)
            .min()
            .unwrap_or(line.len());
        if let Some(value) = preferred(kind, candidates(kind, &line[own.end..stop])) {
            return Some(value);
        }

        let Some(next) = lines.get(i + 1) else {
            continue;
        };
        let below = candidates(kind, value_row(next, &hits[i + 1]));
        let columns = column_keys(row);
        let picked = if columns.len() <= 1 {
            preferred(kind, below)
        } else {
            let column = columns.iter().position(|k| *k == spec.key)?;
            below.into_iter().nth(column)
        };
        if picked.is_some() {
            return picked;
        }
    }
    None
}

/// A labeled `start - end` date span on one line, or on the line below.
fn find_range(
    lines: &[String],
    hits: &[Vec<LabelHit>],
    range: &DateRange,
) -> Option<(FieldValue, FieldValue)> {
    for (i, line) in lines.iter().enumerate() {
        for label in range.labels {
            let Some(start) = phrase_positions(line, label).next() else {
                continue;
            };
            let end = start + label.len();
            let stop = hits[i]
                .iter()
                .filter(|h| h.start >= end)
                .map(|h| h.start)
                .min()
                .unwrap_or(line.len());

            let mut dates = candidates(FieldKind::Date, &line[end..stop]);
            if dates.len() < 2 {
                if let Some(next) = lines.get(i + 1) {
                    dates = candidates(FieldKind::Date, value_row(next, &hits[i + 1]));
                }
            }
            if let [first, second, ..] = dates.as_slice() {
                if let (Some(from), Some(to)) =
                    (coerce(FieldKind::Date, first), coerce(FieldKind::Date, second))
                {
                    return Some((from, to));
                }
            }
        }
    }
    None
}

/// First document-wide match not already taken by another field, so two
/// TIN fields on one form get the payer's and the recipient's in order.
fn find_unclaimed(lines: &[String], kind: FieldKind, claimed: &BTreeSet<String>) -> Option<String> {
    let pattern = pattern_for(kind)?;
    lines
        .iter()
        .flat_map(|line| pattern.find_iter(line))
        .map(|m| m.as_str().trim().to_string())
        .find(|s| !claimed.contains(s))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::catalog;
    use crate::models::{DocumentType, FieldValue, TextLine};
    use chrono::NaiveDate;

    fn corpus(lines: &[&str]) -> TextCorpus {
        TextCorpus::new(lines.iter().map(|l| TextLine::new(*l, 0.95)).collect())
    }

    fn value_of<'a>(proposals: &'a [FieldProposal], key: &str) -> Option<&'a FieldValue> {
        proposals.iter().find(|p| p.field_key == key).map(|p| &p.value)
    }

    #[test]
    fn w2_amounts_after_labels() {
        let c = corpus(&[
            "W-2 Wage and Tax Statement",
            "Wages, tips, other compensation $50,000.00",
            "Federal income tax withheld $8,500.00",
        ]);
        let proposals = run_regex_layer(&c, catalog::profile(DocumentType::W2), &BTreeSet::new(), 0.6);

        assert_eq!(proposals.len(), 2);
        assert_eq!(value_of(&proposals, "Box1_Wages"), Some(&FieldValue::Number(50000.0)));
        assert_eq!(
            value_of(&proposals, "Box2_FederalTaxWithheld"),
            Some(&FieldValue::Number(8500.0))
        );
        assert!(proposals.iter().all(|p| p.source_layer == SourceLayer::Regex && p.confidence == 0.6));
    }

    #[test]
    fn value_on_next_line() {
        let c = corpus(&["Net pay", "$1,520.10"]);
        let proposals =
            run_regex_layer(&c, catalog::profile(DocumentType::Paystub), &BTreeSet::new(), 0.6);
        assert_eq!(value_of(&proposals, "NetPay"), Some(&FieldValue::Number(1520.10)));
    }

    #[test]
    fn present_fields_skipped_but_identifiers_rechecked() {
        let c = corpus(&[
            "Wages, tips, other compensation 50000.00",
            "Employee's social security number 123-45-6789",
        ]);
        let present: BTreeSet<String> =
            ["Box1_Wages".to_string(), "EmployeeSSN".to_string()].into();
        let proposals = run_regex_layer(&c, catalog::profile(DocumentType::W2), &present, 0.6);
        assert!(value_of(&proposals, "Box1_Wages").is_none());
        assert_eq!(
            value_of(&proposals, "EmployeeSSN"),
            Some(&FieldValue::Text("123-45-6789".into()))
        );
    }

    #[test]
    fn unlabeled_identifier_found_anywhere() {
        let c = corpus(&["copy b", "987-65-4321 jane doe", "12-3456789 acme corp"]);
        let proposals = run_regex_layer(&c, catalog::profile(DocumentType::W2), &BTreeSet::new(), 0.6);
        assert_eq!(
            value_of(&proposals, "EmployeeSSN"),
            Some(&FieldValue::Text("987-65-4321".into()))
        );
        assert_eq!(
            value_of(&proposals, "EmployerEIN"),
            Some(&FieldValue::Text("12-3456789".into()))
        );
    }

    #[test]
    fn two_tins_claimed_in_order() {
        let c = corpus(&["Form 1099-NEC", "11-2223333", "444-55-6666"]);
        let proposals =
            run_regex_layer(&c, catalog::profile(DocumentType::Form1099Nec), &BTreeSet::new(), 0.6);
        assert_eq!(value_of(&proposals, "PayerTIN"), Some(&FieldValue::Text("11-2223333".into())));
        assert_eq!(
            value_of(&proposals, "RecipientTIN"),
            Some(&FieldValue::Text("444-55-6666".into()))
        );
    }

    #[test]
    fn box_numbers_and_next_label_bound_the_same_line() {
        let c = corpus(&[
            "1 Wages, tips, other compensation 2 Federal income tax withheld",
            "50000.00 8500.00",
        ]);
        let proposals = run_regex_layer(&c, catalog::profile(DocumentType::W2), &BTreeSet::new(), 0.6);
        assert_eq!(value_of(&proposals, "Box1_Wages"), Some(&FieldValue::Number(50000.0)));
        assert_eq!(
            value_of(&proposals, "Box2_FederalTaxWithheld"),
            Some(&FieldValue::Number(8500.0))
        );
    }

    #[test]
    fn value_row_is_read_by_column() {
        let c = corpus(&[
            "Wages, tips, other compensation Federal income tax withheld",
            "$50,000.00 $8,500.00",
            "Social security wages Social security tax withheld",
            "50,000.00 3,100.00",
        ]);
        let proposals = run_regex_layer(&c, catalog::profile(DocumentType::W2), &BTreeSet::new(), 0.6);
        assert_eq!(value_of(&proposals, "Box1_Wages"), Some(&FieldValue::Number(50000.0)));
        assert_eq!(
            value_of(&proposals, "Box2_FederalTaxWithheld"),
            Some(&FieldValue::Number(8500.0))
        );
        assert_eq!(
            value_of(&proposals, "Box3_SocialSecurityWages"),
            Some(&FieldValue::Number(50000.0))
        );
        assert_eq!(
            value_of(&proposals, "Box4_SocialSecurityTaxWithheld"),
            Some(&FieldValue::Number(3100.0))
        );
    }

    #[test]
    fn inline_values_between_labels() {
        let c = corpus(&["Wages, tips, other compensation 50000.00 Federal income tax withheld 8500.00"]);
        let proposals = run_regex_layer(&c, catalog::profile(DocumentType::W2), &BTreeSet::new(), 0.6);
        assert_eq!(value_of(&proposals, "Box1_Wages"), Some(&FieldValue::Number(50000.0)));
        assert_eq!(
            value_of(&proposals, "Box2_FederalTaxWithheld"),
            Some(&FieldValue::Number(8500.0))
        );
    }

    #[test]
    fn overlapping_label_does_not_take_the_value() {
        let c = corpus(&["YTD gross pay 24,000.00", "Gross pay 2,000.00"]);
        let proposals =
            run_regex_layer(&c, catalog::profile(DocumentType::Paystub), &BTreeSet::new(), 0.6);
        assert_eq!(value_of(&proposals, "YtdGrossPay"), Some(&FieldValue::Number(24000.0)));
        assert_eq!(value_of(&proposals, "GrossPay"), Some(&FieldValue::Number(2000.0)));
    }

    #[test]
    fn pay_period_span_fills_both_dates() {
        let c = corpus(&["Pay period: 03/01/2024 - 03/15/2024", "Pay date: 03/20/2024"]);
        let proposals =
            run_regex_layer(&c, catalog::profile(DocumentType::Paystub), &BTreeSet::new(), 0.6);
        let date = |d| FieldValue::Date(NaiveDate::from_ymd_opt(2024, 3, d).unwrap());
        assert_eq!(value_of(&proposals, "PayPeriodStart"), Some(&date(1)));
        assert_eq!(value_of(&proposals, "PayPeriodEnd"), Some(&date(15)));
        assert_eq!(value_of(&proposals, "PayDate"), Some(&date(20)));
        assert_eq!(proposals.iter().filter(|p| p.field_key == "PayPeriodStart").count(), 1);
    }

    #[test]
    fn pay_period_span_respects_earlier_layers() {
        let c = corpus(&["Pay period: 03/01/2024 - 03/15/2024"]);
        let present: BTreeSet<String> = ["PayPeriodStart".to_string()].into();
        let proposals = run_regex_layer(&c, catalog::profile(DocumentType::Paystub), &present, 0.6);
        assert!(value_of(&proposals, "PayPeriodStart").is_none());
        assert!(value_of(&proposals, "PayPeriodEnd").is_some());
    }

    #[test]
    fn sweep_finds_generic_entities() {
        let c = corpus(&[
            "Letter to taxpayer",
            "SSN 123-45-6789",
            "Phone (555) 123-4567",
            "Zip 94105",
            "Amount due $1,250.00",
        ]);
        let proposals = run_entity_sweep(&c, 0.6);

        assert_eq!(value_of(&proposals, "SSN"), Some(&FieldValue::Text("123-45-6789".into())));
        assert_eq!(
            value_of(&proposals, "Phone"),
            Some(&FieldValue::Text("(555) 123-4567".into()))
        );
        assert_eq!(value_of(&proposals, "ZipCode"), Some(&FieldValue::Text("94105".into())));
        assert_eq!(value_of(&proposals, "Amount"), Some(&FieldValue::Number(1250.0)));
        assert!(value_of(&proposals, "EIN").is_none());
        assert!(value_of(&proposals, "Year").is_none());
        assert!(proposals.iter().all(|p| p.source_layer == SourceLayer::Regex));
    }

    #[test]
    fn text_fields_are_not_guessed() {
        let c = corpus(&["Employer's name ACME Corp"]);
        let proposals = run_regex_layer(&c, catalog::profile(DocumentType::W2), &BTreeSet::new(), 0.6);
        assert!(value_of(&proposals, "EmployerName").is_none());
    }
}
