use super::FieldMap;

#[derive(Debug, Clone, PartialEq)]
pub struct Completeness {
    pub score: f32,
    pub missing: Vec<String>,
}

/// Share of required fields that are present and non-blank. A type with no
/// required fields is complete.
pub fn score(fields: &FieldMap, required: &[&str]) -> Completeness {
    if required.is_empty() {
        return Completeness {
            score: 1.0,
            missing: Vec::new(),
        };
    }

    let missing: Vec<String> = required
        .iter()
        .filter(|key| fields.get(**key).map_or(true, |f| f.value.is_blank()))
        .map(|key| key.to_string())
        .collect();

    let present = required.len() - missing.len();
    Completeness {
        score: present as f32 / required.len() as f32,
        missing,
    }
}
