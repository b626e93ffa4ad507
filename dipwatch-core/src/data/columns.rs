//! Column-label resolution for raw supplier tables.
//!
//! Suppliers label columns inconsistently: `Close`, `close`,
//! `Close_VWRL.AS`, `('Close', 'VWRL.AS')`, `VWRL.AS Close`. Labels are
//! split into lowercase alphanumeric tokens, the ticker's own tokens are
//! removed once each, and the label resolves to a field when exactly one
//! field token remains. Anything mentioning `adj` is an adjusted close and
//! never resolves.

use std::collections::BTreeMap;

/// Canonical fields of a price table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Field {
    Date,
    Open,
    High,
    Low,
    Close,
    Volume,
}

impl Field {
    pub fn as_str(&self) -> &'static str {
        match self {
            Field::Date => "date",
            Field::Open => "open",
            Field::High => "high",
            Field::Low => "low",
            Field::Close => "close",
            Field::Volume => "volume",
        }
    }

    fn from_token(token: &str) -> Option<Field> {
        match token {
            "date" | "datetime" | "timestamp" | "time" | "index" => Some(Field::Date),
            "open" => Some(Field::Open),
            "high" => Some(Field::High),
            "low" => Some(Field::Low),
            "close" => Some(Field::Close),
            "volume" => Some(Field::Volume),
            _ => None,
        }
    }
}

fn tokenize(label: &str) -> Vec<String> {
    label
        .split(|c: char| !c.is_ascii_alphanumeric())
        .filter(|t| !t.is_empty())
        .map(|t| t.to_ascii_lowercase())
        .collect()
}

/// Resolve a single label. `ticker` tokens are stripped first when given.
pub fn resolve_label(label: &str, ticker: Option<&str>) -> Option<Field> {
    let mut tokens = tokenize(label);
    if let Some(ticker) = ticker {
        for t in tokenize(ticker) {
            if tokens.len() > 1 {
                if let Some(pos) = tokens.iter().position(|x| *x == t) {
                    tokens.remove(pos);
                }
            }
        }
    }

    if tokens.iter().any(|t| t == "adj" || t == "adjclose" || t == "adjusted") {
        return None;
    }

    let mut fields = tokens.iter().filter_map(|t| Field::from_token(t));
    let field = fields.next()?;
    if fields.next().is_some() {
        return None;
    }
    Some(field)
}

/// Mapping from canonical field to the raw column label that carries it.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ColumnMap {
    columns: BTreeMap<Field, String>,
}

impl ColumnMap {
    /// Resolve every label. When two labels claim one field, an
    /// unqualified label (exactly the field name) wins over qualified ones,
    /// otherwise the first label wins.
    pub fn resolve(labels: &[String], ticker: Option<&str>) -> Self {
        let mut columns: BTreeMap<Field, String> = BTreeMap::new();
        for label in labels {
            let Some(field) = resolve_label(label, ticker) else {
                continue;
            };
            let exact = tokenize(label) == [field.as_str()];
            match columns.get(&field) {
                None => {
                    columns.insert(field, label.clone());
                }
                Some(existing) if exact && tokenize(existing) != [field.as_str()] => {
                    columns.insert(field, label.clone());
                }
                Some(_) => {}
            }
        }
        Self { columns }
    }

    pub fn get(&self, field: Field) -> Option<&str> {
        self.columns.get(&field).map(String::as_str)
    }
}
