use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum OrderKind {
    Hjb,
    Hws,
}

impl OrderKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            OrderKind::Hjb => "HJB",
            OrderKind::Hws => "HWS",
        }
    }

    pub fn from_str(s: &str) -> rusqlite::Result<Self> {
        match s {
            "HJB" => Ok(OrderKind::Hjb),
            "HWS" => Ok(OrderKind::Hws),
            other => Err(rusqlite::Error::InvalidColumnType(
                0,
                format!("unknown order kind {other}"),
                rusqlite::types::Type::Text,
            )),
        }
    }

    /// Formats a plan id as `<prefix><9-digit zero-padded sequence>`, matching the
    /// wire-level format `^HJB[0-9]{9}$` / `^HWS[0-9]{9}$` (§6).
    pub fn format_plan_id(&self, sequence: i64) -> String {
        format!("{}{:09}", self.as_str(), sequence)
    }
}
