use rusqlite::Row;
use serde::{Deserialize, Serialize};

/// Wildcard marker used by both the machine and article fields of a [`Speed`] row
/// (§3: "machineCode, articleNr or `*`").
pub const WILDCARD: &str = "*";

/// `{machineCode, articleNr or "*", boxesPerHour, efficiency}` (§3). Resolution order
/// when computing the speed of `(machine, article)`: exact match > machine+"*" >
/// "*"+article > "*"+"*". The effective rate is `boxesPerHour × efficiency`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Speed {
    pub machine_code: String,
    pub article_nr: String,
    pub boxes_per_hour: f64,
    pub efficiency: f64,
}

impl Speed {
    pub fn from_row(row: &Row) -> rusqlite::Result<Self> {
        Ok(Self {
            machine_code: row.get("machine_code")?,
            article_nr: row.get("article_nr")?,
            boxes_per_hour: row.get("boxes_per_hour")?,
            efficiency: row.get("efficiency")?,
        })
    }

    pub fn effective_rate(&self) -> f64 {
        self.boxes_per_hour * self.efficiency
    }

    /// Specificity rank used to pick the best match among candidates: lower is more
    /// specific. Exact=0, machine+wildcard-article=1, wildcard-machine+article=2,
    /// wildcard+wildcard=3.
    fn specificity(&self, machine: &str, article: &str) -> Option<u8> {
        let machine_matches = self.machine_code == machine;
        let machine_wild = self.machine_code == WILDCARD;
        let article_matches = self.article_nr == article;
        let article_wild = self.article_nr == WILDCARD;

        match (machine_matches, machine_wild, article_matches, article_wild) {
            (true, _, true, _) => Some(0),
            (true, _, _, true) => Some(1),
            (_, true, true, _) => Some(2),
            (_, true, _, true) => Some(3),
            _ => None,
        }
    }

    /// Resolve the best-matching speed from a set of candidates for `(machine,
    /// article)`, following the resolution order in §3.
    pub fn resolve<'a>(
        candidates: impl IntoIterator<Item = &'a Speed>,
        machine: &str,
        article: &str,
    ) -> Option<&'a Speed> {
        candidates
            .into_iter()
            .filter_map(|s| s.specificity(machine, article).map(|rank| (rank, s)))
            .min_by_key(|(rank, _)| *rank)
            .map(|(_, s)| s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn speed(machine: &str, article: &str, rate: f64) -> Speed {
        Speed {
            machine_code: machine.to_string(),
            article_nr: article.to_string(),
            boxes_per_hour: rate,
            efficiency: 1.0,
        }
    }

    #[test]
    fn exact_match_wins() {
        let candidates = vec![
            speed("*", "*", 1.0),
            speed("P1", "*", 5.0),
            speed("*", "A", 7.0),
            speed("P1", "A", 10.0),
        ];
        let resolved = Speed::resolve(&candidates, "P1", "A").unwrap();
        assert_eq!(resolved.boxes_per_hour, 10.0);
    }

    #[test]
    fn falls_back_to_machine_wildcard_article() {
        let candidates = vec![speed("*", "*", 1.0), speed("P1", "*", 5.0), speed("*", "A", 7.0)];
        let resolved = Speed::resolve(&candidates, "P1", "A").unwrap();
        assert_eq!(resolved.boxes_per_hour, 5.0);
    }

    #[test]
    fn falls_back_to_wildcard_machine_article() {
        let candidates = vec![speed("*", "*", 1.0), speed("*", "A", 7.0)];
        let resolved = Speed::resolve(&candidates, "P1", "A").unwrap();
        assert_eq!(resolved.boxes_per_hour, 7.0);
    }

    #[test]
    fn falls_back_to_global_wildcard() {
        let candidates = vec![speed("*", "*", 1.0)];
        let resolved = Speed::resolve(&candidates, "P1", "A").unwrap();
        assert_eq!(resolved.boxes_per_hour, 1.0);
    }

    #[test]
    fn no_match_returns_none() {
        let candidates: Vec<Speed> = vec![speed("P2", "B", 3.0)];
        assert!(Speed::resolve(&candidates, "P1", "A").is_none());
    }
}
