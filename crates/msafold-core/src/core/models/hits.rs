use serde::Serialize;
use std::collections::HashSet;
use std::io::{self, Write};

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Hit {
    /// 1 is the best match.
    pub rank: usize,
    pub id: String,
}

/// Hit identifiers in the search tool's own rank order, bounded by the configured
/// top-N. Duplicate identifiers (several HSPs of one subject) keep their first rank.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HitList {
    hits: Vec<Hit>,
}

impl HitList {
    pub fn from_ranked_ids<I, S>(ids: I, top_n: usize) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut seen = HashSet::new();
        let hits = ids
            .into_iter()
            .map(Into::into)
            .filter(|id| seen.insert(id.clone()))
            .take(top_n)
            .enumerate()
            .map(|(i, id)| Hit { rank: i + 1, id })
            .collect();
        Self { hits }
    }

    pub fn len(&self) -> usize {
        self.hits.len()
    }

    pub fn is_empty(&self) -> bool {
        self.hits.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Hit> {
        self.hits.iter()
    }

    pub fn ids(&self) -> HashSet<&str> {
        self.hits.iter().map(|h| h.id.as_str()).collect()
    }

    /// Writes the list as a tab-separated `rank`/`id` table.
    pub fn write_tsv(&self, writer: impl Write) -> io::Result<()> {
        let mut wtr = csv::WriterBuilder::new()
            .delimiter(b'\t')
            .from_writer(writer);
        for hit in &self.hits {
            wtr.serialize(hit).map_err(io::Error::other)?;
        }
        wtr.flush()
    }
}
