//! Hit extraction from BLAST XML (`-outfmt 5`) result files.
//!
//! Only the parts of the report needed to rank hits are deserialized; statistics,
//! HSP details and parameters are skipped.

use serde::Deserialize;
use std::fs;
use std::io;
use std::path::Path;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum BlastXmlError {
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
    #[error("Malformed BLAST XML: {0}")]
    Malformed(#[from] quick_xml::DeError),
}

#[derive(Debug, Deserialize)]
#[serde(rename = "BlastOutput")]
struct BlastOutputXml {
    #[serde(rename = "BlastOutput_iterations", default)]
    iterations: IterationsXml,
}

#[derive(Debug, Default, Deserialize)]
struct IterationsXml {
    #[serde(rename = "Iteration", default)]
    items: Vec<IterationXml>,
}

#[derive(Debug, Deserialize)]
struct IterationXml {
    #[serde(rename = "Iteration_hits", default)]
    hits: IterationHitsXml,
}

#[derive(Debug, Default, Deserialize)]
struct IterationHitsXml {
    #[serde(rename = "Hit", default)]
    items: Vec<HitXml>,
}

#[derive(Debug, Deserialize)]
struct HitXml {
    #[serde(rename = "Hit_id", default)]
    id: Option<String>,
    #[serde(rename = "Hit_def", default)]
    def: Option<String>,
}

impl HitXml {
    /// The database identifier of the subject: the first token of its definition line,
    /// which is the FASTA identifier when the database was indexed without parsed
    /// sequence ids. Falls back to `Hit_id`.
    fn identifier(&self) -> Option<String> {
        self.def
            .as_deref()
            .and_then(|def| def.split_whitespace().next())
            .or_else(|| self.id.as_deref().map(str::trim).filter(|id| !id.is_empty()))
            .map(str::to_string)
    }
}

/// Hit identifiers per query iteration, each in the tool's rank order.
pub fn parse_hit_ids(xml: &str) -> Result<Vec<Vec<String>>, BlastXmlError> {
    let output: BlastOutputXml = quick_xml::de::from_str(xml)?;
    Ok(output
        .iterations
        .items
        .iter()
        .map(|iteration| {
            iteration
                .hits
                .items
                .iter()
                .filter_map(HitXml::identifier)
                .collect()
        })
        .collect())
}

pub fn read_hit_ids_from_path(path: &Path) -> Result<Vec<Vec<String>>, BlastXmlError> {
    let xml = fs::read_to_string(path)?;
    parse_hit_ids(&xml)
}

#[cfg(test)]
pub(crate) fn sample_report(hit_defs: &[&str]) -> String {
    let hits: String = hit_defs
        .iter()
        .enumerate()
        .map(|(i, def)| {
            format!(
                "<Hit><Hit_num>{n}</Hit_num><Hit_id>gnl|BL_ORD_ID|{i}</Hit_id>\
                 <Hit_def>{def}</Hit_def><Hit_accession>{i}</Hit_accession><Hit_len>120</Hit_len>\
                 <Hit_hsps><Hsp><Hsp_num>1</Hsp_num><Hsp_evalue>1e-30</Hsp_evalue></Hsp></Hit_hsps></Hit>",
                n = i + 1
            )
        })
        .collect();
    format!(
        r#"<?xml version="1.0"?>
<!DOCTYPE BlastOutput PUBLIC "-//NCBI//NCBI BlastOutput/EN" "http://www.ncbi.nlm.nih.gov/dtd/NCBI_BlastOutput.dtd">
<BlastOutput>
  <BlastOutput_program>blastp</BlastOutput_program>
  <BlastOutput_version>BLASTP 2.15.0+</BlastOutput_version>
  <BlastOutput_db>db</BlastOutput_db>
  <BlastOutput_query-ID>Query_1</BlastOutput_query-ID>
  <BlastOutput_query-def>query</BlastOutput_query-def>
  <BlastOutput_query-len>120</BlastOutput_query-len>
  <BlastOutput_param><Parameters><Parameters_expect>1e-05</Parameters_expect></Parameters></BlastOutput_param>
  <BlastOutput_iterations>
    <Iteration>
      <Iteration_iter-num>1</Iteration_iter-num>
      <Iteration_query-ID>Query_1</Iteration_query-ID>
      <Iteration_hits>
{hits}
      </Iteration_hits>
      <Iteration_stat><Statistics><Statistics_db-num>50</Statistics_db-num></Statistics></Iteration_stat>
    </Iteration>
  </BlastOutput_iterations>
</BlastOutput>
"#
    )
}
