use crate::config::InputConfig;
use crate::error::JoinError;
use crate::topology::Topology;
use crate::types::{CountyGeometry, EducationRecord, Fips};
use anyhow::{Context, Result};
use std::collections::HashMap;
use tracing::info;

/// Both upstream datasets, parsed.
#[derive(Debug, Clone)]
pub struct Datasets {
    pub topology: Topology,
    pub education: Vec<EducationRecord>,
}

impl Datasets {
    pub fn parse(counties: &[u8], education: &[u8]) -> Result<Self> {
        let topology = Topology::from_slice(counties).context("Failed to parse county topology")?;
        let education: Vec<EducationRecord> =
            serde_json::from_slice(education).context("Failed to parse education records")?;
        Ok(Self {
            topology,
            education,
        })
    }
}

/// Fetches both sources concurrently and returns once both have
/// arrived. Either failure fails the whole load.
pub async fn fetch_datasets(input: &InputConfig) -> Result<Datasets> {
    info!("Loading data...");
    let client = reqwest::Client::builder()
        .user_agent(concat!("county-choropleth/", env!("CARGO_PKG_VERSION")))
        .build()
        .context("Failed to build HTTP client")?;

    let (counties, education) = tokio::try_join!(
        fetch_source(&client, &input.counties_url),
        fetch_source(&client, &input.education_url),
    )?;
    info!(
        counties_bytes = counties.len(),
        education_bytes = education.len(),
        "fetched datasets"
    );

    let datasets = Datasets::parse(&counties, &education)?;
    info!(
        arcs = datasets.topology.arc_count(),
        records = datasets.education.len(),
        "parsed datasets"
    );
    Ok(datasets)
}

async fn fetch_source(client: &reqwest::Client, source: &str) -> Result<Vec<u8>> {
    if source.starts_with("http://") || source.starts_with("https://") {
        let resp = client
            .get(source)
            .send()
            .await
            .and_then(|resp| resp.error_for_status())
            .with_context(|| format!("Failed to fetch {source}"))?;
        let body = resp
            .bytes()
            .await
            .with_context(|| format!("Failed to read response body from {source}"))?;
        Ok(body.to_vec())
    } else {
        tokio::fs::read(source)
            .await
            .with_context(|| format!("Failed to read {source}"))
    }
}

/// Matches county shapes to their statistics by scanning the records.
#[derive(Debug, Clone, Copy)]
pub struct Joiner<'a> {
    records: &'a [EducationRecord],
}

impl<'a> Joiner<'a> {
    pub fn new(records: &'a [EducationRecord]) -> Self {
        Self { records }
    }

    /// First record with a matching FIPS code.
    pub fn lookup(&self, fips: Fips) -> Result<&'a EducationRecord, JoinError> {
        self.records
            .iter()
            .find(|record| record.fips == fips)
            .ok_or(JoinError::Missing { fips })
    }

    /// Every county that does not have exactly one record.
    pub fn audit(&self, counties: &[CountyGeometry]) -> Vec<JoinError> {
        let mut counts: HashMap<Fips, usize> = HashMap::new();
        for record in self.records {
            *counts.entry(record.fips).or_default() += 1;
        }

        counties
            .iter()
            .filter_map(|county| match counts.get(&county.id).copied().unwrap_or(0) {
                1 => None,
                0 => Some(JoinError::Missing { fips: county.id }),
                count => Some(JoinError::Duplicate {
                    fips: county.id,
                    count,
                }),
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixtures;

    #[test]
    fn every_fixture_county_has_exactly_one_record() {
        let datasets = fixtures::datasets();
        let counties = datasets.topology.counties("counties").unwrap();
        let joiner = Joiner::new(&datasets.education);

        assert!(joiner.audit(&counties).is_empty());
        for county in &counties {
            assert_eq!(joiner.lookup(county.id).unwrap().fips, county.id);
        }
    }

    #[test]
    fn lookup_matches_string_and_numeric_fips() {
        let records: Vec<EducationRecord> = serde_json::from_str(
            r#"[{ "fips": "01001", "state": "AL", "area_name": "Autauga County", "bachelorsOrHigher": 21.6 }]"#,
        )
        .unwrap();
        let record = Joiner::new(&records).lookup(Fips(1001)).unwrap();
        assert_eq!(record.area_name, "Autauga County");
        assert_eq!(record.bachelors_or_higher, 21.6);
    }

    #[test]
    fn missing_and_duplicate_records_are_reported() {
        let datasets = fixtures::datasets();
        let counties = datasets.topology.counties("counties").unwrap();

        let mut records = fixtures::records();
        records.retain(|r| r.fips != Fips(1003));
        records.push(records[0].clone());
        let joiner = Joiner::new(&records);

        assert_eq!(
            joiner.lookup(Fips(1003)).unwrap_err(),
            JoinError::Missing { fips: Fips(1003) }
        );
        assert_eq!(
            joiner.audit(&counties),
            vec![
                JoinError::Duplicate {
                    fips: Fips(1001),
                    count: 2
                },
                JoinError::Missing { fips: Fips(1003) },
            ]
        );
    }

    #[tokio::test]
    async fn loads_local_sources() {
        let dir = std::env::temp_dir().join(format!("county-choropleth-{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        let counties = dir.join("counties.json");
        let education = dir.join("education.json");
        std::fs::write(&counties, fixtures::TOPOLOGY).unwrap();
        std::fs::write(&education, fixtures::EDUCATION).unwrap();

        let input = InputConfig {
            counties_url: counties.display().to_string(),
            education_url: education.display().to_string(),
            ..InputConfig::default()
        };
        let datasets = fetch_datasets(&input).await.unwrap();
        assert_eq!(datasets.education.len(), 3);
        assert_eq!(datasets.topology.arc_count(), 6);

        let missing = InputConfig {
            education_url: dir.join("nope.json").display().to_string(),
            ..input
        };
        assert!(fetch_datasets(&missing).await.is_err());

        std::fs::remove_dir_all(&dir).unwrap();
    }
}
