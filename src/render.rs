use crate::config::{AppConfig, LegendConfig, MissingRecord};
use crate::data::{Datasets, Joiner};
use crate::error::JoinError;
use crate::interaction::{self, FADE_MS};
use crate::projection::{line_path, polygon_path, Projection};
use crate::scale::{LinearScale, ThresholdScale};
use crate::types::{EducationRecord, Fips};
use anyhow::{Context, Result};
use askama::Template;
use askama_web::WebTemplate;
use geo::MultiPolygon;
use rayon::prelude::*;
use std::fs;
use std::path::Path;
use tracing::{info, warn};

/// A county joined with its record and projected onto the drawing surface.
#[derive(Debug, Clone)]
pub struct CountyShape {
    pub record: EducationRecord,
    pub color: String,
    pub tooltip: String,
    pub path: String,
    /// Geometry in source coordinates.
    pub source: MultiPolygon<f64>,
    /// Geometry in screen pixels.
    pub projected: MultiPolygon<f64>,
}

impl CountyShape {
    pub fn fips(&self) -> Fips {
        self.record.fips
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct LegendSwatch {
    pub x: f64,
    pub width: f64,
    pub color: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct LegendTick {
    pub x: f64,
    pub label: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Legend {
    pub x: f64,
    pub y: f64,
    pub height: f64,
    pub tick_size: f64,
    pub swatches: Vec<LegendSwatch>,
    pub ticks: Vec<LegendTick>,
}

#[derive(Debug, Clone)]
pub struct ChoroplethMap {
    pub width: u32,
    pub height: u32,
    pub title: String,
    pub description: String,
    pub counties: Vec<CountyShape>,
    pub borders: String,
    pub scale: ThresholdScale,
    pub legend: Legend,
    /// Counties dropped because they had no record.
    pub skipped: Vec<JoinError>,
}

pub fn build_map(config: &AppConfig, datasets: &Datasets) -> Result<ChoroplethMap> {
    let topology = &datasets.topology;
    let counties = topology.counties(&config.input.counties_object)?;
    let joiner = Joiner::new(&datasets.education);

    let audit = joiner.audit(&counties);
    if !audit.is_empty() {
        warn!(
            count = audit.len(),
            "join audit found counties without exactly one education record"
        );
    }

    let scale = ThresholdScale::from_values(
        datasets.education.iter().map(|r| r.bachelors_or_higher),
        &config.map.palette,
    )?;
    let (min, max) = scale.domain();
    info!(min, max, bins = scale.bin_count(), "built color scale");

    let (width, height) = (f64::from(config.map.width), f64::from(config.map.height));
    let projection = Projection::fit(
        config.map.projection,
        width,
        height,
        counties.iter().map(|c| &c.geometry),
    );

    let mut joined = Vec::with_capacity(counties.len());
    let mut skipped = Vec::new();
    for county in counties {
        match joiner.lookup(county.id) {
            Ok(record) => joined.push((county, record)),
            Err(err) => match config.map.missing_record {
                MissingRecord::Abort => return Err(err).context("Failed to join county data"),
                MissingRecord::Skip => {
                    warn!(%err, "skipping county");
                    skipped.push(err);
                }
            },
        }
    }

    let shapes: Vec<CountyShape> = joined
        .into_par_iter()
        .map(|(county, record)| {
            let projected = projection.project_polygons(&county.geometry);
            CountyShape {
                record: record.clone(),
                color: scale.forward(record.bachelors_or_higher).to_string(),
                tooltip: interaction::tooltip_text(record),
                path: polygon_path(&projected),
                source: county.geometry,
                projected,
            }
        })
        .collect();
    info!(counties = shapes.len(), skipped = skipped.len(), "joined counties");

    let mesh = topology.mesh(&config.input.states_object, config.map.borders)?;
    let borders = line_path(&projection.project_lines(&mesh));

    let legend = build_legend(&scale, config.map.width, &config.legend);

    Ok(ChoroplethMap {
        width: config.map.width,
        height: config.map.height,
        title: config.map.title.clone(),
        description: config.map.description.clone(),
        counties: shapes,
        borders,
        scale,
        legend,
        skipped,
    })
}

/// Swatches sized by bin width, with a tick at every bin boundary.
pub fn build_legend(scale: &ThresholdScale, map_width: u32, config: &LegendConfig) -> Legend {
    let axis = LinearScale::new(scale.domain(), (0.0, config.width));

    let swatches = scale
        .colors()
        .iter()
        .enumerate()
        .filter_map(|(i, color)| {
            let (lo, hi) = scale.extent(i)?;
            let x = axis.map_round(lo);
            Some(LegendSwatch {
                x,
                width: axis.map_round(hi) - x,
                color: color.clone(),
            })
        })
        .collect();

    let ticks = scale
        .boundaries()
        .into_iter()
        .map(|value| LegendTick {
            x: axis.map_round(value),
            label: format!("{}%", value.round()),
        })
        .collect();

    Legend {
        x: f64::from(map_width) * config.offset_x_ratio,
        y: config.offset_y,
        height: config.height,
        tick_size: config.tick_size,
        swatches,
        ticks,
    }
}

/// The full choropleth page, rendered from `templates/choropleth.html`.
#[derive(Template, WebTemplate)]
#[template(path = "choropleth.html")]
pub struct ChoroplethPage<'a> {
    pub map: &'a ChoroplethMap,
    pub tooltip_background: &'a str,
    pub fade_ms: u32,
    pub script: String,
}

impl<'a> ChoroplethPage<'a> {
    pub fn new(map: &'a ChoroplethMap) -> Self {
        Self {
            map,
            tooltip_background: map.scale.colors().last().map(String::as_str).unwrap_or("black"),
            fade_ms: FADE_MS,
            script: interaction::browser_script(),
        }
    }
}

impl Legend {
    pub fn translate(&self) -> String {
        format!("translate({},{})", self.x, self.y)
    }

    /// Baseline of tick labels, just below the tick marks.
    pub fn label_y(&self) -> f64 {
        self.tick_size + 3.0
    }
}

pub fn render_page(map: &ChoroplethMap) -> Result<String> {
    ChoroplethPage::new(map)
        .render()
        .context("Failed to render choropleth page")
}

pub fn write_page(path: &Path, map: &ChoroplethMap) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).context("Failed to create output directory")?;
    }
    fs::write(path, render_page(map)?)
        .with_context(|| format!("Failed to write page: {:?}", path))?;
    info!(?path, "wrote choropleth page");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixtures;

    fn fixture_map(config: &AppConfig) -> Result<ChoroplethMap> {
        build_map(config, &fixtures::datasets())
    }

    #[test]
    fn joins_and_colors_every_county() {
        let map = fixture_map(&AppConfig::default()).unwrap();
        assert!(map.skipped.is_empty());
        assert_eq!(map.counties.len(), 3);
        assert_eq!(map.scale.domain(), (12.3, 28.6));

        let autauga = &map.counties[0];
        assert_eq!(autauga.fips(), Fips(1001));
        assert_eq!(autauga.color, map.scale.forward(21.6));
        assert_eq!(autauga.tooltip, "Autauga County, AL: 21.6%");
        assert_eq!(autauga.path, "M10,0L10,10L0,10L0,0Z");

        assert_eq!(map.counties[2].color, "#eff3ff");
        assert_eq!(map.counties[1].color, "#084594");
    }

    #[test]
    fn borders_follow_the_state_line() {
        let map = fixture_map(&AppConfig::default()).unwrap();
        assert_eq!(map.borders, "M20,0L20,10");
    }

    #[test]
    fn legend_swatches_cover_the_axis() {
        let map = fixture_map(&AppConfig::default()).unwrap();
        let legend = &map.legend;

        assert!((legend.x - 617.5).abs() < 1e-9);
        assert_eq!(legend.y, 40.0);
        assert_eq!(legend.swatches.len(), 7);
        assert_eq!(legend.swatches[0].x, 0.0);
        let right = legend.swatches.last().map(|s| s.x + s.width).unwrap();
        assert_eq!(right, 200.0);
        for pair in legend.swatches.windows(2) {
            assert_eq!(pair[0].x + pair[0].width, pair[1].x);
        }

        let labels: Vec<&str> = legend.ticks.iter().map(|t| t.label.as_str()).collect();
        assert_eq!(labels.len(), 8);
        assert_eq!(labels.first(), Some(&"12%"));
        assert_eq!(labels.last(), Some(&"29%"));
    }

    #[test]
    fn missing_record_is_skipped_or_aborts() {
        let mut datasets = fixtures::datasets();
        datasets.education.retain(|r| r.fips != Fips(1003));

        let map = build_map(&AppConfig::default(), &datasets).unwrap();
        assert_eq!(map.counties.len(), 2);
        assert_eq!(map.skipped, vec![JoinError::Missing { fips: Fips(1003) }]);

        let mut config = AppConfig::default();
        config.map.missing_record = MissingRecord::Abort;
        let err = build_map(&config, &datasets).unwrap_err();
        assert_eq!(
            err.downcast_ref::<JoinError>(),
            Some(&JoinError::Missing { fips: Fips(1003) })
        );
    }

    #[test]
    fn page_carries_shape_metadata_tooltip_and_legend() {
        let map = fixture_map(&AppConfig::default()).unwrap();
        let page = render_page(&map).unwrap();

        assert!(page.contains(r#"<h1 id="title">United States Educational Attainment</h1>"#));
        assert!(page.contains("at least a bachelor&"));
        assert!(!page.contains("bachelor's degree"));
        assert!(page.contains(r#"<svg width="950" height="600">"#));
        assert_eq!(page.matches(r#"class="county""#).count(), 3);
        assert!(page.contains(&format!(
            r#"fill="{}" data-fips="1001" data-education="21.6" data-tooltip="Autauga County, AL: 21.6%""#,
            map.scale.forward(21.6)
        )));
        assert!(page.contains(r#"<path class="stateBorder" fill="none" stroke="black" d="M20,0L20,10">"#));
        assert!(page.contains(r#"<g id="legend">"#));
        assert_eq!(page.matches("<rect ").count(), 7);
        assert_eq!(page.matches(r#"class="tick""#).count(), 8);
        assert!(!page.contains(r#"class="domain""#));
        assert!(page.contains(r#"<div id="tooltip" style="opacity: 0;"#));
        assert!(page.contains("background-color: #084594"));
    }

    #[test]
    fn escapes_markup_in_names() {
        let mut datasets = fixtures::datasets();
        datasets.education[0].area_name = r#"Doña <Ana> & "Co""#.to_string();
        let map = build_map(&AppConfig::default(), &datasets).unwrap();
        let page = render_page(&map).unwrap();

        assert!(page.contains("Doña &lt;Ana&gt; &amp; &"));
        assert!(page.contains("Co&"));
        assert!(!page.contains("<Ana>"));
        assert!(!page.contains(r#""Co""#));
    }
}
