use geo::{BoundingRect, Coord, LineString, MapCoords, MultiLineString, MultiPolygon, Rect};
use serde::Deserialize;
use std::fmt::Write;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProjectionKind {
    /// Coordinates are already screen pixels.
    #[default]
    Identity,
    /// Longitude/latitude in degrees, fitted to the drawing surface.
    Equirectangular,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Projection {
    Identity,
    Equirectangular { scale: f64, translate: Coord<f64> },
}

impl Projection {
    /// Builds the projection for `kind`, fitting equirectangular output so
    /// the shapes fill a `width`×`height` surface, centered.
    pub fn fit<'a, I>(kind: ProjectionKind, width: f64, height: f64, shapes: I) -> Self
    where
        I: IntoIterator<Item = &'a MultiPolygon<f64>>,
    {
        match kind {
            ProjectionKind::Identity => Projection::Identity,
            ProjectionKind::Equirectangular => {
                let bounds = shapes
                    .into_iter()
                    .filter_map(|shape| shape.map_coords(equirectangular_raw).bounding_rect())
                    .reduce(union);

                let Some(bounds) = bounds else {
                    return Projection::Equirectangular {
                        scale: 1.0,
                        translate: Coord { x: 0.0, y: 0.0 },
                    };
                };

                let (dx, dy) = (bounds.width(), bounds.height());
                let scale = match (dx > 0.0, dy > 0.0) {
                    (true, true) => (width / dx).min(height / dy),
                    (true, false) => width / dx,
                    (false, true) => height / dy,
                    (false, false) => 1.0,
                };
                let translate = Coord {
                    x: (width - scale * (bounds.min().x + bounds.max().x)) / 2.0,
                    y: (height - scale * (bounds.min().y + bounds.max().y)) / 2.0,
                };
                Projection::Equirectangular { scale, translate }
            }
        }
    }

    pub fn project(&self, coord: Coord<f64>) -> Coord<f64> {
        match self {
            Projection::Identity => coord,
            Projection::Equirectangular { scale, translate } => {
                let raw = equirectangular_raw(coord);
                Coord {
                    x: raw.x * scale + translate.x,
                    y: raw.y * scale + translate.y,
                }
            }
        }
    }

    pub fn project_polygons(&self, shape: &MultiPolygon<f64>) -> MultiPolygon<f64> {
        shape.map_coords(|c| self.project(c))
    }

    pub fn project_lines(&self, lines: &MultiLineString<f64>) -> MultiLineString<f64> {
        lines.map_coords(|c| self.project(c))
    }
}

// Radians with y flipped so north is up on screen.
fn equirectangular_raw(coord: Coord<f64>) -> Coord<f64> {
    Coord {
        x: coord.x.to_radians(),
        y: -coord.y.to_radians(),
    }
}

fn union(a: Rect<f64>, b: Rect<f64>) -> Rect<f64> {
    Rect::new(
        Coord {
            x: a.min().x.min(b.min().x),
            y: a.min().y.min(b.min().y),
        },
        Coord {
            x: a.max().x.max(b.max().x),
            y: a.max().y.max(b.max().y),
        },
    )
}

/// SVG path data for a set of polygons, one closed subpath per ring.
pub fn polygon_path(shape: &MultiPolygon<f64>) -> String {
    let mut d = String::new();
    for polygon in shape {
        push_subpath(&mut d, polygon.exterior(), true);
        for interior in polygon.interiors() {
            push_subpath(&mut d, interior, true);
        }
    }
    d
}

/// SVG path data for open lines.
pub fn line_path(lines: &MultiLineString<f64>) -> String {
    let mut d = String::new();
    for line in lines {
        push_subpath(&mut d, line, false);
    }
    d
}

fn push_subpath(d: &mut String, line: &LineString<f64>, closed: bool) {
    // A closed ring repeats its first point; `Z` stands in for it.
    let coords = if closed && line.is_closed() && line.0.len() > 1 {
        &line.0[..line.0.len() - 1]
    } else {
        &line.0[..]
    };
    if coords.is_empty() {
        return;
    }

    for (i, c) in coords.iter().enumerate() {
        let command = if i == 0 { 'M' } else { 'L' };
        let _ = write!(d, "{command}{},{}", format_number(c.x), format_number(c.y));
    }
    if closed {
        d.push('Z');
    }
}

fn format_number(value: f64) -> String {
    // `+ 0.0` normalizes negative zero.
    let rounded = (value * 1000.0).round() / 1000.0 + 0.0;
    format!("{rounded}")
}
