//! Artwork markup parser.

use super::{Artwork, ArtworkElement, DESIGN_SPACE_EXTENT, UnitConvention};
use crate::error::ArtworkError;
use crate::shapes::{PrimitiveGeometry, PrimitiveStyle, SerializableColor, parse_color};
use kurbo::{BezPath, Ellipse, PathEl, Point, Rect, Shape as KurboShape};
use quick_xml::Reader;
use quick_xml::events::{BytesStart, Event};
use std::collections::HashMap;
use std::f64::consts::PI;

/// Elements whose content is never drawn directly.
const SKIPPED_CONTAINERS: &[&str] = &[
    "defs", "clipPath", "mask", "symbol", "pattern", "marker", "title", "desc", "metadata", "style",
];

/// Paint state inherited from enclosing elements.
#[derive(Debug, Clone, Copy)]
struct Paint {
    stroke: Option<SerializableColor>,
    fill: Option<SerializableColor>,
    stroke_width: f64,
}

impl Default for Paint {
    fn default() -> Self {
        // SVG initial values: black fill, no stroke, unit stroke width.
        Self {
            stroke: None,
            fill: Some(SerializableColor::black()),
            stroke_width: 1.0,
        }
    }
}

impl Paint {
    fn style(&self) -> PrimitiveStyle {
        PrimitiveStyle {
            stroke_color: self.stroke,
            stroke_width: self.stroke_width,
            fill_color: self.fill,
            opacity: 1.0,
        }
    }
}

struct ParseState {
    view_box: Option<Rect>,
    units: UnitConvention,
    paint_stack: Vec<Paint>,
    skip_depth: usize,
    elements: Vec<ArtworkElement>,
}

impl ParseState {
    fn paint(&self) -> Paint {
        self.paint_stack.last().copied().unwrap_or_default()
    }

    fn tolerance(&self) -> f64 {
        let extent = self
            .view_box
            .map(|vb| vb.width().max(vb.height()))
            .unwrap_or(DESIGN_SPACE_EXTENT);
        (extent / 1000.0).max(1e-3)
    }
}

pub(super) fn parse(markup: &str) -> Result<Artwork, ArtworkError> {
    let mut reader = Reader::from_str(markup);
    reader.config_mut().trim_text(true);

    let mut state = ParseState {
        view_box: None,
        units: UnitConvention::default(),
        paint_stack: Vec::new(),
        skip_depth: 0,
        elements: Vec::new(),
    };
    let mut saw_root = false;

    loop {
        match reader.read_event() {
            Ok(Event::Start(ref e)) => {
                let name = element_name(e)?;
                if state.skip_depth > 0 || SKIPPED_CONTAINERS.contains(&name.as_str()) {
                    state.skip_depth += 1;
                    continue;
                }
                let attrs = attributes(e)?;
                match name.as_str() {
                    "svg" => {
                        if !saw_root {
                            read_root(&mut state, &attrs)?;
                            saw_root = true;
                        }
                        let paint = resolve_paint(state.paint(), &attrs)?;
                        state.paint_stack.push(paint);
                    }
                    "g" => {
                        let paint = resolve_paint(state.paint(), &attrs)?;
                        state.paint_stack.push(paint);
                    }
                    _ => read_element(&mut state, &name, &attrs)?,
                }
            }
            Ok(Event::Empty(ref e)) => {
                if state.skip_depth > 0 {
                    continue;
                }
                let name = element_name(e)?;
                if name == "svg" || name == "g" || SKIPPED_CONTAINERS.contains(&name.as_str()) {
                    if name == "svg" && !saw_root {
                        read_root(&mut state, &attributes(e)?)?;
                        saw_root = true;
                    }
                    continue;
                }
                let attrs = attributes(e)?;
                read_element(&mut state, &name, &attrs)?;
            }
            Ok(Event::End(ref e)) => {
                let name = String::from_utf8_lossy(e.local_name().as_ref()).into_owned();
                if state.skip_depth > 0 {
                    state.skip_depth -= 1;
                } else if name == "svg" || name == "g" {
                    state.paint_stack.pop();
                }
            }
            Ok(Event::Eof) => break,
            Err(e) => return Err(ArtworkError::Xml(e.to_string())),
            _ => {}
        }
    }

    if !saw_root {
        return Err(ArtworkError::MissingRoot);
    }

    let view_box = state
        .view_box
        .or_else(|| {
            state
                .elements
                .iter()
                .map(|e| e.geometry.bounds())
                .reduce(|acc, r| acc.union(r))
        })
        .unwrap_or(Rect::new(0.0, 0.0, DESIGN_SPACE_EXTENT, DESIGN_SPACE_EXTENT));

    Ok(Artwork {
        view_box,
        units: state.units,
        elements: state.elements,
    })
}

fn element_name(e: &BytesStart<'_>) -> Result<String, ArtworkError> {
    std::str::from_utf8(e.local_name().as_ref())
        .map(str::to_string)
        .map_err(|err| ArtworkError::Xml(err.to_string()))
}

fn attributes(e: &BytesStart<'_>) -> Result<HashMap<String, String>, ArtworkError> {
    let mut attrs = HashMap::new();
    for attr in e.attributes().with_checks(false) {
        let attr = attr.map_err(|err| ArtworkError::Xml(err.to_string()))?;
        let key = String::from_utf8_lossy(attr.key.local_name().as_ref()).into_owned();
        let value = attr
            .unescape_value()
            .map_err(|err| ArtworkError::Xml(err.to_string()))?
            .into_owned();
        attrs.insert(key, value);
    }
    Ok(attrs)
}

fn read_root(state: &mut ParseState, attrs: &HashMap<String, String>) -> Result<(), ArtworkError> {
    if let Some(vb) = attrs.get("viewBox") {
        let nums = number_list("viewBox", vb)?;
        let [x, y, w, h] = nums.as_slice() else {
            return Err(invalid("viewBox", vb));
        };
        state.view_box = Some(Rect::new(*x, *y, x + w, y + h));
    } else if let (Some(w), Some(h)) = (attrs.get("width"), attrs.get("height")) {
        let w = length("width", w)?;
        let h = length("height", h)?;
        state.view_box = Some(Rect::new(0.0, 0.0, w, h));
    }
    if attrs
        .get("data-units")
        .is_some_and(|u| u.trim().eq_ignore_ascii_case("mm"))
    {
        state.units = UnitConvention::Millimeters;
    }
    Ok(())
}

fn read_element(
    state: &mut ParseState,
    name: &str,
    attrs: &HashMap<String, String>,
) -> Result<(), ArtworkError> {
    let style = resolve_paint(state.paint(), attrs)?.style();
    let num = |key: &'static str| -> Result<f64, ArtworkError> {
        attrs.get(key).map(|v| length(key, v)).unwrap_or(Ok(0.0))
    };

    let geometries = match name {
        "polygon" => vec![PrimitiveGeometry::Polygon(points_attr(attrs)?)],
        "polyline" => vec![PrimitiveGeometry::Polyline(points_attr(attrs)?)],
        "line" => vec![PrimitiveGeometry::Polyline(vec![
            Point::new(num("x1")?, num("y1")?),
            Point::new(num("x2")?, num("y2")?),
        ])],
        "rect" => {
            let (x, y, w, h) = (num("x")?, num("y")?, num("width")?, num("height")?);
            if w <= 0.0 || h <= 0.0 {
                return Ok(());
            }
            vec![PrimitiveGeometry::Polygon(vec![
                Point::new(x, y),
                Point::new(x + w, y),
                Point::new(x + w, y + h),
                Point::new(x, y + h),
            ])]
        }
        "circle" => {
            let center = Point::new(num("cx")?, num("cy")?);
            let radius = num("r")?;
            if radius <= 0.0 {
                return Ok(());
            }
            // Hosts draw circular arcs, so a circle is emitted as two halves.
            vec![
                PrimitiveGeometry::Arc {
                    center,
                    radius,
                    start_angle: 0.0,
                    sweep_angle: PI,
                },
                PrimitiveGeometry::Arc {
                    center,
                    radius,
                    start_angle: PI,
                    sweep_angle: PI,
                },
            ]
        }
        "ellipse" => {
            let center = Point::new(num("cx")?, num("cy")?);
            let (rx, ry) = (num("rx")?, num("ry")?);
            if rx <= 0.0 || ry <= 0.0 {
                return Ok(());
            }
            let path = Ellipse::new(center, (rx, ry), 0.0).to_path(state.tolerance());
            flatten_path(&path, state.tolerance())
        }
        "path" => {
            let Some(d) = attrs.get("d") else {
                return Ok(());
            };
            let path = BezPath::from_svg(d).map_err(|_| invalid("d", d))?;
            flatten_path(&path, state.tolerance())
        }
        _ => {
            log::trace!("Ignoring unsupported artwork element <{}>", name);
            return Ok(());
        }
    };

    state.elements.extend(
        geometries
            .into_iter()
            .filter(|g| match g {
                PrimitiveGeometry::Polygon(pts) | PrimitiveGeometry::Polyline(pts) => pts.len() >= 2,
                _ => true,
            })
            .map(|geometry| ArtworkElement {
                geometry,
                style: style.clone(),
            }),
    );
    Ok(())
}

/// Flatten a path into polygons (closed subpaths) and polylines (open ones).
fn flatten_path(path: &BezPath, tolerance: f64) -> Vec<PrimitiveGeometry> {
    let mut out = Vec::new();
    let mut current: Vec<Point> = Vec::new();
    let mut finish = |points: &mut Vec<Point>, closed: bool| {
        let points = std::mem::take(points);
        if points.len() < 2 {
            return;
        }
        out.push(if closed {
            PrimitiveGeometry::Polygon(points)
        } else {
            PrimitiveGeometry::Polyline(points)
        });
    };
    kurbo::flatten(path.iter(), tolerance, |el| match el {
        PathEl::MoveTo(p) => {
            finish(&mut current, false);
            current.push(p);
        }
        PathEl::LineTo(p) => current.push(p),
        PathEl::ClosePath => {
            let start = current.first().copied();
            finish(&mut current, true);
            // Drawing may continue from the start of the closed subpath.
            if let Some(start) = start {
                current.push(start);
            }
        }
        _ => {}
    });
    finish(&mut current, false);
    out
}

fn resolve_paint(inherited: Paint, attrs: &HashMap<String, String>) -> Result<Paint, ArtworkError> {
    let mut paint = inherited;
    let mut declarations: Vec<(String, String)> = attrs
        .iter()
        .filter(|(k, _)| matches!(k.as_str(), "stroke" | "fill" | "stroke-width"))
        .map(|(k, v)| (k.clone(), v.clone()))
        .collect();
    // Inline style declarations take precedence over presentation attributes.
    if let Some(style) = attrs.get("style") {
        declarations.extend(style.split(';').filter_map(|decl| {
            let (k, v) = decl.split_once(':')?;
            Some((k.trim().to_string(), v.trim().to_string()))
        }));
    }
    for (key, value) in declarations {
        match key.as_str() {
            "stroke" | "fill" => {
                let Some(color) = parse_color(&value) else {
                    log::debug!("Ignoring unsupported {} paint {:?}", key, value);
                    continue;
                };
                if key == "stroke" {
                    paint.stroke = color;
                } else {
                    paint.fill = color;
                }
            }
            "stroke-width" => paint.stroke_width = length("stroke-width", &value)?.max(0.0),
            _ => {}
        }
    }
    Ok(paint)
}

fn points_attr(attrs: &HashMap<String, String>) -> Result<Vec<Point>, ArtworkError> {
    let Some(raw) = attrs.get("points") else {
        return Ok(Vec::new());
    };
    let nums = number_list("points", raw)?;
    if nums.len() % 2 != 0 {
        return Err(invalid("points", raw));
    }
    Ok(nums.chunks_exact(2).map(|c| Point::new(c[0], c[1])).collect())
}

fn number_list(name: &str, raw: &str) -> Result<Vec<f64>, ArtworkError> {
    raw.split(|c: char| c.is_whitespace() || c == ',')
        .filter(|s| !s.is_empty())
        .map(|s| s.parse::<f64>().map_err(|_| invalid(name, raw)))
        .collect()
}

/// Parse a length, ignoring a trailing unit suffix such as `mm` or `px`.
fn length(name: &str, raw: &str) -> Result<f64, ArtworkError> {
    let trimmed = raw.trim();
    let numeric = trimmed.trim_end_matches(|c: char| c.is_ascii_alphabetic() || c == '%');
    numeric
        .parse::<f64>()
        .ok()
        .filter(|v| v.is_finite())
        .ok_or_else(|| invalid(name, raw))
}

fn invalid(name: &str, value: &str) -> ArtworkError {
    ArtworkError::InvalidAttribute {
        name: name.to_string(),
        value: value.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const CHAIR: &str = r##"<svg xmlns="http://www.w3.org/2000/svg" viewBox="0 0 100 50" data-units="mm">
        <g stroke="#333333" fill="none" stroke-width="2">
            <rect x="10" y="10" width="80" height="30"/>
            <line x1="0" y1="0" x2="100" y2="50" stroke="red"/>
        </g>
        <circle cx="50" cy="25" r="5" fill="#00ff00"/>
    </svg>"##;

    #[test]
    fn test_parse_root_attributes() {
        let art = parse(CHAIR).unwrap();
        assert_eq!(art.view_box, Rect::new(0.0, 0.0, 100.0, 50.0));
        assert_eq!(art.units, UnitConvention::Millimeters);
    }

    #[test]
    fn test_parse_elements_and_inherited_paint() {
        let art = parse(CHAIR).unwrap();
        // rect + line + two half arcs
        assert_eq!(art.elements.len(), 4);
        let rect = &art.elements[0];
        assert!(matches!(rect.geometry, PrimitiveGeometry::Polygon(ref p) if p.len() == 4));
        assert_eq!(rect.style.stroke_color, Some(SerializableColor::new(0x33, 0x33, 0x33, 255)));
        assert_eq!(rect.style.fill_color, None);
        assert!((rect.style.stroke_width - 2.0).abs() < f64::EPSILON);

        let line = &art.elements[1];
        assert_eq!(line.style.stroke_color, Some(SerializableColor::new(255, 0, 0, 255)));

        let arc = &art.elements[2];
        assert!(matches!(arc.geometry, PrimitiveGeometry::Arc { sweep_angle, .. } if (sweep_angle - PI).abs() < 1e-12));
        assert_eq!(arc.style.fill_color, Some(SerializableColor::new(0, 255, 0, 255)));
    }

    #[test]
    fn test_design_space_is_default() {
        let art = parse(r#"<svg viewBox="0 0 100 100"><polygon points="0,0 100,0 50,100"/></svg>"#).unwrap();
        assert_eq!(art.units, UnitConvention::DesignSpace);
        assert!((art.mm_per_unit() - 5.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_path_subpaths() {
        let art = parse(r#"<svg viewBox="0 0 10 10"><path d="M0 0 L10 0 L10 10 Z M0 5 L5 5"/></svg>"#).unwrap();
        assert_eq!(art.elements.len(), 2);
        assert!(matches!(art.elements[0].geometry, PrimitiveGeometry::Polygon(_)));
        assert!(matches!(art.elements[1].geometry, PrimitiveGeometry::Polyline(_)));
    }

    #[test]
    fn test_style_attribute_wins() {
        let art = parse(r#"<svg viewBox="0 0 10 10"><line x1="0" y1="0" x2="1" y2="1" stroke="red" style="stroke: blue; stroke-width: 3"/></svg>"#).unwrap();
        let style = &art.elements[0].style;
        assert_eq!(style.stroke_color, Some(SerializableColor::new(0, 0, 255, 255)));
        assert!((style.stroke_width - 3.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_defs_are_skipped() {
        let art = parse(r#"<svg viewBox="0 0 10 10"><defs><rect width="5" height="5"/></defs><rect width="2" height="2"/></svg>"#).unwrap();
        assert_eq!(art.elements.len(), 1);
    }

    #[test]
    fn test_css_named_paint() {
        let art = parse(r#"<svg viewBox="0 0 10 10"><rect width="5" height="5" fill="lightgray" stroke="silver"/></svg>"#).unwrap();
        let style = &art.elements[0].style;
        assert_eq!(style.fill_color, Some(SerializableColor::new(211, 211, 211, 255)));
        assert_eq!(style.stroke_color, Some(SerializableColor::new(192, 192, 192, 255)));
    }

    #[test]
    fn test_unsupported_paint_keeps_inherited() {
        let art = parse(
            r##"<svg viewBox="0 0 10 10"><g stroke="#0000ff" fill="red">
                <rect width="5" height="5" fill="url(#grad)" stroke="currentColor"/>
            </g></svg>"##,
        )
        .unwrap();
        let style = &art.elements[0].style;
        assert_eq!(style.fill_color, Some(SerializableColor::new(255, 0, 0, 255)));
        assert_eq!(style.stroke_color, Some(SerializableColor::new(0, 0, 255, 255)));
    }

    #[test]
    fn test_malformed_markup() {
        assert!(parse("<svg viewBox=\"0 0 1\"></svg>").is_err());
        assert!(matches!(parse("<div></div>"), Err(ArtworkError::MissingRoot)));
        assert!(parse(r#"<svg viewBox="0 0 10 10"><polygon points="0,0 1"/></svg>"#).is_err());
    }

    #[test]
    fn test_view_box_from_width_height() {
        let art = parse(r#"<svg width="200mm" height="100mm"><rect width="1" height="1"/></svg>"#).unwrap();
        assert_eq!(art.view_box, Rect::new(0.0, 0.0, 200.0, 100.0));
    }
}
