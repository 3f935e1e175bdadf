//! SVG rendering of the triangle-with-midsegment illustration.
//!
//! Layout is fixed: apex top-center, base corners bottom-left/right with a
//! 50px inset, the midsegment joining the midpoints of the two slanted sides.
//! Rendering is pure; the same parameters always give the same document.
//! Callers decide whether lengths may be shown (never before an answer).

use std::f64::consts::FRAC_PI_4;
use std::fmt::Write as _;

use crate::domain::PointLabels;

const PADDING: f64 = 50.0;
const TICK_HALF_LEN: f64 = 6.0;

const TRIANGLE_COLOR: &str = "#3b82f6";
const MIDSEGMENT_COLOR: &str = "#ef4444";
const LABEL_COLOR: &str = "#1e293b";
const BASE_LENGTH_COLOR: &str = "#64748b";
const TICK_COLOR: &str = "#94a3b8";

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Point {
  pub x: f64,
  pub y: f64,
}

impl Point {
  pub fn midpoint(self, other: Point) -> Point {
    Point { x: (self.x + other.x) / 2.0, y: (self.y + other.y) / 2.0 }
  }

  fn offset(self, dx: f64, dy: f64) -> Point {
    Point { x: self.x + dx, y: self.y + dy }
  }
}

#[derive(Clone, Debug, PartialEq)]
pub struct DiagramParams {
  pub width: f64,
  pub height: f64,
  pub base_length: Option<f64>,
  pub midsegment_length: Option<f64>,
  pub show_labels: bool,
  pub labels: PointLabels,
}

impl Default for DiagramParams {
  fn default() -> Self {
    Self {
      width: 300.0,
      height: 200.0,
      base_length: None,
      midsegment_length: None,
      show_labels: true,
      labels: PointLabels::default(),
    }
  }
}

/// Vertices (apex, bottom-left, bottom-right) and midpoints (left, right).
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Layout {
  pub apex: Point,
  pub left: Point,
  pub right: Point,
  pub mid_left: Point,
  pub mid_right: Point,
}

pub fn layout(width: f64, height: f64) -> Layout {
  let apex = Point { x: width / 2.0, y: PADDING };
  let left = Point { x: PADDING, y: height - PADDING };
  let right = Point { x: width - PADDING, y: height - PADDING };
  Layout {
    apex,
    left,
    right,
    mid_left: apex.midpoint(left),
    mid_right: apex.midpoint(right),
  }
}

/// Render the diagram as a standalone SVG document.
pub fn render_svg(p: &DiagramParams) -> String {
  let l = layout(p.width, p.height);
  let mut svg = String::new();
  let _ = write!(
    svg,
    r#"<svg xmlns="http://www.w3.org/2000/svg" width="{w}" height="{h}" viewBox="0 0 {w} {h}">"#,
    w = num(p.width),
    h = num(p.height)
  );

  line(&mut svg, l.apex, l.left, TRIANGLE_COLOR, 3.0);
  line(&mut svg, l.left, l.right, TRIANGLE_COLOR, 3.0);
  line(&mut svg, l.right, l.apex, TRIANGLE_COLOR, 3.0);
  line(&mut svg, l.mid_left, l.mid_right, MIDSEGMENT_COLOR, 4.0);

  for v in [l.apex, l.left, l.right] {
    point(&mut svg, v, TRIANGLE_COLOR);
  }
  for m in [l.mid_left, l.mid_right] {
    point(&mut svg, m, MIDSEGMENT_COLOR);
  }

  if p.show_labels {
    let lb = &p.labels;
    label(&mut svg, l.apex.offset(0.0, -15.0), &lb.v1, LABEL_COLOR, 16);
    label(&mut svg, l.left.offset(-20.0, 20.0), &lb.v2, LABEL_COLOR, 16);
    label(&mut svg, l.right.offset(20.0, 20.0), &lb.v3, LABEL_COLOR, 16);
    label(&mut svg, l.mid_left.offset(-25.0, 5.0), &lb.m1, MIDSEGMENT_COLOR, 16);
    label(&mut svg, l.mid_right.offset(25.0, 5.0), &lb.m2, MIDSEGMENT_COLOR, 16);

    if let Some(base) = p.base_length.filter(|v| *v != 0.0) {
      let at = Point { x: (l.left.x + l.right.x) / 2.0, y: l.left.y }.offset(0.0, 25.0);
      label(&mut svg, at, &format!("{}cm", num(base)), BASE_LENGTH_COLOR, 12);
    }
    if let Some(mid) = p.midsegment_length.filter(|v| *v != 0.0) {
      let at = Point { x: (l.mid_left.x + l.mid_right.x) / 2.0, y: l.mid_left.y }.offset(0.0, -15.0);
      label(&mut svg, at, &format!("{}cm", num(mid)), MIDSEGMENT_COLOR, 12);
    }
  }

  // Equal-part marks: single ticks on the left side, double ticks on the right.
  tick(&mut svg, l.apex.midpoint(l.mid_left), 0.0);
  tick(&mut svg, l.mid_left.midpoint(l.left), 0.0);
  for center in [l.apex.midpoint(l.mid_right), l.mid_right.midpoint(l.right)] {
    tick(&mut svg, center, FRAC_PI_4);
    tick(&mut svg, center.offset(3.0, 3.0), FRAC_PI_4);
  }

  svg.push_str("</svg>");
  svg
}

fn line(svg: &mut String, a: Point, b: Point, color: &str, width: f64) {
  let _ = write!(
    svg,
    r#"<line x1="{}" y1="{}" x2="{}" y2="{}" stroke="{color}" stroke-width="{}" stroke-linecap="round"/>"#,
    num(a.x),
    num(a.y),
    num(b.x),
    num(b.y),
    num(width)
  );
}

fn point(svg: &mut String, p: Point, color: &str) {
  let _ = write!(
    svg,
    r#"<circle cx="{}" cy="{}" r="4" fill="white" stroke="{color}" stroke-width="2"/>"#,
    num(p.x),
    num(p.y)
  );
}

fn label(svg: &mut String, at: Point, text: &str, color: &str, size: u32) {
  let _ = write!(
    svg,
    r#"<text x="{}" y="{}" font-size="{size}px" font-weight="900" fill="{color}" text-anchor="middle" style="filter: drop-shadow(0px 1px 1px white)">{}</text>"#,
    num(at.x),
    num(at.y),
    escape_xml(text)
  );
}

fn tick(svg: &mut String, center: Point, angle: f64) {
  let (dx, dy) = (angle.cos() * TICK_HALF_LEN, angle.sin() * TICK_HALF_LEN);
  let _ = write!(
    svg,
    r#"<line x1="{}" y1="{}" x2="{}" y2="{}" stroke="{TICK_COLOR}" stroke-width="2"/>"#,
    num(center.x - dx),
    num(center.y - dy),
    num(center.x + dx),
    num(center.y + dy)
  );
}

/// Compact number formatting: integers without a fraction, others to 2 places.
fn num(v: f64) -> String {
  if v.fract() == 0.0 {
    format!("{}", v as i64)
  } else {
    let s = format!("{:.2}", v);
    s.trim_end_matches('0').trim_end_matches('.').to_string()
  }
}

/// Labels can come from generated content; keep them inert inside the SVG.
pub fn escape_xml(s: &str) -> String {
  let mut out = String::with_capacity(s.len());
  for ch in s.chars() {
    match ch {
      '&' => out.push_str("&amp;"),
      '<' => out.push_str("&lt;"),
      '>' => out.push_str("&gt;"),
      '"' => out.push_str("&quot;"),
      '\'' => out.push_str("&apos;"),
      _ => out.push(ch),
    }
  }
  out
}
