//! Canvas Layout Resolver.
//!
//! Canvas templates are Fabric-style scenes: a flat list of absolutely
//! positioned objects. Resolving one substitutes bound text, grows textboxes
//! whose wrapped text no longer fits (pushing the objects below them down),
//! and clamps every object into the canvas. This runs on every render, so a
//! stored template never has to be repaired after the fact.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::{debug, warn};

use crate::layout::font_metrics::{
    estimate_text_height, FontClass, DEFAULT_FONT_SIZE, DEFAULT_LINE_HEIGHT,
};
use crate::render::error::RenderError;
use crate::render::expander::Expander;
use crate::render::path::lookup_text;

/// Width assumed for objects stored without one.
pub const DEFAULT_OBJECT_WIDTH: f64 = 200.0;
/// Height assumed for objects stored without one.
pub const DEFAULT_OBJECT_HEIGHT: f64 = 20.0;

// ────────────────────────────────────────────────────────────────────────────
// Scene types
// ────────────────────────────────────────────────────────────────────────────

/// Fabric object type. Types other than `text`, `textbox` and `rect` pass
/// through untouched apart from clamping.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum ObjectKind {
    Text,
    Textbox,
    Rect,
    Other(String),
}

impl ObjectKind {
    pub fn carries_text(&self) -> bool {
        matches!(self, ObjectKind::Text | ObjectKind::Textbox)
    }
}

impl Default for ObjectKind {
    fn default() -> Self {
        // Fabric's base object type.
        ObjectKind::Other("object".to_string())
    }
}

impl From<String> for ObjectKind {
    fn from(s: String) -> Self {
        match s.as_str() {
            "text" => ObjectKind::Text,
            "textbox" => ObjectKind::Textbox,
            "rect" => ObjectKind::Rect,
            _ => ObjectKind::Other(s),
        }
    }
}

impl From<ObjectKind> for String {
    fn from(kind: ObjectKind) -> Self {
        match kind {
            ObjectKind::Text => "text".to_string(),
            ObjectKind::Textbox => "textbox".to_string(),
            ObjectKind::Rect => "rect".to_string(),
            ObjectKind::Other(s) => s,
        }
    }
}

/// One positioned object. Properties this resolver does not interpret are
/// kept in `extra` and written back unchanged.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CanvasObject {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(rename = "type", default)]
    pub kind: ObjectKind,
    #[serde(default)]
    pub left: f64,
    #[serde(default)]
    pub top: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub width: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub height: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    /// Dotted path into the resume data; when set it replaces `text`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub binding: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub font_size: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub font_family: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub font_weight: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub line_height: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text_align: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub split_by_grapheme: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fill: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl CanvasObject {
    pub fn resolved_width(&self) -> f64 {
        positive_or(self.width, DEFAULT_OBJECT_WIDTH)
    }

    pub fn resolved_height(&self) -> f64 {
        positive_or(self.height, DEFAULT_OBJECT_HEIGHT)
    }

    pub fn right(&self) -> f64 {
        self.left + self.resolved_width()
    }

    pub fn bottom(&self) -> f64 {
        self.top + self.resolved_height()
    }

    fn overlaps_horizontally(&self, other: &CanvasObject) -> bool {
        self.left < other.right() && other.left < self.right()
    }

    /// Height the object's text needs when wrapped at its current width.
    fn text_height(&self) -> f64 {
        let text = self.text.as_deref().unwrap_or_default();
        estimate_text_height(
            text,
            self.resolved_width(),
            positive_or(self.font_size, DEFAULT_FONT_SIZE),
            positive_or(self.line_height, DEFAULT_LINE_HEIGHT),
            FontClass::from_family(self.font_family.as_deref().unwrap_or_default()),
            self.split_by_grapheme.unwrap_or(false),
        )
    }
}

fn positive_or(value: Option<f64>, fallback: f64) -> f64 {
    match value {
        Some(v) if v.is_finite() && v >= 0.0 => v,
        _ => fallback,
    }
}

/// A stored canvas scene.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CanvasDocument {
    #[serde(default)]
    pub objects: Vec<CanvasObject>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub background: Option<String>,
    /// Overrides the default canvas width for this scene.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub width: Option<f64>,
    /// Overrides the default canvas height for this scene.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub height: Option<f64>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

// ────────────────────────────────────────────────────────────────────────────
// Layout options
// ────────────────────────────────────────────────────────────────────────────

/// Canvas geometry the resolver enforces.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LayoutOptions {
    pub canvas_width: f64,
    pub canvas_height: f64,
    /// Minimum left/top offset; objects nearer the origin are pushed inward.
    pub margin: f64,
    /// Grow overflowing textboxes and push their lower neighbours down.
    pub reflow: bool,
}

impl Default for LayoutOptions {
    fn default() -> Self {
        Self {
            canvas_width: 800.0,
            canvas_height: 1000.0,
            margin: 20.0,
            reflow: true,
        }
    }
}

impl LayoutOptions {
    /// These options with the scene's own dimensions applied, if it declares any.
    pub fn for_document(&self, document: &CanvasDocument) -> Self {
        let mut options = *self;
        if let Some(w) = document.width.filter(|w| w.is_finite() && *w > 0.0) {
            options.canvas_width = w;
        }
        if let Some(h) = document.height.filter(|h| h.is_finite() && *h > 0.0) {
            options.canvas_height = h;
        }
        options
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Resolution
// ────────────────────────────────────────────────────────────────────────────

/// Resolves `objects` against `data`.
///
/// Output order equals input order (paint order). Every returned object has
/// explicit `width`/`height` and lies inside the canvas.
pub fn resolve(
    objects: &[CanvasObject],
    data: &Value,
    expander: &Expander,
    options: &LayoutOptions,
) -> Result<Vec<CanvasObject>, RenderError> {
    let mut resolved = objects
        .iter()
        .map(|object| substitute(object, data, expander))
        .collect::<Result<Vec<_>, _>>()?;

    if options.reflow {
        reflow(&mut resolved);
    }

    // Clamping pulls overflowing objects back up, where they may cover others.
    let overflow = page_overflow(&resolved, options);
    if overflow > 0.0 {
        warn!("Canvas content overflows the page by {overflow:.1}; clamped objects may overlap");
    }

    for object in &mut resolved {
        clamp(object, options);
    }
    Ok(resolved)
}

fn substitute(
    object: &CanvasObject,
    data: &Value,
    expander: &Expander,
) -> Result<CanvasObject, RenderError> {
    let mut object = object.clone();
    if object.kind.carries_text() {
        object.text = Some(match (&object.binding, &object.text) {
            (Some(path), _) => lookup_text(data, path),
            (None, Some(text)) => expander.expand(text, data)?,
            (None, None) => String::new(),
        });
    }
    object.width = Some(object.resolved_width());
    object.height = Some(object.resolved_height());
    Ok(object)
}

/// Grows textboxes to fit their wrapped text. Each growth shifts every other
/// object that starts at or below the textbox's old bottom edge and shares
/// horizontal extent with it.
fn reflow(objects: &mut [CanvasObject]) {
    for i in 0..objects.len() {
        if objects[i].kind != ObjectKind::Textbox {
            continue;
        }
        let needed = objects[i].text_height();
        let current = objects[i].resolved_height();
        if needed <= current {
            continue;
        }

        let growth = needed - current;
        let old_bottom = objects[i].bottom();
        objects[i].height = Some(needed);
        debug!(
            "Textbox {:?} grows by {growth:.1} to fit wrapped text",
            objects[i].id
        );

        let grown = objects[i].clone();
        for (j, other) in objects.iter_mut().enumerate() {
            if j != i && other.top >= old_bottom && grown.overlaps_horizontally(other) {
                other.top += growth;
            }
        }
    }
}

/// How far the lowest object extends past the bottom of the canvas, or 0.
fn page_overflow(objects: &[CanvasObject], options: &LayoutOptions) -> f64 {
    objects
        .iter()
        .map(CanvasObject::bottom)
        .filter(|bottom| bottom.is_finite())
        .fold(0.0, |worst, bottom| worst.max(bottom - options.canvas_height))
}

/// Pushes an object off the origin margin and clamps it inside the canvas.
fn clamp(object: &mut CanvasObject, options: &LayoutOptions) {
    let canvas_w = options.canvas_width.max(0.0);
    let canvas_h = options.canvas_height.max(0.0);
    let margin_x = options.margin.clamp(0.0, canvas_w);
    let margin_y = options.margin.clamp(0.0, canvas_h);

    let mut left = if object.left.is_finite() { object.left } else { 0.0 };
    let mut top = if object.top.is_finite() { object.top } else { 0.0 };
    let original_width = object.resolved_width();
    let mut width = original_width;
    let mut height = object.resolved_height();

    left = left.max(margin_x);
    top = top.max(margin_y);

    if left + width > canvas_w {
        width = canvas_w - left;
        if width <= 0.0 {
            // Starts past the right edge: bring it back to the margin.
            left = margin_x;
            width = original_width.min(canvas_w - left);
        }
    }

    if top + height > canvas_h {
        top = (canvas_h - height).max(0.0);
        if top + height > canvas_h {
            height = canvas_h - top;
        }
    }

    object.left = left;
    object.top = top;
    object.width = Some(width);
    object.height = Some(height);
}
