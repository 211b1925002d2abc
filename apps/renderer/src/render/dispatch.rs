//! Render Dispatcher — routes a template to the strategy its mode selects.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::models::resume::ResumeData;
use crate::models::template::TemplateSource;
use crate::render::builder::{render_nodes, BuilderDocument};
use crate::render::canvas::{resolve, CanvasDocument, CanvasObject, LayoutOptions};
use crate::render::error::RenderError;
use crate::render::expander::Expander;
use crate::render::helpers::HelperTable;

// ────────────────────────────────────────────────────────────────────────────
// Modes
// ────────────────────────────────────────────────────────────────────────────

/// The three supported values of a template's `renderEngine` tag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RenderMode {
    Html,
    Builder,
    Canvas,
}

impl RenderMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            RenderMode::Html => "html",
            RenderMode::Builder => "builder",
            RenderMode::Canvas => "canvas",
        }
    }
}

impl fmt::Display for RenderMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RenderMode {
    type Err = RenderError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "html" => Ok(RenderMode::Html),
            "builder" => Ok(RenderMode::Builder),
            "canvas" => Ok(RenderMode::Canvas),
            other => Err(RenderError::UnsupportedRenderMode(other.to_string())),
        }
    }
}

/// A template narrowed to its mode: each variant carries only its own payload.
#[derive(Debug, Clone, PartialEq)]
pub enum RenderTemplate {
    Html { markup: String, stylesheet: String },
    Builder(BuilderDocument),
    Canvas(CanvasDocument),
}

impl TryFrom<&TemplateSource> for RenderTemplate {
    type Error = RenderError;

    /// Fails only on an unknown tag. A missing payload renders as empty.
    fn try_from(source: &TemplateSource) -> Result<Self, Self::Error> {
        Ok(match source.render_engine.parse::<RenderMode>()? {
            RenderMode::Html => RenderTemplate::Html {
                markup: source.html.clone().unwrap_or_default(),
                stylesheet: source.css.clone().unwrap_or_default(),
            },
            RenderMode::Builder => {
                RenderTemplate::Builder(source.builder_data.clone().unwrap_or_default())
            }
            RenderMode::Canvas => {
                RenderTemplate::Canvas(source.canvas_data.clone().unwrap_or_default())
            }
        })
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Output
// ────────────────────────────────────────────────────────────────────────────

/// What a render call hands back to the caller-side surface.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "renderEngine", rename_all = "lowercase")]
pub enum RenderOutput {
    /// A complete HTML document with the stylesheet inlined.
    Html { document: String },
    /// Markup for the component tree plus the template's stylesheet.
    Builder { markup: String, css: String },
    /// The resolved scene and the canvas it was resolved against.
    Canvas {
        width: f64,
        height: f64,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        background: Option<String>,
        objects: Vec<CanvasObject>,
    },
}

/// Wraps expanded body markup in a minimal document with an inline stylesheet.
pub fn document_shell(body: &str, stylesheet: &str) -> String {
    format!(
        "<!DOCTYPE html>\n\
         <html lang=\"en\">\n\
         <head>\n\
         <meta charset=\"UTF-8\">\n\
         <meta name=\"viewport\" content=\"width=device-width, initial-scale=1.0\">\n\
         <title>Resume</title>\n\
         <style>{stylesheet}</style>\n\
         </head>\n\
         <body>\n\
         {body}\n\
         </body>\n\
         </html>\n"
    )
}

// ────────────────────────────────────────────────────────────────────────────
// Renderer
// ────────────────────────────────────────────────────────────────────────────

/// Stateless renderer shared by all requests.
///
/// Holds one escaping expander for markup and one plain expander for canvas
/// text, both built from the same helper table, plus the canvas geometry.
pub struct Renderer {
    markup: Expander,
    text: Expander,
    layout: LayoutOptions,
}

impl Renderer {
    pub fn new(helpers: &HelperTable, layout: LayoutOptions) -> Self {
        Self {
            markup: Expander::markup(helpers),
            text: Expander::plain(helpers),
            layout,
        }
    }

    /// Renders a stored template. With no data, the template's own sample data
    /// is used so the caller gets a preview.
    pub fn render(
        &self,
        source: &TemplateSource,
        data: &ResumeData,
    ) -> Result<RenderOutput, RenderError> {
        let template = RenderTemplate::try_from(source)?;
        match (&source.sample_data, data.is_absent()) {
            (Some(sample), true) => {
                debug!("No resume data supplied; rendering sample data");
                self.render_template(&template, &ResumeData::new(sample.clone()))
            }
            _ => self.render_template(&template, data),
        }
    }

    pub fn render_template(
        &self,
        template: &RenderTemplate,
        data: &ResumeData,
    ) -> Result<RenderOutput, RenderError> {
        match template {
            RenderTemplate::Html { markup, stylesheet } => {
                let body = self.markup.expand(markup, data.as_value())?;
                Ok(RenderOutput::Html {
                    document: document_shell(&body, stylesheet),
                })
            }
            RenderTemplate::Builder(document) => {
                let scope = data.flattened();
                let markup = render_nodes(&document.components, &scope, &self.markup)?;
                Ok(RenderOutput::Builder {
                    markup,
                    css: document.style.clone(),
                })
            }
            RenderTemplate::Canvas(document) => {
                let scope = data.flattened();
                let options = self.layout.for_document(document);
                let objects = resolve(&document.objects, &scope, &self.text, &options)?;
                Ok(RenderOutput::Canvas {
                    width: options.canvas_width,
                    height: options.canvas_height,
                    background: document.background.clone(),
                    objects,
                })
            }
        }
    }
}

impl Default for Renderer {
    fn default() -> Self {
        Self::new(&HelperTable::standard(), LayoutOptions::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::{json, Value};

    fn source(body: Value) -> TemplateSource {
        serde_json::from_value(body).unwrap()
    }

    fn emma() -> ResumeData {
        ResumeData::new(json!({
            "personalInfo": { "firstName": "Emma", "lastName": "Stone" },
            "skills": [{ "name": "SQL" }, { "name": "Go" }]
        }))
    }

    #[test]
    fn test_mode_parsing() {
        assert_eq!("canvas".parse::<RenderMode>().unwrap(), RenderMode::Canvas);
        assert_eq!(
            "xml".parse::<RenderMode>(),
            Err(RenderError::UnsupportedRenderMode("xml".to_string()))
        );
    }

    #[test]
    fn test_unknown_engine_is_rejected() {
        let renderer = Renderer::default();
        let err = renderer
            .render(&source(json!({ "renderEngine": "xml" })), &emma())
            .unwrap_err();
        assert_eq!(err, RenderError::UnsupportedRenderMode("xml".to_string()));
    }

    #[test]
    fn test_html_is_wrapped_in_document() {
        let renderer = Renderer::default();
        let template = source(json!({
            "renderEngine": "html",
            "html": "<h1>{{personalInfo.firstName}}</h1>",
            "css": "h1{color:red}"
        }));
        let RenderOutput::Html { document } = renderer.render(&template, &emma()).unwrap() else {
            panic!("expected html output");
        };
        assert!(document.starts_with("<!DOCTYPE html>"));
        assert!(document.contains("<meta charset=\"UTF-8\">"));
        assert!(document.contains("<style>h1{color:red}</style>"));
        assert!(document.contains("<h1>Emma</h1>"));
    }

    #[test]
    fn test_missing_payload_renders_empty() {
        let renderer = Renderer::default();
        let out = renderer
            .render(&source(json!({ "renderEngine": "builder" })), &emma())
            .unwrap();
        assert_eq!(
            out,
            RenderOutput::Builder {
                markup: String::new(),
                css: String::new()
            }
        );
    }

    #[test]
    fn test_builder_sees_flattened_personal_info() {
        let renderer = Renderer::default();
        let template = source(json!({
            "renderEngine": "builder",
            "builderData": {
                "components": [{ "type": "name", "tagName": "h1", "content": "{{firstName}} {{lastName}}" }],
                "style": "h1{margin:0}"
            }
        }));
        let out = renderer.render(&template, &emma()).unwrap();
        assert_eq!(
            out,
            RenderOutput::Builder {
                markup: "<h1>Emma Stone</h1>".to_string(),
                css: "h1{margin:0}".to_string()
            }
        );
    }

    #[test]
    fn test_canvas_reports_dimensions() {
        let renderer = Renderer::default();
        let template = source(json!({
            "renderEngine": "canvas",
            "canvasData": {
                "background": "#fff",
                "objects": [{ "type": "text", "left": 750, "top": 40, "text": "{{firstName}}" }]
            }
        }));
        let RenderOutput::Canvas { width, height, background, objects } =
            renderer.render(&template, &emma()).unwrap()
        else {
            panic!("expected canvas output");
        };
        assert_eq!((width, height), (800.0, 1000.0));
        assert_eq!(background.as_deref(), Some("#fff"));
        assert_eq!(objects[0].text.as_deref(), Some("Emma"));
        assert_eq!(objects[0].width, Some(50.0));
    }

    #[test]
    fn test_sample_data_used_when_data_absent() {
        let renderer = Renderer::default();
        let template = source(json!({
            "renderEngine": "html",
            "html": "{{personalInfo.firstName}}",
            "sampleData": { "personalInfo": { "firstName": "Sample" } }
        }));
        let RenderOutput::Html { document } =
            renderer.render(&template, &ResumeData::default()).unwrap()
        else {
            panic!("expected html output");
        };
        assert!(document.contains("Sample"));

        let RenderOutput::Html { document } =
            renderer.render(&template, &ResumeData::new(json!({}))).unwrap()
        else {
            panic!("expected html output");
        };
        assert!(!document.contains("Sample"));
    }

    #[test]
    fn test_output_is_tagged() {
        let out = RenderOutput::Html {
            document: "x".to_string(),
        };
        let json = serde_json::to_value(&out).unwrap();
        assert_eq!(json, json!({ "renderEngine": "html", "document": "x" }));
    }
}
