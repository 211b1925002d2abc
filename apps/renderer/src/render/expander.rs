//! Template Expander — Handlebars expansion over resume data.
//!
//! Each expander owns its own registry, built once from a [`HelperTable`] and
//! never mutated afterwards. Two expanders with different tables (or different
//! escaping) can be used side by side from any number of threads.
//!
//! Missing fields render as the empty string (non-strict mode); stored
//! templates depend on that.

use handlebars::{
    html_escape, no_escape, BlockContext, Context, Handlebars, Helper, HelperDef, HelperResult,
    Output, RenderContext, RenderError as HandlebarsError, Renderable, ScopedJson,
};
use serde_json::{json, Value};

use crate::render::error::RenderError;
use crate::render::helpers::{is_truthy, to_number, HelperFn, HelperTable};
use crate::render::path::display_value;

/// Upper bound on `{{#times n}}` repetitions.
pub const MAX_TIMES: u64 = 1_000;

/// How `{{field}}` output is escaped. `{{{field}}}` is always raw.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Escape {
    /// HTML-escape substituted values (markup output).
    Html,
    /// Emit values verbatim (canvas text).
    None,
}

pub struct Expander {
    registry: Handlebars<'static>,
}

impl Expander {
    pub fn new(helpers: &HelperTable, escape: Escape) -> Self {
        let mut registry = Handlebars::new();
        registry.set_strict_mode(false);
        if escape == Escape::None {
            registry.register_escape_fn(no_escape);
        }
        for (name, func) in helpers.iter() {
            registry.register_helper(name, Box::new(TableHelper { func, escape }));
        }
        registry.register_helper("times", Box::new(TimesHelper));

        Self { registry }
    }

    /// Expander for HTML output.
    pub fn markup(helpers: &HelperTable) -> Self {
        Self::new(helpers, Escape::Html)
    }

    /// Expander for plain text output.
    pub fn plain(helpers: &HelperTable) -> Self {
        Self::new(helpers, Escape::None)
    }

    /// Expands `template` against `data`.
    pub fn expand(&self, template: &str, data: &Value) -> Result<String, RenderError> {
        if !template.contains("{{") {
            return Ok(template.to_string());
        }
        self.registry
            .render_template(template, data)
            .map_err(|e| RenderError::TemplateSyntax(e.to_string()))
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Registry adapters
// ────────────────────────────────────────────────────────────────────────────

/// Adapts a table helper to Handlebars: a value in expressions and
/// sub-expressions, a truthiness gate when used as a block.
struct TableHelper {
    func: HelperFn,
    escape: Escape,
}

impl TableHelper {
    fn evaluate(&self, h: &Helper<'_>) -> Value {
        let args: Vec<Value> = h.params().iter().map(|p| p.value().clone()).collect();
        (self.func)(&args)
    }
}

impl HelperDef for TableHelper {
    fn call_inner<'reg: 'rc, 'rc>(
        &self,
        h: &Helper<'rc>,
        _: &'reg Handlebars<'reg>,
        _: &'rc Context,
        _: &mut RenderContext<'reg, 'rc>,
    ) -> Result<ScopedJson<'rc>, HandlebarsError> {
        Ok(ScopedJson::Derived(self.evaluate(h)))
    }

    fn call<'reg: 'rc, 'rc>(
        &self,
        h: &Helper<'rc>,
        r: &'reg Handlebars<'reg>,
        ctx: &'rc Context,
        rc: &mut RenderContext<'reg, 'rc>,
        out: &mut dyn Output,
    ) -> HelperResult {
        let value = self.evaluate(h);

        if h.is_block() {
            let branch = if is_truthy(&value) {
                h.template()
            } else {
                h.inverse()
            };
            return match branch {
                Some(t) => t.render(r, ctx, rc, out),
                None => Ok(()),
            };
        }

        let text = display_value(&value);
        match self.escape {
            Escape::Html => out.write(&html_escape(&text))?,
            Escape::None => out.write(&text)?,
        }
        Ok(())
    }
}

/// `{{#times n}}…{{/times}}`: renders the body `n` times in the current scope,
/// exposing `@index`, `@first` and `@last`.
struct TimesHelper;

impl HelperDef for TimesHelper {
    fn call<'reg: 'rc, 'rc>(
        &self,
        h: &Helper<'rc>,
        r: &'reg Handlebars<'reg>,
        ctx: &'rc Context,
        rc: &mut RenderContext<'reg, 'rc>,
        out: &mut dyn Output,
    ) -> HelperResult {
        let Some(body) = h.template() else {
            return Ok(());
        };

        let count = h
            .param(0)
            .and_then(|p| to_number(p.value()))
            .filter(|n| *n > 0.0)
            .map(|n| (n.floor() as u64).min(MAX_TIMES))
            .unwrap_or(0);

        for i in 0..count {
            let mut block: BlockContext<'rc> = rc.block().cloned().unwrap_or_default();
            block.set_local_var("index", json!(i));
            block.set_local_var("first", json!(i == 0));
            block.set_local_var("last", json!(i + 1 == count));
            rc.push_block(block);
            let rendered = body.render(r, ctx, rc, out);
            rc.pop_block();
            rendered?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn markup() -> Expander {
        Expander::markup(&HelperTable::standard())
    }

    #[test]
    fn test_field_substitution() {
        let out = markup().expand("Hello {{name}}", &json!({ "name": "Emma" })).unwrap();
        assert_eq!(out, "Hello Emma");
    }

    #[test]
    fn test_missing_field_renders_empty() {
        let out = markup().expand("Hello {{name}}", &json!({})).unwrap();
        assert_eq!(out, "Hello ");
    }

    #[test]
    fn test_each_block() {
        let data = json!({ "skills": [{ "name": "SQL" }, { "name": "Go" }] });
        let out = markup()
            .expand("{{#each skills}}{{name}} {{/each}}", &data)
            .unwrap();
        assert_eq!(out, "SQL Go ");
    }

    #[test]
    fn test_each_over_strings_with_this_and_last() {
        let data = json!({ "achievements": ["Shipped v2", "Cut costs"] });
        let out = markup()
            .expand(
                "{{#each achievements}}{{this}}{{#unless @last}}; {{/unless}}{{/each}}",
                &data,
            )
            .unwrap();
        assert_eq!(out, "Shipped v2; Cut costs");
    }

    #[test]
    fn test_expansion_is_deterministic() {
        let template = "{{#each experience}}<li>{{position}} @ {{company}}</li>{{/each}}";
        let data = json!({ "experience": [
            { "position": "Engineer", "company": "Acme" },
            { "position": "Lead", "company": "Globex" }
        ]});
        let expander = markup();
        let first = expander.expand(template, &data).unwrap();
        let second = expander.expand(template, &data).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn test_if_else_on_nested_path() {
        let template = "{{#if personalInfo.phone}}{{personalInfo.phone}}{{else}}n/a{{/if}}";
        let e = markup();
        assert_eq!(
            e.expand(template, &json!({ "personalInfo": { "phone": "555" } })).unwrap(),
            "555"
        );
        assert_eq!(e.expand(template, &json!({})).unwrap(), "n/a");
    }

    #[test]
    fn test_html_escaping_in_markup_mode() {
        let data = json!({ "name": "<b>Emma</b>" });
        let e = markup();
        assert_eq!(
            e.expand("{{name}}", &data).unwrap(),
            "&lt;b&gt;Emma&lt;/b&gt;"
        );
        assert_eq!(e.expand("{{{name}}}", &data).unwrap(), "<b>Emma</b>");
    }

    #[test]
    fn test_plain_mode_does_not_escape() {
        let e = Expander::plain(&HelperTable::standard());
        let out = e.expand("{{company}}", &json!({ "company": "Smith & Sons" })).unwrap();
        assert_eq!(out, "Smith & Sons");
    }

    #[test]
    fn test_format_date_helper_in_template() {
        let out = markup()
            .expand(
                "{{formatDate startDate \"MMMM YYYY\"}}",
                &json!({ "startDate": "2027-03-01" }),
            )
            .unwrap();
        assert_eq!(out, "March 2027");
    }

    #[test]
    fn test_proficiency_dots_with_subexpression() {
        let template = "{{#each skills}}{{#if (gte level 3)}}●{{else}}○{{/if}}{{/each}}";
        let data = json!({ "skills": [{ "level": 4 }, { "level": 2 }] });
        assert_eq!(markup().expand(template, &data).unwrap(), "●○");
    }

    #[test]
    fn test_mod_gate_on_index() {
        let template = "{{#each items}}{{#if (mod @index 2)}}even{{else}}odd{{/if}} {{/each}}";
        let data = json!({ "items": [1, 2, 3] });
        assert_eq!(markup().expand(template, &data).unwrap(), "even odd even ");
    }

    #[test]
    fn test_eq_as_block_gate_and_value() {
        let e = markup();
        let data = json!({ "status": "current" });
        assert_eq!(
            e.expand("{{#eq status \"current\"}}now{{else}}then{{/eq}}", &data)
                .unwrap(),
            "now"
        );
        assert_eq!(e.expand("{{eq status \"past\"}}", &data).unwrap(), "false");
    }

    #[test]
    fn test_times_block_injects_index() {
        let out = markup()
            .expand("{{#times 3}}[{{@index}}]{{/times}}", &json!({}))
            .unwrap();
        assert_eq!(out, "[0][1][2]");
    }

    #[test]
    fn test_times_keeps_surrounding_scope() {
        let out = markup()
            .expand("{{#times count}}{{label}}{{/times}}", &json!({ "count": 2, "label": "*" }))
            .unwrap();
        assert_eq!(out, "**");
    }

    #[test]
    fn test_times_with_non_numeric_count_renders_nothing() {
        let out = markup()
            .expand("{{#times level}}x{{/times}}", &json!({ "level": "high" }))
            .unwrap();
        assert_eq!(out, "");
    }

    #[test]
    fn test_join_helper_in_template() {
        let out = markup()
            .expand("{{join tools \" | \"}}", &json!({ "tools": ["Rust", "Go"] }))
            .unwrap();
        assert_eq!(out, "Rust | Go");
    }

    #[test]
    fn test_unbalanced_block_is_syntax_error() {
        let err = markup().expand("{{#each skills}}{{name}}", &json!({})).unwrap_err();
        assert!(matches!(err, RenderError::TemplateSyntax(_)));
    }

    #[test]
    fn test_expanders_with_different_tables_coexist() {
        fn shout(args: &[Value]) -> Value {
            Value::String(display_value(args.first().unwrap_or(&Value::Null)).to_uppercase())
        }
        let loud = Expander::markup(&HelperTable::standard().with("shout", shout));
        let quiet = markup();
        let data = json!({ "name": "emma" });
        assert_eq!(loud.expand("{{shout name}}", &data).unwrap(), "EMMA");
        assert!(quiet.expand("{{shout name}}", &data).is_err());
    }
}
