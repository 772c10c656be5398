//! Template rendering.
//!
//! A named template is a directory under the template root holding three
//! files, plus one HTML layout shared by every template:
//!
//! ```text
//! <root>/base.html             HTML layout
//! <root>/<name>/subject.txt    plain text, rendered without escaping
//! <root>/<name>/template.txt   plain text body
//! <root>/<name>/template.html  HTML body, extends "base.html"
//! ```
//!
//! Templates use Jinja syntax. Each render sees `recipient_email` and
//! `data`, plus whatever functions the caller registered for that policy.
//! Files are read on every call, so edits on disk apply to the next send.

use crate::error::{Error, Result};
use minijinja::functions::Function;
use minijinja::value::{FunctionArgs, FunctionResult};
use minijinja::{AutoEscape, Environment, Value};
use serde::Serialize;
use std::collections::BTreeMap;
use std::path::{Component, Path, PathBuf};

/// Subject template file name.
pub const SUBJECT_FILE: &str = "subject.txt";
/// Plain-text body template file name.
pub const TEXT_FILE: &str = "template.txt";
/// HTML body template file name.
pub const HTML_FILE: &str = "template.html";
/// Shared HTML layout file name, at the template root.
pub const BASE_FILE: &str = "base.html";

/// Caller-supplied values exposed to templates as `data`.
pub type TemplateData = BTreeMap<String, Value>;

/// Named functions callable from templates.
#[derive(Debug, Clone, Default)]
pub struct FuncMap {
    functions: BTreeMap<String, Value>,
}

impl FuncMap {
    /// Creates an empty function set.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a function under `name`, replacing any previous one.
    pub fn insert<F, Rv, Args>(&mut self, name: impl Into<String>, f: F)
    where
        F: Function<Rv, Args> + for<'a> Function<Rv, <Args as FunctionArgs<'a>>::Output>,
        Rv: FunctionResult,
        Args: for<'a> FunctionArgs<'a>,
    {
        self.functions.insert(name.into(), Value::from_function::<F, Rv, Args>(f));
    }

    /// Builder form of [`FuncMap::insert`].
    #[must_use]
    pub fn with<F, Rv, Args>(mut self, name: impl Into<String>, f: F) -> Self
    where
        F: Function<Rv, Args> + for<'a> Function<Rv, <Args as FunctionArgs<'a>>::Output>,
        Rv: FunctionResult,
        Args: for<'a> FunctionArgs<'a>,
    {
        self.insert(name, f);
        self
    }

    /// Returns true if `name` is registered.
    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.functions.contains_key(name)
    }

    /// Number of registered functions.
    #[must_use]
    pub fn len(&self) -> usize {
        self.functions.len()
    }

    /// Returns true if no functions are registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.functions.is_empty()
    }

    fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.functions.iter().map(|(name, f)| (name.as_str(), f))
    }
}

/// Values visible to every template.
#[derive(Debug, Clone, Copy, Serialize)]
pub struct RenderContext<'a> {
    /// Address the message is sent to.
    pub recipient_email: &'a str,
    /// Caller-supplied data.
    pub data: &'a TemplateData,
}

/// A template's name and source text.
#[derive(Debug, Clone, Copy)]
pub struct Source<'a> {
    /// Name other templates use to refer to this one.
    pub name: &'a str,
    /// Template text.
    pub text: &'a str,
}

/// How template output is escaped.
pub trait RenderPolicy {
    /// Escaping applied to interpolated values.
    fn auto_escape(&self) -> AutoEscape;

    /// Renders `template`, with `layouts` available for `extends` and
    /// `include`.
    ///
    /// # Errors
    ///
    /// Returns the engine error if any template fails to parse or execute.
    fn render(
        &self,
        template: Source<'_>,
        layouts: &[Source<'_>],
        context: &RenderContext<'_>,
        functions: &FuncMap,
    ) -> std::result::Result<String, minijinja::Error> {
        let escape = self.auto_escape();
        let mut env = Environment::new();
        env.set_keep_trailing_newline(true);
        env.set_auto_escape_callback(move |_| escape.clone());
        for (name, function) in functions.iter() {
            env.add_global(name.to_string(), function.clone());
        }
        for layout in layouts {
            env.add_template(layout.name, layout.text)?;
        }
        env.add_template(template.name, template.text)?;
        env.get_template(template.name)?.render(context)
    }
}

/// Plain text: values are inserted verbatim.
#[derive(Debug, Clone, Copy, Default)]
pub struct TextPolicy;

impl RenderPolicy for TextPolicy {
    fn auto_escape(&self) -> AutoEscape {
        AutoEscape::None
    }
}

/// HTML: values are escaped unless marked safe.
#[derive(Debug, Clone, Copy, Default)]
pub struct HtmlPolicy;

impl RenderPolicy for HtmlPolicy {
    fn auto_escape(&self) -> AutoEscape {
        AutoEscape::Html
    }
}

/// Output of rendering one named template.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Rendered {
    /// Subject line with surrounding whitespace removed.
    pub subject: String,
    /// Plain-text body.
    pub text: String,
    /// HTML body.
    pub html: String,
}

/// Files making up one named template.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TemplatePaths {
    /// Shared HTML layout.
    pub base: PathBuf,
    /// Template directory.
    pub dir: PathBuf,
    /// Subject template.
    pub subject: PathBuf,
    /// Plain-text body template.
    pub text: PathBuf,
    /// HTML body template.
    pub html: PathBuf,
}

impl TemplatePaths {
    fn new(root: &Path, name: &str) -> Self {
        let dir = root.join(name);
        Self {
            base: root.join(BASE_FILE),
            subject: dir.join(SUBJECT_FILE),
            text: dir.join(TEXT_FILE),
            html: dir.join(HTML_FILE),
            dir,
        }
    }
}

/// Loads named templates from a directory and renders them.
#[derive(Debug, Clone)]
pub struct Renderer {
    root: PathBuf,
}

impl Renderer {
    /// Creates a renderer reading templates below `root`.
    #[must_use]
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Template root directory.
    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Resolves the files of a named template.
    ///
    /// The name must be a single path component; anything that would
    /// leave the template root is treated as a missing template.
    ///
    /// # Errors
    ///
    /// Returns [`Error::TemplateMissing`] if the name is not usable.
    pub fn paths(&self, template_name: &str) -> Result<TemplatePaths> {
        let mut components = Path::new(template_name).components();
        match (components.next(), components.next()) {
            (Some(Component::Normal(_)), None) => {
                Ok(TemplatePaths::new(&self.root, template_name))
            }
            _ => Err(Error::TemplateMissing {
                name: template_name.to_string(),
            }),
        }
    }

    /// Renders the subject, text body and HTML body of a named template,
    /// in that order.
    ///
    /// # Errors
    ///
    /// - [`Error::TemplateMissing`] if the template directory does not exist
    /// - [`Error::TemplateMissingFile`] if one of its files is absent
    /// - [`Error::Render`] if a template fails to parse or execute
    /// - [`Error::Io`] for other read failures
    pub async fn render(
        &self,
        recipient_email: &str,
        template_name: &str,
        data: &TemplateData,
        text_functions: &FuncMap,
        html_functions: &FuncMap,
    ) -> Result<Rendered> {
        let paths = self.paths(template_name)?;
        match tokio::fs::metadata(&paths.dir).await {
            Ok(meta) if meta.is_dir() => {}
            Ok(_) => {
                return Err(Error::TemplateMissing {
                    name: template_name.to_string(),
                });
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(Error::TemplateMissing {
                    name: template_name.to_string(),
                });
            }
            Err(e) => return Err(e.into()),
        }

        tracing::debug!(template = template_name, "Rendering template");
        let context = RenderContext {
            recipient_email,
            data,
        };

        let subject = read_template(&paths.subject).await?;
        let subject = TextPolicy.render(
            Source {
                name: SUBJECT_FILE,
                text: &subject,
            },
            &[],
            &context,
            text_functions,
        )?;

        let text = read_template(&paths.text).await?;
        let text = TextPolicy.render(
            Source {
                name: TEXT_FILE,
                text: &text,
            },
            &[],
            &context,
            text_functions,
        )?;

        let html = read_template(&paths.html).await?;
        let base = read_template(&paths.base).await?;
        let html = HtmlPolicy.render(
            Source {
                name: HTML_FILE,
                text: &html,
            },
            &[Source {
                name: BASE_FILE,
                text: &base,
            }],
            &context,
            html_functions,
        )?;

        Ok(Rendered {
            subject: subject.trim().to_string(),
            text,
            html,
        })
    }
}

async fn read_template(path: &Path) -> Result<String> {
    tokio::fs::read_to_string(path).await.map_err(|e| {
        if e.kind() == std::io::ErrorKind::NotFound {
            Error::TemplateMissingFile {
                path: path.to_path_buf(),
            }
        } else {
            Error::Io(e)
        }
    })
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn context(data: &TemplateData) -> RenderContext<'_> {
        RenderContext {
            recipient_email: "jane@example.com",
            data,
        }
    }

    fn source(text: &str) -> Source<'_> {
        Source { name: "t", text }
    }

    fn write_template(root: &Path, name: &str, files: &[(&str, &str)]) {
        let dir = root.join(name);
        std::fs::create_dir_all(&dir).unwrap();
        for (file, text) in files {
            std::fs::write(dir.join(file), text).unwrap();
        }
    }

    #[test]
    fn text_policy_does_not_escape() {
        let mut data = TemplateData::new();
        data.insert("name".into(), Value::from("<b>Jane</b> & co"));

        let out = TextPolicy
            .render(source("Hi {{ data.name }}"), &[], &context(&data), &FuncMap::new())
            .unwrap();
        assert_eq!(out, "Hi <b>Jane</b> & co");
    }

    #[test]
    fn html_policy_escapes_values() {
        let mut data = TemplateData::new();
        data.insert("name".into(), Value::from("<b>Jane</b> & co"));

        let out = HtmlPolicy
            .render(source("<p>{{ data.name }}</p>"), &[], &context(&data), &FuncMap::new())
            .unwrap();
        assert!(out.starts_with("<p>&lt;b&gt;Jane&lt;"));
        assert!(out.contains("&amp; co"));
        assert!(!out.contains("<b>"));
    }

    #[test]
    fn layouts_are_available_for_extends() {
        let data = TemplateData::new();
        let base = Source {
            name: BASE_FILE,
            text: "<html>{% block content %}{% endblock %}</html>",
        };
        let child = Source {
            name: HTML_FILE,
            text: r#"{% extends "base.html" %}{% block content %}{{ recipient_email }}{% endblock %}"#,
        };

        let out = HtmlPolicy
            .render(child, &[base], &context(&data), &FuncMap::new())
            .unwrap();
        assert_eq!(out, "<html>jane@example.com</html>");
    }

    #[test]
    fn registered_functions_are_callable() {
        let data = TemplateData::new();
        let functions = FuncMap::new().with("shout", |s: String| s.to_uppercase());
        assert!(functions.contains("shout"));
        assert_eq!(functions.len(), 1);

        let out = TextPolicy
            .render(source("{{ shout('hey') }}"), &[], &context(&data), &functions)
            .unwrap();
        assert_eq!(out, "HEY");
    }

    #[test]
    fn inserted_functions_take_several_arguments() {
        let data = TemplateData::new();
        let mut functions = FuncMap::new();
        assert!(functions.is_empty());
        functions.insert("join", |a: String, b: String| format!("{a}-{b}"));
        functions.insert("answer", || 42);

        let out = HtmlPolicy
            .render(
                source("{{ join('a', 'b') }} {{ answer() }}"),
                &[],
                &context(&data),
                &functions,
            )
            .unwrap();
        assert_eq!(out, "a-b 42");
    }

    #[test]
    fn unknown_function_is_an_error() {
        let data = TemplateData::new();
        let result = TextPolicy.render(source("{{ nope() }}"), &[], &context(&data), &FuncMap::new());
        assert!(result.is_err());
    }

    #[test]
    fn trailing_newline_is_kept() {
        let data = TemplateData::new();
        let out = TextPolicy
            .render(source("line\n"), &[], &context(&data), &FuncMap::new())
            .unwrap();
        assert_eq!(out, "line\n");
    }

    #[test]
    fn names_leaving_the_root_are_rejected() {
        let renderer = Renderer::new("/srv/templates");
        for name in ["", ".", "..", "../etc", "a/b", "/abs"] {
            assert!(
                matches!(renderer.paths(name), Err(Error::TemplateMissing { .. })),
                "{name:?} should be rejected"
            );
        }

        let paths = renderer.paths("welcome").unwrap();
        assert_eq!(paths.dir, PathBuf::from("/srv/templates/welcome"));
        assert_eq!(paths.html, PathBuf::from("/srv/templates/welcome/template.html"));
        assert_eq!(paths.base, PathBuf::from("/srv/templates/base.html"));
    }

    #[tokio::test]
    async fn renders_all_three_outputs() {
        let root = tempfile::tempdir().unwrap();
        write_template(
            root.path(),
            "welcome",
            &[
                (SUBJECT_FILE, "  Welcome {{ data.name }}\n"),
                (TEXT_FILE, "Hi {{ data.name }}"),
                (HTML_FILE, r#"{% extends "base.html" %}{% block content %}Hi {{ data.name }}{% endblock %}"#),
            ],
        );
        std::fs::write(
            root.path().join(BASE_FILE),
            "<html>{% block content %}{% endblock %}</html>",
        )
        .unwrap();

        let mut data = TemplateData::new();
        data.insert("name".into(), Value::from("Jane"));
        let rendered = Renderer::new(root.path())
            .render("jane@example.com", "welcome", &data, &FuncMap::new(), &FuncMap::new())
            .await
            .unwrap();

        assert_eq!(
            rendered,
            Rendered {
                subject: "Welcome Jane".to_string(),
                text: "Hi Jane".to_string(),
                html: "<html>Hi Jane</html>".to_string(),
            }
        );
    }

    #[tokio::test]
    async fn missing_directory_is_template_missing() {
        let root = tempfile::tempdir().unwrap();
        let err = Renderer::new(root.path())
            .render("a@b.c", "nope", &TemplateData::new(), &FuncMap::new(), &FuncMap::new())
            .await
            .unwrap_err();
        assert!(matches!(err, Error::TemplateMissing { ref name } if name == "nope"));
    }

    #[tokio::test]
    async fn missing_base_is_reported_by_path() {
        let root = tempfile::tempdir().unwrap();
        write_template(
            root.path(),
            "welcome",
            &[(SUBJECT_FILE, "s"), (TEXT_FILE, "t"), (HTML_FILE, "h")],
        );

        let err = Renderer::new(root.path())
            .render("a@b.c", "welcome", &TemplateData::new(), &FuncMap::new(), &FuncMap::new())
            .await
            .unwrap_err();
        match err {
            Error::TemplateMissingFile { path } => {
                assert_eq!(path, root.path().join(BASE_FILE));
            }
            other => panic!("unexpected error: {other}"),
        }
    }
}
