//! Integration tests for rendering, assembling and sending messages.
//!
//! Messages go to a recording transport, and templates are written to a
//! temporary directory per test.

#![allow(clippy::unwrap_used, clippy::expect_used)]

use mailstamp::{
    Config, Envelope, Error, FuncMap, Mailer, SmtpSettings, TemplateData, Transport, Value,
};
use mailstamp_mime::Message;
use std::path::Path;
use std::sync::Mutex;
use tempfile::TempDir;

/// Captures submissions instead of delivering them.
#[derive(Default)]
struct RecordingTransport {
    sent: Mutex<Vec<(Envelope, Vec<u8>)>>,
    reject_with: Option<u16>,
}

impl RecordingTransport {
    fn rejecting(code: u16) -> Self {
        Self {
            reject_with: Some(code),
            ..Self::default()
        }
    }

    fn sent(&self) -> Vec<(Envelope, Vec<u8>)> {
        self.sent.lock().unwrap().clone()
    }
}

impl Transport for RecordingTransport {
    async fn send(&self, envelope: &Envelope, message: &[u8]) -> mailstamp_smtp::Result<()> {
        if let Some(code) = self.reject_with {
            return Err(mailstamp_smtp::Error::smtp(code, "5.7.1 Message rejected"));
        }
        self.sent
            .lock()
            .unwrap()
            .push((envelope.clone(), message.to_vec()));
        Ok(())
    }
}

const SUBJECT: &str = "Welcome {{ data.name }}\n";
const TEXT: &str = "Hi {{ data.name }}";
const HTML: &str = r#"{% extends "base.html" %}{% block content %}Hi {{ data.name }}{% endblock %}"#;
const BASE: &str = "<html>{% block content %}{% endblock %}</html>";

fn write_template(root: &Path, name: &str, files: &[(&str, &str)]) {
    let dir = root.join(name);
    std::fs::create_dir_all(&dir).unwrap();
    for (file, text) in files {
        std::fs::write(dir.join(file), text).unwrap();
    }
}

fn template_root() -> TempDir {
    let root = tempfile::tempdir().unwrap();
    std::fs::write(root.path().join("base.html"), BASE).unwrap();
    root
}

fn welcome_templates() -> TempDir {
    let root = template_root();
    write_template(
        root.path(),
        "welcome",
        &[
            ("subject.txt", SUBJECT),
            ("template.txt", TEXT),
            ("template.html", HTML),
        ],
    );
    root
}

fn config(root: &Path) -> Config {
    Config {
        from_address: "noreply@acme.test".to_string(),
        from_display: "Acme <noreply@acme.test>".to_string(),
        send_domain: "acme.test".to_string(),
        template_path: root.to_path_buf(),
        smtp: SmtpSettings {
            host: "smtp.acme.test".to_string(),
            username: "mailer".to_string(),
            password: "secret".to_string(),
            ..SmtpSettings::default()
        },
    }
}

fn mailer(root: &Path) -> Mailer<RecordingTransport> {
    Mailer::with_transport(config(root), RecordingTransport::default())
}

fn jane() -> TemplateData {
    let mut data = TemplateData::new();
    data.insert("name".into(), Value::from("Jane"));
    data
}

fn parse(raw: &[u8]) -> Message {
    Message::parse(std::str::from_utf8(raw).unwrap()).unwrap()
}

fn assert_message_id_shape(id: &str) {
    let (local, domain) = id.split_once('@').expect("missing @");
    assert_eq!(domain, "acme.test");
    let (seconds, suffix) = local.split_once('.').expect("missing .");
    assert!(!seconds.is_empty() && seconds.chars().all(|c| c.is_ascii_digit()));
    assert!(suffix.parse::<u32>().unwrap() <= 999_999);
}

#[tokio::test]
async fn sends_welcome_message() {
    let root = welcome_templates();
    let mailer = mailer(root.path());

    let result = mailer
        .send_mail(
            "Jane Doe",
            "jane@example.com",
            "welcome",
            &jane(),
            &FuncMap::new(),
            &FuncMap::new(),
        )
        .await
        .unwrap();
    assert_message_id_shape(&result.message_id);

    let sent = mailer.transport().sent();
    assert_eq!(sent.len(), 1);
    let (envelope, raw) = &sent[0];
    assert_eq!(
        envelope,
        &Envelope::new("noreply@acme.test", "jane@example.com")
    );

    let message = parse(raw);
    let names: Vec<&str> = message.headers.iter().map(|(name, _)| name).collect();
    assert_eq!(
        names,
        [
            "From",
            "To",
            "Subject",
            "Sender",
            "Message-ID",
            "Date",
            "MIME-Version",
            "Content-Type"
        ]
    );
    assert_eq!(message.headers.get("From"), Some("Acme <noreply@acme.test>"));
    assert_eq!(message.headers.get("Sender"), Some("Acme <noreply@acme.test>"));
    assert_eq!(
        message.headers.get("To"),
        Some("Jane Doe <jane@example.com>")
    );
    assert_eq!(message.subject(), Some("Welcome Jane"));
    assert_eq!(
        message.message_id(),
        Some(format!("<{}>", result.message_id).as_str())
    );
    assert_eq!(message.headers.get("MIME-Version"), Some("1.0"));
    assert_eq!(
        message.headers.get("Content-Type"),
        Some(r#"multipart/alternative; boundary="mimeboundary""#)
    );

    assert_eq!(message.parts.len(), 2);
    assert_eq!(
        message.parts[0].headers.get("Content-Transfer-Encoding"),
        Some("quoted-printable")
    );
    assert_eq!(message.text_part().unwrap(), "Hi Jane");
    assert_eq!(message.html_part().unwrap(), "<html>Hi Jane</html>");
}

#[tokio::test]
async fn wire_format_uses_crlf_and_closing_delimiter() {
    let root = welcome_templates();
    let mailer = mailer(root.path());
    let composed = mailer
        .compose(
            "",
            "jane@example.com",
            "welcome",
            &jane(),
            &FuncMap::new(),
            &FuncMap::new(),
        )
        .await
        .unwrap();

    let wire = String::from_utf8(composed.raw).unwrap();
    assert!(wire.ends_with("--mimeboundary--"));
    for (i, byte) in wire.bytes().enumerate() {
        if byte == b'\n' {
            assert_eq!(wire.as_bytes()[i - 1], b'\r', "bare LF at byte {i}");
        }
    }
    assert!(wire.contains("\r\n\r\n--mimeboundary\r\nContent-Type: text/plain; charset=\"UTF-8\"\r\n"));
    assert!(wire.contains("\r\n--mimeboundary\r\nContent-Type: text/html; charset=\"UTF-8\"\r\n"));

    // Nothing is sent when only composing
    assert!(mailer.transport().sent().is_empty());
}

#[tokio::test]
async fn date_header_is_rfc_2822() {
    let root = welcome_templates();
    let composed = mailer(root.path())
        .compose(
            "",
            "jane@example.com",
            "welcome",
            &jane(),
            &FuncMap::new(),
            &FuncMap::new(),
        )
        .await
        .unwrap();

    let message = parse(&composed.raw);
    let date = message.headers.get("Date").unwrap();
    let parsed = chrono::DateTime::parse_from_rfc2822(date).unwrap();
    let seconds: i64 = composed.message_id.split('.').next().unwrap().parse().unwrap();
    assert_eq!(parsed.timestamp(), seconds);
}

#[tokio::test]
async fn empty_to_name_uses_bare_address() {
    let root = welcome_templates();
    let mailer = mailer(root.path());
    mailer
        .send_mail(
            "",
            "jane@example.com",
            "welcome",
            &jane(),
            &FuncMap::new(),
            &FuncMap::new(),
        )
        .await
        .unwrap();

    let message = parse(&mailer.transport().sent()[0].1);
    assert_eq!(message.headers.get("To"), Some("jane@example.com"));
}

#[tokio::test]
async fn non_ascii_subject_and_name_are_encoded() {
    let root = welcome_templates();
    let mailer = mailer(root.path());
    let mut data = TemplateData::new();
    data.insert("name".into(), Value::from("Zoë"));

    mailer
        .send_mail(
            "Zoë",
            "zoe@example.com",
            "welcome",
            &data,
            &FuncMap::new(),
            &FuncMap::new(),
        )
        .await
        .unwrap();

    let raw = &mailer.transport().sent()[0].1;
    assert!(raw.is_ascii());
    let message = parse(raw);
    let subject = message.subject().unwrap();
    assert!(subject.starts_with("=?utf-8?B?"));
    assert_eq!(
        mailstamp_mime::encoding::decode_rfc2047(subject).unwrap(),
        "Welcome Zoë"
    );
    assert_eq!(message.text_part().unwrap(), "Hi Zoë");
}

#[tokio::test]
async fn invalid_config_sends_nothing() {
    let root = welcome_templates();

    let mut missing_display = config(root.path());
    missing_display.from_display.clear();
    let mailer = Mailer::with_transport(missing_display, RecordingTransport::default());
    let err = mailer
        .send_mail(
            "",
            "jane@example.com",
            "welcome",
            &jane(),
            &FuncMap::new(),
            &FuncMap::new(),
        )
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        Error::InvalidConfig {
            field: "from_display"
        }
    ));
    assert!(mailer.transport().sent().is_empty());

    let mut missing_domain = config(root.path());
    missing_domain.send_domain.clear();
    let mailer = Mailer::with_transport(missing_domain, RecordingTransport::default());
    // Checked before the template is even looked up
    let err = mailer
        .send_mail(
            "",
            "jane@example.com",
            "does-not-exist",
            &jane(),
            &FuncMap::new(),
            &FuncMap::new(),
        )
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        Error::InvalidConfig {
            field: "send_domain"
        }
    ));
    assert!(mailer.transport().sent().is_empty());
}

#[tokio::test]
async fn unknown_template_sends_nothing() {
    let root = welcome_templates();
    let mailer = mailer(root.path());

    let err = mailer
        .send_mail(
            "",
            "jane@example.com",
            "goodbye",
            &jane(),
            &FuncMap::new(),
            &FuncMap::new(),
        )
        .await
        .unwrap_err();
    assert!(matches!(err, Error::TemplateMissing { ref name } if name == "goodbye"));
    assert!(mailer.transport().sent().is_empty());
}

#[tokio::test]
async fn each_missing_file_is_reported_and_nothing_is_sent() {
    for missing in ["base.html", "subject.txt", "template.txt", "template.html"] {
        let root = welcome_templates();
        let path = if missing == "base.html" {
            root.path().join(missing)
        } else {
            root.path().join("welcome").join(missing)
        };
        std::fs::remove_file(&path).unwrap();
        let mailer = mailer(root.path());

        let err = mailer
            .send_mail(
                "",
                "jane@example.com",
                "welcome",
                &jane(),
                &FuncMap::new(),
                &FuncMap::new(),
            )
            .await
            .unwrap_err();
        match err {
            Error::TemplateMissingFile { path: reported } => assert_eq!(reported, path),
            other => panic!("{missing}: unexpected error: {other}"),
        }
        assert!(mailer.transport().sent().is_empty(), "{missing}: message was sent");
    }
}

#[tokio::test]
async fn html_body_is_escaped_text_body_is_not() {
    let root = welcome_templates();
    let mailer = mailer(root.path());
    let mut data = TemplateData::new();
    data.insert("name".into(), Value::from("<b>Jane</b> & co"));

    let rendered = mailer
        .render(
            "jane@example.com",
            "welcome",
            &data,
            &FuncMap::new(),
            &FuncMap::new(),
        )
        .await
        .unwrap();

    assert_eq!(rendered.text, "Hi <b>Jane</b> & co");
    assert_eq!(rendered.subject, "Welcome <b>Jane</b> & co");
    assert!(rendered.html.starts_with("<html>Hi &lt;b&gt;Jane&lt;"));
    assert!(rendered.html.contains("&amp; co"));
    assert!(rendered.html.ends_with("</html>"));
}

#[tokio::test]
async fn each_body_sees_its_own_functions() {
    let root = template_root();
    write_template(
        root.path(),
        "fns",
        &[
            ("subject.txt", "{{ greet(recipient_email) }}"),
            ("template.txt", "{{ greet(data.name) }}"),
            (
                "template.html",
                r#"{% extends "base.html" %}{% block content %}{{ year() }}{% endblock %}"#,
            ),
        ],
    );
    let text_functions = FuncMap::new().with("greet", |who: String| format!("Hello {who}"));
    let html_functions = FuncMap::new().with("year", || 2031);

    let rendered = mailer(root.path())
        .render(
            "jane@example.com",
            "fns",
            &jane(),
            &text_functions,
            &html_functions,
        )
        .await
        .unwrap();

    assert_eq!(rendered.subject, "Hello jane@example.com");
    assert_eq!(rendered.text, "Hello Jane");
    assert_eq!(rendered.html, "<html>2031</html>");
}

#[tokio::test]
async fn undefined_function_is_a_render_error() {
    let root = welcome_templates();
    // The text function set does not reach the HTML template
    std::fs::write(
        root.path().join("welcome").join("template.html"),
        r#"{% extends "base.html" %}{% block content %}{{ greet("x") }}{% endblock %}"#,
    )
    .unwrap();
    let mailer = mailer(root.path());
    let text_functions = FuncMap::new().with("greet", |who: String| who);

    let err = mailer
        .send_mail(
            "",
            "jane@example.com",
            "welcome",
            &jane(),
            &text_functions,
            &FuncMap::new(),
        )
        .await
        .unwrap_err();
    assert!(matches!(err, Error::Render(_)), "unexpected error: {err}");
    assert!(mailer.transport().sent().is_empty());
}

#[tokio::test]
async fn template_syntax_error_is_a_render_error() {
    let root = welcome_templates();
    std::fs::write(root.path().join("welcome").join("subject.txt"), "{{ oops").unwrap();

    let err = mailer(root.path())
        .render(
            "jane@example.com",
            "welcome",
            &jane(),
            &FuncMap::new(),
            &FuncMap::new(),
        )
        .await
        .unwrap_err();
    assert!(matches!(err, Error::Render(_)));
}

#[tokio::test]
async fn templates_are_read_on_every_send() {
    let root = welcome_templates();
    let mailer = mailer(root.path());
    let data = jane();
    let functions = FuncMap::new();
    let send = || {
        mailer.send_mail(
            "",
            "jane@example.com",
            "welcome",
            &data,
            &functions,
            &functions,
        )
    };

    send().await.unwrap();
    std::fs::write(root.path().join("welcome").join("template.txt"), "Bye {{ data.name }}")
        .unwrap();
    send().await.unwrap();

    let sent = mailer.transport().sent();
    assert_eq!(parse(&sent[0].1).text_part().unwrap(), "Hi Jane");
    assert_eq!(parse(&sent[1].1).text_part().unwrap(), "Bye Jane");
}

#[tokio::test]
async fn long_lines_are_soft_wrapped() {
    let root = welcome_templates();
    let mailer = mailer(root.path());
    let mut data = TemplateData::new();
    data.insert("name".into(), Value::from("x".repeat(300)));

    let composed = mailer
        .compose(
            "",
            "jane@example.com",
            "welcome",
            &data,
            &FuncMap::new(),
            &FuncMap::new(),
        )
        .await
        .unwrap();

    let wire = String::from_utf8(composed.raw.clone()).unwrap();
    let (_, body) = wire.split_once("\r\n\r\n").unwrap();
    assert!(body.split("\r\n").all(|line| line.len() <= 76));
    assert_eq!(
        parse(&composed.raw).text_part().unwrap(),
        format!("Hi {}", "x".repeat(300))
    );
}

#[tokio::test]
async fn body_mentioning_the_boundary_is_sent_intact() {
    let root = welcome_templates();
    let text = "Set the option --mimeboundary=x in your config\r\n--mimeboundary--\r\nafter";
    std::fs::write(root.path().join("welcome").join("template.txt"), text).unwrap();
    let mailer = mailer(root.path());

    mailer
        .send_mail(
            "",
            "jane@example.com",
            "welcome",
            &jane(),
            &FuncMap::new(),
            &FuncMap::new(),
        )
        .await
        .unwrap();

    let sent = mailer.transport().sent();
    assert_eq!(sent.len(), 1);
    let wire = String::from_utf8(sent[0].1.clone()).unwrap();
    let delimiter_lines = wire
        .split("\r\n")
        .filter(|line| line.starts_with("--mimeboundary"))
        .count();
    assert_eq!(delimiter_lines, 3);
    assert_eq!(parse(&sent[0].1).text_part().unwrap(), text);
}

#[tokio::test]
async fn transport_errors_are_propagated() {
    let root = welcome_templates();
    let mailer = Mailer::with_transport(config(root.path()), RecordingTransport::rejecting(554));

    let err = mailer
        .send_mail(
            "",
            "jane@example.com",
            "welcome",
            &jane(),
            &FuncMap::new(),
            &FuncMap::new(),
        )
        .await
        .unwrap_err();
    match err {
        Error::Transport(inner) => {
            assert!(inner.is_permanent());
            assert!(matches!(inner, mailstamp_smtp::Error::Smtp { code: 554, .. }));
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[tokio::test]
async fn welcome_scenario() {
    let root = template_root();
    write_template(
        root.path(),
        "welcome",
        &[
            ("subject.txt", "Hi {{ data.name }}"),
            ("template.txt", "Hello {{ data.name }}"),
            ("template.html", HTML),
        ],
    );
    let mailer = mailer(root.path());

    let result = mailer
        .send_mail(
            "Jane",
            "jane@x.com",
            "welcome",
            &jane(),
            &FuncMap::new(),
            &FuncMap::new(),
        )
        .await
        .unwrap();
    assert_message_id_shape(&result.message_id);

    let message = parse(&mailer.transport().sent()[0].1);
    assert_eq!(message.subject(), Some("Hi Jane"));
    assert_eq!(message.headers.get("To"), Some("Jane <jane@x.com>"));
    assert_eq!(message.text_part().unwrap(), "Hello Jane");
}

#[tokio::test]
async fn repeated_sends_get_fresh_message_ids() {
    let root = welcome_templates();
    let mailer = mailer(root.path());
    let data = jane();
    let functions = FuncMap::new();

    let mut ids = Vec::new();
    for _ in 0..3 {
        let result = mailer
            .send_mail(
                "",
                "jane@example.com",
                "welcome",
                &data,
                &functions,
                &functions,
            )
            .await
            .unwrap();
        ids.push(result.message_id);
    }
    // A collision needs the same second and the same draw from a million
    ids.dedup();
    assert!(ids.len() >= 2, "message ids repeated: {ids:?}");

    let sent = mailer.transport().sent();
    let first = parse(&sent[0].1);
    for (_, raw) in &sent[1..] {
        let message = parse(raw);
        assert_eq!(message.subject(), first.subject());
        assert_eq!(message.text_part().unwrap(), first.text_part().unwrap());
        assert_eq!(message.html_part().unwrap(), first.html_part().unwrap());
        assert_ne!(message.message_id(), None);
    }
}
