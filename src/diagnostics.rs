use ariadne::{Color, ColorGenerator, Config, Label, Report, ReportKind};

use crate::source::SourceProvider;

use std::collections::HashMap;
use std::fmt::{self, Display, Formatter};
use std::ops::Range;
use std::path::Path;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    Error,
    Note,
}

impl Display for Severity {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            Severity::Error => write!(f, "error"),
            Severity::Note => write!(f, "note"),
        }
    }
}

/// A problem found while parsing or compiling. Collected, never thrown.
#[derive(Debug, Clone, PartialEq)]
pub struct Diagnostic {
    pub severity: Severity,
    pub code: &'static str,
    pub message: String,
    pub file: String,
    pub span: Range<usize>,
    pub note: Option<String>,
}

impl Diagnostic {
    pub fn error(
        code: &'static str,
        message: impl Into<String>,
        file: impl Into<String>,
        span: Range<usize>,
    ) -> Self {
        Diagnostic {
            severity: Severity::Error,
            code,
            message: message.into(),
            file: file.into(),
            span,
            note: None,
        }
    }

    pub fn with_severity(mut self, severity: Severity) -> Self {
        self.severity = severity;
        self
    }

    pub fn with_note(mut self, note: impl Into<String>) -> Self {
        self.note = Some(note.into());
        self
    }

    pub fn is_error(&self) -> bool {
        self.severity == Severity::Error
    }

    pub fn report(&self, color: bool) -> Report<'static, (String, Range<usize>)> {
        let kind = match self.severity {
            Severity::Error => ReportKind::Error,
            Severity::Note => ReportKind::Advice,
        };
        let label_color = if color {
            ColorGenerator::new().next()
        } else {
            Color::Primary
        };

        let mut builder = Report::build(kind, (self.file.clone(), self.span.clone()))
            .with_config(Config::default().with_color(color))
            .with_code(self.code)
            .with_message(&self.message)
            .with_label(
                Label::new((self.file.clone(), self.span.clone()))
                    .with_message(&self.message)
                    .with_color(label_color),
            );
        if let Some(note) = &self.note {
            builder = builder.with_note(note);
        }
        builder.finish()
    }
}

impl Display for Diagnostic {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}:{}..{}: {}[{}]: {}",
            self.file, self.span.start, self.span.end, self.severity, self.code, self.message
        )
    }
}

pub fn has_errors(diagnostics: &[Diagnostic]) -> bool {
    diagnostics.iter().any(Diagnostic::is_error)
}

fn source_cache(
    diagnostics: &[Diagnostic],
    provider: &dyn SourceProvider,
) -> HashMap<String, String> {
    let mut cache = HashMap::new();
    for diagnostic in diagnostics {
        if cache.contains_key(&diagnostic.file) {
            continue;
        }
        if let Ok(source) = provider.load(Path::new(&diagnostic.file)) {
            cache.insert(diagnostic.file.clone(), source);
        }
    }
    cache
}

fn write_reports(
    diagnostics: &[Diagnostic],
    provider: &dyn SourceProvider,
    color: bool,
    out: &mut dyn std::io::Write,
) -> std::io::Result<()> {
    let sources = source_cache(diagnostics, provider);
    for diagnostic in diagnostics {
        match sources.get(&diagnostic.file) {
            Some(source) if diagnostic.span.end <= source.len() => {
                let cache = ariadne::sources(vec![(diagnostic.file.clone(), source.clone())]);
                diagnostic.report(color).write(cache, &mut *out)?;
            }
            // no snippet available, fall back to the one-line form
            _ => writeln!(out, "{diagnostic}")?,
        }
    }
    Ok(())
}

/// Renders every diagnostic without colour, e.g. for logs and tests.
pub fn render(diagnostics: &[Diagnostic], provider: &dyn SourceProvider) -> String {
    let mut buffer = Vec::new();
    if write_reports(diagnostics, provider, false, &mut buffer).is_err() {
        return diagnostics
            .iter()
            .map(|diagnostic| format!("{diagnostic}\n"))
            .collect();
    }
    String::from_utf8_lossy(&buffer).into_owned()
}

/// Prints coloured reports to stderr.
pub fn eprint(diagnostics: &[Diagnostic], provider: &dyn SourceProvider) {
    let stderr = std::io::stderr();
    let mut lock = stderr.lock();
    if let Err(err) = write_reports(diagnostics, provider, true, &mut lock) {
        tracing::warn!("failed to print diagnostics: {err}");
    }
}
