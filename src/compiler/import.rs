use crate::compiler::{CompileError, Compiler};
use crate::diagnostics::has_errors;
use crate::parser::parse;

use tracing::debug;

use std::mem;
use std::ops::Range;
use std::path::{Component, Path, PathBuf};

/// Lexically resolves `.` and `..` so the same file reached through
/// different spellings is recognised.
pub fn normalize(path: &Path) -> PathBuf {
    let mut out = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                let popped = matches!(out.components().next_back(), Some(Component::Normal(_))) && out.pop();
                if !popped {
                    out.push("..");
                }
            }
            other => out.push(other.as_os_str()),
        }
    }
    out
}

impl Compiler<'_> {
    /// Compiles another file's statements in place, into the entry
    /// function and the root scope. Each file is compiled at most once.
    pub(crate) fn compile_import(&mut self, path: &str, span: Range<usize>) {
        // imported names live in the root frame only
        if !self.env.is_root() {
            self.error(CompileError::NestedImport, span);
            return;
        }

        let base = Path::new(&self.file).parent().unwrap_or(Path::new(""));
        let resolved = normalize(&base.join(path));
        let shown = resolved.display().to_string();

        if let Some(start) = self.importing.iter().position(|p| *p == resolved) {
            let chain = self.importing[start..]
                .iter()
                .chain(std::iter::once(&resolved))
                .map(|p| p.display().to_string())
                .collect::<Vec<_>>()
                .join(" -> ");
            self.error(CompileError::ImportCycle { chain }, span);
            return;
        }
        if self.imported.contains(&resolved) {
            self.error(CompileError::AlreadyImported { path: shown }, span);
            return;
        }

        let source = match self.provider.load(&resolved) {
            Ok(source) => source,
            Err(err) => {
                self.error(
                    CompileError::ImportRead {
                        path: shown,
                        reason: err.to_string(),
                    },
                    span,
                );
                return;
            }
        };

        let (program, parse_errors) = parse(&source, &shown);
        if has_errors(&parse_errors) {
            self.diagnostics.extend(parse_errors);
            self.error(CompileError::ImportSyntax { path: shown }, span);
            return;
        }

        debug!(path = %shown, statements = program.statements.len(), "importing");
        self.importing.push(resolved.clone());
        let importer = mem::replace(&mut self.file, shown);
        for statement in &program.statements {
            self.compile_statement(statement);
        }
        self.file = importer;
        self.importing.pop();
        self.imported.insert(resolved);
    }
}
