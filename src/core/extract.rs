//! Text extraction from PDF documents

use miette::{IntoDiagnostic, Result};
use std::path::Path;
use std::process::Command;

/// Something that can turn a PDF into plain text
pub trait TextExtractor {
    fn extract(&self, pdf: &Path) -> Result<String>;
}

/// Runs an external program (pdftotext, an OCR wrapper, ...) and reads its stdout
///
/// The command line is split on whitespace; a `{pdf}` argument is replaced by
/// the document path, otherwise the path is appended.
#[derive(Debug, Clone)]
pub struct CommandExtractor {
    program: String,
    args: Vec<String>,
}

impl CommandExtractor {
    pub fn new(command_line: &str) -> Result<Self> {
        let mut parts = command_line.split_whitespace().map(String::from);
        let program = parts
            .next()
            .ok_or_else(|| miette::miette!("PDF text command is empty"))?;
        Ok(Self {
            program,
            args: parts.collect(),
        })
    }

    fn build(&self, pdf: &Path) -> Command {
        let mut cmd = Command::new(&self.program);
        let mut placed = false;
        for arg in &self.args {
            if arg == "{pdf}" {
                cmd.arg(pdf);
                placed = true;
            } else {
                cmd.arg(arg);
            }
        }
        if !placed {
            cmd.arg(pdf);
        }
        cmd
    }
}

impl TextExtractor for CommandExtractor {
    fn extract(&self, pdf: &Path) -> Result<String> {
        let output = self.build(pdf).output().map_err(|e| {
            miette::miette!("cannot run '{}': {}", self.program, e)
        })?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(miette::miette!(
                "'{}' failed on {}: {}",
                self.program,
                pdf.display(),
                stderr.trim()
            ));
        }

        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }
}

/// Reads `name.txt` next to `name.pdf`, for text extracted ahead of time
#[derive(Debug, Clone, Copy, Default)]
pub struct SidecarExtractor;

impl TextExtractor for SidecarExtractor {
    fn extract(&self, pdf: &Path) -> Result<String> {
        let sidecar = pdf.with_extension("txt");
        let bytes = std::fs::read(&sidecar).into_diagnostic()?;
        Ok(crate::core::transfer::decode(&bytes).0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_command_placeholder() {
        let extractor = CommandExtractor::new("pdftotext -layout {pdf} -").unwrap();
        let cmd = extractor.build(Path::new("/tmp/a.pdf"));
        let args: Vec<_> = cmd.get_args().map(|a| a.to_string_lossy().into_owned()).collect();
        assert_eq!(args, vec!["-layout", "/tmp/a.pdf", "-"]);
    }

    #[test]
    fn test_command_without_placeholder_appends_path() {
        let extractor = CommandExtractor::new("ocr-wrapper --lang fra").unwrap();
        let cmd = extractor.build(Path::new("x.pdf"));
        let args: Vec<_> = cmd.get_args().map(|a| a.to_string_lossy().into_owned()).collect();
        assert_eq!(args, vec!["--lang", "fra", "x.pdf"]);
    }

    #[test]
    fn test_empty_command_is_rejected() {
        assert!(CommandExtractor::new("   ").is_err());
    }

    #[test]
    fn test_missing_program_is_an_error() {
        let extractor = CommandExtractor::new("definitely-not-a-real-program-xyz {pdf}").unwrap();
        assert!(extractor.extract(Path::new("a.pdf")).is_err());
    }

    #[test]
    fn test_sidecar() {
        let tmp = tempfile::tempdir().unwrap();
        let pdf = tmp.path().join("porte.pdf");
        std::fs::write(&pdf, b"%PDF-1.4").unwrap();
        std::fs::write(tmp.path().join("porte.txt"), "Bloc-porte EI30").unwrap();

        assert_eq!(SidecarExtractor.extract(&pdf).unwrap(), "Bloc-porte EI30");
        assert!(SidecarExtractor.extract(&tmp.path().join("autre.pdf")).is_err());
    }
}
