use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::Duration;

use tempfile::TempDir;
use tracing::{debug, info};

use crate::config::{OcrConfig, OcrMode};
use crate::error::TabellError;

/// Produces a searchable copy of a PDF.
pub trait OcrEngine: Send + Sync {
    /// Write a searchable version of `input` to `output`.
    fn make_searchable(&self, input: &Path, output: &Path) -> Result<(), TabellError>;

    /// Name of this engine (for diagnostics).
    fn engine_name(&self) -> &str;
}

/// The `ocrmypdf` command-line tool, run under a wall-clock limit.
#[derive(Debug, Clone)]
pub struct OcrMyPdf {
    binary: String,
    mode: OcrMode,
    deskew: bool,
    optimize: u8,
    languages: Vec<String>,
    timeout: Duration,
}

impl OcrMyPdf {
    pub fn new(config: &OcrConfig) -> Self {
        OcrMyPdf {
            binary: config.binary.clone(),
            mode: config.mode,
            deskew: config.deskew,
            optimize: config.optimize,
            languages: config.languages.clone(),
            timeout: Duration::from_secs(config.timeout_secs),
        }
    }

    /// Arguments for one run, without the binary.
    pub fn command_args(&self, input: &Path, output: &Path) -> Vec<OsString> {
        let mut args: Vec<OsString> = Vec::new();
        args.push(
            match self.mode {
                OcrMode::SkipText => "--skip-text",
                OcrMode::Force => "--force-ocr",
                OcrMode::Redo => "--redo-ocr",
            }
            .into(),
        );
        // ocrmypdf refuses --deskew together with --redo-ocr
        if self.deskew && self.mode != OcrMode::Redo {
            args.push("--deskew".into());
        }
        args.push("--optimize".into());
        args.push(self.optimize.to_string().into());
        if !self.languages.is_empty() {
            args.push("-l".into());
            args.push(self.languages.join("+").into());
        }
        args.push(input.as_os_str().to_owned());
        args.push(output.as_os_str().to_owned());
        args
    }

    async fn run(&self, args: Vec<OsString>) -> Result<std::process::Output, TabellError> {
        let child = tokio::process::Command::new(&self.binary)
            .args(&args)
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| {
                if e.kind() == std::io::ErrorKind::NotFound {
                    TabellError::OcrNotFound
                } else {
                    TabellError::Io(e)
                }
            })?;

        // a timed-out wait drops the child, which kills it
        match tokio::time::timeout(self.timeout, child.wait_with_output()).await {
            Ok(result) => Ok(result?),
            Err(_) => Err(TabellError::OcrTimeout {
                seconds: self.timeout.as_secs(),
            }),
        }
    }
}

impl OcrEngine for OcrMyPdf {
    fn make_searchable(&self, input: &Path, output: &Path) -> Result<(), TabellError> {
        let args = self.command_args(input, output);
        debug!(binary = %self.binary, ?args, "running OCR");

        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()?;
        let output = runtime.block_on(self.run(args))?;

        if !output.status.success() {
            return Err(TabellError::OcrFailed {
                code: output.status.code().unwrap_or(-1),
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }
        Ok(())
    }

    fn engine_name(&self) -> &str {
        "ocrmypdf"
    }
}

/// An OCR'd copy of a document in its own temporary directory.
///
/// Dropping the value deletes the directory and the file in it.
#[derive(Debug)]
pub struct SearchablePdf {
    _dir: TempDir,
    path: PathBuf,
}

impl SearchablePdf {
    pub fn path(&self) -> &Path {
        &self.path
    }
}

/// Run `engine` over `input` into a fresh temporary location.
pub fn ocr_to_searchable_pdf(
    engine: &dyn OcrEngine,
    input: &Path,
) -> Result<SearchablePdf, TabellError> {
    let dir = tempfile::Builder::new().prefix("tabell-ocr-").tempdir()?;
    let path = dir.path().join("ocr_out.pdf");

    info!(engine = engine.engine_name(), input = %input.display(), "running OCR");
    engine.make_searchable(input, &path)?;

    if !path.is_file() {
        return Err(TabellError::OcrFailed {
            code: 0,
            stderr: format!("{} reported success but wrote no output", engine.engine_name()),
        });
    }

    Ok(SearchablePdf { _dir: dir, path })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn engine(config: OcrConfig) -> OcrMyPdf {
        OcrMyPdf::new(&config)
    }

    fn args_as_strings(e: &OcrMyPdf) -> Vec<String> {
        e.command_args(Path::new("in.pdf"), Path::new("out.pdf"))
            .into_iter()
            .map(|a| a.to_string_lossy().into_owned())
            .collect()
    }

    #[test]
    fn test_default_args() {
        let args = args_as_strings(&engine(OcrConfig::default()));
        assert_eq!(
            args,
            vec!["--skip-text", "--deskew", "--optimize", "1", "-l", "swe+eng", "in.pdf", "out.pdf"]
        );
    }

    #[test]
    fn test_redo_mode_drops_deskew() {
        let config = OcrConfig {
            mode: OcrMode::Redo,
            optimize: 0,
            languages: vec!["eng".into()],
            ..OcrConfig::default()
        };
        let args = args_as_strings(&engine(config));
        assert_eq!(args, vec!["--redo-ocr", "--optimize", "0", "-l", "eng", "in.pdf", "out.pdf"]);
    }

    #[test]
    fn test_missing_binary() {
        let config = OcrConfig {
            binary: "tabell-no-such-ocr".into(),
            ..OcrConfig::default()
        };
        let err = engine(config)
            .make_searchable(Path::new("in.pdf"), Path::new("out.pdf"))
            .unwrap_err();
        assert!(matches!(err, TabellError::OcrNotFound));
        assert!(err.is_ocr());
    }

    #[cfg(unix)]
    #[test]
    fn test_nonzero_exit_is_ocr_failure() {
        let config = OcrConfig {
            binary: "false".into(),
            ..OcrConfig::default()
        };
        let err = engine(config)
            .make_searchable(Path::new("in.pdf"), Path::new("out.pdf"))
            .unwrap_err();
        assert!(matches!(err, TabellError::OcrFailed { code: 1, .. }));
    }

    #[cfg(unix)]
    #[test]
    fn test_timeout_kills_engine() {
        let config = OcrConfig {
            binary: "sh".into(),
            ..OcrConfig::default()
        };
        let mut e = engine(config);
        e.timeout = Duration::from_millis(200);
        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .unwrap();
        let err = runtime
            .block_on(e.run(vec!["-c".into(), "sleep 5".into()]))
            .unwrap_err();
        assert!(matches!(err, TabellError::OcrTimeout { seconds: 0 }));
    }

    struct CopyEngine;

    impl OcrEngine for CopyEngine {
        fn make_searchable(&self, input: &Path, output: &Path) -> Result<(), TabellError> {
            std::fs::copy(input, output)?;
            Ok(())
        }

        fn engine_name(&self) -> &str {
            "copy"
        }
    }

    #[test]
    fn test_searchable_copy_is_removed_on_drop() {
        let src = tempfile::NamedTempFile::new().unwrap();
        std::fs::write(src.path(), b"%PDF-1.4\n").unwrap();

        let searchable = ocr_to_searchable_pdf(&CopyEngine, src.path()).unwrap();
        let path = searchable.path().to_path_buf();
        assert!(path.is_file());
        assert!(path.ends_with("ocr_out.pdf"));
        drop(searchable);
        assert!(!path.exists());
    }

    #[test]
    fn test_engine_writing_nothing_is_failure() {
        struct Silent;
        impl OcrEngine for Silent {
            fn make_searchable(&self, _input: &Path, _output: &Path) -> Result<(), TabellError> {
                Ok(())
            }
            fn engine_name(&self) -> &str {
                "silent"
            }
        }
        let err = ocr_to_searchable_pdf(&Silent, Path::new("in.pdf")).unwrap_err();
        assert!(err.is_ocr());
    }
}
