//! Word counting for rendered documents.

use std::ffi::OsString;
use std::future::Future;
use std::path::Path;
use std::sync::LazyLock;
use std::time::Duration;

use regex::Regex;
use sitebundle_shared::{Result, SiteBundleError};
use tracing::debug;

use crate::process::ToolCommand;

/// A "word" is a run of Unicode word characters.
static WORD_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\w+").expect("word regex"));

/// Default timeout for text extraction.
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(60);

/// Count the words in `text`.
pub fn count_words(text: &str) -> u64 {
    WORD_RE.find_iter(text).count() as u64
}

/// Measures the size of a rendered document, in words.
pub trait WordCounter: Send + Sync {
    fn count(&self, document: &Path) -> impl Future<Output = Result<u64>> + Send;
}

/// [`WordCounter`] that extracts text with `pdftotext <pdf> -`.
#[derive(Debug, Clone)]
pub struct PdfTextCounter {
    command: ToolCommand,
    timeout: Duration,
}

impl PdfTextCounter {
    pub fn new(command: ToolCommand) -> Self {
        Self {
            command,
            timeout: DEFAULT_TIMEOUT,
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

impl WordCounter for PdfTextCounter {
    async fn count(&self, document: &Path) -> Result<u64> {
        let args = [document.as_os_str().to_owned(), OsString::from("-")];
        let output = self
            .command
            .run(&args, self.timeout)
            .await
            .map_err(|e| SiteBundleError::Measure(format!("{}: {e}", document.display())))?;

        let text = String::from_utf8_lossy(&output.stdout);
        let words = count_words(&text);
        debug!(document = %document.display(), words, "document measured");
        Ok(words)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn counts_word_runs() {
        assert_eq!(count_words(""), 0);
        assert_eq!(count_words("   \n\t "), 0);
        assert_eq!(count_words("Hello, world!"), 2);
        assert_eq!(count_words("snake_case counts-as three"), 4);
        assert_eq!(count_words("v1.2 release"), 3);
    }

    #[test]
    fn counts_unicode_words() {
        assert_eq!(count_words("Grüße aus Zürich"), 3);
        assert_eq!(count_words("日本語 テキスト"), 2);
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn counts_extracted_text() {
        let dir = tempfile::tempdir().unwrap();
        let doc = dir.path().join("page.pdf");
        std::fs::write(&doc, "one two three\nfour five").unwrap();

        // `cat <file> -` prints the file, then the (empty) stdin.
        let counter = PdfTextCounter::new(ToolCommand::parse("cat").unwrap());
        assert_eq!(counter.count(&doc).await.unwrap(), 5);
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn extraction_failure_is_measure_error() {
        let dir = tempfile::tempdir().unwrap();
        let counter = PdfTextCounter::new(ToolCommand::parse("cat").unwrap())
            .with_timeout(Duration::from_secs(5));

        let err = counter
            .count(&dir.path().join("missing.pdf"))
            .await
            .unwrap_err();
        assert!(matches!(err, SiteBundleError::Measure(_)));
    }
}
