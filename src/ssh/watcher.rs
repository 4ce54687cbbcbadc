// Copyright 2025 Lablup Inc. and Jeongkyu Shin
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! Prompt watchers and the byte-level output scanner.
//!
//! Interactive prompts (sudo, passwd, y/n confirmations) are usually
//! emitted without a trailing newline while the remote process blocks
//! waiting for input. Matching therefore happens on the unterminated
//! current line, byte by byte; buffering up to a newline would
//! deadlock against a process that never finishes its line.

use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt, BufReader};

/// A (trigger, response) rule evaluated against the live output of a
/// remote command.
///
/// When the current output line contains `pattern`, `response`
/// followed by a newline is written to the remote stdin immediately.
/// A watcher answers at most once per line but is re-armed by every
/// newline, so a recurring prompt is answered again on each new line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Watcher {
    /// Substring that triggers the response.
    pub pattern: String,
    /// Text written to remote stdin when the pattern appears; a
    /// newline is appended on the wire.
    pub response: String,
    /// Compare with ASCII case folding.
    pub case_insensitive: bool,
    /// Output that, seen after a response, would mean the answer was
    /// rejected. Recorded but not yet acted upon.
    pub sentinel: Option<String>,
}

impl Watcher {
    pub fn new(pattern: impl Into<String>, response: impl Into<String>) -> Self {
        Self {
            pattern: pattern.into(),
            response: response.into(),
            case_insensitive: false,
            sentinel: None,
        }
    }

    /// Match the pattern with ASCII case folding.
    pub fn case_insensitive(mut self) -> Self {
        self.case_insensitive = true;
        self
    }

    fn matches(&self, line: &[u8]) -> bool {
        let pattern = self.pattern.as_bytes();
        if pattern.is_empty() {
            return true;
        }
        if pattern.len() > line.len() {
            return false;
        }
        if self.case_insensitive {
            line.windows(pattern.len())
                .any(|window| window.eq_ignore_ascii_case(pattern))
        } else {
            line.windows(pattern.len()).any(|window| window == pattern)
        }
    }

    pub(crate) fn response_line(&self) -> Vec<u8> {
        let mut line = self.response.as_bytes().to_vec();
        line.push(b'\n');
        line
    }
}

/// Byte-level scanning state shared by [`scan_stream`] and the channel
/// drain inside `Session::run`.
///
/// Accumulates every byte into the captured output, keeps the current
/// unterminated line, and reports which watcher responses are due
/// after each byte.
#[derive(Debug)]
pub(crate) struct PromptScanner {
    watchers: Vec<Watcher>,
    /// One flag per watcher: already answered on the current line.
    answered: Vec<bool>,
    output: Vec<u8>,
    line: Vec<u8>,
}

impl PromptScanner {
    pub(crate) fn new(watchers: Vec<Watcher>) -> Self {
        let answered = vec![false; watchers.len()];
        Self {
            watchers,
            answered,
            output: Vec::new(),
            line: Vec::new(),
        }
    }

    /// Feed one output byte. Returns the responses (newline included)
    /// that became due on exactly this byte, in watcher order.
    pub(crate) fn feed(&mut self, byte: u8) -> Option<Vec<Vec<u8>>> {
        self.output.push(byte);
        if byte == b'\n' {
            self.line.clear();
            self.answered.fill(false);
            return None;
        }
        self.line.push(byte);

        let mut due: Option<Vec<Vec<u8>>> = None;
        for (watcher, answered) in self.watchers.iter().zip(self.answered.iter_mut()) {
            if !*answered && watcher.matches(&self.line) {
                *answered = true;
                due.get_or_insert_with(Vec::new).push(watcher.response_line());
            }
        }
        due
    }

    pub(crate) fn into_output(self) -> Vec<u8> {
        self.output
    }
}

/// What a scan produced: the full captured output and the result of
/// response injection.
///
/// The output is always returned, even when an injection write failed
/// partway through.
#[derive(Debug)]
pub struct ScanOutcome {
    /// Every byte read from the output stream, newlines included.
    pub output: Vec<u8>,
    /// `Err` if writing a watcher response to the input stream failed.
    pub injection: std::io::Result<()>,
}

/// Scan a readable output stream, answering prompts on a writable
/// input stream.
///
/// Consumes the output one byte at a time until the stream is
/// exhausted or a read fails; this is also how end-of-command is
/// detected. Responses are written the moment a watcher's pattern is
/// completed within the current unterminated line.
pub async fn scan_stream<R, W>(output: R, mut input: W, watchers: Vec<Watcher>) -> ScanOutcome
where
    R: AsyncRead + Unpin,
    W: AsyncWrite + Unpin,
{
    let mut reader = BufReader::new(output);
    let mut scanner = PromptScanner::new(watchers);
    let mut injection: std::io::Result<()> = Ok(());

    loop {
        let byte = match reader.read_u8().await {
            Ok(byte) => byte,
            // EOF and read errors both end the scan.
            Err(_) => break,
        };
        if let Some(responses) = scanner.feed(byte) {
            for response in responses {
                if injection.is_ok() {
                    let written = async {
                        input.write_all(&response).await?;
                        input.flush().await
                    }
                    .await;
                    if let Err(e) = written {
                        tracing::warn!(error = %e, "failed to answer remote prompt");
                        injection = Err(e);
                    }
                }
            }
        }
    }

    ScanOutcome {
        output: scanner.into_output(),
        injection,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn feed_all(scanner: &mut PromptScanner, bytes: &[u8]) -> Vec<(usize, Vec<Vec<u8>>)> {
        let mut fired = Vec::new();
        for (i, &b) in bytes.iter().enumerate() {
            if let Some(responses) = scanner.feed(b) {
                fired.push((i, responses));
            }
        }
        fired
    }

    #[test]
    fn fires_on_the_byte_completing_the_match_and_not_before() {
        let mut scanner = PromptScanner::new(vec![Watcher::new("Password:", "secret")]);
        let fired = feed_all(&mut scanner, b"Password: ");
        // "Password:" is complete at index 8; the trailing space must
        // not trigger a second answer.
        assert_eq!(fired.len(), 1);
        assert_eq!(fired[0].0, 8);
        assert_eq!(fired[0].1, vec![b"secret\n".to_vec()]);
    }

    #[test]
    fn newline_resets_the_line_and_rearms_watchers() {
        let mut scanner = PromptScanner::new(vec![Watcher::new("again:", "yes")]);
        let fired = feed_all(&mut scanner, b"try again:\ntry again:");
        assert_eq!(fired.len(), 2);
    }

    #[test]
    fn pattern_split_across_a_newline_does_not_match() {
        let mut scanner = PromptScanner::new(vec![Watcher::new("Password:", "x")]);
        let fired = feed_all(&mut scanner, b"Pass\nword:");
        assert!(fired.is_empty());
    }

    #[test]
    fn case_insensitive_matching_folds_ascii() {
        let mut scanner =
            PromptScanner::new(vec![Watcher::new("password:", "x").case_insensitive()]);
        let fired = feed_all(&mut scanner, b"PASSWORD:");
        assert_eq!(fired.len(), 1);

        let mut scanner = PromptScanner::new(vec![Watcher::new("password:", "x")]);
        let fired = feed_all(&mut scanner, b"PASSWORD:");
        assert!(fired.is_empty());
    }

    #[test]
    fn two_watchers_completing_on_the_same_byte_answer_in_order() {
        let watchers = vec![Watcher::new("yes/no", "yes"), Watcher::new("no", "n")];
        let mut scanner = PromptScanner::new(watchers);
        // Both patterns complete on the final 'o'.
        let fired = feed_all(&mut scanner, b"continue? yes/no");
        assert_eq!(fired.len(), 1);
        assert_eq!(
            fired[0].1,
            vec![b"yes\n".to_vec(), b"n\n".to_vec()],
            "responses keep watcher registration order"
        );
    }

    #[test]
    fn output_accumulates_every_byte_including_newlines() {
        let mut scanner = PromptScanner::new(Vec::new());
        feed_all(&mut scanner, b"line one\nline two\n");
        assert_eq!(scanner.into_output(), b"line one\nline two\n".to_vec());
    }

    #[test]
    fn response_line_appends_a_newline() {
        let watcher = Watcher::new("p", "r");
        assert_eq!(watcher.response_line(), b"r\n".to_vec());
    }

    #[test]
    fn sentinel_is_carried_but_inert() {
        let watcher = Watcher {
            sentinel: Some("Sorry, try again.".into()),
            ..Watcher::new("password:", "x")
        };
        let mut scanner = PromptScanner::new(vec![watcher]);
        let fired = feed_all(&mut scanner, b"password: Sorry, try again.");
        assert_eq!(fired.len(), 1, "sentinel must not suppress firing yet");
    }
}
