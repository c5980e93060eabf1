//! Console transcript of served requests.
//!
//! A transcript is the operator-facing record of one exchange:
//!
//! ```text
//!
//! --> POST /orders?debug=1
//!     Host: localhost:8080
//!     Content-Length: 13
//! {"qty": 2}
//! <-- 201 response proxied from http://upstream.test/orders?debug=1
//!     Content-Type: application/json
//! {"id": 7}
//! ```
//!
//! It goes to stdout, separate from the diagnostic `tracing` output on stderr.
//! Bodies that are not valid UTF-8 are rendered lossily. Header names are shown
//! title-cased, the way they go out on the wire.
//!
//! Transcripts are queued on a [`TranscriptSink`] and written by a single task,
//! so a slow stdout never holds up a connection and transcripts never interleave.

use std::fmt::Write as _;
use std::io::IsTerminal;

use colored::Colorize;
use hyper::body::Bytes;
use hyper::header::{HeaderName, HeaderValue};
use tokio::io::AsyncWriteExt;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use crate::http::request::InboundRequest;
use crate::upstream::ProxyResponseRecord;

const HEADER_INDENT: &str = "    ";

/// Whether to emit ANSI colors.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Style {
    Plain,
    Ansi,
}

impl Style {
    /// Colors only when stdout is a terminal.
    pub fn for_stdout() -> Self {
        if std::io::stdout().is_terminal() {
            Style::Ansi
        } else {
            Style::Plain
        }
    }
}

/// One request and, in proxy mode, the upstream response it produced.
#[derive(Debug, Clone)]
pub struct Transcript {
    request: InboundRequest,
    upstream: Option<ProxyResponseRecord>,
}

impl Transcript {
    pub fn new(request: InboundRequest, upstream: Option<ProxyResponseRecord>) -> Self {
        Self { request, upstream }
    }

    pub fn request(&self) -> &InboundRequest {
        &self.request
    }

    pub fn upstream(&self) -> Option<&ProxyResponseRecord> {
        self.upstream.as_ref()
    }

    /// Render the transcript as newline-terminated lines.
    pub fn render(&self, style: Style) -> String {
        let mut out = String::new();
        out.push('\n');

        let request_line = format!("--> {} {}", self.request.method, self.request.path);
        line(&mut out, &paint(&request_line, style, |s| s.green()));
        for (name, value) in self.request.headers.iter() {
            header_line(&mut out, name, value);
        }
        if let Some(body) = &self.request.body {
            line(&mut out, &decode(body));
        }

        if let Some(upstream) = &self.upstream {
            let status_line = format!(
                "<-- {} response proxied from {}",
                upstream.status.as_u16(),
                upstream.source_url
            );
            line(&mut out, &paint(&status_line, style, |s| s.cyan()));
            for (name, value) in upstream.headers.iter() {
                header_line(&mut out, name, value);
            }
            line(&mut out, &paint(&decode(&upstream.body), style, |s| s.dimmed()));
        }

        out
    }

}

/// Queue feeding the transcript writer.
#[derive(Debug, Clone)]
pub struct TranscriptSink {
    tx: mpsc::UnboundedSender<Transcript>,
}

impl TranscriptSink {
    /// A sink whose transcripts arrive on the returned receiver.
    pub fn channel() -> (Self, mpsc::UnboundedReceiver<Transcript>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }

    /// A sink drained by a task that writes to stdout.
    ///
    /// The task finishes once every clone of the sink is gone and the queue is empty.
    pub fn stdout() -> (Self, JoinHandle<()>) {
        let (sink, rx) = Self::channel();
        let writer = tokio::spawn(write_to_stdout(rx, Style::for_stdout()));
        (sink, writer)
    }

    /// Queue a transcript. Never blocks.
    pub fn send(&self, transcript: Transcript) {
        if self.tx.send(transcript).is_err() {
            tracing::debug!("Transcript writer has stopped; transcript dropped");
        }
    }
}

async fn write_to_stdout(mut rx: mpsc::UnboundedReceiver<Transcript>, style: Style) {
    let mut stdout = tokio::io::stdout();
    while let Some(transcript) = rx.recv().await {
        let rendered = transcript.render(style);
        if let Err(e) = stdout.write_all(rendered.as_bytes()).await {
            tracing::debug!(error = %e, "Could not write transcript");
            continue;
        }
        if let Err(e) = stdout.flush().await {
            tracing::debug!(error = %e, "Could not flush transcript");
        }
    }
}

fn paint(text: &str, style: Style, color: impl Fn(&str) -> colored::ColoredString) -> String {
    match style {
        Style::Plain => text.to_string(),
        Style::Ansi => color(text).to_string(),
    }
}

fn line(out: &mut String, text: &str) {
    out.push_str(text);
    out.push('\n');
}

fn header_line(out: &mut String, name: &HeaderName, value: &HeaderValue) {
    let _ = writeln!(
        out,
        "{HEADER_INDENT}{}: {}",
        title_case(name),
        String::from_utf8_lossy(value.as_bytes())
    );
}

/// `content-type` → `Content-Type`.
fn title_case(name: &HeaderName) -> String {
    let mut out = String::with_capacity(name.as_str().len());
    let mut upper = true;
    for c in name.as_str().chars() {
        out.push(if upper { c.to_ascii_uppercase() } else { c });
        upper = c == '-';
    }
    out
}

fn decode(body: &Bytes) -> String {
    String::from_utf8_lossy(body).into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::http::request::HeaderSet;
    use hyper::{HeaderMap, Method, StatusCode};

    fn request(body: Option<&'static [u8]>) -> InboundRequest {
        let mut map = HeaderMap::new();
        map.insert("host", HeaderValue::from_static("localhost:8080"));
        map.insert("x-trace", HeaderValue::from_static("abc"));
        let (headers, _) = HeaderSet::collapse(&map);

        InboundRequest {
            method: Method::POST,
            path: "/orders?debug=1".to_string(),
            headers,
            body: body.map(Bytes::from_static),
        }
    }

    #[test]
    fn renders_request_only() {
        let transcript = Transcript::new(request(Some(&b"{\"qty\": 2}"[..])), None);

        assert_eq!(
            transcript.render(Style::Plain),
            "\n--> POST /orders?debug=1\n    Host: localhost:8080\n    X-Trace: abc\n{\"qty\": 2}\n"
        );
    }

    #[test]
    fn omits_body_line_when_not_captured() {
        let transcript = Transcript::new(request(None), None);
        let rendered = transcript.render(Style::Plain);

        assert_eq!(rendered.lines().count(), 4);
        assert!(rendered.ends_with("X-Trace: abc\n"));
    }

    #[test]
    fn renders_upstream_response() {
        let mut headers = HeaderMap::new();
        headers.insert("content-type", HeaderValue::from_static("application/json"));
        let upstream = ProxyResponseRecord {
            source_url: "http://upstream.test/orders?debug=1".to_string(),
            status: StatusCode::CREATED,
            headers,
            body: Bytes::from_static(b"{\"id\": 7}"),
        };

        let rendered = Transcript::new(request(None), Some(upstream)).render(Style::Plain);
        let lines: Vec<_> = rendered.lines().collect();

        assert_eq!(
            &lines[4..],
            &[
                "<-- 201 response proxied from http://upstream.test/orders?debug=1",
                "    Content-Type: application/json",
                "{\"id\": 7}",
            ]
        );
    }

    #[test]
    fn invalid_utf8_is_rendered_lossily() {
        let transcript = Transcript::new(request(Some(&[0x68u8, 0x69, 0xff, 0xfe][..])), None);
        let rendered = transcript.render(Style::Plain);

        assert!(rendered.ends_with("hi\u{fffd}\u{fffd}\n"));
    }

    #[test]
    fn header_names_are_title_cased() {
        assert_eq!(title_case(&HeaderName::from_static("x-forwarded-for")), "X-Forwarded-For");
        assert_eq!(title_case(&HeaderName::from_static("etag")), "Etag");
    }

    #[tokio::test]
    async fn sink_delivers_in_order() {
        let (sink, mut rx) = TranscriptSink::channel();
        for path in ["/first", "/second"] {
            let mut req = request(None);
            req.path = path.to_string();
            sink.send(Transcript::new(req, None));
        }
        drop(sink);

        assert_eq!(rx.recv().await.unwrap().request().path, "/first");
        assert_eq!(rx.recv().await.unwrap().request().path, "/second");
        assert!(rx.recv().await.is_none());
    }
}
