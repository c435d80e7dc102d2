use anyhow::{Context, Result};
use futures_util::{SinkExt, StreamExt};
use lifeflow_core::{Reply, Request};
use lifeflow_engine::FlowEngine;
use tokio::io::{AsyncRead, AsyncWrite};
use tokio_util::bytes::BytesMut;
use tokio_util::codec::{Decoder, FramedRead, FramedWrite, LinesCodec, LinesCodecError};

/// Longest request line accepted before it is discarded.
pub const MAX_REQUEST_LINE: usize = 16 * 1024 * 1024;

/// A request line, or why the line could not be read.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Line {
    Text(String),
    Rejected(String),
}

/// `LinesCodec` that reports bad lines as items so the stream keeps going.
/// Only transport errors end the stream.
#[derive(Debug)]
pub struct RequestLines {
    inner: LinesCodec,
}

impl RequestLines {
    pub fn new(max_length: usize) -> Self {
        Self {
            inner: LinesCodec::new_with_max_length(max_length),
        }
    }

    fn map(decoded: Result<Option<String>, LinesCodecError>) -> std::io::Result<Option<Line>> {
        match decoded {
            Ok(line) => Ok(line.map(Line::Text)),
            Err(LinesCodecError::Io(err)) => Err(err),
            Err(err) => Ok(Some(Line::Rejected(err.to_string()))),
        }
    }
}

impl Decoder for RequestLines {
    type Item = Line;
    type Error = std::io::Error;

    fn decode(&mut self, buf: &mut BytesMut) -> std::io::Result<Option<Line>> {
        Self::map(self.inner.decode(buf))
    }

    fn decode_eof(&mut self, buf: &mut BytesMut) -> std::io::Result<Option<Line>> {
        Self::map(self.inner.decode_eof(buf))
    }
}

/// One request line in, one reply out. Malformed lines become `Reply::Error`.
pub fn handle_line(engine: &mut FlowEngine, line: &str) -> Reply {
    match serde_json::from_str::<Request>(line) {
        Ok(req) => engine.handle(req),
        Err(err) => {
            tracing::warn!(%err, "malformed request");
            Reply::Error {
                message: format!("malformed request: {err}"),
            }
        }
    }
}

/// Serves JSON-lines requests until the reader closes.
pub async fn serve<R, W>(engine: &mut FlowEngine, reader: R, writer: W) -> Result<()>
where
    R: AsyncRead + Unpin,
    W: AsyncWrite + Unpin,
{
    serve_with_limit(engine, reader, writer, MAX_REQUEST_LINE).await
}

pub async fn serve_with_limit<R, W>(
    engine: &mut FlowEngine,
    reader: R,
    writer: W,
    max_line: usize,
) -> Result<()>
where
    R: AsyncRead + Unpin,
    W: AsyncWrite + Unpin,
{
    let mut lines = FramedRead::new(reader, RequestLines::new(max_line));
    let mut out = FramedWrite::new(writer, LinesCodec::new());
    tracing::info!("session started");

    while let Some(line) = lines.next().await {
        let reply = match line.context("failed to read request line")? {
            Line::Text(line) if line.trim().is_empty() => continue,
            Line::Text(line) => handle_line(engine, &line),
            Line::Rejected(reason) => {
                tracing::warn!(%reason, "unreadable request line");
                Reply::Error {
                    message: format!("unreadable request line: {reason}"),
                }
            }
        };
        let encoded = serde_json::to_string(&reply).context("failed to encode reply")?;
        out.send(encoded).await.context("failed to write reply")?;
    }

    tracing::info!("session closed");
    Ok(())
}

pub async fn run(engine: &mut FlowEngine) -> Result<()> {
    serve(engine, tokio::io::stdin(), tokio::io::stdout()).await
}
