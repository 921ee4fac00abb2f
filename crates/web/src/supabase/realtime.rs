//! Streaming change feed, consumed as cache invalidation triggers.
//!
//! The feed is newline-delimited JSON: one `{"table": ..., "type": ...}`
//! record per committed change on the subscribed tables. Row payloads are
//! deliberately ignored; a change only ever invalidates, never patches.

use std::pin::Pin;

use axum::body::Bytes;
use futures_util::{Stream, StreamExt};
use serde::Deserialize;
use tracing::instrument;

use super::{SupabaseClient, SupabaseError, extract_message};

/// One committed change on a subscribed table.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ChangeEvent {
    pub table: String,
    #[serde(rename = "type")]
    pub kind: ChangeKind,
}

/// The kind of change that occurred.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum ChangeKind {
    Insert,
    Update,
    Delete,
}

type ByteChunks = Pin<Box<dyn Stream<Item = Result<Bytes, reqwest::Error>> + Send>>;

/// An open change feed connection.
pub struct ChangeStream {
    chunks: ByteChunks,
    buffer: Vec<u8>,
}

impl ChangeStream {
    fn new(chunks: impl Stream<Item = Result<Bytes, reqwest::Error>> + Send + 'static) -> Self {
        Self {
            chunks: Box::pin(chunks),
            buffer: Vec::new(),
        }
    }

    /// Next change on the feed, or `None` when the server closes it.
    ///
    /// Malformed records are logged and skipped; the stream stays open.
    ///
    /// # Errors
    ///
    /// Returns an error if the underlying connection fails mid-stream.
    pub async fn next_change(&mut self) -> Result<Option<ChangeEvent>, SupabaseError> {
        loop {
            while let Some(newline) = self.buffer.iter().position(|&b| b == b'\n') {
                let line: Vec<u8> = self.buffer.drain(..=newline).collect();
                let text = String::from_utf8_lossy(&line);
                let text = text.trim();
                if text.is_empty() {
                    continue;
                }
                match serde_json::from_str::<ChangeEvent>(text) {
                    Ok(event) => return Ok(Some(event)),
                    Err(err) => {
                        tracing::warn!(
                            error = %err,
                            line = %text.chars().take(200).collect::<String>(),
                            "skipping malformed change record"
                        );
                    }
                }
            }

            match self.chunks.next().await {
                Some(Ok(chunk)) => self.buffer.extend_from_slice(&chunk),
                Some(Err(err)) => return Err(SupabaseError::Http(err)),
                None => return Ok(None),
            }
        }
    }
}

/// Client for the realtime change feed.
#[derive(Clone)]
pub struct RealtimeClient {
    client: SupabaseClient,
}

impl RealtimeClient {
    pub(super) const fn new(client: SupabaseClient) -> Self {
        Self { client }
    }

    /// Open a change feed over the given tables.
    ///
    /// # Errors
    ///
    /// Returns an error if the connection cannot be established.
    #[instrument(skip(self), fields(tables = ?tables))]
    pub async fn subscribe(&self, tables: &[&str]) -> Result<ChangeStream, SupabaseError> {
        let mut url = self.client.endpoint("realtime/v1/changes")?;
        url.query_pairs_mut()
            .append_pair("tables", &tables.join(","));

        let response = self
            .client
            .http()
            .get(url)
            .header("apikey", self.client.api_key())
            .bearer_auth(self.client.api_key())
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await?;
            tracing::error!(
                status = %status,
                body = %text.chars().take(500).collect::<String>(),
                "change feed subscription rejected"
            );
            return Err(SupabaseError::Api {
                status: status.as_u16(),
                message: extract_message(&text),
            });
        }

        Ok(ChangeStream::new(response.bytes_stream()))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use futures_util::stream;

    use super::*;

    fn chunk(text: &'static str) -> Result<Bytes, reqwest::Error> {
        Ok(Bytes::from_static(text.as_bytes()))
    }

    #[tokio::test]
    async fn parses_one_record_per_line() {
        let mut feed = ChangeStream::new(stream::iter(vec![chunk(
            "{\"table\":\"posts\",\"type\":\"INSERT\"}\n{\"table\":\"likes\",\"type\":\"DELETE\"}\n",
        )]));

        let first = feed.next_change().await.unwrap().unwrap();
        assert_eq!(first.table, "posts");
        assert_eq!(first.kind, ChangeKind::Insert);

        let second = feed.next_change().await.unwrap().unwrap();
        assert_eq!(second.table, "likes");
        assert_eq!(second.kind, ChangeKind::Delete);

        assert!(feed.next_change().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn reassembles_records_split_across_chunks() {
        let mut feed = ChangeStream::new(stream::iter(vec![
            chunk("{\"table\":\"or"),
            chunk("ders\",\"type\":\"UPDATE\"}\n"),
        ]));

        let event = feed.next_change().await.unwrap().unwrap();
        assert_eq!(event.table, "orders");
        assert_eq!(event.kind, ChangeKind::Update);
    }

    #[tokio::test]
    async fn skips_blank_and_malformed_lines() {
        let mut feed = ChangeStream::new(stream::iter(vec![chunk(
            "\nnot json\n{\"table\":\"menu_items\",\"type\":\"INSERT\"}\n",
        )]));

        let event = feed.next_change().await.unwrap().unwrap();
        assert_eq!(event.table, "menu_items");
    }

    #[tokio::test]
    async fn ignores_trailing_partial_line_at_close() {
        let mut feed = ChangeStream::new(stream::iter(vec![chunk("{\"table\":\"posts\"")]));
        assert!(feed.next_change().await.unwrap().is_none());
    }
}
