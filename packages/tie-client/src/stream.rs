//! Streaming consumption of IOC queries.
//!
//! A producer task fetches pages, decodes them and pushes one item per IOC
//! onto a bounded channel. The producer owns the only sender, so the channel
//! closes on every exit path and a consumer loop always terminates. A failed
//! query yields exactly one `Err` item and then ends.

use std::io::Read;
use std::pin::Pin;
use std::task::{Context, Poll};

use futures::stream::{self, Stream, StreamExt};
use tokio::sync::mpsc;
use tokio_stream::wrappers::ReceiverStream;
use tracing::debug;

use crate::error::Result;
use crate::paging::PageCursor;
use crate::types::{Ioc, IocPage, IocParams};

/// Items buffered between producer and consumer.
pub const CHANNEL_CAPACITY: usize = 64;

/// Single-pass, finite sequence of decoded IOCs or a terminal error.
pub struct IocStream {
    inner: Pin<Box<dyn Stream<Item = Result<Ioc>> + Send>>,
}

impl IocStream {
    pub(crate) fn channel() -> (mpsc::Sender<Result<Ioc>>, Self) {
        let (tx, rx) = mpsc::channel(CHANNEL_CAPACITY);
        let stream = Self {
            inner: Box::pin(ReceiverStream::new(rx)),
        };
        (tx, stream)
    }

    /// Replay a saved JSON result document (`{"iocs": [...]}`), such as the
    /// output of the `json` format.
    pub fn from_json_reader<R: Read>(reader: R) -> Result<Self> {
        let page: IocPage = serde_json::from_reader(reader)?;
        Ok(Self {
            inner: Box::pin(stream::iter(page.iocs.into_iter().map(Ok))),
        })
    }

    /// Next item, or `None` once the stream is exhausted.
    pub async fn recv(&mut self) -> Option<Result<Ioc>> {
        self.next().await
    }

    /// Drain into a single page, stopping at the first error.
    ///
    /// IOCs received before the error are discarded; the caller only sees
    /// the error. The returned page reports `offset == 0` and
    /// `limit == iocs.len()`.
    pub async fn collect_page(mut self) -> Result<IocPage> {
        let mut iocs = Vec::new();
        while let Some(item) = self.next().await {
            iocs.push(item?);
        }

        Ok(IocPage {
            has_more: false,
            params: IocParams {
                limit: iocs.len(),
                offset: 0,
                ..Default::default()
            },
            iocs,
        })
    }
}

impl Stream for IocStream {
    type Item = Result<Ioc>;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        self.get_mut().inner.as_mut().poll_next(cx)
    }
}

/// Fetch every page of `cursor` and push its IOCs onto `tx`.
///
/// Returns when the query is done, fails, or the consumer goes away.
pub(crate) async fn produce(mut cursor: PageCursor<'_>, tx: mpsc::Sender<Result<Ioc>>) {
    loop {
        let body = match cursor.next_page().await {
            Ok(Some(body)) => body,
            Ok(None) => break,
            Err(e) => {
                let _ = tx.send(Err(e)).await;
                break;
            }
        };

        let page: IocPage = match serde_json::from_slice(&body) {
            Ok(page) => page,
            Err(e) => {
                let _ = tx.send(Err(e.into())).await;
                break;
            }
        };

        for ioc in page.iocs {
            if tx.send(Ok(ioc)).await.is_err() {
                debug!("IOC stream consumer dropped, stopping producer");
                return;
            }
        }
    }

    debug!(fetches = cursor.fetches(), "IOC stream producer finished");
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::TieError;

    #[test]
    fn test_from_json_reader() {
        let doc = r#"{"params":{"limit":2,"offset":0},"iocs":[
            {"id":"1","value":"a.example","data_type":"DomainName"},
            {"id":"2","value":"b.example","data_type":"DomainName"}]}"#;

        let stream = IocStream::from_json_reader(doc.as_bytes()).unwrap();
        let page = tokio_test::block_on(stream.collect_page()).unwrap();

        assert_eq!(page.params.limit, 2);
        let values: Vec<_> = page.iocs.iter().map(|i| i.value.as_str()).collect();
        assert_eq!(values, ["a.example", "b.example"]);
    }

    #[test]
    fn test_from_json_reader_rejects_garbage() {
        assert!(matches!(
            IocStream::from_json_reader(&b"not json"[..]),
            Err(TieError::Decode(_))
        ));
    }

    #[tokio::test]
    async fn test_collect_stops_at_first_error() {
        let (tx, stream) = IocStream::channel();

        tokio::spawn(async move {
            let _ = tx.send(Ok(Ioc::default())).await;
            let _ = tx.send(Err(TieError::Decode("bad page".into()))).await;
            let _ = tx.send(Ok(Ioc::default())).await;
        });

        match stream.collect_page().await {
            Err(TieError::Decode(msg)) => assert_eq!(msg, "bad page"),
            other => panic!("unexpected {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_recv_ends_when_sender_dropped() {
        let (tx, mut stream) = IocStream::channel();
        tx.send(Ok(Ioc::default())).await.unwrap();
        drop(tx);

        assert!(stream.recv().await.unwrap().is_ok());
        assert!(stream.recv().await.is_none());
    }
}
