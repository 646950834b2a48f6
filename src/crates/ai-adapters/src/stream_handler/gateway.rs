use crate::normalizer::normalize_frame;
use crate::sse::{Frame, FrameDecoder};
use anyhow::{anyhow, Result};
use futures::{Stream, StreamExt};
use log::{debug, error, trace};
use multichat_core_types::StreamEvent;
use reqwest::Response;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::time::timeout;
use tokio_util::sync::CancellationToken;

/// Convert the gateway's chat response body into normalized stream events
///
/// # Arguments
/// * `response` - HTTP response whose body is the multiplexed event stream
/// * `tx_event` - normalized event sender
/// * `tx_raw_sse` - optional raw frame sender (collect raw data for diagnostics)
/// * `cancel_token` - stops the read loop and releases the body
/// * `idle_timeout` - maximum wait for the next chunk
pub async fn handle_chat_stream(
    response: Response,
    tx_event: mpsc::UnboundedSender<Result<StreamEvent>>,
    tx_raw_sse: Option<mpsc::UnboundedSender<String>>,
    cancel_token: CancellationToken,
    idle_timeout: Duration,
) {
    pump_event_stream(
        response.bytes_stream(),
        tx_event,
        tx_raw_sse,
        cancel_token,
        idle_timeout,
    )
    .await
}

/// Read loop shared by every byte source.
///
/// Events are sent strictly in arrival order. End of input flushes the
/// decoder and returns without an error item; transport errors and idle
/// timeouts send one `Err` and return.
pub async fn pump_event_stream<S, B, E>(
    stream: S,
    tx_event: mpsc::UnboundedSender<Result<StreamEvent>>,
    tx_raw_sse: Option<mpsc::UnboundedSender<String>>,
    cancel_token: CancellationToken,
    idle_timeout: Duration,
) where
    S: Stream<Item = std::result::Result<B, E>>,
    B: AsRef<[u8]>,
    E: std::fmt::Display,
{
    let mut stream = std::pin::pin!(stream);
    let mut decoder = FrameDecoder::new();

    loop {
        let next_chunk = tokio::select! {
            biased;
            _ = cancel_token.cancelled() => {
                debug!("Gateway stream cancelled, releasing reader");
                return;
            }
            next_chunk = timeout(idle_timeout, stream.next()) => next_chunk,
        };

        let chunk = match next_chunk {
            Ok(Some(Ok(chunk))) => chunk,
            Ok(None) => {
                let frames = decoder.finish();
                dispatch_frames(frames, &tx_event, tx_raw_sse.as_ref());
                debug!("Gateway stream reached end of input");
                return;
            }
            Ok(Some(Err(e))) => {
                let error_msg = format!("Gateway stream error: {}", e);
                error!("{}", error_msg);
                let _ = tx_event.send(Err(anyhow!(error_msg)));
                return;
            }
            Err(_) => {
                let error_msg = format!(
                    "Gateway stream timeout after {}s without data",
                    idle_timeout.as_secs()
                );
                error!("{}", error_msg);
                let _ = tx_event.send(Err(anyhow!(error_msg)));
                return;
            }
        };

        let frames = decoder.feed(chunk.as_ref());
        if !dispatch_frames(frames, &tx_event, tx_raw_sse.as_ref()) {
            debug!("Stream event receiver dropped, stopping read loop");
            return;
        }
    }
}

/// Returns `false` once the event receiver is gone.
fn dispatch_frames(
    frames: Vec<Frame>,
    tx_event: &mpsc::UnboundedSender<Result<StreamEvent>>,
    tx_raw_sse: Option<&mpsc::UnboundedSender<String>>,
) -> bool {
    for frame in frames {
        trace!(target: "ai::stream", "Gateway SSE: [{}] {}", frame.event, frame.data);
        if let Some(tx) = tx_raw_sse {
            let _ = tx.send(format!("[{}] {}", frame.event, frame.data));
        }

        if let Some(event) = normalize_frame(&frame) {
            if tx_event.send(Ok(event)).is_err() {
                return false;
            }
        }
    }
    true
}
