use std::sync::Arc;
use std::time::Duration;

use tokio::io::AsyncReadExt;
use tokio::task::JoinHandle;

use crate::error::GatewayError;
use crate::util::RingBytes;

pub fn pump_stdout<R>(rd: R, ring: Arc<RingBytes>) -> JoinHandle<Result<u64, GatewayError>>
where
    R: tokio::io::AsyncRead + Unpin + Send + 'static,
{
    pump(rd, ring, "stdout")
}

pub fn pump_stderr<R>(rd: R, ring: Arc<RingBytes>) -> JoinHandle<Result<u64, GatewayError>>
where
    R: tokio::io::AsyncRead + Unpin + Send + 'static,
{
    pump(rd, ring, "stderr")
}

fn pump<R>(
    mut rd: R,
    ring: Arc<RingBytes>,
    label: &'static str,
) -> JoinHandle<Result<u64, GatewayError>>
where
    R: tokio::io::AsyncRead + Unpin + Send + 'static,
{
    tokio::spawn(async move {
        let mut buf = vec![0u8; 16 * 1024];
        let mut total = 0u64;
        let mut line_buf: Vec<u8> = Vec::with_capacity(8 * 1024);

        loop {
            let n = rd.read(&mut buf).await.map_err(|e| GatewayError::StreamIo {
                stream: label,
                source: e,
            })?;
            if n == 0 {
                break;
            }

            ring.push(&buf[..n]);
            total += n as u64;

            line_buf.extend_from_slice(&buf[..n]);
            while let Some(pos) = line_buf.iter().position(|&b| b == b'\n') {
                let mut one = line_buf.drain(..=pos).collect::<Vec<u8>>();
                trim_newline(&mut one);
                tracing::trace!(stream = label, line = %String::from_utf8_lossy(&one));
            }
        }

        if !line_buf.is_empty() {
            trim_newline(&mut line_buf);
            tracing::trace!(stream = label, line = %String::from_utf8_lossy(&line_buf));
        }

        Ok(total)
    })
}

/// Wait for pump tasks to hit EOF, giving up after `grace`.
///
/// A grandchild that inherited the pipes can keep them open after the
/// interpreter exits; such pumps are aborted and whatever was captured stays
/// in the ring buffers.
pub async fn drain(
    pumps: Vec<JoinHandle<Result<u64, GatewayError>>>,
    grace: Duration,
) -> Result<(), GatewayError> {
    let deadline = tokio::time::Instant::now() + grace;
    let mut first_err = None;

    for mut handle in pumps {
        match tokio::time::timeout_at(deadline, &mut handle).await {
            Ok(Ok(Ok(_))) => {}
            Ok(Ok(Err(e))) => {
                first_err.get_or_insert(e);
            }
            Ok(Err(join_err)) => {
                tracing::warn!(error = %join_err, "output pump task failed");
            }
            Err(_) => {
                tracing::warn!("output pipe still open after grace period, detaching");
                handle.abort();
            }
        }
    }

    match first_err {
        Some(e) => Err(e),
        None => Ok(()),
    }
}

fn trim_newline(buf: &mut Vec<u8>) {
    if buf.last() == Some(&b'\n') {
        buf.pop();
    }
    if buf.last() == Some(&b'\r') {
        buf.pop();
    }
}
