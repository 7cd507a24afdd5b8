use std::sync::Arc;

use tokio::io::AsyncReadExt;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use crate::error::RunnerError;
use crate::util::RingBytes;

#[derive(Debug)]
pub struct LineTap {
    pub line: String,
    pub stream: LineStream,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LineStream {
    Stdout,
    Stderr,
}

impl LineStream {
    fn label(self) -> &'static str {
        match self {
            LineStream::Stdout => "stdout",
            LineStream::Stderr => "stderr",
        }
    }
}

/// Reads `rd` until EOF, forwarding each complete line to `line_tx` and
/// keeping the raw tail in `ring`. Returns the number of bytes read.
pub fn pump_lines<R>(
    mut rd: R,
    ring: Arc<RingBytes>,
    line_tx: mpsc::Sender<LineTap>,
    stream: LineStream,
) -> JoinHandle<Result<u64, RunnerError>>
where
    R: tokio::io::AsyncRead + Unpin + Send + 'static,
{
    tokio::spawn(async move {
        let mut buf = vec![0u8; 8 * 1024];
        let mut total = 0u64;
        let mut line_buf: Vec<u8> = Vec::with_capacity(1024);

        loop {
            let n = rd.read(&mut buf).await.map_err(|e| RunnerError::StreamIo {
                stream: stream.label(),
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
                let line = String::from_utf8_lossy(&one).to_string();
                if line_tx.send(LineTap { line, stream }).await.is_err() {
                    // Receiver is gone; keep draining so the child never blocks on a full pipe.
                    continue;
                }
            }
        }

        // EOF flush: deliver the last partial line if it doesn't end with '\n'.
        if !line_buf.is_empty() {
            trim_newline(&mut line_buf);
            if !line_buf.is_empty() {
                let line = String::from_utf8_lossy(&line_buf).to_string();
                let _ = line_tx.send(LineTap { line, stream }).await;
            }
        }

        Ok(total)
    })
}

fn trim_newline(buf: &mut Vec<u8>) {
    if buf.last() == Some(&b'\n') {
        buf.pop();
    }
    if buf.last() == Some(&b'\r') {
        buf.pop();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::AsyncWriteExt;

    #[tokio::test]
    async fn flushes_last_line_without_newline_on_eof() {
        let (mut wr, rd) = tokio::io::duplex(1024);
        let ring = RingBytes::new(1024);
        let (tx, mut rx) = mpsc::channel::<LineTap>(8);

        let task = pump_lines(rd, ring, tx, LineStream::Stdout);

        wr.write_all(b"hello").await.unwrap();
        drop(wr);

        let tap = rx.recv().await.expect("expected one line");
        assert_eq!(tap.line, "hello");
        assert_eq!(tap.stream, LineStream::Stdout);

        task.await.unwrap().unwrap();
    }

    #[tokio::test]
    async fn splits_crlf_lines_and_keeps_tail() {
        let (mut wr, rd) = tokio::io::duplex(1024);
        let ring = RingBytes::new(8);
        let (tx, mut rx) = mpsc::channel::<LineTap>(8);

        let task = pump_lines(rd, ring.clone(), tx, LineStream::Stderr);

        wr.write_all(b"first\r\nsecond\n").await.unwrap();
        drop(wr);

        assert_eq!(rx.recv().await.unwrap().line, "first");
        assert_eq!(rx.recv().await.unwrap().line, "second");
        assert_eq!(task.await.unwrap().unwrap(), 14);
        assert_eq!(ring.to_string_lossy(), "\nsecond\n");
    }
}
