//! Bounded, concurrent draining of a child's stdout and stderr.
//!
//! Both pipes are read in the same task so a child that fills one pipe while
//! we wait on the other cannot deadlock. Bytes land in caller-owned buffers so
//! partial output survives when the surrounding future is dropped on timeout.

use tokio::io::{AsyncRead, AsyncReadExt};

const CHUNK_SIZE: usize = 8192;

/// How draining ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Drain {
    /// Both pipes reached EOF within the limit.
    Complete,
    /// Combined output passed `limit`; buffers are truncated to fit it.
    Overflow,
}

/// Read `stdout` and `stderr` to EOF, stopping early once more than `limit`
/// bytes have been seen across both.
pub async fn drain_bounded<O, E>(
    mut stdout: O,
    mut stderr: E,
    out: &mut Vec<u8>,
    err: &mut Vec<u8>,
    limit: usize,
) -> std::io::Result<Drain>
where
    O: AsyncRead + Unpin,
    E: AsyncRead + Unpin,
{
    let mut out_chunk = [0u8; CHUNK_SIZE];
    let mut err_chunk = [0u8; CHUNK_SIZE];
    let mut out_open = true;
    let mut err_open = true;

    while out_open || err_open {
        tokio::select! {
            n = stdout.read(&mut out_chunk), if out_open => {
                let n = n?;
                if n == 0 {
                    out_open = false;
                } else {
                    out.extend_from_slice(&out_chunk[..n]);
                }
            }
            n = stderr.read(&mut err_chunk), if err_open => {
                let n = n?;
                if n == 0 {
                    err_open = false;
                } else {
                    err.extend_from_slice(&err_chunk[..n]);
                }
            }
        }

        if out.len() + err.len() > limit {
            // Keep stdout first, then whatever stderr still fits.
            out.truncate(limit);
            err.truncate(limit - out.len());
            return Ok(Drain::Overflow);
        }
    }

    Ok(Drain::Complete)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_drain_complete_within_limit() {
        let (mut out, mut err) = (Vec::new(), Vec::new());
        let result = drain_bounded(&b"hello"[..], &b"warn"[..], &mut out, &mut err, 64)
            .await
            .unwrap();
        assert_eq!(result, Drain::Complete);
        assert_eq!(out, b"hello");
        assert_eq!(err, b"warn");
    }

    #[tokio::test]
    async fn test_drain_overflow_truncates_to_limit() {
        let big = vec![b'x'; 20_000];
        let (mut out, mut err) = (Vec::new(), Vec::new());
        let result = drain_bounded(&big[..], &b"e"[..], &mut out, &mut err, 100)
            .await
            .unwrap();
        assert_eq!(result, Drain::Overflow);
        assert!(out.len() + err.len() <= 100);
    }

    #[tokio::test]
    async fn test_limit_counts_both_pipes() {
        let (mut out, mut err) = (Vec::new(), Vec::new());
        let result = drain_bounded(&[b'o'; 6][..], &[b'e'; 6][..], &mut out, &mut err, 10)
            .await
            .unwrap();
        assert_eq!(result, Drain::Overflow);
    }
}
