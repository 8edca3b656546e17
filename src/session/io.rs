// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2012-2025 Andrei Maltsev

//! The transport: a boxed, optionally SOCKS5-proxied TCP stream, plus the
//! cipher-aware frame read/write primitives shared by the handshake
//! engine and the post-auth listener/send path.

use std::time::Duration;

use anyhow::{Context, Result, anyhow};
use tokio::{
    io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt},
    net::TcpStream,
    time::timeout,
};
use tokio_socks::tcp::Socks5Stream;
use tokio_util::sync::CancellationToken;

use crate::{cfg::config::Network, crypto::cipher::AsymmetricCipher};

/// Anything the frame codec can read from and write to.
pub trait AsyncStream: AsyncRead + AsyncWrite + Unpin + Send {}
impl<T: AsyncRead + AsyncWrite + Unpin + Send> AsyncStream for T {}

pub type GameStream = Box<dyn AsyncStream>;

/// Opens the TCP connection, routing through a SOCKS5 proxy (with DNS
/// resolved proxy-side) when `network.socks_proxy` is set.
pub async fn connect_stream(network: &Network, connect_timeout: Duration) -> Result<GameStream> {
    let target = format!("{}:{}", network.host, network.port);

    let stream = timeout(connect_timeout, async {
        match &network.socks_proxy {
            None => {
                let tcp = TcpStream::connect(&target).await?;
                Ok::<GameStream, std::io::Error>(Box::new(tcp))
            },
            Some(proxy) => {
                let parts: Vec<&str> = proxy.split(':').collect();
                let proxy_addr = format!("{}:{}", parts[0], parts[1]);
                let proxied = if parts.len() == 4 {
                    Socks5Stream::connect_with_password(
                        proxy_addr.as_str(),
                        target.as_str(),
                        parts[2],
                        parts[3],
                    )
                    .await
                } else {
                    Socks5Stream::connect(proxy_addr.as_str(), target.as_str()).await
                }
                .map_err(std::io::Error::other)?;
                Ok(Box::new(proxied) as GameStream)
            },
        }
    })
    .await
    .context("connect timed out")?
    .context("connect failed")?;

    Ok(stream)
}

/// Reads one frame: a 4-byte big-endian length header followed by
/// `length` bytes of `{id:u16_be}{body}`, decrypting through `cipher`
/// when it is installed. The cipher, if present, is stateful across the
/// whole stream, not reset per frame.
pub async fn read_frame<R>(
    reader: &mut R,
    cipher: &mut Option<AsymmetricCipher>,
) -> std::io::Result<(u16, Vec<u8>)>
where
    R: AsyncRead + Unpin,
{
    let mut len_buf = [0u8; 4];
    reader.read_exact(&mut len_buf).await?;
    if let Some(c) = cipher {
        let decrypted = c.decrypt(&len_buf);
        len_buf.copy_from_slice(&decrypted);
    }
    let len = u32::from_be_bytes(len_buf) as usize;

    if len < 2 {
        return Ok((0, Vec::new()));
    }

    let mut rest = vec![0u8; len];
    reader.read_exact(&mut rest).await?;
    if let Some(c) = cipher {
        rest = c.decrypt(&rest);
    }

    let id = u16::from_be_bytes([rest[0], rest[1]]);
    Ok((id, rest[2..].to_vec()))
}

/// Writes already-finished frame bytes (`{length}{id}{body}` as produced
/// by `OutFrame::finish`), encrypting through `cipher` when installed.
pub async fn write_frame<W>(
    writer: &mut W,
    frame_bytes: &[u8],
    cipher: &mut Option<AsymmetricCipher>,
) -> std::io::Result<()>
where
    W: AsyncWrite + Unpin,
{
    match cipher {
        Some(c) => writer.write_all(&c.encrypt(frame_bytes)).await,
        None => writer.write_all(frame_bytes).await,
    }
}

/// Races `fut` against a deadline and a cancellation signal, the same
/// shape used throughout the handshake and the post-auth read loop.
pub async fn io_with_timeout<F, T>(
    label: &'static str,
    fut: F,
    io_timeout: Duration,
    cancel: &CancellationToken,
) -> Result<T>
where
    F: Future<Output = std::io::Result<T>>,
{
    tokio::select! {
        _ = cancel.cancelled() => Err(anyhow!("{label} cancelled")),
        res = timeout(io_timeout, fut) => {
            match res {
                Ok(Ok(v)) => Ok(v),
                Ok(Err(e)) => Err(e.into()),
                Err(_) => Err(anyhow!("{label} timed out")),
            }
        }
    }
}
