// TCP transport for SMPP sessions: one-PDU-at-a-time framed reads on the
// read half, buffered whole-PDU writes on the shared write half.
//
// The write half lives behind one async mutex; a PDU's bytes and the flush
// happen under the lock, so frames never interleave on the wire and only
// one drain is in flight at a time.

use crate::client::{EsmeError, EsmeResult};
use crate::codec::{MAX_PDU_SIZE, PduHeader};
use bytes::{Bytes, BytesMut};
use std::io;
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncReadExt, AsyncWriteExt, BufWriter};
use tokio::net::TcpStream;
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio::sync::Mutex;
use tracing::debug;

/// The PDU header fields as raw integers, before command id validation.
/// The receiver needs these to answer unparseable requests with a
/// generic_nack carrying the right sequence number.
#[derive(Debug, Clone, Copy)]
pub struct RawHeader {
    pub command_length: u32,
    pub command_id: u32,
    pub command_status: u32,
    pub sequence_number: u32,
}

impl RawHeader {
    pub fn is_response(&self) -> bool {
        self.command_id & 0x8000_0000 != 0
    }
}

/// The read half: reads exactly one PDU per call (16 header bytes, then
/// `command_length - 16` body bytes). Reads are unbounded in time; link
/// liveness is the keep-alive task's job.
pub struct Reader {
    half: OwnedReadHalf,
}

impl Reader {
    pub async fn read_pdu(&mut self) -> EsmeResult<(Bytes, RawHeader)> {
        let mut header_bytes = [0u8; PduHeader::SIZE];
        self.half
            .read_exact(&mut header_bytes)
            .await
            .map_err(map_read_error)?;

        let header = RawHeader {
            command_length: u32::from_be_bytes(header_bytes[0..4].try_into().unwrap_or_default()),
            command_id: u32::from_be_bytes(header_bytes[4..8].try_into().unwrap_or_default()),
            command_status: u32::from_be_bytes(header_bytes[8..12].try_into().unwrap_or_default()),
            sequence_number: u32::from_be_bytes(
                header_bytes[12..16].try_into().unwrap_or_default(),
            ),
        };
        if header.command_length < PduHeader::SIZE as u32
            || header.command_length > MAX_PDU_SIZE
        {
            return Err(EsmeError::Connection(io::Error::new(
                io::ErrorKind::InvalidData,
                format!("peer announced PDU of {} bytes", header.command_length),
            )));
        }

        let body_length = header.command_length as usize - PduHeader::SIZE;
        let mut pdu = BytesMut::with_capacity(header.command_length as usize);
        pdu.extend_from_slice(&header_bytes);
        pdu.resize(header.command_length as usize, 0);
        self.half
            .read_exact(&mut pdu[PduHeader::SIZE..])
            .await
            .map_err(map_read_error)?;

        debug!(
            command_id = format!("{:#010x}", header.command_id),
            sequence = header.sequence_number,
            body_length,
            "read PDU"
        );
        Ok((pdu.freeze(), header))
    }
}

fn map_read_error(err: io::Error) -> EsmeError {
    if err.kind() == io::ErrorKind::UnexpectedEof {
        EsmeError::ConnectionClosed
    } else {
        EsmeError::Connection(err)
    }
}

/// The buffered write half. Always used through [`SharedWriter`].
pub struct Writer {
    half: BufWriter<OwnedWriteHalf>,
}

pub type SharedWriter = Arc<Mutex<Option<Writer>>>;

impl Writer {
    /// Writes one complete PDU and flushes it out.
    pub async fn write_pdu(&mut self, pdu: &[u8]) -> io::Result<()> {
        self.half.write_all(pdu).await?;
        self.half.flush().await
    }

    /// Flushes pending bytes and half-closes the socket.
    pub async fn shutdown(&mut self) -> io::Result<()> {
        self.half.flush().await?;
        self.half.shutdown().await
    }
}

/// Opens the TCP connection to the SMSC, under `socket_timeout`.
pub async fn connect(
    host: &str,
    port: u16,
    socket_timeout: Duration,
) -> EsmeResult<(Reader, Writer)> {
    let stream = tokio::time::timeout(socket_timeout, TcpStream::connect((host, port)))
        .await
        .map_err(|_| EsmeError::Timeout)??;
    stream.set_nodelay(true)?;
    let (read_half, write_half) = stream.into_split();
    Ok((
        Reader { half: read_half },
        Writer {
            half: BufWriter::new(write_half),
        },
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::Encodable;
    use crate::datatypes::EnquireLink;
    use tokio::net::TcpListener;

    async fn pipe() -> (TcpStream, Reader, Writer) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let host = addr.ip().to_string();
        let (halves, peer) = tokio::join!(
            connect(&host, addr.port(), Duration::from_secs(5)),
            listener.accept()
        );
        let (reader, writer) = halves.unwrap();
        (peer.unwrap().0, reader, writer)
    }

    #[tokio::test]
    async fn reads_one_pdu_at_a_time() {
        let (mut peer, mut reader, _writer) = pipe().await;

        let first = EnquireLink::new(1).to_bytes().unwrap();
        let second = EnquireLink::new(2).to_bytes().unwrap();
        let mut both = first.to_vec();
        both.extend_from_slice(&second);
        peer.write_all(&both).await.unwrap();

        let (pdu, header) = reader.read_pdu().await.unwrap();
        assert_eq!(pdu.as_ref(), first.as_ref());
        assert_eq!(header.sequence_number, 1);

        let (pdu, header) = reader.read_pdu().await.unwrap();
        assert_eq!(pdu.as_ref(), second.as_ref());
        assert_eq!(header.sequence_number, 2);
    }

    #[tokio::test]
    async fn peer_close_is_reported() {
        let (peer, mut reader, _writer) = pipe().await;
        drop(peer);
        assert!(matches!(
            reader.read_pdu().await,
            Err(EsmeError::ConnectionClosed)
        ));
    }

    #[tokio::test]
    async fn oversized_announcement_is_rejected() {
        let (mut peer, mut reader, _writer) = pipe().await;
        let mut bogus = Vec::new();
        bogus.extend((MAX_PDU_SIZE + 1).to_be_bytes());
        bogus.extend(0x0000_0015u32.to_be_bytes());
        bogus.extend([0u8; 8]);
        peer.write_all(&bogus).await.unwrap();

        assert!(matches!(
            reader.read_pdu().await,
            Err(EsmeError::Connection(_))
        ));
    }

    #[tokio::test]
    async fn writes_arrive_whole() {
        let (mut peer, _reader, mut writer) = pipe().await;
        let pdu = EnquireLink::new(9).to_bytes().unwrap();
        writer.write_pdu(&pdu).await.unwrap();

        let mut received = vec![0u8; pdu.len()];
        peer.read_exact(&mut received).await.unwrap();
        assert_eq!(received, pdu.to_vec());
    }
}
