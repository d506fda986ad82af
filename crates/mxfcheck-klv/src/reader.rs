//! Streaming packet reader.

use std::io::Read;

use tokio::sync::mpsc;

use crate::{Klv, KlvError, Result};

/// Read KLV packets from `stream` and send them into `tx` until the stream
/// is exhausted.
///
/// This is the producer half of the parsing pipeline and is expected to run
/// on a blocking task while the consumer drains the channel. Packets are
/// delivered in strict file order; the bounded channel provides
/// backpressure. If the receiver is dropped the reader stops quietly so a
/// failed consumer never deadlocks the producer.
///
/// Fails with [`KlvError::EmptyStream`] when the stream holds no bytes at
/// all and [`KlvError::TruncatedStream`] when it ends mid packet.
pub fn stream_klv<R: Read>(stream: &mut R, tx: &mpsc::Sender<Klv>) -> Result<()> {
    let mut read_any = false;

    loop {
        let mut key = [0u8; 16];
        let got = read_fully(stream, &mut key)?;
        if got == 0 {
            if read_any {
                return Ok(());
            }
            return Err(KlvError::EmptyStream);
        }
        read_any = true;
        if got < 16 {
            return Err(KlvError::TruncatedStream { expected: 16 - got });
        }

        let mut first = [0u8; 1];
        if read_fully(stream, &mut first)? == 0 {
            return Err(KlvError::TruncatedStream { expected: 1 });
        }

        let (length, value_len) = if first[0] < 0x80 {
            (vec![first[0]], first[0] as usize)
        } else {
            let count = (first[0] & 0x7f) as usize;
            if count > 8 {
                return Err(KlvError::InvalidBerLength(first[0] & 0x7f));
            }
            let mut long = vec![0u8; count];
            let got = read_fully(stream, &mut long)?;
            if got < count {
                return Err(KlvError::TruncatedStream {
                    expected: count - got,
                });
            }
            let mut be = [0u8; 8];
            be[8 - count..].copy_from_slice(&long);
            let mut length = Vec::with_capacity(1 + count);
            length.push(first[0]);
            length.extend_from_slice(&long);
            (length, u64::from_be_bytes(be) as usize)
        };

        let mut value = vec![0u8; value_len];
        let got = read_fully(stream, &mut value)?;
        if got < value_len {
            return Err(KlvError::TruncatedStream {
                expected: value_len - got,
            });
        }

        if tx.blocking_send(Klv { key, length, value }).is_err() {
            // receiver gone, the consumer already failed
            return Ok(());
        }
    }
}

/// Read until `buf` is full or the stream ends, returning the bytes read.
fn read_fully<R: Read>(stream: &mut R, buf: &mut [u8]) -> Result<usize> {
    let mut filled = 0;
    while filled < buf.len() {
        match stream.read(&mut buf[filled..]) {
            Ok(0) => break,
            Ok(n) => filled += n,
            Err(e) if e.kind() == std::io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(e.into()),
        }
    }
    Ok(filled)
}
