//! Serial device access.

use tokio::io::{
    self, AsyncBufRead, AsyncBufReadExt, AsyncReadExt, BufReader, ReadHalf, WriteHalf,
};
use tokio_serial::{ClearBuffer, SerialPort, SerialPortBuilderExt, SerialStream};

use crate::config::{Parity, SerialConfig};

/// Serial errors.
#[derive(Debug, thiserror::Error)]
pub enum SerialError {
    #[error("Failed to open serial device {device}: {source}")]
    Open {
        device: String,
        #[source]
        source: tokio_serial::Error,
    },

    #[error("Serial device closed")]
    Closed,

    #[error("Serial read failed: {0}")]
    Read(#[source] io::Error),
}

/// Read half of an open serial device.
pub type SerialReader = BufReader<ReadHalf<SerialStream>>;

/// Write half of an open serial device.
pub type SerialWriter = WriteHalf<SerialStream>;

/// Open the serial device and split it into buffered read and write halves.
pub fn open(config: &SerialConfig) -> Result<(SerialReader, SerialWriter), SerialError> {
    let parity = match config.parity {
        Parity::None => tokio_serial::Parity::None,
        Parity::Even => tokio_serial::Parity::Even,
        Parity::Odd => tokio_serial::Parity::Odd,
    };

    let stop_bits = match config.stop_bits {
        2 => tokio_serial::StopBits::Two,
        _ => tokio_serial::StopBits::One,
    };

    let data_bits = match config.data_bits {
        5 => tokio_serial::DataBits::Five,
        6 => tokio_serial::DataBits::Six,
        7 => tokio_serial::DataBits::Seven,
        _ => tokio_serial::DataBits::Eight,
    };

    let open_error = |source| SerialError::Open {
        device: config.device.clone(),
        source,
    };

    let stream = tokio_serial::new(&config.device, config.baud_rate)
        .parity(parity)
        .stop_bits(stop_bits)
        .data_bits(data_bits)
        .open_native_async()
        .map_err(open_error)?;

    if config.flush_on_open {
        stream.clear(ClearBuffer::Input).map_err(open_error)?;
    }

    tracing::info!(
        device = %config.device,
        baud_rate = config.baud_rate,
        "Opened serial device"
    );

    let (read_half, write_half) = io::split(stream);
    Ok((BufReader::new(read_half), write_half))
}

/// One read from a [`LineReader`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Line<'a> {
    /// A whole line, terminator included.
    Complete(&'a [u8]),
    /// A line longer than the limit. Its bytes were discarded up to and
    /// including the next `\n`.
    Overflow,
}

/// Reads `\n`-terminated lines, never buffering more than `max_len` bytes.
///
/// `max_len` counts the terminator.
pub struct LineReader<R> {
    inner: R,
    max_len: usize,
    buf: Vec<u8>,
}

impl<R: AsyncBufRead + Unpin> LineReader<R> {
    pub fn new(inner: R, max_len: usize) -> Self {
        Self {
            inner,
            max_len,
            buf: Vec::with_capacity(max_len),
        }
    }

    /// Longest line returned, terminator included.
    pub fn max_len(&self) -> usize {
        self.max_len
    }

    /// Read the next line.
    ///
    /// Returns `Ok(None)` at end of stream.
    pub async fn next_line(&mut self) -> io::Result<Option<Line<'_>>> {
        self.buf.clear();

        let limit = self.max_len as u64;
        let n = (&mut self.inner)
            .take(limit)
            .read_until(b'\n', &mut self.buf)
            .await?;

        if n == 0 {
            return Ok(None);
        }

        if n == self.max_len && self.buf.last() != Some(&b'\n') {
            self.discard_rest_of_line().await?;
            return Ok(Some(Line::Overflow));
        }

        Ok(Some(Line::Complete(&self.buf)))
    }

    async fn discard_rest_of_line(&mut self) -> io::Result<()> {
        loop {
            let available = self.inner.fill_buf().await?;
            if available.is_empty() {
                return Ok(());
            }

            match available.iter().position(|&b| b == b'\n') {
                Some(end) => {
                    self.inner.consume(end + 1);
                    return Ok(());
                }
                None => {
                    let len = available.len();
                    self.inner.consume(len);
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_reads_lines() {
        let input: &[u8] = b"5,Temperature:20.6\n6,Battery:LOW\r\n";
        let mut reader = LineReader::new(input, 64);

        assert_eq!(
            reader.next_line().await.unwrap(),
            Some(Line::Complete(b"5,Temperature:20.6\n"))
        );
        assert_eq!(
            reader.next_line().await.unwrap(),
            Some(Line::Complete(b"6,Battery:LOW\r\n"))
        );
        assert_eq!(reader.next_line().await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_unterminated_last_line() {
        let input: &[u8] = b"5,Temperature:20.6";
        let mut reader = LineReader::new(input, 64);

        assert_eq!(
            reader.next_line().await.unwrap(),
            Some(Line::Complete(b"5,Temperature:20.6"))
        );
        assert_eq!(reader.next_line().await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_long_line_is_discarded() {
        let input: &[u8] = b"5,Temperature:20.6,67,Door:OPEN\n6,Door:SHUT\n";
        let mut reader = LineReader::new(input, 12);

        assert_eq!(reader.next_line().await.unwrap(), Some(Line::Overflow));
        assert_eq!(
            reader.next_line().await.unwrap(),
            Some(Line::Complete(b"6,Door:SHUT\n"))
        );
        assert_eq!(reader.next_line().await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_line_at_limit_is_kept() {
        let input: &[u8] = b"5,A:12\n5,A:123\n";
        let mut reader = LineReader::new(input, 7);

        assert_eq!(reader.next_line().await.unwrap(), Some(Line::Complete(b"5,A:12\n")));
        assert_eq!(reader.next_line().await.unwrap(), Some(Line::Overflow));
        assert_eq!(reader.next_line().await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_long_line_across_reads() {
        let mock = tokio_test::io::Builder::new()
            .read(b"9,Payload:aaaa")
            .read(b"aaaaaaaa")
            .read(b"aaa\n9,B:1\n")
            .build();
        let mut reader = LineReader::new(BufReader::new(mock), 8);

        assert_eq!(reader.next_line().await.unwrap(), Some(Line::Overflow));
        assert_eq!(reader.next_line().await.unwrap(), Some(Line::Complete(b"9,B:1\n")));
        assert_eq!(reader.next_line().await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_read_error() {
        let mock = tokio_test::io::Builder::new()
            .read(b"5,A:1\n")
            .read_error(io::Error::new(io::ErrorKind::BrokenPipe, "unplugged"))
            .build();
        let mut reader = LineReader::new(BufReader::new(mock), 64);

        assert_eq!(reader.next_line().await.unwrap(), Some(Line::Complete(b"5,A:1\n")));
        let err = reader.next_line().await.unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::BrokenPipe);
    }

    #[tokio::test]
    async fn test_open_missing_device() {
        let config = SerialConfig {
            device: "/dev/does-not-exist".to_string(),
            baud_rate: 115200,
            data_bits: 8,
            parity: Parity::None,
            stop_bits: 1,
            flush_on_open: true,
            max_line_length: 512,
        };

        match open(&config) {
            Err(SerialError::Open { device, .. }) => assert_eq!(device, "/dev/does-not-exist"),
            Err(e) => panic!("unexpected error: {}", e),
            Ok(_) => panic!("opened a device that does not exist"),
        }
    }
}
