//! Test client speaking the wire protocol over a real socket.

use std::net::SocketAddr;
use std::time::Duration;
use tokio::io::{AsyncReadExt, AsyncWriteExt, BufReader};
use tokio::net::TcpStream;
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};

const SOH: u8 = 0x01;
const STX: u8 = 0x02;
const ETX: u8 = 0x03;

/// How long a single expected event may take to arrive.
const EVENT_TIMEOUT: Duration = Duration::from_secs(5);

/// One unit of server output.
#[derive(Debug)]
pub enum Event {
    /// A textual reply line, without its newline.
    Line(String),
    /// A framed image block.
    Image {
        height: u64,
        width: u64,
        pixels: Vec<u8>,
    },
}

pub struct TestClient {
    reader: BufReader<OwnedReadHalf>,
    writer: OwnedWriteHalf,
}

impl TestClient {
    pub async fn connect(addr: SocketAddr) -> Self {
        let stream = TcpStream::connect(addr).await.expect("connect to server");
        let (read_half, write_half) = stream.into_split();
        TestClient {
            reader: BufReader::new(read_half),
            writer: write_half,
        }
    }

    pub async fn send_line(&mut self, line: &str) {
        self.writer
            .write_all(format!("{line}\n").as_bytes())
            .await
            .expect("send line");
    }

    /// Read the next event, failing the test after a timeout.
    pub async fn next_event(&mut self) -> Event {
        tokio::time::timeout(EVENT_TIMEOUT, self.read_event())
            .await
            .expect("timed out waiting for server output")
    }

    /// Try to read an event within `window`; `None` on timeout.
    pub async fn next_event_within(&mut self, window: Duration) -> Option<Event> {
        tokio::time::timeout(window, self.read_event()).await.ok()
    }

    async fn read_event(&mut self) -> Event {
        // Headers are read up to the first '=' or end of line; an
        // "img" header switches to the binary block format
        // img=<SOH>[H,W]<attrs><STX><pixels><ETX>.
        let mut title = Vec::new();
        loop {
            let byte = self.reader.read_u8().await.expect("read header byte");
            match byte {
                b'\n' => return Event::Line(String::from_utf8_lossy(&title).into_owned()),
                b'=' => break,
                _ => title.push(byte),
            }
        }

        if title == b"img" {
            assert_eq!(self.reader.read_u8().await.unwrap(), SOH, "expected SOH");
            assert_eq!(self.reader.read_u8().await.unwrap(), b'[', "expected shape block");
            let height = self.read_number_until(b',').await;
            let width = self.read_number_until(b']').await;
            loop {
                if self.reader.read_u8().await.unwrap() == STX {
                    break;
                }
            }
            let mut pixels = vec![0u8; (height * width * 2) as usize];
            self.reader
                .read_exact(&mut pixels)
                .await
                .expect("read pixel payload");
            assert_eq!(self.reader.read_u8().await.unwrap(), ETX, "expected ETX");
            Event::Image {
                height,
                width,
                pixels,
            }
        } else {
            let mut line = title;
            line.push(b'=');
            loop {
                let byte = self.reader.read_u8().await.expect("read line byte");
                if byte == b'\n' {
                    break;
                }
                line.push(byte);
            }
            Event::Line(String::from_utf8_lossy(&line).into_owned())
        }
    }

    async fn read_number_until(&mut self, terminator: u8) -> u64 {
        let mut digits = String::new();
        loop {
            let byte = self.reader.read_u8().await.expect("read shape digit");
            if byte == terminator {
                break;
            }
            digits.push(byte as char);
        }
        digits.parse().expect("numeric shape field")
    }

    /// Expect an exact reply line next.
    pub async fn expect_line(&mut self, expected: &str) {
        match self.next_event().await {
            Event::Line(line) => assert_eq!(line, expected),
            Event::Image { height, width, .. } => {
                panic!("expected line '{expected}', got {height}x{width} image")
            }
        }
    }

    /// Expect an image block next; returns `(height, width, pixels)`.
    pub async fn expect_image(&mut self) -> (u64, u64, Vec<u8>) {
        match self.next_event().await {
            Event::Image {
                height,
                width,
                pixels,
            } => (height, width, pixels),
            Event::Line(line) => panic!("expected image, got line '{line}'"),
        }
    }

    /// Read events until a line arrives, skipping image blocks and
    /// their `isn` status lines (frames already in flight).
    pub async fn next_line_skipping_frames(&mut self) -> String {
        loop {
            match self.next_event().await {
                Event::Line(line) if line.starts_with("isn=") => continue,
                Event::Line(line) => return line,
                Event::Image { .. } => continue,
            }
        }
    }
}
