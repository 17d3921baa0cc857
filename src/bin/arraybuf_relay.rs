//! ArrayBuffer Relay - producer/consumer hand-off demo
//!
//! Producer (main thread): mio event loop, terima publisher TCP, setiap
//! read langsung di-`put` ke ArrayBuffer. Read yang tidak muat di-drop
//! dan dihitung, tidak pernah menimpa data yang belum dibaca.
//!
//! Consumer (thread kedua): drain ArrayBuffer dengan `get` ke output file,
//! dengan backoff saat buffer kosong.
//!
//! Usage:
//!   cargo run --release --bin arraybuf_relay [OPTIONS]

use std::collections::HashMap;
use std::fs::File;
use std::io::{self, BufWriter, Read, Write};
use std::net::SocketAddr;
use std::process;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use mio::net::{TcpListener, TcpStream};
use mio::{Events, Interest, Poll, Token};
use thiserror::Error;
use tracing::{debug, error, info, warn};

use arraybuf::log::{LogConfig, Logger};
use arraybuf::{ArrayBuffer, ArrayBufferError};

const SERVER_TOKEN: Token = Token(0);
const EVENTS_CAPACITY: usize = 1024;
const READ_CHUNK: usize = 64 * 1024; // 64KB
const STATS_INTERVAL: Duration = Duration::from_secs(5);
const SPIN_BEFORE_SLEEP: u32 = 64;

#[derive(Debug, Error)]
enum RelayError {
    #[error("io: {0}")]
    Io(#[from] io::Error),
    #[error("buffer: {0}")]
    Buffer(#[from] ArrayBufferError),
    #[error("invalid bind address '{0}'")]
    BindAddr(String),
    #[error("buffer size {0} KB is too large")]
    BufferTooLarge(usize),
    #[error("consumer thread panicked")]
    ConsumerPanicked,
}

/// KB → bytes, tanpa overflow diam-diam.
fn buffer_capacity(kib: usize) -> Result<usize, RelayError> {
    kib.checked_mul(1024)
        .ok_or(RelayError::BufferTooLarge(kib))
}

/// Parse angka untuk `flag`; nilai yang salah dilaporkan lalu pakai `default`.
fn parse_number(flag: &str, value: &str, default: usize) -> usize {
    match value.parse() {
        Ok(n) => n,
        Err(_) => {
            eprintln!(
                "⚠️ Invalid value '{}' for {}, using default {}",
                value, flag, default
            );
            default
        }
    }
}

/// Relay configuration
struct RelayConfig {
    bind_addr: String,
    buffer_kib: usize,
    chunk_size: usize,
    output_path: String,
    log_level: String,
    log_file: Option<String>,
    verbose: bool,
}

impl Default for RelayConfig {
    fn default() -> Self {
        Self {
            bind_addr: "0.0.0.0:9999".to_string(),
            buffer_kib: 1024,
            chunk_size: 16 * 1024,
            output_path: "arraybuf_relay.out".to_string(),
            log_level: "info".to_string(),
            log_file: None,
            verbose: false,
        }
    }
}

impl RelayConfig {
    fn log_config(&self) -> LogConfig {
        let level = if self.verbose { "debug" } else { self.log_level.as_str() };
        let config = LogConfig::default().level_name(level);
        match &self.log_file {
            Some(path) => config.file(path),
            None => config,
        }
    }
}

/// Relay statistics
struct RelayStats {
    bytes_in: AtomicU64,
    bytes_out: AtomicU64,
    bytes_dropped: AtomicU64,
    puts_rejected: AtomicU64,
    connections_total: AtomicU64,
    connections_active: AtomicU64,
}

impl RelayStats {
    fn new() -> Self {
        Self {
            bytes_in: AtomicU64::new(0),
            bytes_out: AtomicU64::new(0),
            bytes_dropped: AtomicU64::new(0),
            puts_rejected: AtomicU64::new(0),
            connections_total: AtomicU64::new(0),
            connections_active: AtomicU64::new(0),
        }
    }

    fn report(&self, buffer: &ArrayBuffer, uptime: Duration) {
        let bytes_in = self.bytes_in.load(Ordering::Relaxed);
        let bytes_out = self.bytes_out.load(Ordering::Relaxed);
        let rate_in = bytes_in as f64 / uptime.as_secs_f64() / 1024.0;

        info!(
            "stats uptime={:.1}s in={}KB ({:.1}KB/s) out={}KB dropped={}B rejected_puts={} buffered={}/{} conns={}/{}",
            uptime.as_secs_f64(),
            bytes_in / 1024,
            rate_in,
            bytes_out / 1024,
            self.bytes_dropped.load(Ordering::Relaxed),
            self.puts_rejected.load(Ordering::Relaxed),
            buffer.count(),
            buffer.capacity(),
            self.connections_active.load(Ordering::Relaxed),
            self.connections_total.load(Ordering::Relaxed),
        );
    }
}

/// Publisher connection (producer side)
struct Publisher {
    stream: TcpStream,
    addr: SocketAddr,
    bytes: u64,
}

/// Baca semua data yang tersedia dan `put` ke buffer.
///
/// Returns `true` jika koneksi sudah ditutup peer.
fn pump_publisher(
    publisher: &mut Publisher,
    buffer: &ArrayBuffer,
    stats: &RelayStats,
    scratch: &mut [u8],
) -> bool {
    loop {
        match publisher.stream.read(scratch) {
            Ok(0) => return true,
            Ok(n) => {
                publisher.bytes += n as u64;
                match buffer.put(&scratch[..n]) {
                    Ok(written) => {
                        stats.bytes_in.fetch_add(written as u64, Ordering::Relaxed);
                    }
                    Err(ArrayBufferError::InsufficientSpace { .. }) => {
                        stats.bytes_dropped.fetch_add(n as u64, Ordering::Relaxed);
                        stats.puts_rejected.fetch_add(1, Ordering::Relaxed);
                    }
                    Err(e) => {
                        error!("put failed: {} (code {})", e, e.code());
                        return true;
                    }
                }
            }
            Err(ref e) if e.kind() == io::ErrorKind::WouldBlock => return false,
            Err(ref e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => {
                warn!("read error from {}: {}", publisher.addr, e);
                return true;
            }
        }
    }
}

/// Producer loop. Hanya berhenti karena error.
fn run_producer(
    config: &RelayConfig,
    buffer: &ArrayBuffer,
    stats: &RelayStats,
) -> Result<(), RelayError> {
    let addr: SocketAddr = config
        .bind_addr
        .parse()
        .map_err(|_| RelayError::BindAddr(config.bind_addr.clone()))?;

    let mut poll = Poll::new()?;
    let mut listener = TcpListener::bind(addr)?;
    poll.registry()
        .register(&mut listener, SERVER_TOKEN, Interest::READABLE)?;

    info!(
        "listening on {}, buffer {} KB, output {}",
        addr, config.buffer_kib, config.output_path
    );

    let mut events = Events::with_capacity(EVENTS_CAPACITY);
    let mut publishers: HashMap<Token, Publisher> = HashMap::new();
    let mut next_token = 1usize;
    let mut scratch = vec![0u8; READ_CHUNK].into_boxed_slice();

    let start_time = Instant::now();
    let mut last_stats = Instant::now();

    loop {
        if let Err(e) = poll.poll(&mut events, Some(Duration::from_millis(100))) {
            if e.kind() == io::ErrorKind::Interrupted {
                continue;
            }
            return Err(e.into());
        }

        for event in events.iter() {
            match event.token() {
                SERVER_TOKEN => loop {
                    match listener.accept() {
                        Ok((mut stream, peer)) => {
                            let token = Token(next_token);
                            next_token += 1;

                            stream.set_nodelay(true).ok();
                            poll.registry()
                                .register(&mut stream, token, Interest::READABLE)?;
                            publishers.insert(
                                token,
                                Publisher {
                                    stream,
                                    addr: peer,
                                    bytes: 0,
                                },
                            );

                            stats.connections_total.fetch_add(1, Ordering::Relaxed);
                            stats.connections_active.fetch_add(1, Ordering::Relaxed);
                            info!("publisher {} connected (token: {:?})", peer, token);
                        }
                        Err(ref e) if e.kind() == io::ErrorKind::WouldBlock => break,
                        Err(e) => {
                            warn!("accept error: {}", e);
                            break;
                        }
                    }
                },
                token => {
                    let closed = match publishers.get_mut(&token) {
                        Some(publisher) => pump_publisher(publisher, buffer, stats, &mut scratch),
                        None => continue,
                    };

                    if closed {
                        if let Some(mut publisher) = publishers.remove(&token) {
                            poll.registry().deregister(&mut publisher.stream).ok();
                            stats.connections_active.fetch_sub(1, Ordering::Relaxed);
                            info!(
                                "publisher {} disconnected after {} bytes",
                                publisher.addr, publisher.bytes
                            );
                        }
                    }
                }
            }
        }

        if last_stats.elapsed() > STATS_INTERVAL {
            stats.report(buffer, start_time.elapsed());
            last_stats = Instant::now();
        }
    }
}

/// Consumer loop: drain sampai producer berhenti dan buffer kosong.
fn run_consumer(
    buffer: &ArrayBuffer,
    stats: &RelayStats,
    running: &AtomicBool,
    chunk_size: usize,
    mut out: impl Write,
) -> io::Result<()> {
    let mut chunk = vec![0u8; chunk_size.max(1)];
    let mut idle_rounds = 0u32;

    loop {
        match buffer.get(&mut chunk) {
            Ok(0) => {
                if !running.load(Ordering::Acquire) {
                    break;
                }
                // get() tidak pernah block, backoff di sini
                idle_rounds = idle_rounds.saturating_add(1);
                if idle_rounds < SPIN_BEFORE_SLEEP {
                    thread::yield_now();
                } else {
                    out.flush()?;
                    thread::sleep(Duration::from_micros(200));
                }
            }
            Ok(n) => {
                idle_rounds = 0;
                out.write_all(&chunk[..n])?;
                stats.bytes_out.fetch_add(n as u64, Ordering::Relaxed);
                debug!("drained {} bytes", n);
            }
            Err(e) => {
                error!("get failed: {} (code {})", e, e.code());
                break;
            }
        }
    }

    out.flush()
}

fn run_relay(config: &RelayConfig) -> Result<(), RelayError> {
    // set_size sekali, sebelum buffer di-share
    let mut buffer = ArrayBuffer::new();
    buffer.set_size(buffer_capacity(config.buffer_kib)?)?;
    let buffer = Arc::new(buffer);

    let stats = Arc::new(RelayStats::new());
    let running = Arc::new(AtomicBool::new(true));
    let out = BufWriter::new(File::create(&config.output_path)?);

    let consumer = {
        let buffer = Arc::clone(&buffer);
        let stats = Arc::clone(&stats);
        let running = Arc::clone(&running);
        let chunk_size = config.chunk_size;
        thread::Builder::new()
            .name("arraybuf-consumer".to_string())
            .spawn(move || run_consumer(&buffer, &stats, &running, chunk_size, out))?
    };

    let result = run_producer(config, &buffer, &stats);

    running.store(false, Ordering::Release);
    match consumer.join() {
        Ok(drained) => drained?,
        Err(_) => return Err(RelayError::ConsumerPanicked),
    }

    result
}

fn parse_args() -> RelayConfig {
    let args: Vec<String> = std::env::args().collect();
    let mut config = RelayConfig::default();

    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "--bind" | "-b" => {
                if i + 1 < args.len() {
                    config.bind_addr = args[i + 1].clone();
                    i += 1;
                }
            }
            "--size" => {
                if i + 1 < args.len() {
                    config.buffer_kib = parse_number("--size", &args[i + 1], 1024);
                    i += 1;
                }
            }
            "--chunk" => {
                if i + 1 < args.len() {
                    config.chunk_size = parse_number("--chunk", &args[i + 1], 16 * 1024);
                    i += 1;
                }
            }
            "--output" | "-o" => {
                if i + 1 < args.len() {
                    config.output_path = args[i + 1].clone();
                    i += 1;
                }
            }
            "--log-level" => {
                if i + 1 < args.len() {
                    config.log_level = args[i + 1].clone();
                    i += 1;
                }
            }
            "--log-file" => {
                if i + 1 < args.len() {
                    config.log_file = Some(args[i + 1].clone());
                    i += 1;
                }
            }
            "--verbose" | "-v" => {
                config.verbose = true;
            }
            "--help" | "-h" => {
                println!("ArrayBuffer Relay - producer/consumer hand-off demo\n");
                println!("Usage: arraybuf_relay [OPTIONS]\n");
                println!("Options:");
                println!("  -b, --bind <ADDR>        Bind address (default: 0.0.0.0:9999)");
                println!("      --size <KB>          Buffer capacity in KB (default: 1024)");
                println!("      --chunk <BYTES>      Consumer drain size (default: 16384)");
                println!("  -o, --output <PATH>      Output file (default: arraybuf_relay.out)");
                println!("      --log-level <LEVEL>  FATAL|ERROR|WARNING|INFO|DEBUG|TRACE (default: INFO)");
                println!("      --log-file <PATH>    Also append log lines to this file");
                println!("  -v, --verbose            Same as --log-level debug");
                println!("  -h, --help               Show this help");
                process::exit(0);
            }
            other => {
                eprintln!("⚠️ Unknown option '{}', ignored", other);
            }
        }
        i += 1;
    }

    config
}

fn main() {
    let config = parse_args();

    let logger = match Logger::new(config.log_config()) {
        Ok(logger) => logger,
        Err(e) => {
            eprintln!("❌ Logger error: {}", e);
            process::exit(1);
        }
    };
    if let Err(e) = logger.install_global() {
        eprintln!("❌ Logger error: {}", e);
        process::exit(1);
    }

    let result = run_relay(&config);
    if let Err(e) = &result {
        error!("relay error: {}", e);
    }

    logger.shutdown().ok();
    if result.is_err() {
        process::exit(1);
    }
}
