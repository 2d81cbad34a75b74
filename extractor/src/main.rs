//! Demo binary: wires a simulated transport, the ring, the extractor, the
//! output queue, and a consumer together on three OS threads, with
//! cooperative shutdown on Ctrl-C.
//!
//! Without a real serial port available, the "transport" thread reads raw P2
//! debug bytes from a file named on the command line (or stdin if omitted).

use std::env;
use std::fs::File;
use std::io::{self, Read};
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use log::{error, info, warn};

use extractor::config::ConfigManager;
use extractor::{MessageExtractor, OutputQueue, ResponseGenerator, RingBuffer};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let config_path = find_config_file();
    let cfg_mgr = Arc::new(ConfigManager::new(&config_path)?);
    let cfg = cfg_mgr.get();

    let _logger = extractor::logger::init_logger(&cfg)?;
    info!("configuration loaded from {}", config_path.display());

    let cancel = Arc::new(AtomicBool::new(false));
    let cancel_ctrlc = cancel.clone();
    ctrlc::set_handler(move || {
        cancel_ctrlc.store(true, Ordering::SeqCst);
    })
    .expect("error installing Ctrl-C handler");

    let ring = Arc::new(RingBuffer::new(cfg.ring_capacity));
    let queue = Arc::new(OutputQueue::new(cfg.queue_soft_cap, cfg.queue_hard_cap));
    let extractor = Arc::new(MessageExtractor::with_cancellation(cfg.extract_budget, cancel.clone()));

    let input_path = env::args().nth(1).map(PathBuf::from);

    let transport = spawn_transport(ring.clone(), cancel.clone(), input_path);
    let extraction = spawn_extraction(ring, queue.clone(), extractor, cancel.clone());
    let consumer = spawn_consumer(queue, cancel);

    for handle in [transport, extraction, consumer] {
        if let Err(e) = handle.join() {
            error!("a pipeline thread panicked: {e:?}");
        }
    }
    Ok(())
}

/// Reads raw debug bytes from `input_path` (or stdin) into the ring,
/// respecting `available()` and backing off briefly when the ring is full.
fn spawn_transport(
    ring: Arc<RingBuffer>,
    cancel: Arc<AtomicBool>,
    input_path: Option<PathBuf>,
) -> thread::JoinHandle<()> {
    thread::Builder::new()
        .name("transport".into())
        .spawn(move || {
            let mut reader: Box<dyn Read> = match &input_path {
                Some(path) => match File::open(path) {
                    Ok(f) => Box::new(f),
                    Err(e) => {
                        error!("failed to open {}: {e}", path.display());
                        return;
                    }
                },
                None => Box::new(io::stdin()),
            };

            let mut chunk = vec![0u8; 4096];
            while !cancel.load(Ordering::Relaxed) {
                let want = chunk.len().min(ring.available().max(1));
                match reader.read(&mut chunk[..want]) {
                    Ok(0) => break, // EOF
                    Ok(n) => {
                        if ring.append_at_tail(&chunk[..n]).is_err() {
                            // Ring was full between the available() check and the
                            // append; back off and retry the same bytes next pass.
                            thread::sleep(Duration::from_millis(10));
                            continue;
                        }
                    }
                    Err(e) => {
                        warn!("transport read error: {e}");
                        thread::sleep(Duration::from_millis(10));
                    }
                }
                if ring.available() == 0 {
                    thread::sleep(Duration::from_millis(5));
                }
            }
            info!("transport thread exiting");
        })
        .expect("failed to spawn transport thread")
}

fn spawn_extraction(
    ring: Arc<RingBuffer>,
    queue: Arc<OutputQueue>,
    extractor: Arc<MessageExtractor>,
    cancel: Arc<AtomicBool>,
) -> thread::JoinHandle<()> {
    thread::Builder::new()
        .name("extraction".into())
        .spawn(move || {
            while !cancel.load(Ordering::Relaxed) {
                match extractor.extract_messages(&ring, &queue) {
                    Ok(has_more) => {
                        if !has_more {
                            thread::sleep(Duration::from_millis(5));
                        }
                    }
                    Err(e) => {
                        error!("fatal extractor fault, stopping pipeline: {e}");
                        cancel.store(true, Ordering::SeqCst);
                        break;
                    }
                }
            }
            info!("extraction thread exiting");
        })
        .expect("failed to spawn extraction thread")
}

fn spawn_consumer(queue: Arc<OutputQueue>, cancel: Arc<AtomicBool>) -> thread::JoinHandle<()> {
    thread::Builder::new()
        .name("consumer".into())
        .spawn(move || {
            let responder = ResponseGenerator::new();
            while !cancel.load(Ordering::Relaxed) {
                match queue.dequeue() {
                    Some(msg) => {
                        info!("{} ({} bytes, confidence {:.2})", msg.kind, msg.payload.len(), msg.confidence());
                        if msg.kind == shared::MessageKind::Debugger416Byte {
                            let reply = responder.generate_response(&msg.payload);
                            info!("reply ready: {} bytes", reply.len());
                        }
                    }
                    None => thread::sleep(Duration::from_millis(5)),
                }
            }
            info!("consumer thread exiting");
        })
        .expect("failed to spawn consumer thread")
}

/// Checks an override environment variable first, then falls back to a file
/// next to the running executable.
fn find_config_file() -> PathBuf {
    if let Some(cfg) = env::var_os("EXTRACTOR_CONFIG") {
        return PathBuf::from(cfg);
    }
    let mut exe_path = env::current_exe().unwrap_or_else(|_| PathBuf::from("."));
    exe_path.pop();
    exe_path.push("config.toml");
    exe_path
}
