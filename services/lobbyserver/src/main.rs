//! The lobby server binary (`SPEC_FULL.md` §0, spec §4.9, §4.10, §5, §6):
//! spawns the I/O reactor on its own thread and drives an event-loop on the
//! main thread that owns the database connection, lobby state, and
//! dispatcher — the same two-thread split `gamerunner` uses, minus the fixed
//! tick, since the lobby side reacts to packets and never simulates anything
//! between them.

use std::net::SocketAddr;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use clap::{App, Arg};
use lobbycore::dispatch::{self, IoEventBus, IoEventPublisher, LobbyCtx};
use lobbycore::provisioning::Provisioner;
use lobbycore::state::LobbyState;
use lobbycore::{db, LobbyConfig};
use rtype_common::logging;
use rtype_dispatcher::{Dispatcher, Origin};
use rtype_eventbus::EventBus;
use rtype_transport::{IoEvent, OutboundQueue, Server};
use signal_hook::iterator::Signals;
use slog::Logger;

/// Packet-carrying event kinds (`IoEvent::TcpPacket`/`UdpDatagram`); lifecycle
/// kinds (`Accepted`/`Disconnected`, kinds 0/1) are drained unconditionally.
const TCP_PACKET_KIND: usize = 2;
const UDP_DATAGRAM_KIND: usize = 3;

/// How long the event loop blocks on `server.poll` between iterations when
/// nothing is happening — there being no tick to keep pace with here.
const POLL_PERIOD_MS: u64 = 50;

fn main() {
    let matches = App::new("R-Type Lobby Server")
        .version("1.0")
        .author("Bush Hammer Industries")
        .about("Runs account, lobby, and matchmaking services.")
        .arg(Arg::with_name("TCP_PORT").help("TCP listen port").required(true))
        .arg(Arg::with_name("UDP_PORT").help("UDP listen port").required(true))
        .arg(Arg::with_name("config").long("config").takes_value(true).help("Path to lobby_config.toml"))
        .arg(Arg::with_name("log-config").long("log-config").takes_value(true).help("Path to a sloggers TOML config"))
        .get_matches();

    let log = logging::init(matches.value_of("log-config"));

    let tcp_port: u16 = matches.value_of("TCP_PORT").unwrap().parse().expect("TCP_PORT must be a u16");
    let udp_port: u16 = matches.value_of("UDP_PORT").unwrap().parse().expect("UDP_PORT must be a u16");

    let config = match matches.value_of("config") {
        Some(path) => serdeconv::from_toml_file(path).unwrap_or_else(|err| {
            slog::warn!(log, "failed to read lobby config, using defaults"; "path" => path, "error" => %err);
            LobbyConfig::default()
        }),
        None => LobbyConfig::default(),
    };

    let shutdown = install_shutdown_handler(&log);
    run(tcp_port, udp_port, config, shutdown, log);
}

/// Registers a background thread that turns `SIGINT`/`SIGTERM` into a shared
/// flag the event loop polls once per iteration, the same pattern
/// `gamerunner` uses for its tick loop.
fn install_shutdown_handler(log: &Logger) -> Arc<AtomicBool> {
    let shutdown = Arc::new(AtomicBool::new(false));
    let flag = Arc::clone(&shutdown);
    let log = log.new(slog::o!("component" => "shutdown"));
    let mut signals = Signals::new([signal_hook::consts::SIGINT, signal_hook::consts::SIGTERM])
        .expect("failed to install signal handler");
    thread::spawn(move || {
        for signal in signals.forever() {
            slog::warn!(log, "received shutdown signal"; "signal" => signal);
            flag.store(true, Ordering::SeqCst);
            break;
        }
    });
    shutdown
}

fn run(tcp_port: u16, udp_port: u16, config: LobbyConfig, shutdown: Arc<AtomicBool>, log: Logger) {
    let tcp_addr: SocketAddr = format!("0.0.0.0:{}", tcp_port).parse().expect("invalid TCP bind address");
    let udp_addr: SocketAddr = format!("0.0.0.0:{}", udp_port).parse().expect("invalid UDP bind address");

    let (outbound, outbound_rx) = OutboundQueue::channel();
    let (io_bus, io_publisher): (IoEventBus, IoEventPublisher) = EventBus::new(&log);

    let io_log = log.new(slog::o!("thread" => "io"));
    let io_shutdown = Arc::clone(&shutdown);
    let io_handle = thread::spawn(move || {
        io_thread_main(tcp_addr, udp_addr, io_publisher, outbound_rx, io_shutdown, io_log);
    });

    domain_main(config, io_bus, outbound, shutdown, log.new(slog::o!("thread" => "domain")));

    if io_handle.join().is_err() {
        slog::error!(log, "io thread panicked");
    }
}

/// The I/O thread's own loop: identical in shape to `gamerunner::io_thread_main`
/// — owns the `Server` exclusively, publishes every reactor event onto the
/// bus, and applies every queued `OutCommand` each iteration.
fn io_thread_main(
    tcp_addr: SocketAddr,
    udp_addr: SocketAddr,
    publisher: IoEventPublisher,
    outbound_rx: crossbeam_channel::Receiver<rtype_transport::OutCommand>,
    shutdown: Arc<AtomicBool>,
    log: Logger,
) {
    let mut server = match Server::bind(tcp_addr, udp_addr, &log) {
        Ok(server) => server,
        Err(err) => {
            slog::error!(log, "failed to bind server"; "error" => %err);
            return;
        }
    };
    slog::info!(log, "io reactor listening"; "tcp" => %tcp_addr, "udp" => %udp_addr);

    while !shutdown.load(Ordering::Relaxed) {
        match server.poll(Duration::from_millis(POLL_PERIOD_MS)) {
            Ok(events) => {
                for event in events {
                    publisher.publish(event);
                }
            }
            Err(err) => slog::warn!(log, "reactor poll error"; "error" => ?err),
        }
        while let Ok(command) = outbound_rx.try_recv() {
            server.apply(command);
        }
    }
    slog::info!(log, "io thread shutting down");
}

/// The domain thread's loop: connects to Postgres, builds the provisioning
/// client, wires the dispatcher, then drains the event bus every iteration
/// — no fixed tick, no per-entity simulation, just "handle whatever packets
/// arrived since last time".
fn domain_main(config: LobbyConfig, mut event_bus: IoEventBus, outbound: OutboundQueue, shutdown: Arc<AtomicBool>, log: Logger) {
    let database = match db::connect(&config.database.url, &log) {
        Ok(database) => database,
        Err(_) => {
            slog::error!(log, "failed to initialize database, shutting down");
            shutdown.store(true, Ordering::SeqCst);
            return;
        }
    };

    let provisioner = match Provisioner::new(config.orchestrator.clone(), &log) {
        Ok(provisioner) => provisioner,
        Err(_) => {
            slog::error!(log, "failed to initialize game orchestrator client, shutting down");
            shutdown.store(true, Ordering::SeqCst);
            return;
        }
    };

    let state = std::rc::Rc::new(std::cell::RefCell::new(LobbyState::new(outbound, &log)));

    let mut dispatcher: Dispatcher<LobbyCtx> = Dispatcher::new(&log);
    dispatch::install(&mut dispatcher, &mut event_bus, std::rc::Rc::clone(&state), &log);
    let mut ctx = LobbyCtx::new(database, state, provisioner);

    slog::info!(log, "lobby server ready");

    while !shutdown.load(Ordering::Relaxed) {
        drain_inbound(&mut event_bus, &mut dispatcher, &mut ctx);
        thread::sleep(Duration::from_millis(POLL_PERIOD_MS));
    }
    slog::info!(log, "lobby server shutting down");
}

/// Drains lifecycle kinds unconditionally, then every queued packet through
/// the `Dispatcher` — no per-iteration budget, since there is no tick
/// deadline to protect here (spec §4.9 handlers are all quick: in-memory
/// map lookups plus at most one synchronous Postgres round trip).
fn drain_inbound(event_bus: &mut IoEventBus, dispatcher: &mut Dispatcher<LobbyCtx>, ctx: &mut LobbyCtx) {
    event_bus.process_kind(0);
    event_bus.process_kind(1);

    loop {
        let event = match event_bus.try_recv(TCP_PACKET_KIND).or_else(|| event_bus.try_recv(UDP_DATAGRAM_KIND)) {
            Some(event) => event,
            None => break,
        };
        match event {
            IoEvent::TcpPacket(id, packet) => dispatcher.dispatch(&packet, Origin::Tcp(id), ctx),
            IoEvent::UdpDatagram(id, body) => {
                if let Ok(packet) = rtype_protocol::codec::Packet::from_datagram(&body) {
                    dispatcher.dispatch(&packet, Origin::Udp(id), ctx);
                }
            }
            _ => {}
        }
    }
}
